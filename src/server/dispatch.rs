//! Call dispatch on the bounded worker pool.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::Semaphore;

use super::config::FailurePolicy;
use crate::handler::HandlerRegistry;
use crate::message::{CallRequest, CallResponse};

/// Resolves calls against a frozen registry and runs handlers on blocking
/// worker threads, at most `max_concurrent_calls` at a time.
pub(crate) struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    workers: Arc<Semaphore>,
    policy: FailurePolicy,
}

impl Dispatcher {
    pub(crate) fn new(registry: HandlerRegistry, max_concurrent_calls: usize, policy: FailurePolicy) -> Self {
        Self {
            registry: Arc::new(registry),
            workers: Arc::new(Semaphore::new(max_concurrent_calls)),
            policy,
        }
    }

    /// Run one call to completion.
    ///
    /// `Err` carries the failure message to send back as an error frame; it
    /// only happens under [`FailurePolicy::Propagate`].
    pub(crate) async fn invoke(&self, request: CallRequest) -> Result<CallResponse, String> {
        let handler = match self.registry.resolve(request.function_name()) {
            Some(handler) => handler,
            None => {
                tracing::debug!(function = request.function_name(), "Unknown function");
                return Ok(CallResponse::unknown());
            }
        };

        // Semaphore waiters are served FIFO: excess calls queue, none are rejected.
        let permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| "worker pool closed".to_string())?;

        let function = request.function_name().to_string();
        let joined = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            handler.call(&request)
        })
        .await;

        let failure = match joined {
            Ok(Ok(response)) => {
                tracing::debug!(function = %function, success = response.success(), "Call completed");
                return Ok(response);
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) if e.is_panic() => format!("handler panicked: {}", panic_message(e.into_panic())),
            Err(e) => e.to_string(),
        };

        tracing::warn!(function = %function, error = %failure, "Handler failed");
        match self.policy {
            FailurePolicy::Isolate => Ok(CallResponse::failure(failure)),
            FailurePolicy::Propagate => Err(failure),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
