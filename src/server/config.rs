//! Server configuration.

use crate::protocol::DEFAULT_MAX_PAYLOAD_SIZE;
use crate::writer::DEFAULT_CHANNEL_CAPACITY;

/// Default number of handler invocations allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 10;

/// What the server does when a handler returns an error or panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Answer with `CallResponse { success: false, result_buffer: <description> }`.
    ///
    /// The call still succeeds at the transport level.
    #[default]
    Isolate,
    /// Fail only that call at the transport level: the client receives an
    /// error frame and reports `CallwireError::Remote`.
    Propagate,
}

/// Configuration for a [`Server`](super::Server).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Worker pool size. Calls beyond it wait for a free worker.
    pub max_concurrent_calls: usize,
    /// Handling of handler errors and panics.
    pub failure_policy: FailurePolicy,
    /// Largest request payload accepted and largest response payload sent.
    ///
    /// A response over the limit is replaced by an error frame, so it
    /// reaches the client as `CallwireError::Remote`.
    pub max_payload_size: u32,
    /// Queue length of each connection's writer task.
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
            failure_policy: FailurePolicy::default(),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.max_concurrent_calls, 10);
        assert_eq!(config.failure_policy, FailurePolicy::Isolate);
        assert_eq!(config.max_payload_size, DEFAULT_MAX_PAYLOAD_SIZE);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }
}
