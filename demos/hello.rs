//! Hello - server and client in one process.
//!
//! Registers `SayHello` and `Echo`, then calls `SayHello`, `Echo` and the
//! unregistered `SayGoodbye` against it.
//!
//! ```text
//! cargo run --example hello
//! ```

use callwire::{client, CallRequest, CallResponse, Client, Endpoint, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let server = Server::builder()
        .register("SayHello", |_req: &CallRequest| Ok(CallResponse::ok("I'm Rust")))
        .register("Echo", |req: &CallRequest| {
            Ok(CallResponse::ok(req.argument().to_vec()))
        })
        .bind(Endpoint::local(9090)?)
        .await?;
    let handle = server.handle();
    let serving = tokio::spawn(server.serve());

    let endpoint = Endpoint::local(9090)?;

    let hello = client::call(&endpoint, CallRequest::without_argument("SayHello")).await?;
    println!("SayHello   -> success={} {:?}", hello.success(), hello.result_str());

    let mut conn = Client::connect(&endpoint).await?;
    conn.ping().await?;
    let echo = conn.call(CallRequest::new("Echo", "round trip")).await?;
    println!("Echo       -> success={} {:?}", echo.success(), echo.result_str());

    let bye = conn.call(CallRequest::without_argument("SayGoodbye")).await?;
    println!("SayGoodbye -> success={} {:?}", bye.success(), bye.result_str());
    conn.close().await;

    handle.shutdown();
    serving.await??;
    Ok(())
}
