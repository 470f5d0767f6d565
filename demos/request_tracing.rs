//! Request tracing example
//!
//! Wraps a tower service with `RequestTracingLayer` and shows the
//! correlation id flowing from the request header into handler logs.
//!
//! Run with: cargo run --example request_tracing

use fanout_logger::middleware::{RequestLogger, RequestTracingLayer, TracingConfig};
use fanout_logger::prelude::*;
use http::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tower::{service_fn, Layer, ServiceExt};

async fn handle(request: Request<String>) -> std::result::Result<Response<String>, Infallible> {
    if let Some(log) = request.extensions().get::<RequestLogger>() {
        log.info(format!("Looking up order {}", request.body()));
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .body("shipped".to_string())
        .expect("static response parts are valid"))
}

#[tokio::main]
async fn main() {
    println!("=== Fanout Logger - Request Tracing Example ===\n");

    let logger = Arc::new(Logger::builder().transport(ConsoleSink::new()).build());
    let layer = RequestTracingLayer::with_config(
        Arc::clone(&logger),
        TracingConfig::default().with_echo_header(true),
    );

    println!("1. Request carrying a correlation id:");
    let request = Request::builder()
        .method("GET")
        .uri("/orders/981")
        .header("x-correlation-id", "demo-123")
        .body("981".to_string())
        .expect("valid request");
    match layer.layer(service_fn(handle)).oneshot(request).await {
        Ok(response) => println!("   echoed header: {:?}", response.headers().get("x-correlation-id")),
        Err(e) => match e {},
    }

    println!("\n2. Request without one (a UUID is generated):");
    let request = Request::builder()
        .method("POST")
        .uri("/orders")
        .body("1024".to_string())
        .expect("valid request");
    if let Err(e) = layer.layer(service_fn(handle)).oneshot(request).await {
        match e {}
    }

    println!("\n=== Example completed successfully! ===");
}
