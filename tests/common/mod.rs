//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Response;
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tonic::Code;

use lb_score::report::proto::LOAD_METHOD_PATH;

/// Start a fake load reporter answering every `Load` call with the status
/// produced by `f`, as a trailers-only gRPC response.
///
/// Returns the bound address and a counter of calls served.
pub async fn start_programmable_reporter<F>(f: F) -> (SocketAddr, Arc<AtomicUsize>)
where
    F: Fn(usize) -> (Code, &'static str) + Clone + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let app = Router::new().route(
        LOAD_METHOD_PATH,
        post(move || {
            let f = f.clone();
            let counter = counter.clone();
            async move {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                let (code, message) = f(call);
                grpc_status_response(code, message)
            }
        }),
    );

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, calls)
}

/// Fake reporter that always answers with the same status.
pub async fn start_status_reporter(code: Code, message: &'static str) -> SocketAddr {
    start_programmable_reporter(move |_| (code, message)).await.0
}

/// A listener that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    });

    addr
}

fn grpc_status_response(code: Code, message: &str) -> Response<Body> {
    Response::builder()
        .status(200)
        .header("content-type", "application/grpc")
        .header("grpc-status", (code as i32).to_string())
        .header("grpc-message", message)
        .body(Body::empty())
        .unwrap()
}
