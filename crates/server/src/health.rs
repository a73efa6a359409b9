use axum::{routing::get, Router};
use tracing::{error, info};

pub const LIVENESS_BODY: &str = "OK";

/// Liveness responder for the hosting platform. Every GET answers `200 OK` regardless of path;
/// it shares no state with the bot.
pub fn router() -> Router {
    Router::new().fallback_service(get(liveness))
}

pub async fn spawn(bind_address: &str, port: u16) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health check listening"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router()).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

async fn liveness() -> &'static str {
    LIVENESS_BODY
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tower::ServiceExt;

    use super::router;

    async fn call(method: Method, uri: &str) -> (StatusCode, String) {
        let response = router()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024).await.expect("body");
        (status, String::from_utf8(body.to_vec()).expect("utf8 body"))
    }

    #[tokio::test]
    async fn any_get_path_is_alive() {
        assert_eq!(call(Method::GET, "/").await, (StatusCode::OK, "OK".to_owned()));
        assert_eq!(call(Method::GET, "/healthz").await, (StatusCode::OK, "OK".to_owned()));
        assert_eq!(call(Method::GET, "/some/deep/path?x=1").await, (StatusCode::OK, "OK".to_owned()));
    }

    #[tokio::test]
    async fn non_get_methods_are_rejected() {
        let (status, _) = call(Method::POST, "/").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn spawned_listener_serves_requests() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("probe port");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        super::spawn("127.0.0.1", port).await.expect("spawn health server");

        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.expect("connect");
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .expect("write request");
        let mut response = String::new();
        stream.read_to_string(&mut response).await.expect("read response");

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("OK"));
    }
}
