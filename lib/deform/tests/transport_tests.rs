//! Integration tests for `HyperClient` using wiremock.

use std::time::Duration;

use assert2::{check, let_assert};
use bytes::Bytes;
use futures_util::TryStreamExt;
use deform::{HttpClient, HyperClient, Method, Request, Timeout, TransportError};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

fn url(server: &MockServer, path: &str) -> url::Url {
    url::Url::parse(&format!("{}{path}", server.uri())).expect("url")
}

#[tokio::test]
async fn get_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/user/"))
        .and(header("Authorization", "SessionId abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Request-Id", "42")
                .set_body_json(serde_json::json!({"result": {"email": "me@example.com"}})),
        )
        .mount(&server)
        .await;

    let client = HyperClient::new();
    let request = Request::builder(Method::Get, url(&server, "/api/user/"))
        .header("Authorization", "SessionId abc")
        .build();

    let response = client.execute(request).await.expect("response");

    check!(response.is_success());
    check!(response.status() == 200);
    check!(response.header("x-request-id") == Some("42"));
    let body: serde_json::Value = response.json().expect("json");
    check!(body.pointer("/result/email") == Some(&serde_json::json!("me@example.com")));
}

#[tokio::test]
async fn post_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/collections/"))
        .and(header("X-Action", "find"))
        .and(body_json(serde_json::json!({"payload": {"filter": {"name": "venues"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": []})))
        .mount(&server)
        .await;

    let client = HyperClient::new();
    let request = Request::builder(Method::Post, url(&server, "/api/collections/"))
        .header("X-Action", "find")
        .json(&serde_json::json!({"payload": {"filter": {"name": "venues"}}}))
        .expect("json")
        .build();

    let response = client.execute(request).await.expect("response");
    check!(response.status() == 200);
}

#[tokio::test]
async fn error_status_is_returned_as_is() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/projects/missing/"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({"result": {"message": "Project not found."}})),
        )
        .mount(&server)
        .await;

    let client = HyperClient::new();
    let request = Request::builder(Method::Get, url(&server, "/api/projects/missing/")).build();

    let response = client.execute(request).await.expect("response");
    check!(response.status() == 404);
    check!(!response.is_success());
}

#[tokio::test]
async fn per_call_read_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/info/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = HyperClient::new();
    let request = Request::builder(Method::Get, url(&server, "/api/info/"))
        .timeout(Some(Timeout::read(Duration::from_millis(100))))
        .build();

    let result = client.execute(request).await;
    let_assert!(Err(TransportError::ReadTimeout) = result);
}

#[tokio::test]
async fn configured_read_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = HyperClient::builder()
        .timeout(Duration::from_millis(100))
        .build();
    let request = Request::builder(Method::Get, url(&server, "/api/info/")).build();

    let result = client.execute(request).await;
    let_assert!(Err(TransportError::ReadTimeout) = result);
}

#[tokio::test]
async fn connection_refused() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let url = url::Url::parse(&format!("http://127.0.0.1:{port}/api/")).expect("url");

    let client = HyperClient::new();
    let result = client.execute(Request::builder(Method::Get, url).build()).await;

    let_assert!(Err(TransportError::Connect(_)) = result);
}

#[tokio::test]
async fn streaming_yields_the_whole_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/collections/venues/documents/subway/logo/content/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .set_body_bytes(vec![7_u8; 256 * 1024]),
        )
        .mount(&server)
        .await;

    let client = HyperClient::builder().with_logging().build();
    let request = Request::builder(
        Method::Get,
        url(&server, "/api/collections/venues/documents/subway/logo/content/"),
    )
    .build();

    let response = client.execute_streaming(request).await.expect("response");
    check!(response.status() == 200);
    check!(response.header("content-type") == Some("image/png"));

    let chunks: Vec<Bytes> = response.into_body().try_collect().await.expect("body");
    let total: usize = chunks.iter().map(Bytes::len).sum();
    check!(total == 256 * 1024);
    check!(chunks.iter().all(|chunk| chunk.iter().all(|byte| *byte == 7)));
}

#[tokio::test]
async fn streaming_head_respects_read_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = HyperClient::new();
    let request = Request::builder(Method::Get, url(&server, "/api/info/"))
        .timeout(Some(Timeout::read(Duration::from_millis(100))))
        .build();

    let result = client.execute_streaming(request).await;
    let_assert!(Err(TransportError::ReadTimeout) = result);
}

/// A listener whose accept queue is full, so new connects stall.
async fn saturated_listener() -> (tokio::net::TcpListener, Vec<tokio::net::TcpStream>, url::Url) {
    let socket = tokio::net::TcpSocket::new_v4().expect("socket");
    socket
        .bind("127.0.0.1:0".parse().expect("addr"))
        .expect("bind");
    let listener = socket.listen(0).expect("listen");
    let addr = listener.local_addr().expect("addr");

    let mut held = Vec::new();
    for _ in 0..16 {
        let connect = tokio::net::TcpStream::connect(addr);
        match tokio::time::timeout(Duration::from_millis(200), connect).await {
            Ok(Ok(stream)) => held.push(stream),
            _ => break,
        }
    }

    let url = url::Url::parse(&format!("http://{addr}/api/info/")).expect("url");
    (listener, held, url)
}

#[tokio::test]
async fn per_call_connect_timeout() {
    let (_listener, _held, url) = saturated_listener().await;

    let client = HyperClient::builder()
        .connect_timeout(Duration::from_secs(5))
        .build();
    let request = Request::builder(Method::Get, url)
        .timeout(Some(Timeout::connect(Duration::from_millis(200))))
        .build();

    let started = std::time::Instant::now();
    let result = client.execute(request).await;

    let_assert!(Err(TransportError::ConnectTimeout) = result);
    check!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn stalled_connect_is_not_a_read_timeout() {
    let (_listener, _held, url) = saturated_listener().await;

    let client = HyperClient::builder()
        .connect_timeout(Duration::from_millis(800))
        .build();
    let request = Request::builder(Method::Get, url)
        .timeout(Some(Timeout::read(Duration::from_millis(200))))
        .build();

    let result = client.execute(request).await;
    let_assert!(Err(TransportError::ConnectTimeout) = result);
}

#[tokio::test]
async fn logging_layers_pass_responses_through() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/collections/venues/"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = HyperClient::builder()
        .with_defaults()
        .with_debug_logging()
        .build();
    let request = Request::builder(Method::Delete, url(&server, "/api/collections/venues/"))
        .header("Authorization", "Token secret")
        .build();

    let response = client.execute(request).await.expect("response");
    check!(response.status() == 204);
    check!(response.body().is_empty());
}
