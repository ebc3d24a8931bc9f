//! HttpTransport and full probe runs against a local HTTP server

mod common;

use geoprobe::probe::{
    HttpTransport, ProbeRequest, ProbeRunner, RunnerOptions, TargetConfig, Transport,
    TransportError, TransportOptions,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> HttpTransport {
    HttpTransport::new(&TransportOptions::default()).unwrap()
}

#[tokio::test]
async fn test_get_returns_status_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wms"))
        .and(header("x-probe", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(common::WMS_CAPABILITIES, "text/xml"))
        .expect(1)
        .mount(&server)
        .await;

    let request = ProbeRequest::get(&format!("{}/wms", server.uri())).header("X-Probe", "1");
    let response = transport().send(request).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("text/xml"));
    assert_eq!(response.text(), common::WMS_CAPABILITIES);
}

#[tokio::test]
async fn test_error_status_is_a_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let response = transport().send(ProbeRequest::get(&server.uri())).await.unwrap();
    assert_eq!(response.status, 503);
    assert!(response.is_error_status());
    assert_eq!(response.text(), "maintenance");
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let server = MockServer::start().await;
    Mock::given(header("user-agent", "geoprobe-test/1.0"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let options = TransportOptions {
        user_agent: "geoprobe-test/1.0".to_string(),
        ..TransportOptions::default()
    };
    let response = HttpTransport::new(&options)
        .unwrap()
        .send(ProbeRequest::get(&server.uri()))
        .await
        .unwrap();
    assert_eq!(response.status, 204);
}

#[tokio::test]
async fn test_post_sends_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/csw"))
        .and(header("content-type", "text/xml"))
        .and(body_string("<GetCapabilities/>"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<ok/>", "text/xml"))
        .expect(1)
        .mount(&server)
        .await;

    let request = ProbeRequest::post(&format!("{}/csw", server.uri()), "<GetCapabilities/>".to_string())
        .header("content-type", "text/xml");
    let response = transport().send(request).await.unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let mut request = ProbeRequest::get(&server.uri());
    request.timeout = Some(Duration::from_millis(100));
    let err = transport().send(request).await.unwrap_err();

    assert!(matches!(err, TransportError::Timeout { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_refused_connection() {
    // Grab a free port and release it so nothing listens there
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let err = transport()
        .send(ProbeRequest::get(&format!("http://127.0.0.1:{}/", port)))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Connect(_)), "{:?}", err);
}

fn http_runner(timeout: Duration) -> ProbeRunner {
    let options = RunnerOptions {
        timeout,
        ..RunnerOptions::default()
    };
    ProbeRunner::new(common::registry(), Arc::new(transport()), options)
}

#[tokio::test]
async fn test_getcaps_probe_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ows"))
        .and(query_param("SERVICE", "WFS"))
        .and(query_param("VERSION", "1.1.0"))
        .and(query_param("REQUEST", "GetCapabilities"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "<WFS_Capabilities><ows:Title xmlns:ows=\"http://www.opengis.net/ows\">Demo</ows:Title></WFS_Capabilities>",
            "text/xml",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let target = TargetConfig::new(
        &format!("{}/ows", server.uri()),
        "geoprobe.plugins.probe.owsgetcaps.WfsGetCaps",
    );
    let result = http_runner(Duration::from_secs(10)).run(&target).await.unwrap();

    assert!(result.success(), "{}", result.message());
    assert_eq!(result.check_results().count(), 4);
    assert!(result.check_results().all(|c| c.success()));
}

#[tokio::test]
async fn test_basic_credentials_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_string("welcome"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let target = TargetConfig::new(&server.uri(), "geoprobe.plugins.probe.http.HttpGet")
        .with_param("username", "user")
        .with_param("password", "pass");
    let result = http_runner(Duration::from_secs(10)).run(&target).await.unwrap();
    assert!(result.success(), "{}", result.message());

    let anonymous = TargetConfig::new(&server.uri(), "geoprobe.plugins.probe.http.HttpGet");
    let result = http_runner(Duration::from_secs(10)).run(&anonymous).await.unwrap();
    assert!(!result.success());
    assert_eq!(
        result.check_results().next().map(|c| c.message().to_string()),
        Some("HTTP Error status=401".to_string())
    );
}

#[tokio::test]
async fn test_probe_timeout_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let target = TargetConfig::new(&server.uri(), "geoprobe.plugins.probe.http.HttpGet");
    let result = http_runner(Duration::from_millis(100)).run(&target).await.unwrap();

    assert!(!result.success());
    assert!(result.message().starts_with("Request Err: Timeout"), "{}", result.message());
}
