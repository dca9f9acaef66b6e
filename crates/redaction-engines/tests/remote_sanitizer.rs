//! RemoteSanitizer against a local HTTP stub.

mod support;

use std::time::Duration;

use evidence_core::{SanitizeError, SanitizeRequest, Sanitizer};
use redaction_engines::{RemoteSanitizer, RemoteSanitizerConfig};
use support::{serve_once, serve_once_after};

#[tokio::test]
async fn posts_camel_case_request_with_bearer() {
    let (base, server) = serve_once(
        200,
        r#"{"sanitizedText":"{\"a\":\"[HIDDEN:x]\"}","changed":true,"redactionCount":1,"redactionsByType":{"email":1},"engineName":"svc"}"#,
    )
    .await;
    let engine =
        RemoteSanitizer::new(RemoteSanitizerConfig::new(base).with_token("s3cret")).unwrap();
    let result = engine
        .sanitize(r#"{"a":"bob@example.com"}"#, &SanitizeRequest::webhook_payload())
        .await
        .unwrap();

    assert!(result.changed);
    assert_eq!(result.redactions_by_type.get("email"), Some(&1));
    assert_eq!(result.engine_name.as_deref(), Some("svc"));

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1/sanitize "));
    assert!(request.to_ascii_lowercase().contains("authorization: bearer s3cret"));
    assert!(request.contains(r#""inputFormat":"json""#));
    assert!(request.contains(r#""purpose":"webhook_payload""#));
}

#[tokio::test]
async fn non_success_status_is_unavailable() {
    let (base, _server) = serve_once(503, r#"{"error":"overloaded"}"#).await;
    let engine = RemoteSanitizer::new(RemoteSanitizerConfig::new(base)).unwrap();
    let err = engine
        .sanitize("{}", &SanitizeRequest::webhook_payload())
        .await
        .unwrap_err();
    assert!(matches!(err, SanitizeError::Unavailable(ref m) if m.contains("503")));
}

#[tokio::test]
async fn malformed_body_is_invalid_response() {
    let (base, _server) = serve_once(200, r#"{"unexpected":true}"#).await;
    let engine = RemoteSanitizer::new(RemoteSanitizerConfig::new(base)).unwrap();
    let err = engine
        .sanitize("{}", &SanitizeRequest::webhook_payload())
        .await
        .unwrap_err();
    assert!(matches!(err, SanitizeError::InvalidResponse(_)));
}

#[tokio::test]
async fn slow_service_times_out() {
    let (base, _server) = serve_once_after(200, "{}", Duration::from_secs(2)).await;
    let engine =
        RemoteSanitizer::new(RemoteSanitizerConfig::new(base).with_timeout_ms(100)).unwrap();
    let err = engine
        .sanitize("{}", &SanitizeRequest::webhook_payload())
        .await
        .unwrap_err();
    assert!(matches!(err, SanitizeError::Timeout { limit_ms: 100 }));
}

#[tokio::test]
async fn refused_connection_is_unavailable() {
    let engine = RemoteSanitizer::new(
        RemoteSanitizerConfig::new("http://127.0.0.1:9").with_timeout_ms(1_000),
    )
    .unwrap();
    let err = engine
        .sanitize("{}", &SanitizeRequest::webhook_payload())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SanitizeError::Unavailable(_) | SanitizeError::Timeout { .. }
    ));
}
