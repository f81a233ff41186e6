//! GoogleWebTransform against a local mock of the translation page.

use mockito::{Matcher, Server, ServerGuard};
use std::time::Duration;
use transpool::transform::GoogleWebConfig;
use transpool::{GoogleWebTransform, TextTransform};

async fn transform_for(server: &ServerGuard) -> GoogleWebTransform {
    let config = GoogleWebConfig::new()
        .with_endpoint(format!("{}/m", server.url()))
        .with_timeout(Duration::from_secs(5));
    GoogleWebTransform::new(config).unwrap()
}

fn page(result: &str) -> String {
    format!(
        r#"<html><body><div class="header">Translate</div><div class="result-container">{result}</div></body></html>"#
    )
}

#[tokio::test]
async fn test_extracts_and_unescapes_result() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/m")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("sl".into(), "en".into()),
            Matcher::UrlEncoded("tl".into(), "de".into()),
            Matcher::UrlEncoded("q".into(), "Salt & pepper.ยง Bread".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(page("Salz &amp; Pfeffer.ยง Brot"))
        .create_async()
        .await;

    let transform = transform_for(&server).await;
    let out = transform
        .transform("en", "de", "Salt & pepper.ยง Bread")
        .await
        .unwrap();

    assert_eq!(out, "Salz & Pfeffer.ยง Brot");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_is_retryable() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/m")
        .match_query(Matcher::Any)
        .with_status(429)
        .create_async()
        .await;

    let err = transform_for(&server)
        .await
        .transform("en", "de", "Hello")
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(err.to_string().contains("429"));
}

#[tokio::test]
async fn test_client_error_is_not_retryable() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/m")
        .match_query(Matcher::Any)
        .with_status(400)
        .create_async()
        .await;

    let err = transform_for(&server)
        .await
        .transform("en", "xx", "Hello")
        .await
        .unwrap_err();
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_page_without_result_is_an_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/m")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html><body>captcha</body></html>")
        .create_async()
        .await;

    let err = transform_for(&server)
        .await
        .transform("en", "de", "Hello")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("result container"));
}
