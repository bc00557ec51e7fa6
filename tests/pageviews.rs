//! End-to-end tests against a live page-view gateway.

use std::time::Duration;

use pageview_gateway::pageviews::models::{PageView, SessionInfo};
use pageview_gateway::pageviews::session::session_id_today;
use reqwest::StatusCode;

mod common;

use common::{browser_client, start_gateway, test_config, ALLOWED_ORIGIN, API_TOKEN, BROWSER_UA};

const CLIENT_IP: &str = "203.0.113.7";

/// Poll until `check` passes; deferred writes land shortly after the response.
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_pixel_records_view_end_to_end() {
    let server = start_gateway(test_config()).await;
    let client = browser_client();

    let response = client
        .get(server.url("/view.png?id=42"))
        .header("referer", format!("{ALLOWED_ORIGIN}/posts/42"))
        .header("x-real-ip", CLIENT_IP)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert!(response.headers()["cache-control"]
        .to_str()
        .unwrap()
        .contains("no-store"));
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(&response.bytes().await.unwrap()[..4], b"\x89PNG");

    let sid = session_id_today("42", CLIENT_IP, BROWSER_UA);
    let detail_url = server.url(&format!("/posts/42/sessions/{sid}"));
    eventually(|| {
        let request = client.get(&detail_url).header("x-api-token", API_TOKEN).send();
        async move { request.await.map(|r| r.status() == StatusCode::OK).unwrap_or(false) }
    })
    .await;

    let view: PageView = client
        .get(&detail_url)
        .header("x-api-token", API_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view.sid, sid);
    assert_eq!(view.user_agent, BROWSER_UA);
    assert_eq!(view.hostname, "blog.example");

    let response = client
        .get(server.url("/posts/42/sessions"))
        .header("x-api-token", API_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-cache"], "MISS");
    let sessions: SessionInfo = response.json().await.unwrap();
    assert_eq!(sessions.info.id, "42");
    assert_eq!(sessions.info.page_count, 1);
    assert!(!sessions.info.page.has_more);
    assert_eq!(sessions.data.len(), 1);
    assert_eq!(sessions.data[0].sid, sid);

    let sessions_url = server.url("/posts/42/sessions");
    eventually(|| {
        let request = client.get(&sessions_url).header("x-api-token", API_TOKEN).send();
        async move {
            match request.await {
                Ok(response) => response.headers().get("x-cache").is_some_and(|v| *v == "HIT"),
                Err(_) => false,
            }
        }
    })
    .await;

    let views: serde_json::Value = client
        .get(server.url("/posts/42/views"))
        .header("x-api-token", API_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(views["id"], "42");
    assert_eq!(views["pageCount"], 1);
    assert_eq!(views["page"]["has_more"], false);
    assert!(views["lastUpdate"].is_string());

    server.stop().await;
}

#[tokio::test]
async fn test_pixel_without_id_or_referer() {
    let server = start_gateway(test_config()).await;
    let client = browser_client();

    let response = client
        .get(server.url("/view.png"))
        .header("referer", format!("{ALLOWED_ORIGIN}/"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text().await.unwrap(),
        r#"{"message":"Bad Request, please check postId"}"#
    );

    let response = client.get(server.url("/view.png?id=1")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .get(server.url("/view.png?id=1"))
        .header("referer", "https://evil.example/page")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        response.text().await.unwrap(),
        r#"{"message":"Referer Not Allowed"}"#
    );

    server.stop().await;
}

#[tokio::test]
async fn test_bot_user_agents_rejected() {
    let server = start_gateway(test_config()).await;

    let response = reqwest::Client::builder()
        .user_agent("curl/8.5.0")
        .build()
        .unwrap()
        .get(server.url("/posts/1/views"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        response.text().await.unwrap(),
        r#"{"message":"curl/8.5.0 Not Allowed"}"#
    );

    // reqwest sends no user agent by default
    let response = reqwest::get(server.url("/nonexistent")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.text().await.unwrap(), r#"{"message":"bot Not Allowed"}"#);

    server.stop().await;
}

#[tokio::test]
async fn test_api_token_required() {
    let server = start_gateway(test_config()).await;
    let client = browser_client();

    let response = client.get(server.url("/posts/1/views")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(server.url("/posts/1/views"))
        .header("x-api-token", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .get(server.url("/posts/1/views"))
        .header("x-api-token", API_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn test_cors_preflight() {
    let server = start_gateway(test_config()).await;
    let client = browser_client();

    let response = client
        .request(reqwest::Method::OPTIONS, server.url("/posts/1/views"))
        .header("origin", ALLOWED_ORIGIN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        ALLOWED_ORIGIN
    );
    assert_eq!(
        response.headers()["access-control-allow-headers"],
        "content-type, x-api-token"
    );

    let response = client
        .request(reqwest::Method::OPTIONS, server.url("/posts/1/views"))
        .header("origin", "https://evil.example")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.text().await.unwrap().is_empty());

    let response = client
        .get(server.url("/posts/1/views"))
        .header("origin", ALLOWED_ORIGIN)
        .header("x-api-token", API_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        ALLOWED_ORIGIN
    );

    server.stop().await;
}

#[tokio::test]
async fn test_bad_requests() {
    let server = start_gateway(test_config()).await;
    let client = browser_client();

    let response = client
        .get(server.url("/posts/1/views?cursor=%21%21not-base64"))
        .header("x-api-token", API_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text().await.unwrap(),
        r#"{"message":"Bad Request, please check cursor"}"#
    );

    let response = client
        .get(server.url("/posts/1/sessions/short"))
        .header("x-api-token", API_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let unknown = "A".repeat(22);
    let response = client
        .get(server.url(&format!("/posts/1/sessions/{unknown}")))
        .header("x-api-token", API_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .delete(server.url("/view.png"))
        .header("referer", format!("{ALLOWED_ORIGIN}/"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "GET");

    let response = client.get(server.url("/nonexistent")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), r#"{"message":"Not Found"}"#);

    server.stop().await;
}

#[tokio::test]
async fn test_policies_disabled() {
    let mut config = test_config();
    config.bot_filter.enabled = false;
    config.auth.enabled = false;
    config.referer.enabled = false;
    let server = start_gateway(config).await;

    let response = reqwest::get(server.url("/posts/7/views")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = reqwest::get(server.url("/view.png?id=7")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    server.stop().await;
}
