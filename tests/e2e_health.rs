//! E2E tests for health check and basic server functionality

mod common;

use common::TestServer;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_cors_headers() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/health"))
        .header("Origin", "http://plugin.example.com")
        .send()
        .await
        .unwrap();

    // Local http deployments allow any origin
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_404_for_unknown_routes() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/unknown/route"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_metrics_requires_session() {
    let server = TestServer::new().await;
    let client = common::no_redirect_client();

    let response = client.get(server.url("/metrics")).send().await.unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(common::location(&response), "/login");
}

#[tokio::test]
async fn test_metrics_accepts_session_cookie() {
    miroteams::metrics::init_metrics();
    let server = TestServer::new().await;
    let cookie = server.create_session_cookie("metrics-team").await;

    let response = server
        .client
        .get(&server.url("/metrics"))
        .header("Cookie", cookie)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("miroteams_teams_created_total"));
}
