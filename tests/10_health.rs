mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/health")).await?;

    // 503 is the expected answer when no database is reachable
    let status = res.status();
    assert!(
        status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        status
    );
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"].as_bool(), Some(status == StatusCode::OK));
    Ok(())
}

#[tokio::test]
async fn root_and_api_index_describe_the_service() -> Result<()> {
    let server = common::ensure_server().await?;

    let root = reqwest::get(server.url("/")).await?;
    assert_eq!(root.status(), StatusCode::OK);
    let body = root.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["name"], "TruckHub API");

    let index = reqwest::get(server.url("/api")).await?;
    assert_eq!(index.status(), StatusCode::OK);
    let body = index.json::<serde_json::Value>().await?;
    assert!(body["data"]["endpoints"].is_object());
    Ok(())
}
