mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn plans_catalog_is_public() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/api/subscriptions/plans")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    let plans = body["data"].as_object().cloned().unwrap_or_default();
    assert_eq!(plans.len(), 5);
    assert_eq!(plans["fleet_pro"]["max_listings"], 10);
    Ok(())
}

#[tokio::test]
async fn listing_writes_need_a_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for (method, path) in [
        (reqwest::Method::POST, "/api/trucks"),
        (reqwest::Method::POST, "/api/trailers"),
        (reqwest::Method::GET, "/api/trucks/stats"),
        (reqwest::Method::GET, "/api/users"),
        (reqwest::Method::POST, "/api/subscriptions"),
    ] {
        let res = client.request(method.clone(), server.url(path)).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{} {}", method, path);
    }
    Ok(())
}

#[tokio::test]
async fn truck_listing_envelope() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/api/trucks?page=abc&limit=5&sort=-price")).await?;
    let status = res.status();
    let body = res.json::<serde_json::Value>().await?;

    if status == StatusCode::OK {
        assert_eq!(body["success"], true);
        let count = body["count"].as_u64().unwrap_or(u64::MAX);
        assert!(count <= 5, "page larger than limit: {}", body);
        assert!(body["total"].as_u64().unwrap_or(0) >= count);
        assert!(body["pagination"].get("prev").is_none(), "page=abc must fall back to page 1");
    } else {
        // No database: the failure still uses the error envelope
        assert_eq!(body["success"], false, "unexpected body: {}", body);
        assert!(body["code"].is_string());
    }
    Ok(())
}
