//! HTTP-level integration tests for `POST /api/ml/suggest`.

mod common;

use axum::http::StatusCode;
use common::{acquire, body_json, build_test_app, create_resource, post_json, release, TestApp};

async fn suggest(app: &TestApp, body: serde_json::Value) -> axum::http::Response<axum::body::Body> {
    post_json(app.app(), "/api/ml/suggest", body).await
}

/// Hold and release the resource once for `hold_secs`.
async fn hold_for(app: &TestApp, resource_id: &str, owner: &str, hold_secs: i64) {
    assert_eq!(
        acquire(app, resource_id, owner, 3600).await.status(),
        StatusCode::OK
    );
    app.clock.advance_secs(hold_secs);
    assert_eq!(
        release(app, resource_id, owner).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn no_history_yields_default_suggestion() {
    let app = build_test_app();
    let resource_id = create_resource(&app, "bed", "12").await;

    let response = suggest(
        &app,
        serde_json::json!({"resource_id": resource_id, "owner_id": "alice"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["suggested_ttl"], 300);
    assert_eq!(json["anomaly_score"], 0.0);
}

#[tokio::test]
async fn historical_ttl_is_used_and_clamped_without_history() {
    let app = build_test_app();
    let resource_id = create_resource(&app, "bed", "12").await;

    let json = body_json(
        suggest(
            &app,
            serde_json::json!({
                "resource_id": resource_id,
                "owner_id": "alice",
                "historical_ttl": 120,
            }),
        )
        .await,
    )
    .await;
    assert_eq!(json["suggested_ttl"], 120);

    let json = body_json(
        suggest(
            &app,
            serde_json::json!({
                "resource_id": resource_id,
                "owner_id": "alice",
                "historical_ttl": 10_000,
            }),
        )
        .await,
    )
    .await;
    assert_eq!(json["suggested_ttl"], 3600);
}

#[tokio::test]
async fn steady_usage_scores_zero() {
    let app = build_test_app();
    let resource_id = create_resource(&app, "bed", "12").await;
    hold_for(&app, &resource_id, "alice", 120).await;
    hold_for(&app, &resource_id, "bob", 120).await;

    let json = body_json(
        suggest(
            &app,
            serde_json::json!({"resource_id": resource_id, "owner_id": "alice"}),
        )
        .await,
    )
    .await;

    assert_eq!(json["suggested_ttl"], 120);
    assert_eq!(json["anomaly_score"], 0.0);
}

#[tokio::test]
async fn uneven_usage_raises_anomaly_score() {
    let app = build_test_app();
    let resource_id = create_resource(&app, "bed", "12").await;
    hold_for(&app, &resource_id, "alice", 100).await;
    hold_for(&app, &resource_id, "alice", 300).await;

    let json = body_json(
        suggest(
            &app,
            serde_json::json!({"resource_id": resource_id, "owner_id": "alice"}),
        )
        .await,
    )
    .await;

    // Holds of 100s and 300s: p90 is 300, CV is 100 / 200.
    assert_eq!(json["suggested_ttl"], 300);
    assert_eq!(json["anomaly_score"], 0.5);
}

#[tokio::test]
async fn unknown_resource_returns_404() {
    let app = build_test_app();
    let response = suggest(
        &app,
        serde_json::json!({"resource_id": uuid::Uuid::new_v4(), "owner_id": "alice"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_positive_historical_ttl_is_rejected() {
    let app = build_test_app();
    let resource_id = create_resource(&app, "bed", "12").await;

    let response = suggest(
        &app,
        serde_json::json!({
            "resource_id": resource_id,
            "owner_id": "alice",
            "historical_ttl": 0,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}
