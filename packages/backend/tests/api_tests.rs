mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use feldplan_backend::auth;
use feldplan_backend::handlers::build_router;
use feldplan_backend::state::AppState;

fn app(db: &common::TestDb) -> Router {
    build_router(AppState {
        pool: db.pool.clone(),
    })
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, token: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_ok() {
    let db = common::TestDb::new().await;
    let response = app(&db).oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_requires_bearer_token() {
    let db = common::TestDb::new().await;
    let app = app(&db);

    let response = app
        .clone()
        .oneshot(get("/api/farms", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(get("/api/farms", Some("wrong"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_farm_crud_roundtrip() {
    let db = common::TestDb::new().await;
    auth::create_advisor(&db.pool, "anna", "token-anna").await.unwrap();
    let app = app(&db);

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/farms",
            "token-anna",
            &json!({
                "farm_name": "Hof Sonnenfeld",
                "first_name": "Peter",
                "last_name": "Muster",
                "address": "Dorfstrasse 1"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let farm = body_json(response).await;
    let farm_id = farm["id"].as_i64().unwrap();
    assert_eq!(farm["farm_name"], "Hof Sonnenfeld");

    let response = app
        .clone()
        .oneshot(get("/api/farms", Some("token-anna")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let farms = body_json(response).await;
    assert_eq!(farms.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/farms/{farm_id}"),
            "token-anna",
            &json!({
                "farm_name": "Hof Sonnenfeld",
                "first_name": "Petra",
                "last_name": "Muster"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["first_name"], "Petra");

    let response = app
        .clone()
        .oneshot(Request::builder()
            .method("DELETE")
            .uri(format!("/api/farms/{farm_id}"))
            .header("authorization", "Bearer token-anna")
            .body(Body::empty())
            .unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get(&format!("/api/farms/{farm_id}"), Some("token-anna")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_plan_create_and_fetch_over_http() {
    let db = common::TestDb::new().await;
    let seed = common::seed_basics(&db.pool).await;
    let app = app(&db);

    let payload = json!({
        "farm_id": seed.farm.id,
        "year": 2026,
        "crops": [{
            "meta_id": seed.weizen_id,
            "area_ha": 4.0,
            "treatments": [{
                "title": "Fungizid",
                "products": [{"product_id": seed.product_id, "quantity": 1.5}]
            }]
        }]
    });

    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/plans", "token-anna", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let plan = body_json(response).await;
    let plan_id = plan["id"].as_i64().unwrap();
    assert_eq!(plan["status"], "draft");
    assert_eq!(plan["crops"][0]["name"], "Weizen");
    assert_eq!(plan["crops"][0]["treatments"][0]["products"][0]["product_name"], "TestProdukt");

    let response = app
        .clone()
        .oneshot(get(&format!("/api/plans/{plan_id}"), Some("token-anna")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Another advisor gets a 404, not the data.
    auth::create_advisor(&db.pool, "bert", "token-bert").await.unwrap();
    let response = app
        .oneshot(get(&format!("/api/plans/{plan_id}"), Some("token-bert")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_plan_with_unknown_product_answers_422() {
    let db = common::TestDb::new().await;
    let seed = common::seed_basics(&db.pool).await;
    let app = app(&db);

    let payload = json!({
        "farm_id": seed.farm.id,
        "year": 2026,
        "crops": [{
            "meta_id": seed.weizen_id,
            "treatments": [{
                "title": "Fungizid",
                "products": [{"product_id": 999999}]
            }]
        }]
    });

    let response = app
        .oneshot(send_json("POST", "/api/plans", "token-anna", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("product"));
}

#[tokio::test]
async fn test_approvals_answer_empty_without_full_filter() {
    let db = common::TestDb::new().await;
    common::seed_basics(&db.pool).await;
    let app = app(&db);

    let response = app
        .oneshot(get("/api/approvals?crop=1&product=2", Some("token-anna")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, json!([]));
}
