use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Duration;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::rfq::rfq_router;

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serializable")))
        .expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request builds")
}

#[tokio::test]
async fn create_route_returns_requested_overview() {
    let harness = Harness::new();
    let router = rfq_router(harness.service.clone());

    let response = router
        .oneshot(post_json(
            "/api/v1/rfqs",
            json!({
                "part_id": "part-bracket",
                "supplier_ids": ["sup-a", "sup-b"],
                "manufacturing_method": "3002",
                "deadline": day(5),
            }),
        ))
        .await
        .expect("route executes");

    assert_status(&response, StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "requested");
    assert_eq!(payload["invited_count"], 2);
    assert_eq!(payload["response_count"], 0);
    assert!(payload["id"].is_string());
}

#[tokio::test]
async fn create_route_maps_validation_to_unprocessable() {
    let harness = Harness::new();
    let router = rfq_router(harness.service.clone());

    let response = router
        .oneshot(post_json(
            "/api/v1/rfqs",
            json!({
                "part_id": "part-bracket",
                "supplier_ids": [],
                "manufacturing_method": "3002",
                "deadline": day(5),
            }),
        ))
        .await
        .expect("route executes");

    assert_status(&response, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_request_is_not_found() {
    let harness = Harness::new();
    let response = rfq_router(harness.service.clone())
        .oneshot(get("/api/v1/rfqs/does-not-exist"))
        .await
        .expect("route executes");

    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn public_errors_share_one_status_and_message() {
    let harness = Harness::new();
    let (request_id, tokens) = harness.open_request("part-bracket", &["sup-a"]);
    let router = rfq_router(harness.service.clone());

    let wrong = router
        .clone()
        .oneshot(get(&format!(
            "/api/v1/public/rfqs/{request_id}/suppliers/sup-a?token=deadbeef"
        )))
        .await
        .expect("route executes");
    let unknown = router
        .clone()
        .oneshot(get("/api/v1/public/rfqs/missing/suppliers/sup-a?token=deadbeef"))
        .await
        .expect("route executes");

    harness.clock.advance(Duration::days(30));
    let expired = router
        .oneshot(get(&format!(
            "/api/v1/public/rfqs/{request_id}/suppliers/sup-a?token={}",
            tokens["sup-a"].as_str()
        )))
        .await
        .expect("route executes");

    let mut bodies = Vec::new();
    for response in [wrong, unknown, expired] {
        assert_status(&response, StatusCode::FORBIDDEN);
        bodies.push(read_json_body(response).await);
    }
    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn public_submit_then_duplicate_conflicts() {
    let harness = Harness::new();
    let (request_id, tokens) = harness.open_request("part-bracket", &["sup-a"]);
    let router = rfq_router(harness.service.clone());
    let uri = format!("/api/v1/public/rfqs/{request_id}/suppliers/sup-a");
    let body = json!({
        "token": tokens["sup-a"].as_str(),
        "unit_price": "125.50",
        "currency": "usd",
        "delivery_date": day(10),
        "payment_terms_days": 45,
    });

    let created = router
        .clone()
        .oneshot(post_json(&uri, body.clone()))
        .await
        .expect("route executes");
    assert_status(&created, StatusCode::CREATED);
    let payload = read_json_body(created).await;
    assert_eq!(payload["currency"], "USD");
    assert_eq!(payload["total_price"], "125.50");

    let duplicate = router
        .oneshot(post_json(&uri, body))
        .await
        .expect("route executes");
    assert_status(&duplicate, StatusCode::CONFLICT);
}

#[tokio::test]
async fn oversized_prices_are_unprocessable_on_submit_and_compare() {
    let harness = Harness::new();
    let (shaft_request, shaft_tokens) = harness.open_request("part-shaft", &["sup-a"]);
    let (bracket_request, bracket_tokens) = harness.open_request("part-bracket", &["sup-b"]);
    let router = rfq_router(harness.service.clone());
    let huge = "39614081257132168796771975168";

    let rejected = router
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/public/rfqs/{shaft_request}/suppliers/sup-a"),
            json!({
                "token": shaft_tokens["sup-a"].as_str(),
                "unit_price": huge,
                "currency": "TRY",
                "delivery_date": day(10),
                "payment_terms_days": 30,
            }),
        ))
        .await
        .expect("route executes");
    assert_status(&rejected, StatusCode::UNPROCESSABLE_ENTITY);

    let accepted = router
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/public/rfqs/{bracket_request}/suppliers/sup-b"),
            json!({
                "token": bracket_tokens["sup-b"].as_str(),
                "unit_price": huge,
                "currency": "USD",
                "delivery_date": day(10),
                "payment_terms_days": 30,
            }),
        ))
        .await
        .expect("route executes");
    assert_status(&accepted, StatusCode::CREATED);

    let comparison = router
        .oneshot(get(&format!("/api/v1/rfqs/{bracket_request}/comparison")))
        .await
        .expect("route executes");
    assert_status(&comparison, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn comparison_missing_rate_is_failed_dependency() {
    let harness = Harness::new();
    let (request_id, tokens) = harness.open_request("part-bracket", &["sup-a"]);
    harness
        .service
        .submit_response(
            &request_id,
            &supplier("sup-a"),
            tokens["sup-a"].as_str(),
            quote(10, "JPY", 5, 30),
        )
        .expect("quote");

    let response = rfq_router(harness.service.clone())
        .oneshot(get(&format!("/api/v1/rfqs/{request_id}/comparison")))
        .await
        .expect("route executes");

    assert_status(&response, StatusCode::FAILED_DEPENDENCY);
}

#[tokio::test]
async fn approve_route_returns_existing_order_on_conflict() {
    let harness = Harness::new();
    let (request_id, tokens) = harness.open_request("part-bracket", &["sup-a"]);
    let quote_response = harness
        .service
        .submit_response(
            &request_id,
            &supplier("sup-a"),
            tokens["sup-a"].as_str(),
            quote(10, "TRY", 5, 30),
        )
        .expect("quote");
    let router = rfq_router(harness.service.clone());
    let uri = format!("/api/v1/rfqs/{request_id}/approve");
    let body = json!({ "response_id": quote_response.id });

    let created = router
        .clone()
        .oneshot(post_json(&uri, body.clone()))
        .await
        .expect("route executes");
    assert_status(&created, StatusCode::CREATED);
    let order = read_json_body(created).await;

    let again = router
        .clone()
        .oneshot(post_json(&uri, body))
        .await
        .expect("route executes");
    assert_status(&again, StatusCode::CONFLICT);
    let payload = read_json_body(again).await;
    assert_eq!(payload["order"]["id"], order["id"]);

    let progress = router
        .oneshot(post_json(
            &format!("/api/v1/orders/{}/status", order["id"].as_str().expect("id")),
            json!({ "status": "delivered" }),
        ))
        .await
        .expect("route executes");
    assert_status(&progress, StatusCode::CONFLICT);
}

#[tokio::test]
async fn methods_route_lists_catalog() {
    let harness = Harness::new();
    let response = rfq_router(harness.service.clone())
        .oneshot(get("/api/v1/manufacturing-methods"))
        .await
        .expect("route executes");

    assert_status(&response, StatusCode::OK);
    let payload = read_json_body(response).await;
    let codes: Vec<_> = payload
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|method| method["code"].as_str())
        .collect();
    assert!(codes.contains(&"3001"));
}
