use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bidding_service::backend::BackendClient;
use bidding_service::bid_request::{BidRequestStatus, BidRequestStore, HttpBidRequestStore};
use bidding_service::bidding::model::BidDuration;
use bidding_service::catalog::{HttpProductCatalog, ProductCatalog};
use bidding_service::error::StoreError;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const API_KEY: &str = "test-key";

/// 모의 백엔드가 받은 요청
#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    body: Value,
}

type Calls = Arc<Mutex<Vec<Recorded>>>;

/// 트레이싱 초기화
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .without_time()
        .with_target(false)
        .with_test_writer()
        .try_init();
}

fn api_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", API_KEY))
        .unwrap_or(false)
}

async fn mock_get_product(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return api_error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    if id != "prod_kettle" {
        return api_error(StatusCode::NOT_FOUND, "Product not found");
    }
    Json(json!({
        "product": {
            "id": "prod_kettle",
            "name": "Electric Kettle",
            "price": 2500,
            "image": "kettle.png",
            "category": "Kitchen",
            "brand": "Philips",
            "sellers": [
                { "id": "s1", "name": "Shop A", "price": 2400, "rating": 4.6,
                  "deliveryTime": "2 hours", "badges": ["Fast"] },
                { "id": "s2", "name": "Shop B", "price": 2350, "rating": 4.1,
                  "deliveryTime": "Tomorrow" }
            ]
        }
    }))
    .into_response()
}

async fn mock_create_bid_request(
    State(calls): State<Calls>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return api_error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    calls.lock().unwrap().push(Recorded {
        path: format!("/bids/{}", user_id),
        body: body.clone(),
    });
    if body["productId"] == "prod_broken" {
        return Json(json!({ "success": true })).into_response();
    }
    Json(json!({
        "bid": {
            "id": "bidreq_remote_1",
            "productId": body["productId"],
            "userId": user_id,
            "duration": body["duration"],
            "createdAt": "2026-10-19T09:00:00Z",
            "expiresAt": "2026-10-19T10:00:00Z",
            "status": "active"
        }
    }))
    .into_response()
}

async fn mock_accept_bid(
    State(calls): State<Calls>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return api_error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    calls.lock().unwrap().push(Recorded {
        path: format!("/bids/{}/accept", id),
        body,
    });
    if id != "bidreq_remote_1" {
        return api_error(StatusCode::NOT_FOUND, "Bid request not found");
    }
    Json(json!({ "success": true })).into_response()
}

/// 모의 백엔드 실행 (임의 포트)
async fn setup() -> (String, Calls) {
    init_tracing();
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/products/:id", get(mock_get_product))
        .route("/bids/:user_id", post(mock_create_bid_request))
        .route("/bids/:id/accept", post(mock_accept_bid))
        .with_state(calls.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    (format!("http://{}/", addr), calls)
}

/// 상품 조회 및 404 처리 테스트
#[tokio::test]
async fn test_catalog_maps_products_and_missing_products() {
    let (base, _) = setup().await;
    let catalog = HttpProductCatalog::new(BackendClient::new(base, API_KEY));

    let product = catalog.get_product("prod_kettle").await.unwrap().unwrap();
    assert_eq!(product.name, "Electric Kettle");
    assert_eq!(product.sellers.len(), 2);
    assert_eq!(product.sellers[0].delivery_time, "2 hours");
    assert!(product.sellers[1].badges.is_empty());

    assert!(catalog.get_product("prod_missing").await.unwrap().is_none());
    assert!(catalog.list_sellers("prod_missing").await.unwrap().is_empty());
}

/// 오류 본문이 StoreError::Api 로 변환되는지 테스트
#[tokio::test]
async fn test_error_body_becomes_api_error() {
    let (base, _) = setup().await;
    let catalog = HttpProductCatalog::new(BackendClient::new(base, "wrong-key"));

    match catalog.get_product("prod_kettle").await {
        Err(StoreError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Unauthorized");
        }
        other => panic!("예상하지 못한 결과: {:?}", other.map(|p| p.map(|p| p.id))),
    }
}

/// 입찰 요청 생성 및 수락 전송 테스트
#[tokio::test]
async fn test_bid_request_create_and_accept() {
    let (base, calls) = setup().await;
    let store = HttpBidRequestStore::new(BackendClient::new(base, API_KEY));

    let request = store
        .create("user_42", "prod_kettle", BidDuration::TwelveHours)
        .await
        .unwrap();
    assert_eq!(request.id, "bidreq_remote_1");
    assert_eq!(request.user_id, "user_42");
    assert_eq!(request.duration, BidDuration::TwelveHours);
    assert_eq!(request.status, BidRequestStatus::Active);
    assert!(request.accepted_bid_id.is_none());

    store.accept(&request.id, "bid_1").await.unwrap();

    let calls = calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].path, "/bids/user_42");
    assert_eq!(
        calls[0].body,
        json!({ "productId": "prod_kettle", "duration": "12hrs" })
    );
    assert_eq!(calls[1].path, "/bids/bidreq_remote_1/accept");
    assert_eq!(calls[1].body, json!({ "sellerBidId": "bid_1" }));
}

/// 응답 형식 오류 및 존재하지 않는 요청 수락 테스트
#[tokio::test]
async fn test_bid_request_failures() {
    let (base, _) = setup().await;
    let store = HttpBidRequestStore::new(BackendClient::new(base, API_KEY));

    let err = store
        .create("user_42", "prod_broken", BidDuration::OneHour)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Malformed(_)));

    match store.accept("bidreq_unknown", "bid_0").await {
        Err(StoreError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Bid request not found");
        }
        other => panic!("예상하지 못한 결과: {:?}", other),
    }
}
