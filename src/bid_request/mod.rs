/// 입찰 요청 저장소
/// 입찰 라운드의 원격 기록. 세션 입장에서는 실패해도 무방한(best-effort) 호출이다.
// region:    --- Imports
use crate::backend::BackendClient;
use crate::bidding::model::BidDuration;
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::info;
// endregion: --- Imports

// region:    --- Bid Request Model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidRequestStatus {
    Active,
    Expired,
    Accepted,
}

/// 입찰 요청 기록
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidRequest {
    pub id: String,
    pub product_id: String,
    pub user_id: String,
    pub duration: BidDuration,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: BidRequestStatus,
    #[serde(default)]
    pub accepted_bid_id: Option<String>,
}
// endregion: --- Bid Request Model

// region:    --- Bid Request Store Trait
#[async_trait]
pub trait BidRequestStore: Send + Sync {
    /// 입찰 요청 생성
    async fn create(
        &self,
        user_id: &str,
        product_id: &str,
        duration: BidDuration,
    ) -> Result<BidRequest, StoreError>;

    /// 판매자 입찰 수락 기록
    async fn accept(&self, bid_request_id: &str, seller_bid_id: &str) -> Result<(), StoreError>;
}
// endregion: --- Bid Request Store Trait

// region:    --- Http Store
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBidRequestBody<'a> {
    product_id: &'a str,
    duration: BidDuration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AcceptBidBody<'a> {
    seller_bid_id: &'a str,
}

#[derive(Deserialize)]
struct BidRequestEnvelope {
    bid: Option<BidRequest>,
}

/// REST 백엔드 입찰 요청 저장소
pub struct HttpBidRequestStore {
    backend: BackendClient,
}

impl HttpBidRequestStore {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl BidRequestStore for HttpBidRequestStore {
    async fn create(
        &self,
        user_id: &str,
        product_id: &str,
        duration: BidDuration,
    ) -> Result<BidRequest, StoreError> {
        info!(
            "{:<12} --> 입찰 요청 생성: user={}, product={}, duration={}",
            "BidRequest", user_id, product_id, duration
        );
        let envelope: BidRequestEnvelope = self
            .backend
            .post(
                &format!("/bids/{}", user_id),
                &CreateBidRequestBody {
                    product_id,
                    duration,
                },
            )
            .await?;
        envelope
            .bid
            .ok_or_else(|| StoreError::Malformed("응답에 bid 필드가 없습니다.".to_string()))
    }

    async fn accept(&self, bid_request_id: &str, seller_bid_id: &str) -> Result<(), StoreError> {
        info!(
            "{:<12} --> 입찰 수락 전송: request={}, bid={}",
            "BidRequest", bid_request_id, seller_bid_id
        );
        let _: serde_json::Value = self
            .backend
            .post(
                &format!("/bids/{}/accept", bid_request_id),
                &AcceptBidBody { seller_bid_id },
            )
            .await?;
        Ok(())
    }
}
// endregion: --- Http Store

// region:    --- In-Memory Store
/// 메모리 입찰 요청 저장소 (로컬 실행 및 테스트용)
#[derive(Default)]
pub struct InMemoryBidRequestStore {
    next_id: AtomicU64,
    requests: Mutex<Vec<BidRequest>>,
}

impl InMemoryBidRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 요청 목록
    pub fn requests(&self) -> Result<Vec<BidRequest>, StoreError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<BidRequest>>, StoreError> {
        self.requests
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }
}

#[async_trait]
impl BidRequestStore for InMemoryBidRequestStore {
    async fn create(
        &self,
        user_id: &str,
        product_id: &str,
        duration: BidDuration,
    ) -> Result<BidRequest, StoreError> {
        let id = format!("bidreq_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let now = Utc::now();
        let request = BidRequest {
            id,
            product_id: product_id.to_string(),
            user_id: user_id.to_string(),
            duration,
            created_at: now,
            expires_at: now + Duration::minutes(duration.minutes() as i64),
            status: BidRequestStatus::Active,
            accepted_bid_id: None,
        };
        self.lock()?.push(request.clone());
        Ok(request)
    }

    async fn accept(&self, bid_request_id: &str, seller_bid_id: &str) -> Result<(), StoreError> {
        let mut requests = self.lock()?;
        let request = requests
            .iter_mut()
            .find(|r| r.id == bid_request_id)
            .ok_or_else(|| StoreError::Api {
                status: 404,
                message: format!("Bid request not found: {}", bid_request_id),
            })?;
        request.status = BidRequestStatus::Accepted;
        request.accepted_bid_id = Some(seller_bid_id.to_string());
        Ok(())
    }
}
// endregion: --- In-Memory Store
