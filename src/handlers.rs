// region:    --- Imports
use crate::bid_request::BidRequestStore;
use crate::bidding::model::{BidDuration, DurationOption, Phase};
use crate::bidding::session::SessionView;
use crate::catalog::ProductCatalog;
use crate::config::SessionSettings;
use crate::error::SessionError;
use crate::identity::UserIdentity;
use crate::scheduler::{SessionHandle, SessionOutcome, SessionScheduler};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

// endregion: --- Imports

// region:    --- App State
/// 진행 중인 세션 목록
#[derive(Default)]
pub struct SessionRegistry {
    next_id: AtomicU64,
    sessions: RwLock<HashMap<u64, SessionHandle>>,
}

impl SessionRegistry {
    async fn insert(&self, handle: SessionHandle) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.sessions.write().await.insert(id, handle);
        id
    }

    async fn get(&self, id: u64) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    async fn remove(&self, id: u64) -> Option<SessionHandle> {
        self.sessions.write().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn ProductCatalog>,
    pub store: Arc<dyn BidRequestStore>,
    pub identity: Arc<dyn UserIdentity>,
    pub settings: SessionSettings,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        store: Arc<dyn BidRequestStore>,
        identity: Arc<dyn UserIdentity>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            catalog,
            store,
            identity,
            settings,
            sessions: Arc::new(SessionRegistry::default()),
        }
    }
}

/// 라우터 설정
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/durations", get(handle_get_durations))
        .route("/sessions", post(handle_create_session))
        .route(
            "/sessions/:id",
            get(handle_get_session).delete(handle_discard_session),
        )
        .route("/sessions/:id/duration", put(handle_select_duration))
        .route("/sessions/:id/start", post(handle_start_bidding))
        .route("/sessions/:id/view-all", post(handle_view_all))
        .route("/sessions/:id/accept", post(handle_accept_bid))
        .with_state(state)
}
// endregion: --- App State

// region:    --- Requests
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub product_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectDurationRequest {
    pub duration: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptBidRequest {
    pub bid_id: String,
}
// endregion: --- Requests

// region:    --- Error Responses
fn error_response(status: StatusCode, code: &str, message: String) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message, "code": code })),
    )
        .into_response()
}

fn session_error_response(e: SessionError) -> Response {
    let status = match e {
        SessionError::InvalidPhase(_) => StatusCode::CONFLICT,
        SessionError::InvalidDuration(_) => StatusCode::BAD_REQUEST,
        SessionError::BidNotFound(_) => StatusCode::NOT_FOUND,
        SessionError::Closed => StatusCode::GONE,
    };
    error_response(status, e.code(), e.to_string())
}

fn session_not_found(id: u64) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "SESSION_NOT_FOUND",
        format!("세션을 찾을 수 없습니다: {}", id),
    )
}
// endregion: --- Error Responses

// region:    --- Handlers

/// 입찰 기간 선택지 조회
pub async fn handle_get_durations() -> impl IntoResponse {
    let options: Vec<DurationOption> = BidDuration::ALL.into_iter().map(Into::into).collect();
    Json(options)
}

/// 세션 생성
pub async fn handle_create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Response {
    info!("{:<12} --> 세션 생성 요청: {:?}", "Handler", req);

    let product = match state.catalog.get_product(&req.product_id).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                "PRODUCT_NOT_FOUND",
                format!("상품을 찾을 수 없습니다: {}", req.product_id),
            )
        }
        Err(e) => {
            return error_response(StatusCode::BAD_GATEWAY, "CATALOG_ERROR", e.to_string())
        }
    };

    let (handle, task) = SessionScheduler::spawn(
        product,
        StdRng::from_entropy(),
        state.settings,
        Arc::clone(&state.store),
        Arc::clone(&state.identity),
    );
    let view = handle.view();
    let session_id = register_session(&state, handle, task).await;

    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "session_id": session_id, "session": view })),
    )
        .into_response()
}

/// 세션 상태 조회
pub async fn handle_get_session(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    match state.sessions.get(id).await {
        Some(handle) => Json(handle.view()).into_response(),
        None => session_not_found(id),
    }
}

/// 입찰 기간 선택
pub async fn handle_select_duration(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<SelectDurationRequest>,
) -> Response {
    let Some(handle) = state.sessions.get(id).await else {
        return session_not_found(id);
    };
    let duration = match req.duration.parse::<BidDuration>() {
        Ok(duration) => duration,
        Err(e) => return session_error_response(e),
    };
    match handle.select_duration(duration).await {
        Ok(()) => Json(handle.view()).into_response(),
        Err(e) => session_error_response(e),
    }
}

/// 입찰 시작
pub async fn handle_start_bidding(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    info!("{:<12} --> 입찰 시작 요청 id: {}", "Handler", id);
    let Some(handle) = state.sessions.get(id).await else {
        return session_not_found(id);
    };
    match handle.start().await {
        Ok(()) => Json(handle.view()).into_response(),
        Err(e) => session_error_response(e),
    }
}

/// 전체 입찰 보기 (조기 종료)
pub async fn handle_view_all(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let Some(handle) = state.sessions.get(id).await else {
        return session_not_found(id);
    };
    match handle.view_all().await {
        Ok(()) => Json(handle.view()).into_response(),
        Err(e) => session_error_response(e),
    }
}

/// 입찰 수락
pub async fn handle_accept_bid(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<AcceptBidRequest>,
) -> Response {
    info!("{:<12} --> 입찰 수락 요청 id: {}, {:?}", "Handler", id, req);
    let Some(handle) = state.sessions.get(id).await else {
        return session_not_found(id);
    };
    match handle.accept(req.bid_id).await {
        Ok(bid) => Json(bid).into_response(),
        Err(e) => session_error_response(e),
    }
}

/// 세션 폐기
pub async fn handle_discard_session(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Response {
    info!("{:<12} --> 세션 폐기 요청 id: {}", "Handler", id);
    match state.sessions.remove(id).await {
        Some(handle) => {
            handle.discard().await;
            StatusCode::NO_CONTENT.into_response()
        }
        None => session_not_found(id),
    }
}

// endregion: --- Handlers

// region:    --- Session Watcher
/// 세션을 목록에 등록하고 종료 감시를 시작한다
pub async fn register_session(
    state: &AppState,
    handle: SessionHandle,
    task: JoinHandle<SessionOutcome>,
) -> u64 {
    let view = handle.subscribe();
    let session_id = state.sessions.insert(handle).await;
    info!(
        "{:<12} --> 세션 등록 id: {}, 활성 세션 수: {}",
        "Handler",
        session_id,
        state.sessions.len().await
    );
    spawn_session_watcher(state.clone(), session_id, view, task);
    session_id
}

/// 세션 종료 감시
/// 방치된 세션은 보존 기간 후 폐기하고, 종료된 세션은 목록에서 제거한다.
fn spawn_session_watcher(
    state: AppState,
    session_id: u64,
    mut view: watch::Receiver<SessionView>,
    mut task: JoinHandle<SessionOutcome>,
) {
    let retention = state.settings.retention;
    tokio::spawn(async move {
        let result = tokio::select! {
            result = &mut task => result,
            idle = wait_until_idle(&mut view, retention) => {
                if idle {
                    info!("{:<12} --> 방치된 세션 폐기 id: {}", "Watcher", session_id);
                    if let Some(handle) = state.sessions.remove(session_id).await {
                        handle.discard().await;
                    }
                }
                task.await
            }
        };
        state.sessions.remove(session_id).await;

        match result {
            Ok(SessionOutcome::Accepted(bid)) => info!(
                "{:<12} --> 세션 종료 id: {}, 수락된 입찰: {}",
                "Watcher", session_id, bid.id
            ),
            Ok(SessionOutcome::Discarded) => {
                debug!("{:<12} --> 세션 폐기됨 id: {}", "Watcher", session_id)
            }
            Err(e) => warn!("{:<12} --> 세션 태스크 비정상 종료: {}", "Watcher", e),
        }
    });
}

/// LiveBidding 이 아닌 상태에서 `retention` 동안 스냅샷 변화가 없으면 true.
/// 세션 태스크가 먼저 끝나면 false.
async fn wait_until_idle(view: &mut watch::Receiver<SessionView>, retention: Duration) -> bool {
    loop {
        let live = view.borrow_and_update().phase == Phase::LiveBidding;
        let changed = if live {
            view.changed().await
        } else {
            match timeout(retention, view.changed()).await {
                Ok(changed) => changed,
                Err(_) => return true,
            }
        };
        if changed.is_err() {
            return false;
        }
    }
}
// endregion: --- Session Watcher

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bid_request::InMemoryBidRequestStore;
    use crate::catalog::model::{Product, Seller};
    use crate::catalog::InMemoryCatalog;
    use crate::identity::StaticIdentity;

    fn product() -> Product {
        Product {
            id: "p1".to_string(),
            name: "Air Fryer".to_string(),
            price: 8000,
            image: String::new(),
            category: "Kitchen".to_string(),
            brand: "Acme".to_string(),
            sellers: vec![Seller {
                id: "s0".to_string(),
                name: "Store 0".to_string(),
                price: 7800,
                rating: 4.2,
                delivery_time: "Tomorrow".to_string(),
                badges: Vec::new(),
            }],
        }
    }

    fn app_state() -> AppState {
        AppState::new(
            Arc::new(InMemoryCatalog::new(vec![product()])),
            Arc::new(InMemoryBidRequestStore::new()),
            Arc::new(StaticIdentity::new("user_test")),
            SessionSettings::default(),
        )
    }

    async fn open_session(state: &AppState) -> (u64, watch::Receiver<SessionView>) {
        let (handle, task) = SessionScheduler::spawn(
            product(),
            StdRng::seed_from_u64(3),
            state.settings,
            Arc::clone(&state.store),
            Arc::clone(&state.identity),
        );
        let view = handle.subscribe();
        (register_session(state, handle, task).await, view)
    }

    #[tokio::test(start_paused = true)]
    async fn finished_rounds_are_evicted_after_retention() {
        let state = app_state();
        let mut views = Vec::new();
        for _ in 0..3 {
            let (id, view) = open_session(&state).await;
            let handle = state.sessions.get(id).await.unwrap();
            handle.select_duration(BidDuration::OneHour).await.unwrap();
            handle.start().await.unwrap();
            views.push(view);
        }
        assert_eq!(state.sessions.len().await, 3);

        // 라이브 중에는 보존 기간을 넘겨도 유지된다
        tokio::time::sleep(Duration::from_secs(3000)).await;
        assert_eq!(state.sessions.len().await, 3);

        tokio::time::sleep(Duration::from_secs(1000)).await;
        assert!(state.sessions.is_empty().await);
        for view in &views {
            assert_eq!(view.borrow().phase, Phase::Results);
            assert!(view.borrow().closed);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_duration_selection_is_evicted() {
        let state = app_state();
        let (id, view) = open_session(&state).await;

        tokio::time::sleep(Duration::from_secs(200)).await;
        let handle = state.sessions.get(id).await.unwrap();
        handle.select_duration(BidDuration::TwelveHours).await.unwrap();
        drop(handle);

        // 마지막 변경 후 보존 기간이 지나야 폐기된다
        tokio::time::sleep(Duration::from_secs(200)).await;
        assert!(state.sessions.get(id).await.is_some());

        tokio::time::sleep(Duration::from_secs(200)).await;
        assert!(state.sessions.get(id).await.is_none());
        assert!(view.borrow().closed);
    }
}
