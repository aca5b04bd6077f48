// region:    --- Imports
use bidding_service::backend::BackendClient;
use bidding_service::bid_request::{BidRequestStore, HttpBidRequestStore, InMemoryBidRequestStore};
use bidding_service::catalog::{HttpProductCatalog, InMemoryCatalog, ProductCatalog};
use bidding_service::config::Config;
use bidding_service::handlers::{self, AppState};
use bidding_service::identity::{GeneratedIdentity, StaticIdentity, UserIdentity};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // 설정 로드
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{:<12} --> 설정 로드 실패: {}", "Main", e);
            return Err(e.into());
        }
    };
    info!("{:<12} --> 설정 로드 성공: {:?}", "Main", config.session);

    // 카탈로그 및 입찰 요청 저장소 선택
    let (catalog, store): (Arc<dyn ProductCatalog>, Arc<dyn BidRequestStore>) =
        match &config.backend_url {
            Some(url) => {
                info!("{:<12} --> 원격 백엔드 사용: {}", "Main", url);
                let backend = BackendClient::new(url.as_str(), config.backend_api_key.as_str());
                (
                    Arc::new(HttpProductCatalog::new(backend.clone())),
                    Arc::new(HttpBidRequestStore::new(backend)),
                )
            }
            None => {
                let catalog = match &config.catalog_path {
                    Some(path) => InMemoryCatalog::from_file(path)?,
                    None => InMemoryCatalog::default(),
                };
                info!(
                    "{:<12} --> 메모리 카탈로그 사용 ({}개 상품)",
                    "Main",
                    catalog.len()
                );
                (Arc::new(catalog), Arc::new(InMemoryBidRequestStore::new()))
            }
        };

    let identity: Arc<dyn UserIdentity> = match &config.user_id {
        Some(id) => Arc::new(StaticIdentity::new(id.as_str())),
        None => Arc::new(GeneratedIdentity::new()),
    };

    // 클라이언트 앱을 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let state = AppState::new(catalog, store, identity, config.session);
    let routes_all = handlers::router(state).layer(cors);

    // 리스너 생성
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
