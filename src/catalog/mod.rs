/// 상품 카탈로그
/// 입찰 세션은 이미 로드된 상품을 전달받는다. 카탈로그는 세션 생성 전에 조회된다.
// region:    --- Imports
use crate::backend::BackendClient;
use crate::error::StoreError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

pub mod model;

use model::{Product, Seller};
// endregion: --- Imports

// region:    --- Product Catalog Trait
/// 상품 카탈로그 트레이트 (읽기 전용)
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_product(&self, product_id: &str) -> Result<Option<Product>, StoreError>;

    async fn list_sellers(&self, product_id: &str) -> Result<Vec<Seller>, StoreError> {
        Ok(self
            .get_product(product_id)
            .await?
            .map(|product| product.sellers)
            .unwrap_or_default())
    }
}
// endregion: --- Product Catalog Trait

// region:    --- Http Catalog
#[derive(Deserialize)]
struct ProductEnvelope {
    product: Option<Product>,
}

/// REST 백엔드 카탈로그
pub struct HttpProductCatalog {
    backend: BackendClient,
}

impl HttpProductCatalog {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ProductCatalog for HttpProductCatalog {
    async fn get_product(&self, product_id: &str) -> Result<Option<Product>, StoreError> {
        info!("{:<12} --> 상품 조회 id: {}", "Catalog", product_id);
        match self
            .backend
            .get::<ProductEnvelope>(&format!("/products/{}", product_id))
            .await
        {
            Ok(envelope) => Ok(envelope.product),
            Err(StoreError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
// endregion: --- Http Catalog

// region:    --- In-Memory Catalog
/// 메모리 카탈로그 (로컬 실행 및 테스트용)
#[derive(Default)]
pub struct InMemoryCatalog {
    products: HashMap<String, Product>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: products.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// JSON 파일(상품 배열)에서 카탈로그 로드
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let products: Vec<Product> = serde_json::from_str(&content)?;
        info!(
            "{:<12} --> 카탈로그 로드: {} ({}개 상품)",
            "Catalog",
            path.as_ref().display(),
            products.len()
        );
        Ok(Self::new(products))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn get_product(&self, product_id: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.products.get(product_id).cloned())
    }
}
// endregion: --- In-Memory Catalog
