/// 원격 REST 백엔드 클라이언트
/// 카탈로그와 입찰 요청 저장소가 공유한다.
// region:    --- Imports
use crate::error::StoreError;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
// endregion: --- Imports

// region:    --- Backend Client
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// GET 요청
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, StoreError> {
        self.call::<(), T>(Method::GET, endpoint, None).await
    }

    /// POST 요청
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, StoreError> {
        self.call(Method::POST, endpoint, Some(body)).await
    }

    /// API 호출 공통 처리
    /// 실패 응답은 `{ "error": "..." }` 본문을 가진다.
    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, StoreError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("{:<12} --> {} {}", "Backend", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let data: serde_json::Value = response.json().await?;

        if !status.is_success() {
            let message = data
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("API request failed")
                .to_string();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_value(data)?)
    }
}
// endregion: --- Backend Client
