use crate::bidding::model::Phase;

/// 입찰 세션 오류
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("현재 단계({0:?})에서는 허용되지 않는 요청입니다.")]
    InvalidPhase(Phase),

    #[error("지원하지 않는 입찰 기간입니다: {0}")]
    InvalidDuration(String),

    #[error("입찰을 찾을 수 없습니다: {0}")]
    BidNotFound(String),

    #[error("이미 종료된 세션입니다.")]
    Closed,
}

impl SessionError {
    /// API 응답용 오류 코드
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::InvalidPhase(_) => "INVALID_PHASE",
            SessionError::InvalidDuration(_) => "INVALID_DURATION",
            SessionError::BidNotFound(_) => "BID_NOT_FOUND",
            SessionError::Closed => "SESSION_CLOSED",
        }
    }
}

/// 외부 저장소(카탈로그, 입찰 요청) 오류
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("요청 실패: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API 오류({status}): {message}")]
    Api { status: u16, message: String },

    #[error("응답 형식 오류: {0}")]
    Malformed(String),

    #[error("저장소 잠금 실패: {0}")]
    Lock(String),

    #[error("카탈로그 로드 실패: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 파싱 실패: {0}")]
    Json(#[from] serde_json::Error),
}

/// 설정 오류
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("환경 변수 {name} 값이 올바르지 않습니다: {value}")]
    InvalidValue { name: &'static str, value: String },
}
