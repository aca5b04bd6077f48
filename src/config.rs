/// 환경 변수 기반 설정
// region:    --- Imports
use crate::error::ConfigError;
use std::time::Duration;
// endregion: --- Imports

/// 입찰 공개 간격 기본값(2초)
pub const DEFAULT_REVEAL_INTERVAL_MS: u64 = 2000;

/// 카운트다운 주기 기본값(1초)
pub const DEFAULT_TICK_PERIOD_MS: u64 = 1000;

/// 결과 단계(또는 기간 선택 단계)에서 방치된 세션의 보존 기간 기본값(5분)
pub const DEFAULT_RETENTION_MS: u64 = 5 * 60 * 1000;

/// 타이머 설정 상한(1일)
pub const MAX_TIMER_MS: u64 = 24 * 60 * 60 * 1000;

// region:    --- Session Settings
/// 세션 타이머 설정
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub reveal_interval: Duration,
    pub tick_period: Duration,
    /// LiveBidding 이 아닌 세션이 변화 없이 이 기간을 넘기면 폐기된다
    pub retention: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reveal_interval: Duration::from_millis(DEFAULT_REVEAL_INTERVAL_MS),
            tick_period: Duration::from_millis(DEFAULT_TICK_PERIOD_MS),
            retention: Duration::from_millis(DEFAULT_RETENTION_MS),
        }
    }
}
// endregion: --- Session Settings

// region:    --- Config
/// 서비스 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// 설정되지 않으면 메모리 카탈로그/저장소를 사용한다
    pub backend_url: Option<String>,
    pub backend_api_key: String,
    pub catalog_path: Option<String>,
    pub user_id: Option<String>,
    pub session: SessionSettings,
}

impl Config {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 임의의 조회 함수로 설정 로드
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let reveal_ms = parse_millis(&lookup, "REVEAL_INTERVAL_MS", DEFAULT_REVEAL_INTERVAL_MS)?;
        let tick_ms = parse_millis(&lookup, "TICK_PERIOD_MS", DEFAULT_TICK_PERIOD_MS)?;
        let retention_ms = parse_millis(&lookup, "SESSION_RETENTION_MS", DEFAULT_RETENTION_MS)?;

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            backend_url: lookup("BACKEND_URL").filter(|url| !url.is_empty()),
            backend_api_key: lookup("BACKEND_API_KEY").unwrap_or_default(),
            catalog_path: lookup("CATALOG_PATH").filter(|path| !path.is_empty()),
            user_id: lookup("USER_ID").filter(|id| !id.is_empty()),
            session: SessionSettings {
                reveal_interval: Duration::from_millis(reveal_ms),
                tick_period: Duration::from_millis(tick_ms),
                retention: Duration::from_millis(retention_ms),
            },
        })
    }
}

fn parse_millis<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.parse::<u64>() {
            Ok(ms) if ms > 0 && ms <= MAX_TIMER_MS => Ok(ms),
            _ => Err(ConfigError::InvalidValue { name, value }),
        },
    }
}
// endregion: --- Config
