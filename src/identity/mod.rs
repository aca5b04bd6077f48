/// 사용자 식별자 제공
// region:    --- Imports
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tokio::sync::OnceCell;
use tracing::info;
// endregion: --- Imports

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[async_trait]
pub trait UserIdentity: Send + Sync {
    async fn current_user_id(&self) -> String;
}

/// 설정으로 주어진 고정 사용자
pub struct StaticIdentity {
    user_id: String,
}

impl StaticIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl UserIdentity for StaticIdentity {
    async fn current_user_id(&self) -> String {
        self.user_id.clone()
    }
}

/// 최초 요청 시 생성되어 프로세스 동안 유지되는 사용자
/// 형식: `user_<unix millis>_<base36 9자리>`
#[derive(Default)]
pub struct GeneratedIdentity {
    user_id: OnceCell<String>,
}

impl GeneratedIdentity {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserIdentity for GeneratedIdentity {
    async fn current_user_id(&self) -> String {
        self.user_id
            .get_or_init(|| async {
                let id = generate_user_id(&mut rand::thread_rng());
                info!("{:<12} --> 사용자 id 생성: {}", "Identity", id);
                id
            })
            .await
            .clone()
    }
}

pub fn generate_user_id<R: Rng>(rng: &mut R) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("user_{}_{}", Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generated_identity_is_stable() {
        let identity = GeneratedIdentity::new();
        let first = identity.current_user_id().await;
        assert_eq!(first, identity.current_user_id().await);

        let parts: Vec<&str> = first.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "user");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[tokio::test]
    async fn static_identity_returns_configured_id() {
        let identity = StaticIdentity::new("user_demo");
        assert_eq!(identity.current_user_id().await, "user_demo");
    }
}
