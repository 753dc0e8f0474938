//! 저장소 연결 및 정책 설정 관리 모듈
//!
//! Redis 접속 정보, 재연결 정책, 블랙리스트 조회 실패 정책을 관리합니다.

use std::env;
use std::time::Duration;

/// 기본 Redis 호스트
pub const DEFAULT_REDIS_HOST: &str = "localhost";
/// 기본 Redis 포트
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Redis 접속 설정
///
/// # Environment Variables
///
/// - `REDIS_HOST`: 호스트 (기본값: `localhost`)
/// - `REDIS_PORT`: 포트 (기본값: `6379`)
/// - `REDIS_PASSWORD`: 비밀번호 (기본값: 없음)
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_REDIS_HOST.to_string(),
            port: DEFAULT_REDIS_PORT,
            password: None,
        }
    }
}

impl StoreConfig {
    /// 환경 변수에서 접속 설정을 읽어옵니다.
    ///
    /// 잘못된 포트 값은 경고 로그를 남기고 기본값으로 대체합니다.
    pub fn from_env() -> Self {
        let host = env::var("REDIS_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REDIS_HOST.to_string());

        let port = match env::var("REDIS_PORT") {
            Ok(raw) => raw.trim().parse::<u16>().unwrap_or_else(|e| {
                log::warn!(
                    "REDIS_PORT 파싱 실패 ({}): {}. 기본값 {} 사용",
                    raw,
                    e,
                    DEFAULT_REDIS_PORT
                );
                DEFAULT_REDIS_PORT
            }),
            Err(_) => DEFAULT_REDIS_PORT,
        };

        let password = env::var("REDIS_PASSWORD")
            .ok()
            .filter(|p| !p.is_empty());

        Self { host, port, password }
    }

    /// Redis 접속 URL을 생성합니다.
    ///
    /// 비밀번호는 URL 인코딩되어 포함됩니다.
    ///
    /// ```rust,ignore
    /// let password = Some("p@ss".into());
    /// let config = StoreConfig { host: "cache".into(), port: 6380, password };
    /// assert_eq!(config.connection_url(), "redis://:p%40ss@cache:6380/");
    /// ```
    pub fn connection_url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/",
                urlencoding::encode(password),
                self.host,
                self.port
            ),
            None => format!("redis://{}:{}/", self.host, self.port),
        }
    }

    /// 로그 출력용 주소 (비밀번호 제외)
    pub fn display_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 연결이 끊겼을 때의 재연결 정책
///
/// 외부에서 변경할 수 없는 고정값입니다. `n`번째 시도 전 대기 시간은 `n × 100ms`이며,
/// 10회 연속 실패하면 재연결을 포기하고 프로세스 재시작 전까지 연결 끊김 상태로 남습니다.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl ReconnectPolicy {
    pub const MAX_ATTEMPTS: u32 = 10;
    pub const BASE_DELAY_MS: u64 = 100;

    /// `attempt`번째(1부터 시작) 재연결 시도 전 대기 시간
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::MAX_ATTEMPTS,
            base_delay: Duration::from_millis(Self::BASE_DELAY_MS),
        }
    }
}

/// 저장소 장애 시 블랙리스트 조회 결과 정책
///
/// 기본값은 `Open`으로, 장애 중에는 토큰을 블랙리스트에 없는 것으로 간주합니다
/// (가용성 우선). 엄격한 보안이 필요한 배포에서는 `Closed`로 설정하여
/// 장애 중 모든 토큰을 거부할 수 있습니다.
///
/// # Environment Variables
///
/// - `BLACKLIST_FAIL_MODE`: `open` | `closed` (기본값: `open`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlacklistFailMode {
    #[default]
    Open,
    Closed,
}

impl BlacklistFailMode {
    /// 환경 변수에서 정책을 읽어옵니다. 알 수 없는 값은 `Open`으로 처리합니다.
    pub fn from_env() -> Self {
        match env::var("BLACKLIST_FAIL_MODE") {
            Ok(raw) => Self::parse(&raw).unwrap_or_else(|| {
                log::warn!("알 수 없는 BLACKLIST_FAIL_MODE 값: {}. open 사용", raw);
                BlacklistFailMode::Open
            }),
            Err(_) => BlacklistFailMode::Open,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "open" => Some(BlacklistFailMode::Open),
            "closed" | "close" => Some(BlacklistFailMode::Closed),
            _ => None,
        }
    }

    /// 저장소를 사용할 수 없을 때 `is_blacklisted`가 반환할 값
    pub fn unavailable_result(&self) -> bool {
        matches!(self, BlacklistFailMode::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 6379);
        assert!(config.password.is_none());
        assert_eq!(config.connection_url(), "redis://localhost:6379/");
    }

    #[test]
    fn test_connection_url_encodes_password() {
        let config = StoreConfig {
            host: "cache.internal".to_string(),
            port: 6380,
            password: Some("p@ss:word/1".to_string()),
        };

        assert_eq!(
            config.connection_url(),
            "redis://:p%40ss%3Aword%2F1@cache.internal:6380/"
        );
        assert_eq!(config.display_addr(), "cache.internal:6380");
    }

    #[test]
    fn test_reconnect_policy_is_linear() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(4), Duration::from_millis(400));
        assert_eq!(policy.delay_for(10), Duration::from_millis(1000));
    }

    #[test]
    fn test_fail_mode_parse() {
        assert_eq!(BlacklistFailMode::parse("open"), Some(BlacklistFailMode::Open));
        assert_eq!(BlacklistFailMode::parse(" CLOSED "), Some(BlacklistFailMode::Closed));
        assert_eq!(BlacklistFailMode::parse("strict"), None);
        assert_eq!(BlacklistFailMode::default(), BlacklistFailMode::Open);
    }

    #[test]
    fn test_fail_mode_unavailable_result() {
        assert!(!BlacklistFailMode::Open.unavailable_result());
        assert!(BlacklistFailMode::Closed.unavailable_result());
    }
}
