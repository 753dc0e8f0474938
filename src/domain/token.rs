//! 세션 저장소의 도메인 타입
//!
//! Redis 키 이름 규칙, 서명 검증 없는 클레임 디코딩, 블랙리스트 항목,
//! 일괄 폐기 결과, 헬스 체크 상태를 정의합니다.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// 액세스 토큰 블랙리스트 키: `blacklist:<accessToken>`
pub fn blacklist_key(access_token: &str) -> String {
    format!("blacklist:{}", access_token)
}

/// 사용자별 리프레시 토큰 집합 키: `user:<user_id>:tokens`
pub fn user_tokens_key(user_id: &str) -> String {
    format!("user:{}:tokens", user_id)
}

/// 리프레시 토큰 레코드 키: `refresh:<token>`
pub fn refresh_key(refresh_token: &str) -> String {
    format!("refresh:{}", refresh_token)
}

/// 로그 출력용 토큰 축약 (앞 12글자)
pub fn token_preview(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(12)
        .map(|(idx, _)| idx)
        .unwrap_or(token.len());
    &token[..end]
}

/// 서명 검증 없이 읽어낸 액세스 토큰 클레임
///
/// 토큰 발급자는 최소한 `user_id`와 `exp`(Unix timestamp, 초) 클레임을 포함해야 합니다.
/// `user_id`는 관계형 DB의 숫자 키일 수도, 문자열일 수도 있습니다.
#[derive(Debug, Clone, Deserialize)]
pub struct UnverifiedClaims {
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl UnverifiedClaims {
    /// 서명을 검증하지 않고 토큰의 클레임을 디코딩합니다.
    ///
    /// **이 함수는 다른 곳에서 이미 서명 검증을 마친 토큰에만 사용해야 합니다.**
    /// 서명 키 없이 동작하며 만료 여부도 검사하지 않습니다.
    ///
    /// 형식이 잘못된 토큰은 `None`을 반환합니다.
    pub fn decode(token: &str) -> Option<Self> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        decode::<UnverifiedClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|e| log::debug!("토큰 클레임 디코딩 실패: {}", e))
            .ok()
    }

    /// `user_id` 클레임을 문자열로 반환합니다. 숫자는 10진수로 표기합니다.
    pub fn user_id_string(&self) -> Option<String> {
        match self.user_id.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// `now` 기준 남은 수명(초). `exp` 클레임이 없으면 `None`.
    ///
    /// 극단적인 `exp` 값에서도 오버플로하지 않도록 포화 연산을 사용합니다.
    pub fn remaining_seconds(&self, now: i64) -> Option<i64> {
        self.exp.map(|exp| exp.saturating_sub(now))
    }
}

/// 블랙리스트 항목 값 (정보용, 조회 시에는 키 존재 여부만 사용)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub user_id: Option<String>,
    pub blacklisted_at: DateTime<Utc>,
}

/// 사용자 전체 세션 폐기 결과
///
/// - `requested`: 폐기 직전 토큰 집합의 멤버 수
/// - `revoked`: 삭제 명령이 성공한 `refresh:` 키 수
/// - `failed_keys`: 삭제 명령이 실패한 `refresh:` 키 목록 (롤백하지 않음)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevocationReport {
    pub user_id: String,
    pub requested: usize,
    pub revoked: usize,
    pub failed_keys: Vec<String>,
}

impl RevocationReport {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            requested: 0,
            revoked: 0,
            failed_keys: Vec::new(),
        }
    }

    /// 모든 토큰이 폐기되었는지 여부
    pub fn is_complete(&self) -> bool {
        self.failed_keys.is_empty() && self.revoked == self.requested
    }
}

/// 저장소 헬스 체크 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HealthStatus {
    /// 클라이언트가 연결된 적이 없거나 연결이 끊김
    Disconnected,
    /// PING 성공
    Healthy,
    /// 연결 상태이지만 PING 실패
    Unhealthy { error: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    fn sign(claims: serde_json::Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"issuer-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_key_naming_scheme() {
        assert_eq!(blacklist_key("abc.def.ghi"), "blacklist:abc.def.ghi");
        assert_eq!(user_tokens_key("42"), "user:42:tokens");
        assert_eq!(refresh_key("r-1"), "refresh:r-1");
    }

    #[test]
    fn test_decode_without_signature_key() {
        let token = sign(json!({ "user_id": 42, "exp": 1_900_000_000 }));

        let claims = UnverifiedClaims::decode(&token).unwrap();
        assert_eq!(claims.exp, Some(1_900_000_000));
        assert_eq!(claims.user_id_string().as_deref(), Some("42"));
    }

    #[test]
    fn test_decode_expired_token_still_yields_claims() {
        let token = sign(json!({ "user_id": "emp-7", "exp": 1_000 }));

        let claims = UnverifiedClaims::decode(&token).unwrap();
        assert_eq!(claims.exp, Some(1_000));
        assert_eq!(claims.user_id_string().as_deref(), Some("emp-7"));
        assert_eq!(claims.remaining_seconds(1_500), Some(-500));
    }

    #[test]
    fn test_decode_without_exp() {
        let token = sign(json!({ "user_id": 1 }));

        let claims = UnverifiedClaims::decode(&token).unwrap();
        assert!(claims.exp.is_none());
        assert!(claims.remaining_seconds(0).is_none());
    }

    #[test]
    fn test_remaining_seconds_saturates_on_extreme_exp() {
        let claims = UnverifiedClaims {
            user_id: None,
            exp: Some(i64::MIN),
        };
        assert_eq!(claims.remaining_seconds(1_700_000_000), Some(i64::MIN));

        let claims = UnverifiedClaims {
            user_id: None,
            exp: Some(i64::MAX),
        };
        assert_eq!(claims.remaining_seconds(-1), Some(i64::MAX));
    }

    #[test]
    fn test_decode_malformed_token() {
        assert!(UnverifiedClaims::decode("not-a-jwt").is_none());
        assert!(UnverifiedClaims::decode("").is_none());
        assert!(UnverifiedClaims::decode("a.b.c").is_none());
    }

    #[test]
    fn test_token_preview() {
        assert_eq!(token_preview("short"), "short");
        assert_eq!(token_preview("eyJhbGciOiJIUzI1NiJ9.payload"), "eyJhbGciOiJI");
    }

    #[test]
    fn test_revocation_report_completeness() {
        let mut report = RevocationReport::empty("7");
        assert!(report.is_complete());

        report.requested = 2;
        report.revoked = 1;
        report.failed_keys.push("refresh:b".to_string());
        assert!(!report.is_complete());
    }

    #[test]
    fn test_health_status_serialization() {
        let json = serde_json::to_value(HealthStatus::Unhealthy {
            error: "timeout".to_string(),
        })
        .unwrap();
        assert_eq!(json, json!({ "status": "unhealthy", "error": "timeout" }));

        let json = serde_json::to_value(HealthStatus::Healthy).unwrap();
        assert_eq!(json, json!({ "status": "healthy" }));
    }
}
