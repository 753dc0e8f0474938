use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;

use crate::caching::store::{ConnectionState, KeyValueStore};
use crate::config::BlacklistFailMode;
use crate::core::errors::{AppError, AppResult};
use crate::domain::token::{
    BlacklistEntry, HealthStatus, RevocationReport, UnverifiedClaims, blacklist_key, refresh_key,
    token_preview, user_tokens_key,
};

/// 로그아웃 토큰 무효화와 다중 기기 세션 폐기를 담당하는 저장소
///
/// 주 관계형 DB가 살아있는 세션을 추적하지 않아도 되도록 Redis에 다음 정보를 관리합니다:
/// - Access Token Blacklist (`blacklist:<token>`, 토큰의 남은 수명만큼 TTL)
/// - 사용자별 Refresh Token 집합 (`user:<id>:tokens`, 발급자가 관리)
/// - Refresh Token 레코드 (`refresh:<token>`, 발급자가 관리하며 여기서는 삭제만 수행)
///
/// 프로세스 시작 시 한 번 생성하여 `Arc`로 요청 처리 코드에 주입합니다.
/// `revoke_all_for_user`를 제외한 모든 연산은 에러를 밖으로 내보내지 않고
/// 보수적인 기본값을 반환합니다.
///
/// ```rust,ignore
/// let redis = Arc::new(RedisClient::connect(&StoreConfig::from_env()).await?);
/// let sessions = Arc::new(SessionStore::new(redis, BlacklistFailMode::from_env()));
///
/// // 로그아웃
/// sessions.blacklist(&verified_access_token).await;
///
/// // 모든 기기에서 로그아웃
/// let report = sessions.revoke_all_for_user("42").await?;
/// ```
pub struct SessionStore<S: KeyValueStore> {
    store: Arc<S>,
    fail_mode: BlacklistFailMode,
}

impl<S: KeyValueStore> Clone for SessionStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            fail_mode: self.fail_mode,
        }
    }
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: Arc<S>, fail_mode: BlacklistFailMode) -> Self {
        Self { store, fail_mode }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn fail_mode(&self) -> BlacklistFailMode {
        self.fail_mode
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.store.state()
    }

    /// Access Token을 Blacklist에 추가
    ///
    /// 토큰의 클레임을 **서명 검증 없이** 디코딩합니다. 호출자는 반드시 이 함수를 호출하기 전에
    /// 토큰의 서명을 검증해야 합니다.
    ///
    /// # Returns
    /// * `true` - 토큰의 남은 수명만큼 TTL을 가진 블랙리스트 항목이 기록됨
    /// * `false` - `exp` 클레임 없음, 형식 오류, 이미 만료됨, 저장소 미연결 또는 저장소 오류
    ///
    /// 같은 토큰으로 다시 호출하면 다시 계산한(더 짧은) TTL로 항목을 덮어씁니다.
    pub async fn blacklist(&self, access_token: &str) -> bool {
        let Some(claims) = UnverifiedClaims::decode(access_token) else {
            log::debug!(
                "블랙리스트 대상 아님 (클레임 디코딩 실패): {}",
                token_preview(access_token)
            );
            return false;
        };

        let now = Utc::now();
        let Some(ttl) = claims.remaining_seconds(now.timestamp()) else {
            log::debug!("블랙리스트 대상 아님 (exp 클레임 없음): {}", token_preview(access_token));
            return false;
        };

        if ttl <= 0 {
            log::debug!("이미 만료된 토큰 - 블랙리스트 생략: {}", token_preview(access_token));
            return false;
        }

        let state = self.store.state();
        if !state.is_ready() {
            log::warn!("Redis 미연결 ({}) - 토큰 블랙리스트 추가 생략", state);
            return false;
        }

        let entry = BlacklistEntry {
            user_id: claims.user_id_string(),
            blacklisted_at: now,
        };
        let value = match serde_json::to_string(&entry) {
            Ok(value) => value,
            Err(e) => {
                log::error!("블랙리스트 항목 직렬화 실패: {}", e);
                return false;
            }
        };

        match self
            .store
            .set_with_expiry(&blacklist_key(access_token), &value, ttl as u64)
            .await
        {
            Ok(()) => {
                log::info!(
                    "토큰이 블랙리스트에 추가됨 - 토큰: {}..., 사용자: {:?}, TTL: {}초",
                    token_preview(access_token),
                    entry.user_id,
                    ttl
                );
                true
            }
            Err(e) => {
                log::error!("토큰 블랙리스트 추가 실패: {}", e);
                false
            }
        }
    }

    /// Token이 Blacklist에 있는지 확인
    ///
    /// 키의 존재 여부만 확인하며 값은 사용하지 않습니다.
    /// 저장소를 사용할 수 없으면 [`BlacklistFailMode`]에 따른 값을 반환합니다
    /// (기본값 `Open` → `false`).
    pub async fn is_blacklisted(&self, access_token: &str) -> bool {
        let state = self.store.state();
        if !state.is_ready() {
            log::warn!(
                "Redis 미연결 ({}) - 블랙리스트 조회 불가, 실패 정책 {:?} 적용",
                state,
                self.fail_mode
            );
            return self.fail_mode.unavailable_result();
        }

        match self.store.exists(&blacklist_key(access_token)).await {
            Ok(found) => found,
            Err(e) => {
                log::error!(
                    "블랙리스트 조회 실패: {}. 실패 정책 {:?} 적용",
                    e,
                    self.fail_mode
                );
                self.fail_mode.unavailable_result()
            }
        }
    }

    /// 사용자의 모든 Refresh Token 폐기 (모든 기기에서 로그아웃)
    ///
    /// 사용자 토큰 집합의 모든 멤버에 대해 `refresh:<token>` 키를 동시에 삭제하고,
    /// 모든 삭제가 끝난 뒤 집합 키 자체를 삭제합니다. 개별 삭제 실패는 롤백하지 않고
    /// 결과의 `failed_keys`에 기록합니다.
    ///
    /// # Errors
    ///
    /// * `AppError::StoreUnavailable` - 저장소 미연결 (보안 작업이므로 조용히 넘어가지 않음)
    /// * `AppError::ValidationError` - 빈 사용자 ID
    /// * `AppError::RedisError` - 집합 조회 또는 집합 키 삭제 실패
    pub async fn revoke_all_for_user(&self, user_id: &str) -> AppResult<RevocationReport> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::ValidationError("user_id is required".to_string()));
        }

        let state = self.store.state();
        if !state.is_ready() {
            log::error!("Redis 미연결 ({}) - 사용자 {} 세션 폐기 불가", state, user_id);
            return Err(AppError::StoreUnavailable(format!(
                "Redis 연결 상태: {}",
                state
            )));
        }

        let set_key = user_tokens_key(user_id);
        let members = self.store.set_members(&set_key).await?;
        if members.is_empty() {
            log::info!("폐기할 토큰 없음 - user_id: {}", user_id);
            return Ok(RevocationReport::empty(user_id));
        }

        log::info!("사용자 모든 세션 폐기 시작 - user_id: {}, 토큰 {}개", user_id, members.len());

        let keys: Vec<String> = members.iter().map(|m| refresh_key(m)).collect();
        let results = join_all(keys.iter().map(|key| self.store.del(key))).await;

        let mut revoked = 0;
        let mut failed_keys = Vec::new();
        for (key, result) in keys.into_iter().zip(results) {
            match result {
                Ok(_) => revoked += 1,
                Err(e) => {
                    log::warn!("Refresh token 삭제 실패 - {}: {}", key, e);
                    failed_keys.push(key);
                }
            }
        }

        if let Err(e) = self.store.del(&set_key).await {
            log::error!("사용자 토큰 집합 삭제 실패 - {}: {}", set_key, e);
            return Err(e);
        }

        let report = RevocationReport {
            user_id: user_id.to_string(),
            requested: members.len(),
            revoked,
            failed_keys,
        };

        if report.is_complete() {
            log::info!("사용자 모든 세션 폐기 완료 - user_id: {}, {}개 폐기", user_id, revoked);
        } else {
            log::warn!(
                "사용자 세션 일부 폐기 실패 - user_id: {}, 폐기 {}/{}, 실패 키: {:?}",
                user_id,
                report.revoked,
                report.requested,
                report.failed_keys
            );
        }

        Ok(report)
    }

    /// 저장소 상태 확인. 에러를 반환하지 않습니다.
    pub async fn health_check(&self) -> HealthStatus {
        if !self.store.state().is_ready() {
            return HealthStatus::Disconnected;
        }

        match self.store.ping().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy {
                error: e.to_string(),
            },
        }
    }

    /// 저장소 연결을 정상 종료합니다.
    ///
    /// 종료 중 발생한 에러는 로그만 남기며, 연결 핸들은 항상 해제됩니다.
    pub async fn shutdown(&self) {
        if self.store.state() == ConnectionState::Closed {
            return;
        }

        match self.store.close().await {
            Ok(()) => log::info!("세션 저장소 종료 완료"),
            Err(e) => log::warn!("세션 저장소 종료 중 오류 (무시): {}", e),
        }
    }
}
