//! 급여 관리 백엔드 세션 저장소
//!
//! 급여 관리 웹 애플리케이션의 토큰/세션 생명주기를 관리합니다.
//! 로그아웃 시 Access Token 블랙리스트 등록과 "모든 기기에서 로그아웃"을 위한
//! Refresh Token 일괄 폐기를 Redis 위에서 제공합니다.
//!
//! # Features
//!
//! - **토큰 블랙리스트**: 토큰의 남은 수명만큼만 유지되는 블랙리스트 항목
//! - **세션 일괄 폐기**: 사용자별 Refresh Token 집합의 동시 삭제와 결과 보고
//! - **명시적 연결 생명주기**: `Disconnected → Connecting → Ready`, 선형 백오프 재연결, `Closed`
//! - **실패 정책**: 조회 계열은 보수적인 기본값 반환, 보안 작업은 에러 전파
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Request Handlers   │ ← 외부 (HTTP 계층)
//! └─────────────────────┘
//!          │ Arc<SessionStore<S>>
//!          ▼
//! ┌─────────────────────┐
//! │    SessionStore     │ ← blacklist / is_blacklisted / revoke_all_for_user
//! └─────────────────────┘
//!          │ KeyValueStore
//!          ▼
//! ┌─────────────────────┐
//! │ RedisClient | Memory│ ← 저장소
//! └─────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use payroll_session_store::caching::redis::RedisClient;
//! use payroll_session_store::config::{BlacklistFailMode, StoreConfig};
//! use payroll_session_store::repositories::sessions::SessionStore;
//!
//! let redis = Arc::new(RedisClient::connect(&StoreConfig::from_env()).await?);
//! let sessions = SessionStore::new(redis, BlacklistFailMode::from_env());
//!
//! sessions.blacklist(&access_token).await;
//! let report = sessions.revoke_all_for_user("42").await?;
//! sessions.shutdown().await;
//! ```

pub mod core;
pub mod config;
pub mod caching;
pub mod domain;
pub mod repositories;
