//! 세션/토큰 저장소 모듈
//!
//! 로그아웃 시 Access Token 무효화와 "모든 기기에서 로그아웃"을 위한
//! Refresh Token 일괄 폐기를 담당합니다.
//!
//! # Features
//!
//! - **Access Token Blacklist**: 토큰의 남은 수명만큼 TTL을 가진 항목으로 자동 만료
//! - **다중 기기 폐기**: 사용자 토큰 집합의 모든 Refresh Token 동시 삭제
//! - **실패 정책**: 조회는 fail open(설정 가능), 일괄 폐기는 fail closed
//! - **헬스 체크 / 정상 종료**
//!
//! # Usage
//!
//! ```rust,ignore
//! use payroll_session_store::repositories::sessions::SessionStore;
//!
//! let sessions = SessionStore::new(redis, BlacklistFailMode::from_env());
//!
//! if sessions.is_blacklisted(token).await {
//!     return Err(AppError::ValidationError("revoked token".into()));
//! }
//! ```

pub mod session_store;

pub use session_store::*;
