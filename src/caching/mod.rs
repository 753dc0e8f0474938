//! 캐싱 계층 모듈
//!
//! 세션 저장소가 사용하는 키-값 저장소 백엔드를 제공합니다.
//!
//! # 구성
//!
//! - [`store`] - `KeyValueStore` trait과 연결 상태(`ConnectionState`)
//! - [`redis`] - Redis 백엔드 (명시적 연결 생명주기 + 재연결)
//! - [`memory`] - 인메모리 백엔드 (테스트 대역)
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use payroll_session_store::caching::redis::RedisClient;
//! use payroll_session_store::caching::store::KeyValueStore;
//!
//! let cache = RedisClient::connect(&StoreConfig::from_env()).await?;
//! cache.set_with_expiry("blacklist:eyJ...", "{\"user_id\":\"7\"}", 900).await?;
//! let revoked = cache.exists("blacklist:eyJ...").await?;
//! ```
//!
//! # 환경 설정
//!
//! ```bash
//! REDIS_HOST=localhost  # 기본값
//! REDIS_PORT=6379       # 기본값
//! REDIS_PASSWORD=       # 선택
//! ```

pub mod memory;
pub mod redis;
pub mod store;

pub use memory::MemoryStore;
pub use store::{ConnectionState, KeyValueStore};
