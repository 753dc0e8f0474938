//! # Configuration Module
//!
//! 세션 저장소의 설정 관리를 담당하는 모듈입니다.
//! 환경 변수 기반의 설정값들을 중앙집중식으로 관리합니다.
//!
//! ## 모듈 구성
//!
//! - [`store_config`] - Redis 접속 정보, 재연결 정책, 블랙리스트 실패 정책
//!
//! ## 환경 변수 설정 가이드
//!
//! ```bash
//! # Redis 접속
//! export REDIS_HOST="localhost"
//! export REDIS_PORT="6379"
//! export REDIS_PASSWORD="secret"      # 선택
//!
//! # 저장소 장애 시 블랙리스트 조회 정책
//! export BLACKLIST_FAIL_MODE="open"   # open | closed
//! ```
//!
//! 재연결 정책(최대 10회, 시도 횟수 × 100ms)은 고정값이며 환경 변수로 변경할 수 없습니다.

pub mod store_config;

pub use store_config::*;
