//! # Repository Layer Module
//!
//! 키-값 저장소 위에서 동작하는 데이터 액세스 계층입니다.
//!
//! - [`sessions`] - 토큰 블랙리스트와 사용자 세션 폐기

pub mod sessions;
