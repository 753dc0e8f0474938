//! # Domain Layer Module
//!
//! 세션 저장소의 도메인 타입을 정의합니다.
//!
//! ## 모듈 구성
//!
//! - [`token`] - Redis 키 이름 규칙, 토큰 클레임, 블랙리스트 항목, 폐기 결과, 헬스 상태
//!
//! ## 키 이름 규칙
//!
//! | 키 | 값 | 수명 | 생성 주체 |
//! |----|----|------|-----------|
//! | `blacklist:<accessToken>` | `{ user_id, blacklisted_at }` | 토큰 남은 수명 | 로그아웃 |
//! | `user:<user_id>:tokens` | Refresh Token 집합 | 발급자 관리 | 토큰 발급자 |
//! | `refresh:<token>` | 발급자 정의 | 발급자 관리 | 토큰 발급자 |

pub mod token;

pub use token::*;
