//! 키-값 저장소 추상화
//!
//! 세션 저장소가 사용하는 최소한의 명령 집합을 trait으로 정의합니다.
//! 운영 환경에서는 [`RedisClient`](super::redis::RedisClient)를,
//! 테스트에서는 [`MemoryStore`](super::memory::MemoryStore)를 주입합니다.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::core::errors::AppResult;

/// 저장소 연결 상태
///
/// ```text
///  Disconnected ──handshake──▶ Connecting ──PING──▶ Ready
///       ▲                                              │
///       └──────────────── transport error ─────────────┘
///
///  Ready / Disconnected ──shutdown──▶ Closed (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    Closed,
}

impl ConnectionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionState::Ready)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// 세션 저장소가 요구하는 키-값 명령
///
/// 모든 명령은 저장소 수준에서 원자적인 단일 명령입니다.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 현재 연결 상태
    fn state(&self) -> ConnectionState;

    /// 연결 확인 (PING)
    async fn ping(&self) -> AppResult<()>;

    /// 만료 시간(초)과 함께 문자열 값을 저장합니다 (SET EX).
    async fn set_with_expiry(&self, key: &str, value: &str, seconds: u64) -> AppResult<()>;

    /// 키 존재 여부 (EXISTS)
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// 집합의 모든 멤버 (SMEMBERS). 키가 없으면 빈 벡터를 반환합니다.
    async fn set_members(&self, key: &str) -> AppResult<Vec<String>>;

    /// 키 삭제 (DEL). 실제로 삭제되었으면 `true`.
    async fn del(&self, key: &str) -> AppResult<bool>;

    /// 연결을 정상 종료하고 핸들을 해제합니다.
    ///
    /// 종료 명령이 실패하더라도 핸들은 반드시 해제되고 상태는 `Closed`가 됩니다.
    async fn close(&self) -> AppResult<()>;
}
