//! 인메모리 키-값 저장소
//!
//! Redis 없이 세션 저장소를 구동하기 위한 [`KeyValueStore`] 구현입니다.
//! 키별 만료(TTL), 연결 상태 강제 전환, 명령 실패 주입을 지원하므로
//! 요청 처리 코드의 테스트 대역으로 사용합니다.
//!
//! 만료 시각은 `tokio::time::Instant` 기준이므로 `start_paused` 테스트에서
//! `tokio::time::advance`로 시간을 앞당길 수 있습니다.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::caching::store::{ConnectionState, KeyValueStore};
use crate::core::errors::{AppError, AppResult};

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// 인메모리 저장소
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    state: RwLock<ConnectionState>,
    failing: AtomicBool,
    failing_keys: Mutex<HashSet<String>>,
    failing_commands: Mutex<HashSet<(String, String)>>,
    deletes: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// `Disconnected` 상태의 빈 저장소
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            state: RwLock::new(ConnectionState::Disconnected),
            failing: AtomicBool::new(false),
            failing_keys: Mutex::new(HashSet::new()),
            failing_commands: Mutex::new(HashSet::new()),
            deletes: AtomicUsize::new(0),
        }
    }

    /// 바로 사용할 수 있는(`Ready`) 빈 저장소
    pub fn ready() -> Self {
        let store = Self::new();
        store.set_state(ConnectionState::Ready);
        store
    }

    /// 연결 상태를 강제로 지정합니다.
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// 모든 명령을 실패시킵니다. 연결 상태는 바뀌지 않습니다.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// 특정 키에 대한 명령만 실패시킵니다.
    pub fn fail_key(&self, key: &str) {
        self.lock_failing_keys().insert(key.to_string());
    }

    /// 특정 키에 대한 특정 명령(`"smembers"`, `"del"` 등)만 실패시킵니다.
    pub fn fail_command(&self, command: &str, key: &str) {
        self.failing_commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((command.to_lowercase(), key.to_string()));
    }

    /// 만료 없이 문자열 값을 저장합니다.
    pub fn insert(&self, key: &str, value: &str) {
        self.lock_entries().insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: None,
            },
        );
    }

    /// 집합에 멤버를 추가합니다 (SADD).
    pub fn add_member(&self, key: &str, member: &str) {
        let mut entries = self.lock_entries();
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Set(BTreeSet::new()),
            expires_at: None,
        });
        if let Value::Set(members) = &mut entry.value {
            members.insert(member.to_string());
        }
    }

    /// 만료되지 않은 문자열 값
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.lock_entries();
        match Self::live(&mut entries, key).map(|e| &e.value) {
            Some(Value::Text(text)) => Some(text.clone()),
            _ => None,
        }
    }

    /// 남은 만료 시간. 키가 없거나 만료가 없으면 `None`.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let mut entries = self.lock_entries();
        let now = Instant::now();
        Self::live(&mut entries, key)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let mut entries = self.lock_entries();
        Self::live(&mut entries, key).is_some()
    }

    /// 지금까지 실행된 DEL 명령 수
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a Entry> {
        if entries.get(key).is_some_and(|e| e.is_expired(Instant::now())) {
            entries.remove(key);
        }
        entries.get(key)
    }

    fn check(&self, command: &str, key: Option<&str>) -> AppResult<()> {
        let state = self.state();
        if !state.is_ready() {
            return Err(AppError::StoreUnavailable(format!("저장소 연결 상태: {}", state)));
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::RedisError("injected failure".to_string()));
        }
        if let Some(key) = key {
            let by_command = self
                .failing_commands
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&(command.to_string(), key.to_string()));
            if by_command || self.lock_failing_keys().contains(key) {
                return Err(AppError::RedisError(format!(
                    "injected failure for {} {}",
                    command, key
                )));
            }
        }
        Ok(())
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_failing_keys(&self) -> MutexGuard<'_, HashSet<String>> {
        self.failing_keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn state(&self) -> ConnectionState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    async fn ping(&self) -> AppResult<()> {
        self.check("ping", None)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, seconds: u64) -> AppResult<()> {
        self.check("set", Some(key))?;
        if seconds == 0 {
            return Err(AppError::RedisError("invalid expire time in 'set' command".to_string()));
        }

        self.lock_entries().insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: Some(Instant::now() + Duration::from_secs(seconds)),
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.check("exists", Some(key))?;
        Ok(self.contains_key(key))
    }

    async fn set_members(&self, key: &str) -> AppResult<Vec<String>> {
        self.check("smembers", Some(key))?;

        let mut entries = self.lock_entries();
        match Self::live(&mut entries, key).map(|e| &e.value) {
            Some(Value::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(Value::Text(_)) => Err(AppError::RedisError(
                "WRONGTYPE Operation against a key holding the wrong kind of value".to_string(),
            )),
            None => Ok(Vec::new()),
        }
    }

    async fn del(&self, key: &str) -> AppResult<bool> {
        self.check("del", Some(key))?;
        self.deletes.fetch_add(1, Ordering::SeqCst);

        let mut entries = self.lock_entries();
        let existed = Self::live(&mut entries, key).is_some();
        entries.remove(key);
        Ok(existed)
    }

    async fn close(&self) -> AppResult<()> {
        self.set_state(ConnectionState::Closed);
        Ok(())
    }
}
