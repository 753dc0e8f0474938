//! # Redis 저장소 클라이언트 구현
//!
//! 세션 저장소가 사용하는 Redis 백엔드입니다. 단일 멀티플렉싱 연결을 공유하며,
//! 연결 상태를 명시적으로 추적합니다.
//!
//! ## 연결 관리
//!
//! - 초기 상태는 `Disconnected`이며, TCP 연결(및 AUTH)에 성공하면 `Connecting`,
//!   PING 응답을 받으면 `Ready`가 됩니다.
//! - `Ready` 상태에서 전송 계층 오류(I/O, 연결 끊김, 연결 거부, 타임아웃)가 발생하면
//!   `Disconnected`로 전환하고 백그라운드 재연결을 시작합니다.
//! - 재연결은 `n × 100ms` 간격으로 최대 10회 시도하며, 모두 실패하면 포기합니다.
//!   포기한 이후에는 프로세스 재시작 전까지 재연결하지 않습니다.
//! - `close()` 이후 상태는 `Closed`로 고정되며 더 이상 재연결하지 않습니다.
//!
//! 개별 명령에는 별도의 타임아웃 계층이 없습니다. 응답하지 않는 Redis 호출은
//! 호출한 요청을 그대로 대기시킵니다.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError, RedisResult};

use crate::caching::store::{ConnectionState, KeyValueStore};
use crate::config::{ReconnectPolicy, StoreConfig};
use crate::core::errors::{AppError, AppResult};

/// Redis 저장소 클라이언트
///
/// `Clone`은 같은 연결과 상태를 공유하는 핸들을 만듭니다.
///
/// ## 사용 예제
///
/// ```rust,ignore
/// use payroll_session_store::caching::redis::RedisClient;
/// use payroll_session_store::config::StoreConfig;
///
/// // 초기 연결에 실패해도 클라이언트는 반환되며, 백그라운드에서 재연결합니다.
/// let redis = RedisClient::connect(&StoreConfig::from_env()).await?;
/// redis.set_with_expiry("blacklist:eyJ...", "{}", 900).await?;
/// redis.close().await?;
/// ```
#[derive(Clone)]
pub struct RedisClient {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    addr: String,
    policy: ReconnectPolicy,
    connection: RwLock<Option<MultiplexedConnection>>,
    state: RwLock<ConnectionState>,
    reconnecting: AtomicBool,
    abandoned: AtomicBool,
}

impl RedisClient {
    /// 연결하지 않은 상태(`Disconnected`)의 클라이언트를 생성합니다.
    ///
    /// # Errors
    ///
    /// * `AppError::ConfigError` - 접속 URL이 올바르지 않은 경우
    pub fn new(config: &StoreConfig) -> AppResult<Self> {
        Self::with_policy(config, ReconnectPolicy::default())
    }

    pub fn with_policy(config: &StoreConfig, policy: ReconnectPolicy) -> AppResult<Self> {
        let addr = config.display_addr();
        let client = Client::open(config.connection_url())
            .map_err(|e| AppError::ConfigError(format!("잘못된 Redis 설정 ({}): {}", addr, e)))?;

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                addr,
                policy,
                connection: RwLock::new(None),
                state: RwLock::new(ConnectionState::Disconnected),
                reconnecting: AtomicBool::new(false),
                abandoned: AtomicBool::new(false),
            }),
        })
    }

    /// 클라이언트를 생성하고 초기 연결을 시도합니다.
    ///
    /// 초기 연결 실패는 에러로 반환하지 않습니다. 로그를 남기고 재연결 정책에 따라
    /// 백그라운드에서 재시도하며, 그동안 모든 연산은 실패 정책에 따라 동작합니다.
    pub async fn connect(config: &StoreConfig) -> AppResult<Self> {
        let client = Self::new(config)?;

        match client.start().await {
            Ok(()) => log::info!("✅ Redis 연결 성공 ({})", client.addr()),
            Err(e) => log::error!(
                "❌ Redis 초기 연결 실패 ({}): {}. 백그라운드에서 재연결합니다",
                client.addr(),
                e
            ),
        }

        Ok(client)
    }

    /// 연결을 시작합니다. 실패하면 재연결을 예약하고 에러를 반환합니다.
    pub async fn start(&self) -> AppResult<()> {
        let result = self.handshake().await;
        if result.is_err() {
            self.schedule_reconnect();
        }
        result
    }

    pub fn addr(&self) -> &str {
        &self.inner.addr
    }

    /// 재연결 시도가 모두 실패하여 포기했는지 여부
    pub fn is_reconnect_abandoned(&self) -> bool {
        self.inner.abandoned.load(Ordering::SeqCst)
    }

    async fn handshake(&self) -> AppResult<()> {
        if self.state() == ConnectionState::Closed {
            return Err(AppError::StoreUnavailable("Redis 클라이언트가 종료되었습니다".to_string()));
        }

        let mut conn = self.inner.client.get_multiplexed_async_connection().await?;
        self.transition(ConnectionState::Connecting);

        if let Err(e) = redis::cmd("PING").query_async::<()>(&mut conn).await {
            self.transition(ConnectionState::Disconnected);
            return Err(e.into());
        }

        // close()와 경합하지 않도록 연결 슬롯을 잡은 채로 상태를 확인한다
        let mut slot = self.inner.connection.write().unwrap_or_else(PoisonError::into_inner);
        if self.state() == ConnectionState::Closed {
            return Err(AppError::StoreUnavailable("Redis 클라이언트가 종료되었습니다".to_string()));
        }
        *slot = Some(conn);
        self.transition(ConnectionState::Ready);
        Ok(())
    }

    /// 상태를 전환합니다. `Closed`에서는 빠져나갈 수 없습니다.
    ///
    /// 상태가 실제로 바뀌었으면 `true`를 반환합니다.
    fn transition(&self, next: ConnectionState) -> bool {
        let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
        if *state == next || *state == ConnectionState::Closed {
            return false;
        }
        log::debug!("Redis 연결 상태 변경 ({}): {} → {}", self.inner.addr, *state, next);
        *state = next;
        true
    }

    fn schedule_reconnect(&self) {
        if self.is_reconnect_abandoned() || self.state() == ConnectionState::Closed {
            return;
        }
        if self.inner.reconnecting.swap(true, Ordering::SeqCst) {
            return;
        }

        let client = self.clone();
        tokio::spawn(async move {
            client.reconnect_loop().await;
            client.inner.reconnecting.store(false, Ordering::SeqCst);

            // 재연결 직후 다시 끊긴 경우
            if client.state() == ConnectionState::Disconnected {
                client.schedule_reconnect();
            }
        });
    }

    async fn reconnect_loop(&self) {
        let policy = self.inner.policy;

        for attempt in 1..=policy.max_attempts {
            tokio::time::sleep(policy.delay_for(attempt)).await;

            if self.state() == ConnectionState::Closed {
                log::debug!("Redis 클라이언트가 종료되어 재연결을 중단합니다");
                return;
            }

            match self.handshake().await {
                Ok(()) => {
                    log::info!("✅ Redis 재연결 성공 ({}, {}회 시도)", self.inner.addr, attempt);
                    return;
                }
                Err(e) => log::warn!(
                    "Redis 재연결 실패 ({}/{}): {}",
                    attempt,
                    policy.max_attempts,
                    e
                ),
            }
        }

        if self.state() != ConnectionState::Closed {
            self.inner.abandoned.store(true, Ordering::SeqCst);
            log::error!(
                "❌ Redis 재연결 {}회 실패 ({}). 재시작 전까지 연결 끊김 상태 유지",
                policy.max_attempts,
                self.inner.addr
            );
        }
    }

    fn ready_connection(&self) -> AppResult<MultiplexedConnection> {
        let state = self.state();
        if !state.is_ready() {
            return Err(AppError::StoreUnavailable(format!("Redis 연결 상태: {}", state)));
        }

        self.inner
            .connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| AppError::StoreUnavailable("Redis 연결 핸들이 없습니다".to_string()))
    }

    /// 연결이 준비된 경우에만 명령을 실행하고, 전송 계층 오류는 연결 끊김으로 처리합니다.
    async fn run<T, F, Fut>(&self, op: F) -> AppResult<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let conn = self.ready_connection()?;

        op(conn).await.map_err(|e| {
            if is_transport_error(&e) {
                self.mark_disconnected(&e);
            }
            AppError::from(e)
        })
    }

    fn mark_disconnected(&self, err: &RedisError) {
        if self.state() == ConnectionState::Closed {
            return;
        }

        self.inner.connection.write().unwrap_or_else(PoisonError::into_inner).take();
        if self.transition(ConnectionState::Disconnected) {
            log::warn!("⚠️ Redis 연결 끊김 ({}): {}", self.inner.addr, err);
            self.schedule_reconnect();
        }
    }
}

fn is_transport_error(err: &RedisError) -> bool {
    err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
}

#[async_trait]
impl KeyValueStore for RedisClient {
    fn state(&self) -> ConnectionState {
        *self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    async fn ping(&self) -> AppResult<()> {
        self.run(|mut conn| async move { redis::cmd("PING").query_async::<()>(&mut conn).await })
            .await
    }

    async fn set_with_expiry(&self, key: &str, value: &str, seconds: u64) -> AppResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.run(move |mut conn| async move {
            conn.set_ex::<_, _, ()>(&key, &value, seconds).await
        })
        .await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let key = key.to_string();
        self.run(move |mut conn| async move { conn.exists::<_, bool>(&key).await })
            .await
    }

    async fn set_members(&self, key: &str) -> AppResult<Vec<String>> {
        let key = key.to_string();
        self.run(move |mut conn| async move { conn.smembers::<_, Vec<String>>(&key).await })
            .await
    }

    async fn del(&self, key: &str) -> AppResult<bool> {
        let key = key.to_string();
        let removed: i64 = self
            .run(move |mut conn| async move { conn.del::<_, i64>(&key).await })
            .await?;
        Ok(removed > 0)
    }

    async fn close(&self) -> AppResult<()> {
        {
            // 상태를 먼저 Closed로 고정해야 진행 중인 재연결이 연결을 되살리지 않는다
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            *state = ConnectionState::Closed;
        }

        let taken = self.inner.connection.write().unwrap_or_else(PoisonError::into_inner).take();
        match taken {
            Some(mut conn) => {
                let result = redis::cmd("QUIT").query_async::<()>(&mut conn).await;
                drop(conn);
                log::info!("Redis 연결 종료 ({})", self.inner.addr);
                result.map_err(AppError::from)
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpSocket, TcpStream};
    use tokio::task::{JoinHandle, JoinSet};

    use crate::config::BlacklistFailMode;
    use crate::domain::token::HealthStatus;
    use crate::repositories::sessions::SessionStore;

    /// 최소한의 RESP 서버를 띄웁니다. 핸들을 abort하면 모든 클라이언트 소켓이 닫힙니다.
    fn spawn_resp_server(addr: SocketAddr) -> (SocketAddr, JoinHandle<()>) {
        let socket = TcpSocket::new_v4().unwrap();
        socket.set_reuseaddr(true).unwrap();
        socket.bind(addr).unwrap();
        let listener = socket.listen(16).unwrap();
        let local = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut connections = JoinSet::new();
            while let Ok((stream, _)) = listener.accept().await {
                connections.spawn(serve_connection(stream));
            }
        });
        (local, server)
    }

    async fn serve_connection(stream: TcpStream) {
        let mut stream = BufReader::new(stream);
        while let Some(args) = read_command(&mut stream).await {
            let reply: &[u8] = match args.first().map(|a| a.to_ascii_uppercase()).as_deref() {
                Some("PING") => b"+PONG\r\n",
                Some("EXISTS") | Some("DEL") => b":0\r\n",
                Some("SMEMBERS") => b"*0\r\n",
                _ => b"+OK\r\n",
            };
            if stream.get_mut().write_all(reply).await.is_err() {
                return;
            }
        }
    }

    async fn read_command(stream: &mut BufReader<TcpStream>) -> Option<Vec<String>> {
        let mut line = String::new();
        if stream.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let count: usize = line.trim().strip_prefix('*')?.parse().ok()?;

        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            line.clear();
            stream.read_line(&mut line).await.ok()?;
            let len: usize = line.trim().strip_prefix('$')?.parse().ok()?;
            let mut buf = vec![0; len + 2];
            stream.read_exact(&mut buf).await.ok()?;
            buf.truncate(len);
            args.push(String::from_utf8_lossy(&buf).into_owned());
        }
        Some(args)
    }

    async fn wait_for_state(client: &RedisClient, expected: ConnectionState) {
        for _ in 0..200 {
            if client.state() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn unreachable_config() -> StoreConfig {
        StoreConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            password: None,
        }
    }

    #[test]
    fn test_new_client_starts_disconnected() {
        let client = RedisClient::new(&StoreConfig::default()).unwrap();

        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.addr(), "localhost:6379");
        assert!(!client.is_reconnect_abandoned());
    }

    #[test]
    fn test_invalid_host_is_config_error() {
        let config = StoreConfig {
            host: "bad host".to_string(),
            port: 6379,
            password: None,
        };

        match RedisClient::new(&config) {
            Err(AppError::ConfigError(msg)) => assert!(msg.contains("bad host")),
            Err(other) => panic!("Expected ConfigError, got {:?}", other),
            Ok(_) => panic!("Expected ConfigError"),
        }
    }

    #[tokio::test]
    async fn test_commands_fail_soft_before_connect() {
        let client = RedisClient::new(&StoreConfig::default()).unwrap();

        let err = client.exists("blacklist:abc").await.unwrap_err();
        assert!(err.is_unavailable());

        let err = client.set_members("user:1:tokens").await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_close_without_connection_is_terminal() {
        let client = RedisClient::new(&StoreConfig::default()).unwrap();

        client.close().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Closed);

        // Closed에서는 다른 상태로 전환되지 않는다
        assert!(!client.transition(ConnectionState::Ready));
        assert_eq!(client.state(), ConnectionState::Closed);

        // 두 번 호출해도 안전하다
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_start_stays_disconnected_until_closed() {
        let client = RedisClient::new(&unreachable_config()).unwrap();

        assert!(client.start().await.is_err());
        assert_eq!(client.state(), ConnectionState::Disconnected);

        client.close().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Closed);

        let err = client.start().await.unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_reconnect_gives_up_after_max_attempts() {
        let policy = ReconnectPolicy {
            max_attempts: 3,
            base_delay: std::time::Duration::from_millis(1),
        };
        let client = RedisClient::with_policy(&unreachable_config(), policy).unwrap();

        assert!(client.start().await.is_err());

        for _ in 0..200 {
            if client.is_reconnect_abandoned() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert!(client.is_reconnect_abandoned());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_dropped_connection_disconnects_and_reconnects() {
        let (addr, server) = spawn_resp_server("127.0.0.1:0".parse().unwrap());
        let config = StoreConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            password: None,
        };
        let policy = ReconnectPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(20),
        };
        let client = RedisClient::with_policy(&config, policy).unwrap();

        client.start().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Ready);

        let sessions = SessionStore::new(Arc::new(client.clone()), BlacklistFailMode::Open);
        assert_eq!(sessions.health_check().await, HealthStatus::Healthy);
        assert!(!client.exists("blacklist:abc").await.unwrap());

        // 서버를 내리면 다음 명령에서 전송 계층 오류가 난다
        server.abort();
        let _ = server.await;

        for _ in 0..50 {
            if client.state() == ConnectionState::Disconnected {
                break;
            }
            let _ = client.exists("blacklist:abc").await;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(sessions.health_check().await, HealthStatus::Disconnected);
        assert!(!sessions.is_blacklisted("abc").await);

        // 같은 포트로 서버를 다시 띄우면 백그라운드 재연결로 복구된다
        let (_, server) = spawn_resp_server(addr);
        wait_for_state(&client, ConnectionState::Ready).await;

        assert_eq!(client.state(), ConnectionState::Ready);
        assert!(!client.is_reconnect_abandoned());
        assert_eq!(sessions.health_check().await, HealthStatus::Healthy);

        sessions.shutdown().await;
        assert_eq!(client.state(), ConnectionState::Closed);
        server.abort();
    }
}
