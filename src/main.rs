//! 세션 저장소 관리 도구
//!
//! 운영 중인 Redis 세션 저장소에 대해 헬스 체크, 토큰 블랙리스트 등록/조회,
//! 사용자 전체 세션 폐기를 수행합니다.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use env_logger::Env;
use log::{error, info};
use payroll_session_store::caching::redis::RedisClient;
use payroll_session_store::config::{BlacklistFailMode, StoreConfig};
use payroll_session_store::core::errors::{AppResult, ErrorContext};
use payroll_session_store::repositories::sessions::SessionStore;

#[derive(Parser, Debug)]
#[command(name = "payroll-sessions", about = "Payroll session store administration.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print store health as JSON
    Health,
    /// Blacklist an access token until its own expiry (token must already be verified)
    Blacklist {
        token: String,
    },
    /// Check whether an access token is blacklisted
    Check {
        token: String,
    },
    /// Revoke every refresh token of a user (logout from all devices)
    RevokeUser {
        user_id: String,
    },
}

#[actix_web::main]
async fn main() -> ExitCode {
    load_env_file();
    init_logging();

    let cli = Cli::parse();

    let config = StoreConfig::from_env();
    info!("📡 Redis 연결 중... ({})", config.display_addr());

    let redis = match RedisClient::connect(&config).await {
        Ok(redis) => Arc::new(redis),
        Err(e) => {
            error!("Redis 클라이언트 생성 실패: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let sessions = SessionStore::new(redis, BlacklistFailMode::from_env());

    let result = run(&sessions, cli.command).await;
    sessions.shutdown().await;

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// 명령을 실행하고 결과를 표준 출력에 JSON으로 출력합니다.
///
/// `Ok(false)`는 명령은 실행되었지만 기대한 결과가 아님을 의미합니다
/// (비정상 헬스 상태, 블랙리스트 등록 실패, 일부 폐기 실패).
async fn run(sessions: &SessionStore<RedisClient>, command: Command) -> AppResult<bool> {
    match command {
        Command::Health => {
            let status = sessions.health_check().await;
            print_json(&status)?;
            Ok(status.is_healthy())
        }
        Command::Blacklist { token } => {
            let blacklisted = sessions.blacklist(&token).await;
            print_json(&serde_json::json!({ "blacklisted": blacklisted }))?;
            Ok(blacklisted)
        }
        Command::Check { token } => {
            let blacklisted = sessions.is_blacklisted(&token).await;
            print_json(&serde_json::json!({ "blacklisted": blacklisted }))?;
            Ok(true)
        }
        Command::RevokeUser { user_id } => {
            let report = sessions.revoke_all_for_user(&user_id).await?;
            print_json(&report)?;
            Ok(report.is_complete())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value).context("결과 직렬화 실패")?;
    println!("{}", json);
    Ok(())
}

/// 환경별 설정 파일을 로드합니다
///
/// * `PROFILE=dev` - .env.dev 파일 로드 (기본값)
/// * `PROFILE=prod` - .env.prod 파일 로드
/// * 기타 - 기본 .env 파일 로드
fn load_env_file() {
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "dev".to_string());

    // 로거 초기화 전이므로 결과는 stderr로만 남긴다
    let loaded = match profile.as_str() {
        "prod" => dotenv::from_filename(".env.prod").map(|_| ".env.prod"),
        "dev" => dotenv::from_filename(".env.dev").map(|_| ".env.dev"),
        _ => dotenv().map(|_| ".env"),
    };

    if let Err(e) = loaded {
        eprintln!("환경 파일 로드 실패 (profile: {}): {}", profile, e);
    }
}

/// 로깅 시스템을 초기화합니다
///
/// 환경변수 RUST_LOG를 기반으로 로깅 레벨을 설정합니다. 기본값은 info 입니다.
fn init_logging() {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
}
