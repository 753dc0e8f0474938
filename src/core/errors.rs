//! # Application Error Handling System
//!
//! 세션 저장소를 위한 통합 에러 처리 시스템입니다.
//! `thiserror`로 에러 타입을 정의하고 `actix_web::ResponseError`를 구현하여
//! 요청 처리 코드가 그대로 HTTP 응답으로 변환할 수 있도록 합니다.
//!
//! ## 실패 정책
//!
//! 세션 저장소의 대부분의 연산은 에러를 밖으로 내보내지 않고 보수적인 기본값
//! (`false`, `Disconnected` 등)을 반환합니다. 이 타입이 호출자에게 전달되는 경우는
//! 사실상 다음 두 가지뿐입니다.
//!
//! - `revoke_all_for_user`: 보안 작업이므로 저장소 장애를 반드시 알립니다
//! - 설정/초기화 단계의 오류 (잘못된 Redis URL 등)
//!
//! ## HTTP 응답 매핑
//!
//! | AppError | HTTP Status | 사용 시나리오 |
//! |----------|-------------|---------------|
//! | `ValidationError` | 400 Bad Request | 빈 사용자 ID 등 입력값 오류 |
//! | `StoreUnavailable` | 503 Service Unavailable | Redis 미연결 상태에서 일괄 폐기 요청 |
//! | `RedisError` | 500 Internal Server Error | Redis 명령 실패 |
//! | `ConfigError` | 500 Internal Server Error | 잘못된 연결 설정 |
//! | `InternalError` | 500 Internal Server Error | 예상치 못한 오류 |
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use payroll_session_store::core::errors::AppError;
//!
//! async fn logout_all(user_id: &str) -> Result<HttpResponse, AppError> {
//!     let report = session_store.revoke_all_for_user(user_id).await?;
//!     Ok(HttpResponse::Ok().json(report))
//! }
//! ```

use thiserror::Error;

/// 애플리케이션 전역 에러 타입
#[derive(Error, Debug)]
pub enum AppError {
    /// Redis 명령 실행 에러 (500 Internal Server Error)
    #[error("Redis error: {0}")]
    RedisError(String),

    /// 저장소 연결이 준비되지 않음 (503 Service Unavailable)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// 설정 에러 (500 Internal Server Error)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 입력값 검증 에러 (400 Bad Request)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 내부 서버 에러 (500 Internal Server Error)
    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    /// 저장소 장애로 인한 에러인지 확인합니다.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AppError::StoreUnavailable(_))
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::RedisError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("JSON 직렬화 실패: {}", err))
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 각 에러 타입을 적절한 HTTP 상태 코드와 JSON 응답으로 변환합니다.
    fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::build(self.status_code())
            .json(serde_json::json!({
                "error": self.to_string()
            }))
    }
}

/// 편의성을 위한 Result 타입 별칭
pub type AppResult<T> = Result<T, AppError>;

/// 직렬화 등 부수 작업의 에러에 설명을 붙여 `InternalError`로 변환합니다.
///
/// ```rust,ignore
/// let json = serde_json::to_string_pretty(&report).context("결과 직렬화 실패")?;
/// ```
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> AppResult<T>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn context(self, msg: &str) -> AppResult<T> {
        self.map_err(|e| AppError::InternalError(format!("{}: {}", msg, e)))
    }
}
