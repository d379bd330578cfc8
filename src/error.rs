use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tonic::{Code, Status};

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A store could not be reached while starting up.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The cache liveness loop gave up after exhausting its retries.
    #[error("Cache link exhausted retries (ping: {ping}; rebuild: {rebuild})")]
    CacheExhausted { ping: String, rebuild: String },

    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// The connection pool could not be built.
    #[error("Pool creation error: {0}")]
    CreatePool(#[from] deadpool_postgres::BuildError),

    /// A remote identity call failed or was cancelled.
    #[error("RPC error: {0}")]
    Rpc(#[from] Status),

    /// The RPC transport could not be set up.
    #[error("RPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// An authentication error.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A resource not found error.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An account with the same login already exists.
    #[error("Account already exists: {0}")]
    AccountExists(String),

    /// An encoding or decoding error for cached records.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A password hashing error.
    #[error("Hashing error: {0}")]
    Hashing(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<sonic_rs::Error> for AppError {
    fn from(e: sonic_rs::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl AppError {
    /// Whether the failure comes from store connectivity rather than the request itself.
    pub fn is_unavailable(&self) -> bool {
        match self {
            AppError::Connection(_)
            | AppError::CacheExhausted { .. }
            | AppError::Redis(_)
            | AppError::Pool(_) => true,
            AppError::Database(e) => e.is_closed(),
            _ => false,
        }
    }
}

impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(what) => Status::not_found(format!("{what} not found")),
            AppError::Validation(msg) => Status::invalid_argument(msg),
            AppError::Rpc(status) => status,
            ref e if e.is_unavailable() => {
                tracing::error!("Store unavailable: {}", e);
                Status::unavailable(e.to_string())
            }
            e => {
                tracing::error!("Internal error: {}", e);
                Status::internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Connection(ref msg) => {
                tracing::error!("Connection error: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable".to_string())
            }

            AppError::CacheExhausted { ref ping, ref rebuild } => {
                tracing::error!("Cache link exhausted: ping={} rebuild={}", ping, rebuild);
                (StatusCode::SERVICE_UNAVAILABLE, "Cache unavailable".to_string())
            }

            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "Cache unavailable".to_string())
            }

            AppError::Database(ref e) if e.is_closed() => {
                tracing::error!("Database connection lost: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable".to_string())
            }

            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable".to_string())
            }

            AppError::CreatePool(ref e) => {
                tracing::error!("Pool creation error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Rpc(ref status) => match status.code() {
                Code::NotFound | Code::Unauthenticated => {
                    tracing::warn!("Identity rejected: {}", status.message());
                    (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
                }
                Code::DeadlineExceeded | Code::Cancelled | Code::Unavailable => {
                    tracing::error!("Identity service unavailable: {}", status);
                    (StatusCode::SERVICE_UNAVAILABLE, "Identity service unavailable".to_string())
                }
                _ => {
                    tracing::error!("Identity call failed: {}", status);
                    (StatusCode::BAD_GATEWAY, "Identity service error".to_string())
                }
            },

            AppError::Transport(ref e) => {
                tracing::error!("RPC transport error: {}", e);
                (StatusCode::BAD_GATEWAY, "Identity service error".to_string())
            }

            AppError::Authentication(ref msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                (StatusCode::UNAUTHORIZED, msg.clone())
            }

            AppError::NotFound(what) => {
                tracing::debug!("{} not found", what);
                (StatusCode::NOT_FOUND, format!("{what} not found"))
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::AccountExists(ref login) => {
                tracing::debug!("Account already exists: {}", login);
                (StatusCode::CONFLICT, "Account already exists".to_string())
            }

            AppError::Serialization(ref msg) => {
                tracing::error!("Serialization error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Hashing(ref msg) => {
                tracing::error!("Hashing error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_error() -> AppError {
        AppError::Redis(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection reset",
        )))
    }

    #[test]
    fn test_redis_errors_are_unavailable_on_both_surfaces() {
        assert!(redis_error().is_unavailable());
        assert_eq!(Status::from(redis_error()).code(), Code::Unavailable);
        assert_eq!(redis_error().into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_exhausted_cache_is_unavailable_on_both_surfaces() {
        let exhausted = || AppError::CacheExhausted {
            ping: "ping refused".to_string(),
            rebuild: "connection refused".to_string(),
        };
        assert_eq!(Status::from(exhausted()).code(), Code::Unavailable);
        assert_eq!(exhausted().into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_request_errors_keep_their_codes() {
        assert_eq!(Status::from(AppError::NotFound("session")).code(), Code::NotFound);
        assert_eq!(
            Status::from(AppError::Validation("bad login".to_string())).code(),
            Code::InvalidArgument
        );
        assert_eq!(
            AppError::Validation("bad login".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Status::from(AppError::Internal("boom".to_string())).code(),
            Code::Internal
        );
    }
}
