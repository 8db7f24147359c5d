//! 저장소 오류 타입.

use thiserror::Error;

/// PostgreSQL unique_violation SQLSTATE
const PG_UNIQUE_VIOLATION: &str = "23505";

/// 저장소 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 데이터베이스 연결 오류
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    QueryError(String),

    /// 기본키/고유 제약 조건 위반
    #[error("Duplicate record: {0}")]
    DuplicateError(String),

    /// 연결 풀 소진
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DataError {
    /// 기본키 충돌 여부.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, DataError::DuplicateError(_))
    }

    /// 연결 문제 여부 (배치가 아니라 싱크 자체가 불가용).
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            DataError::ConnectionError(_) | DataError::PoolExhausted
        )
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                DataError::ConnectionError(err.to_string())
            }
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                if code == PG_UNIQUE_VIOLATION {
                    DataError::DuplicateError(db_err.message().to_string())
                } else {
                    DataError::QueryError(db_err.message().to_string())
                }
            }
            _ => DataError::QueryError(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(DataError::DuplicateError("pk".into()).is_constraint_violation());
        assert!(!DataError::QueryError("syntax".into()).is_constraint_violation());

        assert!(DataError::PoolExhausted.is_connectivity());
        assert!(DataError::ConnectionError("reset".into()).is_connectivity());
        assert!(!DataError::DuplicateError("pk".into()).is_connectivity());
    }

    #[test]
    fn test_pool_errors_map_to_connectivity() {
        assert!(DataError::from(sqlx::Error::PoolTimedOut).is_connectivity());
        assert!(DataError::from(sqlx::Error::PoolClosed).is_connectivity());
        assert!(!DataError::from(sqlx::Error::RowNotFound).is_connectivity());
    }
}
