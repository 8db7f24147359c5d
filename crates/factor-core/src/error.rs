//! 코어 타입의 에러 정의.

use thiserror::Error;

/// 코어 타입 생성/파싱 에러.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// 날짜 형식 오류
    #[error("잘못된 날짜 형식: {0} (YYYYMMDD 또는 YYYY-MM-DD)")]
    InvalidDate(String),

    /// 시작일이 종료일보다 늦음
    #[error("잘못된 날짜 범위: {start} > {end}")]
    InvalidRange { start: String, end: String },

    /// SQL 식별자로 사용할 수 없는 이름
    #[error("잘못된 테이블 이름: {0}")]
    InvalidIdentifier(String),
}

/// 코어 작업 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;
