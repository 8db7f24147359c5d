//! 에러 타입 정의.
//!
//! 청크/배치 단위 오류는 기록 후 건너뛰는 결과로 취급되며,
//! 실행 전체를 중단시키는 것은 `CalendarUnavailable`, `Config`,
//! 그리고 시작 시점의 `SinkUnavailable`뿐입니다.

use thiserror::Error;

use factor_core::CoreError;
use factor_data::{DataError, ProviderError};

/// 동기화 에러 타입
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// 거래일 범위를 결정할 수 없음
    #[error("거래일 계산 불가: {0}")]
    CalendarUnavailable(String),

    /// 종목 유니버스 조회 실패
    #[error("종목 목록 조회 실패: {0}")]
    UniverseUnavailable(String),

    /// 재시도 한도 소진
    #[error("청크 {chunk} 조회 실패 ({attempts}회 시도): {reason}")]
    FetchFailed {
        chunk: usize,
        attempts: u32,
        reason: String,
    },

    /// 저장 불가능한 값으로 인한 즉시 건너뜀
    #[error("청크 {chunk} 저장 불가능한 값: {reason}")]
    NonRetryableValue { chunk: usize, reason: String },

    /// 치명적 오류로 처리 단위 중단
    #[error("청크 {chunk}에서 처리 중단: {reason}")]
    FetchAborted { chunk: usize, reason: String },

    /// 와이드 테이블 구조 오류
    #[error("{unit} 정규화 실패: {reason}")]
    NormalizationFailed { unit: String, reason: String },

    /// 기본키 충돌로 배치 전체 거부
    #[error("배치 {batch} 기본키 충돌: {reason}")]
    ConstraintViolation { batch: usize, reason: String },

    /// 충돌 외 쓰기 실패
    #[error("배치 {batch} 쓰기 실패: {reason}")]
    WriteFailed { batch: usize, reason: String },

    /// 싱크 연결 불가
    #[error("저장소 연결 불가: {0}")]
    SinkUnavailable(String),

    /// 설정 에러
    #[error("설정 오류: {0}")]
    Config(String),
}

impl SyncError {
    /// 중대한 오류 여부.
    ///
    /// 실행 시작 시점에 발생하면 실행을 중단하고, 처리 단위 중에 발생하면
    /// 해당 단위만 실패시키되 error 수준으로 기록합니다.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CalendarUnavailable(_) | Self::Config(_) | Self::SinkUnavailable(_)
        )
    }
}

impl From<CoreError> for SyncError {
    fn from(err: CoreError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<ProviderError> for SyncError {
    fn from(err: ProviderError) -> Self {
        Self::Config(format!("데이터 제공자 초기화 실패: {}", err))
    }
}

impl From<DataError> for SyncError {
    fn from(err: DataError) -> Self {
        Self::SinkUnavailable(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(SyncError::CalendarUnavailable("x".into()).is_fatal());
        assert!(SyncError::Config("x".into()).is_fatal());
        assert!(!SyncError::FetchFailed {
            chunk: 1,
            attempts: 3,
            reason: "timeout".into()
        }
        .is_fatal());
        assert!(!SyncError::ConstraintViolation {
            batch: 0,
            reason: "dup".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_from_core_error() {
        let err: SyncError = CoreError::InvalidDate("2024-13-01".into()).into();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
