//! 청크 단위 조회.
//!
//! 종목 목록을 고정 크기 청크로 나누고 청크마다 재시도 정책을 적용합니다.
//! 한 청크의 실패는 기록 후 건너뛰며 나머지 청크는 계속 진행합니다.

use std::time::Duration;

use tracing::{debug, error, warn};

use factor_core::{DateRange, WideTable};
use factor_data::{FetchErrorKind, ProviderError};

use super::retry::{RetryAction, RetryPolicy, RetryState};
use super::strategy::SyncStrategy;
use crate::error::SyncError;

/// 종목 목록을 `size` 크기 청크로 분할 (마지막 청크는 더 작을 수 있음).
pub fn partition(entities: &[String], size: usize) -> std::slice::Chunks<'_, String> {
    entities.chunks(size.max(1))
}

/// 조회된 청크.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedChunk {
    pub index: usize,
    pub table: WideTable,
}

/// 처리 단위 하나의 조회 결과.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub tables: Vec<FetchedChunk>,
    pub failures: Vec<SyncError>,
    pub chunk_count: usize,
    /// 치명적 오류로 나머지 청크를 포기했는지
    pub aborted: bool,
}

impl FetchOutcome {
    /// 비어있지 않은 유니버스에서 모든 청크가 실패했는지.
    pub fn all_failed(&self) -> bool {
        self.chunk_count > 0 && self.failures.len() >= self.chunk_count
    }
}

/// 청크 단위 조회기.
pub struct BatchFetcher {
    chunk_size: usize,
    policy: RetryPolicy,
    chunk_delay: Duration,
}

impl BatchFetcher {
    pub fn new(chunk_size: usize, policy: RetryPolicy, chunk_delay: Duration) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            policy,
            chunk_delay,
        }
    }

    /// 전체 청크 조회.
    pub async fn fetch(
        &self,
        strategy: &dyn SyncStrategy,
        entities: &[String],
        range: DateRange,
    ) -> FetchOutcome {
        let chunks: Vec<&[String]> = partition(entities, self.chunk_size).collect();
        let mut outcome = FetchOutcome {
            chunk_count: chunks.len(),
            ..Default::default()
        };

        for (index, chunk) in chunks.iter().enumerate() {
            if index > 0 && !self.chunk_delay.is_zero() {
                tokio::time::sleep(self.chunk_delay).await;
            }

            debug!(
                chunk = index,
                size = chunk.len(),
                progress = format!("{}/{}", index + 1, outcome.chunk_count),
                "청크 조회 시작"
            );

            match self.fetch_chunk(strategy, index, chunk, range).await {
                Ok(table) => outcome.tables.push(FetchedChunk { index, table }),
                Err(e @ SyncError::FetchAborted { .. }) => {
                    error!(chunk = index, error = %e, "치명적 오류, 처리 단위 중단");
                    outcome.failures.push(e);
                    outcome.aborted = true;
                    break;
                }
                Err(e) => {
                    warn!(chunk = index, error = %e, "청크 건너뜀");
                    outcome.failures.push(e);
                }
            }
        }

        outcome
    }

    async fn fetch_chunk(
        &self,
        strategy: &dyn SyncStrategy,
        index: usize,
        chunk: &[String],
        range: DateRange,
    ) -> Result<WideTable, SyncError> {
        let mut state = RetryState::new();

        loop {
            let error = match strategy.fetch_wide(chunk, range).await {
                Ok(table) => return Ok(table),
                Err(e) => e,
            };

            let action = state.record_failure(&self.policy, error);
            let last = state.last_error();
            let reason = last.map(ToString::to_string).unwrap_or_default();
            let value_error =
                last.map(ProviderError::kind) == Some(FetchErrorKind::ValueOutOfRange);

            match action {
                RetryAction::Retry(wait) => {
                    warn!(
                        chunk = index,
                        attempt = state.attempts(),
                        max_attempts = self.policy.max_attempts,
                        wait_secs = wait.as_secs(),
                        error = %reason,
                        "청크 조회 실패, 재시도 대기"
                    );
                    tokio::time::sleep(wait).await;
                }
                RetryAction::Skip if value_error => {
                    return Err(SyncError::NonRetryableValue {
                        chunk: index,
                        reason,
                    });
                }
                RetryAction::Skip => {
                    return Err(SyncError::FetchFailed {
                        chunk: index,
                        attempts: state.attempts(),
                        reason,
                    });
                }
                RetryAction::Abort => {
                    return Err(SyncError::FetchAborted {
                        chunk: index,
                        reason,
                    });
                }
            }
        }
    }
}
