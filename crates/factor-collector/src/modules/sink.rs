//! 배치 단위 쓰기.

use std::sync::Arc;

use tracing::{debug, error, warn};

use factor_core::{FactorRecord, TableName};
use factor_data::FactorSink;

use crate::error::SyncError;

/// 쓰기 결과.
#[derive(Debug, Default)]
pub struct WriteOutcome {
    pub inserted: u64,
    pub failed_batches: usize,
    /// 연결 불가로 쓰기를 중단했는지
    pub sink_unavailable: bool,
    pub errors: Vec<SyncError>,
}

/// 싱크 쓰기기.
pub struct SinkWriter {
    sink: Arc<dyn FactorSink>,
}

impl SinkWriter {
    pub fn new(sink: Arc<dyn FactorSink>) -> Self {
        Self { sink }
    }

    /// 레코드를 `batch_size` 단위로 append (None이면 한 번에).
    ///
    /// 기본키 충돌 배치는 전체가 반영되지 않고 건너뜁니다.
    /// 연결 오류가 나면 남은 배치를 쓰지 않고 중단합니다.
    pub async fn insert(
        &self,
        table: &TableName,
        records: &[FactorRecord],
        batch_size: Option<usize>,
    ) -> WriteOutcome {
        let mut outcome = WriteOutcome::default();
        if records.is_empty() {
            return outcome;
        }

        let size = batch_size.unwrap_or(records.len()).max(1);
        for (batch, chunk) in records.chunks(size).enumerate() {
            match self.sink.append(table, chunk).await {
                Ok(count) => {
                    debug!(table = %table, batch = batch, rows = count, "배치 저장 완료");
                    outcome.inserted += count;
                }
                Err(e) if e.is_connectivity() => {
                    error!(table = %table, batch = batch, error = %e, "저장소 연결 불가, 쓰기 중단");
                    outcome.failed_batches += 1;
                    outcome.sink_unavailable = true;
                    outcome.errors.push(SyncError::SinkUnavailable(e.to_string()));
                    break;
                }
                Err(e) if e.is_constraint_violation() => {
                    error!(
                        table = %table,
                        batch = batch,
                        rows = chunk.len(),
                        error = %e,
                        "기본키 충돌, 배치 건너뜀 (증분 판별 누락 가능성)"
                    );
                    outcome.failed_batches += 1;
                    outcome.errors.push(SyncError::ConstraintViolation {
                        batch,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(table = %table, batch = batch, error = %e, "배치 저장 실패, 건너뜀");
                    outcome.failed_batches += 1;
                    outcome.errors.push(SyncError::WriteFailed {
                        batch,
                        reason: e.to_string(),
                    });
                }
            }
        }

        outcome
    }
}
