//! 종목 마스터 증분 동기화.
//!
//! 유형별 전체 종목을 조회한 뒤 테이블에 없는 `order_book_id`만 추가합니다.

use std::collections::HashSet;
use std::time::Instant;

use tracing::{info, warn};

use factor_core::{InstrumentInfo, TableName};
use factor_data::{DataProvider, InstrumentSink};

use crate::error::{Result, SyncError};
use crate::report::SyncReport;

/// 종목 마스터 쓰기 배치
const INSTRUMENT_INSERT_BATCH: usize = 1000;

/// 종목 마스터 동기화.
///
/// 테이블 생성 실패만 오류로 반환하고, 나머지 실패는 리포트에 기록합니다.
pub async fn sync_instruments(
    provider: &dyn DataProvider,
    sink: &dyn InstrumentSink,
    table: &TableName,
    instrument_type: &str,
) -> Result<SyncReport> {
    let started = Instant::now();
    let mut report = SyncReport::new();

    sink.ensure_instrument_table(table)
        .await
        .map_err(|e| SyncError::SinkUnavailable(e.to_string()))?;

    let existing = match sink.existing_instrument_ids(table).await {
        Ok(ids) => ids,
        Err(e) => {
            warn!(table = %table, error = %e, "기존 종목 조회 실패, 전체를 신규로 간주");
            HashSet::new()
        }
    };

    let instruments = match provider.list_instruments(instrument_type).await {
        Ok(instruments) => instruments,
        Err(e) => {
            report.record_failure(SyncError::UniverseUnavailable(e.to_string()));
            report.elapsed = started.elapsed();
            return Ok(report);
        }
    };

    let fetched = instruments.len();
    let mut seen = HashSet::new();
    let new_instruments: Vec<InstrumentInfo> = instruments
        .into_iter()
        .filter(|i| !existing.contains(&i.order_book_id) && seen.insert(i.order_book_id.clone()))
        .collect();

    info!(
        instrument_type = instrument_type,
        fetched = fetched,
        existing = existing.len(),
        new = new_instruments.len(),
        "신규 종목 계산 완료"
    );

    let mut unavailable = None;
    for (batch, chunk) in new_instruments.chunks(INSTRUMENT_INSERT_BATCH).enumerate() {
        match sink.append_instruments(table, chunk).await {
            Ok(count) => report.rows_inserted += count,
            Err(e) if e.is_connectivity() => {
                report.batches_failed += 1;
                unavailable = Some(SyncError::SinkUnavailable(e.to_string()));
                break;
            }
            Err(e) => {
                warn!(table = %table, batch = batch, error = %e, "종목 배치 저장 실패, 건너뜀");
                report.batches_failed += 1;
                report.errors.push(if e.is_constraint_violation() {
                    SyncError::ConstraintViolation {
                        batch,
                        reason: e.to_string(),
                    }
                } else {
                    SyncError::WriteFailed {
                        batch,
                        reason: e.to_string(),
                    }
                });
            }
        }
    }

    match unavailable {
        Some(error) => report.record_failure(error),
        None => report.record_success(),
    }

    report.elapsed = started.elapsed();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use factor_data::{MemoryStore, ProviderError};

    use super::*;
    use crate::testing::ScriptedProvider;

    fn table() -> TableName {
        TableName::parse("stock_info").unwrap()
    }

    fn instruments(ids: &[&str]) -> Vec<InstrumentInfo> {
        ids.iter().map(|id| InstrumentInfo::new(*id)).collect()
    }

    #[tokio::test]
    async fn test_only_new_ids_inserted() {
        let store = MemoryStore::new();
        store.ensure_instrument_table(&table()).await.unwrap();
        store
            .append_instruments(&table(), &instruments(&["000001.XSHE"]))
            .await
            .unwrap();

        let provider = ScriptedProvider::new().with_instruments(instruments(&[
            "000001.XSHE",
            "000002.XSHE",
            "600000.XSHG",
            "600000.XSHG",
        ]));

        let report = sync_instruments(&provider, &store, &table(), "CS").await.unwrap();
        assert_eq!(report.rows_inserted, 2);
        assert!(report.is_success());
        assert_eq!(store.instrument_count(&table()).await, 3);

        let again = sync_instruments(&provider, &store, &table(), "CS").await.unwrap();
        assert_eq!(again.rows_inserted, 0);
    }

    #[tokio::test]
    async fn test_listing_failure_is_reported() {
        let store = MemoryStore::new();
        let provider = ScriptedProvider::new()
            .with_entities_error(ProviderError::Transport("connection refused".into()));

        let report = sync_instruments(&provider, &store, &table(), "CS").await.unwrap();
        assert_eq!(report.units_failed, 1);
        assert!(matches!(report.errors[0], SyncError::UniverseUnavailable(_)));
    }
}
