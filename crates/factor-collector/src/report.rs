//! 동기화 실행 결과.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::SyncError;
use crate::modules::calendar::CalendarSource;
use crate::modules::unit::ProcessingUnit;

/// 동기화 실행 통계
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// 시도한 처리 단위 수 (성공 + 실패 + 건너뜀)
    pub units_attempted: usize,
    pub units_succeeded: usize,
    pub units_failed: usize,
    /// 이미 저장된 날짜라 건너뛴 단위
    pub units_skipped: usize,
    /// 저장된 레코드 수
    pub rows_inserted: u64,
    /// 건너뛴 청크 수
    pub chunks_failed: usize,
    /// 건너뛴 쓰기 배치 수
    pub batches_failed: usize,
    /// 사용한 거래일 출처
    pub calendar_source: Option<CalendarSource>,
    /// 실패한 처리 단위 (재시도 대상)
    pub failed_units: Vec<ProcessingUnit>,
    /// 실패한 처리 단위의 거래일
    pub failed_days: BTreeSet<NaiveDate>,
    /// 실패 사유
    #[serde(skip)]
    pub errors: Vec<SyncError>,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.units_attempted += 1;
        self.units_succeeded += 1;
    }

    pub fn record_skip(&mut self) {
        self.units_attempted += 1;
        self.units_skipped += 1;
    }

    /// 날짜 단위가 없는 작업(종목 마스터)의 실패 기록.
    pub fn record_failure(&mut self, error: SyncError) {
        self.units_attempted += 1;
        self.units_failed += 1;
        self.errors.push(error);
    }

    /// 처리 단위 실패 기록. `trading_days`는 단위가 다룬 거래일.
    pub fn record_unit_failure(
        &mut self,
        unit: ProcessingUnit,
        trading_days: &[NaiveDate],
        error: SyncError,
    ) {
        self.record_failure(error);
        self.failed_units.push(unit);
        self.failed_days.extend(trading_days.iter().copied());
    }

    /// 모든 단위가 실패 없이 끝났는지.
    pub fn is_success(&self) -> bool {
        self.units_failed == 0
    }

    /// 실패한 처리 단위의 거래일 목록 (오름차순).
    pub fn failed_dates(&self) -> Vec<NaiveDate> {
        self.failed_days.iter().copied().collect()
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        let processed = self.units_attempted - self.units_skipped;
        if processed == 0 {
            100.0
        } else {
            (self.units_succeeded as f64 / processed as f64) * 100.0
        }
    }

    /// 재시도 실행 결과 합산.
    ///
    /// 재시도한 단위는 이미 한 번 실패로 집계되었으므로, 재시도에서 성공하거나
    /// 건너뛴 만큼 실패 수를 줄이고 실패 목록은 재시도 결과로 대체합니다.
    pub fn absorb_retry(&mut self, retry: SyncReport) {
        let resolved = retry.units_succeeded + retry.units_skipped;
        self.units_failed = self.units_failed.saturating_sub(resolved);
        self.units_succeeded += retry.units_succeeded;
        self.units_skipped += retry.units_skipped;
        self.rows_inserted += retry.rows_inserted;
        self.chunks_failed += retry.chunks_failed;
        self.batches_failed += retry.batches_failed;
        self.failed_units = retry.failed_units;
        self.failed_days = retry.failed_days;
        self.errors.extend(retry.errors);
        self.elapsed += retry.elapsed;
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            attempted = self.units_attempted,
            succeeded = self.units_succeeded,
            failed = self.units_failed,
            skipped = self.units_skipped,
            rows_inserted = self.rows_inserted,
            chunks_failed = self.chunks_failed,
            batches_failed = self.batches_failed,
            calendar = ?self.calendar_source,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "동기화 완료"
        );

        if !self.failed_units.is_empty() {
            let dates: Vec<String> = self.failed_dates().iter().map(|d| d.to_string()).collect();
            tracing::warn!(
                operation = operation,
                count = self.failed_units.len(),
                dates = %dates.join(", "),
                "실패한 처리 단위"
            );
        }
    }
}
