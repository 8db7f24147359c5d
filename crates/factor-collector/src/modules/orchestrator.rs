//! 동기화 오케스트레이터.
//!
//! 처리 단위마다 다음 순서로 진행합니다:
//!
//! ```text
//! Pending → Fetching → Normalizing → Filtering → Writing → Succeeded | Failed
//! ```
//!
//! 단위는 항상 순차 처리되며, 한 시점에 한 단위의 데이터만 메모리에 유지합니다.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn, Instrument};

use factor_core::{sync_span, DateRange, FactorRecord};
use factor_data::{DataProvider, FactorSink};

use super::calendar::TradingCalendar;
use super::fetcher::BatchFetcher;
use super::gap::{GapDetector, GapGranularity};
use super::normalize::{normalize, CleaningStats, NormalizeOptions};
use super::retry::{RetryMode, RetryPolicy};
use super::sink::SinkWriter;
use super::strategy::SyncStrategy;
use super::unit::{ProcessingUnit, UnitMode, UnitState};
use crate::config::EngineConfig;
use crate::error::{Result, SyncError};
use crate::report::SyncReport;

/// 단위 처리 옵션.
#[derive(Debug, Clone, Copy)]
struct UnitOptions {
    granularity: GapGranularity,
    /// 이미 저장된 날짜면 단위 전체 건너뜀
    skip_present: bool,
}

/// 단위 처리 결과.
enum UnitResult {
    Succeeded,
    Skipped,
    Failed(SyncError),
}

/// 동기화 오케스트레이터.
pub struct SyncOrchestrator {
    strategy: Arc<dyn SyncStrategy>,
    calendar: TradingCalendar,
    gap: GapDetector,
    writer: SinkWriter,
    sink: Arc<dyn FactorSink>,
    engine: EngineConfig,
    normalize: NormalizeOptions,
}

impl SyncOrchestrator {
    pub fn new(
        provider: Arc<dyn DataProvider>,
        sink: Arc<dyn FactorSink>,
        strategy: Arc<dyn SyncStrategy>,
        engine: EngineConfig,
    ) -> Self {
        let granularity = strategy
            .gap_granularity()
            .unwrap_or(engine.gap_granularity);
        Self {
            strategy,
            calendar: TradingCalendar::new(provider),
            gap: GapDetector::new(sink.clone(), granularity),
            writer: SinkWriter::new(sink.clone()),
            sink,
            normalize: NormalizeOptions {
                retain_nulled_infinities: engine.keep_null_infinities,
            },
            engine,
        }
    }

    /// 모드에 따라 일별/구간 동기화.
    pub async fn run(&self, range: DateRange, mode: UnitMode) -> Result<SyncReport> {
        match mode {
            UnitMode::Day => self.run_days(range).await,
            UnitMode::Range => self.run_range(range).await,
        }
    }

    /// 거래일마다 하나의 단위로 순차 처리.
    pub async fn run_days(&self, range: DateRange) -> Result<SyncReport> {
        let started = Instant::now();
        let mut report = SyncReport::new();

        self.ensure_table().await?;
        let calendar = self.calendar.resolve(range.start, range.end).await?;
        report.calendar_source = Some(calendar.source);

        info!(
            strategy = self.strategy.name(),
            table = %self.strategy.target_table(),
            range = %range,
            days = calendar.dates.len(),
            "일별 동기화 시작"
        );

        let fetcher = self.fetcher(RetryMode::Day);
        let options = UnitOptions {
            granularity: self.gap.granularity(),
            skip_present: true,
        };

        for (i, date) in calendar.dates.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.engine.day_delay()).await;
            }
            let unit = ProcessingUnit::day(*date);
            self.process_and_record(unit, &[*date], &fetcher, options, &mut report)
                .await;
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// 구간 전체를 하나의 단위로 처리.
    pub async fn run_range(&self, range: DateRange) -> Result<SyncReport> {
        let started = Instant::now();
        let mut report = SyncReport::new();

        self.ensure_table().await?;
        let calendar = self.calendar.resolve(range.start, range.end).await?;
        report.calendar_source = Some(calendar.source);

        info!(
            strategy = self.strategy.name(),
            table = %self.strategy.target_table(),
            range = %range,
            "구간 동기화 시작"
        );

        let unit = ProcessingUnit::range(range);
        if calendar.dates.is_empty() {
            info!(range = %range, "거래일 없음, 건너뜀");
            report.record_skip();
        } else {
            let options = UnitOptions {
                granularity: self.gap.granularity(),
                skip_present: false,
            };
            let fetcher = self.fetcher(RetryMode::Bulk);
            self.process_and_record(unit, &calendar.dates, &fetcher, options, &mut report)
                .await;
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }

    /// 실패한 단위만 다시 처리.
    ///
    /// 기존 날짜 건너뜀을 적용하지 않고 (종목, 날짜) 단위로 걸러내므로,
    /// 일부만 저장된 날짜도 나머지가 채워집니다.
    pub async fn retry_failed_units(&self, units: &[ProcessingUnit]) -> SyncReport {
        let started = Instant::now();
        let mut report = SyncReport::new();
        if units.is_empty() {
            return report;
        }

        info!(count = units.len(), "실패 단위 재시도 시작");
        let options = UnitOptions {
            granularity: GapGranularity::EntityDate,
            skip_present: false,
        };

        for (i, unit) in units.iter().enumerate() {
            let (mode, days) = match unit.mode {
                UnitMode::Day => (RetryMode::Day, vec![unit.as_of()]),
                UnitMode::Range => {
                    match self.calendar.resolve(unit.range.start, unit.range.end).await {
                        Ok(calendar) => (RetryMode::Bulk, calendar.dates),
                        Err(e) => {
                            report.record_unit_failure(*unit, &[], e);
                            continue;
                        }
                    }
                }
            };
            if days.is_empty() {
                report.record_skip();
                continue;
            }
            if i > 0 && unit.mode == UnitMode::Day {
                tokio::time::sleep(self.engine.day_delay()).await;
            }
            self.process_and_record(*unit, &days, &self.fetcher(mode), options, &mut report)
                .await;
        }

        report.elapsed = started.elapsed();
        report
    }

    fn fetcher(&self, mode: RetryMode) -> BatchFetcher {
        BatchFetcher::new(
            self.engine.chunk_size,
            RetryPolicy::from_config(&self.engine, mode),
            self.engine.chunk_delay(),
        )
    }

    async fn ensure_table(&self) -> Result<()> {
        self.sink
            .ensure_table(self.strategy.target_table())
            .await
            .map_err(|e| SyncError::SinkUnavailable(e.to_string()))
    }

    async fn process_and_record(
        &self,
        unit: ProcessingUnit,
        days: &[NaiveDate],
        fetcher: &BatchFetcher,
        options: UnitOptions,
        report: &mut SyncReport,
    ) {
        let span = sync_span!("sync_unit", self.strategy.target_table(), unit);
        let result = self
            .process_unit(unit, days, fetcher, options, report)
            .instrument(span)
            .await;

        match result {
            UnitResult::Succeeded => report.record_success(),
            UnitResult::Skipped => report.record_skip(),
            UnitResult::Failed(e) => {
                if e.is_fatal() {
                    error!(unit = %unit, error = %e, "처리 단위 실패");
                } else {
                    warn!(unit = %unit, error = %e, "처리 단위 실패");
                }
                report.record_unit_failure(unit, days, e);
            }
        }
    }

    async fn process_unit(
        &self,
        unit: ProcessingUnit,
        days: &[NaiveDate],
        fetcher: &BatchFetcher,
        options: UnitOptions,
        report: &mut SyncReport,
    ) -> UnitResult {
        let table = self.strategy.target_table();
        transition(UnitState::Pending);

        let existing = self
            .gap
            .existing_keys_with(table, unit.range, options.granularity)
            .await;
        let date_present = existing.is_date_present(unit.as_of());
        if options.skip_present && unit.mode == UnitMode::Day && date_present {
            info!(date = %unit.as_of(), "이미 저장된 날짜, 건너뜀");
            return UnitResult::Skipped;
        }

        transition(UnitState::Fetching);
        let entities = match self.strategy.list_entities(unit.as_of()).await {
            Ok(entities) => entities,
            Err(e) => {
                transition(UnitState::Failed);
                return UnitResult::Failed(SyncError::UniverseUnavailable(e.to_string()));
            }
        };
        if entities.is_empty() {
            warn!(as_of = %unit.as_of(), "종목 유니버스가 비어 있음");
            transition(UnitState::Succeeded);
            return UnitResult::Succeeded;
        }

        // 모든 거래일이 이미 저장된 종목은 조회하지 않음
        let universe = entities.len();
        let entities: Vec<String> = entities
            .into_iter()
            .filter(|id| !existing.covers(id, days))
            .collect();
        if entities.is_empty() {
            info!(universe = universe, "모든 종목이 최신 상태, 건너뜀");
            return UnitResult::Skipped;
        }
        if entities.len() < universe {
            debug!(universe = universe, pending = entities.len(), "최신 종목 제외");
        }

        let outcome = fetcher
            .fetch(self.strategy.as_ref(), &entities, unit.range)
            .await;
        report.chunks_failed += outcome.failures.len();

        if outcome.aborted || outcome.all_failed() {
            transition(UnitState::Failed);
            // 마지막 청크 오류가 단위 실패 사유, 나머지는 그대로 기록
            let mut failures = outcome.failures;
            let error = failures
                .pop()
                .unwrap_or_else(|| SyncError::UniverseUnavailable("no chunks".to_string()));
            report.errors.extend(failures);
            return UnitResult::Failed(error);
        }

        transition(UnitState::Normalizing);
        let mut records: Vec<FactorRecord> = Vec::new();
        let mut unit_stats = CleaningStats::default();
        for chunk in &outcome.tables {
            let mut normalized = match normalize(&chunk.table, self.normalize) {
                Ok(normalized) => normalized,
                Err(e) => {
                    transition(UnitState::Failed);
                    return UnitResult::Failed(SyncError::NormalizationFailed {
                        unit: unit.to_string(),
                        reason: format!("청크 {}: {}", chunk.index, e),
                    });
                }
            };
            records.extend(normalized.by_ref());

            let stats = normalized.stats();
            debug!(
                chunk = chunk.index,
                cells = stats.cells,
                infinities = stats.infinities,
                missing = stats.missing,
                invalid_keys = stats.invalid_keys,
                kept = stats.kept,
                "청크 정제 완료"
            );
            unit_stats.merge(&stats);
        }
        if unit_stats.infinities > 0 {
            info!(
                infinities = unit_stats.infinities,
                dropped = unit_stats.dropped(),
                "무한대 값 정제"
            );
        }

        transition(UnitState::Filtering);
        let fetched = records.len();
        let records: Vec<FactorRecord> = GapDetector::filter(records, &existing).collect();
        debug!(fetched = fetched, remaining = records.len(), "기존 데이터 필터 완료");

        transition(UnitState::Writing);
        let written = self
            .writer
            .insert(table, &records, self.strategy.insert_batch_size())
            .await;
        report.rows_inserted += written.inserted;
        report.batches_failed += written.failed_batches;

        if written.sink_unavailable {
            transition(UnitState::Failed);
            let error = written
                .errors
                .into_iter()
                .find(|e| matches!(e, SyncError::SinkUnavailable(_)))
                .unwrap_or_else(|| SyncError::SinkUnavailable(table.to_string()));
            return UnitResult::Failed(error);
        }

        info!(
            rows = written.inserted,
            chunks_failed = outcome.failures.len(),
            batches_failed = written.failed_batches,
            "처리 단위 완료"
        );
        report.errors.extend(outcome.failures);
        report.errors.extend(written.errors);
        transition(UnitState::Succeeded);
        UnitResult::Succeeded
    }
}

fn transition(state: UnitState) {
    debug!(state = %state, "상태 전이");
}
