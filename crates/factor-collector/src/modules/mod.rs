//! 동기화 엔진 모듈.

pub mod calendar;
pub mod fetcher;
pub mod gap;
pub mod instrument_sync;
pub mod normalize;
pub mod orchestrator;
pub mod retry;
pub mod sink;
pub mod strategy;
pub mod unit;

pub use calendar::{CalendarSource, ResolvedCalendar, TradingCalendar};
pub use fetcher::{partition, BatchFetcher, FetchOutcome, FetchedChunk};
pub use gap::{ExistingKeys, GapDetector, GapGranularity};
pub use instrument_sync::sync_instruments;
pub use normalize::{normalize, CleaningStats, MalformedTable, NormalizeOptions, Normalized};
pub use orchestrator::SyncOrchestrator;
pub use retry::{RetryAction, RetryMode, RetryPolicy, RetryState};
pub use sink::{SinkWriter, WriteOutcome};
pub use strategy::{FactorStrategy, PriceStrategy, SyncStrategy};
pub use unit::{resolve_range, ProcessingUnit, UnitMode, UnitState};
