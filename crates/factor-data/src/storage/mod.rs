//! 저장소 모듈.
//!
//! 팩터/시세 롱 포맷 테이블은 모두 같은 스키마를 사용합니다:
//!
//! | 컬럼 | 타입 |
//! |------|------|
//! | entity_id | VARCHAR(20) |
//! | date | DATE |
//! | field_name | VARCHAR(50) |
//! | value | DOUBLE PRECISION NULL |
//! | inserted_at | TIMESTAMPTZ DEFAULT NOW() |
//!
//! 기본키 `(entity_id, date, field_name)`가 중복 제거의 최종 경계입니다.
//! 쓰기는 append 전용이며, 충돌 시 `DataError::DuplicateError`가 반환됩니다.

pub mod factor;
pub mod instrument;
pub mod memory;
pub mod postgres;

pub use factor::PgFactorStore;
pub use instrument::PgInstrumentStore;
pub use memory::MemoryStore;
pub use postgres::{Database, DatabaseConfig};

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use factor_core::{DateRange, FactorRecord, InstrumentInfo, TableName};

use crate::error::Result;

/// 롱 포맷 레코드 싱크.
#[async_trait]
pub trait FactorSink: Send + Sync {
    /// 테이블이 없으면 생성.
    async fn ensure_table(&self, table: &TableName) -> Result<()>;

    /// 범위 내 이미 존재하는 날짜.
    async fn existing_dates(&self, table: &TableName, range: DateRange)
        -> Result<HashSet<NaiveDate>>;

    /// 범위 내 이미 존재하는 (종목, 날짜) 쌍.
    async fn existing_entity_dates(
        &self,
        table: &TableName,
        range: DateRange,
    ) -> Result<HashSet<(String, NaiveDate)>>;

    /// 레코드 일괄 append. 하나라도 키가 충돌하면 전체가 반영되지 않습니다.
    async fn append(&self, table: &TableName, records: &[FactorRecord]) -> Result<u64>;
}

/// 종목 마스터 싱크.
#[async_trait]
pub trait InstrumentSink: Send + Sync {
    async fn ensure_instrument_table(&self, table: &TableName) -> Result<()>;

    async fn existing_instrument_ids(&self, table: &TableName) -> Result<HashSet<String>>;

    async fn append_instruments(
        &self,
        table: &TableName,
        instruments: &[InstrumentInfo],
    ) -> Result<u64>;
}
