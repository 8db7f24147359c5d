//! 인메모리 싱크.
//!
//! `--dry-run` 실행과 테스트에서 사용합니다. PostgreSQL 구현과 같은 규칙을 따릅니다:
//! - 생성되지 않은 테이블 조회/쓰기는 `QueryError`
//! - 배치 내 한 건이라도 기본키가 충돌하면 배치 전체 거부 (`DuplicateError`)

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use factor_core::{DateRange, FactorRecord, InstrumentInfo, RecordKey, TableName};

use super::{FactorSink, InstrumentSink};
use crate::error::{DataError, Result};

type FactorTable = BTreeMap<RecordKey, Option<f64>>;

/// 인메모리 팩터/종목 저장소.
#[derive(Default)]
pub struct MemoryStore {
    factors: RwLock<HashMap<TableName, FactorTable>>,
    instruments: RwLock<HashMap<TableName, BTreeMap<String, InstrumentInfo>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 테이블의 전체 레코드 (키 순서).
    pub async fn records(&self, table: &TableName) -> Vec<FactorRecord> {
        let factors = self.factors.read().await;
        factors
            .get(table)
            .map(|rows| {
                rows.iter()
                    .map(|(key, value)| FactorRecord {
                        entity_id: key.entity_id.clone(),
                        date: key.date,
                        field_name: key.field_name.clone(),
                        value: *value,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn record_count(&self, table: &TableName) -> usize {
        let factors = self.factors.read().await;
        factors.get(table).map(|rows| rows.len()).unwrap_or(0)
    }

    pub async fn instrument_count(&self, table: &TableName) -> usize {
        let instruments = self.instruments.read().await;
        instruments.get(table).map(|rows| rows.len()).unwrap_or(0)
    }
}

fn missing_table(table: &TableName) -> DataError {
    DataError::QueryError(format!("relation \"{}\" does not exist", table))
}

#[async_trait]
impl FactorSink for MemoryStore {
    async fn ensure_table(&self, table: &TableName) -> Result<()> {
        self.factors
            .write()
            .await
            .entry(table.clone())
            .or_default();
        Ok(())
    }

    async fn existing_dates(
        &self,
        table: &TableName,
        range: DateRange,
    ) -> Result<HashSet<NaiveDate>> {
        let factors = self.factors.read().await;
        let rows = factors.get(table).ok_or_else(|| missing_table(table))?;
        Ok(rows
            .keys()
            .filter(|k| range.contains(k.date))
            .map(|k| k.date)
            .collect())
    }

    async fn existing_entity_dates(
        &self,
        table: &TableName,
        range: DateRange,
    ) -> Result<HashSet<(String, NaiveDate)>> {
        let factors = self.factors.read().await;
        let rows = factors.get(table).ok_or_else(|| missing_table(table))?;
        Ok(rows
            .keys()
            .filter(|k| range.contains(k.date))
            .map(|k| (k.entity_id.clone(), k.date))
            .collect())
    }

    async fn append(&self, table: &TableName, records: &[FactorRecord]) -> Result<u64> {
        let mut factors = self.factors.write().await;
        let rows = factors.get_mut(table).ok_or_else(|| missing_table(table))?;

        let mut batch_keys = HashSet::with_capacity(records.len());
        for record in records {
            let key = record.key();
            if rows.contains_key(&key) || !batch_keys.insert(key.clone()) {
                return Err(DataError::DuplicateError(format!(
                    "duplicate key ({}, {}, {})",
                    key.entity_id, key.date, key.field_name
                )));
            }
        }

        for record in records {
            rows.insert(record.key(), record.value);
        }
        Ok(records.len() as u64)
    }
}

#[async_trait]
impl InstrumentSink for MemoryStore {
    async fn ensure_instrument_table(&self, table: &TableName) -> Result<()> {
        self.instruments
            .write()
            .await
            .entry(table.clone())
            .or_default();
        Ok(())
    }

    async fn existing_instrument_ids(&self, table: &TableName) -> Result<HashSet<String>> {
        let instruments = self.instruments.read().await;
        let rows = instruments.get(table).ok_or_else(|| missing_table(table))?;
        Ok(rows.keys().cloned().collect())
    }

    async fn append_instruments(
        &self,
        table: &TableName,
        instruments: &[InstrumentInfo],
    ) -> Result<u64> {
        let mut tables = self.instruments.write().await;
        let rows = tables.get_mut(table).ok_or_else(|| missing_table(table))?;

        let mut batch_ids = HashSet::with_capacity(instruments.len());
        for info in instruments {
            if rows.contains_key(&info.order_book_id) || !batch_ids.insert(&info.order_book_id) {
                return Err(DataError::DuplicateError(info.order_book_id.clone()));
            }
        }

        for info in instruments {
            rows.insert(info.order_book_id.clone(), info.clone());
        }
        Ok(instruments.len() as u64)
    }
}
