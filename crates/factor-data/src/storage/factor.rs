//! PostgreSQL 롱 포맷 팩터 테이블.
//!
//! # 동작 방식
//!
//! 1. 동기화 시작 시 `ensure_table`로 테이블 생성 (없을 때만)
//! 2. 날짜 범위 단위로 기존 키를 조회하여 증분 대상 계산
//! 3. UNNEST 배열 바인딩으로 배치 단위 append
//!
//! append는 `ON CONFLICT` 없이 실행되므로, 배치 내 한 행이라도 기본키가
//! 충돌하면 문장 전체가 롤백되고 `DataError::DuplicateError`가 반환됩니다.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPool;
use tracing::{debug, info, instrument};

use factor_core::{DateRange, FactorRecord, TableName};

use super::{Database, FactorSink};
use crate::error::Result;

/// 팩터/시세 롱 포맷 저장소.
#[derive(Clone)]
pub struct PgFactorStore {
    pool: PgPool,
}

impl PgFactorStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl FactorSink for PgFactorStore {
    async fn ensure_table(&self, table: &TableName) -> Result<()> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                entity_id   VARCHAR(20) NOT NULL,
                date        DATE NOT NULL,
                field_name  VARCHAR(50) NOT NULL,
                value       DOUBLE PRECISION,
                inserted_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (entity_id, date, field_name)
            )
            "#
        );
        sqlx::query(&sql).execute(&self.pool).await?;

        info!(table = %table, "테이블 확인 완료");
        Ok(())
    }

    #[instrument(skip(self, table), fields(table = %table))]
    async fn existing_dates(
        &self,
        table: &TableName,
        range: DateRange,
    ) -> Result<HashSet<NaiveDate>> {
        let sql = format!("SELECT DISTINCT date FROM {table} WHERE date BETWEEN $1 AND $2");
        let rows: Vec<(NaiveDate,)> = sqlx::query_as(&sql)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "기존 날짜 조회");
        Ok(rows.into_iter().map(|(d,)| d).collect())
    }

    #[instrument(skip(self, table), fields(table = %table))]
    async fn existing_entity_dates(
        &self,
        table: &TableName,
        range: DateRange,
    ) -> Result<HashSet<(String, NaiveDate)>> {
        let sql = format!(
            "SELECT DISTINCT entity_id, date FROM {table} WHERE date BETWEEN $1 AND $2"
        );
        let rows: Vec<(String, NaiveDate)> = sqlx::query_as(&sql)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "기존 (종목, 날짜) 조회");
        Ok(rows.into_iter().collect())
    }

    #[instrument(skip(self, table, records), fields(table = %table, count = records.len()))]
    async fn append(&self, table: &TableName, records: &[FactorRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let entity_ids: Vec<&str> = records.iter().map(|r| r.entity_id.as_str()).collect();
        let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
        let field_names: Vec<&str> = records.iter().map(|r| r.field_name.as_str()).collect();
        let values: Vec<Option<f64>> = records.iter().map(|r| r.value).collect();

        let sql = format!(
            r#"
            INSERT INTO {table} (entity_id, date, field_name, value)
            SELECT * FROM UNNEST($1::varchar[], $2::date[], $3::varchar[], $4::float8[])
            "#
        );
        let result = sqlx::query(&sql)
            .bind(&entity_ids)
            .bind(&dates)
            .bind(&field_names)
            .bind(&values)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
