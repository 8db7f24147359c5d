//! PostgreSQL 종목 마스터 테이블.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPool;
use tracing::info;

use factor_core::{InstrumentInfo, TableName};

use super::{Database, InstrumentSink};
use crate::error::Result;

/// 종목 마스터 저장소 (`order_book_id` 기본키).
#[derive(Clone)]
pub struct PgInstrumentStore {
    pool: PgPool,
}

impl PgInstrumentStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl InstrumentSink for PgInstrumentStore {
    async fn ensure_instrument_table(&self, table: &TableName) -> Result<()> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                order_book_id   VARCHAR(20) PRIMARY KEY,
                symbol          VARCHAR(64),
                exchange        VARCHAR(16),
                instrument_type VARCHAR(16),
                listed_date     DATE,
                de_listed_date  DATE,
                inserted_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        );
        sqlx::query(&sql).execute(&self.pool).await?;

        info!(table = %table, "종목 테이블 확인 완료");
        Ok(())
    }

    async fn existing_instrument_ids(&self, table: &TableName) -> Result<HashSet<String>> {
        let sql = format!("SELECT order_book_id FROM {table}");
        let rows: Vec<(String,)> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn append_instruments(
        &self,
        table: &TableName,
        instruments: &[InstrumentInfo],
    ) -> Result<u64> {
        if instruments.is_empty() {
            return Ok(0);
        }

        let ids: Vec<&str> = instruments.iter().map(|i| i.order_book_id.as_str()).collect();
        let symbols: Vec<Option<&str>> = instruments.iter().map(|i| i.symbol.as_deref()).collect();
        let exchanges: Vec<Option<&str>> =
            instruments.iter().map(|i| i.exchange.as_deref()).collect();
        let types: Vec<Option<&str>> = instruments
            .iter()
            .map(|i| i.instrument_type.as_deref())
            .collect();
        let listed: Vec<Option<NaiveDate>> = instruments.iter().map(|i| i.listed_date).collect();
        let delisted: Vec<Option<NaiveDate>> =
            instruments.iter().map(|i| i.de_listed_date).collect();

        let sql = format!(
            r#"
            INSERT INTO {table}
                (order_book_id, symbol, exchange, instrument_type, listed_date, de_listed_date)
            SELECT * FROM UNNEST(
                $1::varchar[], $2::varchar[], $3::varchar[], $4::varchar[],
                $5::date[], $6::date[]
            )
            "#
        );
        let result = sqlx::query(&sql)
            .bind(&ids)
            .bind(&symbols)
            .bind(&exchanges)
            .bind(&types)
            .bind(&listed)
            .bind(&delisted)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
