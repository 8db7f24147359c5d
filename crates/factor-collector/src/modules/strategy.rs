//! 데이터 종류별 동기화 전략.
//!
//! 오케스트레이터는 하나이고, 무엇을 어디에 저장할지는 전략 객체가 결정합니다.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use factor_core::{DateRange, TableName, WideTable};
use factor_data::{DataProvider, InstrumentSink, ProviderError, ProviderResult};

use super::gap::GapGranularity;

/// 시세 쓰기 배치 기본값
pub const DEFAULT_PRICE_INSERT_BATCH: usize = 1000;

/// 동기화 전략.
#[async_trait]
pub trait SyncStrategy: Send + Sync {
    /// 로그용 이름.
    fn name(&self) -> &str;

    /// 저장 대상 테이블.
    fn target_table(&self) -> &TableName;

    /// 쓰기 배치 크기 (None이면 한 번에).
    fn insert_batch_size(&self) -> Option<usize>;

    /// 기존 데이터 판별 단위 (None이면 엔진 설정).
    fn gap_granularity(&self) -> Option<GapGranularity> {
        None
    }

    /// 기준일의 종목 유니버스.
    async fn list_entities(&self, as_of: NaiveDate) -> ProviderResult<Vec<String>>;

    /// 청크 하나의 와이드 테이블 조회.
    async fn fetch_wide(&self, ids: &[String], range: DateRange) -> ProviderResult<WideTable>;
}

/// 팩터 동기화 (예: alpha101, obos).
pub struct FactorStrategy {
    provider: Arc<dyn DataProvider>,
    factor_type: String,
    table: TableName,
    insert_batch: Option<usize>,
    fields: OnceCell<Vec<String>>,
}

impl FactorStrategy {
    pub fn new(
        provider: Arc<dyn DataProvider>,
        factor_type: impl Into<String>,
        table: TableName,
    ) -> Self {
        Self {
            provider,
            factor_type: factor_type.into(),
            table,
            insert_batch: None,
            fields: OnceCell::new(),
        }
    }

    pub fn with_insert_batch(mut self, batch: Option<usize>) -> Self {
        self.insert_batch = batch;
        self
    }

    /// 팩터 이름 목록. 첫 호출에서 한 번만 조회합니다.
    async fn fields(&self) -> ProviderResult<&[String]> {
        let fields = self
            .fields
            .get_or_try_init(|| async {
                let names = self.provider.factor_names(&self.factor_type).await?;
                info!(factor_type = %self.factor_type, count = names.len(), "팩터 목록 조회 완료");
                Ok::<_, factor_data::ProviderError>(names)
            })
            .await?;
        Ok(fields.as_slice())
    }
}

#[async_trait]
impl SyncStrategy for FactorStrategy {
    fn name(&self) -> &str {
        &self.factor_type
    }

    fn target_table(&self) -> &TableName {
        &self.table
    }

    fn insert_batch_size(&self) -> Option<usize> {
        self.insert_batch
    }

    async fn list_entities(&self, as_of: NaiveDate) -> ProviderResult<Vec<String>> {
        self.provider.list_entities(as_of).await
    }

    async fn fetch_wide(&self, ids: &[String], range: DateRange) -> ProviderResult<WideTable> {
        let fields = self.fields().await?;
        if fields.is_empty() {
            return Ok(WideTable::empty());
        }
        self.provider.fetch_factors(ids, fields, range).await
    }
}

/// 일봉 시세 동기화.
///
/// 종목 마스터 테이블이 연결되어 있으면 그 종목들을 유니버스로 사용하고,
/// 기존 데이터는 (종목, 날짜) 단위로 판별하므로 종목마다 저장된 날짜 이후만 채웁니다.
pub struct PriceStrategy {
    provider: Arc<dyn DataProvider>,
    table: TableName,
    insert_batch: Option<usize>,
    universe: Option<InstrumentUniverse>,
}

/// 종목 마스터 테이블 기반 유니버스.
struct InstrumentUniverse {
    sink: Arc<dyn InstrumentSink>,
    table: TableName,
}

impl PriceStrategy {
    pub fn new(provider: Arc<dyn DataProvider>, table: TableName) -> Self {
        Self {
            provider,
            table,
            insert_batch: Some(DEFAULT_PRICE_INSERT_BATCH),
            universe: None,
        }
    }

    pub fn with_insert_batch(mut self, batch: Option<usize>) -> Self {
        self.insert_batch = batch;
        self
    }

    /// 종목 마스터 테이블을 유니버스로 사용.
    pub fn with_instrument_universe(
        mut self,
        sink: Arc<dyn InstrumentSink>,
        table: TableName,
    ) -> Self {
        self.universe = Some(InstrumentUniverse { sink, table });
        self
    }
}

#[async_trait]
impl SyncStrategy for PriceStrategy {
    fn name(&self) -> &str {
        "price"
    }

    fn target_table(&self) -> &TableName {
        &self.table
    }

    fn insert_batch_size(&self) -> Option<usize> {
        self.insert_batch
    }

    fn gap_granularity(&self) -> Option<GapGranularity> {
        Some(GapGranularity::EntityDate)
    }

    async fn list_entities(&self, as_of: NaiveDate) -> ProviderResult<Vec<String>> {
        let Some(universe) = &self.universe else {
            return self.provider.list_entities(as_of).await;
        };

        let ids = universe
            .sink
            .existing_instrument_ids(&universe.table)
            .await
            .map_err(|e| ProviderError::Other(format!("종목 마스터 조회 실패: {}", e)))?;
        if ids.is_empty() {
            warn!(table = %universe.table, "종목 마스터가 비어 있음, 제공자 유니버스 사용");
            return self.provider.list_entities(as_of).await;
        }

        let mut ids: Vec<String> = ids.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn fetch_wide(&self, ids: &[String], range: DateRange) -> ProviderResult<WideTable> {
        self.provider.fetch_prices(ids, range).await
    }
}
