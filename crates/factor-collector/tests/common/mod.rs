//! 테스트용 데이터 제공자/싱크.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use factor_core::{DateRange, FactorRecord, InstrumentInfo, TableName, WideRow, WideTable};
use factor_data::{DataError, DataProvider, FactorSink, ProviderError, ProviderResult};

type ValueFn = Box<dyn Fn(&str, NaiveDate, &str) -> Option<f64> + Send + Sync>;

/// `E0000`, `E0001`, ... 형식의 종목 식별자.
pub fn entity_ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("E{:04}", i)).collect()
}

/// 응답과 실패를 미리 지정하는 데이터 제공자.
///
/// 청크 실패는 청크의 첫 번째 종목 식별자로 지정하며, 지정한 순서대로 한 번씩 소비됩니다.
pub struct ScriptedProvider {
    trading_dates: Option<Vec<NaiveDate>>,
    calendar_error: Option<ProviderError>,
    entities: Vec<String>,
    entities_error: Option<ProviderError>,
    fields: Vec<String>,
    instruments: Vec<InstrumentInfo>,
    values: ValueFn,
    failures: Mutex<HashMap<String, VecDeque<ProviderError>>>,
    ragged: HashSet<String>,
    calls: Mutex<Vec<String>>,
    factor_name_calls: Mutex<usize>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self {
            trading_dates: None,
            calendar_error: None,
            entities: Vec::new(),
            entities_error: None,
            fields: Vec::new(),
            instruments: Vec::new(),
            values: Box::new(|_: &str, _: NaiveDate, _: &str| Some(1.0)),
            failures: Mutex::new(HashMap::new()),
            ragged: HashSet::new(),
            calls: Mutex::new(Vec::new()),
            factor_name_calls: Mutex::new(0),
        }
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 거래일 고정 (미지정 시 평일).
    pub fn with_trading_dates(mut self, dates: Vec<NaiveDate>) -> Self {
        self.trading_dates = Some(dates);
        self
    }

    pub fn with_calendar_error(mut self, error: ProviderError) -> Self {
        self.calendar_error = Some(error);
        self
    }

    pub fn with_entities<'a>(mut self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        self.entities = ids.into_iter().map(String::from).collect();
        self
    }

    pub fn with_entity_list(mut self, ids: Vec<String>) -> Self {
        self.entities = ids;
        self
    }

    /// 종목 유니버스/종목 마스터 조회 실패.
    pub fn with_entities_error(mut self, error: ProviderError) -> Self {
        self.entities_error = Some(error);
        self
    }

    pub fn with_fields<'a>(mut self, fields: impl IntoIterator<Item = &'a str>) -> Self {
        self.fields = fields.into_iter().map(String::from).collect();
        self
    }

    pub fn with_instruments(mut self, instruments: Vec<InstrumentInfo>) -> Self {
        self.instruments = instruments;
        self
    }

    /// 셀 값 생성 함수 (종목, 날짜, 필드).
    pub fn with_values(
        mut self,
        values: impl Fn(&str, NaiveDate, &str) -> Option<f64> + Send + Sync + 'static,
    ) -> Self {
        self.values = Box::new(values);
        self
    }

    /// `first_id`로 시작하는 청크의 다음 조회를 `error`로 실패시킴.
    pub fn fail_chunk(self, first_id: &str, error: ProviderError) -> Self {
        self.failures
            .lock()
            .unwrap()
            .entry(first_id.to_string())
            .or_default()
            .push_back(error);
        self
    }

    /// `first_id`로 시작하는 청크 응답의 마지막 행에서 값 하나를 제거.
    pub fn ragged_chunk(mut self, first_id: &str) -> Self {
        self.ragged.insert(first_id.to_string());
        self
    }

    /// `first_id`로 시작하는 청크의 조회 횟수.
    pub fn calls_for(&self, first_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == first_id)
            .count()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn factor_name_calls(&self) -> usize {
        *self.factor_name_calls.lock().unwrap()
    }

    fn dates_in(&self, range: DateRange) -> Vec<NaiveDate> {
        match &self.trading_dates {
            Some(dates) => dates.iter().copied().filter(|d| range.contains(*d)).collect(),
            None => range.weekdays().collect(),
        }
    }

    fn fetch(&self, ids: &[String], fields: &[String], range: DateRange) -> ProviderResult<WideTable> {
        let first = ids.first().cloned().unwrap_or_default();
        self.calls.lock().unwrap().push(first.clone());

        if let Some(error) = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&first)
            .and_then(|queue| queue.pop_front())
        {
            return Err(error);
        }

        let mut table = WideTable::new(fields.to_vec());
        for date in self.dates_in(range) {
            for id in ids {
                let values = fields.iter().map(|f| (self.values)(id, date, f)).collect();
                table.push_row(WideRow::new(id.clone(), date, values));
            }
        }
        if self.ragged.contains(&first) {
            if let Some(row) = table.rows.last_mut() {
                row.values.pop();
            }
        }
        Ok(table)
    }
}

#[async_trait]
impl DataProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn trading_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ProviderResult<Vec<NaiveDate>> {
        if let Some(error) = &self.calendar_error {
            return Err(error.clone());
        }
        match &self.trading_dates {
            Some(dates) => Ok(dates.clone()),
            None => Ok(DateRange::new(start, end)
                .map(|r| r.weekdays().collect())
                .unwrap_or_default()),
        }
    }

    async fn list_entities(&self, _as_of: NaiveDate) -> ProviderResult<Vec<String>> {
        match &self.entities_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.entities.clone()),
        }
    }

    async fn list_instruments(&self, _instrument_type: &str) -> ProviderResult<Vec<InstrumentInfo>> {
        match &self.entities_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.instruments.clone()),
        }
    }

    async fn factor_names(&self, _factor_type: &str) -> ProviderResult<Vec<String>> {
        *self.factor_name_calls.lock().unwrap() += 1;
        Ok(self.fields.clone())
    }

    async fn fetch_factors(
        &self,
        ids: &[String],
        fields: &[String],
        range: DateRange,
    ) -> ProviderResult<WideTable> {
        self.fetch(ids, fields, range)
    }

    async fn fetch_prices(&self, ids: &[String], range: DateRange) -> ProviderResult<WideTable> {
        let fields = vec!["open".to_string(), "close".to_string()];
        self.fetch(ids, &fields, range)
    }
}

/// 테이블 생성과 조회는 되지만 쓰기 시 연결이 끊기는 싱크.
#[derive(Default)]
pub struct UnavailableSink;

#[async_trait]
impl FactorSink for UnavailableSink {
    async fn ensure_table(&self, _table: &TableName) -> factor_data::Result<()> {
        Ok(())
    }

    async fn existing_dates(
        &self,
        _table: &TableName,
        _range: DateRange,
    ) -> factor_data::Result<HashSet<NaiveDate>> {
        Ok(HashSet::new())
    }

    async fn existing_entity_dates(
        &self,
        _table: &TableName,
        _range: DateRange,
    ) -> factor_data::Result<HashSet<(String, NaiveDate)>> {
        Ok(HashSet::new())
    }

    async fn append(
        &self,
        _table: &TableName,
        _records: &[FactorRecord],
    ) -> factor_data::Result<u64> {
        Err(DataError::ConnectionError("server closed the connection".to_string()))
    }
}

/// 기존 키 조회만 실패하는 싱크 (증분 판별이 누락된 상황 재현).
pub struct BlindSink<S> {
    inner: std::sync::Arc<S>,
}

impl<S> BlindSink<S> {
    pub fn new(inner: std::sync::Arc<S>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: FactorSink> FactorSink for BlindSink<S> {
    async fn ensure_table(&self, table: &TableName) -> factor_data::Result<()> {
        self.inner.ensure_table(table).await
    }

    async fn existing_dates(
        &self,
        _table: &TableName,
        _range: DateRange,
    ) -> factor_data::Result<HashSet<NaiveDate>> {
        Err(DataError::QueryError("statement timeout".to_string()))
    }

    async fn existing_entity_dates(
        &self,
        _table: &TableName,
        _range: DateRange,
    ) -> factor_data::Result<HashSet<(String, NaiveDate)>> {
        Err(DataError::QueryError("statement timeout".to_string()))
    }

    async fn append(&self, table: &TableName, records: &[FactorRecord]) -> factor_data::Result<u64> {
        self.inner.append(table, records).await
    }
}
