//! 기존 데이터 판별 (증분 대상 계산).
//!
//! 날짜 범위로 먼저 거른 뒤 기존 키의 여집합만 남깁니다.
//! 조회 실패 시에는 경고 후 빈 집합을 반환하므로, 최종 중복 방지는
//! 테이블 기본키가 담당합니다.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use factor_core::{DateRange, FactorRecord, TableName};
use factor_data::FactorSink;

/// 기존 데이터 판별 단위.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GapGranularity {
    /// 날짜가 하나라도 있으면 그 날짜 전체를 기존 데이터로 간주
    #[default]
    Date,
    /// (종목, 날짜) 쌍 단위
    EntityDate,
}

impl std::str::FromStr for GapGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date" => Ok(Self::Date),
            "entity_date" | "entity-date" | "entitydate" => Ok(Self::EntityDate),
            other => Err(format!("알 수 없는 판별 단위: {}", other)),
        }
    }
}

/// 범위 내 이미 저장된 키.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExistingKeys {
    Dates(HashSet<NaiveDate>),
    EntityDates(HashSet<(String, NaiveDate)>),
}

impl ExistingKeys {
    pub fn empty(granularity: GapGranularity) -> Self {
        match granularity {
            GapGranularity::Date => Self::Dates(HashSet::new()),
            GapGranularity::EntityDate => Self::EntityDates(HashSet::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Dates(dates) => dates.len(),
            Self::EntityDates(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 날짜 단위 판별에서 해당 날짜가 이미 있는지.
    ///
    /// (종목, 날짜) 단위에서는 일부 종목만 저장된 날짜를 건너뛰면 안 되므로 항상 `false`.
    pub fn is_date_present(&self, date: NaiveDate) -> bool {
        match self {
            Self::Dates(dates) => dates.contains(&date),
            Self::EntityDates(_) => false,
        }
    }

    /// 종목이 주어진 거래일 모두에 이미 저장되어 있는지. 거래일이 없으면 `false`.
    pub fn covers(&self, entity_id: &str, days: &[NaiveDate]) -> bool {
        !days.is_empty()
            && days.iter().all(|day| match self {
                Self::Dates(dates) => dates.contains(day),
                Self::EntityDates(pairs) => pairs.contains(&(entity_id.to_string(), *day)),
            })
    }

    pub fn contains(&self, record: &FactorRecord) -> bool {
        match self {
            Self::Dates(dates) => dates.contains(&record.date),
            Self::EntityDates(pairs) => pairs.contains(&(record.entity_id.clone(), record.date)),
        }
    }
}

/// 기존 키 조회 및 필터.
pub struct GapDetector {
    sink: Arc<dyn FactorSink>,
    granularity: GapGranularity,
}

impl GapDetector {
    pub fn new(sink: Arc<dyn FactorSink>, granularity: GapGranularity) -> Self {
        Self { sink, granularity }
    }

    pub fn granularity(&self) -> GapGranularity {
        self.granularity
    }

    /// 지정한 단위로 기존 키 조회. 실패 시 빈 집합.
    pub async fn existing_keys_with(
        &self,
        table: &TableName,
        range: DateRange,
        granularity: GapGranularity,
    ) -> ExistingKeys {
        let result = match granularity {
            GapGranularity::Date => self
                .sink
                .existing_dates(table, range)
                .await
                .map(ExistingKeys::Dates),
            GapGranularity::EntityDate => self
                .sink
                .existing_entity_dates(table, range)
                .await
                .map(ExistingKeys::EntityDates),
        };

        match result {
            Ok(keys) => {
                debug!(table = %table, range = %range, existing = keys.len(), "기존 데이터 조회");
                keys
            }
            Err(e) => {
                warn!(
                    table = %table,
                    range = %range,
                    error = %e,
                    "기존 데이터 조회 실패, 전체를 신규로 간주"
                );
                ExistingKeys::empty(granularity)
            }
        }
    }

    /// 기존 키에 없는 레코드만 남김.
    pub fn filter<'a, I>(
        records: I,
        existing: &'a ExistingKeys,
    ) -> impl Iterator<Item = FactorRecord> + 'a
    where
        I: IntoIterator<Item = FactorRecord>,
        I::IntoIter: 'a,
    {
        records.into_iter().filter(move |r| !existing.contains(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factor_data::MemoryStore;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn table() -> TableName {
        TableName::parse("factor_gap").unwrap()
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.ensure_table(&table()).await.unwrap();
        store
            .append(&table(), &[FactorRecord::new("A", d(2), "pe", Some(1.0))])
            .await
            .unwrap();
        store
    }

    fn candidates() -> Vec<FactorRecord> {
        vec![
            FactorRecord::new("A", d(1), "pe", Some(1.0)),
            FactorRecord::new("A", d(2), "pe", Some(1.0)),
            FactorRecord::new("B", d(2), "pe", Some(2.0)),
            FactorRecord::new("A", d(3), "pe", Some(1.0)),
        ]
    }

    #[tokio::test]
    async fn test_date_granularity_filters_whole_day() {
        let detector = GapDetector::new(seeded_store().await, GapGranularity::Date);
        let existing = detector
            .existing_keys_with(
                &table(),
                DateRange::new(d(1), d(3)).unwrap(),
                detector.granularity(),
            )
            .await;

        assert!(existing.is_date_present(d(2)));
        let remaining: Vec<_> = GapDetector::filter(candidates(), &existing).collect();
        let dates: Vec<_> = remaining.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(1), d(3)]);
    }

    #[tokio::test]
    async fn test_entity_date_granularity_keeps_other_entities() {
        let detector = GapDetector::new(seeded_store().await, GapGranularity::Date);
        let existing = detector
            .existing_keys_with(
                &table(),
                DateRange::new(d(1), d(3)).unwrap(),
                GapGranularity::EntityDate,
            )
            .await;

        assert!(!existing.is_date_present(d(2)));
        let remaining: Vec<_> = GapDetector::filter(candidates(), &existing).collect();
        assert_eq!(remaining.len(), 3);
        assert!(remaining.iter().any(|r| r.entity_id == "B" && r.date == d(2)));
    }

    #[tokio::test]
    async fn test_query_failure_returns_empty_set() {
        // 테이블이 없으면 조회 실패
        let detector = GapDetector::new(Arc::new(MemoryStore::new()), GapGranularity::Date);
        let existing = detector
            .existing_keys_with(&table(), DateRange::single(d(2)), GapGranularity::Date)
            .await;
        assert!(existing.is_empty());
    }

    #[test]
    fn test_covers_requires_every_day() {
        let keys = ExistingKeys::EntityDates(HashSet::from([
            ("A".to_string(), d(2)),
            ("A".to_string(), d(3)),
            ("B".to_string(), d(2)),
        ]));
        assert!(keys.covers("A", &[d(2), d(3)]));
        assert!(!keys.covers("B", &[d(2), d(3)]));
        assert!(!keys.covers("C", &[d(2)]));
        assert!(!keys.covers("A", &[]));

        let dates = ExistingKeys::Dates(HashSet::from([d(2)]));
        assert!(dates.covers("any", &[d(2)]));
        assert!(!dates.covers("any", &[d(2), d(3)]));
    }

    #[test]
    fn test_granularity_from_str() {
        assert_eq!("date".parse::<GapGranularity>().unwrap(), GapGranularity::Date);
        assert_eq!(
            "entity_date".parse::<GapGranularity>().unwrap(),
            GapGranularity::EntityDate
        );
        assert!("hour".parse::<GapGranularity>().is_err());
    }
}
