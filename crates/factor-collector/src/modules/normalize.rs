//! 와이드 → 롱 포맷 변환 및 정제.
//!
//! 정제 순서:
//! 1. ±∞ → 결측
//! 2. 결측/NaN 제거 (`retain_nulled_infinities`이면 무한대였던 값은 NULL로 유지)
//! 3. 종목/날짜/필드 이름이 없는 레코드 제거

use thiserror::Error;

use factor_core::{FactorRecord, WideRow, WideTable};

/// 정제 옵션.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// 무한대를 제거하지 않고 NULL로 저장
    pub retain_nulled_infinities: bool,
}

/// 정제 통계.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningStats {
    /// 변환 전 셀 수 (행 × 필드)
    pub cells: usize,
    /// 결측으로 바뀐 무한대 값
    pub infinities: usize,
    /// 결측/NaN으로 제거된 값
    pub missing: usize,
    /// 키 누락으로 제거된 값
    pub invalid_keys: usize,
    /// 남은 레코드
    pub kept: usize,
}

impl CleaningStats {
    pub fn dropped(&self) -> usize {
        self.missing + self.invalid_keys
    }

    pub fn merge(&mut self, other: &CleaningStats) {
        self.cells += other.cells;
        self.infinities += other.infinities;
        self.missing += other.missing;
        self.invalid_keys += other.invalid_keys;
        self.kept += other.kept;
    }
}

/// 구조적으로 잘못된 와이드 테이블.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{row}번째 행의 값 개수({found})가 필드 수({expected})와 다름")]
pub struct MalformedTable {
    pub row: usize,
    pub expected: usize,
    pub found: usize,
}

/// 와이드 테이블을 정제된 롱 포맷 레코드로 변환.
///
/// 구조 검사는 즉시 수행하고, 변환은 반복자를 소비할 때 지연 수행합니다.
pub fn normalize(
    table: &WideTable,
    options: NormalizeOptions,
) -> Result<Normalized<'_>, MalformedTable> {
    let expected = table.field_count();
    if let Some((row, found)) = table
        .rows
        .iter()
        .enumerate()
        .map(|(i, r)| (i, r.values.len()))
        .find(|(_, len)| *len != expected)
    {
        return Err(MalformedTable {
            row,
            expected,
            found,
        });
    }

    Ok(Normalized {
        table,
        options,
        row: 0,
        field: 0,
        stats: CleaningStats::default(),
    })
}

/// 지연 변환 반복자.
#[derive(Debug)]
pub struct Normalized<'a> {
    table: &'a WideTable,
    options: NormalizeOptions,
    row: usize,
    field: usize,
    stats: CleaningStats,
}

impl Normalized<'_> {
    /// 지금까지 소비된 셀의 통계.
    pub fn stats(&self) -> CleaningStats {
        self.stats
    }

    fn clean(&mut self, row: &WideRow, field_name: &str, raw: Option<f64>) -> Option<FactorRecord> {
        self.stats.cells += 1;

        let was_infinite = matches!(raw, Some(v) if v.is_infinite());
        if was_infinite {
            self.stats.infinities += 1;
        }

        let value = raw.filter(|v| v.is_finite());
        if value.is_none() && !(was_infinite && self.options.retain_nulled_infinities) {
            self.stats.missing += 1;
            return None;
        }

        let (Some(entity_id), Some(date)) = (row.entity_id.as_deref(), row.date) else {
            self.stats.invalid_keys += 1;
            return None;
        };
        if entity_id.trim().is_empty() || field_name.trim().is_empty() {
            self.stats.invalid_keys += 1;
            return None;
        }

        self.stats.kept += 1;
        Some(FactorRecord::new(entity_id, date, field_name, value))
    }
}

impl Iterator for Normalized<'_> {
    type Item = FactorRecord;

    fn next(&mut self) -> Option<FactorRecord> {
        let table = self.table;
        while let Some(row) = table.rows.get(self.row) {
            while let Some(field_name) = table.fields.get(self.field) {
                let raw = row.values[self.field];
                self.field += 1;
                if let Some(record) = self.clean(row, field_name, raw) {
                    return Some(record);
                }
            }
            self.row += 1;
            self.field = 0;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;

    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cleaning_drops_invalid_values() {
        let table = WideTable::new(fields(&["pe", "pb", "roe"]))
            .with_row(WideRow::new("A", d(2), vec![Some(1.5), Some(f64::INFINITY), None]))
            .with_row(WideRow::new(
                "B",
                d(2),
                vec![Some(f64::NAN), Some(f64::NEG_INFINITY), Some(-0.25)],
            ));

        let mut records = normalize(&table, NormalizeOptions::default()).unwrap();
        let kept: Vec<FactorRecord> = records.by_ref().collect();

        assert_eq!(
            kept,
            vec![
                FactorRecord::new("A", d(2), "pe", Some(1.5)),
                FactorRecord::new("B", d(2), "roe", Some(-0.25)),
            ]
        );
        assert_eq!(
            records.stats(),
            CleaningStats {
                cells: 6,
                infinities: 2,
                missing: 4,
                invalid_keys: 0,
                kept: 2,
            }
        );
    }

    #[test]
    fn test_retain_nulled_infinities() {
        let table = WideTable::new(fields(&["pe", "pb"]))
            .with_row(WideRow::new("A", d(2), vec![Some(f64::INFINITY), None]));

        let options = NormalizeOptions {
            retain_nulled_infinities: true,
        };
        let kept: Vec<FactorRecord> = normalize(&table, options).unwrap().collect();
        assert_eq!(kept, vec![FactorRecord::new("A", d(2), "pe", None)]);
    }

    #[test]
    fn test_missing_keys_dropped() {
        let table = WideTable::new(fields(&["pe", ""]))
            .with_row(WideRow {
                entity_id: None,
                date: Some(d(2)),
                values: vec![Some(1.0), Some(2.0)],
            })
            .with_row(WideRow::new("B", d(2), vec![Some(3.0), Some(4.0)]));

        let mut records = normalize(&table, NormalizeOptions::default()).unwrap();
        let kept: Vec<FactorRecord> = records.by_ref().collect();

        assert_eq!(kept, vec![FactorRecord::new("B", d(2), "pe", Some(3.0))]);
        assert_eq!(records.stats().invalid_keys, 3);
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        let table = WideTable::new(fields(&["pe", "pb"]))
            .with_row(WideRow::new("A", d(2), vec![Some(1.0), Some(2.0)]))
            .with_row(WideRow::new("B", d(2), vec![Some(1.0)]));

        let err = normalize(&table, NormalizeOptions::default()).unwrap_err();
        assert_eq!(
            err,
            MalformedTable {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_empty_table() {
        let table = WideTable::empty();
        assert_eq!(normalize(&table, NormalizeOptions::default()).unwrap().count(), 0);
    }

    fn cell() -> impl Strategy<Value = Option<f64>> {
        prop_oneof![
            Just(None),
            Just(Some(f64::NAN)),
            Just(Some(f64::INFINITY)),
            Just(Some(f64::NEG_INFINITY)),
            (-1.0e6f64..1.0e6).prop_map(Some),
        ]
    }

    proptest! {
        #[test]
        fn prop_reshape_cardinality(
            field_count in 1usize..8,
            rows in prop::collection::vec(prop::collection::vec(cell(), 8), 0..20),
        ) {
            let names: Vec<String> = (0..field_count).map(|i| format!("f{}", i)).collect();
            let mut table = WideTable::new(names);
            for (i, values) in rows.iter().enumerate() {
                table.push_row(WideRow::new(format!("E{}", i), d(2), values[..field_count].to_vec()));
            }

            let mut records = normalize(&table, NormalizeOptions::default()).unwrap();
            let kept: Vec<FactorRecord> = records.by_ref().collect();
            let stats = records.stats();

            prop_assert_eq!(stats.cells, rows.len() * field_count);
            prop_assert_eq!(stats.kept + stats.dropped(), stats.cells);
            prop_assert_eq!(kept.len(), stats.kept);
            prop_assert!(kept.iter().all(|r| r.value.map(f64::is_finite).unwrap_or(false)));
        }
    }
}
