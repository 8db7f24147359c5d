//! 데이터 제공자의 와이드 테이블.
//!
//! (종목, 날짜)당 한 행, 필드당 한 열로 구성된 원본 형태입니다.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 와이드 테이블의 한 행.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WideRow {
    pub entity_id: Option<String>,
    pub date: Option<NaiveDate>,
    /// `WideTable::fields`와 같은 순서의 값
    pub values: Vec<Option<f64>>,
}

impl WideRow {
    pub fn new(entity_id: impl Into<String>, date: NaiveDate, values: Vec<Option<f64>>) -> Self {
        Self {
            entity_id: Some(entity_id.into()),
            date: Some(date),
            values,
        }
    }
}

/// 필드 목록과 행으로 이루어진 결과 테이블.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WideTable {
    pub fields: Vec<String>,
    pub rows: Vec<WideRow>,
}

impl WideTable {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            rows: Vec::new(),
        }
    }

    /// 행 없는 빈 결과.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_row(mut self, row: WideRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn push_row(&mut self, row: WideRow) {
        self.rows.push(row);
    }

    /// 행이 없으면 구조적으로 빈 결과.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// 롱 포맷 변환 시 생성되는 셀 수 (정제 전).
    pub fn cell_count(&self) -> usize {
        self.row_count() * self.field_count()
    }
}
