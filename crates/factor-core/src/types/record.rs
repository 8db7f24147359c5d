//! 롱 포맷 레코드.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 저장 단위가 되는 원자적 사실: (종목, 날짜, 필드, 값).
///
/// `(entity_id, date, field_name)`이 싱크 전체에서 유일한 자연키입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRecord {
    pub entity_id: String,
    pub date: NaiveDate,
    pub field_name: String,
    /// NULL 허용 (무한대 값을 NULL로 보존하는 설정에서만 `None`이 저장됨)
    pub value: Option<f64>,
}

impl FactorRecord {
    pub fn new(
        entity_id: impl Into<String>,
        date: NaiveDate,
        field_name: impl Into<String>,
        value: Option<f64>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            date,
            field_name: field_name.into(),
            value,
        }
    }

    /// 중복 제거 키.
    pub fn key(&self) -> RecordKey {
        RecordKey {
            entity_id: self.entity_id.clone(),
            date: self.date,
            field_name: self.field_name.clone(),
        }
    }
}

/// 자연키 `(entity_id, date, field_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub entity_id: String,
    pub date: NaiveDate,
    pub field_name: String,
}
