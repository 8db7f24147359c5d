//! 처리 단위 (하루 또는 날짜 구간).

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use factor_core::{parse_date, DateRange};

use crate::error::{Result, SyncError};

/// 처리 모드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitMode {
    /// 거래일마다 하나의 단위
    Day,
    /// 구간 전체가 하나의 단위
    Range,
}

impl std::str::FromStr for UnitMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" | "daily" => Ok(Self::Day),
            "range" => Ok(Self::Range),
            other => Err(format!("알 수 없는 처리 모드: {}", other)),
        }
    }
}

/// 동기화 처리 단위.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ProcessingUnit {
    pub range: DateRange,
    pub mode: UnitMode,
}

impl ProcessingUnit {
    pub fn day(date: NaiveDate) -> Self {
        Self {
            range: DateRange::single(date),
            mode: UnitMode::Day,
        }
    }

    pub fn range(range: DateRange) -> Self {
        Self {
            range,
            mode: UnitMode::Range,
        }
    }

    /// 종목 유니버스 기준일.
    pub fn as_of(&self) -> NaiveDate {
        self.range.start
    }
}

impl fmt::Display for ProcessingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.range)
    }
}

/// 처리 단위 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Pending,
    Fetching,
    Normalizing,
    Filtering,
    Writing,
    Succeeded,
    Failed,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Normalizing => "normalizing",
            Self::Filtering => "filtering",
            Self::Writing => "writing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// CLI 날짜 인자로부터 대상 구간 결정.
///
/// - `start`가 있으면 `[start, end 또는 today]`
/// - 없으면 최근 `recent_days`일 (기본 1일, 즉 오늘)
pub fn resolve_range(
    start: Option<&str>,
    end: Option<&str>,
    recent_days: Option<u32>,
    today: NaiveDate,
) -> Result<DateRange> {
    let end = match end {
        Some(s) => parse_date(s)?,
        None => today,
    };

    match start {
        Some(s) => {
            let start = parse_date(s)?;
            DateRange::new(start, end)
                .map_err(|e| SyncError::CalendarUnavailable(e.to_string()))
        }
        None => Ok(DateRange::recent(end, recent_days.unwrap_or(1))),
    }
}
