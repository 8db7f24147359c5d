//! 날짜 범위 및 날짜 파싱 헬퍼.

use std::fmt;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// 닫힌 날짜 구간 `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// 새 날짜 범위 생성. `start > end`이면 에러.
    pub fn new(start: NaiveDate, end: NaiveDate) -> CoreResult<Self> {
        if start > end {
            return Err(CoreError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// 하루짜리 범위.
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// `today`를 포함한 최근 `days`일 범위 (최소 1일).
    pub fn recent(today: NaiveDate, days: u32) -> Self {
        let back = u64::from(days.max(1) - 1);
        let start = today
            .checked_sub_days(Days::new(back))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// 범위 내 모든 달력일 (오름차순).
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// 범위 내 평일(월~금)만.
    pub fn weekdays(&self) -> impl Iterator<Item = NaiveDate> {
        self.days().filter(|d| is_weekday(*d))
    }

    /// 포함된 달력일 수.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}~{}", self.start, self.end)
        }
    }
}

/// 월~금 여부.
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// `YYYYMMDD` 또는 `YYYY-MM-DD` 형식의 날짜 파싱.
pub fn parse_date(s: &str) -> CoreResult<NaiveDate> {
    let s = s.trim();
    let format = if s.contains('-') { "%Y-%m-%d" } else { "%Y%m%d" };
    NaiveDate::parse_from_str(s, format).map_err(|_| CoreError::InvalidDate(s.to_string()))
}

/// 데이터 제공자 요청용 `YYYYMMDD` 문자열.
pub fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_date_both_formats() {
        assert_eq!(parse_date("20240102").unwrap(), d(2024, 1, 2));
        assert_eq!(parse_date("2024-01-02").unwrap(), d(2024, 1, 2));
        assert_eq!(parse_date(" 2024-01-02 ").unwrap(), d(2024, 1, 2));
        assert!(parse_date("2024/01/02").is_err());
        assert!(parse_date("20241302").is_err());
    }

    #[test]
    fn test_range_rejects_inverted() {
        assert!(DateRange::new(d(2024, 1, 3), d(2024, 1, 1)).is_err());
        assert!(DateRange::new(d(2024, 1, 1), d(2024, 1, 1)).is_ok());
    }

    #[test]
    fn test_weekdays_skip_weekend() {
        // 2024-01-05 금, 01-06 토, 01-07 일, 01-08 월
        let range = DateRange::new(d(2024, 1, 5), d(2024, 1, 8)).unwrap();
        let days: Vec<_> = range.weekdays().collect();
        assert_eq!(days, vec![d(2024, 1, 5), d(2024, 1, 8)]);
        assert_eq!(range.len_days(), 4);
    }

    #[test]
    fn test_recent_days() {
        let range = DateRange::recent(d(2024, 3, 10), 5);
        assert_eq!(range.start, d(2024, 3, 6));
        assert_eq!(range.end, d(2024, 3, 10));

        let today_only = DateRange::recent(d(2024, 3, 10), 0);
        assert_eq!(today_only, DateRange::single(d(2024, 3, 10)));
    }

    #[test]
    fn test_display() {
        assert_eq!(DateRange::single(d(2024, 1, 2)).to_string(), "2024-01-02");
        let range = DateRange::new(d(2024, 1, 1), d(2024, 1, 3)).unwrap();
        assert_eq!(range.to_string(), "2024-01-01~2024-01-03");
        assert_eq!(compact_date(d(2024, 1, 3)), "20240103");
    }

    proptest! {
        #[test]
        fn prop_weekdays_subset_of_days(offset in 0i64..3650, len in 0u32..60) {
            let start = d(2015, 1, 1) + chrono::Duration::days(offset);
            let range = DateRange::recent(start, len + 1);

            let days: Vec<_> = range.days().collect();
            prop_assert_eq!(days.len() as i64, range.len_days());
            prop_assert!(days.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(range.weekdays().all(|d| is_weekday(d) && range.contains(d)));
        }
    }
}
