//! 거래일 계산.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use factor_core::DateRange;
use factor_data::DataProvider;

use crate::error::{Result, SyncError};

/// 거래일 목록의 출처.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarSource {
    /// 데이터 제공자의 거래일 캘린더
    Provider,
    /// 제공자 조회 실패 시 월~금 (공휴일 미반영)
    WeekdayFallback,
}

/// 거래일 계산 결과.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCalendar {
    /// 오름차순, 중복 없음
    pub dates: Vec<NaiveDate>,
    pub source: CalendarSource,
}

/// 거래일 캘린더.
pub struct TradingCalendar {
    provider: Arc<dyn DataProvider>,
}

impl TradingCalendar {
    pub fn new(provider: Arc<dyn DataProvider>) -> Self {
        Self { provider }
    }

    /// `[start, end]` 구간의 거래일.
    pub async fn resolve(&self, start: NaiveDate, end: NaiveDate) -> Result<ResolvedCalendar> {
        let range = DateRange::new(start, end)
            .map_err(|e| SyncError::CalendarUnavailable(e.to_string()))?;

        match self.provider.trading_dates(start, end).await {
            Ok(mut dates) => {
                dates.retain(|d| range.contains(*d));
                dates.sort_unstable();
                dates.dedup();
                debug!(range = %range, count = dates.len(), "거래일 조회 완료");
                Ok(ResolvedCalendar {
                    dates,
                    source: CalendarSource::Provider,
                })
            }
            Err(e) => {
                warn!(
                    range = %range,
                    error = %e,
                    "거래일 조회 실패, 평일 기준으로 대체 (공휴일 미반영)"
                );
                Ok(ResolvedCalendar {
                    dates: range.weekdays().collect(),
                    source: CalendarSource::WeekdayFallback,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use factor_data::ProviderError;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[tokio::test]
    async fn test_provider_dates_are_clipped_sorted_and_deduped() {
        let provider = ScriptedProvider::new()
            .with_trading_dates(vec![d(5), d(2), d(2), d(31), d(3)]);
        let calendar = TradingCalendar::new(Arc::new(provider));

        let resolved = calendar.resolve(d(1), d(5)).await.unwrap();
        assert_eq!(resolved.dates, vec![d(2), d(3), d(5)]);
        assert_eq!(resolved.source, CalendarSource::Provider);
    }

    #[tokio::test]
    async fn test_weekday_fallback_on_provider_failure() {
        let provider = ScriptedProvider::new()
            .with_calendar_error(ProviderError::Transport("connection refused".into()));
        let calendar = TradingCalendar::new(Arc::new(provider));

        // 2024-01-06, 07은 주말
        let resolved = calendar.resolve(d(5), d(8)).await.unwrap();
        assert_eq!(resolved.dates, vec![d(5), d(8)]);
        assert_eq!(resolved.source, CalendarSource::WeekdayFallback);
    }

    #[tokio::test]
    async fn test_inverted_range_is_unavailable() {
        let calendar = TradingCalendar::new(Arc::new(ScriptedProvider::new()));
        let err = calendar.resolve(d(5), d(1)).await.unwrap_err();
        assert!(matches!(err, SyncError::CalendarUnavailable(_)));
    }
}
