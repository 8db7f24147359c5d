//! 종목 마스터 정보.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 종목 기본 정보.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentInfo {
    /// 종목 식별자 (예: 000001.XSHE)
    pub order_book_id: String,
    /// 종목명
    pub symbol: Option<String>,
    /// 거래소 (XSHG, XSHE 등)
    pub exchange: Option<String>,
    /// 종목 유형 (CS: 보통주, ETF 등)
    pub instrument_type: Option<String>,
    /// 상장일
    pub listed_date: Option<NaiveDate>,
    /// 상장폐지일
    pub de_listed_date: Option<NaiveDate>,
}

impl InstrumentInfo {
    pub fn new(order_book_id: impl Into<String>) -> Self {
        Self {
            order_book_id: order_book_id.into(),
            symbol: None,
            exchange: None,
            instrument_type: None,
            listed_date: None,
            de_listed_date: None,
        }
    }
}

