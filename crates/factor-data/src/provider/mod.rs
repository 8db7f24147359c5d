//! 데이터 제공자 모듈.
//!
//! 동기화 엔진은 제공자를 불투명한 fetch 능력으로만 다룹니다.
//! 모든 호출은 실패할 수 있으며, 실패는 `ProviderError`로 분류되어
//! 재시도 정책에 전달됩니다.
//!
//! ## 구현체
//! - `HttpDataProvider`: JSON 게이트웨이(`{api_name, token, params}`) 클라이언트

pub mod error;
pub mod http;

pub use error::{FetchErrorKind, ProviderError, ProviderResult};
pub use http::{HttpDataProvider, HttpProviderConfig};

use async_trait::async_trait;
use chrono::NaiveDate;
use factor_core::{DateRange, InstrumentInfo, WideTable};

/// 데이터 제공자 trait.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Provider 이름.
    fn name(&self) -> &str;

    /// 거래일 목록 (오름차순).
    async fn trading_dates(&self, start: NaiveDate, end: NaiveDate)
        -> ProviderResult<Vec<NaiveDate>>;

    /// 기준일에 유효한 종목 식별자 목록.
    async fn list_entities(&self, as_of: NaiveDate) -> ProviderResult<Vec<String>>;

    /// 종목 유형별 전체 종목 마스터.
    async fn list_instruments(&self, instrument_type: &str)
        -> ProviderResult<Vec<InstrumentInfo>>;

    /// 팩터 유형에 속한 팩터 이름 목록.
    async fn factor_names(&self, factor_type: &str) -> ProviderResult<Vec<String>>;

    /// 팩터 값 조회 (와이드 테이블).
    async fn fetch_factors(
        &self,
        ids: &[String],
        fields: &[String],
        range: DateRange,
    ) -> ProviderResult<WideTable>;

    /// 일봉 시세 조회 (와이드 테이블).
    async fn fetch_prices(&self, ids: &[String], range: DateRange) -> ProviderResult<WideTable>;
}
