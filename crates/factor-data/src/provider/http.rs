//! JSON 게이트웨이 데이터 제공자.
//!
//! 데이터 SDK 앞단의 HTTP 게이트웨이에 다음 형식으로 요청합니다:
//!
//! ```text
//! POST {base_url}
//! {"api_name": "get_factor", "token": "...", "params": {...}}
//!
//! → {"code": 0, "msg": null, "data": {"fields": [...], "items": [[...], ...]}}
//! ```
//!
//! 시계열 응답은 `order_book_id`, `date` 열과 필드별 값 열로 구성된
//! 와이드 테이블입니다. JSON이 표현하지 못하는 무한대/NaN은
//! `"inf"`, `"-inf"`, `"nan"` 문자열로 전달됩니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! let provider = HttpDataProvider::new(HttpProviderConfig {
//!     base_url: "http://127.0.0.1:8600/api".to_string(),
//!     ..Default::default()
//! })?;
//! let dates = provider.trading_dates(start, end).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use factor_core::{compact_date, parse_date, DateRange, InstrumentInfo, WideRow, WideTable};

use super::{DataProvider, ProviderError, ProviderResult};

/// 종목 식별자 열 이름
const ENTITY_COLUMN: &str = "order_book_id";
/// 날짜 열 이름 후보
const DATE_COLUMNS: [&str; 3] = ["date", "trade_date", "datetime"];

/// HTTP 게이트웨이 설정.
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    /// 게이트웨이 URL
    pub base_url: String,
    /// 정적 인증 토큰 (선택)
    pub token: Option<String>,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 종목 유니버스 조회 시 사용할 종목 유형
    pub instrument_type: String,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8600/api".to_string(),
            token: None,
            timeout_secs: 60,
            instrument_type: "CS".to_string(),
        }
    }
}

/// HTTP 게이트웨이 클라이언트.
#[derive(Clone)]
pub struct HttpDataProvider {
    client: reqwest::Client,
    config: HttpProviderConfig,
}

#[derive(Serialize)]
struct GatewayRequest<'a> {
    api_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<GatewayFrame>,
}

/// 응답 데이터 프레임.
#[derive(Debug, Default, Deserialize)]
struct GatewayFrame {
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    items: Vec<Vec<Value>>,
}

impl GatewayFrame {
    fn column_index(&self, names: &[&str]) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| names.iter().any(|n| f.eq_ignore_ascii_case(n)))
    }

    /// 지정 열(없으면 첫 열)의 값들.
    fn column<'a>(&'a self, names: &[&str]) -> impl Iterator<Item = &'a Value> + 'a {
        let index = self.column_index(names).unwrap_or(0);
        self.items.iter().filter_map(move |row| row.get(index))
    }
}

impl HttpDataProvider {
    pub fn new(config: HttpProviderConfig) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Fatal(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self { client, config })
    }

    /// 게이트웨이 API 호출.
    async fn call(&self, api_name: &str, params: Value) -> ProviderResult<GatewayFrame> {
        debug!(api_name = api_name, url = %self.config.base_url, "게이트웨이 요청");

        let request = GatewayRequest {
            api_name,
            token: self.config.token.as_deref(),
            params,
        };

        let response = self
            .client
            .post(&self.config.base_url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("{} [{}]: {}", api_name, status, body);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => {
                    ProviderError::Fatal(message)
                }
                StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                    ProviderError::Timeout(message)
                }
                _ => ProviderError::Transport(message),
            });
        }

        let body: GatewayResponse = response.json().await?;
        if body.code != 0 {
            let msg = body.msg.unwrap_or_else(|| format!("code {}", body.code));
            return Err(ProviderError::from_message(format!("{}: {}", api_name, msg)));
        }

        Ok(body.data.unwrap_or_default())
    }
}

#[async_trait]
impl DataProvider for HttpDataProvider {
    fn name(&self) -> &str {
        "http-gateway"
    }

    async fn trading_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ProviderResult<Vec<NaiveDate>> {
        let frame = self
            .call(
                "get_trading_dates",
                json!({ "start_date": compact_date(start), "end_date": compact_date(end) }),
            )
            .await?;

        Ok(frame.column(&DATE_COLUMNS).filter_map(cell_date).collect())
    }

    async fn list_entities(&self, as_of: NaiveDate) -> ProviderResult<Vec<String>> {
        let frame = self
            .call(
                "all_instruments",
                json!({ "type": self.config.instrument_type, "date": compact_date(as_of) }),
            )
            .await?;

        Ok(frame.column(&[ENTITY_COLUMN]).filter_map(cell_string).collect())
    }

    async fn list_instruments(
        &self,
        instrument_type: &str,
    ) -> ProviderResult<Vec<InstrumentInfo>> {
        let frame = self
            .call("all_instruments", json!({ "type": instrument_type }))
            .await?;
        frame_to_instruments(&frame)
    }

    async fn factor_names(&self, factor_type: &str) -> ProviderResult<Vec<String>> {
        let frame = self
            .call("get_all_factor_names", json!({ "type": factor_type }))
            .await?;

        Ok(frame
            .column(&["factor_name", "name"])
            .filter_map(cell_string)
            .collect())
    }

    async fn fetch_factors(
        &self,
        ids: &[String],
        fields: &[String],
        range: DateRange,
    ) -> ProviderResult<WideTable> {
        let frame = self
            .call(
                "get_factor",
                json!({
                    "order_book_ids": ids,
                    "factor": fields,
                    "start_date": compact_date(range.start),
                    "end_date": compact_date(range.end),
                }),
            )
            .await?;
        frame_to_wide(frame)
    }

    async fn fetch_prices(&self, ids: &[String], range: DateRange) -> ProviderResult<WideTable> {
        let frame = self
            .call(
                "get_price",
                json!({
                    "order_book_ids": ids,
                    "start_date": compact_date(range.start),
                    "end_date": compact_date(range.end),
                    "frequency": "1d",
                    "adjust_type": "none",
                    "skip_suspended": false,
                }),
            )
            .await?;
        frame_to_wide(frame)
    }
}

// =============================================================================
// 응답 변환
// =============================================================================

/// 응답 프레임을 와이드 테이블로 변환.
///
/// 키 열(`order_book_id`, `date`)을 제외한 나머지 열이 필드가 됩니다.
fn frame_to_wide(frame: GatewayFrame) -> ProviderResult<WideTable> {
    let entity_idx = frame.column_index(&[ENTITY_COLUMN]);
    let date_idx = frame.column_index(&DATE_COLUMNS);

    let (entity_idx, date_idx) = match (entity_idx, date_idx) {
        (Some(e), Some(d)) => (e, d),
        _ if frame.items.is_empty() => return Ok(WideTable::empty()),
        _ => {
            return Err(ProviderError::Parse(format!(
                "키 열 누락 (fields: {:?})",
                frame.fields
            )))
        }
    };

    let value_columns: Vec<usize> = (0..frame.fields.len())
        .filter(|i| *i != entity_idx && *i != date_idx)
        .collect();

    let mut table = WideTable::new(
        value_columns
            .iter()
            .map(|i| frame.fields[*i].clone())
            .collect(),
    );

    for item in &frame.items {
        if item.len() != frame.fields.len() {
            return Err(ProviderError::Parse(format!(
                "행 길이 불일치: {} != {}",
                item.len(),
                frame.fields.len()
            )));
        }

        table.push_row(WideRow {
            entity_id: cell_string(&item[entity_idx]),
            date: cell_date(&item[date_idx]),
            values: value_columns.iter().map(|i| cell_f64(&item[*i])).collect(),
        });
    }

    Ok(table)
}

fn frame_to_instruments(frame: &GatewayFrame) -> ProviderResult<Vec<InstrumentInfo>> {
    let Some(id_idx) = frame.column_index(&[ENTITY_COLUMN]) else {
        if frame.items.is_empty() {
            return Ok(Vec::new());
        }
        return Err(ProviderError::Parse(format!("{} 열 누락", ENTITY_COLUMN)));
    };

    let symbol_idx = frame.column_index(&["symbol"]);
    let exchange_idx = frame.column_index(&["exchange"]);
    let type_idx = frame.column_index(&["type"]);
    let listed_idx = frame.column_index(&["listed_date"]);
    let delisted_idx = frame.column_index(&["de_listed_date"]);

    Ok(frame
        .items
        .iter()
        .filter_map(|row| {
            let order_book_id = row.get(id_idx).and_then(cell_string)?;
            Some(InstrumentInfo {
                order_book_id,
                symbol: pick(row, symbol_idx).and_then(cell_string),
                exchange: pick(row, exchange_idx).and_then(cell_string),
                instrument_type: pick(row, type_idx).and_then(cell_string),
                listed_date: pick(row, listed_idx).and_then(cell_date),
                de_listed_date: pick(row, delisted_idx).and_then(cell_date),
            })
        })
        .collect())
}

fn pick(row: &[Value], idx: Option<usize>) -> Option<&Value> {
    idx.and_then(|i| row.get(i))
}

/// 숫자 셀 변환. 무한대/NaN 문자열도 그대로 f64로 보존합니다.
fn cell_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
            "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
            "nan" => Some(f64::NAN),
            other => other.parse().ok(),
        },
        _ => None,
    }
}

fn cell_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 날짜 셀 변환 (`2024-01-02`, `20240102`, `2024-01-02 00:00:00`, `2024-01-02T00:00:00`).
fn cell_date(value: &Value) -> Option<NaiveDate> {
    let raw = cell_string(value)?;
    let date_part = raw.split([' ', 'T']).next()?;
    parse_date(date_part).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: Value) -> GatewayFrame {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_frame_to_wide() {
        let frame = frame(json!({
            "fields": ["order_book_id", "date", "pe_ratio", "pb_ratio"],
            "items": [
                ["000001.XSHE", "2024-01-02 00:00:00", 5.1, "inf"],
                ["600000.XSHG", "20240102", null, "nan"]
            ]
        }));

        let table = frame_to_wide(frame).unwrap();
        assert_eq!(table.fields, vec!["pe_ratio", "pb_ratio"]);
        assert_eq!(table.row_count(), 2);

        let first = &table.rows[0];
        assert_eq!(first.entity_id.as_deref(), Some("000001.XSHE"));
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(first.values[0], Some(5.1));
        assert_eq!(first.values[1], Some(f64::INFINITY));

        let second = &table.rows[1];
        assert_eq!(second.values[0], None);
        assert!(second.values[1].unwrap().is_nan());
    }

    #[test]
    fn test_frame_to_wide_empty_and_malformed() {
        let empty = frame(json!({ "fields": [], "items": [] }));
        assert!(frame_to_wide(empty).unwrap().is_empty());

        let missing_keys = frame(json!({ "fields": ["pe_ratio"], "items": [[1.0]] }));
        assert!(matches!(
            frame_to_wide(missing_keys),
            Err(ProviderError::Parse(_))
        ));

        let ragged = frame(json!({
            "fields": ["order_book_id", "date", "pe_ratio"],
            "items": [["000001.XSHE", "2024-01-02"]]
        }));
        assert!(frame_to_wide(ragged).is_err());
    }

    #[test]
    fn test_frame_to_instruments() {
        let frame = frame(json!({
            "fields": ["order_book_id", "symbol", "type", "listed_date", "de_listed_date"],
            "items": [
                ["000001.XSHE", "平安银行", "CS", "1991-04-03", "0000-00-00"],
                [null, "unknown", "CS", null, null]
            ]
        }));

        let instruments = frame_to_instruments(&frame).unwrap();
        assert_eq!(instruments.len(), 1);
        assert_eq!(instruments[0].order_book_id, "000001.XSHE");
        assert_eq!(instruments[0].instrument_type.as_deref(), Some("CS"));
        assert_eq!(instruments[0].listed_date, NaiveDate::from_ymd_opt(1991, 4, 3));
        assert_eq!(instruments[0].de_listed_date, None);
    }

    #[test]
    fn test_column_fallback_to_first() {
        let frame = frame(json!({ "fields": ["d"], "items": [["20240102"], ["20240103"]] }));
        let dates: Vec<_> = frame.column(&DATE_COLUMNS).filter_map(cell_date).collect();
        assert_eq!(dates.len(), 2);
    }
}
