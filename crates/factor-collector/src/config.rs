//! 환경변수 기반 설정 모듈.

use std::time::Duration;

use factor_core::TableName;
use factor_data::{DatabaseConfig, HttpProviderConfig};

use crate::error::{Result, SyncError};
use crate::modules::gap::GapGranularity;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// 데이터베이스 URL (`--dry-run`에서는 없어도 됨)
    pub database_url: Option<String>,
    /// 풀의 최대 연결 수
    pub db_max_connections: u32,
    /// 데이터 제공자 설정
    pub provider: ProviderSettings,
    /// 동기화 엔진 설정
    pub engine: EngineConfig,
    /// 팩터 테이블 설정
    pub factor: FactorTableConfig,
    /// 시세 테이블 설정
    pub price: PriceTableConfig,
    /// 종목 마스터 설정
    pub instrument: InstrumentTableConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// 데이터 제공자 설정
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

/// 동기화 엔진 설정
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 청크당 종목 수
    pub chunk_size: usize,
    /// 청크당 최대 시도 횟수
    pub max_attempts: u32,
    /// 일괄 모드 백오프 증가폭 (초)
    pub retry_step_secs: u64,
    /// 일괄 모드 백오프 상한 (초)
    pub retry_cap_secs: u64,
    /// 일별 모드 고정 대기 (초)
    pub day_retry_wait_secs: u64,
    /// 연결 끊김 시 추가 대기 (초)
    pub connection_drop_extra_secs: u64,
    /// 일별 처리 간 딜레이 (밀리초)
    pub day_delay_ms: u64,
    /// 청크 간 딜레이 (밀리초)
    pub chunk_delay_ms: u64,
    /// 기존 데이터 판별 단위
    pub gap_granularity: GapGranularity,
    /// 무한대 값을 NULL로 저장할지 여부
    pub keep_null_infinities: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            max_attempts: 3,
            retry_step_secs: 5,
            retry_cap_secs: 15,
            day_retry_wait_secs: 2,
            connection_drop_extra_secs: 5,
            day_delay_ms: 1000,
            chunk_delay_ms: 100,
            gap_granularity: GapGranularity::Date,
            keep_null_infinities: false,
        }
    }
}

/// 팩터 테이블 설정
#[derive(Debug, Clone)]
pub struct FactorTableConfig {
    /// 팩터 유형 (예: alpha101)
    pub factor_type: String,
    pub table: TableName,
    /// 쓰기 배치 크기 (None이면 한 번에)
    pub insert_batch: Option<usize>,
}

/// 시세 테이블 설정
#[derive(Debug, Clone)]
pub struct PriceTableConfig {
    pub table: TableName,
    pub insert_batch: Option<usize>,
}

/// 종목 마스터 설정
#[derive(Debug, Clone)]
pub struct InstrumentTableConfig {
    pub table: TableName,
    /// 종목 유형 (CS: 보통주)
    pub instrument_type: String,
}

/// 데몬 실행 주기 상한 (7일)
const MAX_DAEMON_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 실행 주기 (분 단위)
    pub interval_minutes: u64,
    /// 매 실행 시 동기화할 최근 일수
    pub recent_days: u32,
}

impl SyncConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let default_engine = EngineConfig::default();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            db_max_connections: env_var_parse("DB_MAX_CONNECTIONS", 4),
            provider: ProviderSettings {
                url: std::env::var("PROVIDER_URL")
                    .unwrap_or_else(|_| HttpProviderConfig::default().base_url),
                token: std::env::var("PROVIDER_TOKEN").ok(),
                timeout_secs: env_var_parse("PROVIDER_TIMEOUT_SECS", 60),
            },
            engine: EngineConfig {
                chunk_size: env_var_parse("SYNC_CHUNK_SIZE", default_engine.chunk_size),
                max_attempts: env_var_parse("SYNC_MAX_ATTEMPTS", default_engine.max_attempts),
                retry_step_secs: env_var_parse(
                    "SYNC_RETRY_STEP_SECS",
                    default_engine.retry_step_secs,
                ),
                retry_cap_secs: env_var_parse("SYNC_RETRY_CAP_SECS", default_engine.retry_cap_secs),
                day_retry_wait_secs: env_var_parse(
                    "SYNC_DAY_RETRY_WAIT_SECS",
                    default_engine.day_retry_wait_secs,
                ),
                connection_drop_extra_secs: env_var_parse(
                    "SYNC_CONNECTION_DROP_EXTRA_SECS",
                    default_engine.connection_drop_extra_secs,
                ),
                day_delay_ms: env_var_parse("SYNC_DAY_DELAY_MS", default_engine.day_delay_ms),
                chunk_delay_ms: env_var_parse("SYNC_CHUNK_DELAY_MS", default_engine.chunk_delay_ms),
                gap_granularity: env_var_parse("SYNC_GAP_GRANULARITY", GapGranularity::Date),
                keep_null_infinities: env_var_bool("SYNC_KEEP_NULL_INF", false),
            },
            factor: FactorTableConfig {
                factor_type: env_var_or("FACTOR_TYPE", "alpha101"),
                table: env_table("FACTOR_TABLE", "factor_alpha101")?,
                insert_batch: env_var_opt("FACTOR_INSERT_BATCH"),
            },
            price: PriceTableConfig {
                table: env_table("PRICE_TABLE", "stock_price")?,
                insert_batch: Some(env_var_parse("PRICE_INSERT_BATCH", 1000)),
            },
            instrument: InstrumentTableConfig {
                table: env_table("INSTRUMENT_TABLE", "stock_info")?,
                instrument_type: env_var_or("INSTRUMENT_TYPE", "CS"),
            },
            daemon: DaemonConfig {
                interval_minutes: env_var_parse("DAEMON_INTERVAL_MINUTES", 60),
                recent_days: env_var_parse("DAEMON_RECENT_DAYS", 5),
            },
        })
    }

    /// 데이터베이스 연결 설정. `DATABASE_URL`이 없으면 설정 오류.
    pub fn database(&self) -> Result<DatabaseConfig> {
        let url = self.database_url.as_deref().ok_or_else(|| {
            SyncError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
        })?;

        let mut config = DatabaseConfig::new(url);
        config.max_connections = self.db_max_connections;
        Ok(config)
    }

    /// HTTP 게이트웨이 클라이언트 설정.
    pub fn http_provider(&self) -> HttpProviderConfig {
        HttpProviderConfig {
            base_url: self.provider.url.clone(),
            token: self.provider.token.clone(),
            timeout_secs: self.provider.timeout_secs,
            instrument_type: self.instrument.instrument_type.clone(),
        }
    }
}

impl EngineConfig {
    pub fn day_delay(&self) -> Duration {
        Duration::from_millis(self.day_delay_ms)
    }

    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }
}

impl DaemonConfig {
    /// 실행 주기를 Duration으로 반환 (1분 ~ 7일)
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.clamp(1, MAX_DAEMON_INTERVAL_MINUTES) * 60)
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_var_opt(key).unwrap_or(default)
}

/// 환경변수에서 값을 파싱 (없거나 실패 시 None)
fn env_var_opt<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// 테이블 이름 환경변수. 식별자 규칙 위반은 설정 오류.
fn env_table(key: &str, default: &str) -> Result<TableName> {
    TableName::parse(env_var_or(key, default))
        .map_err(|e| SyncError::Config(format!("{}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let engine = EngineConfig::default();
        assert_eq!(engine.chunk_size, 100);
        assert_eq!(engine.max_attempts, 3);
        assert_eq!(engine.chunk_delay(), Duration::from_millis(100));
        assert_eq!(engine.day_delay(), Duration::from_secs(1));
        assert_eq!(engine.gap_granularity, GapGranularity::Date);
    }

    #[test]
    fn test_env_var_parse_falls_back() {
        std::env::set_var("FACTOR_SYNC_TEST_BAD_NUMBER", "abc");
        assert_eq!(env_var_parse("FACTOR_SYNC_TEST_BAD_NUMBER", 7u32), 7);
        std::env::set_var("FACTOR_SYNC_TEST_GOOD_NUMBER", " 42 ");
        assert_eq!(env_var_parse("FACTOR_SYNC_TEST_GOOD_NUMBER", 7u32), 42);
        assert_eq!(env_var_opt::<usize>("FACTOR_SYNC_TEST_UNSET"), None);
    }

    #[test]
    fn test_env_table_rejects_invalid_identifier() {
        std::env::set_var("FACTOR_SYNC_TEST_TABLE", "factor; DROP TABLE x");
        let err = env_table("FACTOR_SYNC_TEST_TABLE", "factor_alpha101").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_daemon_interval_is_bounded() {
        let zero = DaemonConfig {
            interval_minutes: 0,
            recent_days: 5,
        };
        assert_eq!(zero.interval(), Duration::from_secs(60));

        let huge = DaemonConfig {
            interval_minutes: u64::MAX,
            recent_days: 5,
        };
        assert_eq!(huge.interval(), Duration::from_secs(7 * 24 * 60 * 60));
    }
}
