//! 데이터 제공자 연동 및 저장소.
//!
//! 이 crate는 다음을 제공합니다:
//! - 데이터 제공자 추상화 (`DataProvider`) 및 HTTP 게이트웨이 구현
//! - 롱 포맷 팩터 테이블 싱크 (`FactorSink`) - PostgreSQL / 인메모리
//! - 종목 마스터 테이블 싱크 (`InstrumentSink`)

pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};

pub use provider::{
    DataProvider, FetchErrorKind, HttpDataProvider, HttpProviderConfig, ProviderError,
    ProviderResult,
};

pub use storage::{
    Database, DatabaseConfig, FactorSink, InstrumentSink, MemoryStore, PgFactorStore,
    PgInstrumentStore,
};
