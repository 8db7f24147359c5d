//! # Factor Core
//!
//! 동기화 파이프라인 전반에서 공유하는 기본 타입을 제공합니다:
//! - 롱 포맷 레코드 (`FactorRecord`) 및 자연키 (`RecordKey`)
//! - 데이터 제공자의 와이드 테이블 (`WideTable`)
//! - 날짜 범위 및 날짜 파싱 (YYYYMMDD / YYYY-MM-DD)
//! - 종목 마스터 정보
//! - SQL 식별자 검증
//! - 로깅 인프라

pub mod error;
pub mod logging;
pub mod types;

pub use error::*;
pub use logging::*;
pub use types::*;
