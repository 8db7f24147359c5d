//! Incremental factor/price synchronization engine.
//!
//! 데이터 제공자에서 종목별/일자별 팩터와 시세를 가져와 관계형 저장소에
//! 증분 적재합니다:
//! - 거래일 계산 (제공자 캘린더, 실패 시 평일 대체)
//! - 기존 데이터 판별 후 누락분만 조회
//! - 청크 단위 조회와 재시도, 청크별 실패 격리
//! - 와이드 → 롱 포맷 변환 및 무한대/결측 정제
//! - 기본키 기반 멱등 append
//! - 종목 마스터 증분 동기화

pub mod config;
pub mod error;
pub mod modules;
pub mod report;

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
pub(crate) mod testing;

pub use config::{EngineConfig, SyncConfig};
pub use error::{Result, SyncError};
pub use report::SyncReport;
