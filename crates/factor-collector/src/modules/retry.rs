//! 청크 재시도 정책.
//!
//! 정책은 순수 함수(`RetryPolicy::next_action`)이고, 시도 횟수는
//! 청크마다 새로 만드는 `RetryState`가 보관합니다.

use std::time::Duration;

use factor_data::{FetchErrorKind, ProviderError};

use crate::config::EngineConfig;

/// 백오프 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryMode {
    /// 선형 증가 `min(step × attempt, cap)`
    Bulk,
    /// 고정 대기
    Day,
}

/// 실패 후 다음 동작.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// 대기 후 재시도
    Retry(Duration),
    /// 청크를 건너뛰고 다음 청크 진행
    Skip,
    /// 처리 단위 중단
    Abort,
}

/// 재시도 정책.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub step: Duration,
    pub cap: Duration,
    pub day_wait: Duration,
    pub connection_drop_extra: Duration,
    pub mode: RetryMode,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default(), RetryMode::Bulk)
    }
}

impl RetryPolicy {
    pub fn from_config(config: &EngineConfig, mode: RetryMode) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            step: Duration::from_secs(config.retry_step_secs),
            cap: Duration::from_secs(config.retry_cap_secs),
            day_wait: Duration::from_secs(config.day_retry_wait_secs),
            connection_drop_extra: Duration::from_secs(config.connection_drop_extra_secs),
            mode,
        }
    }

    pub fn with_mode(mut self, mode: RetryMode) -> Self {
        self.mode = mode;
        self
    }

    /// `attempt`번째 시도가 `kind`로 실패했을 때의 다음 동작.
    pub fn next_action(&self, attempt: u32, kind: FetchErrorKind) -> RetryAction {
        match kind {
            FetchErrorKind::Fatal => RetryAction::Abort,
            FetchErrorKind::ValueOutOfRange => RetryAction::Skip,
            _ if attempt >= self.max_attempts => RetryAction::Skip,
            FetchErrorKind::ConnectionDropped => {
                RetryAction::Retry(self.backoff(attempt) + self.connection_drop_extra)
            }
            _ => RetryAction::Retry(self.backoff(attempt)),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        match self.mode {
            RetryMode::Bulk => self.step.saturating_mul(attempt).min(self.cap),
            RetryMode::Day => self.day_wait,
        }
    }
}

/// 시도 횟수를 소모하는 오류 여부.
pub fn consumes_attempt(kind: FetchErrorKind) -> bool {
    !matches!(kind, FetchErrorKind::ValueOutOfRange | FetchErrorKind::Fatal)
}

/// 청크 하나의 재시도 상태.
#[derive(Debug, Default)]
pub struct RetryState {
    attempts: u32,
    last_error: Option<ProviderError>,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 실패 기록 후 정책에 따른 다음 동작 반환.
    pub fn record_failure(&mut self, policy: &RetryPolicy, error: ProviderError) -> RetryAction {
        let kind = error.kind();
        if consumes_attempt(kind) {
            self.attempts += 1;
        }
        self.last_error = Some(error);
        policy.next_action(self.attempts, kind)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&ProviderError> {
        self.last_error.as_ref()
    }
}
