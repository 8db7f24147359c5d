//! 데이터 제공자 오류 및 재시도 분류.

use thiserror::Error;

/// 재시도 정책이 참고하는 오류 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// 네트워크/전송 오류 (재시도)
    Transport,
    /// 요청 타임아웃 (재시도)
    Timeout,
    /// 분류 불가 (재시도)
    Unknown,
    /// 저장소가 표현할 수 없는 값 (재시도 없이 건너뜀)
    ValueOutOfRange,
    /// 연결 끊김 (재연결 대기 후 재시도)
    ConnectionDropped,
    /// 인증/요청 자체 오류 (처리 단위 중단)
    Fatal,
}

/// 데이터 제공자 호출 오류.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("전송 오류: {0}")]
    Transport(String),

    #[error("요청 타임아웃: {0}")]
    Timeout(String),

    #[error("연결 끊김: {0}")]
    ConnectionDropped(String),

    #[error("저장 불가능한 값: {0}")]
    ValueOutOfRange(String),

    #[error("치명적 오류: {0}")]
    Fatal(String),

    #[error("응답 파싱 오류: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Transport(_) => FetchErrorKind::Transport,
            Self::Timeout(_) => FetchErrorKind::Timeout,
            Self::ConnectionDropped(_) => FetchErrorKind::ConnectionDropped,
            Self::ValueOutOfRange(_) => FetchErrorKind::ValueOutOfRange,
            Self::Fatal(_) => FetchErrorKind::Fatal,
            Self::Parse(_) | Self::Other(_) => FetchErrorKind::Unknown,
        }
    }

    /// 게이트웨이 오류 메시지로부터 분류.
    ///
    /// 게이트웨이는 하위 SDK/DB 예외 문자열을 그대로 전달하므로 키워드로 판별합니다.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("inf cannot be used") || lower.contains("out of range") {
            Self::ValueOutOfRange(message)
        } else if lower.contains("gone away")
            || lower.contains("connection reset")
            || lower.contains("connection dropped")
            || lower.contains("lost connection")
        {
            Self::ConnectionDropped(message)
        } else if lower.contains("timeout") || lower.contains("timed out") {
            Self::Timeout(message)
        } else if lower.contains("unauthorized")
            || lower.contains("permission denied")
            || lower.contains("invalid token")
            || lower.contains("quota exceeded")
        {
            Self::Fatal(message)
        } else {
            Self::Other(message)
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ConnectionDropped(err.to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
