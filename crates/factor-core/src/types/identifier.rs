//! SQL 테이블 이름.
//!
//! 테이블 이름은 쿼리에 직접 삽입되므로 생성 시점에 식별자 규칙을 검사합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// PostgreSQL 식별자 최대 길이
const MAX_IDENTIFIER_LEN: usize = 63;

/// 검증된 테이블 이름.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// `[A-Za-z_][A-Za-z0-9_]*` 형식만 허용.
    pub fn parse(name: impl Into<String>) -> CoreResult<Self> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_head = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        let valid_tail = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if valid_head && valid_tail && name.len() <= MAX_IDENTIFIER_LEN {
            Ok(Self(name))
        } else {
            Err(CoreError::InvalidIdentifier(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TableName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.0
    }
}
