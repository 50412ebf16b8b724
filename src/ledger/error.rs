use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerErrorKind {
    InvalidRequest,
    Arithmetic,
    Persistence,
    Corruption,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerError {
    pub kind: LedgerErrorKind,
    pub message: String,
}

impl LedgerError {
    pub fn new(kind: LedgerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LedgerError {}

pub fn invalid_request(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::InvalidRequest, message)
}

pub fn arithmetic_error(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::Arithmetic, message)
}

pub fn persistence_error(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::Persistence, message)
}

pub fn corruption_error(message: impl Into<String>) -> LedgerError {
    LedgerError::new(LedgerErrorKind::Corruption, message)
}
