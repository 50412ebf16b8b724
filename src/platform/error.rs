use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformErrorKind {
    /// The platform refused the mutation (missing permission or role hierarchy).
    Permission,
    /// A rank role has no matching role on the platform.
    RoleMissing,
    NotFound,
    Transient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError {
    pub kind: PlatformErrorKind,
    pub message: String,
}

impl PlatformError {
    pub fn new(kind: PlatformErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn retryable(&self) -> bool {
        self.kind == PlatformErrorKind::Transient
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PlatformError {}

pub fn permission_denied(message: impl Into<String>) -> PlatformError {
    PlatformError::new(PlatformErrorKind::Permission, message)
}

pub fn role_missing(message: impl Into<String>) -> PlatformError {
    PlatformError::new(PlatformErrorKind::RoleMissing, message)
}

pub fn not_found(message: impl Into<String>) -> PlatformError {
    PlatformError::new(PlatformErrorKind::NotFound, message)
}

pub fn transient(message: impl Into<String>) -> PlatformError {
    PlatformError::new(PlatformErrorKind::Transient, message)
}
