#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind { Success, Error, Warning }

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self { Self { kind: NoticeKind::Success, message: message.into() } }
    pub fn error(message: impl Into<String>) -> Self { Self { kind: NoticeKind::Error, message: message.into() } }
    pub fn warning(message: impl Into<String>) -> Self { Self { kind: NoticeKind::Warning, message: message.into() } }
}
