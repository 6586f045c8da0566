use shared::domain::RecordKindTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A message the operator has to acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    Loaded {
        kind: RecordKindTag,
        seq: u64,
        count: usize,
    },
    FetchFailed {
        kind: RecordKindTag,
        seq: u64,
        message: String,
    },
    StaleResponseDiscarded {
        kind: RecordKindTag,
        seq: u64,
        latest_seq: u64,
    },
    Notice(Notice),
}
