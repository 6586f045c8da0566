use shared::protocol::CursorParam;

use crate::record::Record;

/// Holds the `create_time` of the last record of the most recently completed
/// fetch. Only ever used to build the next request; paging over loaded
/// records is local.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorStore {
    last_create_time: Option<i64>,
}

impl CursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last_create_time = None;
    }

    /// Moves past `last_record`. `None` (an empty result) leaves the cursor
    /// where it was.
    pub fn advance<R: Record>(&mut self, last_record: Option<&R>) {
        if let Some(record) = last_record {
            self.last_create_time = Some(record.create_time());
        }
    }

    pub fn current(&self) -> CursorParam {
        match self.last_create_time {
            Some(create_time) => CursorParam::After(create_time),
            None => CursorParam::Beginning,
        }
    }

    pub fn is_set(&self) -> bool {
        self.last_create_time.is_some()
    }
}
