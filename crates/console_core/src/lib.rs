pub mod backend;
pub mod collection;
pub mod controller;
pub mod cursor;
pub mod error;
pub mod events;
pub mod format;
pub mod http;
pub mod mutation;
pub mod page_window;
pub mod record;

pub use backend::{FetchQuery, ListBackend, RechargeConfigDraft, RecordCreator};
pub use collection::{LocalMutation, RecordCollection};
pub use controller::{
    FetchOutcome, FetchTicket, ListConfig, ListController, LoadPhase, StaleResponsePolicy,
};
pub use cursor::CursorStore;
pub use error::{ConsoleError, FailureCategory};
pub use events::{ConsoleEvent, Notice, NoticeLevel};
pub use format::{RecordView, TimestampFormatter};
pub use http::HttpAdminApi;
pub use mutation::{EditSession, EditState, MutationGateway, MutationOutcome};
pub use page_window::{PageMove, PageWindow, PageWindowView};
pub use record::{ExpiringRecord, FieldPatch, MemberPatch, OrderPatch, Record, RechargePatch};
