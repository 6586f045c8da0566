use std::{marker::PhantomData, sync::Arc};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    backend::ListBackend,
    collection::{LocalMutation, RecordCollection},
    error::ConsoleError,
    events::{ConsoleEvent, Notice},
    record::{ExpiringRecord, FieldPatch, Record},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Confirmed { message: String },
    Unconfirmed { error: ConsoleError },
    NoOp,
}

impl MutationOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession<Id> {
    pub record_id: Id,
    pub picker_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditState<Id> {
    session: Option<EditSession<Id>>,
}

impl<Id> Default for EditState<Id> {
    fn default() -> Self {
        Self { session: None }
    }
}

impl<Id: PartialEq + Clone> EditState<Id> {
    /// Opening the record already in edit flips its picker; opening another
    /// record drops the previous session and its unsaved input.
    pub fn open(&mut self, record_id: &Id) -> bool {
        match &mut self.session {
            Some(session) if session.record_id == *record_id => {
                session.picker_visible = !session.picker_visible;
                session.picker_visible
            }
            _ => {
                self.session = Some(EditSession {
                    record_id: record_id.clone(),
                    picker_visible: true,
                });
                true
            }
        }
    }

    pub fn close(&mut self) {
        self.session = None;
    }

    pub fn is_editing(&self, record_id: &Id) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.picker_visible && session.record_id == *record_id)
    }

    pub fn active(&self) -> Option<&EditSession<Id>> {
        self.session.as_ref()
    }
}

pub struct MutationGateway<R: Record, B: ListBackend<R>> {
    backend: Arc<B>,
    events: broadcast::Sender<ConsoleEvent>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record, B: ListBackend<R>> MutationGateway<R, B> {
    pub fn new(backend: Arc<B>, events: broadcast::Sender<ConsoleEvent>) -> Self {
        Self {
            backend,
            events,
            _record: PhantomData,
        }
    }

    pub async fn toggle(
        &self,
        records: &mut RecordCollection<R>,
        id: &R::Id,
        patch: R::Patch,
    ) -> MutationOutcome {
        let field = patch.field_name();
        if records.apply_field_mutation(id, |record| record.apply_patch(&patch))
            != LocalMutation::Applied
        {
            debug!(kind = R::KIND.label(), %id, field, "edit target not loaded; skipping");
            return MutationOutcome::NoOp;
        }

        match self.backend.update_field(id, &patch).await {
            Ok(message) => {
                info!(kind = R::KIND.label(), %id, field, "edit confirmed");
                if !message.is_empty() {
                    let _ = self.events.send(ConsoleEvent::Notice(Notice::info(message.clone())));
                }
                MutationOutcome::Confirmed { message }
            }
            Err(error) => {
                warn!(kind = R::KIND.label(), %id, field, %error, "edit not confirmed; keeping local value");
                let _ = self
                    .events
                    .send(ConsoleEvent::Notice(Notice::error(error.user_message())));
                MutationOutcome::Unconfirmed { error }
            }
        }
    }
}

impl<R: ExpiringRecord, B: ListBackend<R>> MutationGateway<R, B> {
    /// Commits the picker value; the edit session ends here whatever the
    /// server answers.
    pub async fn schedule_expiry_edit(
        &self,
        records: &mut RecordCollection<R>,
        edit: &mut EditState<R::Id>,
        id: &R::Id,
        expire_at: i64,
    ) -> MutationOutcome {
        edit.close();
        self.toggle(records, id, R::expiry_patch(expire_at)).await
    }
}
