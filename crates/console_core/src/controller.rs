use std::{str::FromStr, sync::Arc};

use shared::{
    domain::RechargeConfig,
    protocol::{CreateRechargeConfigRequest, CursorParam},
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    backend::{FetchQuery, ListBackend, RechargeConfigDraft, RecordCreator},
    collection::RecordCollection,
    cursor::CursorStore,
    error::ConsoleError,
    events::{ConsoleEvent, Notice},
    mutation::{EditSession, EditState, MutationGateway, MutationOutcome},
    page_window::{PageMove, PageWindow, PageWindowView},
    record::{ExpiringRecord, FieldPatch, Record},
};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaleResponsePolicy {
    /// Whatever resolves last replaces the collection, even if it was
    /// dispatched earlier.
    #[default]
    LastResolvedWins,
    LatestDispatchedWins,
}

impl FromStr for StaleResponsePolicy {
    type Err = ConsoleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "last-resolved" | "last_resolved_wins" | "last-resolved-wins" => {
                Ok(Self::LastResolvedWins)
            }
            "latest-dispatched" | "latest_dispatched_wins" | "latest-dispatched-wins" => {
                Ok(Self::LatestDispatchedWins)
            }
            other => Err(ConsoleError::validation(format!(
                "unknown stale response policy '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListConfig {
    pub page_size: usize,
    pub window_size: usize,
    pub stale_policy: StaleResponsePolicy,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            window_size: 10,
            stale_policy: StaleResponsePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Ready,
}

#[derive(Debug, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    query: FetchQuery,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn query(&self) -> &FetchQuery {
        &self.query
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { count: usize },
    Failed(ConsoleError),
    Discarded,
}

pub struct ListController<R: Record, B: ListBackend<R>> {
    backend: Arc<B>,
    gateway: MutationGateway<R, B>,
    config: ListConfig,
    phase: LoadPhase,
    mounted: bool,
    records: RecordCollection<R>,
    window: PageWindow,
    cursor: CursorStore,
    search_term: String,
    active_filter: Option<String>,
    edit: EditState<R::Id>,
    last_dispatched_seq: u64,
    in_flight: usize,
    events: broadcast::Sender<ConsoleEvent>,
}

impl<R: Record, B: ListBackend<R>> ListController<R, B> {
    pub fn new(backend: Arc<B>, config: ListConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self::with_events(backend, config, events)
    }

    pub fn with_events(
        backend: Arc<B>,
        config: ListConfig,
        events: broadcast::Sender<ConsoleEvent>,
    ) -> Self {
        Self {
            gateway: MutationGateway::new(backend.clone(), events.clone()),
            backend,
            config,
            phase: LoadPhase::Idle,
            mounted: false,
            records: RecordCollection::new(),
            window: PageWindow::new(config.page_size, config.window_size),
            cursor: CursorStore::new(),
            search_term: String::new(),
            active_filter: None,
            edit: EditState::default(),
            last_dispatched_seq: 0,
            in_flight: 0,
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.events.subscribe()
    }

    pub fn backend(&self) -> Arc<B> {
        self.backend.clone()
    }

    pub fn config(&self) -> ListConfig {
        self.config
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn records(&self) -> &RecordCollection<R> {
        &self.records
    }

    pub fn window(&self) -> &PageWindow {
        &self.window
    }

    pub fn cursor(&self) -> CursorParam {
        self.cursor.current()
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn active_filter(&self) -> Option<&str> {
        self.active_filter.as_deref()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn view(&self) -> PageWindowView {
        self.window.view()
    }

    pub fn visible_records(&self) -> &[R] {
        let (offset, length) = self.window.slice_bounds();
        self.records.slice(offset, length)
    }

    /// Typing in the search box; nothing is fetched until the term is committed.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn begin_mount(&mut self) -> FetchTicket {
        self.mounted = true;
        self.begin_full_refresh()
    }

    pub fn begin_full_refresh(&mut self) -> FetchTicket {
        self.cursor.reset();
        self.active_filter = None;
        self.dispatch(FetchQuery::Page {
            filter: None,
            cursor: self.cursor.current(),
        })
    }

    pub fn begin_commit_search(&mut self) -> FetchTicket {
        self.cursor.reset();
        let term = self.search_term.clone();
        self.active_filter = Some(term.clone());
        self.dispatch(FetchQuery::Filtered {
            term,
            cursor: self.cursor.current(),
        })
    }

    pub fn begin_continue(&mut self) -> FetchTicket {
        let cursor = self.cursor.current();
        let query = match &self.active_filter {
            Some(term) => FetchQuery::Filtered {
                term: term.clone(),
                cursor,
            },
            None => FetchQuery::Page {
                filter: None,
                cursor,
            },
        };
        self.dispatch(query)
    }

    pub fn begin_refresh(&mut self) -> FetchTicket {
        match self.active_filter.clone() {
            Some(term) => {
                self.cursor.reset();
                self.dispatch(FetchQuery::Filtered {
                    term,
                    cursor: self.cursor.current(),
                })
            }
            None => self.begin_full_refresh(),
        }
    }

    fn dispatch(&mut self, query: FetchQuery) -> FetchTicket {
        self.last_dispatched_seq += 1;
        self.in_flight += 1;
        self.phase = LoadPhase::Loading;
        debug!(
            kind = R::KIND.label(),
            seq = self.last_dispatched_seq,
            operation = query.operation(),
            filter = query.filter_term().unwrap_or(""),
            cursor = %query.cursor(),
            "dispatching list fetch"
        );
        FetchTicket {
            seq: self.last_dispatched_seq,
            query,
        }
    }

    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<R>, ConsoleError>,
    ) -> FetchOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 {
            self.phase = LoadPhase::Ready;
        }

        if self.config.stale_policy == StaleResponsePolicy::LatestDispatchedWins
            && ticket.seq < self.last_dispatched_seq
        {
            debug!(
                kind = R::KIND.label(),
                seq = ticket.seq,
                latest_seq = self.last_dispatched_seq,
                "discarding response of superseded fetch"
            );
            let _ = self.events.send(ConsoleEvent::StaleResponseDiscarded {
                kind: R::KIND,
                seq: ticket.seq,
                latest_seq: self.last_dispatched_seq,
            });
            return FetchOutcome::Discarded;
        }

        match result {
            Ok(records) => {
                let records = match ticket.query.filter_term() {
                    Some(term) => records
                        .into_iter()
                        .filter(|record| record.matches_filter(term))
                        .collect(),
                    None => records,
                };
                self.records.replace(records);
                self.cursor.advance(self.records.last());
                self.window.set_record_count(self.records.len());

                let count = self.records.len();
                info!(
                    kind = R::KIND.label(),
                    seq = ticket.seq,
                    count,
                    "list fetch applied"
                );
                let _ = self.events.send(ConsoleEvent::Loaded {
                    kind: R::KIND,
                    seq: ticket.seq,
                    count,
                });
                FetchOutcome::Applied { count }
            }
            Err(error) => {
                warn!(
                    kind = R::KIND.label(),
                    seq = ticket.seq,
                    %error,
                    "list fetch failed; keeping previous records"
                );
                let _ = self.events.send(ConsoleEvent::FetchFailed {
                    kind: R::KIND,
                    seq: ticket.seq,
                    message: error.user_message(),
                });
                FetchOutcome::Failed(error)
            }
        }
    }

    pub async fn run(&mut self, ticket: FetchTicket) -> FetchOutcome {
        let result = self.backend.fetch(ticket.query()).await;
        self.complete_fetch(ticket, result)
    }

    pub async fn mount(&mut self) -> FetchOutcome {
        let ticket = self.begin_mount();
        self.run(ticket).await
    }

    pub async fn commit_search(&mut self) -> FetchOutcome {
        let ticket = self.begin_commit_search();
        self.run(ticket).await
    }

    pub async fn continue_search(&mut self) -> FetchOutcome {
        let ticket = self.begin_continue();
        self.run(ticket).await
    }

    pub async fn refresh(&mut self) -> FetchOutcome {
        let ticket = self.begin_refresh();
        self.run(ticket).await
    }

    pub async fn full_refresh(&mut self) -> FetchOutcome {
        let ticket = self.begin_full_refresh();
        self.run(ticket).await
    }

    pub fn next_page(&mut self) -> PageMove {
        self.window.next_page()
    }

    pub fn prev_page(&mut self) -> PageMove {
        self.window.prev_page()
    }

    pub fn go_to_page(&mut self, target: usize) -> PageMove {
        self.window.go_to_page(target)
    }

    pub fn jump_to(&mut self, input: &str) -> PageMove {
        let moved = self.window.jump_to(input);
        if moved == PageMove::Unchanged {
            debug!(kind = R::KIND.label(), input, "ignored page jump");
        }
        moved
    }

    pub fn select_page(&mut self, page: usize) -> PageMove {
        self.window.select_page(page)
    }

    pub fn open_edit(&mut self, id: &R::Id) -> bool {
        self.edit.open(id)
    }

    pub fn close_edit(&mut self) {
        self.edit.close();
    }

    pub fn is_editing(&self, id: &R::Id) -> bool {
        self.edit.is_editing(id)
    }

    pub fn edit_session(&self) -> Option<&EditSession<R::Id>> {
        self.edit.active()
    }

    /// Optimistic single-field edit. A confirmed edit that can change filter
    /// membership re-runs the active search.
    pub async fn toggle(&mut self, id: &R::Id, patch: R::Patch) -> MutationOutcome {
        let refetch = patch.affects_filter() && self.active_filter.is_some();
        let outcome = self.gateway.toggle(&mut self.records, id, patch).await;
        if refetch && outcome.is_confirmed() {
            self.refresh().await;
        }
        outcome
    }
}

impl<R: ExpiringRecord, B: ListBackend<R>> ListController<R, B> {
    pub async fn schedule_expiry_edit(&mut self, id: &R::Id, expire_at: i64) -> MutationOutcome {
        self.gateway
            .schedule_expiry_edit(&mut self.records, &mut self.edit, id, expire_at)
            .await
    }
}

impl<B> ListController<RechargeConfig, B>
where
    B: ListBackend<RechargeConfig> + RecordCreator<CreateRechargeConfigRequest>,
{
    /// Creates a configuration, then reloads the whole list whether or not
    /// the create call succeeded. Invalid drafts never reach the server.
    pub async fn create_and_refresh(
        &mut self,
        draft: RechargeConfigDraft,
    ) -> Result<FetchOutcome, ConsoleError> {
        let request = draft.into_request()?;
        match self.backend.create_record(&request).await {
            Ok(()) => info!(name = %request.name, "recharge config created"),
            Err(error) => {
                warn!(name = %request.name, %error, "recharge config create failed");
                let _ = self
                    .events
                    .send(ConsoleEvent::Notice(Notice::error(error.user_message())));
            }
        }
        Ok(self.full_refresh().await)
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
