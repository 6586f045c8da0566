use std::sync::Arc;

use chrono::Utc;
use clap::ValueEnum;
use console_core::{
    ConsoleEvent, ExpiringRecord, ListBackend, ListConfig, ListController, LoadPhase,
    MemberPatch, MutationOutcome, NoticeLevel, PageMove, RechargeConfigDraft, RechargePatch,
    RecordCreator, RecordView, TimestampFormatter,
};
use shared::{
    domain::{Member, MemberId, Order, RechargeConfig, RechargeConfigId, RechargeStatus},
    protocol::CreateRechargeConfigRequest,
};
use tokio::sync::broadcast;
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::command::{Command, USAGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Section {
    #[default]
    Members,
    Orders,
    #[value(alias = "recharge-configs")]
    Recharge,
}

impl Section {
    pub fn title(self) -> &'static str {
        match self {
            Self::Members => "members",
            Self::Orders => "orders",
            Self::Recharge => "recharge configs",
        }
    }
}

/// Everything the dashboard needs from the management API.
pub trait AdminBackend:
    ListBackend<Member>
    + ListBackend<Order>
    + ListBackend<RechargeConfig>
    + RecordCreator<CreateRechargeConfigRequest>
{
}

impl<T> AdminBackend for T where
    T: ListBackend<Member>
        + ListBackend<Order>
        + ListBackend<RechargeConfig>
        + RecordCreator<CreateRechargeConfigRequest>
{
}

type Outcome = Result<Option<String>, String>;

pub struct Dashboard<B: AdminBackend> {
    active: Section,
    members: ListController<Member, B>,
    orders: ListController<Order, B>,
    recharge: ListController<RechargeConfig, B>,
    timestamps: TimestampFormatter,
}

impl<B: AdminBackend> Dashboard<B> {
    pub fn new(
        backend: Arc<B>,
        config: ListConfig,
        timestamps: TimestampFormatter,
        events: broadcast::Sender<ConsoleEvent>,
    ) -> Self {
        Self {
            active: Section::default(),
            members: ListController::with_events(backend.clone(), config, events.clone()),
            orders: ListController::with_events(backend.clone(), config, events.clone()),
            recharge: ListController::with_events(backend, config, events),
            timestamps,
        }
    }

    pub fn active(&self) -> Section {
        self.active
    }

    pub fn members(&self) -> &ListController<Member, B> {
        &self.members
    }

    pub fn orders(&self) -> &ListController<Order, B> {
        &self.orders
    }

    pub fn recharge(&self) -> &ListController<RechargeConfig, B> {
        &self.recharge
    }

    /// Shows `section`. Its list is fetched the first time it is shown and
    /// keeps its state across later switches.
    pub async fn activate(&mut self, section: Section) {
        self.active = section;
        match section {
            Section::Members if !self.members.is_mounted() => {
                self.members.mount().await;
            }
            Section::Orders if !self.orders.is_mounted() => {
                self.orders.mount().await;
            }
            Section::Recharge if !self.recharge.is_mounted() => {
                self.recharge.mount().await;
            }
            _ => {}
        }
    }

    /// Runs one command and returns what the shell should print.
    pub async fn execute(&mut self, command: Command) -> String {
        debug!(command = command.name(), section = self.active.title(), "console command");
        match command {
            Command::Help => return USAGE.to_string(),
            Command::Quit => return String::new(),
            _ => {}
        }
        match self.apply(command).await {
            Ok(None) => self.render(),
            Ok(Some(note)) => format!("{note}\n{}", self.render()),
            Err(message) => message,
        }
    }

    async fn apply(&mut self, command: Command) -> Outcome {
        match command {
            Command::Switch(section) => {
                self.activate(section).await;
                Ok(None)
            }
            Command::SetDisabled { id, disabled } => {
                self.require(Section::Members, "disable/enable")?;
                let id = MemberId::from(id.as_str());
                let outcome = self
                    .members
                    .toggle(&id, MemberPatch::Disabled(disabled))
                    .await;
                describe_mutation(&outcome, &id)
            }
            Command::OpenExpiryEdit { id } => {
                self.require(Section::Members, "edit")?;
                self.open_expiry_edit(MemberId::from(id.as_str()))
            }
            Command::CommitExpiry { id, expire_at } => {
                self.require(Section::Members, "expire")?;
                self.commit_expiry(MemberId::from(id.as_str()), &expire_at)
                    .await
            }
            Command::SetActive { id, active } => {
                self.require(Section::Recharge, "activate/deactivate")?;
                let id = RechargeConfigId::from(id.as_str());
                let status = if active {
                    RechargeStatus::Active
                } else {
                    RechargeStatus::Inactive
                };
                let outcome = self.recharge.toggle(&id, RechargePatch::Status(status)).await;
                describe_mutation(&outcome, &id)
            }
            Command::Add { name, amount, days } => {
                self.require(Section::Recharge, "add")?;
                self.recharge
                    .create_and_refresh(RechargeConfigDraft::new(name, amount, days))
                    .await
                    .map(|_| None)
                    .map_err(|err| err.user_message())
            }
            other => match self.active {
                Section::Members => list_command(&mut self.members, other).await,
                Section::Orders => list_command(&mut self.orders, other).await,
                Section::Recharge => list_command(&mut self.recharge, other).await,
            },
        }
    }

    fn require(&self, section: Section, command: &str) -> Result<(), String> {
        if self.active == section {
            Ok(())
        } else {
            Err(format!(
                "'{command}' is only available in the {} section",
                section.title()
            ))
        }
    }

    fn open_expiry_edit(&mut self, id: MemberId) -> Outcome {
        let Some(member) = self.members.records().get(&id) else {
            return Err(format!("no loaded member with id {id}"));
        };
        let current = self
            .timestamps
            .format(member.expiry_or(Utc::now().timestamp()));
        if self.members.open_edit(&id) {
            Ok(Some(format!(
                "editing VIP expiry of {id} (currently {current}); commit with: expire {id} YYYY-MM-DD HH:MM"
            )))
        } else {
            Ok(Some(format!("closed expiry editor of {id}")))
        }
    }

    async fn commit_expiry(&mut self, id: MemberId, input: &str) -> Outcome {
        if !self.members.is_editing(&id) {
            return Err(format!("open the expiry editor first: edit {id}"));
        }
        let Some(expire_at) = self.timestamps.parse(input) else {
            return Err(format!("invalid date '{input}', expected YYYY-MM-DD HH:MM"));
        };
        if expire_at < Utc::now().timestamp() {
            return Err("VIP expiry must be in the future".to_string());
        }
        let outcome = self.members.schedule_expiry_edit(&id, expire_at).await;
        describe_mutation(&outcome, &id)
    }

    pub fn render(&self) -> String {
        match self.active {
            Section::Members => render_list(&self.members, &self.timestamps, self.active),
            Section::Orders => render_list(&self.orders, &self.timestamps, self.active),
            Section::Recharge => render_list(&self.recharge, &self.timestamps, self.active),
        }
    }
}

fn describe_mutation(outcome: &MutationOutcome, id: &impl std::fmt::Display) -> Outcome {
    match outcome {
        MutationOutcome::NoOp => Err(format!("no loaded record with id {id}")),
        MutationOutcome::Confirmed { .. } | MutationOutcome::Unconfirmed { .. } => Ok(None),
    }
}

async fn list_command<R, B>(list: &mut ListController<R, B>, command: Command) -> Outcome
where
    R: RecordView,
    B: ListBackend<R>,
{
    let moved = match command {
        Command::Type(term) => {
            list.set_search_term(term);
            return Ok(Some(format!("search box: \"{}\"", list.search_term())));
        }
        Command::Search(term) => {
            if let Some(term) = term {
                list.set_search_term(term);
            }
            list.commit_search().await;
            return Ok(None);
        }
        Command::Continue => {
            list.continue_search().await;
            return Ok(None);
        }
        Command::Refresh => {
            list.refresh().await;
            return Ok(None);
        }
        Command::Reload => {
            list.full_refresh().await;
            return Ok(None);
        }
        Command::Show => return Ok(None),
        Command::Next => list.next_page(),
        Command::Prev => list.prev_page(),
        Command::GoTo(input) => list.jump_to(&input),
        Command::SelectPage(page) => list.select_page(page),
        other => return Err(format!("'{}' is not available here", other.name())),
    };
    match moved {
        PageMove::Moved => Ok(None),
        PageMove::Unchanged => Err("page unchanged".to_string()),
    }
}

fn render_list<R, B>(
    list: &ListController<R, B>,
    timestamps: &TimestampFormatter,
    section: Section,
) -> String
where
    R: RecordView,
    B: ListBackend<R>,
{
    let mut out = format!("== {} ==", section.title());
    if let Some(term) = list.active_filter() {
        out.push_str(&format!(" filter: \"{term}\""));
    }
    match list.phase() {
        LoadPhase::Idle => out.push_str(" (not loaded)"),
        LoadPhase::Loading => out.push_str(" (loading)"),
        LoadPhase::Ready => {}
    }
    out.push('\n');

    let headers: Vec<String> = R::headers().iter().map(|h| h.to_string()).collect();
    let rows: Vec<Vec<String>> = list
        .visible_records()
        .iter()
        .map(|record| record.cells(timestamps))
        .collect();
    out.push_str(&render_table(&headers, &rows));

    let view = list.view();
    let strip: Vec<String> = view
        .page_numbers
        .iter()
        .map(|page| {
            if *page == view.current_page {
                format!("[{page}]")
            } else {
                page.to_string()
            }
        })
        .collect();
    out.push_str(&format!(
        "{} {} {}  page {} of {}, {} loaded",
        if view.can_prev { "<" } else { " " },
        strip.join(" "),
        if view.can_next { ">" } else { " " },
        view.current_page,
        list.window().total_pages(),
        list.records().len(),
    ));
    out
}

fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }
    let line = |cells: &[String]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                format!("{cell}{}", " ".repeat(width.saturating_sub(cell.width())))
            })
            .collect();
        format!("{}\n", padded.join(" | ").trim_end())
    };

    let mut out = line(headers);
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    out.push_str(&format!("{}\n", rule.join("-+-")));
    if rows.is_empty() {
        out.push_str("(no records)\n");
    }
    for row in rows {
        out.push_str(&line(row));
    }
    out
}

/// Shell text for an event; `None` for events that only matter to logs.
pub fn describe_event(event: &ConsoleEvent) -> Option<String> {
    match event {
        ConsoleEvent::Notice(notice) => Some(match notice.level {
            NoticeLevel::Info => format!("[info] {}", notice.message),
            NoticeLevel::Error => format!("[error] {}", notice.message),
        }),
        ConsoleEvent::FetchFailed { kind, message, .. } => {
            Some(format!("[error] could not load {}: {message}", kind.label()))
        }
        ConsoleEvent::Loaded { .. } | ConsoleEvent::StaleResponseDiscarded { .. } => None,
    }
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
