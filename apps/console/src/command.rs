use clap::ValueEnum;
use thiserror::Error;

use crate::dashboard::Section;

pub const USAGE: &str = "\
commands:
  members | orders | recharge      switch section
  type <text>                      edit the search box without searching
  search [text]                    run the search (with the typed or given text)
  more                             continue after the last loaded record
  refresh                          re-run the active query from the start
  reload                           drop the filter and load everything
  next | prev                      move one page
  go <n>                           jump to page n, centering the page strip
  page <n>                         select a page shown in the strip
  show                             print the current page
  disable <id> | enable <id>       members: toggle the account flag
  edit <id>                        members: open or close the expiry editor
  expire <id> <YYYY-MM-DD HH:MM>   members: set the VIP expiry
  activate <id> | deactivate <id>  recharge: change the config status
  add <name> <yuan> <days>         recharge: create a config
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Switch(Section),
    Type(String),
    Search(Option<String>),
    Continue,
    Refresh,
    Reload,
    Next,
    Prev,
    GoTo(String),
    SelectPage(usize),
    Show,
    SetDisabled { id: String, disabled: bool },
    OpenExpiryEdit { id: String },
    CommitExpiry { id: String, expire_at: String },
    SetActive { id: String, active: bool },
    Add { name: String, amount: String, days: String },
    Help,
    Quit,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Switch(_) => "switch",
            Self::Type(_) => "type",
            Self::Search(_) => "search",
            Self::Continue => "more",
            Self::Refresh => "refresh",
            Self::Reload => "reload",
            Self::Next => "next",
            Self::Prev => "prev",
            Self::GoTo(_) => "go",
            Self::SelectPage(_) => "page",
            Self::Show => "show",
            Self::SetDisabled { .. } => "disable",
            Self::OpenExpiryEdit { .. } => "edit",
            Self::CommitExpiry { .. } => "expire",
            Self::SetActive { .. } => "activate",
            Self::Add { .. } => "add",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty input")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

pub fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Err(ParseError::Empty),
        "section" => match args.as_slice() {
            [name] => Command::Switch(section(name)?),
            _ => return Err(ParseError::Usage("section <members|orders|recharge>")),
        },
        "type" => Command::Type(rest.to_string()),
        "search" => Command::Search((!rest.is_empty()).then(|| rest.to_string())),
        "more" => Command::Continue,
        "refresh" => Command::Refresh,
        "reload" => Command::Reload,
        "next" => Command::Next,
        "prev" => Command::Prev,
        "go" => match args.as_slice() {
            [page] => Command::GoTo(page.to_string()),
            _ => return Err(ParseError::Usage("go <n>")),
        },
        "page" => match args.as_slice() {
            [page] => Command::SelectPage(
                page.parse()
                    .map_err(|_| ParseError::Usage("page <n>"))?,
            ),
            _ => return Err(ParseError::Usage("page <n>")),
        },
        "show" | "ls" => Command::Show,
        "disable" | "enable" => match args.as_slice() {
            [id] => Command::SetDisabled {
                id: id.to_string(),
                disabled: word.eq_ignore_ascii_case("disable"),
            },
            _ => return Err(ParseError::Usage("disable|enable <id>")),
        },
        "edit" => match args.as_slice() {
            [id] => Command::OpenExpiryEdit { id: id.to_string() },
            _ => return Err(ParseError::Usage("edit <id>")),
        },
        "expire" => match args.as_slice() {
            [id, date, time] => Command::CommitExpiry {
                id: id.to_string(),
                expire_at: format!("{date} {time}"),
            },
            _ => return Err(ParseError::Usage("expire <id> <YYYY-MM-DD HH:MM>")),
        },
        "activate" | "deactivate" => match args.as_slice() {
            [id] => Command::SetActive {
                id: id.to_string(),
                active: word.eq_ignore_ascii_case("activate"),
            },
            _ => return Err(ParseError::Usage("activate|deactivate <id>")),
        },
        "add" => match args.as_slice() {
            [name, amount, days] => Command::Add {
                name: name.to_string(),
                amount: amount.to_string(),
                days: days.to_string(),
            },
            _ => return Err(ParseError::Usage("add <name> <yuan> <days>")),
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => match section(other) {
            Ok(target) if args.is_empty() => Command::Switch(target),
            _ => return Err(ParseError::Unknown(other.to_string())),
        },
    };
    Ok(command)
}

fn section(name: &str) -> Result<Section, ParseError> {
    Section::from_str(name, true).map_err(|_| ParseError::Usage("section <members|orders|recharge>"))
}
