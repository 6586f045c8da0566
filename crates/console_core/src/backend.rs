use async_trait::async_trait;
use shared::protocol::{CreateRechargeConfigRequest, CursorParam};

use crate::{error::ConsoleError, record::Record};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// One list request as dispatched by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchQuery {
    Page {
        filter: Option<String>,
        cursor: CursorParam,
    },
    Filtered {
        term: String,
        cursor: CursorParam,
    },
}

impl FetchQuery {
    pub fn filter_term(&self) -> Option<&str> {
        match self {
            Self::Page { filter, .. } => filter.as_deref(),
            Self::Filtered { term, .. } => Some(term),
        }
    }

    pub fn cursor(&self) -> CursorParam {
        match self {
            Self::Page { cursor, .. } | Self::Filtered { cursor, .. } => *cursor,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            Self::Page { .. } => "fetch_page",
            Self::Filtered { .. } => "fetch_filtered",
        }
    }
}

#[async_trait]
pub trait ListBackend<R: Record>: Send + Sync {
    async fn fetch_page(
        &self,
        filter: Option<&str>,
        cursor: CursorParam,
    ) -> Result<Vec<R>, ConsoleError>;

    async fn fetch_filtered(&self, term: &str, cursor: CursorParam)
        -> Result<Vec<R>, ConsoleError>;

    /// Persists one field; the returned message is shown to the operator as-is.
    async fn update_field(&self, id: &R::Id, patch: &R::Patch) -> Result<String, ConsoleError>;

    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<R>, ConsoleError> {
        match query {
            FetchQuery::Page { filter, cursor } => self.fetch_page(filter.as_deref(), *cursor).await,
            FetchQuery::Filtered { term, cursor } => self.fetch_filtered(term, *cursor).await,
        }
    }
}

#[async_trait]
pub trait RecordCreator<P: Send + Sync>: Send + Sync {
    async fn create_record(&self, payload: &P) -> Result<(), ConsoleError>;
}

/// Operator input for a new recharge configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RechargeConfigDraft {
    pub name: String,
    pub amount: String,
    pub days: String,
}

impl RechargeConfigDraft {
    pub fn new(name: impl Into<String>, amount: impl Into<String>, days: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount: amount.into(),
            days: days.into(),
        }
    }

    /// Converts yuan to cents and days to seconds for the create call.
    pub fn into_request(self) -> Result<CreateRechargeConfigRequest, ConsoleError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ConsoleError::validation("name must not be empty"));
        }
        let amount = self.amount.trim();
        if amount.is_empty() {
            return Err(ConsoleError::validation("amount must not be empty"));
        }
        let days = self.days.trim();
        if days.is_empty() {
            return Err(ConsoleError::validation("validity days must not be empty"));
        }

        let yuan = amount
            .parse::<f64>()
            .ok()
            .filter(|yuan| yuan.is_finite() && *yuan >= 0.0)
            .ok_or_else(|| ConsoleError::validation(format!("invalid amount '{amount}'")))?;
        let cents = (yuan * 100.0).round();
        if cents >= i64::MAX as f64 {
            return Err(ConsoleError::validation(format!("amount '{amount}' is too large")));
        }
        let valid_periods = days
            .parse::<i64>()
            .ok()
            .filter(|days| *days > 0)
            .ok_or_else(|| ConsoleError::validation(format!("invalid validity days '{days}'")))?
            .checked_mul(SECONDS_PER_DAY)
            .ok_or_else(|| ConsoleError::validation(format!("validity days '{days}' is too large")))?;

        Ok(CreateRechargeConfigRequest {
            name: name.to_string(),
            valid_periods,
            price: cents as i64,
        })
    }
}
