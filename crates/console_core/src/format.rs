use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use shared::domain::{Member, Order, RechargeConfig};

use crate::record::Record;

pub const NOT_SUBSCRIBED_LABEL: &str = "未订阅";
pub const UNPAID_LABEL: &str = "未支付";
pub const DISABLED_LABEL: &str = "disabled";
pub const ENABLED_LABEL: &str = "enabled";

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const INPUT_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Renders unix seconds in one fixed timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampFormatter {
    offset: FixedOffset,
}

impl Default for TimestampFormatter {
    /// UTC+08:00, the management API's home timezone.
    fn default() -> Self {
        Self::from_offset_minutes(8 * 60).unwrap_or_else(Self::utc)
    }
}

impl TimestampFormatter {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// `None` when the offset is a day or more away from UTC.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
    }

    pub fn format(&self, unix_seconds: i64) -> String {
        match DateTime::from_timestamp(unix_seconds, 0) {
            Some(utc) => utc
                .with_timezone(&self.offset)
                .format(DISPLAY_FORMAT)
                .to_string(),
            None => unix_seconds.to_string(),
        }
    }

    /// Reads `YYYY-MM-DD HH:MM[:SS]` in this timezone.
    pub fn parse(&self, input: &str) -> Option<i64> {
        let input = input.trim();
        INPUT_FORMATS.iter().find_map(|format| {
            let naive = NaiveDateTime::parse_from_str(input, format).ok()?;
            let local = self.offset.from_local_datetime(&naive).single()?;
            Some(local.timestamp())
        })
    }
}

/// Price in cents as yuan, without trailing zeros.
pub fn format_yuan(cents: i64) -> String {
    format!("{}元", cents as f64 / 100.0)
}

pub trait RecordView: Record {
    fn headers() -> &'static [&'static str];
    fn cells(&self, timestamps: &TimestampFormatter) -> Vec<String>;
}

impl RecordView for Member {
    fn headers() -> &'static [&'static str] {
        &["id", "username", "registered", "vip expires", "state"]
    }

    fn cells(&self, timestamps: &TimestampFormatter) -> Vec<String> {
        let expiry = if self.is_vip {
            timestamps.format(self.vip_expire_at)
        } else {
            NOT_SUBSCRIBED_LABEL.to_string()
        };
        let state = if self.is_disabled {
            DISABLED_LABEL
        } else {
            ENABLED_LABEL
        };
        vec![
            self.id.to_string(),
            self.username.clone(),
            timestamps.format(self.create_time),
            expiry,
            state.to_string(),
        ]
    }
}

impl RecordView for Order {
    fn headers() -> &'static [&'static str] {
        &["order id", "third-party id", "status", "created", "paid"]
    }

    fn cells(&self, timestamps: &TimestampFormatter) -> Vec<String> {
        let paid = match self.success_time {
            0 => UNPAID_LABEL.to_string(),
            paid_at => timestamps.format(paid_at),
        };
        vec![
            self.id.to_string(),
            self.third_party_id.clone(),
            self.status.clone(),
            timestamps.format(self.create_time),
            paid,
        ]
    }
}

impl RecordView for RechargeConfig {
    fn headers() -> &'static [&'static str] {
        &["id", "name", "price", "created", "status"]
    }

    fn cells(&self, timestamps: &TimestampFormatter) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            format_yuan(self.price),
            timestamps.format(self.create_time),
            self.status.to_string(),
        ]
    }
}
