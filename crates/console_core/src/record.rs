use std::{
    fmt::{Debug, Display},
    hash::Hash,
};

use shared::domain::{
    Member, MemberId, Order, OrderId, RecordKindTag, RechargeConfig, RechargeConfigId,
    RechargeStatus,
};

pub trait FieldPatch: Clone + Debug + Send + Sync + 'static {
    fn field_name(&self) -> &'static str;

    /// Whether a confirmed edit can move the record in or out of the active
    /// filter, so the list has to be fetched again.
    fn affects_filter(&self) -> bool {
        false
    }
}

pub trait Record: Clone + Debug + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static;
    type Patch: FieldPatch;

    const KIND: RecordKindTag;

    fn id(&self) -> &Self::Id;

    /// Ordering field; non-decreasing in server insertion order.
    fn create_time(&self) -> i64;

    fn apply_patch(&mut self, patch: &Self::Patch);

    fn matches_filter(&self, _term: &str) -> bool {
        true
    }
}

pub trait ExpiringRecord: Record {
    fn expires_at(&self) -> i64;
    fn expiry_patch(expire_at: i64) -> Self::Patch;

    /// Starting value for the expiry picker; an unset expiry (0) starts at `now`.
    fn expiry_or(&self, now: i64) -> i64 {
        match self.expires_at() {
            0 => now,
            expire_at => expire_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberPatch {
    Disabled(bool),
    VipExpireAt(i64),
}

impl FieldPatch for MemberPatch {
    fn field_name(&self) -> &'static str {
        match self {
            Self::Disabled(_) => "is_disabled",
            Self::VipExpireAt(_) => "vip_expire_at",
        }
    }
}

impl Record for Member {
    type Id = MemberId;
    type Patch = MemberPatch;

    const KIND: RecordKindTag = RecordKindTag::Member;

    fn id(&self) -> &MemberId {
        &self.id
    }

    fn create_time(&self) -> i64 {
        self.create_time
    }

    fn apply_patch(&mut self, patch: &MemberPatch) {
        match patch {
            MemberPatch::Disabled(disabled) => self.is_disabled = *disabled,
            MemberPatch::VipExpireAt(expire_at) => self.vip_expire_at = *expire_at,
        }
    }
}

impl ExpiringRecord for Member {
    fn expires_at(&self) -> i64 {
        self.vip_expire_at
    }

    fn expiry_patch(expire_at: i64) -> MemberPatch {
        MemberPatch::VipExpireAt(expire_at)
    }
}

/// Orders are read-only; the empty enum makes a mutation unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderPatch {}

impl FieldPatch for OrderPatch {
    fn field_name(&self) -> &'static str {
        match *self {}
    }
}

impl Record for Order {
    type Id = OrderId;
    type Patch = OrderPatch;

    const KIND: RecordKindTag = RecordKindTag::Order;

    fn id(&self) -> &OrderId {
        &self.id
    }

    fn create_time(&self) -> i64 {
        self.create_time
    }

    fn apply_patch(&mut self, patch: &OrderPatch) {
        match *patch {}
    }

    fn matches_filter(&self, term: &str) -> bool {
        self.status.contains(term)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RechargePatch {
    Status(RechargeStatus),
}

impl FieldPatch for RechargePatch {
    fn field_name(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
        }
    }

    fn affects_filter(&self) -> bool {
        true
    }
}

impl Record for RechargeConfig {
    type Id = RechargeConfigId;
    type Patch = RechargePatch;

    const KIND: RecordKindTag = RecordKindTag::RechargeConfig;

    fn id(&self) -> &RechargeConfigId {
        &self.id
    }

    fn create_time(&self) -> i64 {
        self.create_time
    }

    fn apply_patch(&mut self, patch: &RechargePatch) {
        match patch {
            RechargePatch::Status(status) => self.status = status.clone(),
        }
    }

    fn matches_filter(&self, term: &str) -> bool {
        self.name.contains(term)
    }
}
