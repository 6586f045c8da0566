use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::{Member, MemberId, Order, RechargeConfig, RechargeConfigId, RechargeStatus};

/// Resumption marker sent as `lastCreateTime`. The management API reads the
/// string `"0"` as "from the beginning" and an integer as "after this
/// create_time".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorParam {
    #[default]
    Beginning,
    After(i64),
}

impl CursorParam {
    pub const BEGINNING_SENTINEL: &'static str = "0";
}

impl fmt::Display for CursorParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginning => f.write_str(Self::BEGINNING_SENTINEL),
            Self::After(create_time) => write!(f, "{create_time}"),
        }
    }
}

impl Serialize for CursorParam {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Beginning => serializer.serialize_str(Self::BEGINNING_SENTINEL),
            Self::After(create_time) => serializer.serialize_i64(*create_time),
        }
    }
}

impl<'de> Deserialize<'de> for CursorParam {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(0) => Ok(Self::Beginning),
            Raw::Number(create_time) => Ok(Self::After(create_time)),
            Raw::Text(text) if text == Self::BEGINNING_SENTINEL => Ok(Self::Beginning),
            Raw::Text(text) => text
                .parse::<i64>()
                .map(Self::After)
                .map_err(|_| de::Error::custom(format!("invalid lastCreateTime '{text}'"))),
        }
    }
}

fn filler() -> String {
    "1".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    #[serde(rename = "1", default = "filler")]
    pub filler: String,
    #[serde(rename = "lastCreateTime", default)]
    pub last_create_time: CursorParam,
}

impl ListRequest {
    pub fn new(last_create_time: CursorParam) -> Self {
        Self {
            filler: filler(),
            last_create_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSearchRequest {
    pub username: String,
    #[serde(rename = "lastCreateTime", default)]
    pub last_create_time: CursorParam,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSearchRequest {
    #[serde(rename = "1", default = "filler")]
    pub filler: String,
    pub status: String,
    #[serde(rename = "lastCreateTime", default)]
    pub last_create_time: CursorParam,
}

impl OrderSearchRequest {
    pub fn new(status: impl Into<String>, last_create_time: CursorParam) -> Self {
        Self {
            filler: filler(),
            status: status.into(),
            last_create_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisableVipRequest {
    pub user_id: MemberId,
    pub disable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetVipExpireTimeRequest {
    pub user_id: MemberId,
    pub vip_expire_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRechargeStatusRequest {
    #[serde(rename = "1", default = "filler")]
    pub filler: String,
    pub id: RechargeConfigId,
    pub status: RechargeStatus,
}

impl UpdateRechargeStatusRequest {
    pub fn new(id: RechargeConfigId, status: RechargeStatus) -> Self {
        Self {
            filler: filler(),
            id,
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRechargeConfigRequest {
    pub name: String,
    /// Validity in seconds.
    pub valid_periods: i64,
    /// Price in cents.
    pub price: i64,
}

/// Every management endpoint answers with this envelope; `code == 0` is success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberListData {
    #[serde(default)]
    pub users: Vec<Member>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderListData {
    #[serde(default)]
    pub transactions: Vec<Order>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RechargeConfigListData {
    #[serde(default)]
    pub recharge_configs: Vec<RechargeConfig>,
}
