use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(MemberId);
id_newtype!(OrderId);
id_newtype!(RechargeConfigId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKindTag {
    Member,
    Order,
    RechargeConfig,
}

impl RecordKindTag {
    pub fn label(self) -> &'static str {
        match self {
            Self::Member => "members",
            Self::Order => "orders",
            Self::RechargeConfig => "recharge configs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub username: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub create_time: i64,
    #[serde(default)]
    pub vip_expire_at: i64,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub is_vip: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: String,
    #[serde(default)]
    pub pay_method: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub third_party_id: String,
    pub create_time: i64,
    #[serde(default)]
    pub success_time: i64,
    #[serde(default)]
    pub pay_fee: i64,
}

/// Sale state of a recharge configuration. Values the console does not know
/// are kept verbatim so a refresh never rewrites them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RechargeStatus {
    Active,
    Inactive,
    Other(String),
}

impl RechargeStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for RechargeStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ACTIVE" => Self::Active,
            "INACTIVE" => Self::Inactive,
            _ => Self::Other(value),
        }
    }
}

impl From<RechargeStatus> for String {
    fn from(value: RechargeStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RechargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RechargeConfig {
    pub id: RechargeConfigId,
    pub name: String,
    /// Price in cents.
    pub price: i64,
    pub create_time: i64,
    pub status: RechargeStatus,
}
