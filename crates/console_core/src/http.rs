use std::error::Error as _;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{Member, MemberId, Order, OrderId, RechargeConfig, RechargeConfigId},
    error::{ApiError, ErrorCode},
    protocol::{
        ApiEnvelope, CreateRechargeConfigRequest, CursorParam, DisableVipRequest, ListRequest,
        MemberListData, MemberSearchRequest, OrderListData, OrderSearchRequest,
        RechargeConfigListData, SetVipExpireTimeRequest, UpdateRechargeStatusRequest,
    },
};
use tracing::debug;

use crate::{
    backend::{ListBackend, RecordCreator},
    error::ConsoleError,
    record::{MemberPatch, OrderPatch, RechargePatch},
};

pub const DEFAULT_ADMIN_API_URL: &str = "https://admin.ailogy.cn/api";
pub const DEFAULT_RECHARGE_API_URL: &str = "https://agi.ailogy.cn/api";

const MEMBER_LIST_PATH: &str = "user/list";
const MEMBER_SEARCH_PATH: &str = "user/list-by-username";
const MEMBER_DISABLE_PATH: &str = "user/disable-or-enable-vip";
const MEMBER_EXPIRY_PATH: &str = "user/set-vip-expire-time";
const ORDER_LIST_PATH: &str = "transaction/list";
const ORDER_SEARCH_PATH: &str = "transaction/list-by-status";
const RECHARGE_LIST_PATH: &str = "recharge-config/list";
const RECHARGE_STATUS_PATH: &str = "recharge-config/update-status";
const RECHARGE_CREATE_PATH: &str = "recharge-config/create";

#[derive(Debug, Clone)]
pub struct HttpAdminApi {
    http: Client,
    admin_base: String,
    recharge_base: String,
}

impl Default for HttpAdminApi {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_API_URL, DEFAULT_RECHARGE_API_URL)
    }
}

impl HttpAdminApi {
    pub fn new(admin_base: impl Into<String>, recharge_base: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            admin_base: admin_base.into(),
            recharge_base: recharge_base.into(),
        }
    }

    pub fn admin_base(&self) -> &str {
        &self.admin_base
    }

    pub fn recharge_base(&self) -> &str {
        &self.recharge_base
    }

    fn admin_url(&self, path: &str) -> String {
        join_url(&self.admin_base, path)
    }

    fn recharge_url(&self, path: &str) -> String {
        join_url(&self.recharge_base, path)
    }

    async fn post<Req, T>(
        &self,
        operation: &'static str,
        url: String,
        body: &Req,
    ) -> Result<(String, Option<T>), ConsoleError>
    where
        Req: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!(operation, %url, "management api request");
        let envelope: ApiEnvelope<T> = self
            .send(&url, body)
            .await
            .map_err(|err| ConsoleError::network(operation, classify(err)))?;

        if !envelope.is_success() {
            debug!(operation, code = envelope.code, msg = %envelope.msg, "request rejected");
            let message = if envelope.msg.is_empty() {
                format!("request rejected with code {}", envelope.code)
            } else {
                envelope.msg
            };
            return Err(ConsoleError::network(
                operation,
                ApiError::new(ErrorCode::Rejected, message),
            ));
        }
        Ok((envelope.msg, envelope.data))
    }

    async fn send<Req, T>(&self, url: &str, body: &Req) -> Result<ApiEnvelope<T>, reqwest::Error>
    where
        Req: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.http
            .post(url)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn post_list<Req, D>(
        &self,
        operation: &'static str,
        url: String,
        body: &Req,
    ) -> Result<D, ConsoleError>
    where
        Req: Serialize + ?Sized + Sync,
        D: DeserializeOwned + Default,
    {
        let (_, data) = self.post::<Req, D>(operation, url, body).await?;
        Ok(data.unwrap_or_default())
    }

    async fn post_update<Req>(&self, url: String, body: &Req) -> Result<String, ConsoleError>
    where
        Req: Serialize + ?Sized + Sync,
    {
        let (message, _) = self
            .post::<Req, serde_json::Value>("update_field", url, body)
            .await?;
        Ok(message)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

fn classify(err: reqwest::Error) -> ApiError {
    let code = if err.is_status() {
        ErrorCode::HttpStatus
    } else if err.is_decode() {
        ErrorCode::Decode
    } else {
        ErrorCode::Transport
    };
    // reqwest hides the root cause (refused, dns, timeout) behind `source()`.
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    ApiError::new(code, message)
}

#[async_trait]
impl ListBackend<Member> for HttpAdminApi {
    async fn fetch_page(
        &self,
        filter: Option<&str>,
        cursor: CursorParam,
    ) -> Result<Vec<Member>, ConsoleError> {
        if let Some(term) = filter {
            return ListBackend::<Member>::fetch_filtered(self, term, cursor).await;
        }
        let data: MemberListData = self
            .post_list(
                "fetch_page",
                self.admin_url(MEMBER_LIST_PATH),
                &ListRequest::new(cursor),
            )
            .await?;
        Ok(data.users)
    }

    async fn fetch_filtered(
        &self,
        term: &str,
        cursor: CursorParam,
    ) -> Result<Vec<Member>, ConsoleError> {
        let request = MemberSearchRequest {
            username: term.to_string(),
            last_create_time: cursor,
        };
        let data: MemberListData = self
            .post_list("fetch_filtered", self.admin_url(MEMBER_SEARCH_PATH), &request)
            .await?;
        Ok(data.users)
    }

    async fn update_field(&self, id: &MemberId, patch: &MemberPatch) -> Result<String, ConsoleError> {
        match patch {
            MemberPatch::Disabled(disable) => {
                let request = DisableVipRequest {
                    user_id: id.clone(),
                    disable: *disable,
                };
                self.post_update(self.admin_url(MEMBER_DISABLE_PATH), &request)
                    .await
            }
            MemberPatch::VipExpireAt(vip_expire_at) => {
                let request = SetVipExpireTimeRequest {
                    user_id: id.clone(),
                    vip_expire_at: *vip_expire_at,
                };
                self.post_update(self.admin_url(MEMBER_EXPIRY_PATH), &request)
                    .await
            }
        }
    }
}

#[async_trait]
impl ListBackend<Order> for HttpAdminApi {
    async fn fetch_page(
        &self,
        filter: Option<&str>,
        cursor: CursorParam,
    ) -> Result<Vec<Order>, ConsoleError> {
        if let Some(term) = filter {
            return ListBackend::<Order>::fetch_filtered(self, term, cursor).await;
        }
        let data: OrderListData = self
            .post_list(
                "fetch_page",
                self.admin_url(ORDER_LIST_PATH),
                &ListRequest::new(cursor),
            )
            .await?;
        Ok(data.transactions)
    }

    async fn fetch_filtered(
        &self,
        term: &str,
        cursor: CursorParam,
    ) -> Result<Vec<Order>, ConsoleError> {
        let data: OrderListData = self
            .post_list(
                "fetch_filtered",
                self.admin_url(ORDER_SEARCH_PATH),
                &OrderSearchRequest::new(term, cursor),
            )
            .await?;
        Ok(data.transactions)
    }

    async fn update_field(&self, _id: &OrderId, patch: &OrderPatch) -> Result<String, ConsoleError> {
        match *patch {}
    }
}

/// Recharge configurations have no server-side search; a filtered fetch loads
/// the list and the controller narrows it by name.
#[async_trait]
impl ListBackend<RechargeConfig> for HttpAdminApi {
    async fn fetch_page(
        &self,
        filter: Option<&str>,
        cursor: CursorParam,
    ) -> Result<Vec<RechargeConfig>, ConsoleError> {
        let operation = if filter.is_some() {
            "fetch_filtered"
        } else {
            "fetch_page"
        };
        let data: RechargeConfigListData = self
            .post_list(
                operation,
                self.recharge_url(RECHARGE_LIST_PATH),
                &ListRequest::new(cursor),
            )
            .await?;
        Ok(data.recharge_configs)
    }

    async fn fetch_filtered(
        &self,
        term: &str,
        cursor: CursorParam,
    ) -> Result<Vec<RechargeConfig>, ConsoleError> {
        ListBackend::<RechargeConfig>::fetch_page(self, Some(term), cursor).await
    }

    async fn update_field(
        &self,
        id: &RechargeConfigId,
        patch: &RechargePatch,
    ) -> Result<String, ConsoleError> {
        match patch {
            RechargePatch::Status(status) => {
                let request = UpdateRechargeStatusRequest::new(id.clone(), status.clone());
                self.post_update(self.recharge_url(RECHARGE_STATUS_PATH), &request)
                    .await
            }
        }
    }
}

#[async_trait]
impl RecordCreator<CreateRechargeConfigRequest> for HttpAdminApi {
    async fn create_record(&self, payload: &CreateRechargeConfigRequest) -> Result<(), ConsoleError> {
        self.post::<_, serde_json::Value>(
            "create_record",
            self.recharge_url(RECHARGE_CREATE_PATH),
            payload,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
