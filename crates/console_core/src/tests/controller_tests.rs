use std::collections::VecDeque;

use async_trait::async_trait;
use shared::{
    domain::{Member, MemberId, Order, OrderId, RechargeConfigId, RechargeStatus},
    error::{ApiError, ErrorCode},
};
use tokio::sync::{mpsc, Mutex, Notify};

use super::*;
use crate::{
    events::NoticeLevel,
    record::{MemberPatch, OrderPatch, RechargePatch},
};

/// Scripted backend: answers from queues, records every call. An empty queue
/// answers with an empty list / empty message.
struct FakeBackend<R: Record> {
    fetch_results: Mutex<VecDeque<Result<Vec<R>, ConsoleError>>>,
    update_results: Mutex<VecDeque<Result<String, ConsoleError>>>,
    create_results: Mutex<VecDeque<Result<(), ConsoleError>>>,
    queries: Mutex<Vec<FetchQuery>>,
    updates: Mutex<Vec<(R::Id, R::Patch)>>,
    creates: Mutex<Vec<CreateRechargeConfigRequest>>,
}

impl<R: Record> FakeBackend<R> {
    fn new() -> Self {
        Self {
            fetch_results: Mutex::new(VecDeque::new()),
            update_results: Mutex::new(VecDeque::new()),
            create_results: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
            creates: Mutex::new(Vec::new()),
        }
    }

    async fn push_fetch(&self, result: Result<Vec<R>, ConsoleError>) {
        self.fetch_results.lock().await.push_back(result);
    }

    async fn push_update(&self, result: Result<String, ConsoleError>) {
        self.update_results.lock().await.push_back(result);
    }

    async fn push_create(&self, result: Result<(), ConsoleError>) {
        self.create_results.lock().await.push_back(result);
    }

    async fn queries(&self) -> Vec<FetchQuery> {
        self.queries.lock().await.clone()
    }

    async fn updates(&self) -> Vec<(R::Id, R::Patch)> {
        self.updates.lock().await.clone()
    }

    async fn next_fetch(&self, query: FetchQuery) -> Result<Vec<R>, ConsoleError> {
        self.queries.lock().await.push(query);
        self.fetch_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl<R: Record> ListBackend<R> for FakeBackend<R> {
    async fn fetch_page(
        &self,
        filter: Option<&str>,
        cursor: CursorParam,
    ) -> Result<Vec<R>, ConsoleError> {
        self.next_fetch(FetchQuery::Page {
            filter: filter.map(str::to_string),
            cursor,
        })
        .await
    }

    async fn fetch_filtered(&self, term: &str, cursor: CursorParam) -> Result<Vec<R>, ConsoleError> {
        self.next_fetch(FetchQuery::Filtered {
            term: term.to_string(),
            cursor,
        })
        .await
    }

    async fn update_field(&self, id: &R::Id, patch: &R::Patch) -> Result<String, ConsoleError> {
        self.updates.lock().await.push((id.clone(), patch.clone()));
        self.update_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

#[async_trait]
impl RecordCreator<CreateRechargeConfigRequest> for FakeBackend<RechargeConfig> {
    async fn create_record(&self, payload: &CreateRechargeConfigRequest) -> Result<(), ConsoleError> {
        self.creates.lock().await.push(payload.clone());
        self.create_results.lock().await.pop_front().unwrap_or(Ok(()))
    }
}

fn order(id: &str, status: &str, create_time: i64) -> Order {
    Order {
        id: OrderId::from(id),
        status: status.to_string(),
        pay_method: "wechat".into(),
        kind: "vip".into(),
        third_party_id: format!("tp-{id}"),
        create_time,
        success_time: 0,
        pay_fee: 990,
    }
}

fn orders(count: i64) -> Vec<Order> {
    (1..=count)
        .map(|n| order(&format!("o{n}"), "PAID", n * 10))
        .collect()
}

fn member(id: &str, create_time: i64) -> Member {
    Member {
        id: MemberId::from(id),
        username: format!("user-{id}"),
        phone: String::new(),
        email: String::new(),
        create_time,
        vip_expire_at: 0,
        is_disabled: false,
        is_vip: true,
    }
}

fn config(id: &str, name: &str, status: RechargeStatus, create_time: i64) -> RechargeConfig {
    RechargeConfig {
        id: RechargeConfigId::from(id),
        name: name.to_string(),
        price: 990,
        create_time,
        status,
    }
}

fn rejected(message: &str) -> ConsoleError {
    ConsoleError::network("update_field", ApiError::new(ErrorCode::Rejected, message))
}

fn controller<R: Record>(
    config: ListConfig,
) -> (ListController<R, FakeBackend<R>>, Arc<FakeBackend<R>>) {
    let backend = Arc::new(FakeBackend::new());
    (ListController::new(backend.clone(), config), backend)
}

fn drain_notices(events: &mut broadcast::Receiver<ConsoleEvent>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ConsoleEvent::Notice(notice) = event {
            notices.push(notice);
        }
    }
    notices
}

#[tokio::test]
async fn mount_moves_through_loading_to_ready() {
    let (mut list, backend) = controller::<Order>(ListConfig::default());
    assert_eq!(list.phase(), LoadPhase::Idle);
    assert!(!list.is_mounted());

    let ticket = list.begin_mount();
    assert_eq!(list.phase(), LoadPhase::Loading);
    assert_eq!(
        ticket.query(),
        &FetchQuery::Page {
            filter: None,
            cursor: CursorParam::Beginning
        }
    );

    backend.push_fetch(Ok(orders(25))).await;
    let outcome = list.run(ticket).await;

    assert_eq!(outcome, FetchOutcome::Applied { count: 25 });
    assert_eq!(list.phase(), LoadPhase::Ready);
    assert!(list.is_mounted());
    assert_eq!(list.cursor(), CursorParam::After(250));
    let view = list.view();
    assert_eq!(view.page_numbers, vec![1, 2, 3]);
    assert_eq!(list.visible_records().len(), 10);
}

#[tokio::test]
async fn phase_stays_loading_until_every_fetch_resolves() {
    let (mut list, _backend) = controller::<Order>(ListConfig::default());
    let first = list.begin_full_refresh();
    let second = list.begin_full_refresh();
    assert_eq!(list.in_flight(), 2);

    assert_ne!(first.seq(), second.seq());

    list.complete_fetch(second, Ok(orders(1)));
    assert_eq!(list.in_flight(), 1);
    assert_eq!(list.phase(), LoadPhase::Loading);
    list.complete_fetch(first, Ok(orders(2)));
    assert_eq!(list.in_flight(), 0);
    assert_eq!(list.phase(), LoadPhase::Ready);
}

#[tokio::test]
async fn failed_fetch_keeps_previous_records() {
    let (mut list, backend) = controller::<Order>(ListConfig::default());
    let mut events = list.subscribe_events();
    backend.push_fetch(Ok(orders(3))).await;
    list.mount().await;

    backend
        .push_fetch(Err(ConsoleError::network(
            "fetch_page",
            ApiError::new(ErrorCode::Transport, "connection reset"),
        )))
        .await;
    let outcome = list.refresh().await;

    assert!(matches!(outcome, FetchOutcome::Failed(_)));
    assert_eq!(list.records().len(), 3);
    assert_eq!(list.phase(), LoadPhase::Ready);
    let mut failures = 0;
    while let Ok(event) = events.try_recv() {
        if let ConsoleEvent::FetchFailed { kind, .. } = event {
            assert_eq!(kind, Order::KIND);
            failures += 1;
        }
    }
    assert_eq!(failures, 1);
}

#[tokio::test]
async fn commit_search_restarts_cursor_and_continue_resumes() {
    let (mut list, backend) = controller::<Order>(ListConfig::default());
    backend.push_fetch(Ok(orders(4))).await;
    list.mount().await;
    assert_eq!(list.cursor(), CursorParam::After(40));

    list.set_search_term("PAID");
    backend
        .push_fetch(Ok(vec![order("a", "PAID", 100), order("b", "PAID", 200)]))
        .await;
    list.commit_search().await;
    list.continue_search().await;

    let queries = backend.queries().await;
    assert_eq!(
        &queries[1..],
        &[
            FetchQuery::Filtered {
                term: "PAID".into(),
                cursor: CursorParam::Beginning
            },
            FetchQuery::Filtered {
                term: "PAID".into(),
                cursor: CursorParam::After(200)
            },
        ]
    );
    assert_eq!(list.active_filter(), Some("PAID"));
}

#[tokio::test]
async fn empty_result_leaves_cursor_in_place() {
    let (mut list, backend) = controller::<Order>(ListConfig::default());
    backend.push_fetch(Ok(orders(2))).await;
    list.mount().await;

    list.continue_search().await;

    assert_eq!(list.cursor(), CursorParam::After(20));
    assert!(list.records().is_empty());
}

#[tokio::test]
async fn filtered_orders_are_narrowed_by_status() {
    let (mut list, backend) = controller::<Order>(ListConfig::default());
    list.set_search_term("PAID");
    backend
        .push_fetch(Ok(vec![
            order("a", "PAID", 1),
            order("b", "CREATED", 2),
            order("c", "PAID", 3),
        ]))
        .await;

    list.commit_search().await;

    let ids: Vec<String> = list.records().iter().map(|o| o.id.to_string()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert_eq!(list.cursor(), CursorParam::After(3));
}

#[tokio::test]
async fn member_search_trusts_server_filtering() {
    let (mut list, backend) = controller::<Member>(ListConfig::default());
    list.set_search_term("zzz");
    backend
        .push_fetch(Ok(vec![member("m1", 1), member("m2", 2)]))
        .await;

    list.commit_search().await;

    assert_eq!(list.records().len(), 2);
}

#[tokio::test]
async fn shrinking_result_clamps_current_page() {
    let (mut list, backend) = controller::<Order>(ListConfig::default());
    backend.push_fetch(Ok(orders(25))).await;
    list.mount().await;
    assert_eq!(list.go_to_page(3), PageMove::Moved);

    backend.push_fetch(Ok(orders(5))).await;
    list.refresh().await;

    let view = list.view();
    assert_eq!(view.current_page, 1);
    assert!(!view.can_next);
    assert_eq!(list.visible_records().len(), 5);
}

#[tokio::test]
async fn last_resolved_response_wins_by_default() {
    let (mut list, _backend) = controller::<Order>(ListConfig::default());
    let older = list.begin_full_refresh();
    list.set_search_term("PAID");
    let newer = list.begin_commit_search();

    list.complete_fetch(newer, Ok(vec![order("new", "PAID", 1)]));
    let outcome = list.complete_fetch(older, Ok(vec![order("x", "PAID", 5), order("y", "CREATED", 6)]));

    assert_eq!(outcome, FetchOutcome::Applied { count: 2 });
    assert!(list.records().get(&OrderId::from("new")).is_none());
    assert_eq!(list.phase(), LoadPhase::Ready);
}

#[tokio::test]
async fn latest_dispatched_policy_discards_superseded_response() {
    let config = ListConfig {
        stale_policy: StaleResponsePolicy::LatestDispatchedWins,
        ..ListConfig::default()
    };
    let (mut list, _backend) = controller::<Order>(config);
    let mut events = list.subscribe_events();
    let older = list.begin_full_refresh();
    let newer = list.begin_full_refresh();

    list.complete_fetch(newer, Ok(vec![order("new", "PAID", 1)]));
    let outcome = list.complete_fetch(older, Ok(orders(3)));

    assert_eq!(outcome, FetchOutcome::Discarded);
    assert_eq!(list.records().len(), 1);
    assert_eq!(list.phase(), LoadPhase::Ready);
    let discarded = std::iter::from_fn(|| events.try_recv().ok()).any(|event| {
        matches!(
            event,
            ConsoleEvent::StaleResponseDiscarded {
                seq: 1,
                latest_seq: 2,
                ..
            }
        )
    });
    assert!(discarded);
}

#[tokio::test]
async fn rejected_toggle_keeps_optimistic_value_and_notifies_once() {
    let (mut list, backend) = controller::<Member>(ListConfig::default());
    let mut events = list.subscribe_events();
    backend.push_fetch(Ok(vec![member("m1", 1)])).await;
    list.mount().await;
    backend.push_update(Err(rejected("没有权限"))).await;

    let id = MemberId::from("m1");
    let outcome = list.toggle(&id, MemberPatch::Disabled(true)).await;

    assert!(matches!(outcome, MutationOutcome::Unconfirmed { .. }));
    assert!(list.records().get(&id).is_some_and(|m| m.is_disabled));
    assert_eq!(
        drain_notices(&mut events),
        vec![Notice {
            level: NoticeLevel::Error,
            message: "没有权限".into()
        }]
    );
}

#[tokio::test]
async fn confirmed_toggle_surfaces_server_message() {
    let (mut list, backend) = controller::<Member>(ListConfig::default());
    let mut events = list.subscribe_events();
    backend.push_fetch(Ok(vec![member("m1", 1)])).await;
    list.mount().await;
    backend.push_update(Ok("操作成功".into())).await;

    let outcome = list
        .toggle(&MemberId::from("m1"), MemberPatch::Disabled(true))
        .await;

    assert!(outcome.is_confirmed());
    assert_eq!(drain_notices(&mut events), vec![Notice::info("操作成功")]);
    assert_eq!(
        backend.updates().await,
        vec![(MemberId::from("m1"), MemberPatch::Disabled(true))]
    );
}

#[tokio::test]
async fn toggle_on_unloaded_record_sends_nothing() {
    let (mut list, backend) = controller::<Member>(ListConfig::default());
    backend.push_fetch(Ok(vec![member("m1", 1)])).await;
    list.mount().await;

    let outcome = list
        .toggle(&MemberId::from("ghost"), MemberPatch::Disabled(true))
        .await;

    assert_eq!(outcome, MutationOutcome::NoOp);
    assert!(backend.updates().await.is_empty());
}

#[tokio::test]
async fn edit_session_toggles_and_switches_records() {
    let (mut list, _backend) = controller::<Member>(ListConfig::default());
    let first = MemberId::from("m1");
    let second = MemberId::from("m2");

    assert!(list.open_edit(&first));
    assert!(list.is_editing(&first));
    assert!(!list.open_edit(&first));
    assert!(!list.is_editing(&first));
    assert!(list.open_edit(&first));

    assert!(list.open_edit(&second));
    assert!(list.is_editing(&second));
    assert!(!list.is_editing(&first));

    list.close_edit();
    assert!(list.edit_session().is_none());
}

#[tokio::test]
async fn expiry_edit_ends_session_even_when_rejected() {
    let (mut list, backend) = controller::<Member>(ListConfig::default());
    backend.push_fetch(Ok(vec![member("m1", 1)])).await;
    list.mount().await;
    backend.push_update(Err(rejected("失败"))).await;
    let id = MemberId::from("m1");
    list.open_edit(&id);

    let outcome = list.schedule_expiry_edit(&id, 1_900_000_000).await;

    assert!(matches!(outcome, MutationOutcome::Unconfirmed { .. }));
    assert!(list.edit_session().is_none());
    assert_eq!(
        list.records().get(&id).map(|m| m.vip_expire_at),
        Some(1_900_000_000)
    );
    assert_eq!(
        backend.updates().await,
        vec![(id, MemberPatch::VipExpireAt(1_900_000_000))]
    );
}

#[tokio::test]
async fn invalid_recharge_draft_never_reaches_server() {
    let (mut list, backend) = controller::<RechargeConfig>(ListConfig::default());
    list.mount().await;

    let err = list
        .create_and_refresh(RechargeConfigDraft::new("monthly", "abc", "30"))
        .await
        .expect_err("invalid amount");

    assert!(matches!(err, ConsoleError::ValidationFailure(_)));
    assert!(backend.creates.lock().await.is_empty());
    assert_eq!(backend.queries().await.len(), 1);
}

#[tokio::test]
async fn recharge_create_reloads_unfiltered_list() {
    let (mut list, backend) = controller::<RechargeConfig>(ListConfig::default());
    list.set_search_term("month");
    list.commit_search().await;
    backend
        .push_fetch(Ok(vec![config("r1", "yearly", RechargeStatus::Active, 1)]))
        .await;

    let outcome = list
        .create_and_refresh(RechargeConfigDraft::new("yearly", "99", "365"))
        .await
        .expect("valid draft");

    assert_eq!(outcome, FetchOutcome::Applied { count: 1 });
    assert_eq!(
        backend.creates.lock().await.clone(),
        vec![CreateRechargeConfigRequest {
            name: "yearly".into(),
            valid_periods: 365 * 86_400,
            price: 9_900,
        }]
    );
    assert_eq!(
        backend.queries().await.last(),
        Some(&FetchQuery::Page {
            filter: None,
            cursor: CursorParam::Beginning
        })
    );
    assert_eq!(list.active_filter(), None);
}

#[tokio::test]
async fn failed_recharge_create_still_reloads_and_notifies() {
    let (mut list, backend) = controller::<RechargeConfig>(ListConfig::default());
    let mut events = list.subscribe_events();
    backend.push_create(Err(rejected("名称重复"))).await;

    let outcome = list
        .create_and_refresh(RechargeConfigDraft::new("dup", "1", "1"))
        .await
        .expect("valid draft");

    assert_eq!(outcome, FetchOutcome::Applied { count: 0 });
    assert_eq!(backend.queries().await.len(), 1);
    assert_eq!(drain_notices(&mut events), vec![Notice::error("名称重复")]);
}

#[tokio::test]
async fn status_change_under_active_filter_refetches() {
    let (mut list, backend) = controller::<RechargeConfig>(ListConfig::default());
    list.set_search_term("month");
    backend
        .push_fetch(Ok(vec![config("r1", "monthly", RechargeStatus::Active, 1)]))
        .await;
    list.commit_search().await;

    let outcome = list
        .toggle(
            &RechargeConfigId::from("r1"),
            RechargePatch::Status(RechargeStatus::Inactive),
        )
        .await;

    assert!(outcome.is_confirmed());
    let queries = backend.queries().await;
    assert_eq!(queries.len(), 2);
    assert_eq!(
        queries[1],
        FetchQuery::Filtered {
            term: "month".into(),
            cursor: CursorParam::Beginning
        }
    );
}

#[tokio::test]
async fn status_change_without_filter_stays_local() {
    let (mut list, backend) = controller::<RechargeConfig>(ListConfig::default());
    backend
        .push_fetch(Ok(vec![config("r1", "monthly", RechargeStatus::Active, 1)]))
        .await;
    list.mount().await;

    let id = RechargeConfigId::from("r1");
    list.toggle(&id, RechargePatch::Status(RechargeStatus::Inactive))
        .await;

    assert_eq!(backend.queries().await.len(), 1);
    assert_eq!(
        list.records().get(&id).map(|c| c.status.clone()),
        Some(RechargeStatus::Inactive)
    );
}

/// Unfiltered fetches wait until a filtered fetch has answered, so two
/// overlapping requests resolve in the reverse of their dispatch order.
struct GatedBackend {
    filtered_done: Notify,
}

#[async_trait]
impl ListBackend<Order> for GatedBackend {
    async fn fetch_page(
        &self,
        _filter: Option<&str>,
        _cursor: CursorParam,
    ) -> Result<Vec<Order>, ConsoleError> {
        self.filtered_done.notified().await;
        Ok(orders(3))
    }

    async fn fetch_filtered(&self, term: &str, _cursor: CursorParam) -> Result<Vec<Order>, ConsoleError> {
        self.filtered_done.notify_one();
        Ok(vec![order("fast", term, 1)])
    }

    async fn update_field(&self, _id: &OrderId, patch: &OrderPatch) -> Result<String, ConsoleError> {
        match *patch {}
    }
}

async fn race(policy: StaleResponsePolicy) -> (ListController<Order, GatedBackend>, Vec<u64>) {
    let backend = Arc::new(GatedBackend {
        filtered_done: Notify::new(),
    });
    let config = ListConfig {
        stale_policy: policy,
        ..ListConfig::default()
    };
    let mut list = ListController::new(backend.clone(), config);
    let slow = list.begin_full_refresh();
    list.set_search_term("PAID");
    let fast = list.begin_commit_search();

    let (tx, mut rx) = mpsc::unbounded_channel();
    for ticket in [slow, fast] {
        let backend = backend.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = backend.fetch(ticket.query()).await;
            let _ = tx.send((ticket, result));
        });
    }
    drop(tx);

    let mut resolved = Vec::new();
    while let Some((ticket, result)) = rx.recv().await {
        resolved.push(ticket.seq());
        list.complete_fetch(ticket, result);
    }
    (list, resolved)
}

#[tokio::test]
async fn out_of_order_responses_follow_last_resolved_by_default() {
    let (list, resolved) = race(StaleResponsePolicy::LastResolvedWins).await;

    assert_eq!(resolved, vec![2, 1]);
    assert_eq!(list.records().len(), 3);
    assert_eq!(list.active_filter(), Some("PAID"));
    assert_eq!(list.phase(), LoadPhase::Ready);
}

#[tokio::test]
async fn out_of_order_responses_keep_latest_dispatch_when_configured() {
    let (list, resolved) = race(StaleResponsePolicy::LatestDispatchedWins).await;

    assert_eq!(resolved, vec![2, 1]);
    let ids: Vec<String> = list.records().iter().map(|o| o.id.to_string()).collect();
    assert_eq!(ids, vec!["fast"]);
    assert_eq!(list.cursor(), CursorParam::After(1));
}

#[test]
fn stale_policy_parses_config_spellings() {
    assert_eq!(
        "latest-dispatched".parse::<StaleResponsePolicy>(),
        Ok(StaleResponsePolicy::LatestDispatchedWins)
    );
    assert_eq!(
        " Last-Resolved ".parse::<StaleResponsePolicy>(),
        Ok(StaleResponsePolicy::LastResolvedWins)
    );
    assert!("newest".parse::<StaleResponsePolicy>().is_err());
}
