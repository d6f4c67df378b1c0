use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use auditlens_domain::{
    ENTITY_HISTORY_RESOURCE, FilterCriteria, OperatorDialect, PagePhase, PageTrigger,
    QueryOperator, ResourceProfile,
};

use crate::fetch_controller::PagedFetchController;
use crate::test_support::{FakeTransport, Responder};
use crate::view_config::ViewConfig;

use super::{AuditViewSession, ScrollSettings, ScrollSignal, ViewEvent, ViewHandle, ViewSnapshot};

fn session(transport: Arc<FakeTransport>, page_size: usize) -> AuditViewSession {
    let controller = PagedFetchController::from_config(transport, &ViewConfig::default())
        .unwrap_or_else(|_| unreachable!());
    let profile = ResourceProfile::new("audit", QueryOperator::Contains, OperatorDialect::STANDARD)
        .unwrap_or_else(|_| unreachable!());

    AuditViewSession::new(Arc::new(controller), profile, page_size)
        .unwrap_or_else(|_| unreachable!())
}

fn actor(name: &str) -> FilterCriteria {
    FilterCriteria {
        actor: Some(name.to_owned()),
        ..FilterCriteria::default()
    }
}

async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .unwrap_or_else(|_| panic!("condition not reached in time"))
}

async fn wait_for_calls(transport: &FakeTransport, expected: usize) {
    within(async {
        while transport.calls().await.len() < expected {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
}

async fn wait_for_snapshot(
    handle: &ViewHandle,
    predicate: impl Fn(&ViewSnapshot) -> bool,
) -> ViewSnapshot {
    let mut receiver = handle.subscribe();
    within(async move {
        receiver
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map(|snapshot| (*snapshot).clone())
            .unwrap_or_else(|_| unreachable!())
    })
    .await
}

#[tokio::test]
async fn mount_and_scroll_walk_the_sequence_until_exhausted() {
    let transport = Arc::new(FakeTransport::new(Responder::Total(2500)));
    let mut session = session(transport.clone(), 1000);

    session.load(PageTrigger::Mount).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.records.len(), 1000);
    assert_eq!(snapshot.phase, PagePhase::Idle);
    assert_eq!(snapshot.offset, 1000);

    session.load(PageTrigger::Scroll).await;
    session.load(PageTrigger::Scroll).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.records.len(), 2500);
    assert_eq!(snapshot.phase, PagePhase::Exhausted);
    assert!(!snapshot.has_more);
    assert_eq!(snapshot.records[1000].action, "event-1000");

    session.load(PageTrigger::Scroll).await;
    assert_eq!(transport.calls().await.len(), 3);
}

#[tokio::test]
async fn apply_filter_replaces_records_with_filtered_first_page() {
    let transport = Arc::new(FakeTransport::new(Responder::Total(5)));
    let mut session = session(transport.clone(), 2);
    session.load(PageTrigger::Mount).await;
    session.load(PageTrigger::Scroll).await;
    assert_eq!(session.snapshot().records.len(), 4);

    let pending = session.apply_filter(actor("alice"));
    assert!(session.snapshot().records.is_empty());
    session.drive(pending).await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.records.len(), 2);
    assert_eq!(snapshot.offset, 2);
    assert!(
        snapshot
            .records
            .iter()
            .all(|record| record.origin == "actor[contains]=alice")
    );
    assert_eq!(snapshot.criteria, actor("alice"));

    let last_call = transport.calls().await.pop().unwrap_or_else(|| unreachable!());
    assert!(last_call.as_str().contains("offset=0&limit=2&search="));
}

#[tokio::test]
async fn entity_history_view_scopes_path_and_uses_plain_clauses() {
    let transport = Arc::new(FakeTransport::new(Responder::Total(4)));
    let controller = PagedFetchController::from_config(transport.clone(), &ViewConfig::default())
        .unwrap_or_else(|_| unreachable!());
    let profile = ResourceProfile::new(
        ENTITY_HISTORY_RESOURCE,
        QueryOperator::Contains,
        OperatorDialect::STANDARD,
    )
    .unwrap_or_else(|_| unreachable!());
    let mut session = AuditViewSession::new(Arc::new(controller), profile, 10)
        .unwrap_or_else(|_| unreachable!());

    session.load(PageTrigger::Mount).await;
    let pending = session.apply_filter(FilterCriteria {
        actor: Some("x".to_owned()),
        entity_name: Some("User".to_owned()),
        from: chrono::NaiveDate::from_ymd_opt(2024, 1, 1),
        ..FilterCriteria::default()
    });
    assert_eq!(
        pending.as_ref().map(|page| page.resource.as_str()),
        Some("entity-history/User")
    );
    session.drive(pending).await;

    let calls = transport.calls().await;
    assert_eq!(calls[0].path(), "/entity-history");
    assert_eq!(calls[1].path(), "/entity-history/User");
    let snapshot = session.snapshot();
    assert_eq!(snapshot.records.len(), 4);
    assert!(
        snapshot
            .records
            .iter()
            .all(|record| record.origin == "author=x;from=2024-01-01 00:00:00.000")
    );
}

#[tokio::test]
async fn failover_is_invisible_to_the_view() {
    let healthy = Arc::new(FakeTransport::new(Responder::Total(3)));
    let degraded = Arc::new(FakeTransport::new(Responder::Total(3)).failing_host("localhost"));
    let mut healthy_session = session(healthy, 10);
    let mut degraded_session = session(degraded.clone(), 10);

    healthy_session.load(PageTrigger::Mount).await;
    degraded_session.load(PageTrigger::Mount).await;

    let expected = healthy_session.snapshot();
    let actual = degraded_session.snapshot();
    assert_eq!(actual, expected);
    assert_eq!(actual.last_error, None);
    assert_eq!(degraded.calls().await.len(), 2);
}

#[tokio::test]
async fn unreachable_endpoints_keep_accumulated_records() {
    let transport = Arc::new(FakeTransport::new(Responder::Total(10)).fail_after(1));
    let mut session = session(transport.clone(), 3);
    session.load(PageTrigger::Mount).await;
    assert_eq!(session.snapshot().records.len(), 3);

    session.load(PageTrigger::Scroll).await;
    let calls = transport.calls().await;
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1].host_str(), Some("localhost"));
    assert_eq!(calls[2].host_str(), Some("127.0.0.1"));
    assert!(calls[1].as_str().contains("offset=3&limit=3"));

    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase, PagePhase::Failed);
    assert_eq!(snapshot.records.len(), 3);
    assert!(
        snapshot
            .last_error
            .as_deref()
            .is_some_and(|message| message.starts_with("both endpoints unreachable"))
    );
    session.load(PageTrigger::Scroll).await;
    assert_eq!(transport.calls().await.len(), 3);
    assert_eq!(session.snapshot().records.len(), 3);

    let retry = session.clear_filter();
    assert!(retry.is_some());
    assert_eq!(session.snapshot().last_error, None);
    assert!(session.snapshot().records.is_empty());
}

#[tokio::test]
async fn both_endpoints_failing_on_mount_fails_the_view() {
    let transport = Arc::new(
        FakeTransport::new(Responder::Total(10))
            .failing_host("localhost")
            .failing_host("127.0.0.1"),
    );
    let mut session = session(transport.clone(), 3);

    session.load(PageTrigger::Mount).await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase, PagePhase::Failed);
    assert!(snapshot.records.is_empty());
    assert!(snapshot.last_error.is_some());
    assert_eq!(transport.calls().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn scrolls_while_loading_issue_no_extra_fetch() {
    let (transport, gate) = FakeTransport::new(Responder::Total(7)).gated();
    let transport = Arc::new(transport);
    let handle = ViewHandle::spawn(session(transport.clone(), 3), ScrollSettings::default());

    handle
        .send(ViewEvent::Mount)
        .await
        .unwrap_or_else(|_| unreachable!());
    wait_for_calls(&transport, 1).await;

    for _ in 0..2 {
        handle
            .send(ViewEvent::Scroll(ScrollSignal::new(0)))
            .await
            .unwrap_or_else(|_| unreachable!());
    }
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(transport.calls().await.len(), 1);
    assert!(handle.snapshot().is_loading);

    gate.add_permits(1);
    let snapshot = wait_for_snapshot(&handle, |snapshot| snapshot.records.len() == 3).await;
    assert_eq!(snapshot.phase, PagePhase::Idle);
    assert_eq!(transport.calls().await.len(), 1);

    handle
        .send(ViewEvent::Scroll(ScrollSignal::new(0)))
        .await
        .unwrap_or_else(|_| unreachable!());
    wait_for_calls(&transport, 2).await;
    gate.add_permits(1);
    let snapshot = wait_for_snapshot(&handle, |snapshot| snapshot.records.len() == 6).await;
    assert_eq!(snapshot.offset, 6);

    handle.stop().await.unwrap_or_else(|_| unreachable!());
}

#[tokio::test(start_paused = true)]
async fn distant_scroll_does_not_fetch() {
    let transport = Arc::new(FakeTransport::new(Responder::Total(7)));
    let handle = ViewHandle::spawn(session(transport.clone(), 3), ScrollSettings::default());

    handle
        .send(ViewEvent::Mount)
        .await
        .unwrap_or_else(|_| unreachable!());
    wait_for_snapshot(&handle, |snapshot| snapshot.records.len() == 3).await;

    handle
        .send(ViewEvent::Scroll(ScrollSignal::new(5000)))
        .await
        .unwrap_or_else(|_| unreachable!());
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(transport.calls().await.len(), 1);
    handle.stop().await.unwrap_or_else(|_| unreachable!());
}

#[tokio::test(start_paused = true)]
async fn filter_during_flight_discards_stale_page() {
    let (transport, gate) = FakeTransport::new(Responder::Total(7)).gated();
    let transport = Arc::new(transport);
    let handle = ViewHandle::spawn(session(transport.clone(), 3), ScrollSettings::default());

    handle
        .send(ViewEvent::Mount)
        .await
        .unwrap_or_else(|_| unreachable!());
    wait_for_calls(&transport, 1).await;

    handle
        .send(ViewEvent::ApplyFilter(actor("bob")))
        .await
        .unwrap_or_else(|_| unreachable!());
    let snapshot = wait_for_snapshot(&handle, |snapshot| snapshot.criteria == actor("bob")).await;
    assert!(snapshot.records.is_empty());
    assert!(snapshot.is_loading);

    gate.add_permits(1);
    wait_for_calls(&transport, 2).await;
    assert!(handle.snapshot().records.is_empty());

    gate.add_permits(1);
    let snapshot = wait_for_snapshot(&handle, |snapshot| !snapshot.records.is_empty()).await;
    assert_eq!(snapshot.records.len(), 3);
    assert!(
        snapshot
            .records
            .iter()
            .all(|record| record.origin == "actor[contains]=bob")
    );

    let calls = transport.calls().await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].query(), Some("offset=0&limit=3&search=actor%5Bcontains%5D%3Dbob"));

    handle.stop().await.unwrap_or_else(|_| unreachable!());
}

#[tokio::test(start_paused = true)]
async fn stop_closes_snapshot_stream() {
    let transport = Arc::new(FakeTransport::new(Responder::Total(0)));
    let handle = ViewHandle::spawn(session(transport, 3), ScrollSettings::default());
    let mut receiver = handle.subscribe();

    handle.stop().await.unwrap_or_else(|_| unreachable!());

    assert!(receiver.changed().await.is_err());
}
