//! Walk tests, scripted with MockTransport and against the in-process agent.

mod common;

use common::{
    TestAgent, TestAgentBuilder, error_response, interface_table, interfaces_subtree, mock,
    response, system_mib, system_subtree,
};
use snmp_lite::transport::MockTransport;
use snmp_lite::{
    Auth, BulkSupport, CancellationToken, Client, Error, ErrorStatus, PduType, Retry, Value,
    VarBind, WalkMode, oid,
};
use std::fmt;
use std::time::Duration;

fn walk_client(mock: &MockTransport, mode: WalkMode) -> Client<MockTransport> {
    Client::builder("127.0.0.1:161", Auth::v2c("public"))
        .timeout(Duration::from_millis(100))
        .retry(Retry::none())
        .walk_mode(mode)
        .build_with(mock.clone())
        .unwrap()
}

fn pdu_types(mock: &MockTransport) -> Vec<PduType> {
    mock.requests()
        .iter()
        .map(|r| r.pdu_type().unwrap())
        .collect()
}

#[derive(Debug)]
struct Abort(&'static str);

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for Abort {}

// ============================================================================
// Scripted walks
// ============================================================================

#[tokio::test]
async fn walk_stops_at_first_oid_outside_root() {
    let mock = mock();
    mock.queue_response(response([
        (oid!(1, 3, 6, 1, 2, 1), Value::Integer(1)),
        (oid!(1, 3, 6, 1, 2, 2), Value::Integer(2)),
        (oid!(1, 3, 7), Value::Integer(3)),
    ]));
    let client = walk_client(&mock, WalkMode::Auto);

    let mut seen = Vec::new();
    client
        .walk(&oid!(1, 3, 6, 1, 2), |vb| {
            seen.push(vb.oid);
            Ok::<_, Error>(())
        })
        .await
        .unwrap();

    assert_eq!(seen, vec![oid!(1, 3, 6, 1, 2, 1), oid!(1, 3, 6, 1, 2, 2)]);
    assert_eq!(pdu_types(&mock), vec![PduType::GetBulkRequest]);
    assert_eq!(client.bulk_support(), BulkSupport::Supported);
}

#[tokio::test]
async fn walk_stops_on_end_of_mib_view() {
    let mock = mock();
    mock.queue_response(response([
        (oid!(1, 3, 6, 1, 2, 1), Value::Integer(1)),
        (oid!(1, 3, 6, 1, 2, 1), Value::EndOfMibView),
    ]));
    let client = walk_client(&mock, WalkMode::GetNext);

    let results = client.walk_collect(&oid!(1, 3, 6, 1, 2)).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn rejected_bulk_falls_back_for_the_client_lifetime() {
    let mock = mock();
    let root = oid!(1, 3, 6, 1, 2);
    mock.queue_response(error_response(ErrorStatus::GenErr.as_i32(), 1, root.clone()));
    // first walk, over GETNEXT
    mock.queue_response(response([(oid!(1, 3, 6, 1, 2, 1), Value::Integer(1))]));
    mock.queue_response(response([(oid!(1, 3, 6, 1, 2, 2), Value::Integer(2))]));
    mock.queue_response(response([(oid!(1, 3, 7), Value::Integer(3))]));
    // second walk
    mock.queue_response(response([(oid!(1, 3, 6, 1, 2, 1), Value::Integer(1))]));
    mock.queue_response(response([(oid!(1, 3, 7), Value::Integer(3))]));
    let client = walk_client(&mock, WalkMode::Auto);

    let first = client.walk_collect(&root).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(client.bulk_support(), BulkSupport::Unsupported);

    let second = client.walk_collect(&root).await.unwrap();
    assert_eq!(second.len(), 1);

    let types = pdu_types(&mock);
    assert_eq!(types.len(), 6);
    assert_eq!(types[0], PduType::GetBulkRequest);
    assert!(types[1..].iter().all(|t| *t == PduType::GetNextRequest));

    // the rejected cursor is re-issued as GETNEXT
    let retried = mock.requests()[1].pdu.clone().unwrap();
    assert_eq!(retried.varbinds[0].oid, root);
}

#[tokio::test]
async fn empty_bulk_reply_counts_as_rejection() {
    let mock = mock();
    mock.queue_response(response(std::iter::empty()));
    mock.queue_response(response([(oid!(1, 3, 6, 1, 2, 1), Value::Integer(1))]));
    mock.queue_response(response([(oid!(1, 3, 7), Value::Integer(3))]));
    let client = walk_client(&mock, WalkMode::Auto);

    let results = client.walk_collect(&oid!(1, 3, 6, 1, 2)).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(client.bulk_support(), BulkSupport::Unsupported);
}

#[tokio::test]
async fn getnext_mode_never_sends_bulk() {
    let mock = mock();
    mock.queue_response(response([(oid!(1, 3, 6, 1, 2, 1), Value::Integer(1))]));
    mock.queue_response(response([(oid!(1, 3, 7), Value::Integer(3))]));
    let client = walk_client(&mock, WalkMode::GetNext);

    client.walk_collect(&oid!(1, 3, 6, 1, 2)).await.unwrap();
    assert_eq!(
        pdu_types(&mock),
        vec![PduType::GetNextRequest, PduType::GetNextRequest]
    );
    assert_eq!(client.bulk_support(), BulkSupport::Unknown);
}

#[tokio::test]
async fn callback_error_aborts_after_one_round_trip() {
    let mock = mock();
    mock.queue_response(response([
        (oid!(1, 3, 6, 1, 2, 1), Value::Integer(1)),
        (oid!(1, 3, 6, 1, 2, 2), Value::Integer(2)),
    ]));
    let client = walk_client(&mock, WalkMode::Auto);

    let mut calls = 0;
    let err = client
        .walk(&oid!(1, 3, 6, 1, 2), |_| {
            calls += 1;
            Err(Abort("disk full"))
        })
        .await
        .unwrap_err();

    assert_eq!(calls, 1);
    assert_eq!(mock.requests().len(), 1);
    assert_eq!(err.callback_error::<Abort>().map(|a| a.0), Some("disk full"));
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn cancelled_walk_sends_nothing() {
    let mock = mock();
    let client = walk_client(&mock, WalkMode::Auto);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client
        .walk_with_cancel(&oid!(1, 3, 6, 1, 2), &cancel, |_| Ok::<_, Error>(()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn non_increasing_oid_aborts_walk() {
    let mock = mock();
    mock.queue_response(response([
        (oid!(1, 3, 6, 1, 2, 5), Value::Integer(1)),
        (oid!(1, 3, 6, 1, 2, 4), Value::Integer(2)),
    ]));
    let client = walk_client(&mock, WalkMode::Auto);

    let mut delivered = Vec::new();
    let err = client
        .walk(&oid!(1, 3, 6, 1, 2), |vb: VarBind| {
            delivered.push(vb);
            Ok::<_, Error>(())
        })
        .await
        .unwrap_err();
    assert_eq!(delivered.len(), 1);
    match err {
        Error::NonIncreasingOid { previous, current } => {
            assert_eq!(previous, oid!(1, 3, 6, 1, 2, 5));
            assert_eq!(current, oid!(1, 3, 6, 1, 2, 4));
        }
        other => panic!("expected NonIncreasingOid, got {:?}", other),
    }
}

#[tokio::test]
async fn invalid_root_is_rejected_without_sending() {
    let mock = mock();
    let client = walk_client(&mock, WalkMode::Auto);

    let err = client.walk_collect(&oid!(3, 1)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidOid { .. }));
    assert!(mock.requests().is_empty());
}

// ============================================================================
// Against the in-process agent
// ============================================================================

async fn agent_client(agent: &TestAgent) -> Client {
    Client::builder(agent.addr().to_string(), Auth::v2c("public"))
        .timeout(Duration::from_secs(1))
        .retry(Retry::none())
        .connect()
        .await
        .unwrap()
}

#[tokio::test]
async fn walk_system_group_over_udp() {
    let agent = TestAgent::new().await;
    let client = agent_client(&agent).await;

    let results = client.walk_collect(&system_subtree()).await.unwrap();
    let expected: Vec<_> = system_mib().into_iter().map(VarBind::from).collect();
    assert_eq!(results, expected);
    assert_eq!(agent.requests(), vec![PduType::GetBulkRequest]);
    assert_eq!(client.bulk_support(), BulkSupport::Supported);
}

#[tokio::test]
async fn walk_interface_table_in_several_bulk_rounds() {
    let agent = TestAgent::with_data(interface_table(4)).await;
    let client = Client::builder(agent.addr().to_string(), Auth::v2c("public"))
        .max_repetitions(10)
        .connect()
        .await
        .unwrap();

    let results = client.walk_collect(&interfaces_subtree()).await.unwrap();
    assert_eq!(results.len(), 1 + 8 * 4);
    assert!(results.windows(2).all(|w| w[0].oid < w[1].oid));
    // 33 leaves at 10 per round, the last round runs off the end of the MIB
    assert_eq!(agent.requests().len(), 4);
}

#[tokio::test]
async fn agent_without_bulk_is_walked_with_getnext() {
    let agent = TestAgentBuilder::new().reject_bulk().start().await;
    let client = agent_client(&agent).await;

    let first = client.walk_collect(&system_subtree()).await.unwrap();
    assert_eq!(first.len(), system_mib().len());
    let second = client.walk_collect(&system_subtree()).await.unwrap();
    assert_eq!(second, first);

    let requests = agent.requests();
    assert_eq!(
        requests
            .iter()
            .filter(|t| **t == PduType::GetBulkRequest)
            .count(),
        1
    );
    assert_eq!(requests[0], PduType::GetBulkRequest);
    assert_eq!(client.bulk_support(), BulkSupport::Unsupported);
}

#[tokio::test]
async fn v1_walk_over_udp_uses_getnext() {
    let agent = TestAgent::new().await;
    let client = Client::builder(agent.addr().to_string(), Auth::v1("public"))
        .retry(Retry::none())
        .connect()
        .await
        .unwrap();

    let results = client.walk_collect(&system_subtree()).await.unwrap();
    assert_eq!(results.len(), system_mib().len());
    assert!(
        agent
            .requests()
            .iter()
            .all(|t| *t == PduType::GetNextRequest)
    );
}

#[tokio::test]
async fn walk_result_limit_over_udp() {
    let agent = TestAgent::with_data(interface_table(4)).await;
    let client = Client::builder(agent.addr().to_string(), Auth::v2c("public"))
        .walk_mode(WalkMode::GetNext)
        .max_walk_results(5)
        .connect()
        .await
        .unwrap();

    let results = client.walk_collect(&interfaces_subtree()).await.unwrap();
    assert_eq!(results.len(), 5);
    assert_eq!(agent.requests().len(), 5);
}

#[tokio::test]
async fn set_then_get_over_udp() {
    let agent = TestAgent::new().await;
    let client = agent_client(&agent).await;
    let sys_name = common::sys_name();

    client
        .set(VarBind::new(sys_name.clone(), Value::from("renamed")))
        .await
        .unwrap();
    assert_eq!(agent.get(&sys_name), Some(Value::from("renamed")));

    let vb = client.get(&sys_name).await.unwrap();
    assert_eq!(vb.value.as_str(), Some("renamed"));

    let err = client.get(&common::nonexistent_oid()).await.unwrap_err();
    assert!(matches!(err, Error::NoSuchObject { .. }));
}

#[tokio::test]
async fn concurrent_gets_share_one_socket() {
    let agent = TestAgent::new().await;
    let client = Client::builder(agent.addr().to_string(), Auth::v2c("public"))
        .timeout(Duration::from_millis(500))
        .retry(Retry::none())
        .connect()
        .await
        .unwrap();

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.get(&common::sys_descr()).await })
        })
        .collect();

    for task in tasks {
        let vb = task.await.unwrap().unwrap();
        assert_eq!(vb.value.as_str(), Some("Test SNMP Agent"));
    }
    assert_eq!(agent.requests().len(), 32);
}

#[tokio::test]
async fn concurrent_walks_see_their_own_subtrees() {
    let agent = TestAgent::with_data(common::combined([system_mib(), interface_table(3)])).await;
    let client = agent_client(&agent).await;

    let system = tokio::spawn({
        let client = client.clone();
        async move { client.walk_collect(&system_subtree()).await }
    });
    let interfaces = tokio::spawn({
        let client = client.clone();
        async move { client.walk_collect(&interfaces_subtree()).await }
    });

    let system = system.await.unwrap().unwrap();
    let interfaces = interfaces.await.unwrap().unwrap();
    assert_eq!(system.len(), 7);
    assert!(system.iter().all(|vb| vb.oid.starts_with(&system_subtree())));
    assert_eq!(interfaces.len(), 1 + 8 * 3);
    assert!(interfaces.iter().all(|vb| vb.oid.starts_with(&interfaces_subtree())));
}
