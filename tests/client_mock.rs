//! Client request tests using MockTransport.
//!
//! Run with: `cargo test --test client_mock`

mod common;

use bytes::Bytes;
use common::{COMMUNITY, error_response, mock, mock_client, response};
use snmp_lite::message::CommunityMessage;
use snmp_lite::node::{self, ScalarNode, get_typed, set_typed};
use snmp_lite::pdu::Pdu;
use snmp_lite::transport::{MockTransport, ResponseBuilder};
use snmp_lite::{
    Auth, Client, DecodeErrorKind, EncodeErrorKind, Error, ErrorStatus, PduType, Result, Retry,
    Security, UsmCredentials, Value, VarBind, Version, oid,
};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// GET
// ============================================================================

#[tokio::test]
async fn get_returns_value() {
    let mock = mock();
    mock.queue_response(response([(
        oid!(1, 3, 6, 1, 2, 1, 1, 5, 0),
        Value::from("core-sw1"),
    )]));
    let client = mock_client(&mock);

    let vb = client.get(&oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)).await.unwrap();
    assert_eq!(vb.value.as_str(), Some("core-sw1"));

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    let pdu = requests[0].pdu.as_ref().unwrap();
    assert_eq!(pdu.pdu_type, PduType::GetRequest);
    assert_eq!(pdu.varbinds, vec![VarBind::null(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0))]);
    assert!(pdu.request_id > 0);
}

#[tokio::test]
async fn get_maps_exceptions_to_errors() {
    let mock = mock();
    let oid = oid!(1, 3, 6, 1, 2, 1, 1, 99, 0);
    mock.queue_response(response([(oid.clone(), Value::NoSuchObject)]));
    mock.queue_response(response([(oid.clone(), Value::NoSuchInstance)]));
    let client = mock_client(&mock);

    let err = client.get(&oid).await.unwrap_err();
    assert!(matches!(err, Error::NoSuchObject { oid: ref o } if *o == oid));

    let err = client.get(&oid).await.unwrap_err();
    assert!(matches!(err, Error::NoSuchInstance { .. }));
}

#[tokio::test]
async fn get_many_returns_exceptions_in_place() {
    let mock = mock();
    mock.queue_response(response([
        (oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("router")),
        (oid!(1, 3, 6, 1, 2, 1, 1, 99, 0), Value::NoSuchObject),
    ]));
    let client = mock_client(&mock);

    let results = client
        .get_many(&[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), oid!(1, 3, 6, 1, 2, 1, 1, 99, 0)])
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].value.as_str(), Some("router"));
    assert_eq!(results[1].value, Value::NoSuchObject);
}

#[tokio::test]
async fn get_many_splits_into_batches() {
    let mock = mock();
    let oids: Vec<_> = (1..=25).map(|i| oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2, i)).collect();
    for chunk in oids.chunks(10) {
        mock.queue_response(response(
            chunk.iter().map(|o| (o.clone(), Value::Integer(1))),
        ));
    }
    let client = mock_client(&mock);

    let results = client.get_many(&oids).await.unwrap();
    assert_eq!(results.len(), 25);
    assert_eq!(
        results.iter().map(|vb| vb.oid.clone()).collect::<Vec<_>>(),
        oids
    );

    let sizes: Vec<_> = mock
        .requests()
        .iter()
        .map(|r| r.pdu.as_ref().unwrap().varbinds.len())
        .collect();
    assert_eq!(sizes, vec![10, 10, 5]);

    let ids: Vec<_> = mock.requests().iter().map(|r| r.request_id().unwrap()).collect();
    assert!(ids[0] != ids[1] && ids[1] != ids[2]);
}

#[tokio::test]
async fn get_many_empty_sends_nothing() {
    let mock = mock();
    let client = mock_client(&mock);
    assert!(client.get_many(&[]).await.unwrap().is_empty());
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn get_next_returns_successor() {
    let mock = mock();
    mock.queue_response(response([(
        oid!(1, 3, 6, 1, 2, 1, 1, 1, 0),
        Value::from("router"),
    )]));
    let client = mock_client(&mock);

    let vb = client.get_next(&oid!(1, 3, 6, 1, 2, 1, 1)).await.unwrap();
    assert_eq!(vb.oid, oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
    assert_eq!(mock.requests()[0].pdu_type(), Some(PduType::GetNextRequest));
}

#[tokio::test]
async fn get_bulk_carries_parameters() {
    let mock = mock();
    mock.queue_response(response([
        (oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("a")),
        (oid!(1, 3, 6, 1, 2, 1, 1, 2, 0), Value::from("b")),
    ]));
    let client = mock_client(&mock);

    let results = client
        .get_bulk(&[oid!(1, 3, 6, 1, 2, 1, 1)], 0, 2)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);

    let pdu = mock.requests()[0].pdu.clone().unwrap();
    assert_eq!(pdu.pdu_type, PduType::GetBulkRequest);
    assert_eq!(pdu.error_status, 0);
    assert_eq!(pdu.error_index, 2);
}

// ============================================================================
// SET
// ============================================================================

#[tokio::test]
async fn set_returns_echo() {
    let mock = mock();
    let vb = VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("edge-2"));
    mock.queue_response(response([(vb.oid.clone(), vb.value.clone())]));
    let client = mock_client(&mock);

    let echoed = client.set(vb.clone()).await.unwrap();
    assert_eq!(echoed, vb);

    let pdu = mock.requests()[0].pdu.clone().unwrap();
    assert_eq!(pdu.pdu_type, PduType::SetRequest);
    assert_eq!(pdu.varbinds, vec![vb]);
}

#[tokio::test]
async fn set_refuses_exception_values() {
    let mock = mock();
    let client = mock_client(&mock);

    for value in [Value::NoSuchObject, Value::NoSuchInstance, Value::EndOfMibView] {
        let err = client
            .set(VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), value))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Encode {
                kind: EncodeErrorKind::SentinelInRequest { .. }
            }
        ));
    }
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn set_error_status_is_not_retried() {
    let mock = mock();
    let oid = oid!(1, 3, 6, 1, 2, 1, 1, 5, 0);
    mock.queue_response(error_response(ErrorStatus::NotWritable.as_i32(), 1, oid.clone()));
    let client = Client::builder("127.0.0.1:161", Auth::v2c("private"))
        .retry(Retry::fixed(3, Duration::ZERO))
        .build_with(mock.clone())
        .unwrap();

    let err = client
        .set(VarBind::new(oid.clone(), Value::Integer(1)))
        .await
        .unwrap_err();
    match err {
        Error::Snmp {
            status,
            index,
            oid: Some(failed),
            ..
        } => {
            assert_eq!(status, ErrorStatus::NotWritable);
            assert_eq!(index, 1);
            assert_eq!(failed, oid);
        }
        other => panic!("expected Snmp error, got {:?}", other),
    }
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn set_many_batches_and_stops_at_first_failure() {
    let mock = mock();
    let varbinds: Vec<_> = (1..=3)
        .map(|i| VarBind::new(oid!(1, 3, 6, 1, 4, 1, 9, i), Value::Integer(i as i32)))
        .collect();
    mock.queue_response(response(
        varbinds[..2].iter().map(|vb| (vb.oid.clone(), vb.value.clone())),
    ));
    mock.queue_response(error_response(
        ErrorStatus::WrongValue.as_i32(),
        1,
        varbinds[2].oid.clone(),
    ));
    let client = Client::builder("127.0.0.1:161", Auth::v2c("private"))
        .retry(Retry::none())
        .max_oids_per_request(2)
        .build_with(mock.clone())
        .unwrap();

    let err = client.set_many(&varbinds).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Snmp {
            status: ErrorStatus::WrongValue,
            ..
        }
    ));
    assert_eq!(mock.requests().len(), 2);
}

// ============================================================================
// Response validation
// ============================================================================

#[tokio::test]
async fn stale_request_id_is_rejected() {
    let mock = mock();
    // request ids are never zero
    mock.queue_raw_response(
        ResponseBuilder::new(0)
            .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("x"))
            .build_v2c(COMMUNITY),
    );
    let client = mock_client(&mock);

    let err = client.get(&oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)).await.unwrap_err();
    let sent = mock.requests()[0].request_id().unwrap();
    assert!(matches!(
        err,
        Error::RequestIdMismatch { expected, actual: 0 } if expected == sent
    ));
}

#[tokio::test]
async fn version_mismatch_is_rejected() {
    let mock = mock();
    mock.queue_response(
        ResponseBuilder::new(1)
            .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("x"))
            .build_v1(COMMUNITY),
    );
    let client = mock_client(&mock);

    let err = client.get(&oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::VersionMismatch {
            expected: Version::V2c,
            actual: Version::V1
        }
    ));
}

#[tokio::test]
async fn truncated_response_is_malformed() {
    let mock = mock();
    mock.queue_raw_response(Bytes::from_static(&[0x30, 0x10, 0x02, 0x01]));
    let client = mock_client(&mock);

    let err = client.get(&oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)).await.unwrap_err();
    assert!(err.is_malformed(), "{:?}", err);
}

#[tokio::test]
async fn empty_response_is_malformed() {
    let mock = mock();
    mock.queue_response(ResponseBuilder::new(1).build_v2c(COMMUNITY));
    let client = mock_client(&mock);

    let err = client.get(&oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Decode {
            kind: DecodeErrorKind::EmptyResponse,
            ..
        }
    ));
}

#[tokio::test]
async fn io_error_is_not_retried() {
    let mock = mock();
    mock.queue_io_error("connection refused");
    let client = Client::builder("127.0.0.1:161", Auth::v2c("public"))
        .retry(Retry::fixed(3, Duration::ZERO))
        .build_with(mock.clone())
        .unwrap();

    let err = client.get(&oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)).await.unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert_eq!(err.target(), Some("127.0.0.1:161".parse().unwrap()));
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn v1_get_bulk_is_rejected_without_sending() {
    let mock = mock();
    let client = Client::builder("127.0.0.1:161", Auth::v1("public"))
        .build_with(mock.clone())
        .unwrap();

    let err = client
        .get_bulk(&[oid!(1, 3, 6, 1, 2, 1, 1)], 0, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::GetBulkNotSupportedInV1));
    assert!(mock.requests().is_empty());
}

// ============================================================================
// Typed nodes
// ============================================================================

#[tokio::test]
async fn typed_node_get_and_set() {
    let mock = mock();
    let sys_uptime: ScalarNode<node::TimeTicks> =
        ScalarNode::new("sysUpTime", "", oid!(1, 3, 6, 1, 2, 1, 1, 3, 0));
    let sys_contact: ScalarNode<node::OctetString> =
        ScalarNode::new("sysContact", "", oid!(1, 3, 6, 1, 2, 1, 1, 4, 0));

    mock.queue_response(response([(sys_uptime.oid.clone(), Value::TimeTicks(12345))]));
    mock.queue_response(response([(sys_uptime.oid.clone(), Value::Gauge32(12345))]));
    mock.queue_response(response([(sys_contact.oid.clone(), Value::from("noc"))]));
    let client = mock_client(&mock);

    let uptime = get_typed(&client, &sys_uptime).await.unwrap();
    assert_eq!(uptime.value, 12345);

    let err = get_typed(&client, &sys_uptime).await.unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));

    set_typed(&client, sys_contact.value(Bytes::from_static(b"noc")))
        .await
        .unwrap();
    let pdu = mock.requests()[2].pdu.clone().unwrap();
    assert_eq!(pdu.pdu_type, PduType::SetRequest);
    assert_eq!(pdu.varbinds[0].value, Value::from("noc"));
}

// ============================================================================
// Pluggable security
// ============================================================================

/// Frames v3 requests as v2c messages whose community is the user name.
struct PlainSecurity;

impl Security for PlainSecurity {
    fn wrap(&self, credentials: &UsmCredentials, pdu: &Pdu) -> Result<Bytes> {
        Ok(CommunityMessage::v2c(credentials.username().to_owned(), pdu.clone()).encode())
    }

    fn unwrap(&self, _credentials: &UsmCredentials, data: Bytes) -> Result<Pdu> {
        CommunityMessage::decode(data).map(CommunityMessage::into_pdu)
    }
}

#[tokio::test]
async fn usm_requests_go_through_security() {
    let mock: MockTransport = mock();
    mock.queue_response(response([(
        oid!(1, 3, 6, 1, 2, 1, 1, 5, 0),
        Value::from("core-sw1"),
    )]));
    let client = Client::builder("127.0.0.1:161", Auth::usm("admin").with("auth_password", "x"))
        .security(Arc::new(PlainSecurity))
        .retry(Retry::none())
        .build_with(mock.clone())
        .unwrap();

    let vb = client.get(&oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)).await.unwrap();
    assert_eq!(vb.value.as_str(), Some("core-sw1"));

    let sent = CommunityMessage::decode(mock.requests()[0].data.clone()).unwrap();
    assert_eq!(&sent.community[..], b"admin");
}
