use devdnsd::dns::passthrough::Passthrough;
use devdnsd::dns::Handler;
use devdnsd::rules::{FailurePolicy, Pattern, Reply, ReplySource, Rule, RuleSet};
use serde_json::{json, Value};
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use trust_dns_client::client::{AsyncClient, ClientHandle};
use trust_dns_client::op::ResponseCode;
use trust_dns_client::rr::{DNSClass, Name, RData, RecordType};
use trust_dns_client::udp::UdpClientStream;
use trust_dns_proto::xfer::DnsResponse;
use trust_dns_server::ServerFuture;

fn rule(pattern: Pattern, reply: &str, types: &[&str], options: Value) -> Rule {
    Rule::new(pattern, ReplySource::Static(reply.to_string()), types, options).unwrap()
}

fn scenario() -> RuleSet {
    RuleSet::from_rules(vec![
        rule(Pattern::exact("match1.dev"), "10.0.1.1", &["A"], json!({})),
        rule(
            Pattern::exact("match2.dev"),
            "mail.match2.dev",
            &["MX"],
            json!({"priority": 5}),
        ),
        rule(
            Pattern::regex(r"^match3_(\d+)\.dev$").unwrap(),
            "10.0.3.$1",
            &["A"],
            json!({}),
        ),
        rule(Pattern::exact("match10.dev"), "10.0.10.1", &["A"], json!({"ttl": 60})),
        rule(
            Pattern::exact("match10.dev"),
            "mail.match10.dev",
            &["MX"],
            json!({}),
        ),
    ])
}

async fn start(rules: RuleSet, passthrough: Option<Passthrough>) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let mut server = ServerFuture::new(Handler::new(Arc::new(rules), passthrough));
    server.register_socket(socket);
    tokio::spawn(server.block_until_done());
    addr
}

async fn query(addr: SocketAddr, name: &str, record_type: RecordType) -> DnsResponse {
    let stream = UdpClientStream::<UdpSocket>::new(addr);
    let (mut client, background) = AsyncClient::connect(stream).await.unwrap();
    tokio::spawn(background);
    client
        .query(Name::from_str(name).unwrap(), DNSClass::IN, record_type)
        .await
        .unwrap()
}

fn a_records(response: &DnsResponse) -> Vec<Ipv4Addr> {
    response
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            Some(RData::A(addr)) => Some(*addr),
            _ => None,
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn answers_exact_and_pattern_rules() {
    let addr = start(scenario(), None).await;

    let response = query(addr, "match1.dev.", RecordType::A).await;
    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert_eq!(a_records(&response), vec![Ipv4Addr::new(10, 0, 1, 1)]);
    assert_eq!(response.answers()[0].ttl(), 300);

    let response = query(addr, "match3_42.dev.", RecordType::A).await;
    assert_eq!(a_records(&response), vec![Ipv4Addr::new(10, 0, 3, 42)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn answers_mx_with_preference() {
    let addr = start(scenario(), None).await;

    let response = query(addr, "match2.dev.", RecordType::MX).await;
    assert_eq!(response.answers().len(), 1);
    match response.answers()[0].data() {
        Some(RData::MX(mx)) => {
            assert_eq!(mx.preference(), 5);
            assert_eq!(mx.exchange().to_string(), "mail.match2.dev.");
        }
        other => panic!("expected an MX record, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn returns_several_answers_for_any() {
    let addr = start(scenario(), None).await;

    let response = query(addr, "match10.dev.", RecordType::ANY).await;
    let types: Vec<RecordType> = response
        .answers()
        .iter()
        .map(trust_dns_client::rr::Record::record_type)
        .collect();
    assert_eq!(types, vec![RecordType::A, RecordType::MX]);
    assert_eq!(response.answers()[0].ttl(), 60);

    let response = query(addr, "match10.dev.", RecordType::A).await;
    assert_eq!(a_records(&response), vec![Ipv4Addr::new(10, 0, 10, 1)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn unmatched_queries_get_nxdomain() {
    let addr = start(scenario(), None).await;

    for (name, record_type) in [
        ("nomatch.dev.", RecordType::ANY),
        ("match1.dev.", RecordType::MX),
        ("match1.dev.", RecordType::SRV),
    ] {
        let response = query(addr, name, record_type).await;
        assert_eq!(response.response_code(), ResponseCode::NXDomain);
        assert!(response.answers().is_empty());
    }
}

fn failing_rules(policy: FailurePolicy) -> RuleSet {
    RuleSet::from_rules(vec![
        Rule::new(
            Pattern::exact("flaky.dev"),
            ReplySource::callback(|_, _, _| Err(anyhow::anyhow!("backend unavailable"))),
            ["A"],
            json!({}),
        )
        .unwrap(),
        Rule::new(
            Pattern::exact("flaky.dev"),
            ReplySource::callback(|_, _, ctx| {
                Ok(if ctx.source.is_some() {
                    Reply::from("10.0.0.9")
                } else {
                    Reply::Absent
                })
            }),
            ["A"],
            json!({}),
        )
        .unwrap(),
    ])
    .with_failure_policy(policy)
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_callback_aborts_with_servfail() {
    let addr = start(failing_rules(FailurePolicy::Abort), None).await;
    let response = query(addr, "flaky.dev.", RecordType::A).await;
    assert_eq!(response.response_code(), ResponseCode::ServFail);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_callback_is_skipped() {
    let addr = start(failing_rules(FailurePolicy::Skip), None).await;
    let response = query(addr, "flaky.dev.", RecordType::A).await;
    assert_eq!(response.response_code(), ResponseCode::NoError);
    assert_eq!(a_records(&response), vec![Ipv4Addr::new(10, 0, 0, 9)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn passthrough_relays_upstream_answers() {
    let upstream = start(
        RuleSet::from_rules(vec![rule(
            Pattern::exact("upstream.dev"),
            "10.9.9.9",
            &["A"],
            json!({}),
        )]),
        None,
    )
    .await;
    let front = start(scenario(), Some(Passthrough::new(upstream))).await;

    let response = query(front, "match1.dev.", RecordType::A).await;
    assert_eq!(a_records(&response), vec![Ipv4Addr::new(10, 0, 1, 1)]);

    let response = query(front, "upstream.dev.", RecordType::A).await;
    assert_eq!(a_records(&response), vec![Ipv4Addr::new(10, 9, 9, 9)]);

    let response = query(front, "nowhere.dev.", RecordType::A).await;
    assert_eq!(response.response_code(), ResponseCode::NXDomain);
}

#[tokio::test(flavor = "multi_thread")]
async fn declared_rules_leave_other_names_unanswered() {
    let mut rules = RuleSet::default();
    rules
        .add_rule(
            Pattern::exact("a.dev"),
            ReplySource::Static("10.0.0.1".to_string()),
            ["A"],
            json!({}),
        )
        .unwrap();
    let addr = start(rules, None).await;

    let response = query(addr, "a.dev.", RecordType::A).await;
    assert_eq!(a_records(&response), vec![Ipv4Addr::new(10, 0, 0, 1)]);

    let response = query(addr, "nomatch.dev.", RecordType::A).await;
    assert_eq!(response.response_code(), ResponseCode::NXDomain);
}
