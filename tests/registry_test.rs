//! Process registry, channel aliases and account info against a mock service

mod common;

use common::{client_for, service_path, API_KEY, API_SECRET};
use rubble_client::{
    term, AliasListOptions, Cause, ClientConfig, CreateProcess, ErrorKind, Facts, FactsFormat,
    Pid, ProcessKind, ProcessListOptions, ProcessState, RubbleClient, RubbleError, RulesRef,
    Trapstate, UpdateProcess,
};
use serde_json::json;
use wiremock::matchers::{basic_auth, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Processes
// =============================================================================

#[tokio::test]
async fn test_create_then_get_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(service_path("processcreate")))
        .and(basic_auth(API_KEY, API_SECRET))
        .and(body_json(json!({"rulesref": "", "factsformat": "json", "facts": []})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pid": "42"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(service_path("process")))
        .and(query_param("pid", "42"))
        .and(query_param("prettyprint", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": {
                "pid": "42",
                "modtime": 1367237523740i64,
                "domain": "acme",
                "rulesref": "",
                "factsformat": "json",
                "facts": []
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let create = CreateProcess::new(RulesRef::none()).with_facts(FactsFormat::Json, vec![]);
    let pid = client.create_process(&create).await.unwrap();
    assert_eq!(pid, Pid(42));

    let process = client.get_process(pid, false).await.unwrap();
    assert_eq!(process.pid, Pid(42));
    assert_eq!(process.domain, "acme");
    assert_eq!(process.state(), ProcessState::Normal);
    assert!(process.fact_terms().unwrap().is_empty());
}

#[tokio::test]
async fn test_get_trapped_process() {
    let server = MockServer::start().await;
    let trap = Trapstate::new(Cause::Error, "Inference failure: CONTRADICTION crazy_fact", 1_368_101_400_107)
        .with_triggering_message(vec![term!("input", term!("pid", 42i64), "crazy_fact")]);
    Mock::given(method("GET"))
        .and(path(service_path("process")))
        .and(query_param("prettyprint", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": {
                "pid": "42",
                "modtime": 0,
                "domain": "acme",
                "rulesref": "file:/foo.rubble",
                "factsformat": "native",
                "facts": "full(moon);",
                "trapstate": trap.to_xml()
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let process = client.get_process(Pid(42), true).await.unwrap();
    assert_eq!(process.state(), ProcessState::Error);
    assert!(!process.accepts_messages());
    assert_eq!(process.trapstate, Some(trap));
    assert_eq!(process.rules_ref.path(), Some("foo.rubble"));
}

#[tokio::test]
async fn test_get_process_keeps_unreadable_triggering_message() {
    let server = MockServer::start().await;
    let xml = Trapstate::new(Cause::Paused, "maintenance", 1_368_101_400_107)
        .to_xml()
        .replace(
            "<triggering-message></triggering-message>",
            "<triggering-message>reading(java.lang.Double@1f);</triggering-message>",
        );
    Mock::given(method("GET"))
        .and(path(service_path("process")))
        .and(query_param("pid", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": {
                "pid": "42",
                "modtime": 0,
                "domain": "acme",
                "rulesref": "",
                "factsformat": "json",
                "facts": [],
                "trapstate": xml
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let process = client.get_process(Pid(42), false).await.unwrap();
    assert_eq!(process.state(), ProcessState::Paused);

    let trap = process.trapstate.unwrap();
    assert_eq!(trap.triggering_message, "reading(java.lang.Double@1f);");
    assert!(trap.triggering_terms().is_err());
}

#[tokio::test]
async fn test_update_clears_trapstate_by_omission() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(service_path("processupdate")))
        .and(body_json(json!({
            "pid": "42",
            "rulesref": "file:/foo.rubble",
            "factsformat": "native",
            "facts": "full(moon);"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let update = UpdateProcess::new(Pid(42), RulesRef::local("foo.rubble"))
        .with_facts(FactsFormat::Native, Facts::Source("full(moon);".into()));
    client.update_process(&update).await.unwrap();
}

#[tokio::test]
async fn test_delete_existing_and_missing_process() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(service_path("process")))
        .and(query_param("pid", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(service_path("process")))
        .and(query_param("pid", "43"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"error": "No such process or unauthorized access"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.delete_process(Pid(42)).await.unwrap();

    let err = client.delete_process(Pid(43)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Application);
    assert_eq!(
        err.application_message(),
        Some("No such process or unauthorized access")
    );
}

#[tokio::test]
async fn test_list_processes_with_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(service_path("processlist")))
        .and(query_param("pidBegin", "100"))
        .and(query_param("maxItems", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [
                {"pid": "100", "domain": "acme", "modtime": 1, "type": "rules"},
                {"pid": "104", "domain": "acme", "modtime": 2, "type": "script"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let listed = client
        .list_processes(ProcessListOptions {
            pid_begin: Some(Pid(100)),
            max_items: Some(2),
        })
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[1].pid, Pid(104));
    assert_eq!(listed[1].kind, ProcessKind::Script);
}

#[tokio::test]
async fn test_format_mismatch_fails_before_request() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let create = CreateProcess::new(RulesRef::none())
        .with_facts(FactsFormat::Native, vec![term!("leap_year")]);
    let err = client.create_process(&create).await.unwrap_err();
    assert!(matches!(err, RubbleError::FormatMismatch { format: "native", .. }));

    let update = UpdateProcess::new(Pid(1), RulesRef::none())
        .with_facts(FactsFormat::Json, Facts::Source("leap_year;".into()));
    let err = client.update_process(&update).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let missing_source = CreateProcess {
        facts_format: Some(FactsFormat::Native),
        ..CreateProcess::new(RulesRef::none())
    };
    let err = client.create_process(&missing_source).await.unwrap_err();
    assert!(matches!(
        err,
        RubbleError::FormatMismatch { format: "native", expected: "source-text" }
    ));

    let received = server.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());
}

#[tokio::test]
async fn test_server_error_status_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(service_path("processlist")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .list_processes(ProcessListOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert!(matches!(err, RubbleError::Transport { status: 401, .. }));
}

// =============================================================================
// Channel aliases
// =============================================================================

#[tokio::test]
async fn test_alias_delete_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(service_path("chanupdate")))
        .and(query_param("channel", "foo"))
        .and(query_param("pid", "0"))
        .and(basic_auth(API_KEY, API_SECRET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(service_path("chanlist")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [{"name": "todo", "pid": "42"}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.delete_alias("foo").await.unwrap();

    let aliases = client.list_aliases(AliasListOptions::default()).await.unwrap();
    assert!(aliases.iter().all(|alias| alias.name != "foo"));
    assert_eq!(aliases[0].pid, Pid(42));
}

#[tokio::test]
async fn test_alias_repoint_and_global_listing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(service_path("chanupdate")))
        .and(query_param("channel", "todo list"))
        .and(query_param("pid", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(service_path("chanlist")))
        .and(query_param("includeGlobal", "1"))
        .and(query_param("domain", "*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [{"channel": "weather", "pid": 7}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.update_alias("todo list", Pid(42)).await.unwrap();

    let global = client.list_aliases(AliasListOptions::global_only()).await.unwrap();
    assert_eq!(global.len(), 1);
    assert_eq!(global[0].name, "weather");
    assert_eq!(global[0].pid, Pid(7));
}

// =============================================================================
// Account
// =============================================================================

#[tokio::test]
async fn test_domain_info() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(service_path("domaininfo")))
        .and(basic_auth(API_KEY, API_SECRET))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"domain": "acme", "apikey": API_KEY})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let info = client.domain_info().await.unwrap();
    assert_eq!(info.domain, "acme");
    assert_eq!(info.apikey, API_KEY);
}

#[test]
fn test_client_requires_credentials() {
    let config = ClientConfig::new("http://localhost:8082/", "key", "");
    let err = RubbleClient::new(config).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Config);
}
