//! Every catalog operation against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `DripClient` with its
//! default `ureq` transport over real HTTP. The server state is shared with
//! the test so side effects can be checked directly.

use drip_core::{operations, params, ClientConfig, ClientError, DripClient, Params};
use mock_server::{Db, ACCOUNT_ID, CAMPAIGN_ID, WORKFLOW_ID};
use serde_json::Value;

/// Start the mock server on its own thread and return its base URL.
fn start_server(db: Db) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_state(listener, db).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn subscriber(extra: &[(&str, &str)]) -> Params {
    let mut p = params([("account_id", ACCOUNT_ID), ("email", "jane@example.com")]);
    p.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    p
}

#[test]
fn subscriber_lifecycle() {
    let db = Db::default();
    let base_url = start_server(db.clone());
    let client = DripClient::with_config(ClientConfig::new("abc123").with_base_url(&base_url));

    // Step 1: listings unwrap their collection field.
    let accounts = client.accounts_list().unwrap();
    assert_eq!(accounts[0]["id"], ACCOUNT_ID);

    let account = params([("account_id", ACCOUNT_ID)]);
    let workflows = client.workflows_list(&account).unwrap();
    assert_eq!(workflows[0]["id"], WORKFLOW_ID);
    let campaigns = client.campaigns_list(&account).unwrap();
    assert_eq!(campaigns[0]["id"], CAMPAIGN_ID);

    // Step 2: create the subscriber; only the first name is sent.
    let links = client.add_subscriber(&subscriber(&[("name", "Jane Doe")])).unwrap();
    assert!(links.is_object());
    {
        let state = db.blocking_read();
        assert_eq!(
            state.subscribers["jane@example.com"].custom_fields["first_name"],
            "Jane"
        );
    }

    // Step 3: tag. The server answers 201 with no body.
    let tagged = client.add_tag(&subscriber(&[("tag", "VIP")])).unwrap();
    assert_eq!(tagged, Value::Null);
    assert!(db.blocking_read().subscribers["jane@example.com"].tags.contains("VIP"));

    // Step 4: workflow and campaign enrolment.
    let enrolled = client
        .add_to_workflow(&subscriber(&[("workflow_id", WORKFLOW_ID), ("name", "Jane Doe")]))
        .unwrap();
    assert_eq!(enrolled[0]["workflows"][0], WORKFLOW_ID);

    let enrolled = client
        .add_to_campaign(&subscriber(&[("campaign_id", CAMPAIGN_ID), ("name", "Jane")]))
        .unwrap();
    assert_eq!(enrolled[0]["campaigns"][0], CAMPAIGN_ID);

    let unsubscribed = client
        .remove_from_campaign(&subscriber(&[("campaign_id", CAMPAIGN_ID)]))
        .unwrap();
    assert_eq!(unsubscribed[0]["campaigns"], serde_json::json!([]));

    // Step 5: record an event.
    let recorded = client
        .record_event(&subscriber(&[
            ("event", "Attended webinar"),
            ("webinar_id", "42"),
            ("webinar_name", "Intro"),
            ("occurred_at", "2024-05-01T10:00:00Z"),
        ]))
        .unwrap();
    assert_eq!(recorded, Value::Null);
    {
        let state = db.blocking_read();
        assert_eq!(state.events.len(), 1);
        assert_eq!(state.events[0].action, "Attended webinar");
        assert_eq!(state.events[0].properties["source"], "demio");
        assert_eq!(state.events[0].properties["webinar_id"], "42");
    }

    // Step 6: undo everything.
    client
        .remove_from_workflow(&subscriber(&[("workflow_id", WORKFLOW_ID)]))
        .unwrap();
    assert!(db.blocking_read().subscribers["jane@example.com"].workflows.is_empty());

    client.remove_tag(&subscriber(&[("tag", "VIP")])).unwrap();
    assert!(db.blocking_read().subscribers["jane@example.com"].tags.is_empty());

    client.remove_subscriber(&subscriber(&[])).unwrap();
    assert!(db.blocking_read().subscribers.is_empty());

    // Step 7: an error envelope comes back whole.
    let missing = client.remove_subscriber(&subscriber(&[])).unwrap();
    assert_eq!(missing["errors"][0]["code"], "not_found_error");
}

#[test]
fn invalid_calls_never_reach_the_server() {
    let db = Db::default();
    let base_url = start_server(db.clone());
    let client = DripClient::with_config(ClientConfig::new("abc123").with_base_url(&base_url));

    assert!(client.add_tag(&subscriber(&[])).is_none());
    assert!(client.call("no_such_operation", &Params::new()).is_none());
    assert!(matches!(
        client.execute(operations::ADD_SUBSCRIBER, &params([("account_id", ACCOUNT_ID)])),
        Err(ClientError::MissingParameter { .. })
    ));
    assert!(db.blocking_read().subscribers.is_empty());
}

#[test]
fn unreachable_server_is_a_transport_failure() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client =
        DripClient::with_config(ClientConfig::new("abc123").with_base_url(&format!("http://{addr}")));

    assert!(client.accounts_list().is_none());
    assert!(matches!(
        client.execute(operations::ACCOUNTS_LIST, &Params::new()),
        Err(ClientError::Transport(_))
    ));
}
