use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use escrow_engine::registry::{ContractList, RegisterContractResponse};
use escrow_engine::{
    AccountSnapshot, ApprovalOutcome, EscrowEvent, EscrowEventKind, EscrowState, HttpRegistry,
    RegistryEntry, RegistrySync,
};
use http_body_util::BodyExt;
use pactum_api::{app, AppState};
use pactum_core::{AccountId, PartyId, Settings};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn settings(allow_mint: bool) -> Settings {
    let mut settings = Settings::default();
    settings.ledger.allow_mint = allow_mint;
    settings
}

fn test_state() -> AppState {
    AppState::from_settings(settings(true)).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

fn post(uri: &str, caller: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(caller) = caller {
        builder = builder.header("x-caller-identity", caller);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn mint(app: &Router, party: &str, amount: &str) {
    let (status, _) = send(
        app,
        post("/v1/ledger/mint", None, json!({ "party": party, "amount": amount })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn create(app: &Router, sender: &str, receiver: &str, amount: &str) -> AccountSnapshot {
    let (status, body) = send(
        app,
        post(
            "/v1/escrows",
            Some(sender),
            json!({
                "receiver": receiver,
                "alias": "Laptop",
                "description": "Used laptop",
                "amount": amount,
                "deposit": amount,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    serde_json::from_value(body).unwrap()
}

async fn balance(app: &Router, party: &str) -> Decimal {
    let (status, body) = send(app, get(&format!("/v1/balances/{}", party))).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_value(body["balance"].clone()).unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = app(test_state());
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));
}

#[tokio::test]
async fn full_release_over_http() {
    let app = app(test_state());
    mint(&app, "alice", "5").await;

    let escrow = create(&app, "alice", "bob", "5").await;
    assert_eq!(escrow.state, EscrowState::Created);
    assert_eq!(balance(&app, "alice").await, Decimal::ZERO);

    let (status, body) = send(
        &app,
        post(&format!("/v1/escrows/{}/approve/receiver", escrow.id), Some("bob"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let outcome: ApprovalOutcome = serde_json::from_value(body).unwrap();
    assert!(!outcome.released);

    let (status, body) = send(
        &app,
        post(&format!("/v1/escrows/{}/approve/sender", escrow.id), Some("alice"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let outcome: ApprovalOutcome = serde_json::from_value(body).unwrap();
    assert!(outcome.released);
    assert!(outcome.snapshot.settled);

    assert_eq!(balance(&app, "bob").await, Decimal::from(5));

    let (status, body) = send(&app, get(&format!("/v1/escrows/{}/events", escrow.id))).await;
    assert_eq!(status, StatusCode::OK);
    let events: Vec<EscrowEvent> = serde_json::from_value(body).unwrap();
    assert_eq!(events.last().map(|event| event.kind), Some(EscrowEventKind::Released));

    // Settled escrows are dropped from the registry
    let (status, _) = send(&app, get(&format!("/contract/{}", escrow.id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn error_status_mapping() {
    let app = app(test_state());
    mint(&app, "alice", "10").await;
    let escrow = create(&app, "alice", "bob", "5").await;

    // Missing caller header
    let (status, body) = send(
        &app,
        post(&format!("/v1/escrows/{}/approve/sender", escrow.id), None, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MISSING_CALLER");

    // Wrong party
    let (status, body) = send(
        &app,
        post(&format!("/v1/escrows/{}/approve/sender", escrow.id), Some("bob"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // Duplicate approval
    let uri = format!("/v1/escrows/{}/approve/receiver", escrow.id);
    let (status, _) = send(&app, post(&uri, Some("bob"), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, post(&uri, Some("bob"), json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_APPROVED");

    // Unknown escrow
    let (status, body) = send(&app, get(&format!("/v1/escrows/{}", AccountId::new()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "ACCOUNT_NOT_FOUND");

    // Malformed escrow id
    let (status, _) = send(&app, get("/v1/escrows/not-a-uuid")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn creation_rejections_are_unprocessable() {
    let app = app(test_state());
    mint(&app, "alice", "10").await;

    let cases = [
        (json!({ "receiver": "bob", "amount": "5", "deposit": "4" }), "INVALID_DEPOSIT"),
        (json!({ "receiver": "bob", "amount": "0", "deposit": "0" }), "ZERO_AMOUNT"),
        (json!({ "receiver": "Alice", "amount": "5", "deposit": "5" }), "SELF_DEALING"),
        (json!({ "receiver": "bob", "amount": "50", "deposit": "50" }), "INSUFFICIENT_FUNDS"),
    ];

    for (body, code) in cases {
        let (status, response) = send(&app, post("/v1/escrows", Some("alice"), body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response["error"]["code"], code);
    }

    assert_eq!(balance(&app, "alice").await, Decimal::from(10));

    let (status, body) = send(&app, get("/v1/parties/alice/escrows")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn refund_and_listing() {
    let app = app(test_state());
    mint(&app, "alice", "5").await;
    let escrow = create(&app, "alice", "bob", "5").await;

    let (status, body) = send(&app, get("/v1/parties/bob/escrows")).await;
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<AccountSnapshot> = serde_json::from_value(body).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, escrow.id);

    let (status, body) = send(
        &app,
        post(&format!("/v1/escrows/{}/refund", escrow.id), Some("alice"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let snapshot: AccountSnapshot = serde_json::from_value(body).unwrap();
    assert_eq!(snapshot.state, EscrowState::Refunded);
    assert_eq!(balance(&app, "alice").await, Decimal::from(5));

    let (status, body) = send(
        &app,
        post(&format!("/v1/escrows/{}/approve/receiver", escrow.id), Some("bob"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_SETTLED");
}

#[tokio::test]
async fn mint_disabled_by_default() {
    let app = app(AppState::from_settings(settings(false)).unwrap());
    let (status, body) = send(
        &app,
        post("/v1/ledger/mint", None, json!({ "party": "alice", "amount": "5" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "MINT_DISABLED");
}

#[tokio::test]
async fn delist_removes_registry_entry_only() {
    let app = app(test_state());
    mint(&app, "alice", "5").await;
    let escrow = create(&app, "alice", "bob", "5").await;

    let (status, body) = send(&app, get("/contracts/bob")).await;
    assert_eq!(status, StatusCode::OK);
    let list: ContractList = serde_json::from_value(body).unwrap();
    assert_eq!(list.contracts.len(), 1);

    let uri = format!("/v1/escrows/{}/delist", escrow.id);
    let (status, _) = send(&app, post(&uri, Some("mallory"), json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, post(&uri, Some("bob"), json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get("/contracts/bob")).await;
    assert_eq!(body["contracts"], json!([]));

    let (_, body) = send(&app, get(&format!("/v1/escrows/{}", escrow.id))).await;
    let snapshot: AccountSnapshot = serde_json::from_value(body).unwrap();
    assert_eq!(snapshot.state, EscrowState::Created);
}

#[tokio::test]
async fn registry_wire_format() {
    let app = app(test_state());
    let id = AccountId::new();

    let (status, body) = send(
        &app,
        post(
            "/register-contract",
            Some("0xaaa"),
            json!({
                "contractAddress": id.to_string(),
                "aliasName": "Bike",
                "description": "Road bike",
                "senderAddress": "0xAAA",
                "receiverAddress": "0xBBB",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let response: RegisterContractResponse = serde_json::from_value(body).unwrap();
    assert_eq!(response.link, format!("http://127.0.0.1:8787/contract/{}", id));

    let (status, body) = send(&app, get(&format!("/contract/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["aliasName"], "Bike");
    assert_eq!(body["senderAddress"], "0xaaa");

    let (_, body) = send(&app, get("/contracts/0xBBB")).await;
    assert_eq!(body["contracts"][0]["contractAddress"], id.to_string());

    let (status, body) = send(
        &app,
        post("/remove-contract", Some("0xBBB"), json!({ "contractAddress": id.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], true);

    let (status, _) = send(
        &app,
        post("/register-contract", Some("0xaaa"), json!({ "aliasName": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn http_registry_against_live_server() {
    let state = test_state();
    let served = state.registry.clone();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(state);
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service()).await.unwrap();
    });

    let client = HttpRegistry::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap();
    let entry = RegistryEntry {
        contract_address: AccountId::new(),
        alias_name: "Desk".to_string(),
        description: "Standing desk".to_string(),
        sender_address: PartyId::parse("carol").unwrap(),
        receiver_address: PartyId::parse("dave").unwrap(),
    };
    let id = entry.contract_address;

    let link = client.register_with_link(&entry).await.unwrap();
    assert!(link.ends_with(&id.to_string()));
    assert_eq!(client.lookup(id).await.unwrap(), Some(entry));
    assert!(served.lookup(id).await.is_some());

    let carol = PartyId::parse("carol").unwrap();
    client.deregister(id, &carol).await.unwrap();
    assert_eq!(client.lookup(id).await.unwrap(), None);
    assert!(served.is_empty().await);

    let sync: Arc<dyn RegistrySync> = Arc::new(client);
    sync.deregister(id, &carol).await.unwrap();
}

#[tokio::test]
async fn registry_writes_require_a_party() {
    let app = app(test_state());
    mint(&app, "alice", "5").await;
    let escrow = create(&app, "alice", "bob", "5").await;
    let remove = json!({ "contractAddress": escrow.id.to_string() });

    let (status, _) = send(&app, post("/remove-contract", None, remove.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, post("/remove-contract", Some("mallory"), remove.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // Overwriting a live escrow's entry with other parties is refused
    let forged = json!({
        "contractAddress": escrow.id.to_string(),
        "aliasName": "Free money",
        "description": "",
        "senderAddress": "mallory",
        "receiverAddress": "bob",
    });
    let (status, _) = send(&app, post("/register-contract", Some("mallory"), forged.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, post("/register-contract", Some("bob"), forged)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, get(&format!("/contract/{}", escrow.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["aliasName"], "Laptop");
    assert_eq!(body["senderAddress"], "alice");

    // Entries not held by this node are guarded by their recorded parties
    let external = AccountId::new();
    let entry = json!({
        "contractAddress": external.to_string(),
        "aliasName": "Bike",
        "description": "",
        "senderAddress": "carol",
        "receiverAddress": "dave",
    });
    let (status, _) = send(&app, post("/register-contract", Some("carol"), entry)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        post("/remove-contract", Some("mallory"), json!({ "contractAddress": external.to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, post("/remove-contract", Some("bob"), remove)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], true);
}
