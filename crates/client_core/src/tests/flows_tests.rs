use super::*;
use crate::{
    mock_server::{unreachable_base_url, MockBank},
    session::{CUSTOMER_ID_SLOT, NAME_SLOT, TOKEN_SLOT},
    surface::{Element, MemorySurface},
    view::DashboardPanel,
    NETWORK_ERROR_MESSAGE,
};
use serde_json::json;
use shared::domain::CustomerId;
use url::Url;

const DISMISS_DELAY: Duration = Duration::from_millis(100);
const PAST_DISMISS: Duration = Duration::from_millis(400);

fn app_for(base_url: &str, session: SessionStore) -> Arc<WalletApp<MemorySurface>> {
    let base = Url::parse(base_url).expect("base url");
    let gateway = ApiGateway::new(base, Duration::from_secs(5)).expect("gateway");
    WalletApp::new(gateway, session, MemorySurface::new(), DISMISS_DELAY)
}

fn signed_in_store() -> SessionStore {
    SessionStore::new(Box::new(MemorySlots::with_entries([
        (TOKEN_SLOT, "T"),
        (CUSTOMER_ID_SLOT, "7"),
        (NAME_SLOT, "Ann"),
    ])))
}

async fn fill(app: &WalletApp<MemorySurface>, entries: &[(InputField, &str)]) {
    app.with_surface(|surface| {
        for (field, value) in entries {
            surface.fill(*field, *value);
        }
    })
    .await;
}

async fn visible(app: &WalletApp<MemorySurface>, element: Element) -> bool {
    app.with_surface(|surface| surface.is_visible(element)).await
}

async fn text(app: &WalletApp<MemorySurface>, element: Element) -> Option<String> {
    app.with_surface(|surface| surface.text(element).map(str::to_string))
        .await
}

async fn input(app: &WalletApp<MemorySurface>, field: InputField) -> String {
    app.with_surface(|surface| surface.input(field).to_string())
        .await
}

#[tokio::test]
async fn starts_on_login_without_session_and_dashboard_with_one() {
    let bank = MockBank::spawn().await;

    let app = app_for(&bank.base_url, SessionStore::in_memory());
    assert_eq!(app.view_state().await, ViewState::AuthLogin);
    assert!(visible(&app, Element::AuthContainer).await);

    let app = app_for(&bank.base_url, signed_in_store());
    assert_eq!(
        app.view_state().await,
        ViewState::Dashboard(DashboardPanel::Idle)
    );
    assert_eq!(text(&app, Element::UserName).await.as_deref(), Some("Ann"));
}

#[tokio::test]
async fn login_success_stores_session_and_shows_dashboard() {
    let bank = MockBank::spawn().await;
    bank.respond(
        "/login",
        200,
        json!({ "token": "T", "customer_id": 7, "name": "Ann" }),
    )
    .await;
    let app = app_for(&bank.base_url, SessionStore::in_memory());
    fill(
        &app,
        &[
            (InputField::LoginEmail, "a@b.com"),
            (InputField::LoginPassword, "x"),
        ],
    )
    .await;

    app.login().await;

    assert_eq!(
        app.session().await,
        Some(Session {
            token: "T".into(),
            customer_id: CustomerId(7),
            name: "Ann".into(),
        })
    );
    assert_eq!(
        app.view_state().await,
        ViewState::Dashboard(DashboardPanel::Idle)
    );
    assert_eq!(
        text(&app, Element::DashboardName).await.as_deref(),
        Some("Ann")
    );
    assert!(!visible(&app, Element::AuthContainer).await);
    assert!(visible(&app, Element::NavUser).await);
}

#[tokio::test]
async fn login_rejection_shows_banner_and_keeps_state() {
    let bank = MockBank::spawn().await;
    bank.respond("/login", 401, json!({ "error": "Invalid credentials" }))
        .await;
    let app = app_for(&bank.base_url, SessionStore::in_memory());

    app.login().await;

    assert!(app.session().await.is_none());
    assert_eq!(app.view_state().await, ViewState::AuthLogin);
    assert!(visible(&app, Element::LoginError).await);
    assert_eq!(
        text(&app, Element::LoginError).await.as_deref(),
        Some("Invalid credentials")
    );
}

#[tokio::test]
async fn login_network_failure_shows_retry_message() {
    let app = app_for(&unreachable_base_url().await, SessionStore::in_memory());

    app.login().await;

    assert_eq!(app.view_state().await, ViewState::AuthLogin);
    assert_eq!(
        text(&app, Element::LoginError).await.as_deref(),
        Some(NETWORK_ERROR_MESSAGE)
    );
}

#[tokio::test]
async fn register_success_clears_form_then_returns_to_login() {
    let bank = MockBank::spawn().await;
    bank.respond(
        "/register",
        201,
        json!({ "message": "User registered successfully" }),
    )
    .await;
    let app = app_for(&bank.base_url, SessionStore::in_memory());
    app.show_register().await.expect("register tab");
    fill(
        &app,
        &[
            (InputField::RegisterName, "Ann"),
            (InputField::RegisterEmail, "a@b.com"),
            (InputField::RegisterPassword, "x"),
        ],
    )
    .await;

    app.register().await;

    assert!(visible(&app, Element::RegisterSuccess).await);
    assert!(!visible(&app, Element::RegisterError).await);
    assert_eq!(
        text(&app, Element::RegisterSuccess).await.as_deref(),
        Some(REGISTER_SUCCESS_MESSAGE)
    );
    assert_eq!(input(&app, InputField::RegisterEmail).await, "");
    assert_eq!(app.view_state().await, ViewState::AuthRegister);

    let requests = bank.requests_to("/register").await;
    assert_eq!(
        requests[0].body,
        Some(json!({ "name": "Ann", "email": "a@b.com", "password": "x" }))
    );

    tokio::time::sleep(PAST_DISMISS).await;
    assert_eq!(app.view_state().await, ViewState::AuthLogin);
    assert!(!visible(&app, Element::RegisterSuccess).await);
}

#[tokio::test]
async fn register_dismissal_is_a_no_op_after_manual_navigation() {
    let bank = MockBank::spawn().await;
    bank.respond("/register", 201, json!({})).await;
    let app = app_for(&bank.base_url, SessionStore::in_memory());
    app.show_register().await.expect("register tab");

    app.register().await;
    app.show_login().await.expect("login tab");
    app.show_register().await.expect("register tab again");

    tokio::time::sleep(PAST_DISMISS).await;
    assert_eq!(app.view_state().await, ViewState::AuthRegister);
}

#[tokio::test]
async fn register_failure_shows_error_only() {
    let bank = MockBank::spawn().await;
    bank.respond("/register", 409, json!({ "error": "Email already exists" }))
        .await;
    let app = app_for(&bank.base_url, SessionStore::in_memory());
    app.show_register().await.expect("register tab");
    fill(&app, &[(InputField::RegisterEmail, "a@b.com")]).await;

    app.register().await;

    assert_eq!(
        text(&app, Element::RegisterError).await.as_deref(),
        Some("Email already exists")
    );
    assert!(!visible(&app, Element::RegisterSuccess).await);
    assert_eq!(input(&app, InputField::RegisterEmail).await, "a@b.com");
}

#[tokio::test]
async fn register_network_failure_shows_retry_message() {
    let app = app_for(&unreachable_base_url().await, SessionStore::in_memory());
    app.show_register().await.expect("register tab");
    fill(&app, &[(InputField::RegisterEmail, "a@b.com")]).await;

    app.register().await;

    assert!(visible(&app, Element::RegisterError).await);
    assert_eq!(
        text(&app, Element::RegisterError).await.as_deref(),
        Some(NETWORK_ERROR_MESSAGE)
    );
    assert!(!visible(&app, Element::RegisterSuccess).await);
    assert_eq!(input(&app, InputField::RegisterEmail).await, "a@b.com");
    assert_eq!(app.view_state().await, ViewState::AuthRegister);
}

#[tokio::test]
async fn balance_success_shows_two_decimal_amount() {
    let bank = MockBank::spawn().await;
    bank.respond("/balance", 200, json!({ "balance": 12.5, "customer_id": 7 }))
        .await;
    let app = app_for(&bank.base_url, signed_in_store());
    app.show_send_money().await.expect("open form");

    app.check_balance().await;
    assert_eq!(
        app.view_state().await,
        ViewState::Dashboard(DashboardPanel::BalanceShown)
    );
    assert!(!visible(&app, Element::SendMoneyForm).await);

    bank.respond("/balance", 200, json!({ "balance": 12.5, "customer_id": 7 }))
        .await;
    app.check_balance().await;
    assert_eq!(
        text(&app, Element::BalanceAmount).await.as_deref(),
        Some("$12.50")
    );
    assert_eq!(text(&app, Element::CustomerId).await.as_deref(), Some("7"));
    assert!(visible(&app, Element::BalanceDisplay).await);
}

#[tokio::test]
async fn balance_unauthorized_logs_out() {
    let bank = MockBank::spawn().await;
    bank.respond("/balance", 401, json!({ "error": "Invalid or expired token" }))
        .await;
    bank.respond("/logout", 200, json!({ "message": "Logged out successfully" }))
        .await;
    let app = app_for(&bank.base_url, signed_in_store());

    app.check_balance().await;

    assert!(app.session().await.is_none());
    assert_eq!(app.view_state().await, ViewState::AuthLogin);
    assert!(!visible(&app, Element::DashboardContainer).await);
    assert_eq!(bank.requests_to("/logout").await.len(), 1);
    let alerts = app
        .with_surface(|surface| surface.alerts().to_vec())
        .await;
    assert_eq!(alerts, vec!["Invalid or expired token".to_string()]);
}

#[tokio::test]
async fn balance_unauthorized_without_message_alerts_fallback() {
    let bank = MockBank::spawn().await;
    bank.respond("/balance", 401, json!({})).await;
    bank.respond("/logout", 200, json!({})).await;
    let app = app_for(&bank.base_url, signed_in_store());

    app.check_balance().await;

    let alerts = app
        .with_surface(|surface| surface.alerts().to_vec())
        .await;
    assert_eq!(alerts, vec!["Failed to fetch balance".to_string()]);
    assert!(app.session().await.is_none());
}

#[tokio::test]
async fn balance_failure_raises_alert_and_keeps_dashboard() {
    let bank = MockBank::spawn().await;
    bank.respond("/balance", 500, json!({})).await;
    let app = app_for(&bank.base_url, signed_in_store());

    app.check_balance().await;

    assert_eq!(
        app.view_state().await,
        ViewState::Dashboard(DashboardPanel::Idle)
    );
    let alerts = app
        .with_surface(|surface| surface.alerts().to_vec())
        .await;
    assert_eq!(alerts, vec!["Failed to fetch balance".to_string()]);
}

#[tokio::test]
async fn send_money_success_clears_inputs_then_closes_form() {
    let bank = MockBank::spawn().await;
    bank.respond("/send", 200, json!({ "message": "Sent", "new_balance": 990.0 }))
        .await;
    let app = app_for(&bank.base_url, signed_in_store());
    app.show_send_money().await.expect("open form");
    fill(
        &app,
        &[
            (InputField::RecipientId, "3"),
            (InputField::SendAmount, "10"),
        ],
    )
    .await;

    app.send_money().await;

    assert_eq!(text(&app, Element::SendSuccess).await.as_deref(), Some("Sent"));
    assert!(visible(&app, Element::SendSuccess).await);
    assert!(!visible(&app, Element::SendError).await);
    assert_eq!(input(&app, InputField::RecipientId).await, "");
    assert_eq!(input(&app, InputField::SendAmount).await, "");
    assert_eq!(
        app.view_state().await,
        ViewState::Dashboard(DashboardPanel::TransferFormOpen)
    );

    tokio::time::sleep(PAST_DISMISS).await;
    assert_eq!(
        app.view_state().await,
        ViewState::Dashboard(DashboardPanel::Idle)
    );
    assert!(!visible(&app, Element::SendMoneyForm).await);
    assert!(!visible(&app, Element::SendSuccess).await);
}

#[tokio::test]
async fn send_dismissal_does_not_close_a_panel_opened_since() {
    let bank = MockBank::spawn().await;
    bank.respond("/send", 200, json!({ "message": "Sent" })).await;
    bank.respond("/balance", 200, json!({ "balance": 5, "customer_id": 7 }))
        .await;
    let app = app_for(&bank.base_url, signed_in_store());
    app.show_send_money().await.expect("open form");
    fill(
        &app,
        &[
            (InputField::RecipientId, "3"),
            (InputField::SendAmount, "10"),
        ],
    )
    .await;

    app.send_money().await;
    app.check_balance().await;

    tokio::time::sleep(PAST_DISMISS).await;
    assert_eq!(
        app.view_state().await,
        ViewState::Dashboard(DashboardPanel::BalanceShown)
    );
    assert_eq!(
        text(&app, Element::BalanceAmount).await.as_deref(),
        Some("$5.00")
    );
}

#[tokio::test]
async fn invalid_transfer_input_never_reaches_the_server() {
    let bank = MockBank::spawn().await;
    let app = app_for(&bank.base_url, signed_in_store());
    app.show_send_money().await.expect("open form");

    for (recipient, amount) in [("abc", "10"), ("3", "0"), ("3", "-2"), ("", "")] {
        fill(
            &app,
            &[
                (InputField::RecipientId, recipient),
                (InputField::SendAmount, amount),
            ],
        )
        .await;
        app.send_money().await;
        assert!(visible(&app, Element::SendError).await, "{recipient:?}/{amount:?}");
        assert!(!visible(&app, Element::SendSuccess).await);
    }

    assert!(bank.requests().await.is_empty());
    assert_eq!(
        app.view_state().await,
        ViewState::Dashboard(DashboardPanel::TransferFormOpen)
    );
}

#[tokio::test]
async fn send_server_rejection_keeps_form_open() {
    let bank = MockBank::spawn().await;
    bank.respond("/send", 400, json!({ "error": "Insufficient balance" }))
        .await;
    let app = app_for(&bank.base_url, signed_in_store());
    app.show_send_money().await.expect("open form");
    fill(
        &app,
        &[
            (InputField::RecipientId, "3"),
            (InputField::SendAmount, "5000"),
        ],
    )
    .await;

    app.send_money().await;

    assert_eq!(
        text(&app, Element::SendError).await.as_deref(),
        Some("Insufficient balance")
    );
    assert_eq!(input(&app, InputField::SendAmount).await, "5000");
    assert_eq!(
        app.view_state().await,
        ViewState::Dashboard(DashboardPanel::TransferFormOpen)
    );
}

#[tokio::test]
async fn send_unauthorized_clears_session_without_logout_call() {
    let bank = MockBank::spawn().await;
    bank.respond("/send", 401, json!({ "error": "Invalid or expired token" }))
        .await;
    let app = app_for(&bank.base_url, signed_in_store());
    app.show_send_money().await.expect("open form");
    fill(
        &app,
        &[
            (InputField::RecipientId, "3"),
            (InputField::SendAmount, "10"),
        ],
    )
    .await;

    app.send_money().await;

    assert!(app.session().await.is_none());
    assert_eq!(app.view_state().await, ViewState::AuthLogin);
    assert!(!visible(&app, Element::SendMoneyForm).await);
    assert!(bank.requests_to("/logout").await.is_empty());
}

#[tokio::test]
async fn send_network_failure_keeps_form_and_inputs() {
    let app = app_for(&unreachable_base_url().await, signed_in_store());
    app.show_send_money().await.expect("open form");
    fill(
        &app,
        &[
            (InputField::RecipientId, "3"),
            (InputField::SendAmount, "10"),
        ],
    )
    .await;

    app.send_money().await;

    assert_eq!(
        text(&app, Element::SendError).await.as_deref(),
        Some(NETWORK_ERROR_MESSAGE)
    );
    assert!(!visible(&app, Element::SendSuccess).await);
    assert_eq!(
        app.view_state().await,
        ViewState::Dashboard(DashboardPanel::TransferFormOpen)
    );
    assert_eq!(input(&app, InputField::RecipientId).await, "3");
    assert_eq!(input(&app, InputField::SendAmount).await, "10");
    assert!(app.session().await.is_some());
}

#[tokio::test]
async fn second_send_while_first_in_flight_sends_nothing() {
    let bank = MockBank::spawn().await;
    bank.respond_slowly(
        "/send",
        200,
        json!({ "message": "Transfer successful", "new_balance": 90.0 }),
        Duration::from_millis(300),
    )
    .await;
    let app = app_for(&bank.base_url, signed_in_store());
    app.show_send_money().await.expect("open form");
    fill(
        &app,
        &[
            (InputField::RecipientId, "3"),
            (InputField::SendAmount, "10"),
        ],
    )
    .await;

    let first = tokio::spawn({
        let app = Arc::clone(&app);
        async move { app.send_money().await }
    });
    while bank.requests_to("/send").await.is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    app.send_money().await;
    first.await.expect("first send");

    assert_eq!(bank.requests_to("/send").await.len(), 1);
    assert_eq!(
        text(&app, Element::SendSuccess).await.as_deref(),
        Some("Transfer successful")
    );
}

#[tokio::test]
async fn logout_stays_signed_out_after_restart_when_session_file_is_blocked() {
    let bank = MockBank::spawn().await;
    bank.respond("/logout", 200, json!({})).await;
    let dir = std::env::temp_dir().join(format!(
        "wallet-flows-blocked-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    let path = dir.join("session.json");
    let mut store = SessionStore::new(Box::new(FileSlots::new(&path)));
    store.set("T", CustomerId(7), "Ann").expect("set");
    std::fs::create_dir_all(path.with_extension("json.tmp")).expect("block temp file");
    let app = app_for(&bank.base_url, store);

    app.logout().await;
    assert!(app.session().await.is_none());

    let restarted = app_for(
        &bank.base_url,
        SessionStore::new(Box::new(FileSlots::new(&path))),
    );
    assert!(restarted.session().await.is_none());
    assert_eq!(restarted.view_state().await, ViewState::AuthLogin);

    std::fs::remove_dir_all(&dir).expect("cleanup");
}

#[tokio::test]
async fn logout_clears_locally_even_when_server_unreachable() {
    let app = app_for(&unreachable_base_url().await, signed_in_store());
    app.show_send_money().await.expect("open form");

    app.logout().await;

    assert!(app.session().await.is_none());
    assert_eq!(app.view_state().await, ViewState::AuthLogin);
    assert!(!visible(&app, Element::SendMoneyForm).await);
    assert!(!visible(&app, Element::BalanceDisplay).await);
}

#[tokio::test]
async fn logout_without_session_makes_no_request() {
    let bank = MockBank::spawn().await;
    let app = app_for(&bank.base_url, SessionStore::in_memory());

    app.logout().await;

    assert!(bank.requests().await.is_empty());
    assert_eq!(app.view_state().await, ViewState::AuthLogin);
}

#[tokio::test]
async fn dashboard_navigation_is_rejected_while_signed_out() {
    let bank = MockBank::spawn().await;
    let app = app_for(&bank.base_url, SessionStore::in_memory());

    assert!(app.show_send_money().await.is_err());
    assert!(app.hide_send_money().await.is_err());
    assert_eq!(app.view_state().await, ViewState::AuthLogin);
}

#[test]
fn in_flight_guard_blocks_same_kind_until_dropped() {
    let in_flight = InFlight::default();
    let first = in_flight.begin(FlowKind::SendMoney);
    assert!(first.is_some());
    assert!(in_flight.begin(FlowKind::SendMoney).is_none());
    assert!(in_flight.begin(FlowKind::Balance).is_some());
    drop(first);
    assert!(in_flight.begin(FlowKind::SendMoney).is_some());
}
