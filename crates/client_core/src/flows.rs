use std::{
    collections::HashSet,
    sync::{Arc, PoisonError},
    time::Duration,
};

use shared::domain::Session;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    config::ClientSettings,
    gateway::{ApiGateway, GatewayInitError, RequestOutcome, Route},
    session::{FileSlots, MemorySlots, SessionStore, SlotStorage},
    surface::{InputField, ViewSurface},
    view::{DismissalTicket, FormScope, ViewController, ViewError, ViewState},
};

pub const REGISTER_SUCCESS_MESSAGE: &str = "Registration successful! Please login.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    Login,
    Register,
    Balance,
    SendMoney,
    Logout,
}

/// Kinds of flow currently awaiting a response. A second invocation of the
/// same kind is dropped until the first settles.
#[derive(Debug, Default)]
struct InFlight {
    kinds: std::sync::Mutex<HashSet<FlowKind>>,
}

impl InFlight {
    fn begin(&self, kind: FlowKind) -> Option<FlightGuard<'_>> {
        let mut kinds = self.kinds.lock().unwrap_or_else(PoisonError::into_inner);
        if !kinds.insert(kind) {
            debug!("flow: {kind:?} already in flight, ignoring");
            return None;
        }
        Some(FlightGuard { owner: self, kind })
    }
}

struct FlightGuard<'a> {
    owner: &'a InFlight,
    kind: FlowKind,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.owner
            .kinds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.kind);
    }
}

struct AppState<V> {
    session: SessionStore,
    view: ViewController,
    surface: V,
}

pub struct WalletApp<V: ViewSurface + 'static> {
    gateway: ApiGateway,
    dismiss_delay: Duration,
    in_flight: InFlight,
    inner: Mutex<AppState<V>>,
}

impl<V: ViewSurface + 'static> WalletApp<V> {
    /// Loads any persisted session and renders the initial view for it.
    pub fn new(
        gateway: ApiGateway,
        mut session: SessionStore,
        mut surface: V,
        dismiss_delay: Duration,
    ) -> Arc<Self> {
        session.load();
        let mut view = ViewController::new();
        view.initialize(session.current(), &mut surface);
        info!("flow: started in {}", view.state());
        Arc::new(Self {
            gateway,
            dismiss_delay,
            in_flight: InFlight::default(),
            inner: Mutex::new(AppState {
                session,
                view,
                surface,
            }),
        })
    }

    pub fn from_settings(
        settings: &ClientSettings,
        surface: V,
    ) -> Result<Arc<Self>, GatewayInitError> {
        let gateway = ApiGateway::from_settings(settings)?;
        let slots: Box<dyn SlotStorage> = match &settings.session_file {
            Some(path) => Box::new(FileSlots::new(path)),
            None => Box::new(MemorySlots::new()),
        };
        Ok(Self::new(
            gateway,
            SessionStore::new(slots),
            surface,
            settings.banner_dismiss_delay(),
        ))
    }

    pub async fn view_state(&self) -> ViewState {
        self.inner.lock().await.view.state()
    }

    pub async fn session(&self) -> Option<Session> {
        self.inner.lock().await.session.current().cloned()
    }

    /// Runs `f` against the surface under the app lock, e.g. to fill inputs or render.
    pub async fn with_surface<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        let mut guard = self.inner.lock().await;
        f(&mut guard.surface)
    }

    pub async fn show_login(&self) -> Result<(), ViewError> {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        state.view.show_login(&mut state.surface)
    }

    pub async fn show_register(&self) -> Result<(), ViewError> {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        state.view.show_register(&mut state.surface)
    }

    pub async fn show_send_money(&self) -> Result<(), ViewError> {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        state.view.show_send_money(&mut state.surface)
    }

    pub async fn hide_send_money(&self) -> Result<(), ViewError> {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        state.view.hide_send_money(&mut state.surface)
    }

    pub async fn login(self: &Arc<Self>) {
        let Some(_flight) = self.in_flight.begin(FlowKind::Login) else {
            return;
        };
        let (email, password) = {
            let guard = self.inner.lock().await;
            (
                guard.surface.read_input(InputField::LoginEmail),
                guard.surface.read_input(InputField::LoginPassword),
            )
        };

        let outcome = self.gateway.login(&email, &password).await;

        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        match outcome {
            RequestOutcome::Success(body) => {
                let session = body.into_session();
                if let Err(err) =
                    state
                        .session
                        .set(session.token, session.customer_id, session.name)
                {
                    warn!("flow: login succeeded but session could not be stored: {err}");
                    state.view.show_error(
                        FormScope::Login,
                        "Unable to save session. Please try again.",
                        &mut state.surface,
                    );
                    return;
                }
                state.view.clear_banners(FormScope::Login, &mut state.surface);
                state
                    .view
                    .show_dashboard(state.session.current(), &mut state.surface);
                info!("flow: login ok");
            }
            failure => {
                let message = failure_text(&failure, Route::Login);
                info!("flow: login failed: {message}");
                state
                    .view
                    .show_error(FormScope::Login, &message, &mut state.surface);
            }
        }
    }

    pub async fn register(self: &Arc<Self>) {
        let Some(_flight) = self.in_flight.begin(FlowKind::Register) else {
            return;
        };
        let (name, email, password) = {
            let guard = self.inner.lock().await;
            (
                guard.surface.read_input(InputField::RegisterName),
                guard.surface.read_input(InputField::RegisterEmail),
                guard.surface.read_input(InputField::RegisterPassword),
            )
        };

        let outcome = self.gateway.register(&name, &email, &password).await;

        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        match outcome {
            RequestOutcome::Success(_) => {
                state.view.show_success(
                    FormScope::Register,
                    REGISTER_SUCCESS_MESSAGE,
                    &mut state.surface,
                );
                for field in [
                    InputField::RegisterName,
                    InputField::RegisterEmail,
                    InputField::RegisterPassword,
                ] {
                    state.surface.clear_input(field);
                }
                let ticket = state.view.dismissal_ticket();
                drop(guard);
                info!("flow: registration ok");
                self.schedule_dismissal(ticket, FormScope::Register);
            }
            failure => {
                let message = failure_text(&failure, Route::Register);
                info!("flow: registration failed: {message}");
                state
                    .view
                    .show_error(FormScope::Register, &message, &mut state.surface);
            }
        }
    }

    pub async fn check_balance(self: &Arc<Self>) {
        let Some(_flight) = self.in_flight.begin(FlowKind::Balance) else {
            return;
        };
        let session = self.session().await;

        let outcome = self.gateway.balance(session.as_ref()).await;

        match outcome {
            RequestOutcome::Success(body) => {
                let mut guard = self.inner.lock().await;
                let state = &mut *guard;
                if let Err(err) = state.view.show_balance(&body.snapshot(), &mut state.surface) {
                    debug!("flow: balance response dropped: {err}");
                }
            }
            RequestOutcome::AuthError(message) => {
                info!("flow: balance check unauthorized, logging out");
                let message =
                    message.unwrap_or_else(|| Route::Balance.fallback_message().to_string());
                self.inner.lock().await.surface.alert(&message);
                self.logout().await;
            }
            failure => {
                let message = failure_text(&failure, Route::Balance);
                self.inner.lock().await.surface.alert(&message);
            }
        }
    }

    pub async fn send_money(self: &Arc<Self>) {
        let Some(_flight) = self.in_flight.begin(FlowKind::SendMoney) else {
            return;
        };
        let (session, recipient, amount) = {
            let guard = self.inner.lock().await;
            (
                guard.session.current().cloned(),
                guard.surface.read_input(InputField::RecipientId),
                guard.surface.read_input(InputField::SendAmount),
            )
        };

        let outcome = self
            .gateway
            .send_money(&recipient, &amount, session.as_ref())
            .await;

        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        match outcome {
            RequestOutcome::Success(body) => {
                state
                    .view
                    .show_success(FormScope::Send, &body.message, &mut state.surface);
                state.surface.clear_input(InputField::RecipientId);
                state.surface.clear_input(InputField::SendAmount);
                let ticket = state.view.dismissal_ticket();
                drop(guard);
                info!("flow: transfer ok");
                self.schedule_dismissal(ticket, FormScope::Send);
            }
            RequestOutcome::AuthError(_) => {
                info!("flow: transfer unauthorized, returning to sign-in");
                clear_session(&mut state.session);
                state.view.show_auth(&mut state.surface);
            }
            failure => {
                let message = failure_text(&failure, Route::Send);
                info!("flow: transfer failed: {message}");
                state
                    .view
                    .show_error(FormScope::Send, &message, &mut state.surface);
            }
        }
    }

    /// Best-effort server logout; local state is always cleared.
    pub async fn logout(self: &Arc<Self>) {
        let Some(_flight) = self.in_flight.begin(FlowKind::Logout) else {
            return;
        };
        let session = self.session().await;

        if let Some(session) = &session {
            match self.gateway.logout(Some(session)).await {
                RequestOutcome::Success(()) => debug!("flow: server logout acknowledged"),
                other => warn!("flow: server logout failed ({other:?}), clearing locally"),
            }
        }

        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        clear_session(&mut state.session);
        state.view.show_auth(&mut state.surface);
        info!("flow: logged out");
    }

    /// Fires once after the dismiss delay; a no-op if the view moved on.
    fn schedule_dismissal(self: &Arc<Self>, ticket: DismissalTicket, scope: FormScope) {
        let app = Arc::clone(self);
        let delay = self.dismiss_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut guard = app.inner.lock().await;
            let state = &mut *guard;
            if !state.view.ticket_is_current(&ticket) {
                debug!("flow: stale {scope:?} dismissal skipped");
                return;
            }
            state.view.hide_success(scope, &mut state.surface);
            let result = match scope {
                FormScope::Register => state.view.show_login(&mut state.surface),
                FormScope::Send => state.view.hide_send_money(&mut state.surface),
                FormScope::Login => Ok(()),
            };
            if let Err(err) = result {
                debug!("flow: {scope:?} dismissal transition skipped: {err}");
            }
        });
    }
}

/// The view signs out either way; a persisted session left behind would come
/// back on the next start.
fn clear_session(session: &mut SessionStore) {
    if let Err(err) = session.clear() {
        error!("flow: stored session could not be removed: {err}");
    }
}

fn failure_text<T>(outcome: &RequestOutcome<T>, route: Route) -> String {
    outcome
        .failure_message()
        .unwrap_or(route.fallback_message())
        .to_string()
}

#[cfg(test)]
#[path = "tests/flows_tests.rs"]
mod tests;
