use std::fmt;

use shared::domain::{BalanceSnapshot, Session};
use thiserror::Error;
use tracing::debug;

use crate::surface::{Element, InputField, ViewSurface};

const GREETING_FALLBACK: &str = "User";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardPanel {
    Idle,
    BalanceShown,
    TransferFormOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    AuthLogin,
    AuthRegister,
    Dashboard(DashboardPanel),
}

impl ViewState {
    pub fn is_auth(self) -> bool {
        matches!(self, Self::AuthLogin | Self::AuthRegister)
    }

    pub fn is_dashboard(self) -> bool {
        matches!(self, Self::Dashboard(_))
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AuthLogin => "auth/login",
            Self::AuthRegister => "auth/register",
            Self::Dashboard(DashboardPanel::Idle) => "dashboard/idle",
            Self::Dashboard(DashboardPanel::BalanceShown) => "dashboard/balance",
            Self::Dashboard(DashboardPanel::TransferFormOpen) => "dashboard/transfer",
        };
        f.write_str(label)
    }
}

/// Form scopes that own an error/success banner pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormScope {
    Login,
    Register,
    Send,
}

impl FormScope {
    fn error_banner(self) -> Element {
        match self {
            Self::Login => Element::LoginError,
            Self::Register => Element::RegisterError,
            Self::Send => Element::SendError,
        }
    }

    /// The login form has no success banner.
    fn success_banner(self) -> Option<Element> {
        match self {
            Self::Login => None,
            Self::Register => Some(Element::RegisterSuccess),
            Self::Send => Some(Element::SendSuccess),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("cannot {action} while in {from}")]
    InvalidTransition { from: ViewState, action: &'static str },
}

/// Captured view position for a deferred action; stale once any transition happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DismissalTicket {
    state: ViewState,
    epoch: u64,
}

/// Every transition re-renders all panel visibility, so two exclusive panels
/// are never shown together.
#[derive(Debug)]
pub struct ViewController {
    state: ViewState,
    epoch: u64,
}

impl Default for ViewController {
    fn default() -> Self {
        Self {
            state: ViewState::AuthLogin,
            epoch: 0,
        }
    }
}

impl ViewController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn initialize(&mut self, session: Option<&Session>, surface: &mut dyn ViewSurface) {
        match session {
            Some(session) => self.show_dashboard(Some(session), surface),
            None => self.show_auth(surface),
        }
    }

    pub fn show_login(&mut self, surface: &mut dyn ViewSurface) -> Result<(), ViewError> {
        self.require_auth("show login")?;
        self.transition(ViewState::AuthLogin, surface);
        Ok(())
    }

    pub fn show_register(&mut self, surface: &mut dyn ViewSurface) -> Result<(), ViewError> {
        self.require_auth("show register")?;
        self.transition(ViewState::AuthRegister, surface);
        Ok(())
    }

    pub fn show_dashboard(&mut self, session: Option<&Session>, surface: &mut dyn ViewSurface) {
        let name = session
            .map(|s| s.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(GREETING_FALLBACK);
        surface.set_text(Element::UserName, name);
        surface.set_text(Element::DashboardName, name);
        self.transition(ViewState::Dashboard(DashboardPanel::Idle), surface);
    }

    pub fn show_auth(&mut self, surface: &mut dyn ViewSurface) {
        surface.hide(Element::BalanceDisplay);
        surface.hide(Element::SendMoneyForm);
        self.transition(ViewState::AuthLogin, surface);
    }

    pub fn show_send_money(&mut self, surface: &mut dyn ViewSurface) -> Result<(), ViewError> {
        self.require_dashboard("open the transfer form")?;
        self.clear_banners(FormScope::Send, surface);
        self.transition(
            ViewState::Dashboard(DashboardPanel::TransferFormOpen),
            surface,
        );
        Ok(())
    }

    pub fn hide_send_money(&mut self, surface: &mut dyn ViewSurface) -> Result<(), ViewError> {
        self.require_dashboard("close the transfer form")?;
        surface.clear_input(InputField::RecipientId);
        surface.clear_input(InputField::SendAmount);
        if self.state == ViewState::Dashboard(DashboardPanel::TransferFormOpen) {
            self.transition(ViewState::Dashboard(DashboardPanel::Idle), surface);
        }
        Ok(())
    }

    pub fn show_balance(
        &mut self,
        snapshot: &BalanceSnapshot,
        surface: &mut dyn ViewSurface,
    ) -> Result<(), ViewError> {
        self.require_dashboard("show the balance")?;
        surface.set_text(Element::BalanceAmount, &snapshot.formatted_amount());
        surface.set_text(Element::CustomerId, &snapshot.customer_id.to_string());
        self.transition(ViewState::Dashboard(DashboardPanel::BalanceShown), surface);
        Ok(())
    }

    pub fn show_error(&self, scope: FormScope, message: &str, surface: &mut dyn ViewSurface) {
        let banner = scope.error_banner();
        surface.set_text(banner, message);
        surface.show(banner);
        if let Some(success) = scope.success_banner() {
            surface.hide(success);
        }
    }

    pub fn show_success(&self, scope: FormScope, message: &str, surface: &mut dyn ViewSurface) {
        let Some(banner) = scope.success_banner() else {
            debug!("view: no success banner for {scope:?}");
            return;
        };
        surface.set_text(banner, message);
        surface.show(banner);
        surface.hide(scope.error_banner());
    }

    pub fn hide_success(&self, scope: FormScope, surface: &mut dyn ViewSurface) {
        if let Some(banner) = scope.success_banner() {
            surface.hide(banner);
        }
    }

    pub fn clear_banners(&self, scope: FormScope, surface: &mut dyn ViewSurface) {
        surface.hide(scope.error_banner());
        self.hide_success(scope, surface);
    }

    pub fn dismissal_ticket(&self) -> DismissalTicket {
        DismissalTicket {
            state: self.state,
            epoch: self.epoch,
        }
    }

    pub fn ticket_is_current(&self, ticket: &DismissalTicket) -> bool {
        self.epoch == ticket.epoch && self.state == ticket.state
    }

    fn require_auth(&self, action: &'static str) -> Result<(), ViewError> {
        if self.state.is_auth() {
            Ok(())
        } else {
            Err(ViewError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    fn require_dashboard(&self, action: &'static str) -> Result<(), ViewError> {
        if self.state.is_dashboard() {
            Ok(())
        } else {
            Err(ViewError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    fn transition(&mut self, next: ViewState, surface: &mut dyn ViewSurface) {
        debug!("view: {} -> {}", self.state, next);
        self.state = next;
        self.epoch = self.epoch.wrapping_add(1);
        render_panels(next, surface);
    }
}

fn set_visible(surface: &mut dyn ViewSurface, element: Element, visible: bool) {
    if visible {
        surface.show(element);
    } else {
        surface.hide(element);
    }
}

fn render_panels(state: ViewState, surface: &mut dyn ViewSurface) {
    let dashboard = state.is_dashboard();
    set_visible(surface, Element::AuthContainer, !dashboard);
    set_visible(surface, Element::DashboardContainer, dashboard);
    set_visible(surface, Element::NavUser, dashboard);

    let register = state == ViewState::AuthRegister;
    set_visible(surface, Element::LoginForm, !register);
    set_visible(surface, Element::RegisterForm, register);
    surface.set_active(Element::LoginTab, !register);
    surface.set_active(Element::RegisterTab, register);

    set_visible(
        surface,
        Element::BalanceDisplay,
        state == ViewState::Dashboard(DashboardPanel::BalanceShown),
    );
    set_visible(
        surface,
        Element::SendMoneyForm,
        state == ViewState::Dashboard(DashboardPanel::TransferFormOpen),
    );
}
