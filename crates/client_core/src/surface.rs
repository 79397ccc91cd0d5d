use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use tracing::trace;

macro_rules! element_ids {
    ($enum:ident { $($variant:ident => $id:literal,)+ }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $enum {
            $($variant,)+
        }

        impl $enum {
            #[cfg(test)]
            pub(crate) const ALL: &'static [$enum] = &[$($enum::$variant,)+];

            pub fn id(self) -> &'static str {
                match self {
                    $($enum::$variant => $id,)+
                }
            }
        }

        impl fmt::Display for $enum {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.id())
            }
        }
    };
}

element_ids!(Element {
    AuthContainer => "auth-container",
    DashboardContainer => "dashboard-container",
    NavUser => "nav-user",
    LoginForm => "login-form",
    RegisterForm => "register-form",
    LoginTab => "login-tab",
    RegisterTab => "register-tab",
    UserName => "user-name",
    DashboardName => "dashboard-name",
    BalanceDisplay => "balance-display",
    BalanceAmount => "balance-amount",
    CustomerId => "customer-id",
    SendMoneyForm => "send-money-form",
    LoginError => "login-error",
    RegisterError => "register-error",
    RegisterSuccess => "register-success",
    SendError => "send-error",
    SendSuccess => "send-success",
});

element_ids!(InputField {
    LoginEmail => "login-email",
    LoginPassword => "login-password",
    RegisterName => "register-name",
    RegisterEmail => "register-email",
    RegisterPassword => "register-password",
    RecipientId => "recipient-id",
    SendAmount => "send-amount",
});

pub trait ViewSurface: Send {
    fn read_input(&self, field: InputField) -> String;
    fn clear_input(&mut self, field: InputField);
    fn set_text(&mut self, element: Element, text: &str);
    fn show(&mut self, element: Element);
    fn hide(&mut self, element: Element);
    /// Toggles the active styling class on a tab-like element.
    fn set_active(&mut self, element: Element, active: bool);
    fn alert(&mut self, message: &str);
}

/// Keeps surface state in maps. Every element starts hidden.
#[derive(Debug, Default, Clone)]
pub struct MemorySurface {
    visible: HashSet<Element>,
    active: HashSet<Element>,
    texts: HashMap<Element, String>,
    inputs: HashMap<InputField, String>,
    alerts: Vec<String>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill(&mut self, field: InputField, value: impl Into<String>) {
        self.inputs.insert(field, value.into());
    }

    pub fn is_visible(&self, element: Element) -> bool {
        self.visible.contains(&element)
    }

    pub fn is_active(&self, element: Element) -> bool {
        self.active.contains(&element)
    }

    pub fn text(&self, element: Element) -> Option<&str> {
        self.texts.get(&element).map(String::as_str)
    }

    pub fn input(&self, field: InputField) -> &str {
        self.inputs.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }
}

impl ViewSurface for MemorySurface {
    fn read_input(&self, field: InputField) -> String {
        self.input(field).to_string()
    }

    fn clear_input(&mut self, field: InputField) {
        trace!("surface: clear {field}");
        self.inputs.remove(&field);
    }

    fn set_text(&mut self, element: Element, text: &str) {
        self.texts.insert(element, text.to_string());
    }

    fn show(&mut self, element: Element) {
        if self.visible.insert(element) {
            trace!("surface: show {element}");
        }
    }

    fn hide(&mut self, element: Element) {
        if self.visible.remove(&element) {
            trace!("surface: hide {element}");
        }
    }

    fn set_active(&mut self, element: Element, active: bool) {
        if active {
            self.active.insert(element);
        } else {
            self.active.remove(&element);
        }
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}
