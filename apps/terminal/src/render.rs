use std::fmt::Write as _;

use client_core::{Element, InputField, MemorySurface};

fn banner(out: &mut String, surface: &MemorySurface, element: Element, label: &str) {
    if surface.is_visible(element) {
        let text = surface.text(element).unwrap_or_default();
        let _ = writeln!(out, "  [{label}] {text}");
    }
}

fn tab(surface: &MemorySurface, element: Element, label: &str) -> String {
    if surface.is_active(element) {
        format!("*{label}*")
    } else {
        label.to_string()
    }
}

pub fn render(surface: &MemorySurface) -> String {
    let mut out = String::new();

    if surface.is_visible(Element::AuthContainer) {
        let _ = writeln!(
            out,
            "== {} | {} ==",
            tab(surface, Element::LoginTab, "login"),
            tab(surface, Element::RegisterTab, "register")
        );
        if surface.is_visible(Element::LoginForm) {
            banner(&mut out, surface, Element::LoginError, "error");
        }
        if surface.is_visible(Element::RegisterForm) {
            banner(&mut out, surface, Element::RegisterError, "error");
            banner(&mut out, surface, Element::RegisterSuccess, "ok");
        }
    }

    if surface.is_visible(Element::DashboardContainer) {
        let name = surface.text(Element::DashboardName).unwrap_or("User");
        let _ = writeln!(out, "== dashboard: welcome, {name} ==");
        if surface.is_visible(Element::BalanceDisplay) {
            let _ = writeln!(
                out,
                "  balance {} (customer {})",
                surface.text(Element::BalanceAmount).unwrap_or_default(),
                surface.text(Element::CustomerId).unwrap_or_default()
            );
        }
        if surface.is_visible(Element::SendMoneyForm) {
            let _ = writeln!(
                out,
                "  send money: recipient='{}' amount='{}'",
                surface.input(InputField::RecipientId),
                surface.input(InputField::SendAmount)
            );
        }
        banner(&mut out, surface, Element::SendError, "error");
        banner(&mut out, surface, Element::SendSuccess, "ok");
    }

    for alert in surface.alerts() {
        let _ = writeln!(out, "  (!) {alert}");
    }
    out
}
