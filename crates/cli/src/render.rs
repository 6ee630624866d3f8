//! Terminal output.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fmt::Write;

use bazaar_client::CheckoutRedirect;
use bazaar_client::api::UserProfile;
use bazaar_client::Notice;
use bazaar_core::Cart;

use crate::commands::CommandError;

const TITLE_WIDTH: usize = 32;

pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        println!("{notice}");
    }
}

pub fn print_cart(cart: &Cart) {
    print!("{}", format_cart(cart));
}

pub fn print_checkout(redirect: &CheckoutRedirect) {
    println!("Checkout: {}", redirect.url);
    if let Some(session_id) = &redirect.session_id {
        println!("Session:  {session_id}");
    }
}

pub fn print_profile(profile: &UserProfile) {
    print!("{}", format_profile(profile));
}

pub fn print_error(err: &CommandError) {
    eprintln!("{}", Notice::error(err.to_string()));
}

/// Render the cart as a table with a totals footer.
///
/// Lines served from the local fallback cache are marked with `*`.
pub fn format_cart(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Your cart is empty\n".to_string();
    }

    let id_width = cart
        .items()
        .iter()
        .map(|item| item.id().len())
        .max()
        .unwrap_or(0)
        .max(2);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:<id_width$}  {:<TITLE_WIDTH$}  {:>4}  {:>10}  {:>10}",
        "ID", "PRODUCT", "QTY", "PRICE", "TOTAL"
    );
    for item in cart.items() {
        let marker = if item.source.is_fallback() { '*' } else { ' ' };
        let _ = writeln!(
            out,
            "{marker} {:<id_width$}  {:<TITLE_WIDTH$}  {:>4}  {:>10}  {:>10}",
            item.id(),
            truncate(&item.title, TITLE_WIDTH),
            item.quantity(),
            item.price.to_string(),
            item.line_total().to_string(),
        );
    }
    let _ = writeln!(
        out,
        "\n{} item(s), subtotal {}",
        cart.total_quantity(),
        cart.subtotal()
    );
    if cart.is_fallback() {
        let _ = writeln!(out, "* cached locally, will sync when the server is back");
    }
    out
}

fn format_profile(profile: &UserProfile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:    {}", profile.id);
    let _ = writeln!(out, "Role:  {}", profile.role);
    if let Some(name) = &profile.name {
        let _ = writeln!(out, "Name:  {name}");
    }
    if let Some(email) = &profile.email {
        let _ = writeln!(out, "Email: {email}");
    }
    out
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use bazaar_core::{CartEntryId, CartItem, CartSource, Price, ProductId, UserId, UserRole};
    use rust_decimal::Decimal;

    use super::*;

    fn item(source: CartSource, product_id: &str, title: &str, cents: i64, quantity: u32) -> CartItem {
        let mut item = CartItem::new(source, ProductId::new(product_id), quantity);
        item.title = title.to_string();
        item.price = Price::usd(Decimal::new(cents, 2));
        item
    }

    #[test]
    fn test_empty_cart() {
        assert_eq!(format_cart(&Cart::empty()), "Your cart is empty\n");
    }

    #[test]
    fn test_server_cart_table() {
        let cart = Cart::new(vec![
            item(CartSource::Server(CartEntryId::new("e1")), "p1", "Lamp", 1250, 2),
            item(CartSource::Server(CartEntryId::new("e2")), "p2", "Desk", 9000, 1),
        ]);
        let out = format_cart(&cart);

        assert!(out.contains("e1"));
        assert!(out.contains("Lamp"));
        assert!(out.contains("$25.00"));
        assert!(out.contains("3 item(s), subtotal $115.00"));
        assert!(!out.contains("cached locally"));
    }

    #[test]
    fn test_fallback_lines_are_marked() {
        let cart = Cart::new(vec![item(CartSource::Fallback, "p1", "Lamp", 1250, 1)]);
        let out = format_cart(&cart);

        assert!(out.lines().nth(1).is_some_and(|line| line.starts_with("* p1")));
        assert!(out.contains("cached locally"));
    }

    #[test]
    fn test_long_titles_are_truncated() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long product title", 10), "a very ...");
    }

    #[test]
    fn test_profile() {
        let profile = UserProfile {
            id: UserId::new("u1"),
            role: UserRole::Buyer,
            email: Some("ana@example.com".to_string()),
            name: None,
        };
        assert_eq!(
            format_profile(&profile),
            "ID:    u1\nRole:  buyer\nEmail: ana@example.com\n"
        );
    }
}
