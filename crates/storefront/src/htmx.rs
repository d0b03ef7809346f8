//! HTMX response triggers.
//!
//! Handlers tell the page what happened through the `HX-Trigger` response
//! header: `cart-updated` makes the badge and preview re-fetch, and `toast`
//! shows a transient notification.

use std::convert::Infallible;

use axum::http::HeaderValue;
use axum::response::{IntoResponseParts, ResponseParts};
use serde::Serialize;
use serde_json::{Map, Value};

/// Response header HTMX reads client-side events from.
pub const HX_TRIGGER: &str = "HX-Trigger";

/// Event fired after every persisted cart change.
pub const CART_UPDATED: &str = "cart-updated";

/// Event carrying a [`Toast`].
pub const TOAST: &str = "toast";

/// Severity of a toast notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Info,
    Error,
}

/// A transient notification shown by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

/// Events to fire on the client, rendered as a JSON `HX-Trigger` header.
///
/// # Example
///
/// ```rust,ignore
/// (Triggers::new().cart_updated(), CartCountTemplate { count })
/// ```
#[derive(Debug, Clone, Default)]
pub struct Triggers {
    events: Map<String, Value>,
}

impl Triggers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `cart-updated`.
    #[must_use]
    pub fn cart_updated(mut self) -> Self {
        self.events.insert(CART_UPDATED.to_string(), Value::Null);
        self
    }

    /// Fire `toast` with a message.
    #[must_use]
    pub fn toast(mut self, level: ToastLevel, message: impl Into<String>) -> Self {
        let toast = Toast {
            level,
            message: message.into(),
        };
        let value = serde_json::to_value(toast).unwrap_or(Value::Null);
        self.events.insert(TOAST.to_string(), value);
        self
    }

    /// Shorthand for an error toast.
    #[must_use]
    pub fn error(self, message: impl Into<String>) -> Self {
        self.toast(ToastLevel::Error, message)
    }

    /// Shorthand for a success toast.
    #[must_use]
    pub fn success(self, message: impl Into<String>) -> Self {
        self.toast(ToastLevel::Success, message)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The header value: JSON with every non-ASCII character escaped, since
    /// browsers decode header bytes as Latin-1.
    #[must_use]
    pub fn header_value(&self) -> String {
        ascii_json(&Value::Object(self.events.clone()))
    }
}

impl IntoResponseParts for Triggers {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if self.is_empty() {
            return Ok(res);
        }
        if let Ok(value) = HeaderValue::from_str(&self.header_value()) {
            res.headers_mut().insert(HX_TRIGGER, value);
        }
        Ok(res)
    }
}

/// Serialize `value` with `\uXXXX` escapes for everything outside ASCII.
fn ascii_json(value: &Value) -> String {
    let json = value.to_string();
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    #[test]
    fn test_cart_updated_and_toast_in_one_header() {
        let triggers = Triggers::new().cart_updated().success("Added to cart");
        let parsed: Value = serde_json::from_str(&triggers.header_value()).unwrap();
        assert!(parsed.get(CART_UPDATED).unwrap().is_null());
        assert_eq!(parsed["toast"]["level"], "success");
        assert_eq!(parsed["toast"]["message"], "Added to cart");
    }

    #[test]
    fn test_non_ascii_is_escaped() {
        let triggers = Triggers::new().error("Số dư không đủ 🔋");
        let header = triggers.header_value();
        assert!(header.is_ascii());
        let parsed: Value = serde_json::from_str(&header).unwrap();
        assert_eq!(parsed["toast"]["message"], "Số dư không đủ 🔋");
    }

    #[test]
    fn test_empty_triggers_add_no_header() {
        let response = (Triggers::new(), "ok").into_response();
        assert!(response.headers().get(HX_TRIGGER).is_none());

        let response = (Triggers::new().cart_updated(), "ok").into_response();
        assert_eq!(
            response.headers().get(HX_TRIGGER).unwrap(),
            r#"{"cart-updated":null}"#
        );
    }
}
