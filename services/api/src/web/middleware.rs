//! services/api/src/web/middleware.rs
//!
//! Role gate for the staff-only routes.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::warn;

/// Role header, set by the upstream auth proxy or the signed-in web client.
pub const ROLE_HEADER: &str = "x-user-role";

/// Roles allowed past `require_staff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "staff" => Some(Role::Staff),
            _ => None,
        }
    }
}

/// Middleware that admits only admin and staff callers.
///
/// If allowed, inserts the `Role` into request extensions for handlers to use.
/// A missing or unknown role returns 403 Forbidden.
pub async fn require_staff(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let role = req
        .headers()
        .get(ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(Role::parse)
        .ok_or_else(|| {
            warn!("Rejected {} {}: missing staff role", req.method(), req.uri().path());
            StatusCode::FORBIDDEN
        })?;

    req.extensions_mut().insert(role);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admin_and_staff_are_recognised() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse(" Staff "), Some(Role::Staff));
        assert_eq!(Role::parse("student"), None);
        assert_eq!(Role::parse(""), None);
    }
}
