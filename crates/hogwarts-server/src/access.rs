//! Request authorization.
//!
//! An ordered rule list decides what each request needs. The first rule whose
//! method and path pattern match wins; requests no rule matches fall back to
//! [`Access::Authenticated`]. Paths are matched relative to the API base URL.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use hogwarts_auth::VerifiedToken;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Role(&'static str),
}

#[derive(Debug, Clone)]
pub struct AccessRule {
    pub method: Method,
    /// Exact path, or a prefix followed by `/**`.
    pub pattern: &'static str,
    pub access: Access,
}

impl AccessRule {
    fn new(method: Method, pattern: &'static str, access: Access) -> Self {
        Self {
            method,
            pattern,
            access,
        }
    }

    /// HEAD is served by the GET handlers, so it matches GET rules.
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        let method_matches = self.method == *method
            || (self.method == Method::GET && *method == Method::HEAD);
        method_matches && path_matches(self.pattern, path)
    }
}

/// Role required for user management.
pub const ADMIN: &str = "admin";

pub fn default_rules() -> Vec<AccessRule> {
    vec![
        AccessRule::new(Method::POST, "/users/login", Access::Public),
        AccessRule::new(Method::GET, "/artifacts/**", Access::Public),
        AccessRule::new(Method::GET, "/users/**", Access::Role(ADMIN)),
        AccessRule::new(Method::POST, "/users", Access::Role(ADMIN)),
        AccessRule::new(Method::PUT, "/users/**", Access::Role(ADMIN)),
        AccessRule::new(Method::DELETE, "/users/**", Access::Role(ADMIN)),
    ]
}

/// Resolves the access a request needs.
pub fn required_access<'a>(rules: &'a [AccessRule], method: &Method, path: &str) -> &'a Access {
    rules
        .iter()
        .find(|rule| rule.matches(method, path))
        .map(|rule| &rule.access)
        .unwrap_or(&Access::Authenticated)
}

fn path_matches(pattern: &str, path: &str) -> bool {
    let path = normalize(path);
    match pattern.strip_suffix("/**") {
        Some(prefix) => {
            path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        }
        None => path == pattern,
    }
}

/// Drops a trailing slash so `/users/` and `/users` match the same rules.
fn normalize(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

/// Returns the bearer token, or `None` if the header is absent or not a
/// bearer credential.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Checks a request against the rule list.
///
/// Non-public requests must carry a valid bearer token; the verified token is
/// stored in request extensions for handlers.
pub async fn guard(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let path = req
        .uri()
        .path()
        .strip_prefix(state.base_url.as_str())
        .unwrap_or(req.uri().path())
        .to_string();
    let method = req.method().clone();

    let access = required_access(&state.access_rules, &method, &path);
    if *access == Access::Public {
        return next.run(req).await;
    }

    let Some(raw) = extract_bearer(req.headers()) else {
        tracing::debug!(%method, %path, "Rejected request without bearer token");
        return AppError::MissingCredentials.into_response();
    };

    let token = match state.tokens.verify(raw) {
        Ok(token) => token,
        Err(e) => {
            tracing::debug!(%method, %path, error = %e, "Rejected invalid bearer token");
            return AppError::from(e).into_response();
        }
    };

    if let Access::Role(role) = access {
        if !token.has_role(role) {
            tracing::info!(
                %method,
                %path,
                subject = %token.subject,
                required = role,
                "Access denied"
            );
            return AppError::AccessDenied(format!("Role '{}' is required", role)).into_response();
        }
    }

    req.extensions_mut().insert::<VerifiedToken>(token);
    next.run(req).await
}
