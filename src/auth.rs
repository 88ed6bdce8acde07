//! Caller identity for the HTTP transport.
//!
//! The request that opens an MCP session must carry the caller's own GitHub
//! token as a Bearer token. The token is verified with GitHub, the allow-list
//! decides the caller's access, and the resulting session context is handed
//! to the service factory for that session. Requests carrying an
//! `Mcp-Session-Id` belong to a session that was resolved when it opened.

use crate::session::{CallerResolver, SessionContext};
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use rmcp::transport::common::http_header::HEADER_SESSION_ID;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

tokio::task_local! {
    static CALLER: Arc<SessionContext>;
}

/// The session context resolved for the request being served, if any.
pub(crate) fn current_caller() -> Option<Arc<SessionContext>> {
    CALLER.try_with(Arc::clone).ok()
}

/// Axum middleware resolving the Bearer token of a session-opening request
/// into a [`SessionContext`].
pub async fn resolve_caller(
    State(resolver): State<Arc<CallerResolver>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if request.headers().contains_key(HEADER_SESSION_ID) {
        return next.run(request).await;
    }

    let token = match bearer_token(&request) {
        Ok(Some(token)) => token.to_string(),
        Ok(None) => {
            warn!("HTTP request rejected: missing Authorization header");
            return unauthorized("Missing Bearer token in Authorization header");
        }
        Err(reason) => {
            warn!(reason, "HTTP request rejected: malformed Authorization header");
            return unauthorized(reason);
        }
    };

    let session = match resolver.resolve(&token).await {
        Ok(session) => Arc::new(session),
        Err(e) => {
            warn!(token_prefix = %mask_token(&token), error = %e, "HTTP request rejected: token not verified");
            return unauthorized("GitHub token could not be verified");
        }
    };

    info!(
        identity = %session.identity(),
        access = ?session.access(),
        "Resolved HTTP caller"
    );
    request.extensions_mut().insert(session.clone());
    CALLER.scope(session, next.run(request)).await
}

fn bearer_token(request: &Request<Body>) -> Result<Option<&str>, &'static str> {
    let Some(value) = request.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| "Authorization header contains invalid characters")?;

    match value.strip_prefix("Bearer ") {
        Some("") => Err("Bearer token is empty"),
        Some(token) => Ok(Some(token)),
        None => Err("Invalid Authorization header format. Expected 'Bearer <token>'"),
    }
}

fn mask_token(token: &str) -> String {
    match token.get(..3) {
        Some(prefix) if token.len() > 3 => format!("{}***", prefix),
        _ => "***".to_string(),
    }
}

fn unauthorized(message: &str) -> Response {
    #[derive(Serialize)]
    struct ErrorBody<'a> {
        error: ErrorDetail<'a>,
    }

    #[derive(Serialize)]
    struct ErrorDetail<'a> {
        code: &'static str,
        message: &'a str,
    }

    let body = ErrorBody {
        error: ErrorDetail {
            code: "unauthorized",
            message,
        },
    };
    let json = serde_json::to_string(&body).unwrap_or_else(|_| {
        r#"{"error":{"code":"unauthorized","message":"Authentication failed"}}"#.to_string()
    });

    (
        StatusCode::UNAUTHORIZED,
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::WWW_AUTHENTICATE, "Bearer"),
        ],
        json,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Access;

    fn request_with(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&request_with(None)), Ok(None));
        assert_eq!(
            bearer_token(&request_with(Some("Bearer secret"))),
            Ok(Some("secret"))
        );
        assert!(bearer_token(&request_with(Some("Basic abc"))).is_err());
        assert!(bearer_token(&request_with(Some("Bearer "))).is_err());
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("ab"), "***");
        assert_eq!(mask_token("secret"), "sec***");
    }

    #[test]
    fn test_unauthorized_response_status() {
        let response = unauthorized("nope");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[tokio::test]
    async fn test_current_caller_only_inside_scope() {
        assert!(current_caller().is_none());

        let session = Arc::new(SessionContext::new("alice", "tok", Access::Authorized));
        let seen = CALLER
            .scope(session, async { current_caller().map(|s| s.identity().to_string()) })
            .await;
        assert_eq!(seen.as_deref(), Some("alice"));
    }
}
