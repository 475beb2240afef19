//! Edge route guard
//!
//! Server-side mirror of the client gate, driven only by the `accessToken`
//! and `role` cookies. Runs before any page is served.

use std::sync::Arc;
use warp::http::Uri;
use warp::path::FullPath;
use warp::{Filter, Rejection, Reply};

use crate::auth::Role;
use crate::constants::{ACCESS_TOKEN_COOKIE, LOGIN_ROUTE, REGISTER_ROUTE, ROLE_COOKIE, ROOT_ROUTE};
use crate::guard::{dashboard_for, RoutePolicy};
use crate::security_logger::{log_security_event, SecurityEvent};
use crate::storage::parse_cookie_header;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeDecision {
    Next,
    Redirect(&'static str),
}

fn is_public(path: &str) -> bool {
    path == ROOT_ROUTE || path.starts_with(LOGIN_ROUTE) || path.starts_with(REGISTER_ROUTE)
}

/// Decide what to do with a request for `path` carrying `cookie_header`
pub fn authorize_request(policy: &RoutePolicy, path: &str, cookie_header: Option<&str>) -> EdgeDecision {
    let cookies = cookie_header.map(parse_cookie_header).unwrap_or_default();
    let token = cookies.get(ACCESS_TOKEN_COOKIE).filter(|t| !t.is_empty());
    let role = cookies.get(ROLE_COOKIE).and_then(|r| r.parse::<Role>().ok());

    if is_public(path) {
        // Signed-in users are sent past the auth pages. An unknown role
        // would bounce back to login, so those stay put.
        let on_auth_page = path == LOGIN_ROUTE || path == REGISTER_ROUTE;
        if token.is_some() && on_auth_page {
            if let Some(role) = role {
                return EdgeDecision::Redirect(dashboard_for(Some(role)));
            }
        }
        return EdgeDecision::Next;
    }

    let Some(allowed) = policy.allowed_roles(path) else {
        return EdgeDecision::Next;
    };
    if token.is_none() {
        return EdgeDecision::Redirect(LOGIN_ROUTE);
    }
    match role {
        Some(role) if role.is_permitted(allowed) => EdgeDecision::Next,
        _ => EdgeDecision::Redirect(LOGIN_ROUTE),
    }
}

/// Rejection carrying the redirect target
#[derive(Debug)]
pub struct RedirectTo(pub &'static str);

impl warp::reject::Reject for RedirectTo {}

/// Filter that passes authorized requests and rejects the rest with
/// [`RedirectTo`]. Pair with [`handle_redirect`] in a `recover`.
pub fn route_guard(policy: Arc<RoutePolicy>) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::path::full()
        .and(warp::header::optional::<String>("cookie"))
        .and_then(move |path: FullPath, cookie: Option<String>| {
            let policy = policy.clone();
            async move {
                match authorize_request(&policy, path.as_str(), cookie.as_deref()) {
                    EdgeDecision::Next => Ok(()),
                    EdgeDecision::Redirect(target) => {
                        log_security_event(SecurityEvent::EdgeRejected {
                            path: path.as_str().to_string(),
                            reason: format!("redirect to {}", target),
                        })
                        .await;
                        Err(warp::reject::custom(RedirectTo(target)))
                    }
                }
            }
        })
        .untuple_one()
}

/// Turn [`RedirectTo`] rejections into temporary redirects
pub async fn handle_redirect(rejection: Rejection) -> Result<warp::reply::Response, Rejection> {
    if let Some(RedirectTo(target)) = rejection.find::<RedirectTo>() {
        let location = Uri::from_static(*target);
        return Ok(warp::redirect::temporary(location).into_response());
    }
    Err(rejection)
}

/// Health endpoint for the gate server
pub fn health() -> impl Filter<Extract = (&'static str,), Error = Rejection> + Clone {
    warp::path("health").and(warp::path::end()).map(|| "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn policy() -> &'static RoutePolicy {
        RoutePolicy::standard()
    }

    #[test]
    fn test_missing_token_redirects_to_login() {
        assert_eq!(
            authorize_request(policy(), "/admin/dashboard", None),
            EdgeDecision::Redirect("/auth/login")
        );
        assert_eq!(
            authorize_request(policy(), "/student/courses", Some("role=STUDENT")),
            EdgeDecision::Redirect("/auth/login")
        );
    }

    #[test]
    fn test_role_membership_at_edge() {
        let super_admin = Some("accessToken=t; role=SUPER_ADMIN");
        assert_eq!(authorize_request(policy(), "/admin/users", super_admin), EdgeDecision::Next);
        assert_eq!(
            authorize_request(policy(), "/instructor/courses", super_admin),
            EdgeDecision::Redirect("/auth/login")
        );
        assert_eq!(
            authorize_request(policy(), "/admin", Some("accessToken=t; role=STUDENT")),
            EdgeDecision::Redirect("/auth/login")
        );
        assert_eq!(
            authorize_request(policy(), "/admin", Some("accessToken=t; role=ROOT")),
            EdgeDecision::Redirect("/auth/login")
        );
    }

    #[test]
    fn test_signed_in_user_skips_auth_pages() {
        assert_eq!(
            authorize_request(policy(), "/auth/login", Some("accessToken=t; role=INSTRUCTOR")),
            EdgeDecision::Redirect("/instructor/dashboard")
        );
        assert_eq!(
            authorize_request(policy(), "/auth/register", Some("accessToken=t; role=ADMIN")),
            EdgeDecision::Redirect("/admin/dashboard")
        );
        // Unknown role stays on the login page rather than looping
        assert_eq!(
            authorize_request(policy(), "/auth/login", Some("accessToken=t")),
            EdgeDecision::Next
        );
        assert_eq!(authorize_request(policy(), "/auth/login", None), EdgeDecision::Next);
        assert_eq!(authorize_request(policy(), "/", Some("accessToken=t; role=ADMIN")), EdgeDecision::Next);
    }

    #[test]
    fn test_unprotected_paths_pass() {
        assert_eq!(authorize_request(policy(), "/about", None), EdgeDecision::Next);
        assert_eq!(authorize_request(policy(), "/favicon.ico", None), EdgeDecision::Next);
    }

    fn site() -> impl Filter<Extract = (warp::reply::Response,), Error = Infallible> + Clone {
        let guarded = route_guard(Arc::new(policy().clone()))
            .map(|| warp::reply::html("page").into_response());
        health()
            .map(|body| warp::reply::html(body).into_response())
            .or(guarded)
            .unify()
            .recover(handle_redirect)
            .unify()
            .recover(|_rejection: Rejection| async {
                Ok::<_, Infallible>(warp::http::StatusCode::NOT_FOUND.into_response())
            })
            .unify()
    }

    #[tokio::test]
    async fn test_filter_redirects() {
        let response = warp::test::request()
            .path("/admin/dashboard")
            .header("cookie", "accessToken=t; role=STUDENT")
            .reply(&site())
            .await;
        assert_eq!(response.status(), 307);
        assert_eq!(response.headers()["location"], "/auth/login");
    }

    #[tokio::test]
    async fn test_filter_passes_authorized() {
        let response = warp::test::request()
            .path("/student/dashboard")
            .header("cookie", "accessToken=t; role=STUDENT")
            .reply(&site())
            .await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), "page");

        let response = warp::test::request().path("/health").reply(&site()).await;
        assert_eq!(response.status(), 200);
    }
}
