//! Route authorization gate
//!
//! Decides per navigation whether the current session may stay on a route.
//! The decision functions are pure; [`RouteGate`] and [`GateMount`] wire them
//! to a [`SessionManager`].

use std::sync::Arc;
use tokio::sync::watch;

use crate::auth::Role;
use crate::constants::{
    ADMIN_DASHBOARD, INSTRUCTOR_DASHBOARD, LOGIN_ROUTE, REGISTER_ROUTE, ROOT_ROUTE, STUDENT_DASHBOARD,
};
use crate::core::{SessionManager, SessionSnapshot};
use crate::guard::policy::RoutePolicy;
use crate::security_logger::{spawn_security_event, SecurityEvent};

/// Canonical landing page for a role. Shared by the gate, the landing
/// redirect and the edge guard.
pub fn dashboard_for(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Admin) | Some(Role::SuperAdmin) => ADMIN_DASHBOARD,
        Some(Role::Instructor) => INSTRUCTOR_DASHBOARD,
        Some(Role::Student) => STUDENT_DASHBOARD,
        None => LOGIN_ROUTE,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Session not hydrated yet: render nothing and do not redirect
    Pending,
    Redirect(String),
    Authorized,
}

/// Decide access to a route allowing `allowed`
pub fn evaluate(allowed: &[Role], snapshot: &SessionSnapshot) -> GateDecision {
    if !snapshot.is_client {
        return GateDecision::Pending;
    }
    if snapshot.user.is_none() && snapshot.access_token.is_none() {
        return GateDecision::Redirect(LOGIN_ROUTE.to_string());
    }

    match snapshot.role {
        Some(role) if role.is_permitted(allowed) => GateDecision::Authorized,
        role => GateDecision::Redirect(dashboard_for(role).to_string()),
    }
}

/// Where a signed-in user arriving on an entry page (`/`, login, register)
/// should be sent. `None` means stay.
pub fn landing_redirect(snapshot: &SessionSnapshot) -> Option<&'static str> {
    if !snapshot.is_client || !snapshot.is_authenticated {
        return None;
    }
    snapshot.role.map(|role| dashboard_for(Some(role)))
}

fn is_entry_route(path: &str) -> bool {
    path == ROOT_ROUTE || path == LOGIN_ROUTE || path == REGISTER_ROUTE
}

/// Gate bound to a session manager and a route policy
#[derive(Clone)]
pub struct RouteGate {
    sessions: Arc<SessionManager>,
    policy: Arc<RoutePolicy>,
}

impl RouteGate {
    pub fn new(sessions: Arc<SessionManager>, policy: Arc<RoutePolicy>) -> Self {
        Self { sessions, policy }
    }

    /// Gate over the standard dashboard policy
    pub fn standard(sessions: Arc<SessionManager>) -> Self {
        Self::new(sessions, Arc::new(RoutePolicy::standard().clone()))
    }

    /// Decision for `path` using the route policy
    pub fn check(&self, path: &str) -> GateDecision {
        decide_path(&self.policy, path, &self.sessions.snapshot())
    }

    /// Decision for a caller-supplied set of allowed roles
    pub fn check_roles(&self, allowed: &[Role]) -> GateDecision {
        evaluate(allowed, &self.sessions.snapshot())
    }

    /// Start tracking the gate state for a page mounted at `path`
    pub fn mount(&self, path: &str) -> GateMount {
        let mut mount = GateMount {
            policy: self.policy.clone(),
            path: path.to_string(),
            state: GateState::Pending,
            sessions: self.sessions.subscribe(),
        };
        mount.reevaluate();
        mount
    }
}

fn decide_path(policy: &RoutePolicy, path: &str, snapshot: &SessionSnapshot) -> GateDecision {
    if let Some(allowed) = policy.allowed_roles(path) {
        return evaluate(allowed, snapshot);
    }
    if !snapshot.is_client {
        return GateDecision::Pending;
    }
    if is_entry_route(path) {
        if let Some(target) = landing_redirect(snapshot) {
            return GateDecision::Redirect(target.to_string());
        }
    }
    GateDecision::Authorized
}

/// Per-mount gate state: `Pending -> {Redirecting | Authorized}`.
/// `Redirecting` is terminal; `Authorized` is re-evaluated on every route or
/// session change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Pending,
    Redirecting(String),
    Authorized,
}

pub struct GateMount {
    policy: Arc<RoutePolicy>,
    path: String,
    state: GateState,
    sessions: watch::Receiver<SessionSnapshot>,
}

impl GateMount {
    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Route change within the same mount
    pub fn navigate(&mut self, path: &str) -> &GateState {
        if !self.is_terminal() {
            self.path = path.to_string();
            self.reevaluate();
        }
        &self.state
    }

    /// Wait for the next session change and re-evaluate. Returns immediately
    /// once redirecting, or if the session manager is gone.
    pub async fn next_change(&mut self) -> &GateState {
        if !self.is_terminal() && self.sessions.changed().await.is_ok() {
            self.reevaluate();
        }
        &self.state
    }

    /// Wait until the gate leaves `Pending`
    pub async fn settled(&mut self) -> &GateState {
        while self.state == GateState::Pending {
            if self.sessions.changed().await.is_err() {
                break;
            }
            self.reevaluate();
        }
        &self.state
    }

    fn is_terminal(&self) -> bool {
        matches!(self.state, GateState::Redirecting(_))
    }

    fn reevaluate(&mut self) {
        let snapshot = self.sessions.borrow_and_update().clone();
        self.state = match decide_path(&self.policy, &self.path, &snapshot) {
            GateDecision::Pending => GateState::Pending,
            GateDecision::Authorized => GateState::Authorized,
            GateDecision::Redirect(target) => {
                log::warn!("Redirecting from {} to {}", self.path, target);
                spawn_security_event(SecurityEvent::RouteRedirected {
                    path: self.path.clone(),
                    target: target.clone(),
                });
                GateState::Redirecting(target)
            }
        };
    }
}
