//! Role-based route authorization

pub mod gate;
pub mod policy;

pub use gate::{dashboard_for, evaluate, landing_redirect, GateDecision, GateMount, GateState, RouteGate};
pub use policy::RoutePolicy;
