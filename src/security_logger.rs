//! Security-focused logging of session and access events

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::auth::Role;

/// Session and routing events worth auditing
#[derive(Debug, Clone, PartialEq)]
pub enum SecurityEvent {
    // Session lifecycle
    LoginSucceeded { user_id: String, role: Role },
    LoginFailed { status: Option<u16> },
    TokenRefreshed { waiters: usize },
    RefreshFailed { reason: String },
    SessionCleared { reason: String },

    // Access control
    RouteRedirected { path: String, target: String },
    EdgeRejected { path: String, reason: String },
}

impl SecurityEvent {
    /// Event key for tracking
    fn key(&self) -> &'static str {
        match self {
            SecurityEvent::LoginSucceeded { .. } => "login_success",
            SecurityEvent::LoginFailed { .. } => "login_failed",
            SecurityEvent::TokenRefreshed { .. } => "token_refreshed",
            SecurityEvent::RefreshFailed { .. } => "refresh_failed",
            SecurityEvent::SessionCleared { .. } => "session_cleared",
            SecurityEvent::RouteRedirected { .. } => "route_redirected",
            SecurityEvent::EdgeRejected { .. } => "edge_rejected",
        }
    }
}

#[derive(Debug, Clone)]
struct TimestampedEvent {
    event: SecurityEvent,
    timestamp: Instant,
}

/// Security logger for tracking and alerting on session events
pub struct SecurityLogger {
    events: Arc<RwLock<Vec<TimestampedEvent>>>,
    event_counts: Arc<RwLock<HashMap<String, usize>>>,
    max_events: usize,
    alert_thresholds: HashMap<String, usize>,
}

impl Default for SecurityLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityLogger {
    pub fn new() -> Self {
        let mut alert_thresholds = HashMap::new();
        alert_thresholds.insert("login_failed".to_string(), 5);
        alert_thresholds.insert("refresh_failed".to_string(), 3);
        alert_thresholds.insert("edge_rejected".to_string(), 20);

        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            event_counts: Arc::new(RwLock::new(HashMap::new())),
            max_events: 10000,
            alert_thresholds,
        }
    }

    /// Log a security event
    pub async fn log_event(&self, event: SecurityEvent) {
        let event_key = event.key();

        {
            let mut events = self.events.write().await;
            events.push(TimestampedEvent {
                event: event.clone(),
                timestamp: Instant::now(),
            });

            // Bounded history
            if events.len() > self.max_events {
                let events_to_remove = events.len() - self.max_events;
                events.drain(0..events_to_remove);
            }
        }

        {
            let mut counts = self.event_counts.write().await;
            let count = counts.entry(event_key.to_string()).or_insert(0);
            *count += 1;

            if let Some(&threshold) = self.alert_thresholds.get(event_key) {
                if *count % threshold == 0 {
                    log::error!("SECURITY ALERT: {} events of type '{}' detected", count, event_key);
                    log::error!("Sample event: {:?}", event);
                }
            }
        }

        match event {
            SecurityEvent::LoginSucceeded { user_id, role } => {
                log::info!("SECURITY: Login succeeded - User: {}, Role: {}", user_id, role);
            }
            SecurityEvent::LoginFailed { status } => {
                log::warn!("SECURITY: Login failed - Status: {:?}", status);
            }
            SecurityEvent::TokenRefreshed { waiters } => {
                log::info!("SECURITY: Access token refreshed - Released {} queued requests", waiters);
            }
            SecurityEvent::RefreshFailed { reason } => {
                log::warn!("SECURITY: Token refresh failed - Reason: {}", reason);
            }
            SecurityEvent::SessionCleared { reason } => {
                log::info!("SECURITY: Session cleared - Reason: {}", reason);
            }
            SecurityEvent::RouteRedirected { path, target } => {
                log::warn!("SECURITY: Route redirected - Path: {}, Target: {}", path, target);
            }
            SecurityEvent::EdgeRejected { path, reason } => {
                log::warn!("SECURITY: Edge request rejected - Path: {}, Reason: {}", path, reason);
            }
        }
    }

    /// Events recorded within the last `duration`
    pub async fn get_recent_events(&self, duration: Duration) -> Vec<SecurityEvent> {
        let events = self.events.read().await;
        let cutoff = Instant::now().checked_sub(duration);

        events
            .iter()
            .filter(|event| cutoff.map_or(true, |c| event.timestamp > c))
            .map(|event| event.event.clone())
            .collect()
    }

    /// Counts per event kind since startup
    pub async fn get_event_stats(&self) -> HashMap<String, usize> {
        self.event_counts.read().await.clone()
    }

    /// Drop events older than `max_age`
    pub async fn cleanup_old_events(&self, max_age: Duration) {
        let mut events = self.events.write().await;
        if let Some(cutoff) = Instant::now().checked_sub(max_age) {
            events.retain(|event| event.timestamp > cutoff);
        }
    }

    /// Start periodic cleanup task
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                self.cleanup_old_events(Duration::from_secs(3600 * 24)).await;
            }
        });
    }
}

/// Global security logger instance
static SECURITY_LOGGER: OnceLock<Arc<SecurityLogger>> = OnceLock::new();

/// Initialize the global security logger. Must be called from within a
/// tokio runtime.
pub fn init_security_logger() {
    SECURITY_LOGGER.get_or_init(|| {
        let logger = Arc::new(SecurityLogger::new());
        logger.clone().start_cleanup_task();
        logger
    });
}

pub fn get_security_logger() -> Option<Arc<SecurityLogger>> {
    SECURITY_LOGGER.get().cloned()
}

/// Record through the global logger. A no-op before `init_security_logger`.
pub async fn log_security_event(event: SecurityEvent) {
    if let Some(logger) = get_security_logger() {
        logger.log_event(event).await;
    }
}

/// [`log_security_event`] for synchronous callers. The event is recorded on
/// a spawned task; it is dropped outside a tokio runtime.
pub fn spawn_security_event(event: SecurityEvent) {
    let Some(logger) = get_security_logger() else {
        return;
    };
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move { logger.log_event(event).await });
        }
        Err(_) => log::debug!("No runtime, security event dropped: {:?}", event),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_by_kind() {
        let logger = SecurityLogger::new();
        logger.log_event(SecurityEvent::LoginFailed { status: Some(401) }).await;
        logger.log_event(SecurityEvent::LoginFailed { status: Some(401) }).await;
        logger
            .log_event(SecurityEvent::SessionCleared {
                reason: "logout".to_string(),
            })
            .await;

        let stats = logger.get_event_stats().await;
        assert_eq!(stats.get("login_failed"), Some(&2));
        assert_eq!(stats.get("session_cleared"), Some(&1));
        assert_eq!(stats.get("login_success"), None);
    }

    #[tokio::test]
    async fn test_recent_events_and_cleanup() {
        let logger = SecurityLogger::new();
        logger.log_event(SecurityEvent::TokenRefreshed { waiters: 2 }).await;

        let recent = logger.get_recent_events(Duration::from_secs(60)).await;
        assert_eq!(recent, vec![SecurityEvent::TokenRefreshed { waiters: 2 }]);

        tokio::time::sleep(Duration::from_millis(5)).await;
        logger.cleanup_old_events(Duration::from_millis(1)).await;
        assert!(logger.get_recent_events(Duration::from_secs(60)).await.is_empty());
    }
}
