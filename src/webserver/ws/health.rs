/// WebSocket health monitoring
///
/// Tracks connection health with heartbeat and timeout management.
use std::time::{Duration, Instant};

use crate::config::WebSocketConfig;

/// Health monitoring configuration
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Silence before the server sends a ping
    pub heartbeat_interval: Duration,

    /// Client idle timeout (no activity)
    pub idle_timeout: Duration,

    /// Pong timeout (after ping sent)
    pub pong_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self::from_config(&WebSocketConfig::default())
    }
}

impl HealthConfig {
    pub fn from_config(config: &WebSocketConfig) -> Self {
        let heartbeat = Duration::from_secs(config.heartbeat_secs.max(1));
        Self {
            heartbeat_interval: heartbeat,
            idle_timeout: Duration::from_secs(config.client_idle_timeout_secs),
            // A pong should come back well within one heartbeat
            pong_timeout: heartbeat.min(Duration::from_secs(10)),
        }
    }

    /// How often the connection loop checks health
    pub fn check_interval(&self) -> Duration {
        (self.heartbeat_interval / 2).max(Duration::from_millis(100))
    }
}

/// Connection health state
#[derive(Debug)]
pub struct ConnectionHealth {
    /// Last client activity (any frame received)
    last_activity: Instant,

    /// Last ping sent to client, cleared by activity
    last_ping: Option<Instant>,

    config: HealthConfig,
}

impl ConnectionHealth {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            last_activity: Instant::now(),
            last_ping: None,
            config,
        }
    }

    /// Record client activity
    pub fn record_activity(&mut self) {
        self.last_activity = Instant::now();
        self.last_ping = None;
    }

    pub fn record_ping(&mut self) {
        self.last_ping = Some(Instant::now());
    }

    /// No activity beyond the idle timeout
    pub fn is_idle(&self) -> bool {
        self.last_activity.elapsed() > self.config.idle_timeout
    }

    /// Ping sent but no response
    pub fn is_pong_overdue(&self) -> bool {
        self.last_ping
            .map(|ping_time| ping_time.elapsed() > self.config.pong_timeout)
            .unwrap_or(false)
    }

    pub fn needs_ping(&self) -> bool {
        self.last_activity.elapsed() > self.config.heartbeat_interval && self.last_ping.is_none()
    }

    pub fn seconds_since_activity(&self) -> u64 {
        self.last_activity.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_connection_health() {
        let config = HealthConfig {
            heartbeat_interval: Duration::from_millis(50),
            idle_timeout: Duration::from_millis(100),
            pong_timeout: Duration::from_millis(30),
        };

        let mut health = ConnectionHealth::new(config);
        assert!(!health.is_idle());
        assert!(!health.needs_ping());

        sleep(Duration::from_millis(60));
        assert!(health.needs_ping());

        health.record_ping();
        assert!(!health.needs_ping());
        sleep(Duration::from_millis(50));
        assert!(health.is_pong_overdue());
        assert!(health.is_idle());

        // Activity clears the pending ping
        health.record_activity();
        assert!(!health.is_pong_overdue());
        assert!(!health.is_idle());
    }

    #[test]
    fn test_from_config() {
        let health = HealthConfig::from_config(&WebSocketConfig::default());
        assert_eq!(health.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(health.idle_timeout, Duration::from_secs(90));
        assert_eq!(health.pong_timeout, Duration::from_secs(10));
        assert_eq!(health.check_interval(), Duration::from_secs(15));
    }
}
