// Connection handling module
// Accepts a single TCP connection and hands it to the dispatcher in its own task

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::config::AppState;
use crate::logger;

/// Accept and process a connection, checking limits and logging.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: std::net::SocketAddr,
    state: &Arc<AppState>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = state.active_connections.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            // Exceeded limit: rollback counter and reject
            state.active_connections.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if state.config.logging.access_log {
        logger::log_connection_accepted(&peer_addr);
    }

    handle_connection(stream, peer_addr, Arc::clone(state));
}

/// Releases one slot of `active_connections` when dropped, even if the
/// connection task panics.
pub struct ConnectionSlot(Arc<AppState>);

impl ConnectionSlot {
    /// Take ownership of a slot already counted in `active_connections`
    pub fn new(state: Arc<AppState>) -> Self {
        Self(state)
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.0.active_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle a single connection in a spawned task.
///
/// The whole exchange is bounded by `performance.client_timeout`.
fn handle_connection(
    stream: TcpStream,
    peer_addr: std::net::SocketAddr,
    state: Arc<AppState>,
) {
    tokio::spawn(async move {
        let _slot = ConnectionSlot::new(Arc::clone(&state));
        let timeout_duration = Duration::from_secs(state.config.performance.client_timeout);

        let exchange = state.dispatcher.dispatch(stream, peer_addr);
        if tokio::time::timeout(timeout_duration, exchange).await.is_err() {
            logger::log_warning(&format!(
                "Connection from {peer_addr} timed out after {} seconds",
                timeout_duration.as_secs()
            ));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_state() -> Arc<AppState> {
        let cfg = Config::load_from("does/not/exist/proxy").unwrap();
        Arc::new(AppState::new(&cfg))
    }

    #[tokio::test]
    async fn test_slot_released_when_task_panics() {
        let state = test_state();
        state.active_connections.fetch_add(1, Ordering::SeqCst);

        let task_state = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            let _slot = ConnectionSlot::new(task_state);
            panic!("dispatch failed");
        });

        assert!(handle.await.unwrap_err().is_panic());
        assert_eq!(state.active_connections.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_slot_released_on_drop() {
        let state = test_state();
        state.active_connections.fetch_add(2, Ordering::SeqCst);
        drop(ConnectionSlot::new(Arc::clone(&state)));
        assert_eq!(state.active_connections.load(Ordering::SeqCst), 1);
    }
}
