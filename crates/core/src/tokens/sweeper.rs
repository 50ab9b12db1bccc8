//! Background removal of expired tokens.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::TokenGateway;

/// Periodically purges expired tokens so abandoned ones do not pile up.
///
/// Redeem already purges an expired token when it is presented; the sweeper
/// handles the ones nobody comes back for.
pub struct TokenSweeper {
    gateway: Arc<TokenGateway>,
    interval: Duration,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TokenSweeper {
    pub fn new(gateway: Arc<TokenGateway>, interval: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            gateway,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the sweep loop. Calling it twice is a no-op.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Token sweeper already running");
            return;
        }

        let running = Arc::clone(&self.running);
        let gateway = Arc::clone(&self.gateway);
        let interval = self.interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!("Token sweeper started (every {:?})", interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Token sweeper received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        if let Err(e) = gateway.sweep_expired() {
                            warn!("Token sweep failed: {}", e);
                        }
                    }
                }
            }
            info!("Token sweeper stopped");
        });

        *self.handle.lock().await = Some(handle);
    }

    /// Stop the sweep loop and wait for it to exit. Calling it when not
    /// running is a no-op.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Token sweeper not running");
            return;
        }

        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Token sweeper task ended abnormally: {}", e);
            }
        }
    }
}
