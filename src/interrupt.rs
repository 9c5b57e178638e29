// SYNOID Bench Interrupt Routing
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// One Ctrl-C listener for the whole run. While a webcam capture is active,
// Ctrl-C ends the capture and the run carries on with what was recorded.
// Outside capture it aborts the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{info, warn};

#[derive(Default)]
struct Inner {
    capturing: AtomicBool,
    capture_stop: Notify,
    abort: Notify,
}

/// Shared handle that routes interrupts to the capture or to the run.
#[derive(Clone, Default)]
pub struct InterruptHandle {
    inner: Arc<Inner>,
}

/// Marks a capture as active until dropped.
pub struct CaptureGuard {
    inner: Arc<Inner>,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.inner.capturing.store(false, Ordering::SeqCst);
    }
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one interrupt.
    pub fn interrupt(&self) {
        if self.inner.capturing.load(Ordering::SeqCst) {
            self.inner.capture_stop.notify_one();
        } else {
            self.inner.abort.notify_one();
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.inner.capturing.load(Ordering::SeqCst)
    }

    /// Interrupts go to the capture until the guard is dropped.
    pub fn begin_capture(&self) -> CaptureGuard {
        self.inner.capturing.store(true, Ordering::SeqCst);
        CaptureGuard {
            inner: self.inner.clone(),
        }
    }

    /// Resolves when an interrupt arrives during capture.
    pub async fn capture_stopped(&self) {
        self.inner.capture_stop.notified().await
    }

    /// Resolves when an interrupt arrives outside capture.
    pub async fn aborted(&self) {
        self.inner.abort.notified().await
    }

    /// Spawn the process-wide Ctrl-C listener feeding this handle.
    pub fn listen_for_ctrl_c(&self) {
        let handle = self.clone();
        tokio::spawn(async move {
            loop {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        if handle.is_capturing() {
                            info!("[SIGNAL] Ctrl-C received, finishing capture...");
                        } else {
                            warn!("[SIGNAL] ⛔ Ctrl-C received, aborting run");
                        }
                        handle.interrupt();
                    }
                    Err(e) => {
                        warn!("[SIGNAL] Failed to install Ctrl-C handler: {}", e);
                        break;
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_interrupt_outside_capture_aborts() {
        let handle = InterruptHandle::new();
        handle.interrupt();
        assert!(timeout(Duration::from_secs(1), handle.aborted()).await.is_ok());
    }

    #[tokio::test]
    async fn test_interrupt_during_capture_stops_capture_only() {
        let handle = InterruptHandle::new();
        {
            let _guard = handle.begin_capture();
            assert!(handle.is_capturing());
            handle.interrupt();
            assert!(timeout(Duration::from_secs(1), handle.capture_stopped())
                .await
                .is_ok());
        }
        assert!(!handle.is_capturing());
        assert!(timeout(Duration::from_millis(50), handle.aborted())
            .await
            .is_err());

        // After capture, the next interrupt aborts again
        handle.interrupt();
        assert!(timeout(Duration::from_secs(1), handle.aborted()).await.is_ok());
    }
}
