//! sd_notify integration for running `lrwatch` as a systemd service.
//!
//! Every method is a no-op when disabled or off Linux.

#[derive(Debug, Clone, Copy)]
pub(crate) struct SystemdNotifier {
    enabled: bool,
}

impl SystemdNotifier {
    pub(crate) fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// `READY=1`: bootstrap finished and the directory is being watched.
    pub(crate) fn notify_ready(&self) {
        if !self.enabled {
            return;
        }
        #[cfg(target_os = "linux")]
        send(sd_notify::NotifyState::Ready, "READY");
    }

    /// `STOPPING=1`: draining the in-flight photo before exit.
    pub(crate) fn notify_stopping(&self) {
        if !self.enabled {
            return;
        }
        #[cfg(target_os = "linux")]
        send(sd_notify::NotifyState::Stopping, "STOPPING");
    }

    pub(crate) fn notify_status(&self, msg: &str) {
        if !self.enabled {
            return;
        }
        #[cfg(target_os = "linux")]
        send(sd_notify::NotifyState::Status(msg), "STATUS");
        #[cfg(not(target_os = "linux"))]
        let _ = msg;
    }
}

#[cfg(target_os = "linux")]
fn send(state: sd_notify::NotifyState<'_>, label: &str) {
    if let Err(e) = sd_notify::notify(false, &[state]) {
        tracing::debug!(error = %e, "sd_notify {} failed", label);
    }
}
