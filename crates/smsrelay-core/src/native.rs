//! Mirror of settings to the platform's background receiver.

use crate::config::ForwardingConfig;

/// Receives the current configuration and service flag whenever either
/// changes, so a platform-side receiver can keep forwarding while the app
/// is not running.
///
/// Calls are fire-and-forget: implementations must not block and have no
/// way to report failure back to the pipeline.
pub trait NativeSync: Send + Sync {
    /// Pushes the configuration and service flag.
    fn sync_config(&self, config: &ForwardingConfig, service_enabled: bool);
}

/// Used when no platform receiver exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSync;

impl NativeSync for NoopSync {
    fn sync_config(&self, _config: &ForwardingConfig, _service_enabled: bool) {}
}
