//! Lazily created, shared audio output

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::error::PlaybackError;
use crate::ports::{AudioBackend, AudioDevice, DeviceState};

/// Owns the single output device of a service
///
/// The device is opened on first use, not at construction, so a service can
/// be built before the platform allows audio (e.g. before a user gesture).
pub struct AudioContextManager {
    backend: Arc<dyn AudioBackend>,
    sample_rate: u32,
    device: OnceCell<Arc<dyn AudioDevice>>,
}

impl std::fmt::Debug for AudioContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioContextManager")
            .field("sample_rate", &self.sample_rate)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl AudioContextManager {
    #[must_use]
    pub fn new(backend: Arc<dyn AudioBackend>, sample_rate: u32) -> Self {
        Self {
            backend,
            sample_rate,
            device: OnceCell::new(),
        }
    }

    /// Whether the device has been opened
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.device.initialized()
    }

    /// Get the running device, opening or resuming it as needed
    ///
    /// Concurrent first calls open the device once. A failed open is not
    /// remembered; the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the device cannot be opened or
    /// resumed, and `PlaybackError::DeviceClosed` if it was closed.
    #[instrument(skip(self), fields(sample_rate = self.sample_rate))]
    pub async fn context(&self) -> Result<Arc<dyn AudioDevice>, PlaybackError> {
        let device = self
            .device
            .get_or_try_init(|| async {
                let device = self.backend.open(self.sample_rate).await?;
                info!(
                    sample_rate = device.sample_rate(),
                    state = ?device.state(),
                    "Audio output opened"
                );
                Ok::<_, PlaybackError>(device)
            })
            .await?;

        match device.state() {
            DeviceState::Running => {},
            DeviceState::Suspended => {
                debug!("Resuming suspended audio output");
                device.resume().await?;
            },
            DeviceState::Closed => return Err(PlaybackError::DeviceClosed),
        }

        Ok(Arc::clone(device))
    }
}
