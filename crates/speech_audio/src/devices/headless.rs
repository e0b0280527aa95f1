//! Simulated audio output
//!
//! Behaves like a browser-style audio context without producing sound: it
//! opens suspended, must be resumed, and signals end-of-playback after the
//! buffer's duration (scaled by `time_scale`).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::config::MAX_HEADLESS_TIME_SCALE;
use crate::error::PlaybackError;
use crate::ports::{AudioBackend, AudioDevice, DeviceState, PlaybackEnded};
use crate::types::AudioBuffer;

/// Opens [`HeadlessAudioDevice`]s
#[derive(Debug)]
pub struct HeadlessAudioBackend {
    time_scale: f64,
    opened: AtomicUsize,
    last: Mutex<Option<Arc<HeadlessAudioDevice>>>,
}

impl Default for HeadlessAudioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessAudioBackend {
    /// Real-time simulation
    #[must_use]
    pub fn new() -> Self {
        Self::with_time_scale(1.0)
    }

    /// Playback lasts `time_scale` times the buffer duration; `0.0` ends
    /// immediately. Scales outside `0..=MAX_HEADLESS_TIME_SCALE` fall back to
    /// real time.
    #[must_use]
    pub fn with_time_scale(time_scale: f64) -> Self {
        let time_scale = if (0.0..=MAX_HEADLESS_TIME_SCALE).contains(&time_scale) {
            time_scale
        } else {
            1.0
        };
        Self {
            time_scale,
            opened: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    /// Number of devices opened so far
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Most recently opened device
    #[must_use]
    pub fn last_device(&self) -> Option<Arc<HeadlessAudioDevice>> {
        self.last.lock().clone()
    }
}

#[async_trait]
impl AudioBackend for HeadlessAudioBackend {
    async fn open(&self, sample_rate: u32) -> Result<Arc<dyn AudioDevice>, PlaybackError> {
        if sample_rate == 0 {
            return Err(PlaybackError::DeviceUnavailable(
                "sample rate must be greater than 0".to_string(),
            ));
        }

        let device = Arc::new(HeadlessAudioDevice {
            sample_rate,
            time_scale: self.time_scale,
            state: Mutex::new(DeviceState::Suspended),
            started: AtomicUsize::new(0),
        });
        self.opened.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = Some(Arc::clone(&device));

        Ok(device)
    }
}

/// A device that only keeps time
#[derive(Debug)]
pub struct HeadlessAudioDevice {
    sample_rate: u32,
    time_scale: f64,
    state: Mutex<DeviceState>,
    started: AtomicUsize,
}

impl HeadlessAudioDevice {
    /// Release the device; later resumes and starts fail
    pub fn close(&self) {
        *self.state.lock() = DeviceState::Closed;
    }

    /// Number of sources started
    #[must_use]
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioDevice for HeadlessAudioDevice {
    fn state(&self) -> DeviceState {
        *self.state.lock()
    }

    async fn resume(&self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        match *state {
            DeviceState::Closed => Err(PlaybackError::DeviceClosed),
            DeviceState::Suspended | DeviceState::Running => {
                *state = DeviceState::Running;
                Ok(())
            },
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&self, buffer: Arc<AudioBuffer>) -> Result<PlaybackEnded, PlaybackError> {
        match self.state() {
            DeviceState::Running => {},
            DeviceState::Suspended => {
                return Err(PlaybackError::StartFailed(
                    "audio output is suspended".to_string(),
                ));
            },
            DeviceState::Closed => return Err(PlaybackError::DeviceClosed),
        }

        self.started.fetch_add(1, Ordering::SeqCst);
        let length = Duration::try_from_secs_f64(buffer.duration().as_secs_f64() * self.time_scale)
            .unwrap_or(Duration::MAX);
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            tokio::time::sleep(length).await;
            debug!(?length, "Simulated playback ended");
            let _ = tx.send(());
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;

    fn buffer() -> Arc<AudioBuffer> {
        Arc::new(AudioBuffer::new(24000, vec![vec![0.0; 24]]).unwrap())
    }

    #[tokio::test]
    async fn opens_suspended() {
        let backend = HeadlessAudioBackend::new();
        let device = backend.open(24000).await.unwrap();

        assert_eq!(device.state(), DeviceState::Suspended);
        assert_eq!(device.sample_rate(), 24000);
        assert_eq!(backend.opened(), 1);
    }

    #[tokio::test]
    async fn rejects_zero_sample_rate() {
        let backend = HeadlessAudioBackend::new();
        assert!(matches!(
            backend.open(0).await,
            Err(PlaybackError::DeviceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn start_requires_resume() {
        let backend = HeadlessAudioBackend::new();
        let device = backend.open(24000).await.unwrap();

        assert!(matches!(
            device.start(buffer()),
            Err(PlaybackError::StartFailed(_))
        ));

        assert_ok!(device.resume().await);
        let ended = assert_ok!(device.start(buffer()));
        assert_ok!(ended.await);
    }

    #[tokio::test]
    async fn closed_device_cannot_resume() {
        let backend = HeadlessAudioBackend::new();
        backend.open(24000).await.unwrap();
        let device = backend.last_device().unwrap();

        device.close();

        assert!(matches!(
            device.resume().await,
            Err(PlaybackError::DeviceClosed)
        ));
        assert!(matches!(
            device.start(buffer()),
            Err(PlaybackError::DeviceClosed)
        ));
    }

    #[test]
    fn invalid_time_scale_falls_back_to_real_time() {
        for scale in [f64::NAN, -1.0, 1e20, f64::INFINITY] {
            let backend = HeadlessAudioBackend::with_time_scale(scale);
            assert!((backend.time_scale - 1.0).abs() < f64::EPSILON);
        }
    }

    #[tokio::test]
    async fn largest_time_scale_starts_without_overflow() {
        let backend = HeadlessAudioBackend::with_time_scale(MAX_HEADLESS_TIME_SCALE);
        let device = backend.open(24000).await.unwrap();
        assert_ok!(device.resume().await);

        let long = Arc::new(AudioBuffer::new(24000, vec![vec![0.0; 24000]]).unwrap());
        let _ended = assert_ok!(device.start(long));
        assert_eq!(backend.last_device().unwrap().started(), 1);
    }
}
