//! Plays decoded buffers on the shared output device

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::context::AudioContextManager;
use crate::error::PlaybackError;
use crate::types::AudioBuffer;

/// Starts one independent source per call and waits for it to end
#[derive(Debug)]
pub struct PlaybackEngine {
    context: AudioContextManager,
}

impl PlaybackEngine {
    #[must_use]
    pub const fn new(context: AudioContextManager) -> Self {
        Self { context }
    }

    #[must_use]
    pub const fn context(&self) -> &AudioContextManager {
        &self.context
    }

    /// Play `buffer` from the start, resolving when it has finished
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError` if the device cannot be acquired or rejects
    /// the buffer.
    #[instrument(skip(self, buffer), fields(frames = buffer.frame_count(), sample_rate = buffer.sample_rate()))]
    pub async fn play(&self, buffer: Arc<AudioBuffer>) -> Result<(), PlaybackError> {
        let device = self.context.context().await?;

        if buffer.sample_rate() != device.sample_rate() {
            debug!(
                device_rate = device.sample_rate(),
                "Buffer rate differs from device rate"
            );
        }

        let ended = device.start(buffer)?;
        if ended.await.is_err() {
            warn!("Audio output dropped the end-of-playback signal");
        }

        debug!("Playback finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::devices::headless::HeadlessAudioBackend;
    use crate::ports::{AudioBackend, AudioDevice, DeviceState, PlaybackEnded};

    fn buffer(frames: usize) -> Arc<AudioBuffer> {
        Arc::new(AudioBuffer::new(24000, vec![vec![0.1; frames]]).unwrap())
    }

    fn engine(backend: Arc<HeadlessAudioBackend>) -> PlaybackEngine {
        PlaybackEngine::new(AudioContextManager::new(backend, 24000))
    }

    #[tokio::test]
    async fn play_waits_for_end_of_buffer() {
        let backend = Arc::new(HeadlessAudioBackend::new());
        let engine = engine(backend.clone());
        let started = tokio::time::Instant::now();

        // 2400 frames at 24 kHz
        engine.play(buffer(2400)).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(backend.last_device().unwrap().started(), 1);
    }

    #[tokio::test]
    async fn concurrent_plays_are_independent() {
        let backend = Arc::new(HeadlessAudioBackend::new());
        let engine = engine(backend.clone());
        let shared = buffer(240);

        let (a, b) = tokio::join!(engine.play(shared.clone()), engine.play(shared));

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(backend.opened(), 1);
        assert_eq!(backend.last_device().unwrap().started(), 2);
    }

    struct SilentDevice;

    #[async_trait]
    impl AudioDevice for SilentDevice {
        fn state(&self) -> DeviceState {
            DeviceState::Running
        }

        async fn resume(&self) -> Result<(), PlaybackError> {
            Ok(())
        }

        fn sample_rate(&self) -> u32 {
            24000
        }

        fn start(&self, _buffer: Arc<AudioBuffer>) -> Result<PlaybackEnded, PlaybackError> {
            let (_tx, rx) = oneshot::channel();
            Ok(rx)
        }
    }

    struct SilentBackend;

    #[async_trait]
    impl AudioBackend for SilentBackend {
        async fn open(&self, _sample_rate: u32) -> Result<Arc<dyn AudioDevice>, PlaybackError> {
            Ok(Arc::new(SilentDevice))
        }
    }

    #[tokio::test]
    async fn dropped_end_signal_counts_as_finished() {
        let engine = PlaybackEngine::new(AudioContextManager::new(Arc::new(SilentBackend), 24000));
        assert!(engine.play(buffer(10)).await.is_ok());
    }

    #[tokio::test]
    async fn closed_device_fails_playback() {
        let backend = Arc::new(HeadlessAudioBackend::new());
        let engine = engine(backend.clone());
        engine.play(buffer(24)).await.unwrap();

        backend.last_device().unwrap().close();

        assert!(matches!(
            engine.play(buffer(24)).await,
            Err(PlaybackError::DeviceClosed)
        ));
    }
}
