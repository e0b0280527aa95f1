//! Default system output through `rodio`
//!
//! `rodio::OutputStream` is `!Send` on some platforms, so the stream lives
//! on a dedicated thread and the device handle talks to it over a channel.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use async_trait::async_trait;
use parking_lot::Mutex;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::error::PlaybackError;
use crate::ports::{AudioBackend, AudioDevice, DeviceState, PlaybackEnded};
use crate::types::AudioBuffer;

enum Command {
    Play {
        buffer: Arc<AudioBuffer>,
        ended: oneshot::Sender<()>,
        reply: mpsc::Sender<Result<(), PlaybackError>>,
    },
    Shutdown,
}

/// Opens the default output device
#[derive(Debug, Default)]
pub struct RodioAudioBackend;

impl RodioAudioBackend {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioBackend for RodioAudioBackend {
    async fn open(&self, sample_rate: u32) -> Result<Arc<dyn AudioDevice>, PlaybackError> {
        let device = tokio::task::spawn_blocking(move || RodioAudioDevice::spawn(sample_rate))
            .await
            .map_err(|e| PlaybackError::DeviceUnavailable(format!("audio thread failed: {e}")))??;
        Ok(Arc::new(device))
    }
}

/// Handle to the audio thread
pub struct RodioAudioDevice {
    sample_rate: u32,
    commands: mpsc::Sender<Command>,
    state: Mutex<DeviceState>,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl std::fmt::Debug for RodioAudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioAudioDevice")
            .field("sample_rate", &self.sample_rate)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl RodioAudioDevice {
    fn spawn(sample_rate: u32) -> Result<Self, PlaybackError> {
        let (commands, receiver) = mpsc::channel();
        let (init_tx, init_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("spellbee-audio".into())
            .spawn(move || run(&receiver, &init_tx))
            .map_err(|e| {
                PlaybackError::DeviceUnavailable(format!("failed to spawn audio thread: {e}"))
            })?;

        init_rx.recv().map_err(|_| {
            PlaybackError::DeviceUnavailable("audio thread exited during setup".to_string())
        })??;

        info!(sample_rate, "Default audio output ready");

        Ok(Self {
            sample_rate,
            commands,
            // Desktop outputs need no user gesture
            state: Mutex::new(DeviceState::Running),
            thread: Mutex::new(Some(thread)),
        })
    }
}

impl RodioAudioDevice {
    fn mark_closed(&self) -> PlaybackError {
        *self.state.lock() = DeviceState::Closed;
        PlaybackError::DeviceClosed
    }
}

fn run(commands: &mpsc::Receiver<Command>, init: &mpsc::Sender<Result<(), PlaybackError>>) {
    let (stream, handle) = match OutputStream::try_default() {
        Ok(output) => output,
        Err(e) => {
            let _ = init.send(Err(PlaybackError::DeviceUnavailable(e.to_string())));
            return;
        },
    };
    if init.send(Ok(())).is_err() {
        return;
    }

    while let Ok(command) = commands.recv() {
        match command {
            Command::Play {
                buffer,
                ended,
                reply,
            } => {
                let sink = match Sink::try_new(&handle) {
                    Ok(sink) => sink,
                    Err(e) => {
                        let _ = reply.send(Err(PlaybackError::StartFailed(e.to_string())));
                        continue;
                    },
                };
                sink.append(SamplesBuffer::new(
                    buffer.channel_count(),
                    buffer.sample_rate(),
                    buffer.interleaved(),
                ));
                let _ = reply.send(Ok(()));

                thread::spawn(move || {
                    sink.sleep_until_end();
                    let _ = ended.send(());
                });
            },
            Command::Shutdown => break,
        }
    }

    drop(stream);
    debug!("Audio thread shutting down");
}

#[async_trait]
impl AudioDevice for RodioAudioDevice {
    fn state(&self) -> DeviceState {
        *self.state.lock()
    }

    async fn resume(&self) -> Result<(), PlaybackError> {
        match self.state() {
            DeviceState::Closed => Err(PlaybackError::DeviceClosed),
            DeviceState::Suspended | DeviceState::Running => Ok(()),
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&self, buffer: Arc<AudioBuffer>) -> Result<PlaybackEnded, PlaybackError> {
        let (ended, rx) = oneshot::channel();
        let (reply, reply_rx) = mpsc::channel();

        self.commands
            .send(Command::Play {
                buffer,
                ended,
                reply,
            })
            .map_err(|_| self.mark_closed())?;
        reply_rx.recv().map_err(|_| self.mark_closed())??;

        Ok(rx)
    }
}

impl Drop for RodioAudioDevice {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
    }
}
