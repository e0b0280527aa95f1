//! Public speech API used by the game
//!
//! [`AudioService`] ties the fetcher, the deduplicating cache, the playback
//! engine and the fallback narrator together. It is cheap to clone; clones
//! share one cache and one output device.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use tracing::{debug, error, instrument};

use crate::cache::{CacheStats, Lookup, SpeechCache};
use crate::config::SpeechConfig;
use crate::context::AudioContextManager;
use crate::error::PlaybackError;
use crate::fetcher::SpeechFetcher;
use crate::narrator::FallbackNarrator;
use crate::playback::PlaybackEngine;
use crate::ports::{AudioBackend, Narrator, SpeechSynthesizer};
use crate::types::{AudioBuffer, CacheKey, VoiceId};

/// Text-to-speech with caching, request deduplication and fallback narration
#[derive(Clone)]
pub struct AudioService {
    inner: Arc<Inner>,
}

struct Inner {
    fetcher: Arc<SpeechFetcher>,
    cache: Arc<SpeechCache>,
    playback: PlaybackEngine,
    narrator: FallbackNarrator,
}

impl std::fmt::Debug for AudioService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioService")
            .field("fetcher", &self.inner.fetcher)
            .field("cache", &self.inner.cache)
            .field("playback", &self.inner.playback)
            .field("narrator", &self.inner.narrator)
            .finish()
    }
}

impl AudioService {
    /// Create a service from its ports
    ///
    /// The output device is not opened until the first playback.
    #[must_use]
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        backend: Arc<dyn AudioBackend>,
        narrator: Arc<dyn Narrator>,
        config: &SpeechConfig,
    ) -> Self {
        let fetcher = SpeechFetcher::new(synthesizer, Duration::from_millis(config.timeout_ms));
        let context = AudioContextManager::new(backend, config.output_sample_rate);

        Self {
            inner: Arc::new(Inner {
                fetcher: Arc::new(fetcher),
                cache: Arc::new(SpeechCache::new()),
                playback: PlaybackEngine::new(context),
                narrator: FallbackNarrator::new(narrator, config.fallback_rate),
            }),
        }
    }

    /// Warm the cache for `text` spoken by `voice`
    ///
    /// Returns at once for empty text, cached audio, or a fetch already in
    /// flight. Otherwise starts the fetch and waits for it to finish.
    /// Failures are logged and leave the key uncached.
    #[instrument(skip(self, text), fields(voice = %voice, text_len = text.len()))]
    pub async fn prefetch(&self, text: &str, voice: &VoiceId) {
        if text.is_empty() {
            return;
        }

        match self.lookup_or_start(text, voice) {
            Lookup::Ready(_) => debug!("Already cached"),
            Lookup::Joined(_) => debug!("Fetch already in flight"),
            Lookup::Started(fetch) => {
                fetch.await;
            },
        }
    }

    /// Prefetch several phrases concurrently
    pub async fn prefetch_all<'a, I>(&self, requests: I)
    where
        I: IntoIterator<Item = (&'a str, &'a VoiceId)>,
    {
        future::join_all(
            requests
                .into_iter()
                .map(|(text, voice)| self.prefetch(text, voice)),
        )
        .await;
    }

    /// Speak `text` with `voice`, resolving when playback has finished
    ///
    /// Uses cached audio when present, otherwise fetches it (sharing any
    /// fetch already in flight). When no audio can be produced the fallback
    /// narrator is used once and this still succeeds.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError` only when the output device fails.
    #[instrument(skip(self, text), fields(voice = %voice, text_len = text.len()))]
    pub async fn speak(&self, text: &str, voice: &VoiceId) -> Result<(), PlaybackError> {
        if text.is_empty() {
            return Ok(());
        }

        let buffer = match self.lookup_or_start(text, voice) {
            Lookup::Ready(buffer) => Some(buffer),
            Lookup::Started(fetch) => fetch.await,
            Lookup::Joined(fetch) => match fetch.await {
                Some(buffer) => Some(buffer),
                None => {
                    debug!("Joined fetch failed, retrying once");
                    match self.lookup_or_start(text, voice) {
                        Lookup::Ready(buffer) => Some(buffer),
                        Lookup::Joined(fetch) | Lookup::Started(fetch) => fetch.await,
                    }
                },
            },
        };

        match buffer {
            Some(buffer) => self.inner.playback.play(buffer).await,
            None => {
                self.inner.narrator.say(text);
                Ok(())
            },
        }
    }

    /// Forget all cached and in-flight audio
    ///
    /// Fetches already running finish for their current callers, but their
    /// results are not cached.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
        debug!("Speech cache cleared");
    }

    /// Whether audio for `text` spoken by `voice` is cached
    #[must_use]
    pub fn is_cached(&self, text: &str, voice: &VoiceId) -> bool {
        self.inner.cache.contains(&CacheKey::new(voice, text))
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    fn lookup_or_start(&self, text: &str, voice: &VoiceId) -> Lookup {
        let key = CacheKey::new(voice, text);
        self.inner.cache.lookup_or_start(&key, |id| {
            self.spawn_fetch(key.clone(), id, text.to_string(), voice.clone())
        })
    }

    /// Run one fetch as its own task so it settles even if every caller
    /// stops waiting
    fn spawn_fetch(
        &self,
        key: CacheKey,
        id: u64,
        text: String,
        voice: VoiceId,
    ) -> BoxFuture<'static, Option<Arc<AudioBuffer>>> {
        let fetcher = Arc::clone(&self.inner.fetcher);
        let cache = Arc::clone(&self.inner.cache);

        let task = tokio::spawn(async move {
            let buffer = match AssertUnwindSafe(fetcher.fetch(&text, &voice))
                .catch_unwind()
                .await
            {
                Ok(buffer) => buffer.map(Arc::new),
                Err(_) => {
                    error!(key = %key, "Speech fetch panicked");
                    None
                },
            };

            if !cache.complete(&key, id, buffer.clone()) {
                debug!(key = %key, "Cache was cleared during fetch, result discarded");
            }
            buffer
        });

        async move {
            task.await.unwrap_or_else(|e| {
                error!(error = %e, "Speech fetch task failed");
                None
            })
        }
        .boxed()
    }
}
