//! Audio callback handling with self-healing output.
//!
//! A renderer that fails to accept samples is dropped on the spot. While
//! it is absent, decoding stops and one reinitialisation is attempted every
//! [`REINIT_INTERVAL`] samples.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioBackend, AudioDecoder, AudioInitStatus, AudioRenderer, OpusConfig, open_renderer};
use crate::stream::engine::AudioSink;
use crate::util::priority::raise_current_thread_priority;

/// Samples between renderer reinitialisation attempts (about one second).
pub const REINIT_INTERVAL: u64 = 200;

#[derive(Default)]
struct AudioState {
    config: Option<OpusConfig>,
    decoder: Option<Box<dyn AudioDecoder>>,
    renderer: Option<Box<dyn AudioRenderer>>,
    sample_count: u64,
    reinit_attempts: u64,
}

pub struct AudioPipeline {
    backend: Arc<dyn AudioBackend>,
    state: Mutex<AudioState>,
}

impl AudioPipeline {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(AudioState::default()),
        }
    }

    pub fn sample_count(&self) -> u64 {
        self.state.lock().sample_count
    }

    /// Renderer reinitialisations attempted so far.
    pub fn reinit_attempts(&self) -> u64 {
        self.state.lock().reinit_attempts
    }

    pub fn has_renderer(&self) -> bool {
        self.state.lock().renderer.is_some()
    }
}

impl AudioSink for AudioPipeline {
    fn init(&self, config: &OpusConfig) -> AudioInitStatus {
        let mut state = self.state.lock();

        let decoder = match self.backend.create_decoder(config) {
            Ok(d) => d,
            Err(e) => {
                error!(error = %e, "failed to create audio decoder");
                return AudioInitStatus::DecoderInitFailed;
            }
        };

        let renderer = match open_renderer(&*self.backend, config) {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "failed to open audio renderer");
                return AudioInitStatus::RendererInitFailed;
            }
        };

        info!(channels = config.channel_count, "audio stream initialised");
        *state = AudioState {
            config: Some(*config),
            decoder: Some(decoder),
            renderer: Some(renderer),
            sample_count: 0,
            reinit_attempts: 0,
        };
        AudioInitStatus::Ok
    }

    fn cleanup(&self) {
        let mut state = self.state.lock();
        state.renderer = None;
        state.decoder = None;
        state.config = None;
        debug!(samples = state.sample_count, "audio cleaned up");
    }

    fn decode_and_play(&self, sample: &[u8]) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if state.sample_count == 0 {
            if let Err(e) = raise_current_thread_priority() {
                warn!(error = %e, "unable to raise audio thread priority");
            }
        }
        state.sample_count += 1;

        let mut renderer_failed = false;
        if let (Some(decoder), Some(renderer)) = (state.decoder.as_mut(), state.renderer.as_mut()) {
            match decoder.decode(sample) {
                Ok(pcm) if !pcm.is_empty() => {
                    if let Err(e) = renderer.submit_audio(&pcm) {
                        warn!(error = %e, "audio renderer failed; will reinitialise");
                        renderer_failed = true;
                    }
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, "dropping undecodable audio sample"),
            }
        }
        if renderer_failed {
            state.renderer = None;
        }

        if state.renderer.is_none() && state.sample_count % REINIT_INTERVAL == 0 {
            let Some(config) = state.config else {
                return;
            };
            state.reinit_attempts += 1;
            match open_renderer(&*self.backend, &config) {
                Ok(r) => {
                    info!(attempt = state.reinit_attempts, "audio renderer reinitialised");
                    state.renderer = Some(r);
                }
                Err(e) => debug!(error = %e, "audio renderer still unavailable"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::AudioError;

    struct PassDecoder;

    impl AudioDecoder for PassDecoder {
        fn decode(&mut self, packet: &[u8]) -> Result<Vec<i16>, AudioError> {
            Ok(packet.iter().map(|&b| b as i16).collect())
        }
    }

    struct CountingRenderer {
        fail_submit: bool,
        submitted: Arc<AtomicUsize>,
    }

    impl AudioRenderer for CountingRenderer {
        fn prepare_for_playback(&mut self, _config: &OpusConfig) -> Result<(), AudioError> {
            Ok(())
        }

        fn submit_audio(&mut self, _pcm: &[i16]) -> Result<(), AudioError> {
            if self.fail_submit {
                return Err(AudioError::Renderer("device lost".into()));
            }
            self.submitted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Backend {
        created: AtomicUsize,
        submitted: Arc<AtomicUsize>,
        decoder_fails: bool,
    }

    impl Backend {
        fn new() -> Self {
            Self {
                created: AtomicUsize::new(0),
                submitted: Arc::new(AtomicUsize::new(0)),
                decoder_fails: false,
            }
        }
    }

    impl AudioBackend for Backend {
        fn create_decoder(&self, _config: &OpusConfig) -> Result<Box<dyn AudioDecoder>, AudioError> {
            if self.decoder_fails {
                return Err(AudioError::Decoder("no opus".into()));
            }
            Ok(Box::new(PassDecoder))
        }

        fn create_renderer(&self) -> Box<dyn AudioRenderer> {
            // The first renderer breaks on its first submission.
            let n = self.created.fetch_add(1, Ordering::SeqCst);
            Box::new(CountingRenderer {
                fail_submit: n == 0,
                submitted: Arc::clone(&self.submitted),
            })
        }
    }

    #[test]
    fn decoder_failure_is_minus_one() {
        let backend = Backend {
            decoder_fails: true,
            ..Backend::new()
        };
        let pipeline = AudioPipeline::new(Arc::new(backend));
        assert_eq!(pipeline.init(&OpusConfig::stereo()).code(), -1);
    }

    #[test]
    fn failed_renderer_recovers_on_cadence() {
        let backend = Arc::new(Backend::new());
        let pipeline = AudioPipeline::new(Arc::clone(&backend) as Arc<dyn AudioBackend>);
        assert_eq!(pipeline.init(&OpusConfig::stereo()), AudioInitStatus::Ok);

        pipeline.decode_and_play(&[1, 2]);
        assert!(!pipeline.has_renderer());

        for _ in 2..REINIT_INTERVAL {
            pipeline.decode_and_play(&[1, 2]);
        }
        assert_eq!(pipeline.reinit_attempts(), 0);

        pipeline.decode_and_play(&[1, 2]);
        assert_eq!(pipeline.sample_count(), REINIT_INTERVAL);
        assert_eq!(pipeline.reinit_attempts(), 1);
        assert!(pipeline.has_renderer());

        pipeline.decode_and_play(&[1, 2]);
        assert_eq!(backend.submitted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cleanup_drops_everything() {
        let pipeline = AudioPipeline::new(Arc::new(Backend::new()));
        pipeline.init(&OpusConfig::stereo());
        pipeline.cleanup();
        assert!(!pipeline.has_renderer());
        // Late samples after cleanup are ignored.
        pipeline.decode_and_play(&[1]);
    }
}
