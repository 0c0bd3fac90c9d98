//! Audio renderer loss and periodic recovery.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use strix_core::audio::{AudioPipeline, OpusConfig, REINIT_INTERVAL};
use strix_core::stream::AudioSink;
use strix_core::AudioInitStatus;

use common::FakeAudio;

#[test]
fn renderer_recovers_on_the_reinit_boundary() {
    let backend = Arc::new(FakeAudio {
        fail_first_after: Some(10),
        ..Default::default()
    });
    let audio = AudioPipeline::new(backend.clone());
    assert_eq!(audio.init(&OpusConfig::surround51()), AudioInitStatus::Ok);

    // Samples 1-10 play, sample 11 loses the device.
    for _ in 0..11 {
        audio.decode_and_play(b"opus");
    }
    assert!(!audio.has_renderer());

    while audio.sample_count() < REINIT_INTERVAL - 1 {
        audio.decode_and_play(b"opus");
    }
    assert!(!audio.has_renderer());
    assert_eq!(audio.reinit_attempts(), 0);

    audio.decode_and_play(b"opus");
    assert_eq!(audio.sample_count(), REINIT_INTERVAL);
    assert!(audio.has_renderer());
    assert_eq!(audio.reinit_attempts(), 1);
    assert_eq!(backend.renderers_created.load(Ordering::SeqCst), 2);

    // The replacement keeps playing.
    for _ in 0..REINIT_INTERVAL {
        audio.decode_and_play(b"opus");
    }
    assert!(audio.has_renderer());
    assert_eq!(audio.reinit_attempts(), 1);
}

#[test]
fn samples_after_cleanup_are_dropped() {
    let audio = AudioPipeline::new(Arc::new(FakeAudio::default()));
    assert_eq!(audio.init(&OpusConfig::stereo()), AudioInitStatus::Ok);
    audio.cleanup();

    for _ in 0..REINIT_INTERVAL {
        audio.decode_and_play(b"opus");
    }
    assert!(!audio.has_renderer());
    assert_eq!(audio.reinit_attempts(), 0);
}
