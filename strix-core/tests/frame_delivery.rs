//! Decode-to-present delivery through the frame pipeline.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use strix_core::stream::{DecodeStatus, DecodeUnit, DecoderSelection, FrameSink, SessionEvent, event};
use strix_core::video::VideoFormat;
use strix_core::{BackendRegistry, DecoderNegotiator, FramePipeline};

use common::{FakeCodec, RecordingSurface};

fn pipeline(surface: Arc<RecordingSurface>) -> (FramePipeline, strix_core::stream::EventReceiver) {
    let (tx, rx) = event::channel();
    let negotiator = Arc::new(DecoderNegotiator::new(
        FakeCodec::software_only(),
        Arc::new(BackendRegistry::new()),
    ));
    let pipeline = FramePipeline::new(negotiator, surface, DecoderSelection::Auto, false, tx);
    pipeline.setup(VideoFormat::H264, 1280, 720, 60).unwrap();
    (pipeline, rx)
}

fn submit(pipeline: &FramePipeline, n: u64) -> DecodeStatus {
    let payload = format!("frame-{n}");
    pipeline.submit_decode_unit(&DecodeUnit::single(n, payload.as_bytes()))
}

#[test]
fn burst_renders_only_the_newest() {
    let surface = Arc::new(RecordingSurface::default());
    let (pipeline, events) = pipeline(surface.clone());
    assert_eq!(pipeline.backend_name(), Some("software"));

    for n in 1..=3 {
        assert_eq!(submit(&pipeline, n), DecodeStatus::Ok);
    }

    // One notification for the whole burst.
    assert_eq!(events.try_recv(), Ok(SessionEvent::FrameReady));
    assert!(events.try_recv().is_err());

    assert!(pipeline.render_latest());
    assert!(!pipeline.render_latest());
    assert_eq!(*surface.presented.lock(), vec![3]);

    let stats = pipeline.stats();
    assert_eq!((stats.submitted, stats.decoded, stats.rendered, stats.dropped), (3, 3, 1, 2));
}

#[test]
fn each_consumed_frame_rearms_notification() {
    let surface = Arc::new(RecordingSurface::default());
    let (pipeline, events) = pipeline(surface.clone());

    submit(&pipeline, 1);
    assert_eq!(events.try_recv(), Ok(SessionEvent::FrameReady));
    pipeline.render_latest();

    submit(&pipeline, 2);
    assert_eq!(events.try_recv(), Ok(SessionEvent::FrameReady));
    pipeline.render_latest();

    assert_eq!(*surface.presented.lock(), vec![1, 2]);
}

#[test]
fn decode_error_requests_keyframe() {
    let (pipeline, events) = pipeline(Arc::new(RecordingSurface::default()));

    let status = pipeline.submit_decode_unit(&DecodeUnit::single(9, b"bad slice"));
    assert_eq!(status, DecodeStatus::NeedKeyframe);
    assert!(events.try_recv().is_err());
    assert_eq!(pipeline.stats().need_keyframe, 1);
}

#[test]
fn split_units_are_reassembled() {
    let (pipeline, _events) = pipeline(Arc::new(RecordingSurface::default()));
    let unit = DecodeUnit {
        frame_number: 4,
        full_length: 10,
        buffers: vec![&b"frame"[..], &b"-four"[..]],
    };
    assert_eq!(pipeline.submit_decode_unit(&unit), DecodeStatus::Ok);
    assert_eq!(pipeline.stats().decoded, 1);
}

#[test]
fn submissions_after_shutdown_are_ignored() {
    let surface = Arc::new(RecordingSurface::default());
    let (pipeline, events) = pipeline(surface.clone());

    submit(&pipeline, 1);
    pipeline.shutdown();
    assert!(!pipeline.is_active());
    assert!(!pipeline.render_latest());

    assert_eq!(submit(&pipeline, 2), DecodeStatus::Ok);
    assert_eq!(pipeline.stats().decoded, 1);
    assert_eq!(events.try_recv(), Ok(SessionEvent::FrameReady));
    assert!(events.try_recv().is_err());
    assert!(surface.presented.lock().is_empty());
}

#[test]
fn shutdown_races_in_flight_submissions() {
    let surface = Arc::new(RecordingSurface::default());
    let (pipeline, _events) = pipeline(surface.clone());
    let pipeline = Arc::new(pipeline);

    let decoder_thread = {
        let pipeline = Arc::clone(&pipeline);
        thread::spawn(move || {
            (1..=5_000u64)
                .map(|n| {
                    if n % 7 == 0 {
                        pipeline.submit_decode_unit(&DecodeUnit::single(n, b"bad slice"))
                    } else {
                        submit(&pipeline, n)
                    }
                })
                .collect::<Vec<_>>()
        })
    };

    thread::sleep(Duration::from_millis(5));
    pipeline.render_latest();
    pipeline.shutdown();
    let presented_at_shutdown = surface.presented.lock().len();

    let statuses = decoder_thread.join().unwrap();
    assert_eq!(statuses.len(), 5_000);
    assert!(
        statuses
            .iter()
            .all(|s| matches!(s, DecodeStatus::Ok | DecodeStatus::NeedKeyframe))
    );

    assert!(!pipeline.is_active());
    assert!(!pipeline.render_latest());
    assert_eq!(surface.presented.lock().len(), presented_at_shutdown);
}
