// SPDX-License-Identifier: GPL-3.0-only

//! Cross-module delivery tests: end-to-end flow, stress, and teardown safety

use framepipe::{
    CaptureSession, ConsumerId, DisplayRegistry, FrameStreamHub, PixelFormat, SessionConfig,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_end_to_end_stream_delivery() {
    init_tracing();
    let id = ConsumerId::new(1);
    let hub = FrameStreamHub::new();
    hub.open(id, 4, 4, PixelFormat::Bgra8888).unwrap();
    let mut ready = hub.subscribe(id);

    hub.publish(id, &vec![0xFFu8; 64], 4, 4, 16, PixelFormat::Bgra8888)
        .unwrap();
    hub.notify(id);

    assert!(ready.try_ready(), "notify must wake the consumer");
    let frame = hub.read(id).expect("published frame");
    assert_eq!(frame.sequence, 1);
    assert_eq!((frame.width, frame.height), (4, 4));
    assert_eq!(frame.format, PixelFormat::Bgra8888);
    assert!(frame.data.iter().all(|&b| b == 0xFF));

    // No new publish: the second read reports no new frame.
    assert!(hub.read(id).is_none());
}

#[test]
fn test_session_feeds_surface_and_stream() {
    let registry = Arc::new(DisplayRegistry::new());
    let hub = Arc::new(FrameStreamHub::new());
    let session = CaptureSession::new(
        SessionConfig::default(),
        Arc::clone(&registry),
        Arc::clone(&hub),
    )
    .unwrap();

    let id = ConsumerId::new(1);
    let mut stream_ready = hub.subscribe(id);
    let mut display_ready = registry.frame_ready(session.surface_handle());
    session.start_stream(id).unwrap();

    session.push_frame(&vec![0x7Fu8; 8 * 8 * 4], 8, 8, 0).unwrap();

    // Display path.
    assert!(display_ready.try_ready());
    let surface = registry.get(session.surface_handle()).unwrap();
    let view = surface.acquire(8, 8).expect("preview content");
    assert_eq!((view.width(), view.height()), (8, 8));
    assert!(view.bytes().iter().all(|&b| b == 0x7F));
    drop(view);

    // Stream path.
    assert!(stream_ready.try_ready());
    let frame = hub.read(id).expect("streamed frame");
    assert_eq!(frame.sequence, 1);
    assert!(frame.data.iter().all(|&b| b == 0x7F));

    session.stop();
}

#[test]
fn test_resize_midstream_yields_new_shape() {
    let registry = Arc::new(DisplayRegistry::new());
    let hub = Arc::new(FrameStreamHub::new());
    let session =
        CaptureSession::new(SessionConfig::default(), Arc::clone(&registry), hub).unwrap();

    session
        .push_frame(&vec![1u8; 320 * 240 * 4], 320, 240, 0)
        .unwrap();
    session
        .push_frame(&vec![2u8; 640 * 480 * 4], 640, 480, 0)
        .unwrap();

    let surface = registry.get(session.surface_handle()).unwrap();
    let view = surface.acquire(640, 480).expect("resized frame");
    assert_eq!((view.width(), view.height()), (640, 480));
    assert_eq!(view.bytes().len(), 640 * 480 * 4);
    assert!(view.bytes().iter().all(|&b| b == 2));
}

#[test]
fn test_fast_producer_slow_consumer_observes_increasing_subsequence() {
    init_tracing();
    const FRAMES: u64 = 400;
    let id = ConsumerId::new(1);
    let hub = Arc::new(FrameStreamHub::new());
    hub.open(id, 16, 16, PixelFormat::Bgra8888).unwrap();

    let producer_hub = Arc::clone(&hub);
    let producer = thread::spawn(move || {
        for i in 0..FRAMES {
            let fill = (i % 251) as u8;
            producer_hub
                .publish(id, &vec![fill; 16 * 16 * 4], 16, 16, 64, PixelFormat::Bgra8888)
                .unwrap();
            producer_hub.notify(id);
        }
    });

    let mut observed = Vec::new();
    loop {
        if let Some(frame) = hub.read(id) {
            // Every frame is filled with one byte; a mixed frame is torn.
            let first = frame.data[0];
            assert!(frame.data.iter().all(|&b| b == first), "torn frame");
            observed.push(frame.sequence);
            if frame.sequence == FRAMES {
                break;
            }
        }
        // Read slower than the producer publishes.
        thread::sleep(Duration::from_micros(200));
    }
    producer.join().unwrap();

    assert!(observed.windows(2).all(|w| w[0] < w[1]), "sequence regressed");
    assert_eq!(*observed.last().unwrap(), FRAMES);
}

#[test]
fn test_close_racing_publish_does_not_corrupt_reopened_channel() {
    let id = ConsumerId::new(1);
    let hub = Arc::new(FrameStreamHub::new());
    hub.open(id, 4, 4, PixelFormat::Bgra8888).unwrap();

    // In-flight producer keeps publishing while the consumer closes and
    // reopens the same id.
    let racer_hub = Arc::clone(&hub);
    let racer = thread::spawn(move || {
        for _ in 0..200 {
            racer_hub
                .publish(id, &vec![0xABu8; 64], 4, 4, 16, PixelFormat::Bgra8888)
                .unwrap();
        }
    });

    hub.close(id);
    hub.open(id, 4, 4, PixelFormat::Bgra8888).unwrap();
    racer.join().unwrap();

    // The reopened channel is a fresh single-writer epoch for this producer.
    hub.publish(id, &vec![0xCDu8; 64], 4, 4, 16, PixelFormat::Bgra8888)
        .unwrap();
    let frame = hub.read(id).expect("frame on reopened channel");
    assert_eq!((frame.width, frame.height), (4, 4));
    assert!(frame.data.iter().all(|&b| b == 0xCD));
}

#[test]
fn test_deterministic_close_then_publish_then_reopen() {
    let id = ConsumerId::new(2);
    let hub = FrameStreamHub::new();
    hub.open(id, 4, 4, PixelFormat::Bgra8888).unwrap();
    hub.close(id);

    // Late publish after close: silent no-op.
    hub.publish(id, &vec![9u8; 64], 4, 4, 16, PixelFormat::Bgra8888)
        .unwrap();
    assert!(hub.read(id).is_none());

    hub.open(id, 4, 4, PixelFormat::Bgra8888).unwrap();
    assert!(hub.read(id).is_none());
    hub.publish(id, &vec![1u8; 64], 4, 4, 16, PixelFormat::Bgra8888)
        .unwrap();
    assert_eq!(hub.read(id).unwrap().sequence, 1);
}
