mod common;

use common::{burst, square_wave};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;
use wakegated::config::Config;
use wakegated::{BlockAssembler, DaemonState, DetectionPipeline};

const BLOCK: usize = 256;

fn config(threshold: u32, required: u32) -> Config {
    let mut config = Config::default();
    config.detector.threshold = threshold;
    config.detector.required = required;
    config.audio.block_size = BLOCK as u32;
    config
}

#[test]
fn test_odd_sized_callbacks_trigger_on_the_right_block() {
    let config = config(3000, 3);
    let mut assembler = BlockAssembler::new(config.audio.block_size as usize);
    let mut pipeline = DetectionPipeline::new(&config.detector);

    // Two quiet blocks, then five loud ones, delivered in 100-sample callbacks.
    let mut stream = burst(200, 2, BLOCK);
    stream.extend(burst(6000, 5, BLOCK));

    let mut events = Vec::new();
    for callback in stream.chunks(100) {
        for block in assembler.push(callback) {
            events.extend(pipeline.handle_block(&block));
        }
    }

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].block_index, 2 + 3);
    assert_eq!(pipeline.stats().blocks_processed, 7);
    assert_eq!(pipeline.detector().consecutive(), 1);
    assert_eq!(assembler.pending(), 0);
}

#[test]
fn test_interrupted_burst_does_not_trigger() {
    let config = config(3000, 2);
    let mut pipeline = DetectionPipeline::new(&config.detector);

    for level in [6000, 6000, 100, 6000, 6000] {
        assert!(pipeline.handle_block(&square_wave(level, BLOCK)).is_none());
    }
    assert_eq!(pipeline.detector().consecutive(), 2);
    assert!(pipeline.handle_block(&square_wave(6000, BLOCK)).is_some());
}

#[tokio::test]
async fn test_daemon_state_runs_detection_from_channel() {
    let state = DaemonState::new(config(3000, 2));
    let mut triggers = state.subscribe_triggers();

    let (tx, rx) = broadcast::channel(64);
    state.start_detection(rx).await.unwrap();

    for _ in 0..6 {
        tx.send(square_wave(5000, BLOCK)).unwrap();
    }

    for expected in 1..=2u64 {
        let event = timeout(Duration::from_secs(2), triggers.recv())
            .await
            .expect("trigger not delivered")
            .unwrap();
        assert_eq!(event.sequence, expected);
        assert_eq!(event.block_index, expected * 3 - 1);
        assert_eq!(event.average, 5000);
    }

    drop(tx);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let status = state.get_status().await;
    assert_eq!(status.blocks_processed, 6);
    assert_eq!(status.triggers, 2);
    assert_eq!(status.consecutive, 0);
}
