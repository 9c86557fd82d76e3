use serde::{Deserialize, Serialize};
use shared::Detector;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, trace};

use crate::config::DetectorConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerEvent {
    /// 1-based count of triggers since the pipeline was created.
    pub sequence: u64,
    /// 0-based index of the block that completed the loud run.
    pub block_index: u64,
    pub average: u32,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionStats {
    pub blocks_processed: u64,
    pub triggers: u64,
    pub last_average: Option<u32>,
}

/// Feeds captured blocks to a [`Detector`] and turns triggers into events.
pub struct DetectionPipeline {
    detector: Detector,
    stats: DetectionStats,
}

impl DetectionPipeline {
    pub fn new(config: &DetectorConfig) -> Self {
        let mut detector = Detector::new(config.threshold, config.required);
        detector.begin();

        info!(
            "Detector initialized: threshold={}, required={}",
            config.threshold, config.required
        );

        Self {
            detector,
            stats: DetectionStats::default(),
        }
    }

    pub fn handle_block(&mut self, block: &[i16]) -> Option<TriggerEvent> {
        let block_index = self.stats.blocks_processed;
        let observation = self.detector.observe(block);
        self.stats.blocks_processed += 1;

        let average = observation.average?;
        self.stats.last_average = Some(average);

        trace!(
            "Block {}: {} samples, average={}, loud={}, run={}",
            block_index,
            block.len(),
            average,
            observation.loud,
            self.detector.consecutive()
        );

        if !observation.triggered {
            return None;
        }

        self.stats.triggers += 1;
        let event = TriggerEvent {
            sequence: self.stats.triggers,
            block_index,
            average,
            timestamp_ms: now_millis(),
        };
        info!(
            "Trigger #{} at block {} (average {})",
            event.sequence, event.block_index, event.average
        );

        Some(event)
    }

    /// Re-arms the detector. Counters are kept.
    pub fn reset(&mut self) {
        self.detector.begin();
        info!("Detector reset");
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn stats(&self) -> &DetectionStats {
        &self.stats
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
