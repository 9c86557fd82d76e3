use anyhow::{bail, Context, Result};
use serde::Serialize;
use shared::pcm::downmix;
use shared::Detector;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub threshold: u32,
    pub required: u32,
    pub block_size: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            threshold: shared::DEFAULT_THRESHOLD,
            required: shared::DEFAULT_REQUIRED,
            block_size: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScanTrigger {
    pub block_index: usize,
    pub offset_ms: u64,
    pub average: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScanReport {
    pub sample_rate: u32,
    pub samples: usize,
    pub blocks: usize,
    pub triggers: Vec<ScanTrigger>,
}

/// Runs a WAV file through a fresh detector, block by block.
pub fn scan_wav(path: &Path, options: ScanOptions) -> Result<ScanReport> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        bail!(
            "Unsupported WAV format: {:?} {}-bit (expected 16-bit integer PCM)",
            spec.sample_format,
            spec.bits_per_sample
        );
    }

    let interleaved = reader
        .samples::<i16>()
        .collect::<Result<Vec<i16>, _>>()
        .context("Failed to decode samples")?;
    let mono = downmix(&interleaved, spec.channels);

    tracing::debug!(
        "Scanning {} samples at {} Hz in blocks of {}",
        mono.len(),
        spec.sample_rate,
        options.block_size
    );

    Ok(scan_samples(&mono, spec.sample_rate, options))
}

pub fn scan_samples(samples: &[i16], sample_rate: u32, options: ScanOptions) -> ScanReport {
    let block_size = options.block_size.max(1);
    let mut detector = Detector::new(options.threshold, options.required);
    detector.begin();

    let mut triggers = Vec::new();
    let mut blocks = 0;
    for (block_index, block) in samples.chunks(block_size).enumerate() {
        blocks += 1;
        let observation = detector.observe(block);
        if let (true, Some(average)) = (observation.triggered, observation.average) {
            let offset_samples = (block_index * block_size) as u64;
            triggers.push(ScanTrigger {
                block_index,
                offset_ms: offset_samples * 1000 / u64::from(sample_rate.max(1)),
                average,
            });
        }
    }

    ScanReport {
        sample_rate,
        samples: samples.len(),
        blocks,
        triggers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, spec: hound::WavSpec, samples: &[i16]) {
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn mono_spec() -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    fn options(required: u32, block_size: usize) -> ScanOptions {
        ScanOptions {
            threshold: 3000,
            required,
            block_size,
        }
    }

    #[test]
    fn test_scan_samples_reports_trigger_offsets() {
        let mut samples = vec![100i16; 1600];
        samples.extend(vec![-8000i16; 1600 * 4]);

        let report = scan_samples(&samples, 16000, options(2, 1600));

        assert_eq!(report.blocks, 5);
        assert_eq!(report.samples, 8000);
        assert_eq!(
            report.triggers,
            vec![ScanTrigger {
                block_index: 3,
                offset_ms: 300,
                average: 8000,
            }]
        );
    }

    #[test]
    fn test_final_partial_block_is_processed() {
        let samples = vec![5000i16; 250];
        let report = scan_samples(&samples, 8000, options(2, 100));

        assert_eq!(report.blocks, 3);
        assert_eq!(report.triggers.len(), 1);
        assert_eq!(report.triggers[0].block_index, 2);
        assert_eq!(report.triggers[0].offset_ms, 25);
    }

    #[test]
    fn test_scan_wav_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loud.wav");
        let mut samples = vec![0i16; 512];
        samples.extend(vec![12000i16; 512 * 3]);
        write_wav(&path, mono_spec(), &samples);

        let report = scan_wav(&path, options(1, 512)).unwrap();
        assert_eq!(report.sample_rate, 16000);
        assert_eq!(report.blocks, 4);
        assert_eq!(report.triggers.len(), 1);
        assert_eq!(report.triggers[0].block_index, 2);
        assert_eq!(report.triggers[0].offset_ms, 64);
    }

    #[test]
    fn test_scan_stereo_wav_is_downmixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            ..mono_spec()
        };
        // Left loud, right silent: the mono mix averages to 4000.
        let samples: Vec<i16> = (0..400).flat_map(|_| [8000i16, 0]).collect();
        write_wav(&path, spec, &samples);

        let report = scan_wav(&path, options(0, 100)).unwrap();
        assert_eq!(report.samples, 400);
        assert_eq!(report.triggers.len(), 4);
        assert!(report.triggers.iter().all(|t| t.average == 4000));
    }

    #[test]
    fn test_scan_rejects_float_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.5f32).unwrap();
        writer.finalize().unwrap();

        let err = scan_wav(&path, ScanOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Unsupported WAV format"));
    }

    #[test]
    fn test_scan_missing_file() {
        let err = scan_wav(Path::new("/nonexistent/audio.wav"), ScanOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = scan_samples(&[5000; 10], 16000, options(0, 10));
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(
            json,
            r#"{"sample_rate":16000,"samples":10,"blocks":1,"triggers":[{"block_index":0,"offset_ms":0,"average":5000}]}"#
        );
    }
}
