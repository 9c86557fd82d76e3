use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use super::block::{downmix, f32_to_i16, u16_to_i16, BlockAssembler};
use crate::config::AudioConfig;

type BlockSender = Arc<Mutex<Option<broadcast::Sender<Vec<i16>>>>>;

pub struct AudioCapture {
    device: Device,
    sample_rate: u32,
    channels: u16,
    stream: Option<Box<Stream>>,
    assembler: Arc<Mutex<BlockAssembler>>,
    audio_tx: BlockSender,
    is_running: Arc<Mutex<bool>>,
}

impl AudioCapture {
    pub fn new(config: &AudioConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = if config.device == "default" {
            host.default_input_device()
                .ok_or_else(|| anyhow::anyhow!("No default input device found"))?
        } else {
            host.input_devices()?
                .find(|d| d.name().map(|n| n == config.device).unwrap_or(false))
                .ok_or_else(|| anyhow::anyhow!("Input device '{}' not found", config.device))?
        };

        tracing::info!("Audio capture initialized");
        tracing::info!("Using input device: {}", device.name()?);

        Ok(Self {
            device,
            sample_rate: config.sample_rate,
            channels: config.channels,
            stream: None,
            assembler: Arc::new(Mutex::new(BlockAssembler::new(config.block_size as usize))),
            audio_tx: Arc::new(Mutex::new(None)),
            is_running: Arc::new(Mutex::new(false)),
        })
    }

    pub fn start(&mut self, audio_tx: broadcast::Sender<Vec<i16>>) -> Result<()> {
        tracing::info!(
            "Configuring audio stream: {}Hz, {} channel(s)",
            self.sample_rate,
            self.channels
        );

        let mut selected: Option<(StreamConfig, SampleFormat)> = None;
        for supported in self.device.supported_input_configs()? {
            tracing::debug!("Supported config: {:?}", supported);
            if supported.channels() == self.channels
                && supported.min_sample_rate().0 <= self.sample_rate
                && supported.max_sample_rate().0 >= self.sample_rate
            {
                let format = supported.sample_format();
                selected = Some((
                    supported
                        .with_sample_rate(cpal::SampleRate(self.sample_rate))
                        .into(),
                    format,
                ));
                break;
            }
        }

        let (stream_config, sample_format) =
            selected.ok_or_else(|| anyhow::anyhow!("No suitable audio configuration found"))?;

        self.lock_sender()?.replace(audio_tx);
        self.set_running(true)?;

        let channels = self.channels;
        let error_callback = |err| {
            tracing::error!("Audio stream error: {}", err);
        };

        let stream = match sample_format {
            SampleFormat::I16 => {
                let (assembler, audio_tx, is_running) = self.callback_handles();
                self.device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &_| {
                        Self::forward(data, channels, &assembler, &audio_tx, &is_running);
                    },
                    error_callback,
                    None,
                )?
            }
            SampleFormat::F32 => {
                let (assembler, audio_tx, is_running) = self.callback_handles();
                self.device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &_| {
                        let converted: Vec<i16> = data.iter().map(|&s| f32_to_i16(s)).collect();
                        Self::forward(&converted, channels, &assembler, &audio_tx, &is_running);
                    },
                    error_callback,
                    None,
                )?
            }
            SampleFormat::U16 => {
                let (assembler, audio_tx, is_running) = self.callback_handles();
                self.device.build_input_stream(
                    &stream_config,
                    move |data: &[u16], _: &_| {
                        let converted: Vec<i16> = data.iter().map(|&s| u16_to_i16(s)).collect();
                        Self::forward(&converted, channels, &assembler, &audio_tx, &is_running);
                    },
                    error_callback,
                    None,
                )?
            }
            format => {
                self.set_running(false)?;
                return Err(anyhow::anyhow!("Unsupported sample format: {:?}", format));
            }
        };

        stream.play()?;
        self.stream = Some(Box::new(stream));

        tracing::info!("Audio capture started");
        Ok(())
    }

    fn callback_handles(&self) -> (Arc<Mutex<BlockAssembler>>, BlockSender, Arc<Mutex<bool>>) {
        (
            Arc::clone(&self.assembler),
            Arc::clone(&self.audio_tx),
            Arc::clone(&self.is_running),
        )
    }

    /// Runs on the audio thread. Uses `try_lock` so the callback never waits
    /// on the control side; a contended callback is dropped.
    fn forward(
        data: &[i16],
        channels: u16,
        assembler: &Mutex<BlockAssembler>,
        audio_tx: &BlockSender,
        is_running: &Mutex<bool>,
    ) {
        if !is_running.try_lock().map(|g| *g).unwrap_or(false) {
            return;
        }

        let mono = downmix(data, channels);
        let blocks = match assembler.try_lock() {
            Ok(mut assembler) => assembler.push(&mono),
            Err(_) => return,
        };

        if let Ok(tx) = audio_tx.try_lock() {
            if let Some(sender) = tx.as_ref() {
                for block in blocks {
                    let _ = sender.send(block);
                }
            }
        }
    }

    fn lock_sender(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Option<broadcast::Sender<Vec<i16>>>>> {
        self.audio_tx
            .lock()
            .map_err(|_| anyhow::anyhow!("Audio sender lock poisoned"))
    }

    fn set_running(&self, running: bool) -> Result<()> {
        *self
            .is_running
            .lock()
            .map_err(|_| anyhow::anyhow!("Audio state lock poisoned"))? = running;
        Ok(())
    }

    pub async fn stop(&mut self) -> anyhow::Result<()> {
        self.set_running(false)?;
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
        self.lock_sender()?.take();
        if let Ok(mut assembler) = self.assembler.lock() {
            assembler.clear();
        }

        tracing::info!("Audio capture stopped");
        Ok(())
    }
}

unsafe impl Send for AudioCapture {}
