use crate::audio::capture::AudioCapture;
use crate::config::Config;
use crate::detection::{DetectionPipeline, TriggerEvent};
use crate::output::TriggerAction;
use shared::ipc::StatusInfo;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;

pub struct DaemonState {
    pub config: Config,
    pub is_active: Arc<Mutex<bool>>,
    pub audio_capture: Arc<Mutex<Option<AudioCapture>>>,
    pub pipeline: Arc<Mutex<DetectionPipeline>>,
    pub detection_task_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    trigger_tx: broadcast::Sender<TriggerEvent>,
    action: TriggerAction,
}

impl DaemonState {
    pub fn new(config: Config) -> Self {
        let pipeline = DetectionPipeline::new(&config.detector);
        let action = TriggerAction::from_config(
            &config.action,
            Duration::from_secs(config.timeouts.action_timeout_seconds),
        );
        let (trigger_tx, _) = broadcast::channel(config.buffer.broadcast_capacity.max(1));

        Self {
            config,
            is_active: Arc::new(Mutex::new(false)),
            audio_capture: Arc::new(Mutex::new(None)),
            pipeline: Arc::new(Mutex::new(pipeline)),
            detection_task_handle: Arc::new(Mutex::new(None)),
            trigger_tx,
            action,
        }
    }

    pub async fn activate(&mut self) -> anyhow::Result<()> {
        *self.is_active.lock().await = true;
        tracing::info!("Daemon activated");
        Ok(())
    }

    pub async fn deactivate(&mut self) -> anyhow::Result<()> {
        *self.is_active.lock().await = false;
        tracing::info!("Daemon deactivated");
        Ok(())
    }

    pub async fn is_active(&self) -> bool {
        *self.is_active.lock().await
    }

    pub async fn get_status(&self) -> StatusInfo {
        let is_active = *self.is_active.lock().await;
        let pipeline = self.pipeline.lock().await;
        let detector = pipeline.detector();
        let stats = pipeline.stats();

        StatusInfo {
            is_running: true,
            is_active,
            threshold: detector.threshold(),
            required: detector.required(),
            consecutive: detector.consecutive(),
            blocks_processed: stats.blocks_processed,
            triggers: stats.triggers,
        }
    }

    pub async fn reset_detector(&self) {
        self.pipeline.lock().await.reset();
    }

    pub fn subscribe_triggers(&self) -> broadcast::Receiver<TriggerEvent> {
        self.trigger_tx.subscribe()
    }

    /// Spawns the task that drains `audio_rx` into the detector, one block at
    /// a time and in arrival order. The detector is re-armed first, and again
    /// whenever blocks are dropped.
    ///
    /// Trigger commands run one at a time on a separate worker. Triggers that
    /// arrive while its queue is full are dropped.
    pub async fn start_detection(
        &self,
        mut audio_rx: broadcast::Receiver<Vec<i16>>,
    ) -> anyhow::Result<()> {
        let mut handle_slot = self.detection_task_handle.lock().await;
        if handle_slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(anyhow::anyhow!("Detection already running"));
        }

        self.pipeline.lock().await.reset();

        let pipeline = Arc::clone(&self.pipeline);
        let trigger_tx = self.trigger_tx.clone();
        let action = self.action.clone();

        let (action_tx, mut action_rx) =
            mpsc::channel::<TriggerEvent>(self.config.action.queue_capacity.max(1));
        tokio::spawn(async move {
            while let Some(event) = action_rx.recv().await {
                if let Err(e) = action.run(&event).await {
                    tracing::warn!("Trigger action failed: {}", e);
                }
            }
            tracing::debug!("Trigger action worker stopped");
        });

        let task = tokio::spawn(async move {
            tracing::info!("Detection task started");

            loop {
                match audio_rx.recv().await {
                    Ok(block) => {
                        let event = pipeline.lock().await.handle_block(&block);
                        let Some(event) = event else {
                            continue;
                        };

                        // No subscribers is fine; the action still runs.
                        let _ = trigger_tx.send(event.clone());

                        match action_tx.try_send(event) {
                            Ok(()) => {}
                            Err(TrySendError::Full(event)) => {
                                tracing::warn!(
                                    "Trigger action busy, dropping trigger #{}",
                                    event.sequence
                                );
                            }
                            Err(TrySendError::Closed(event)) => {
                                tracing::warn!(
                                    "Trigger action worker gone, dropping trigger #{}",
                                    event.sequence
                                );
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // The loud run can't be trusted across a gap.
                        tracing::warn!("Detection lagged, dropped {} audio blocks", n);
                        pipeline.lock().await.reset();
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Audio receiver closed, stopping detection");
                        break;
                    }
                }
            }
        });

        *handle_slot = Some(task);
        Ok(())
    }

    pub async fn stop_detection(&self) {
        if let Some(handle) = self.detection_task_handle.lock().await.take() {
            handle.abort();
            tracing::info!("Detection task stopped");
        }
    }
}
