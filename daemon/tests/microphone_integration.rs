mod common;

#[cfg(test)]
mod tests {
    use crate::common::{confirm_action, print_error, print_header, print_info, print_success};
    use std::time::Duration;
    use tokio::sync::broadcast;
    use wakegated::config::Config;
    use wakegated::{AudioCapture, DaemonState};

    #[tokio::test]
    #[ignore = "Requires microphone and user interaction"]
    async fn test_microphone_delivers_fixed_size_blocks() {
        print_header("Microphone Block Capture");

        print_info("This test verifies the microphone delivers fixed-size blocks.");

        if !confirm_action("Ready to capture for 3 seconds? (y/n)") {
            return;
        }

        let config = Config::default();
        let (tx, mut rx) = broadcast::channel::<Vec<i16>>(100);
        let mut capture = AudioCapture::new(&config.audio)
            .expect("Failed to create audio capture. Check microphone permissions.");
        capture.start(tx).expect("Failed to start audio capture");

        let mut blocks = 0;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        while let Ok(Ok(block)) = tokio::time::timeout_at(deadline, rx.recv()).await {
            assert_eq!(block.len(), config.audio.block_size as usize);
            blocks += 1;
        }

        capture.stop().await.expect("Failed to stop audio capture");

        if blocks > 0 {
            print_success(&format!("Received {} blocks in 3 seconds", blocks));
        } else {
            print_error("No audio blocks received");
        }
    }

    #[tokio::test]
    #[ignore = "Requires microphone and user interaction"]
    async fn test_sustained_noise_triggers() {
        print_header("Sustained Loudness Trigger");

        let config = Config::default();
        print_info(&format!(
            "Make a loud, sustained sound (clap repeatedly or speak loudly) for 2 seconds. \
             threshold={}, required={}",
            config.detector.threshold, config.detector.required
        ));

        if !confirm_action("Ready? (y/n)") {
            return;
        }

        let state = DaemonState::new(config.clone());
        let mut triggers = state.subscribe_triggers();

        let (tx, rx) = broadcast::channel::<Vec<i16>>(100);
        let mut capture = AudioCapture::new(&config.audio).expect("Failed to create audio capture");
        capture.start(tx).expect("Failed to start audio capture");
        state.start_detection(rx).await.expect("Failed to start detection");

        let result = tokio::time::timeout(Duration::from_secs(5), triggers.recv()).await;

        state.stop_detection().await;
        capture.stop().await.expect("Failed to stop audio capture");

        match result {
            Ok(Ok(event)) => print_success(&format!(
                "Triggered at block {} (average {})",
                event.block_index, event.average
            )),
            _ => {
                print_error("No trigger within 5 seconds");
                print_info("Consider lowering detector.threshold in the config");
            }
        }
    }
}
