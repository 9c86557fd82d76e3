/// Averages interleaved frames down to one channel.
/// A trailing partial frame is dropped.
pub fn downmix(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
            (sum / i32::from(channels)) as i16
        })
        .collect()
}
