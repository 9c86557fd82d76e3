pub use shared::pcm::downmix;

pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

pub fn u16_to_i16(sample: u16) -> i16 {
    (i32::from(sample) - 32768) as i16
}

/// Cuts an arbitrary-length sample stream into fixed-size blocks.
///
/// Samples that do not fill a block are kept and prefixed to the next push,
/// so block boundaries do not depend on how the device chunks its callbacks.
#[derive(Debug)]
pub struct BlockAssembler {
    block_size: usize,
    pending: Vec<i16>,
}

impl BlockAssembler {
    pub fn new(block_size: usize) -> Self {
        let block_size = block_size.max(1);
        Self {
            block_size,
            pending: Vec::with_capacity(block_size),
        }
    }

    /// Returns every block completed by `samples`, oldest first.
    pub fn push(&mut self, samples: &[i16]) -> Vec<Vec<i16>> {
        let mut blocks = Vec::new();
        let mut rest = samples;

        if !self.pending.is_empty() {
            let missing = self.block_size - self.pending.len();
            let take = missing.min(rest.len());
            self.pending.extend_from_slice(&rest[..take]);
            rest = &rest[take..];

            if self.pending.len() < self.block_size {
                return blocks;
            }
            blocks.push(std::mem::replace(
                &mut self.pending,
                Vec::with_capacity(self.block_size),
            ));
        }

        let mut chunks = rest.chunks_exact(self.block_size);
        blocks.extend(chunks.by_ref().map(<[i16]>::to_vec));
        self.pending.extend_from_slice(chunks.remainder());

        blocks
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
