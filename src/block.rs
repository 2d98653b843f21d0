//! Owned sample blocks handed across the real-time boundary.

/// One time slice of single-channel `f32` samples.
///
/// A block owns its storage and is immutable after construction, so the
/// consumer always observes exactly the sample order and count the producer
/// captured.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    samples: Box<[f32]>,
}

impl SampleBlock {
    /// Copies a host-provided buffer into an independently owned block.
    ///
    /// The copy is mandatory: the host reuses the backing storage once the
    /// production callback returns, so retaining a reference would read
    /// invalidated data.
    pub fn copy_from(src: &[f32]) -> Self {
        Self {
            samples: src.into(),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl AsRef<[f32]> for SampleBlock {
    fn as_ref(&self) -> &[f32] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_preserves_samples() {
        let src = [0.1f32, 0.2, 0.3, 0.4];
        let block = SampleBlock::copy_from(&src);
        assert_eq!(block.len(), 4);
        assert_eq!(block.samples(), &src);
    }

    #[test]
    fn test_block_is_independent_of_source() {
        let mut src = vec![1.0f32, -1.0];
        let block = SampleBlock::copy_from(&src);
        src[0] = 0.0;
        assert_eq!(block.samples(), &[1.0, -1.0]);
    }

    #[test]
    fn test_empty_block() {
        let block = SampleBlock::copy_from(&[]);
        assert!(block.is_empty());
        assert_eq!(block.len(), 0);
    }
}
