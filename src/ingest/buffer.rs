/// Rolling buffer of filtered samples.
///
/// Holds the most recent `capacity` samples; pushes beyond capacity drop
/// the oldest. `snapshot()` copies the contents in chronological order so
/// readers never observe the buffer mid-mutation: the single writer and
/// any periodic reader exchange data only through such copies.
pub struct SampleRingBuffer {
    buffer: Vec<f32>,
    capacity: usize,
}

impl SampleRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append samples, evicting the oldest beyond capacity.
    pub fn push(&mut self, samples: &[f32]) {
        self.buffer.extend_from_slice(samples);
        if self.buffer.len() > self.capacity {
            let excess = self.buffer.len() - self.capacity;
            self.buffer.drain(0..excess);
        }
    }

    /// Copy of the current contents, oldest to newest.
    pub fn snapshot(&self) -> Vec<f32> {
        self.buffer.clone()
    }

    /// Copy of the latest `count` samples in chronological order.
    pub fn latest(&self, count: usize) -> Vec<f32> {
        let len = self.buffer.len().min(count);
        if len == 0 {
            return Vec::new();
        }
        let start = self.buffer.len() - len;
        self.buffer[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_snapshot_order() {
        let mut buffer = SampleRingBuffer::new(5);
        buffer.push(&[1.0, 2.0, 3.0]);
        assert_eq!(buffer.snapshot(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let mut buffer = SampleRingBuffer::new(4);
        buffer.push(&[1.0, 2.0, 3.0]);
        buffer.push(&[4.0, 5.0, 6.0]);
        assert_eq!(buffer.snapshot(), vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_oversized_batch() {
        let mut buffer = SampleRingBuffer::new(3);
        let batch: Vec<f32> = (0..10).map(|i| i as f32).collect();
        buffer.push(&batch);
        assert_eq!(buffer.snapshot(), vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_latest() {
        let mut buffer = SampleRingBuffer::new(10);
        buffer.push(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buffer.latest(2), vec![3.0, 4.0]);
        assert_eq!(buffer.latest(10), vec![1.0, 2.0, 3.0, 4.0]);
        assert!(buffer.latest(0).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut buffer = SampleRingBuffer::new(5);
        buffer.push(&[1.0]);
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
