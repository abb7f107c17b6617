/// Destination of a completed frame on its way down the media pipeline
///
/// Allocation and timestamping of samples is up to the pipeline, depacketizers only fill them.
pub trait MediaSample {
    /// Size of the sample buffer in bytes
    fn capacity(&self) -> usize;

    /// Copy `data` into the sample buffer and set the actual data length to `data.len()`
    ///
    /// Only called with `data.len() <= self.capacity()`.
    fn set_data(&mut self, data: &[u8]);

    fn set_sync_point(&mut self, sync_point: bool);
}

#[derive(Debug, thiserror::Error)]
pub enum ConstructSampleError {
    #[error("frame of {frame_len} bytes exceeds sample capacity of {capacity} bytes")]
    InsufficientCapacity { frame_len: usize, capacity: usize },
    #[error("frame does not start with a NAL unit")]
    MalformedFrame,
}

/// [`MediaSample`] backed by a buffer of fixed capacity
#[derive(Debug)]
pub struct BufferSample {
    buffer: Box<[u8]>,
    len: usize,
    sync_point: bool,
}

impl BufferSample {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity].into_boxed_slice(),
            len: 0,
            sync_point: false,
        }
    }

    /// The actual data of the sample
    pub fn data(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    pub fn is_sync_point(&self) -> bool {
        self.sync_point
    }
}

impl MediaSample for BufferSample {
    fn capacity(&self) -> usize {
        self.buffer.len()
    }

    fn set_data(&mut self, data: &[u8]) {
        self.buffer[..data.len()].copy_from_slice(data);
        self.len = data.len();
    }

    fn set_sync_point(&mut self, sync_point: bool) {
        self.sync_point = sync_point;
    }
}
