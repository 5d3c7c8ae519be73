//! A single sampled video frame.

/// One frame pulled from the mission video, JPEG-encoded.
///
/// Frames are produced lazily by the sampler and consumed immediately by
/// the observer; they are never persisted on their own.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Milliseconds into the mission video.
    pub timestamp_ms: u64,

    /// Encoded image data.
    pub jpeg: Vec<u8>,
}
