/// Result alias that carries the custom [`MouthsyncError`] type.
pub type Result<T> = std::result::Result<T, MouthsyncError>;

/// Common error type for the core crate.
///
/// Per-frame failures (`EmptyFrame`, `InvalidFrameLength`, `FrameMismatch`,
/// `InvalidChannelCount`) are never fatal: the analyzer skips the frame and a
/// later well-formed frame recovers on its own.
#[derive(Debug, thiserror::Error)]
pub enum MouthsyncError {
    /// The frame carried no samples.
    #[error("frame contains no samples")]
    EmptyFrame,
    /// FFT resources cannot be built for a zero or odd frame length.
    #[error("frame length {0} cannot be split into interleaved complex pairs")]
    InvalidFrameLength(usize),
    /// Analysis was asked to run on a slice sized for a different resource set.
    #[error("frame holds {actual} samples but resources were built for {expected}")]
    FrameMismatch { expected: usize, actual: usize },
    /// Interleaved input declared zero channels.
    #[error("invalid channel count {0}")]
    InvalidChannelCount(u16),
    #[error("fft failed: {0}")]
    Fft(#[from] realfft::FftError),
    /// Configuration parsing or report serialisation failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Free-form message for callers that have no better variant.
    #[error("{0}")]
    Message(String),
}

impl MouthsyncError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for MouthsyncError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for MouthsyncError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
