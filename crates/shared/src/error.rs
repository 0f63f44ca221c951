use thiserror::Error;

/// Failures crossing the backend gateway seam.
///
/// Semantic rejections ("keystroke not handled") are normal results, not
/// errors; only transport-level and protocol-level problems land here.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("backend transport failure: {0}")]
    Transport(String),
    #[error("backend channel closed")]
    ChannelClosed,
    #[error("unexpected backend response for {command}: {detail}")]
    InvalidResponse { command: String, detail: String },
}
