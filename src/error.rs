use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub type OnErrorHdlrFn =
    Box<dyn (FnMut(Error) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    /// ErrAlreadyEnded indicates an operation on a sender or receiver that
    /// has already ended.
    #[error("track handle already ended")]
    ErrAlreadyEnded,

    /// ErrConnectionClosed indicates an operation executed after the
    /// transport has already been closed.
    #[error("transport closed")]
    ErrConnectionClosed,

    /// ErrInvalidTrack indicates that a track is not usable as a media source,
    /// either because it has already ended or because it carries no media kind.
    #[error("invalid media stream track")]
    ErrInvalidTrack,

    /// ErrNoOpReplace indicates that replace was called with the track the
    /// sender is already using.
    #[error("do not need to replace the same track")]
    ErrNoOpReplace,

    /// ErrKindMismatch indicates that the replacing track is of a different
    /// kind than the current one.
    #[error("can not replace a track with a different kind of track")]
    ErrKindMismatch,

    /// ErrNotAnOffer indicates that an offer payload did not embed an offer
    /// session description.
    #[error("received SDP is not an offer")]
    ErrNotAnOffer,

    /// ErrNotAnAnswer indicates that an answer payload did not embed an
    /// answer session description.
    #[error("received SDP is not an answer")]
    ErrNotAnAnswer,

    /// ErrOfferGenerationFailed indicates that the engine did not produce an
    /// offer session description.
    #[error("can't generate offer SDP")]
    ErrOfferGenerationFailed,

    /// ErrAnswerGenerationFailed indicates that no local answer description
    /// resulted from handling a remote offer.
    #[error("can't generate answer SDP")]
    ErrAnswerGenerationFailed,

    /// ErrUnsupportedOperation indicates that the engine can not perform the
    /// requested operation.
    #[error("operation not supported by the peer connection engine")]
    ErrUnsupportedOperation,

    /// ErrDirectiveDropped indicates that a coordinator dropped a directive
    /// without resolving or rejecting it.
    #[error("directive dropped before completion")]
    ErrDirectiveDropped,

    /// ErrUnknownTrackIndex indicates that a directive addressed a track
    /// index which is not owned by the coordinator.
    #[error("unknown track index")]
    ErrUnknownTrackIndex,

    /// ErrNoTurnCredentials indicates that a TURN server URL was provided
    /// without required credentials.
    #[error("turn server credentials required")]
    ErrNoTurnCredentials,

    /// ErrSignalingChannelNotOpen indicates that a message was sent on the
    /// signaling channel before it opened or after it closed.
    #[error("signaling channel not open")]
    ErrSignalingChannelNotOpen,

    #[error("SerdeError: {0}")]
    ErrSerde(#[from] serde_json::Error),

    /// ErrEngine carries an opaque failure reported by the peer connection engine.
    #[error("EngineError: {0}")]
    ErrEngine(String),

    #[error("Other errors: {0}")]
    ErrOthers(String),
}

impl Error {
    pub fn new(msg: String) -> Self {
        Error::ErrOthers(msg)
    }
}

/// flatten_errs flattens multiple errors into one
pub fn flatten_errs(errs: Vec<impl Into<Error>>) -> Result<()> {
    if errs.is_empty() {
        Ok(())
    } else {
        let errs_strs: Vec<String> = errs.into_iter().map(|e| e.into().to_string()).collect();
        Err(Error::new(errs_strs.join("\n")))
    }
}
