//! Media track references
//!
//! Tracks are owned by the application or the engine. This crate only holds
//! them by reference and reads their identity, kind and state.

pub mod track_kind;
pub mod track_static;

use std::fmt;
use std::sync::Arc;

use track_kind::RTPCodecType;

/// MediaStreamTrackState reports whether a track still produces media.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum MediaStreamTrackState {
    #[default]
    Live,
    Ended,
}

impl fmt::Display for MediaStreamTrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MediaStreamTrackState::Live => write!(f, "live"),
            MediaStreamTrackState::Ended => write!(f, "ended"),
        }
    }
}

/// MediaStreamTrack is the capability surface expected from a track handed
/// to a sender, or surfaced by the engine for a receiver.
pub trait MediaStreamTrack: fmt::Debug + Send + Sync {
    /// id is the unique identifier of the track.
    fn id(&self) -> &str;

    /// kind is the media kind carried by the track.
    fn kind(&self) -> RTPCodecType;

    fn ready_state(&self) -> MediaStreamTrackState;
}

/// is_same_track compares two track references by identity, not by value.
pub(crate) fn is_same_track(a: &Arc<dyn MediaStreamTrack>, b: &Arc<dyn MediaStreamTrack>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const u8,
        Arc::as_ptr(b) as *const u8,
    )
}

/// is_usable_track reports whether a track can be used as a media source.
pub(crate) fn is_usable_track(track: &Arc<dyn MediaStreamTrack>) -> bool {
    track.kind() != RTPCodecType::Unspecified
        && track.ready_state() == MediaStreamTrackState::Live
}
