use portable_atomic::AtomicBool;
use std::sync::atomic::Ordering;

use super::track_kind::RTPCodecType;
use super::{MediaStreamTrack, MediaStreamTrackState};

/// TrackStatic is a plain track reference with a fixed id and kind.
///
/// It is enough for engines that source media elsewhere and only need the
/// track identity to route it.
#[derive(Debug)]
pub struct TrackStatic {
    id: String,
    kind: RTPCodecType,
    ended: AtomicBool,
}

impl TrackStatic {
    pub fn new(id: &str, kind: RTPCodecType) -> Self {
        TrackStatic {
            id: id.to_owned(),
            kind,
            ended: AtomicBool::new(false),
        }
    }

    /// stop ends the track. It can not be restarted.
    pub fn stop(&self) {
        self.ended.store(true, Ordering::SeqCst);
    }
}

impl MediaStreamTrack for TrackStatic {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn kind(&self) -> RTPCodecType {
        self.kind
    }

    fn ready_state(&self) -> MediaStreamTrackState {
        if self.ended.load(Ordering::SeqCst) {
            MediaStreamTrackState::Ended
        } else {
            MediaStreamTrackState::Live
        }
    }
}
