
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwap;
use portable_atomic::AtomicBool;
use tokio::sync::Mutex;

use super::directive::{raise, Directive, DirectiveHandler};
use super::{RTCRtpSendParameters, TrackIndex};
use crate::error::{Error, Result};
use crate::stats::StatsReport;
use crate::track::track_kind::RTPCodecType;
use crate::track::{is_same_track, is_usable_track, MediaStreamTrack};

/// MediaSender is the application handle of one outbound track.
///
/// It holds no engine state. Every operation that needs the engine is raised
/// as a directive to the coordinator that created the sender.
pub struct MediaSender {
    track_index: TrackIndex,
    kind: RTPCodecType,
    track: ArcSwap<Arc<dyn MediaStreamTrack>>,
    ended: AtomicBool,

    /// serializes the directives of replace, end and update_parameters.
    /// Argument checks run before it is taken.
    op_mu: Mutex<()>,

    directives: Arc<dyn DirectiveHandler>,
    log_target: String,
}

impl fmt::Debug for MediaSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSender")
            .field("track_index", &self.track_index)
            .field("kind", &self.kind)
            .field("ended", &self.ended())
            .finish()
    }
}

impl MediaSender {
    pub fn new(
        track_index: TrackIndex,
        track: Arc<dyn MediaStreamTrack>,
        directives: Arc<dyn DirectiveHandler>,
        log_target: &str,
    ) -> Self {
        MediaSender {
            track_index,
            kind: track.kind(),
            track: ArcSwap::from_pointee(track),
            ended: AtomicBool::new(false),
            op_mu: Mutex::new(()),
            directives,
            log_target: log_target.to_owned(),
        }
    }

    pub fn track_index(&self) -> TrackIndex {
        self.track_index
    }

    /// kind is the media kind of the sent track. It never changes since a
    /// replacement track must be of the same kind.
    pub fn kind(&self) -> RTPCodecType {
        self.kind
    }

    /// track returns the track currently being sent.
    pub fn track(&self) -> Arc<dyn MediaStreamTrack> {
        let current = self.track.load();
        let track: &Arc<dyn MediaStreamTrack> = &current;
        Arc::clone(track)
    }

    pub fn ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// replace swaps the sent track for `track` without renegotiation.
    ///
    /// The handle adopts `track` only after the coordinator confirmed the
    /// swap. On failure the current track is left untouched.
    pub async fn replace(&self, track: Arc<dyn MediaStreamTrack>) -> Result<()> {
        self.check_replace(&track)?;

        let _guard = self.op_mu.lock().await;
        // a replace or end may have completed while waiting for the lock
        self.check_replace(&track)?;

        let current = self.track();

        log::debug!(
            target: self.log_target.as_str(),
            "replace track {} with {} on sender {}",
            current.id(),
            track.id(),
            self.track_index
        );

        let track_index = self.track_index;
        let next = Arc::clone(&track);
        raise(&self.directives, move |done| Directive::Replace {
            track_index,
            track: next,
            done,
        })
        .await?;

        self.track.store(Arc::new(track));
        Ok(())
    }

    /// end stops sending and releases the sender. A failed end leaves the
    /// sender usable.
    pub async fn end(&self) -> Result<()> {
        if self.ended() {
            return Err(Error::ErrAlreadyEnded);
        }

        let _guard = self.op_mu.lock().await;
        if self.ended() {
            return Err(Error::ErrAlreadyEnded);
        }

        log::debug!(target: self.log_target.as_str(), "end sender {}", self.track_index);

        let track_index = self.track_index;
        raise(&self.directives, move |done| Directive::End { track_index, done }).await?;

        self.ended.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// get_parameters returns the parameters the engine currently applies to
    /// this sender.
    pub async fn get_parameters(&self) -> Result<RTCRtpSendParameters> {
        if self.ended() {
            return Err(Error::ErrAlreadyEnded);
        }

        let track_index = self.track_index;
        raise(&self.directives, move |done| Directive::GetParameters {
            track_index,
            done,
        })
        .await
    }

    /// update_parameters lets the coordinator read the current parameters,
    /// run them through `transform` and commit the result.
    pub async fn update_parameters<F>(&self, transform: F) -> Result<()>
    where
        F: FnOnce(RTCRtpSendParameters) -> RTCRtpSendParameters + Send + Sync + 'static,
    {
        if self.ended() {
            return Err(Error::ErrAlreadyEnded);
        }

        let _guard = self.op_mu.lock().await;
        if self.ended() {
            return Err(Error::ErrAlreadyEnded);
        }

        log::debug!(
            target: self.log_target.as_str(),
            "update parameters of sender {}",
            self.track_index
        );

        let track_index = self.track_index;
        raise(&self.directives, move |done| Directive::UpdateParameters {
            track_index,
            transform: Box::new(transform),
            done,
        })
        .await
    }

    pub async fn get_stats(&self) -> Result<StatsReport> {
        if self.ended() {
            return Err(Error::ErrAlreadyEnded);
        }

        let track_index = self.track_index;
        raise(&self.directives, move |done| Directive::SenderStats {
            track_index,
            done,
        })
        .await
    }

    fn check_replace(&self, track: &Arc<dyn MediaStreamTrack>) -> Result<()> {
        if self.ended() {
            return Err(Error::ErrAlreadyEnded);
        }
        if !is_usable_track(track) {
            return Err(Error::ErrInvalidTrack);
        }
        let current = self.track();
        if is_same_track(&current, track) {
            return Err(Error::ErrNoOpReplace);
        }
        if track.kind() != current.kind() {
            return Err(Error::ErrKindMismatch);
        }
        Ok(())
    }

    /// set_ended marks the sender ended without asking the coordinator,
    /// used when the coordinator itself goes away.
    pub(crate) fn set_ended(&self) {
        if !self.ended.swap(true, Ordering::SeqCst) {
            log::trace!(target: self.log_target.as_str(), "sender {} ended", self.track_index);
        }
    }
}
