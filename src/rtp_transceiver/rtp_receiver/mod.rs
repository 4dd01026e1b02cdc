
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use portable_atomic::AtomicBool;
use tokio::sync::Mutex;

use super::directive::{raise, Directive, DirectiveHandler};
use super::TrackIndex;
use crate::error::{Error, Result};
use crate::stats::StatsReport;
use crate::track::track_kind::RTPCodecType;
use crate::track::MediaStreamTrack;

pub type OnReplaceHdlrFn =
    Box<dyn (FnMut() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

pub type OnEndedHdlrFn =
    Box<dyn (FnMut() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

/// MediaReceiver is the application handle of one inbound track.
pub struct MediaReceiver {
    track_index: TrackIndex,
    track: Arc<dyn MediaStreamTrack>,
    ended: AtomicBool,

    on_replace_handler: ArcSwapOption<Mutex<OnReplaceHdlrFn>>,
    on_ended_handler: ArcSwapOption<Mutex<OnEndedHdlrFn>>,

    directives: Arc<dyn DirectiveHandler>,
    log_target: String,
}

impl fmt::Debug for MediaReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaReceiver")
            .field("track_index", &self.track_index)
            .field("track", &self.track)
            .field("ended", &self.ended())
            .finish()
    }
}

impl MediaReceiver {
    pub fn new(
        track_index: TrackIndex,
        track: Arc<dyn MediaStreamTrack>,
        directives: Arc<dyn DirectiveHandler>,
        log_target: &str,
    ) -> Self {
        MediaReceiver {
            track_index,
            track,
            ended: AtomicBool::new(false),
            on_replace_handler: ArcSwapOption::empty(),
            on_ended_handler: ArcSwapOption::empty(),
            directives,
            log_target: log_target.to_owned(),
        }
    }

    /// track_index is the index the remote sender was given on its side.
    pub fn track_index(&self) -> TrackIndex {
        self.track_index
    }

    pub fn kind(&self) -> RTPCodecType {
        self.track.kind()
    }

    pub fn track(&self) -> Arc<dyn MediaStreamTrack> {
        Arc::clone(&self.track)
    }

    pub fn ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// on_replace sets an event handler which is invoked when the remote
    /// sender swapped the track feeding this receiver.
    pub fn on_replace(&self, f: OnReplaceHdlrFn) {
        self.on_replace_handler.store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_ended sets an event handler which is invoked when the remote
    /// sender ended.
    pub fn on_ended(&self, f: OnEndedHdlrFn) {
        self.on_ended_handler.store(Some(Arc::new(Mutex::new(f))));
    }

    pub async fn get_stats(&self) -> Result<StatsReport> {
        if self.ended() {
            return Err(Error::ErrAlreadyEnded);
        }

        let track_index = self.track_index;
        raise(&self.directives, move |done| Directive::ReceiverStats {
            track_index,
            done,
        })
        .await
    }

    pub(crate) async fn replaced_by_sender(&self) {
        if self.ended() {
            return;
        }

        log::debug!(
            target: self.log_target.as_str(),
            "remote sender {} replaced its track",
            self.track_index
        );

        if let Some(handler) = &*self.on_replace_handler.load() {
            let mut f = handler.lock().await;
            f().await;
        }
    }

    pub(crate) async fn ended_by_sender(&self) {
        if self.ended.swap(true, Ordering::SeqCst) {
            return;
        }

        log::debug!(
            target: self.log_target.as_str(),
            "remote sender {} ended",
            self.track_index
        );

        if let Some(handler) = &*self.on_ended_handler.load() {
            let mut f = handler.lock().await;
            f().await;
        }
    }

    /// set_ended marks the receiver ended without firing on_ended.
    pub(crate) fn set_ended(&self) {
        self.ended.store(true, Ordering::SeqCst);
    }
}
