#[cfg(test)]
mod media_handler_test;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use portable_atomic::{AtomicBool, AtomicUsize};
use tokio::sync::Mutex;

use crate::engine::{PeerConnectionEngine, RemoteTrack};
use crate::error::{Error, Result};
use crate::rtp_transceiver::directive::{Directive, DirectiveHandler, ParametersTransform};
use crate::rtp_transceiver::rtp_receiver::MediaReceiver;
use crate::rtp_transceiver::rtp_sender::MediaSender;
use crate::rtp_transceiver::{RTCRtpReceiverId, RTCRtpSendParameters, RTCRtpSenderId, TrackIndex};
use crate::signaling::{MediaAction, SignalMessage, SignalingChannel};
use crate::stats::{StatsReport, StatsSelector};
use crate::track::{is_usable_track, MediaStreamTrack};

pub type OnReceiverHdlrFn = Box<
    dyn (FnMut(Arc<MediaReceiver>) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

struct SenderEntry {
    sender_id: RTCRtpSenderId,
    sender: Arc<MediaSender>,
}

struct ReceiverEntry {
    receiver_id: RTCRtpReceiverId,
    receiver: Arc<MediaReceiver>,
}

/// MediaHandler owns the media track handles of a transport and executes
/// the directives they raise against the engine.
pub struct MediaHandler {
    internal: Arc<MediaHandlerInternal>,
}

struct MediaHandlerInternal {
    engine: Arc<dyn PeerConnectionEngine>,
    signaling: Arc<SignalingChannel>,

    next_track_index: AtomicUsize,
    senders: Mutex<HashMap<TrackIndex, SenderEntry>>,
    receivers: Mutex<HashMap<TrackIndex, ReceiverEntry>>,
    is_closed: AtomicBool,

    on_receiver_handler: ArcSwapOption<Mutex<OnReceiverHdlrFn>>,

    log_target: String,
    sender_log_target: String,
    receiver_log_target: String,
}

/// DirectiveRouter is the coordinator reference handed to track handles.
/// It does not keep the handler alive.
struct DirectiveRouter {
    internal: Weak<MediaHandlerInternal>,
}

#[async_trait]
impl DirectiveHandler for DirectiveRouter {
    async fn handle_directive(&self, directive: Directive) {
        match self.internal.upgrade() {
            Some(internal) => internal.execute(directive).await,
            None => directive.reject(Error::ErrConnectionClosed),
        }
    }
}

impl MediaHandler {
    pub(crate) fn new(
        engine: Arc<dyn PeerConnectionEngine>,
        signaling: Arc<SignalingChannel>,
        log_target: &str,
    ) -> Self {
        MediaHandler {
            internal: Arc::new(MediaHandlerInternal {
                engine,
                signaling,
                next_track_index: AtomicUsize::new(0),
                senders: Mutex::new(HashMap::new()),
                receivers: Mutex::new(HashMap::new()),
                is_closed: AtomicBool::new(false),
                on_receiver_handler: ArcSwapOption::empty(),
                log_target: format!("{log_target}::media"),
                sender_log_target: format!("{log_target}::sender"),
                receiver_log_target: format!("{log_target}::receiver"),
            }),
        }
    }

    pub(crate) fn directive_handler(&self) -> Arc<dyn DirectiveHandler> {
        Arc::new(DirectiveRouter {
            internal: Arc::downgrade(&self.internal),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.internal.is_closed.load(Ordering::SeqCst)
    }

    /// on_receiver sets an event handler which is invoked when the remote
    /// peer starts sending a track.
    pub fn on_receiver(&self, f: OnReceiverHdlrFn) {
        self.internal
            .on_receiver_handler
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// add_track starts sending `track` and returns its sender.
    pub async fn add_track(&self, track: Arc<dyn MediaStreamTrack>) -> Result<Arc<MediaSender>> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }
        if !is_usable_track(&track) {
            return Err(Error::ErrInvalidTrack);
        }

        let track_index = self.internal.next_track_index.fetch_add(1, Ordering::SeqCst);
        let sender_id = self
            .internal
            .engine
            .add_track(Arc::clone(&track), track_index)
            .await?;

        log::info!(
            target: self.internal.log_target.as_str(),
            "add {} track {} as sender {}",
            track.kind(),
            track.id(),
            track_index
        );

        let sender = Arc::new(MediaSender::new(
            track_index,
            track,
            self.directive_handler(),
            &self.internal.sender_log_target,
        ));

        let mut senders = self.internal.senders.lock().await;
        senders.insert(
            track_index,
            SenderEntry {
                sender_id,
                sender: Arc::clone(&sender),
            },
        );

        Ok(sender)
    }

    /// senders returns the live senders ordered by track index.
    pub async fn senders(&self) -> Vec<Arc<MediaSender>> {
        let senders = self.internal.senders.lock().await;
        let mut senders: Vec<Arc<MediaSender>> =
            senders.values().map(|e| Arc::clone(&e.sender)).collect();
        senders.sort_by_key(|s| s.track_index());
        senders
    }

    /// receivers returns the live receivers ordered by track index.
    pub async fn receivers(&self) -> Vec<Arc<MediaReceiver>> {
        let receivers = self.internal.receivers.lock().await;
        let mut receivers: Vec<Arc<MediaReceiver>> =
            receivers.values().map(|e| Arc::clone(&e.receiver)).collect();
        receivers.sort_by_key(|r| r.track_index());
        receivers
    }

    pub async fn sender(&self, track_index: TrackIndex) -> Option<Arc<MediaSender>> {
        let senders = self.internal.senders.lock().await;
        senders.get(&track_index).map(|e| Arc::clone(&e.sender))
    }

    pub async fn receiver(&self, track_index: TrackIndex) -> Option<Arc<MediaReceiver>> {
        let receivers = self.internal.receivers.lock().await;
        receivers.get(&track_index).map(|e| Arc::clone(&e.receiver))
    }

    /// handle_remote_track creates the receiver of a track the remote peer
    /// started sending.
    pub(crate) async fn handle_remote_track(&self, remote: RemoteTrack) {
        if self.is_closed() {
            log::debug!(
                target: self.internal.log_target.as_str(),
                "ignore remote track {} after close",
                remote.track_index
            );
            return;
        }

        let receiver = Arc::new(MediaReceiver::new(
            remote.track_index,
            remote.track,
            self.directive_handler(),
            &self.internal.receiver_log_target,
        ));

        log::info!(
            target: self.internal.log_target.as_str(),
            "add {} receiver {}",
            receiver.kind(),
            remote.track_index
        );

        let previous = {
            let mut receivers = self.internal.receivers.lock().await;
            receivers.insert(
                remote.track_index,
                ReceiverEntry {
                    receiver_id: remote.receiver_id,
                    receiver: Arc::clone(&receiver),
                },
            )
        };
        if let Some(previous) = previous {
            previous.receiver.set_ended();
        }

        if let Some(handler) = &*self.internal.on_receiver_handler.load() {
            let mut f = handler.lock().await;
            f(receiver).await;
        }
    }

    /// handle_remote_control applies a remote sender's notification to the
    /// matching receiver.
    pub(crate) async fn handle_remote_control(&self, action: MediaAction, track_index: TrackIndex) {
        let receiver = match action {
            MediaAction::Replace => self.receiver(track_index).await,
            MediaAction::End => {
                let mut receivers = self.internal.receivers.lock().await;
                receivers.remove(&track_index).map(|e| e.receiver)
            }
        };

        let Some(receiver) = receiver else {
            log::debug!(
                target: self.internal.log_target.as_str(),
                "discard remote {action} for unknown receiver {track_index}"
            );
            return;
        };

        match action {
            MediaAction::Replace => receiver.replaced_by_sender().await,
            MediaAction::End => receiver.ended_by_sender().await,
        }
    }

    /// close marks every sender and receiver ended. Directives in flight are
    /// left to finish.
    pub(crate) async fn close(&self) {
        if self.internal.is_closed.swap(true, Ordering::SeqCst) {
            return;
        }

        log::debug!(target: self.internal.log_target.as_str(), "close");

        {
            let mut senders = self.internal.senders.lock().await;
            for entry in senders.values() {
                entry.sender.set_ended();
            }
            senders.clear();
        }
        {
            let mut receivers = self.internal.receivers.lock().await;
            for entry in receivers.values() {
                entry.receiver.set_ended();
            }
            receivers.clear();
        }
    }
}

impl MediaHandlerInternal {
    async fn execute(&self, directive: Directive) {
        log::debug!(target: self.log_target.as_str(), "execute {directive}");

        if self.is_closed.load(Ordering::SeqCst) {
            directive.reject(Error::ErrConnectionClosed);
            return;
        }

        match directive {
            Directive::Replace {
                track_index,
                track,
                done,
            } => done.settle(self.replace_track(track_index, track).await),
            Directive::End { track_index, done } => done.settle(self.end_track(track_index).await),
            Directive::GetParameters { track_index, done } => {
                done.settle(self.get_parameters(track_index).await)
            }
            Directive::UpdateParameters {
                track_index,
                transform,
                done,
            } => done.settle(self.update_parameters(track_index, transform).await),
            Directive::SenderStats { track_index, done } => {
                done.settle(self.sender_stats(track_index).await)
            }
            Directive::ReceiverStats { track_index, done } => {
                done.settle(self.receiver_stats(track_index).await)
            }
        }
    }

    async fn sender_id(&self, track_index: TrackIndex) -> Result<RTCRtpSenderId> {
        let senders = self.senders.lock().await;
        senders
            .get(&track_index)
            .map(|e| e.sender_id)
            .ok_or(Error::ErrUnknownTrackIndex)
    }

    async fn receiver_id(&self, track_index: TrackIndex) -> Result<RTCRtpReceiverId> {
        let receivers = self.receivers.lock().await;
        receivers
            .get(&track_index)
            .map(|e| e.receiver_id)
            .ok_or(Error::ErrUnknownTrackIndex)
    }

    async fn replace_track(
        &self,
        track_index: TrackIndex,
        track: Arc<dyn MediaStreamTrack>,
    ) -> Result<()> {
        let sender_id = self.sender_id(track_index).await?;
        self.engine.replace_track(sender_id, track).await?;
        self.notify_remote(MediaAction::Replace, track_index).await;
        Ok(())
    }

    async fn end_track(&self, track_index: TrackIndex) -> Result<()> {
        let sender_id = self.sender_id(track_index).await?;
        self.engine.remove_track(sender_id).await?;
        {
            let mut senders = self.senders.lock().await;
            senders.remove(&track_index);
        }
        self.notify_remote(MediaAction::End, track_index).await;
        Ok(())
    }

    async fn get_parameters(&self, track_index: TrackIndex) -> Result<RTCRtpSendParameters> {
        let sender_id = self.sender_id(track_index).await?;
        self.engine.get_parameters(sender_id).await
    }

    async fn update_parameters(
        &self,
        track_index: TrackIndex,
        transform: ParametersTransform,
    ) -> Result<()> {
        let sender_id = self.sender_id(track_index).await?;
        let parameters = self.engine.get_parameters(sender_id).await?;
        self.engine
            .set_parameters(sender_id, transform(parameters))
            .await
    }

    async fn sender_stats(&self, track_index: TrackIndex) -> Result<StatsReport> {
        let sender_id = self.sender_id(track_index).await?;
        self.engine
            .get_stats(StatsSelector::Sender(sender_id))
            .await
    }

    async fn receiver_stats(&self, track_index: TrackIndex) -> Result<StatsReport> {
        let receiver_id = self.receiver_id(track_index).await?;
        self.engine
            .get_stats(StatsSelector::Receiver(receiver_id))
            .await
    }

    /// notify_remote tells the remote receiver about a local sender change.
    /// The local change already happened, so failures are only logged.
    async fn notify_remote(&self, action: MediaAction, track_index: TrackIndex) {
        let msg = SignalMessage::Media {
            action,
            track_index,
        };
        if let Err(err) = self.signaling.send(&msg).await {
            log::warn!(
                target: self.log_target.as_str(),
                "failed to notify remote {action} of sender {track_index}: {err}"
            );
        }
    }
}
