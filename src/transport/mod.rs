
pub mod connection_state;
pub mod negotiation;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use portable_atomic::{AtomicBool, AtomicU8};
use tokio::sync::Mutex;

use crate::data_channel::data_channel_init::RTCDataChannelInit;
use crate::data_channel::{DataChannelEventHandler, DataChannelMessage};
use crate::data_handler::DataHandler;
use crate::engine::{EngineEventHandler, PeerConnectionEngine, RemoteTrack};
use crate::error::{flatten_errs, Error, OnErrorHdlrFn, Result};
use crate::ice_transport::ice_candidate::RTCIceCandidateInit;
use crate::ice_transport::ice_connection_state::RTCIceConnectionState;
use crate::ice_transport::ice_server::RTCIceServer;
use crate::media_handler::MediaHandler;
use crate::peer_connection::offer_answer_options::RTCOfferOptions;
use crate::peer_connection::peer_connection_state::RTCPeerConnectionState;
use crate::peer_connection::sdp::sdp_type::RTCSdpType;
use crate::peer_connection::sdp::session_description::RTCSessionDescription;
use crate::signaling::{SignalMessage, SignalingChannel};
use crate::stats::{StatsReport, StatsSelector};
use connection_state::{next_connection_state, ConnectionState, ConnectivitySignal};
use negotiation::NegotiationPayload;

pub(crate) const DEFAULT_LOG_TARGET: &str = "simple_p2p";
pub(crate) const DEFAULT_SIGNALING_LABEL: &str = "signaling";

pub type OnConnectionStateChangeHdlrFn = Box<
    dyn (FnMut(ConnectionState) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnNegotiationHdlrFn = Box<
    dyn (FnMut(NegotiationPayload) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>)
        + Send
        + Sync,
>;

pub type OnOpenHdlrFn =
    Box<dyn (FnMut() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

pub type OnCloseHdlrFn =
    Box<dyn (FnMut() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

/// TransportBuilder configures how a [`Transport`] is set up on top of an
/// engine.
pub struct TransportBuilder {
    log_target: String,
    signaling_label: String,
    signaling_id: u16,
    in_band_negotiation: bool,
}

impl Default for TransportBuilder {
    fn default() -> Self {
        TransportBuilder {
            log_target: DEFAULT_LOG_TARGET.to_owned(),
            signaling_label: DEFAULT_SIGNALING_LABEL.to_owned(),
            signaling_id: 0,
            in_band_negotiation: false,
        }
    }
}

impl TransportBuilder {
    pub fn new() -> Self {
        TransportBuilder::default()
    }

    /// with_log_target sets the log target prefix every component of the
    /// transport logs under.
    pub fn with_log_target(mut self, log_target: &str) -> Self {
        self.log_target = log_target.to_owned();
        self
    }

    pub fn with_signaling_label(mut self, label: &str) -> Self {
        self.signaling_label = label.to_owned();
        self
    }

    /// with_signaling_id sets the stream id of the pre-negotiated signaling
    /// channel. Both peers must use the same id.
    pub fn with_signaling_id(mut self, id: u16) -> Self {
        self.signaling_id = id;
        self
    }

    /// with_in_band_negotiation sends negotiation payloads over the signaling
    /// channel once it is open, instead of handing them to `on_negotiation`.
    pub fn with_in_band_negotiation(mut self, in_band: bool) -> Self {
        self.in_band_negotiation = in_band;
        self
    }

    pub async fn build(self, engine: Arc<dyn PeerConnectionEngine>) -> Result<Transport> {
        let data_channel = engine
            .create_data_channel(
                &self.signaling_label,
                Some(RTCDataChannelInit::pre_negotiated(self.signaling_id)),
            )
            .await?;

        let signaling = Arc::new(SignalingChannel::new(
            data_channel,
            &format!("{}::signaling", self.log_target),
        ));
        let media_handler = Arc::new(MediaHandler::new(
            Arc::clone(&engine),
            Arc::clone(&signaling),
            &self.log_target,
        ));
        let data_handler = Arc::new(DataHandler::new(Arc::clone(&signaling), &self.log_target));

        let internal = Arc::new(TransportInternal {
            engine,
            signaling,
            media_handler,
            data_handler,
            in_band_negotiation: self.in_band_negotiation,
            connection_state: AtomicU8::new(ConnectionState::New as u8),
            is_closed: AtomicBool::new(false),
            on_connection_state_change_handler: ArcSwapOption::empty(),
            on_negotiation_handler: ArcSwapOption::empty(),
            on_open_handler: ArcSwapOption::empty(),
            on_close_handler: ArcSwapOption::empty(),
            on_error_handler: ArcSwapOption::empty(),
            log_target: format!("{}::transport", self.log_target),
        });

        internal
            .engine
            .set_event_handler(Some(Arc::new(EngineEvents {
                internal: Arc::downgrade(&internal),
            })));
        internal.signaling.attach(Arc::new(SignalingEvents {
            internal: Arc::downgrade(&internal),
        }));

        log::debug!(
            target: internal.log_target.as_str(),
            "transport created with signaling channel {}",
            internal.signaling.label()
        );

        Ok(Transport { internal })
    }
}

/// Transport runs session negotiation over a peer connection engine and
/// reconciles the engine's connectivity signals into one connection state.
pub struct Transport {
    internal: Arc<TransportInternal>,
}

struct TransportInternal {
    engine: Arc<dyn PeerConnectionEngine>,
    signaling: Arc<SignalingChannel>,
    media_handler: Arc<MediaHandler>,
    data_handler: Arc<DataHandler>,
    in_band_negotiation: bool,

    connection_state: AtomicU8,
    is_closed: AtomicBool,

    on_connection_state_change_handler: ArcSwapOption<Mutex<OnConnectionStateChangeHdlrFn>>,
    on_negotiation_handler: ArcSwapOption<Mutex<OnNegotiationHdlrFn>>,
    on_open_handler: ArcSwapOption<Mutex<OnOpenHdlrFn>>,
    on_close_handler: ArcSwapOption<Mutex<OnCloseHdlrFn>>,
    on_error_handler: ArcSwapOption<Mutex<OnErrorHdlrFn>>,

    log_target: String,
}

impl Transport {
    /// new creates a transport with the default settings of [`TransportBuilder`].
    pub async fn new(engine: Arc<dyn PeerConnectionEngine>) -> Result<Self> {
        TransportBuilder::new().build(engine).await
    }

    /// on_connection_state_change sets an event handler which is invoked
    /// with every distinct connection state the transport moves to.
    ///
    /// The handler runs while state changes are being delivered, so it must
    /// not await calls back into the transport such as `close`. Spawn them
    /// instead.
    pub fn on_connection_state_change(&self, f: OnConnectionStateChangeHdlrFn) {
        self.internal
            .on_connection_state_change_handler
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_negotiation sets an event handler which is invoked with every
    /// payload the application has to relay to the remote transport.
    pub fn on_negotiation(&self, f: OnNegotiationHdlrFn) {
        self.internal
            .on_negotiation_handler
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_open sets an event handler which is invoked when the signaling
    /// channel opens.
    pub fn on_open(&self, f: OnOpenHdlrFn) {
        self.internal
            .on_open_handler
            .store(Some(Arc::new(Mutex::new(f))));
    }

    /// on_close sets an event handler which is invoked once the transport
    /// closed.
    pub fn on_close(&self, f: OnCloseHdlrFn) {
        self.internal
            .on_close_handler
            .store(Some(Arc::new(Mutex::new(f))));
    }

    pub fn on_error(&self, f: OnErrorHdlrFn) {
        self.internal
            .on_error_handler
            .store(Some(Arc::new(Mutex::new(f))));
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.internal.connection_state()
    }

    pub fn is_closed(&self) -> bool {
        self.internal.is_closed()
    }

    pub fn media_handler(&self) -> Arc<MediaHandler> {
        Arc::clone(&self.internal.media_handler)
    }

    pub fn data_handler(&self) -> Arc<DataHandler> {
        Arc::clone(&self.internal.data_handler)
    }

    /// start_negotiation commits a new local offer and emits it.
    pub async fn start_negotiation(&self, ice_restart: bool) -> Result<()> {
        self.internal.start_negotiation(ice_restart).await
    }

    /// handle_negotiation applies a payload received from the remote
    /// transport. Payloads of unknown type are discarded.
    pub async fn handle_negotiation(&self, payload: NegotiationPayload) -> Result<()> {
        self.internal.handle_negotiation(payload).await
    }

    /// restart_ice starts a negotiation which forces new ICE credentials.
    pub async fn restart_ice(&self) -> Result<()> {
        log::debug!(target: self.internal.log_target.as_str(), "restart_ice()");
        self.internal.start_negotiation(true).await
    }

    /// update_ice_servers replaces the ICE servers of the engine
    /// configuration.
    pub async fn update_ice_servers(&self, ice_servers: Vec<RTCIceServer>) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }
        if !self.internal.engine.can_set_configuration() {
            return Err(Error::ErrUnsupportedOperation);
        }
        for server in &ice_servers {
            server.validate()?;
        }

        log::debug!(
            target: self.internal.log_target.as_str(),
            "update_ice_servers() with {} servers",
            ice_servers.len()
        );

        let mut configuration = self.internal.engine.get_configuration().await;
        configuration.ice_servers = ice_servers;
        self.internal.engine.set_configuration(configuration).await
    }

    /// get_stats returns the engine's statistics for the whole session.
    pub async fn get_stats(&self) -> Result<StatsReport> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        self.internal.engine.get_stats(StatsSelector::None).await
    }

    /// close detaches from the engine, ends every track handle and closes
    /// the engine. Closing a closed transport does nothing.
    pub async fn close(&self) -> Result<()> {
        if self.internal.is_closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        log::debug!(target: self.internal.log_target.as_str(), "close()");

        self.internal
            .transition(|previous| {
                (previous != ConnectionState::Closed).then_some(ConnectionState::Closed)
            })
            .await;

        self.internal.engine.set_event_handler(None);
        self.internal.signaling.detach();

        self.internal.media_handler.close().await;
        self.internal.data_handler.close();

        let mut close_errs = vec![];

        if let Err(err) = self.internal.signaling.close().await {
            close_errs.push(Error::new(format!("signaling channel: {err}")));
        }

        if let Err(err) = self.internal.engine.close().await {
            close_errs.push(Error::new(format!("engine: {err}")));
        }

        self.internal.do_close().await;

        flatten_errs(close_errs)
    }
}

impl TransportInternal {
    fn connection_state(&self) -> ConnectionState {
        self.connection_state.load(Ordering::SeqCst).into()
    }

    fn is_closed(&self) -> bool {
        self.is_closed.load(Ordering::SeqCst)
    }

    /// transition moves the connection state to `next(previous)` and emits
    /// it, unless `next` declines the move.
    async fn transition<F>(&self, next: F)
    where
        F: Fn(ConnectionState) -> Option<ConnectionState>,
    {
        let mut previous = self.connection_state();
        let state = loop {
            let Some(state) = next(previous) else {
                return;
            };
            match self.connection_state.compare_exchange(
                previous as u8,
                state as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break state,
                Err(actual) => previous = actual.into(),
            }
        };

        log::info!(
            target: self.log_target.as_str(),
            "connection state changed: {previous} -> {state}"
        );
        self.do_connection_state_change(state).await;
    }

    async fn update_connection_state(&self, signal: ConnectivitySignal) {
        log::debug!(target: self.log_target.as_str(), "{signal}");
        self.transition(|previous| next_connection_state(signal, previous))
            .await;
    }

    async fn start_negotiation(&self, ice_restart: bool) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        log::debug!(
            target: self.log_target.as_str(),
            "start_negotiation(ice_restart={ice_restart})"
        );

        let offer = self
            .engine
            .create_offer(Some(RTCOfferOptions::with_ice_restart(ice_restart)))
            .await?;
        self.engine.set_local_description(offer).await?;

        let offer = self
            .engine
            .local_description()
            .await
            .ok_or(Error::ErrOfferGenerationFailed)?;

        log::debug!(target: self.log_target.as_str(), "emit offer SDP");
        log::trace!(target: self.log_target.as_str(), "{}", offer.sdp);
        self.emit_negotiation(NegotiationPayload::Offer(offer)).await;
        Ok(())
    }

    async fn handle_negotiation(&self, payload: NegotiationPayload) -> Result<()> {
        if self.is_closed() {
            log::debug!(
                target: self.log_target.as_str(),
                "ignore {payload} payload after close"
            );
            return Ok(());
        }

        log::debug!(target: self.log_target.as_str(), "handle_negotiation({payload})");
        match payload {
            NegotiationPayload::Candidate(candidate) => self.handle_candidate(candidate).await,
            NegotiationPayload::Offer(offer) => self.handle_offer(offer).await,
            NegotiationPayload::Answer(answer) => self.handle_answer(answer).await,
            NegotiationPayload::Unknown(payload_type) => {
                log::warn!(
                    target: self.log_target.as_str(),
                    "undefined payload type {payload_type}, discard"
                );
                Ok(())
            }
        }
    }

    async fn handle_offer(&self, offer: RTCSessionDescription) -> Result<()> {
        if offer.sdp_type != RTCSdpType::Offer {
            return Err(Error::ErrNotAnOffer);
        }

        log::trace!(target: self.log_target.as_str(), "{}", offer.sdp);

        let engine = &self.engine;
        tokio::try_join!(engine.set_remote_description(offer), async {
            let answer = engine.create_answer().await?;
            engine.set_local_description(answer).await
        })?;

        let answer = self
            .engine
            .local_description()
            .await
            .ok_or(Error::ErrAnswerGenerationFailed)?;

        log::debug!(target: self.log_target.as_str(), "emit answer SDP");
        log::trace!(target: self.log_target.as_str(), "{}", answer.sdp);
        self.emit_negotiation(NegotiationPayload::Answer(answer)).await;
        Ok(())
    }

    async fn handle_answer(&self, answer: RTCSessionDescription) -> Result<()> {
        if answer.sdp_type != RTCSdpType::Answer {
            return Err(Error::ErrNotAnAnswer);
        }

        log::trace!(target: self.log_target.as_str(), "{}", answer.sdp);
        self.engine.set_remote_description(answer).await
    }

    async fn handle_candidate(&self, candidate: RTCIceCandidateInit) -> Result<()> {
        log::trace!(target: self.log_target.as_str(), "{}", candidate.candidate);
        self.engine.add_ice_candidate(candidate).await
    }

    async fn handle_local_candidate(&self, candidate: Option<RTCIceCandidateInit>) {
        // None and "" both only mark the end of gathering
        let Some(candidate) = candidate.filter(|c| !c.is_end_of_candidates()) else {
            log::trace!(target: self.log_target.as_str(), "end of candidates");
            return;
        };

        self.emit_negotiation(NegotiationPayload::Candidate(candidate))
            .await;
    }

    async fn emit_negotiation(&self, payload: NegotiationPayload) {
        if self.in_band_negotiation && self.signaling.is_open() {
            let msg = SignalMessage::Negotiation {
                payload: payload.clone(),
            };
            match self.signaling.send(&msg).await {
                Ok(()) => return,
                Err(err) => log::warn!(
                    target: self.log_target.as_str(),
                    "failed to send {payload} in band, fall back to handler: {err}"
                ),
            }
        }

        self.do_negotiation(payload).await;
    }

    async fn handle_signal(&self, msg: DataChannelMessage) {
        let signal = match SignalMessage::decode(&msg) {
            Ok(signal) => signal,
            Err(err) => {
                log::warn!(
                    target: self.log_target.as_str(),
                    "discard undecodable signal: {err}"
                );
                return;
            }
        };

        match signal {
            SignalMessage::Negotiation { payload } => {
                if let Err(err) = self.handle_negotiation(payload).await {
                    log::warn!(
                        target: self.log_target.as_str(),
                        "failed to handle in-band negotiation: {err}"
                    );
                    self.do_error(err).await;
                }
            }
            SignalMessage::Media {
                action,
                track_index,
            } => {
                self.media_handler
                    .handle_remote_control(action, track_index)
                    .await
            }
            SignalMessage::Data { payload } => self.data_handler.handle_remote_data(payload).await,
        }
    }

    async fn do_connection_state_change(&self, state: ConnectionState) {
        if let Some(handler) = &*self.on_connection_state_change_handler.load() {
            let mut f = handler.lock().await;
            f(state).await;
        }
    }

    async fn do_negotiation(&self, payload: NegotiationPayload) {
        if let Some(handler) = &*self.on_negotiation_handler.load() {
            let mut f = handler.lock().await;
            f(payload).await;
        } else {
            log::warn!(
                target: self.log_target.as_str(),
                "no negotiation handler, {payload} payload dropped"
            );
        }
    }

    async fn do_open(&self) {
        if let Some(handler) = &*self.on_open_handler.load() {
            let mut f = handler.lock().await;
            f().await;
        }
    }

    async fn do_close(&self) {
        if let Some(handler) = &*self.on_close_handler.load() {
            let mut f = handler.lock().await;
            f().await;
        }
    }

    async fn do_error(&self, err: Error) {
        if let Some(handler) = &*self.on_error_handler.load() {
            let mut f = handler.lock().await;
            f(err).await;
        }
    }
}

/// EngineEvents routes engine events to the transport without keeping it
/// alive.
struct EngineEvents {
    internal: Weak<TransportInternal>,
}

#[async_trait]
impl EngineEventHandler for EngineEvents {
    async fn on_ice_candidate(&self, candidate: Option<RTCIceCandidateInit>) {
        if let Some(internal) = self.internal.upgrade() {
            internal.handle_local_candidate(candidate).await;
        }
    }

    async fn on_ice_connection_state_change(&self, state: RTCIceConnectionState) {
        if let Some(internal) = self.internal.upgrade() {
            internal
                .update_connection_state(ConnectivitySignal::Ice(state))
                .await;
        }
    }

    async fn on_connection_state_change(&self, state: RTCPeerConnectionState) {
        if let Some(internal) = self.internal.upgrade() {
            internal
                .update_connection_state(ConnectivitySignal::Connection(state))
                .await;
        }
    }

    async fn on_track(&self, track: RemoteTrack) {
        if let Some(internal) = self.internal.upgrade() {
            internal.media_handler.handle_remote_track(track).await;
        }
    }
}

/// SignalingEvents routes signaling channel events to the transport.
struct SignalingEvents {
    internal: Weak<TransportInternal>,
}

#[async_trait]
impl DataChannelEventHandler for SignalingEvents {
    async fn on_open(&self) {
        if let Some(internal) = self.internal.upgrade() {
            log::debug!(target: internal.log_target.as_str(), "signaling channel open");
            internal.do_open().await;
        }
    }

    async fn on_message(&self, msg: DataChannelMessage) {
        if let Some(internal) = self.internal.upgrade() {
            internal.handle_signal(msg).await;
        }
    }

    async fn on_error(&self, err: Error) {
        if let Some(internal) = self.internal.upgrade() {
            log::warn!(target: internal.log_target.as_str(), "signaling channel error: {err}");
            internal.do_error(err).await;
        }
    }

    async fn on_close(&self) {
        if let Some(internal) = self.internal.upgrade() {
            if internal.is_closed() {
                return;
            }
            log::warn!(
                target: internal.log_target.as_str(),
                "signaling channel closed while transport is open"
            );
            internal.do_error(Error::ErrSignalingChannelNotOpen).await;
        }
    }
}
