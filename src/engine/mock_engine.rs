//! In-memory engine used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use bytes::Bytes;
use portable_atomic::{AtomicBool, AtomicUsize};
use serde_json::json;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc;

use super::*;
use crate::data_channel::data_channel_state::RTCDataChannelState;
use crate::data_channel::{DataChannelEventHandler, DataChannelMessage};
use crate::peer_connection::sdp::sdp_type::RTCSdpType;

type SharedDataChannelHandler = Arc<Mutex<Option<Arc<dyn DataChannelEventHandler>>>>;

/// MockDataChannel delivers sent frames to its linked remote channel, in
/// order, from a background task.
pub(crate) struct MockDataChannel {
    label: String,
    id: Option<u16>,
    state: Mutex<RTCDataChannelState>,
    handler: SharedDataChannelHandler,
    remote: Mutex<Weak<MockDataChannel>>,
    inbound_tx: mpsc::UnboundedSender<DataChannelMessage>,
    sent: Mutex<Vec<String>>,
}

impl MockDataChannel {
    pub(crate) fn new(label: &str, id: Option<u16>) -> Arc<Self> {
        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<DataChannelMessage>();
        let handler: SharedDataChannelHandler = Arc::new(Mutex::new(None));

        let pump_handler = Arc::clone(&handler);
        tokio::spawn(async move {
            while let Some(msg) = inbound_rx.recv().await {
                let handler = pump_handler.lock().unwrap().clone();
                if let Some(handler) = handler {
                    handler.on_message(msg).await;
                }
            }
        });

        Arc::new(MockDataChannel {
            label: label.to_owned(),
            id,
            state: Mutex::new(RTCDataChannelState::Connecting),
            handler,
            remote: Mutex::new(Weak::new()),
            inbound_tx,
            sent: Mutex::new(vec![]),
        })
    }

    fn handler(&self) -> Option<Arc<dyn DataChannelEventHandler>> {
        self.handler.lock().unwrap().clone()
    }

    /// link connects two channels so that frames sent on one arrive on the
    /// other, then opens both.
    pub(crate) async fn link(a: &Arc<MockDataChannel>, b: &Arc<MockDataChannel>) {
        *a.remote.lock().unwrap() = Arc::downgrade(b);
        *b.remote.lock().unwrap() = Arc::downgrade(a);
        a.open().await;
        b.open().await;
    }

    pub(crate) async fn open(&self) {
        *self.state.lock().unwrap() = RTCDataChannelState::Open;
        if let Some(handler) = self.handler() {
            handler.on_open().await;
        }
    }

    /// inject hands a frame to the local handler as if the remote sent it.
    pub(crate) fn inject(&self, text: &str) {
        let _ = self.inbound_tx.send(DataChannelMessage::text(text));
    }

    pub(crate) async fn fail(&self, err: Error) {
        if let Some(handler) = self.handler() {
            handler.on_error(err).await;
        }
    }

    /// sent returns every text frame sent so far.
    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataChannel for MockDataChannel {
    fn label(&self) -> &str {
        self.label.as_str()
    }

    fn id(&self) -> Option<u16> {
        self.id
    }

    fn ready_state(&self) -> RTCDataChannelState {
        *self.state.lock().unwrap()
    }

    async fn send_text(&self, text: String) -> Result<usize> {
        if self.ready_state() != RTCDataChannelState::Open {
            return Err(Error::ErrEngine("mock data channel not open".to_owned()));
        }

        self.sent.lock().unwrap().push(text.clone());
        let len = text.len();
        let remote = self.remote.lock().unwrap().upgrade();
        if let Some(remote) = remote {
            let _ = remote.inbound_tx.send(DataChannelMessage::text(&text));
        }
        Ok(len)
    }

    async fn send(&self, data: &Bytes) -> Result<usize> {
        if self.ready_state() != RTCDataChannelState::Open {
            return Err(Error::ErrEngine("mock data channel not open".to_owned()));
        }

        let remote = self.remote.lock().unwrap().upgrade();
        if let Some(remote) = remote {
            let _ = remote.inbound_tx.send(DataChannelMessage {
                is_string: false,
                data: data.clone(),
            });
        }
        Ok(data.len())
    }

    fn set_event_handler(&self, handler: Option<Arc<dyn DataChannelEventHandler>>) {
        *self.handler.lock().unwrap() = handler;
    }

    async fn close(&self) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            if *state == RTCDataChannelState::Closed {
                return Ok(());
            }
            *state = RTCDataChannelState::Closed;
        }
        if let Some(handler) = self.handler() {
            handler.on_close().await;
        }
        Ok(())
    }
}

#[derive(Default)]
struct MockSender {
    track: Option<Arc<dyn MediaStreamTrack>>,
    parameters: RTCRtpSendParameters,
}

/// MockEngine records every call, writes fake SDP and lets tests fire the
/// events a real engine would.
pub(crate) struct MockEngine {
    name: String,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashSet<&'static str>>,
    drop_local_description: AtomicBool,
    reconfigurable: AtomicBool,

    version: AtomicUsize,
    local_description: Mutex<Option<RTCSessionDescription>>,
    remote_description: Mutex<Option<RTCSessionDescription>>,
    configuration: Mutex<RTCConfiguration>,

    next_sender_id: AtomicUsize,
    senders: Mutex<HashMap<RTCRtpSenderId, MockSender>>,

    data_channel: Mutex<Option<Arc<MockDataChannel>>>,
    handler: Mutex<Option<Arc<dyn EngineEventHandler>>>,
}

impl MockEngine {
    pub(crate) fn new(name: &str) -> Arc<Self> {
        Arc::new(MockEngine {
            name: name.to_owned(),
            calls: Mutex::new(vec![]),
            failures: Mutex::new(HashSet::new()),
            drop_local_description: AtomicBool::new(false),
            reconfigurable: AtomicBool::new(true),
            version: AtomicUsize::new(0),
            local_description: Mutex::new(None),
            remote_description: Mutex::new(None),
            configuration: Mutex::new(RTCConfiguration::default()),
            next_sender_id: AtomicUsize::new(0),
            senders: Mutex::new(HashMap::new()),
            data_channel: Mutex::new(None),
            handler: Mutex::new(None),
        })
    }

    /// fail_on makes every later call of `op` fail with an engine error.
    pub(crate) fn fail_on(&self, op: &'static str) {
        self.failures.lock().unwrap().insert(op);
    }

    /// drop_local_descriptions makes the engine accept local descriptions
    /// without ever committing them.
    pub(crate) fn drop_local_descriptions(&self) {
        self.drop_local_description.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_reconfigurable(&self, reconfigurable: bool) {
        self.reconfigurable.store(reconfigurable, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.split('(').next() == Some(op))
            .count()
    }

    pub(crate) fn remote_description(&self) -> Option<RTCSessionDescription> {
        self.remote_description.lock().unwrap().clone()
    }

    pub(crate) fn data_channel(&self) -> Option<Arc<MockDataChannel>> {
        self.data_channel.lock().unwrap().clone()
    }

    pub(crate) fn sender_track(&self, sender: RTCRtpSenderId) -> Option<Arc<dyn MediaStreamTrack>> {
        self.senders
            .lock()
            .unwrap()
            .get(&sender)
            .and_then(|s| s.track.clone())
    }

    pub(crate) fn has_event_handler(&self) -> bool {
        self.handler.lock().unwrap().is_some()
    }

    fn record(&self, op: &'static str, arg: &str) -> Result<()> {
        let call = if arg.is_empty() {
            op.to_owned()
        } else {
            format!("{op}({arg})")
        };
        self.calls.lock().unwrap().push(call);

        if self.failures.lock().unwrap().contains(op) {
            Err(Error::ErrEngine(format!("mock {op} failure")))
        } else {
            Ok(())
        }
    }

    fn fake_description(&self, sdp_type: RTCSdpType, ice_restart: bool) -> RTCSessionDescription {
        let version = self.version.fetch_add(1, Ordering::SeqCst);
        let mut sdp = format!(
            "v=0\r\no=- {} {} IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n",
            self.name, version
        );
        if ice_restart {
            sdp.push_str("a=ice-options:restart\r\n");
        }
        RTCSessionDescription { sdp_type, sdp }
    }

    fn handler(&self) -> Option<Arc<dyn EngineEventHandler>> {
        self.handler.lock().unwrap().clone()
    }

    pub(crate) async fn fire_ice_connection_state(&self, state: RTCIceConnectionState) {
        if let Some(handler) = self.handler() {
            handler.on_ice_connection_state_change(state).await;
        }
    }

    pub(crate) async fn fire_connection_state(&self, state: RTCPeerConnectionState) {
        if let Some(handler) = self.handler() {
            handler.on_connection_state_change(state).await;
        }
    }

    pub(crate) async fn fire_ice_candidate(&self, candidate: Option<RTCIceCandidateInit>) {
        if let Some(handler) = self.handler() {
            handler.on_ice_candidate(candidate).await;
        }
    }

    pub(crate) async fn fire_track(&self, track: RemoteTrack) {
        if let Some(handler) = self.handler() {
            handler.on_track(track).await;
        }
    }
}

#[async_trait]
impl PeerConnectionEngine for MockEngine {
    async fn create_offer(
        &self,
        options: Option<RTCOfferOptions>,
    ) -> Result<RTCSessionDescription> {
        let ice_restart = options.map(|o| o.ice_restart).unwrap_or_default();
        self.record("create_offer", if ice_restart { "ice_restart" } else { "" })?;
        Ok(self.fake_description(RTCSdpType::Offer, ice_restart))
    }

    async fn create_answer(&self) -> Result<RTCSessionDescription> {
        self.record("create_answer", "")?;
        Ok(self.fake_description(RTCSdpType::Answer, false))
    }

    async fn set_local_description(&self, desc: RTCSessionDescription) -> Result<()> {
        self.record("set_local_description", &desc.sdp_type.to_string())?;
        if !self.drop_local_description.load(Ordering::SeqCst) {
            *self.local_description.lock().unwrap() = Some(desc);
        }
        Ok(())
    }

    async fn set_remote_description(&self, desc: RTCSessionDescription) -> Result<()> {
        self.record("set_remote_description", &desc.sdp_type.to_string())?;
        *self.remote_description.lock().unwrap() = Some(desc);
        Ok(())
    }

    async fn local_description(&self) -> Option<RTCSessionDescription> {
        self.local_description.lock().unwrap().clone()
    }

    async fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> Result<()> {
        self.record("add_ice_candidate", &candidate.candidate)
    }

    async fn get_configuration(&self) -> RTCConfiguration {
        self.configuration.lock().unwrap().clone()
    }

    fn can_set_configuration(&self) -> bool {
        self.reconfigurable.load(Ordering::SeqCst)
    }

    async fn set_configuration(&self, configuration: RTCConfiguration) -> Result<()> {
        self.record("set_configuration", "")?;
        *self.configuration.lock().unwrap() = configuration;
        Ok(())
    }

    async fn create_data_channel(
        &self,
        label: &str,
        options: Option<RTCDataChannelInit>,
    ) -> Result<Arc<dyn DataChannel>> {
        self.record("create_data_channel", label)?;
        let id = options.and_then(|o| o.negotiated);
        let data_channel = MockDataChannel::new(label, id);
        *self.data_channel.lock().unwrap() = Some(Arc::clone(&data_channel));
        Ok(data_channel)
    }

    async fn add_track(
        &self,
        track: Arc<dyn MediaStreamTrack>,
        track_index: TrackIndex,
    ) -> Result<RTCRtpSenderId> {
        self.record("add_track", &track_index.to_string())?;
        let id = RTCRtpSenderId(self.next_sender_id.fetch_add(1, Ordering::SeqCst));
        self.senders.lock().unwrap().insert(
            id,
            MockSender {
                track: Some(track),
                parameters: RTCRtpSendParameters {
                    transaction_id: format!("{}-{}", self.name, id.0),
                    encodings: vec![Default::default()],
                },
            },
        );
        Ok(id)
    }

    async fn replace_track(
        &self,
        sender: RTCRtpSenderId,
        track: Arc<dyn MediaStreamTrack>,
    ) -> Result<()> {
        self.record("replace_track", &sender.0.to_string())?;
        let mut senders = self.senders.lock().unwrap();
        let sender = senders
            .get_mut(&sender)
            .ok_or_else(|| Error::ErrEngine("no such sender".to_owned()))?;
        sender.track = Some(track);
        Ok(())
    }

    async fn remove_track(&self, sender: RTCRtpSenderId) -> Result<()> {
        self.record("remove_track", &sender.0.to_string())?;
        self.senders
            .lock()
            .unwrap()
            .remove(&sender)
            .map(|_| ())
            .ok_or_else(|| Error::ErrEngine("no such sender".to_owned()))
    }

    async fn get_parameters(&self, sender: RTCRtpSenderId) -> Result<RTCRtpSendParameters> {
        self.record("get_parameters", &sender.0.to_string())?;
        self.senders
            .lock()
            .unwrap()
            .get(&sender)
            .map(|s| s.parameters.clone())
            .ok_or_else(|| Error::ErrEngine("no such sender".to_owned()))
    }

    async fn set_parameters(
        &self,
        sender: RTCRtpSenderId,
        parameters: RTCRtpSendParameters,
    ) -> Result<()> {
        self.record("set_parameters", &sender.0.to_string())?;
        let mut senders = self.senders.lock().unwrap();
        let sender = senders
            .get_mut(&sender)
            .ok_or_else(|| Error::ErrEngine("no such sender".to_owned()))?;
        if sender.parameters.transaction_id != parameters.transaction_id {
            return Err(Error::ErrEngine("stale transaction id".to_owned()));
        }
        sender.parameters = parameters;
        Ok(())
    }

    async fn get_stats(&self, selector: StatsSelector) -> Result<StatsReport> {
        let mut report = StatsReport::default();
        match selector {
            StatsSelector::Sender(id) => {
                self.record("get_stats", &format!("sender {}", id.0))?;
                report.insert(
                    &format!("OT{}", id.0),
                    json!({"type": "outbound-rtp", "senderId": id.0}),
                );
            }
            StatsSelector::Receiver(id) => {
                self.record("get_stats", &format!("receiver {}", id.0))?;
                report.insert(
                    &format!("IT{}", id.0),
                    json!({"type": "inbound-rtp", "receiverId": id.0}),
                );
            }
            StatsSelector::None => {
                self.record("get_stats", "")?;
                report.insert("P", json!({"type": "peer-connection"}));
            }
        }
        Ok(report)
    }

    fn set_event_handler(&self, handler: Option<Arc<dyn EngineEventHandler>>) {
        *self.handler.lock().unwrap() = handler;
    }

    async fn close(&self) -> Result<()> {
        self.record("close", "")?;
        let data_channel = self.data_channel();
        if let Some(data_channel) = data_channel {
            data_channel.close().await?;
        }
        Ok(())
    }
}
