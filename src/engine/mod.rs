//! Peer connection engine boundary
//!
//! The engine gathers ICE candidates, sets up DTLS/SRTP and writes SDP. This
//! crate only drives it through [`PeerConnectionEngine`] and listens to it
//! through [`EngineEventHandler`].

#[cfg(test)]
pub(crate) mod mock_engine;

use std::sync::Arc;

use async_trait::async_trait;

use crate::data_channel::data_channel_init::RTCDataChannelInit;
use crate::data_channel::DataChannel;
use crate::error::{Error, Result};
use crate::ice_transport::ice_candidate::RTCIceCandidateInit;
use crate::ice_transport::ice_connection_state::RTCIceConnectionState;
use crate::peer_connection::configuration::RTCConfiguration;
use crate::peer_connection::offer_answer_options::RTCOfferOptions;
use crate::peer_connection::peer_connection_state::RTCPeerConnectionState;
use crate::peer_connection::sdp::session_description::RTCSessionDescription;
use crate::rtp_transceiver::{RTCRtpReceiverId, RTCRtpSendParameters, RTCRtpSenderId, TrackIndex};
use crate::stats::{StatsReport, StatsSelector};
use crate::track::MediaStreamTrack;

/// RemoteTrack is a track the remote peer started sending.
#[derive(Debug, Clone)]
pub struct RemoteTrack {
    pub track: Arc<dyn MediaStreamTrack>,
    pub receiver_id: RTCRtpReceiverId,

    /// track_index is the index the remote coordinator gave its sender.
    pub track_index: TrackIndex,
}

/// Trait for handling engine events asynchronously
///
/// All methods have default no-op implementations.
#[async_trait]
pub trait EngineEventHandler: Send + Sync {
    /// Called with every gathered local candidate. `None` marks the end of
    /// gathering.
    async fn on_ice_candidate(&self, _candidate: Option<RTCIceCandidateInit>) {}

    /// Called when the ICE connection state changes
    async fn on_ice_connection_state_change(&self, _state: RTCIceConnectionState) {}

    /// Called when the peer connection state changes. Not every engine
    /// reports it.
    async fn on_connection_state_change(&self, _state: RTCPeerConnectionState) {}

    /// Called when a new remote track is received
    async fn on_track(&self, _track: RemoteTrack) {}
}

/// PeerConnectionEngine is the capability set consumed from the underlying
/// peer connection.
///
/// Failures are returned as [`Error`] values and are passed through to the
/// caller untouched.
#[async_trait]
pub trait PeerConnectionEngine: Send + Sync {
    async fn create_offer(&self, options: Option<RTCOfferOptions>)
        -> Result<RTCSessionDescription>;

    async fn create_answer(&self) -> Result<RTCSessionDescription>;

    async fn set_local_description(&self, desc: RTCSessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: RTCSessionDescription) -> Result<()>;

    /// local_description returns the description committed last, if any.
    async fn local_description(&self) -> Option<RTCSessionDescription>;

    async fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> Result<()>;

    async fn get_configuration(&self) -> RTCConfiguration;

    /// can_set_configuration reports whether the engine accepts a new
    /// configuration once it is running.
    fn can_set_configuration(&self) -> bool {
        false
    }

    async fn set_configuration(&self, _configuration: RTCConfiguration) -> Result<()> {
        Err(Error::ErrUnsupportedOperation)
    }

    async fn create_data_channel(
        &self,
        label: &str,
        options: Option<RTCDataChannelInit>,
    ) -> Result<Arc<dyn DataChannel>>;

    /// add_track starts sending `track`. `track_index` is announced to the
    /// remote peer so it can address the matching receiver.
    async fn add_track(
        &self,
        track: Arc<dyn MediaStreamTrack>,
        track_index: TrackIndex,
    ) -> Result<RTCRtpSenderId>;

    async fn replace_track(
        &self,
        sender: RTCRtpSenderId,
        track: Arc<dyn MediaStreamTrack>,
    ) -> Result<()>;

    async fn remove_track(&self, sender: RTCRtpSenderId) -> Result<()>;

    async fn get_parameters(&self, sender: RTCRtpSenderId) -> Result<RTCRtpSendParameters>;

    async fn set_parameters(
        &self,
        sender: RTCRtpSenderId,
        parameters: RTCRtpSendParameters,
    ) -> Result<()>;

    async fn get_stats(&self, selector: StatsSelector) -> Result<StatsReport>;

    /// set_event_handler replaces the handler engine events are delivered
    /// to. Passing None detaches the current one.
    fn set_event_handler(&self, handler: Option<Arc<dyn EngineEventHandler>>);

    async fn close(&self) -> Result<()>;
}
