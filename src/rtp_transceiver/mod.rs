//! Track handles and the directive protocol they use to reach the engine.

pub mod directive;
pub mod rtp_receiver;
pub mod rtp_sender;

use serde::{Deserialize, Serialize};

/// TrackIndex is the stable index a coordinator assigns to a track handle.
pub type TrackIndex = usize;

/// RTCRtpSenderId identifies an outbound RTP sender inside the engine.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RTCRtpSenderId(pub usize);

/// RTCRtpReceiverId identifies an inbound RTP receiver inside the engine.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RTCRtpReceiverId(pub usize);

/// RTPEncodingParameters provides information relating to one encoding of
/// an outbound stream.
/// <https://w3c.github.io/webrtc-pc/#dom-rtcrtpencodingparameters>
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpEncodingParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bitrate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_framerate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_resolution_down_by: Option<f64>,
}

fn default_active() -> bool {
    true
}

/// RTPSendParameters contains the RTP stack settings used by a sender.
///
/// `transaction_id` is issued by the engine on read and must be handed back
/// unchanged when the parameters are committed.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCRtpSendParameters {
    pub transaction_id: String,
    pub encodings: Vec<RTCRtpEncodingParameters>,
}
