use serde::{Deserialize, Serialize};

use super::sdp_type::RTCSdpType;

/// SessionDescription is used to expose local and remote session descriptions.
///
/// The `sdp` body is opaque here; parsing it is left to the engine.
///
/// ## Specifications
///
/// * [MDN]
/// * [W3C]
///
/// [MDN]: https://developer.mozilla.org/en-US/docs/Web/API/RTCSessionDescription
/// [W3C]: https://w3c.github.io/webrtc-pc/#rtcsessiondescription-class
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCSessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: RTCSdpType,

    pub sdp: String,
}

impl RTCSessionDescription {
    /// Given SDP representing an offer, wrap it in an RTCSessionDescription.
    pub fn offer(sdp: String) -> RTCSessionDescription {
        RTCSessionDescription {
            sdp_type: RTCSdpType::Offer,
            sdp,
        }
    }

    /// Given SDP representing an answer, wrap it in an RTCSessionDescription.
    pub fn answer(sdp: String) -> RTCSessionDescription {
        RTCSessionDescription {
            sdp_type: RTCSdpType::Answer,
            sdp,
        }
    }
}
