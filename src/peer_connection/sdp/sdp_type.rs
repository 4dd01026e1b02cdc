use std::fmt;

use serde::{Deserialize, Serialize};

/// SDPType describes the type of an SessionDescription.
///
/// ## Specifications
///
/// * [MDN]
/// * [W3C]
///
/// [MDN]: https://developer.mozilla.org/en-US/docs/Web/API/RTCSessionDescription/type
/// [W3C]: https://w3c.github.io/webrtc-pc/#dom-rtcsessiondescription-type
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum RTCSdpType {
    #[default]
    #[serde(rename = "unspecified")]
    Unspecified,

    /// indicates that a description MUST be treated as an SDP offer.
    #[serde(rename = "offer")]
    Offer,

    /// indicates that a description MUST be treated as an SDP answer,
    /// but not a final answer.
    #[serde(rename = "pranswer")]
    Pranswer,

    /// indicates that a description MUST be treated as an SDP final answer,
    /// and the offer-answer exchange MUST be considered complete.
    #[serde(rename = "answer")]
    Answer,

    /// indicates that a description MUST be treated as canceling the
    /// current SDP negotiation.
    #[serde(rename = "rollback")]
    Rollback,
}

const SDP_TYPE_OFFER_STR: &str = "offer";
const SDP_TYPE_PRANSWER_STR: &str = "pranswer";
const SDP_TYPE_ANSWER_STR: &str = "answer";
const SDP_TYPE_ROLLBACK_STR: &str = "rollback";

impl From<&str> for RTCSdpType {
    fn from(raw: &str) -> Self {
        match raw {
            SDP_TYPE_OFFER_STR => RTCSdpType::Offer,
            SDP_TYPE_PRANSWER_STR => RTCSdpType::Pranswer,
            SDP_TYPE_ANSWER_STR => RTCSdpType::Answer,
            SDP_TYPE_ROLLBACK_STR => RTCSdpType::Rollback,
            _ => RTCSdpType::Unspecified,
        }
    }
}

impl fmt::Display for RTCSdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCSdpType::Offer => SDP_TYPE_OFFER_STR,
            RTCSdpType::Pranswer => SDP_TYPE_PRANSWER_STR,
            RTCSdpType::Answer => SDP_TYPE_ANSWER_STR,
            RTCSdpType::Rollback => SDP_TYPE_ROLLBACK_STR,
            RTCSdpType::Unspecified => crate::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}
