use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::ice_transport::ice_candidate::RTCIceCandidateInit;
use crate::peer_connection::sdp::session_description::RTCSessionDescription;

const PAYLOAD_TYPE_OFFER_STR: &str = "offer";
const PAYLOAD_TYPE_ANSWER_STR: &str = "answer";
const PAYLOAD_TYPE_CANDIDATE_STR: &str = "candidate";

/// NegotiationPayload is one message of the offer/answer exchange, as relayed
/// between two transports.
///
/// On the wire it is `{"type": "offer" | "answer" | "candidate", "data": ..}`.
/// A payload of any other type decodes to `Unknown` and is discarded by
/// [`Transport::handle_negotiation`](super::Transport::handle_negotiation).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum NegotiationPayload {
    Offer(RTCSessionDescription),
    Answer(RTCSessionDescription),
    Candidate(RTCIceCandidateInit),
    #[serde(skip_serializing)]
    Unknown(String),
}

impl NegotiationPayload {
    pub fn payload_type(&self) -> &str {
        match self {
            NegotiationPayload::Offer(_) => PAYLOAD_TYPE_OFFER_STR,
            NegotiationPayload::Answer(_) => PAYLOAD_TYPE_ANSWER_STR,
            NegotiationPayload::Candidate(_) => PAYLOAD_TYPE_CANDIDATE_STR,
            NegotiationPayload::Unknown(payload_type) => payload_type.as_str(),
        }
    }
}

impl fmt::Display for NegotiationPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.payload_type())
    }
}

#[derive(Deserialize)]
struct RawNegotiationPayload {
    #[serde(rename = "type")]
    payload_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl<'de> Deserialize<'de> for NegotiationPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawNegotiationPayload::deserialize(deserializer)?;

        let payload = match raw.payload_type.as_str() {
            PAYLOAD_TYPE_OFFER_STR => NegotiationPayload::Offer(
                serde_json::from_value(raw.data).map_err(serde::de::Error::custom)?,
            ),
            PAYLOAD_TYPE_ANSWER_STR => NegotiationPayload::Answer(
                serde_json::from_value(raw.data).map_err(serde::de::Error::custom)?,
            ),
            PAYLOAD_TYPE_CANDIDATE_STR => NegotiationPayload::Candidate(
                serde_json::from_value(raw.data).map_err(serde::de::Error::custom)?,
            ),
            _ => NegotiationPayload::Unknown(raw.payload_type),
        };

        Ok(payload)
    }
}
