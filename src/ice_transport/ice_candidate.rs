use serde::{Deserialize, Serialize};

/// ICECandidateInit is used to serialize ice candidates
///
/// An empty `candidate` string is the end-of-candidates marker some engines
/// emit instead of a null candidate.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCIceCandidateInit {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
    pub username_fragment: Option<String>,
}

impl RTCIceCandidateInit {
    /// is_end_of_candidates reports whether this value only marks the end of
    /// gathering and carries no candidate to transmit.
    pub fn is_end_of_candidates(&self) -> bool {
        self.candidate.is_empty()
    }
}
