use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ice_transport::ice_server::RTCIceServer;

/// ICETransportPolicy defines the ICE candidate policy surface the
/// permitted candidates. Only these candidates are used for connectivity checks.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum RTCIceTransportPolicy {
    #[default]
    #[serde(rename = "unspecified")]
    Unspecified,

    /// ICETransportPolicyAll indicates any type of candidate is used.
    #[serde(rename = "all")]
    All,

    /// ICETransportPolicyRelay indicates only media relay candidates such
    /// as candidates passing through a TURN server are used.
    #[serde(rename = "relay")]
    Relay,
}

impl fmt::Display for RTCIceTransportPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceTransportPolicy::Relay => "relay",
            RTCIceTransportPolicy::All => "all",
            RTCIceTransportPolicy::Unspecified => crate::UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

/// The subset of the engine configuration this crate reads and writes.
///
/// [`crate::transport::Transport::update_ice_servers`] reads the current value
/// from the engine, replaces `ice_servers` and hands the result back.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RTCConfiguration {
    /// Defines a slice describing servers available to be used by
    /// ICE, such as STUN and TURN servers.
    pub ice_servers: Vec<RTCIceServer>,

    /// Indicates which candidates the ICE Agent is allowed to use.
    #[serde(default)]
    pub ice_transport_policy: RTCIceTransportPolicy,

    /// The size of the prefetched ICE pool.
    #[serde(default)]
    pub ice_candidate_pool_size: u8,
}
