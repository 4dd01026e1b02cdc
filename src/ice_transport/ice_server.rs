use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const TURN_SCHEME_PREFIX: &str = "turn:";
const TURNS_SCHEME_PREFIX: &str = "turns:";

/// ICEServer describes a single STUN and TURN server that can be used by
/// the ICEAgent to establish a connection with a peer.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTCIceServer {
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub credential: String,
}

impl RTCIceServer {
    /// validate checks that every TURN url carries credentials.
    pub(crate) fn validate(&self) -> Result<()> {
        for url in &self.urls {
            let is_turn = url.starts_with(TURN_SCHEME_PREFIX) || url.starts_with(TURNS_SCHEME_PREFIX);
            // https://www.w3.org/TR/webrtc/#set-the-configuration (step #11.3.2)
            if is_turn && (self.username.is_empty() || self.credential.is_empty()) {
                return Err(Error::ErrNoTurnCredentials);
            }
        }
        Ok(())
    }
}
