//! Peer connection value types shared with the engine.

pub mod configuration;
pub mod offer_answer_options;
pub mod peer_connection_state;
pub mod sdp;
