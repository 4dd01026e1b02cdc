#![warn(rust_2018_idioms)]

pub mod data_channel;
pub mod data_handler;
pub mod engine;
pub mod error;
pub mod ice_transport;
pub mod media_handler;
pub mod peer_connection;
pub mod rtp_transceiver;
pub mod signaling;
pub mod stats;
pub mod track;
pub mod transport;

pub use error::Error;
pub use transport::connection_state::ConnectionState;
pub use transport::negotiation::NegotiationPayload;
pub use transport::{Transport, TransportBuilder};

pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";
