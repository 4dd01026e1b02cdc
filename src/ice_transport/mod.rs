pub mod ice_candidate;
pub mod ice_connection_state;
pub mod ice_server;
