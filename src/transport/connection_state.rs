use std::fmt;

use crate::ice_transport::ice_connection_state::RTCIceConnectionState;
use crate::peer_connection::peer_connection_state::RTCPeerConnectionState;

/// ConnectionState is the single connection state a transport reports,
/// reconciled from the engine's ICE and peer connection signals.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    New = 0,
    Connecting = 1,
    Connected = 2,
    Disconnected = 3,
    Failed = 4,

    /// Closed is terminal.
    Closed = 5,
}

const CONNECTION_STATE_NEW_STR: &str = "new";
const CONNECTION_STATE_CONNECTING_STR: &str = "connecting";
const CONNECTION_STATE_CONNECTED_STR: &str = "connected";
const CONNECTION_STATE_DISCONNECTED_STR: &str = "disconnected";
const CONNECTION_STATE_FAILED_STR: &str = "failed";
const CONNECTION_STATE_CLOSED_STR: &str = "closed";

impl From<u8> for ConnectionState {
    fn from(v: u8) -> Self {
        match v {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Disconnected,
            4 => ConnectionState::Failed,
            5 => ConnectionState::Closed,
            _ => ConnectionState::New,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            ConnectionState::New => CONNECTION_STATE_NEW_STR,
            ConnectionState::Connecting => CONNECTION_STATE_CONNECTING_STR,
            ConnectionState::Connected => CONNECTION_STATE_CONNECTED_STR,
            ConnectionState::Disconnected => CONNECTION_STATE_DISCONNECTED_STR,
            ConnectionState::Failed => CONNECTION_STATE_FAILED_STR,
            ConnectionState::Closed => CONNECTION_STATE_CLOSED_STR,
        };
        write!(f, "{s}")
    }
}

/// ConnectivitySignal is one low level state change reported by the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectivitySignal {
    /// Ice is the fine grained ICE connection state, reported by every engine.
    Ice(RTCIceConnectionState),

    /// Connection is the coarse peer connection state. Only its failure
    /// cases are used.
    Connection(RTCPeerConnectionState),
}

impl fmt::Display for ConnectivitySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivitySignal::Ice(state) => write!(f, "iceConnectionState {state}"),
            ConnectivitySignal::Connection(state) => write!(f, "connectionState {state}"),
        }
    }
}

fn map_signal(signal: ConnectivitySignal) -> Option<ConnectionState> {
    match signal {
        ConnectivitySignal::Ice(state) => match state {
            RTCIceConnectionState::Checking => Some(ConnectionState::Connecting),
            RTCIceConnectionState::Connected | RTCIceConnectionState::Completed => {
                Some(ConnectionState::Connected)
            }
            RTCIceConnectionState::Disconnected => Some(ConnectionState::Disconnected),
            RTCIceConnectionState::Failed => Some(ConnectionState::Failed),
            RTCIceConnectionState::Closed => Some(ConnectionState::Closed),
            RTCIceConnectionState::New | RTCIceConnectionState::Unspecified => None,
        },
        ConnectivitySignal::Connection(state) => match state {
            RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
            RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
            RTCPeerConnectionState::Closed => Some(ConnectionState::Closed),
            RTCPeerConnectionState::New
            | RTCPeerConnectionState::Connecting
            | RTCPeerConnectionState::Connected
            | RTCPeerConnectionState::Unspecified => None,
        },
    }
}

/// next_connection_state returns the state `signal` moves the transport to,
/// or None when it leaves `previous` unchanged.
///
/// Once `previous` is Closed no signal changes it.
pub fn next_connection_state(
    signal: ConnectivitySignal,
    previous: ConnectionState,
) -> Option<ConnectionState> {
    if previous == ConnectionState::Closed {
        return None;
    }

    match map_signal(signal) {
        Some(next) if next != previous => Some(next),
        _ => None,
    }
}
