//! Signaling channel between two transports
//!
//! Frames are JSON text messages on a pre-negotiated data channel. The
//! channel carries media control notifications, application data and, when
//! enabled, renegotiation payloads once the peers are connected.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data_channel::data_channel_state::RTCDataChannelState;
use crate::data_channel::{DataChannel, DataChannelEventHandler, DataChannelMessage};
use crate::error::{Error, Result};
use crate::rtp_transceiver::TrackIndex;
use crate::transport::negotiation::NegotiationPayload;

/// MediaAction is a change a sender reports to the matching remote receiver.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaAction {
    Replace,
    End,
}

impl fmt::Display for MediaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MediaAction::Replace => write!(f, "replace"),
            MediaAction::End => write!(f, "end"),
        }
    }
}

/// SignalMessage is one frame on the signaling channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SignalMessage {
    Negotiation {
        payload: NegotiationPayload,
    },
    Media {
        action: MediaAction,
        #[serde(rename = "trackIndex")]
        track_index: TrackIndex,
    },
    Data {
        payload: serde_json::Value,
    },
}

impl SignalMessage {
    /// decode parses a received frame. Binary frames are rejected.
    pub fn decode(msg: &DataChannelMessage) -> Result<Self> {
        if !msg.is_string {
            return Err(Error::ErrOthers(
                "binary frame on signaling channel".to_owned(),
            ));
        }
        Ok(serde_json::from_slice(&msg.data)?)
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// SignalingChannel wraps the data channel the transport signals over.
pub struct SignalingChannel {
    data_channel: Arc<dyn DataChannel>,
    log_target: String,
}

impl SignalingChannel {
    pub(crate) fn new(data_channel: Arc<dyn DataChannel>, log_target: &str) -> Self {
        SignalingChannel {
            data_channel,
            log_target: log_target.to_owned(),
        }
    }

    pub fn label(&self) -> &str {
        self.data_channel.label()
    }

    pub fn is_open(&self) -> bool {
        self.data_channel.ready_state() == RTCDataChannelState::Open
    }

    /// send encodes `msg` and writes it to the channel.
    pub async fn send(&self, msg: &SignalMessage) -> Result<()> {
        if !self.is_open() {
            return Err(Error::ErrSignalingChannelNotOpen);
        }

        let text = msg.encode()?;
        log::trace!(target: self.log_target.as_str(), "send signal {text}");
        self.data_channel.send_text(text).await?;
        Ok(())
    }

    pub(crate) fn attach(&self, handler: Arc<dyn DataChannelEventHandler>) {
        self.data_channel.set_event_handler(Some(handler));
    }

    pub(crate) fn detach(&self) {
        self.data_channel.set_event_handler(None);
    }

    pub(crate) async fn close(&self) -> Result<()> {
        self.data_channel.close().await
    }
}
