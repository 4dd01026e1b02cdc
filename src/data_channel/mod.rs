//! Reliable message channel boundary.
//!
//! The engine owns the channel. The transport only sends frames on it and
//! listens to its events.

pub mod data_channel_init;
pub mod data_channel_state;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Error, Result};
use data_channel_state::RTCDataChannelState;

/// DataChannelMessage represents a message received from the
/// data channel. IsString will be set to true if the incoming
/// message is of the string type. Otherwise the message is of
/// a binary type.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct DataChannelMessage {
    pub is_string: bool,
    pub data: Bytes,
}

impl DataChannelMessage {
    pub fn text(text: &str) -> Self {
        DataChannelMessage {
            is_string: true,
            data: Bytes::copy_from_slice(text.as_bytes()),
        }
    }
}

/// DataChannelEventHandler receives the events of one data channel.
#[async_trait]
pub trait DataChannelEventHandler: Send + Sync {
    async fn on_open(&self) {}
    async fn on_message(&self, _msg: DataChannelMessage) {}
    async fn on_error(&self, _err: Error) {}
    async fn on_close(&self) {}
}

/// DataChannel is the capability set used from an engine data channel.
#[async_trait]
pub trait DataChannel: Send + Sync {
    fn label(&self) -> &str;

    /// id is the stream id of the channel, if one was assigned yet.
    fn id(&self) -> Option<u16>;

    fn ready_state(&self) -> RTCDataChannelState;

    /// send_text sends a text message and returns the number of bytes sent.
    async fn send_text(&self, text: String) -> Result<usize>;

    /// send sends a binary message and returns the number of bytes sent.
    async fn send(&self, data: &Bytes) -> Result<usize>;

    /// set_event_handler replaces the handler events are delivered to.
    /// Passing None detaches the current one.
    fn set_event_handler(&self, handler: Option<std::sync::Arc<dyn DataChannelEventHandler>>);

    async fn close(&self) -> Result<()>;
}
