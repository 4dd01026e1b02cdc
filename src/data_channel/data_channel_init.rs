/// DataChannelInit configures the channel the engine opens for a transport.
///
/// ## Specifications
///
/// * [W3C]
///
/// [W3C]: https://w3c.github.io/webrtc-pc/#dom-rtcdatachannelinit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RTCDataChannelInit {
    /// ordered indicates if data must be delivered in the order it was sent.
    pub ordered: bool,

    /// protocol describes the subprotocol name used for this channel.
    pub protocol: String,

    /// negotiated carries the stream id when both peers create the channel
    /// out of band. None lets the engine announce the channel in-band.
    pub negotiated: Option<u16>,
}

impl Default for RTCDataChannelInit {
    fn default() -> Self {
        RTCDataChannelInit {
            ordered: true,
            protocol: String::new(),
            negotiated: None,
        }
    }
}

impl RTCDataChannelInit {
    /// pre_negotiated returns the options of an ordered channel created with
    /// the same `id` on both peers.
    pub fn pre_negotiated(id: u16) -> Self {
        RTCDataChannelInit {
            negotiated: Some(id),
            ..Default::default()
        }
    }
}
