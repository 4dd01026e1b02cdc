/// OfferOptions describes the options handed to the engine when a local
/// offer is requested.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone)]
pub struct RTCOfferOptions {
    /// ice_restart forces the underlying ice gathering process to be restarted.
    /// When this value is true, the generated description will have ICE
    /// credentials that are different from the current credentials
    pub ice_restart: bool,
}

impl RTCOfferOptions {
    pub fn with_ice_restart(ice_restart: bool) -> Self {
        RTCOfferOptions { ice_restart }
    }
}
