pub mod sdp_type;
pub mod session_description;
