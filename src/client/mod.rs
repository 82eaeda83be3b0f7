mod peer;
mod peer_settings;

pub use peer::{Peer, PeerError};
pub use peer_settings::PeerSettings;
