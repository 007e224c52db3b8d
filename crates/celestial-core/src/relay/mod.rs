mod protocol;
mod session;

pub use {
    protocol::{ClientMessage, ServerMessage, StreamStatus},
    session::{DispatchOutcome, Outbound, PeerId, PeerInfo, RelaySession},
};
