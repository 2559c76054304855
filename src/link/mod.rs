//! Transport plumbing between the gaze source and the recorder
//!
//! Every background task here only sends [`SessionEvent`]s into the single
//! event loop; none of them touch recorder state directly.

pub mod channel;
pub mod events;
pub mod origin;
pub mod udp;
pub mod window;

pub use channel::{MessagePort, PortSender};
pub use events::{EventBus, SessionEvent};
pub use origin::TrustedOrigin;
pub use udp::{bind_socket, decode_datagram, spawn_listener, spawn_poller};
pub use window::ExternalWindow;
