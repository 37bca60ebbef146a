//! nhd-transport
//!
//! Bridge connectivity: Engine.IO/Socket.IO codec, long-polling with
//! websocket upgrade, debounced link state, and generation-tagged events.
//! Nothing here interprets payloads beyond routing by event name.

mod command;
mod error;
mod event;
mod link;
mod monitor;
pub mod protocol;
mod session;
mod socketio;

pub use command::{ControlCommand, RiskSettings};
pub use error::TransportError;
pub use event::{EventKind, SessionEvent, StateSource, TransportKind};
pub use link::{Connector, Link, LinkReader, LinkWriter};
pub use monitor::{LinkMonitor, LinkState};
pub use protocol::EnginePacket;
pub use session::{SessionHandle, TransportConfig};
pub use socketio::{BridgeEndpoint, SocketIoConnector};
