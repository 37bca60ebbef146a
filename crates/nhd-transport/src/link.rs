use async_trait::async_trait;

use crate::{EnginePacket, TransportError, TransportKind};

/// Inbound half of an established link.
#[async_trait]
pub trait LinkReader: Send {
    /// Next batch of frames; `Ok(None)` once the peer has closed.
    /// Must be cancel-safe: the driver races it against timers and commands.
    async fn recv(&mut self) -> Result<Option<Vec<EnginePacket>>, TransportError>;
}

#[async_trait]
pub trait LinkWriter: Send {
    async fn send(&mut self, packets: Vec<EnginePacket>) -> Result<(), TransportError>;
}

/// A namespace-connected Engine.IO session.
pub struct Link {
    pub kind: TransportKind,
    pub reader: Box<dyn LinkReader>,
    pub writer: Box<dyn LinkWriter>,
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link").field("kind", &self.kind).finish_non_exhaustive()
    }
}

/// Opens links to the bridge. The session driver calls it once per attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Link, TransportError>;
}
