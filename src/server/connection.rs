use std::net::SocketAddr;

/// Per-peer state of one accepted socket. The socket itself lives in the
/// `Registry`, next to this record.
pub(crate) struct Connection {
    address: SocketAddr,
    name: Option<String>,
    outbound: Vec<u8>,
    notified: bool,
}

impl Connection {
    pub fn new(address: SocketAddr) -> Self {
        Connection {
            address,
            name: None,
            outbound: Vec::new(),
            notified: false,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn assign(&mut self, name: String) {
        self.name = Some(name);
    }

    pub fn enqueue(&mut self, bytes: &[u8]) {
        self.outbound.extend_from_slice(bytes);
    }

    pub fn outbound(&self) -> &[u8] {
        self.outbound.as_slice()
    }

    pub fn is_pending(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Drops the first `sent` bytes of the outbound buffer.
    pub fn advance(&mut self, sent: usize) {
        self.outbound.drain(..sent);
    }

    pub fn notified(&self) -> bool {
        self.notified
    }

    pub fn mark_notified(&mut self) {
        self.notified = true;
    }
}
