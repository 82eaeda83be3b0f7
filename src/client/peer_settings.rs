#[derive(Debug, Clone)]
pub struct PeerSettings {
    pub receive_chunk: usize,
}

impl Default for PeerSettings {
    fn default() -> Self {
        PeerSettings {
            receive_chunk: 1024 * 1024,
        }
    }
}
