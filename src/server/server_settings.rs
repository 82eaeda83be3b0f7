#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub receive_chunk: usize,
    pub backlog: u32,
    // A malformed payload stops the server instead of dropping the offender
    pub strict_decoding: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            receive_chunk: 1024,
            backlog: 1024,
            strict_decoding: true,
        }
    }
}
