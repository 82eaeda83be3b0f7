#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

pub mod client;
pub mod protocol;

mod coordinator;
mod server;

#[cfg(not(test))]
pub(crate) use log::{debug, info, warn};

#[cfg(test)]
pub(crate) use std::{println as info, println as debug, println as warn};

pub use client::{Peer, PeerError, PeerSettings};
pub use protocol::{Addresses, Message};
pub use server::{Server, ServerError, ServerSettings};
