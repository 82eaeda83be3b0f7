mod connection;
mod registry;
mod server;
mod server_settings;

use registry::Registry;

pub(crate) use connection::Connection;

pub use server::{Server, ServerError};
pub use server_settings::ServerSettings;
