use crate::{
    coordinator::Coordinator,
    info,
    server::{Registry, ServerSettings},
};
use doomstack::{here, Doom, ResultExt, Top};
use std::{future::Future, io, net::SocketAddr};
use tokio::net::{self, TcpListener, TcpSocket, TcpStream, ToSocketAddrs};

mod service;

/// The rendezvous event loop.
///
/// A single task owns the listener, every accepted socket and all
/// coordination state. Each cycle waits for the listener or any
/// connection to become ready, then services every ready connection once.
pub struct Server {
    listener: TcpListener,
    registry: Registry,
    coordinator: Coordinator,
    settings: ServerSettings,
}

#[derive(Doom)]
pub enum ServerError {
    #[doom(description("Expected peer count must be positive"))]
    NoPeersExpected,
    #[doom(description("Receive chunk must be positive"))]
    ReceiveChunkEmpty,
    #[doom(description("Failed to resolve address: {:?}", source))]
    #[doom(wrap(resolve_failed))]
    ResolveFailed { source: io::Error },
    #[doom(description("Address unknown"))]
    AddressUnknown,
    #[doom(description("Failed to bind listener: {:?}", source))]
    #[doom(wrap(bind_failed))]
    BindFailed { source: io::Error },
    #[doom(description("Failed to retrieve local address: {:?}", source))]
    #[doom(wrap(local_address_unavailable))]
    LocalAddressUnavailable { source: io::Error },
    #[doom(description("Malformed message"))]
    MalformedMessage,
}

enum Event {
    Shutdown,
    Accepted(io::Result<(TcpStream, SocketAddr)>),
    Ready,
}

impl Server {
    pub async fn bind<A>(
        address: A,
        expected: usize,
        settings: ServerSettings,
    ) -> Result<Self, Top<ServerError>>
    where
        A: ToSocketAddrs,
    {
        if expected == 0 {
            return ServerError::NoPeersExpected.fail().spot(here!());
        }

        if settings.receive_chunk == 0 {
            return ServerError::ReceiveChunkEmpty.fail().spot(here!());
        }

        let address = net::lookup_host(address)
            .await
            .map_err(ServerError::resolve_failed)
            .map_err(ServerError::into_top)
            .spot(here!())?
            .next()
            .ok_or(ServerError::AddressUnknown.into_top())
            .spot(here!())?;

        let socket = match address {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        };

        let socket = socket
            .map_err(ServerError::bind_failed)
            .map_err(ServerError::into_top)
            .spot(here!())?;

        socket
            .set_reuseaddr(true)
            .map_err(ServerError::bind_failed)
            .map_err(ServerError::into_top)
            .spot(here!())?;

        socket
            .bind(address)
            .map_err(ServerError::bind_failed)
            .map_err(ServerError::into_top)
            .spot(here!())?;

        let listener = socket
            .listen(settings.backlog)
            .map_err(ServerError::bind_failed)
            .map_err(ServerError::into_top)
            .spot(here!())?;

        Ok(Server {
            listener,
            registry: Registry::new(),
            coordinator: Coordinator::new(expected),
            settings,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Top<ServerError>> {
        self.listener
            .local_addr()
            .map_err(ServerError::local_address_unavailable)
            .map_err(ServerError::into_top)
            .spot(here!())
    }

    /// Runs until `shutdown` completes, or until a malformed payload is
    /// received under `strict_decoding`. Dropping the `Server` on return
    /// closes every socket.
    pub async fn run<S>(mut self, shutdown: S) -> Result<(), Top<ServerError>>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if let Ok(address) = self.listener.local_addr() {
            info!("Listening on {}", address);
        }

        loop {
            let event = tokio::select! {
                _ = &mut shutdown => Event::Shutdown,
                accepted = self.listener.accept() => Event::Accepted(accepted),
                _ = self.registry.wait_ready(&self.coordinator) => Event::Ready,
            };

            match event {
                Event::Shutdown => {
                    info!(
                        "Shutting down ({} registered, {} done), closing {} connections",
                        self.coordinator.registered(),
                        self.coordinator.signalled(),
                        self.registry.len()
                    );

                    return Ok(());
                }
                Event::Accepted(accepted) => {
                    self.registry.accept(accepted);
                }
                Event::Ready => {}
            }

            self.service()?;
        }
    }
}
