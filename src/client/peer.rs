use crate::{
    client::PeerSettings,
    debug,
    protocol::{
        Addresses, Message, ADDRESSES_PREFIX, ADDRESSES_SUFFIX, ALL_DONE, DONE_TAG,
        ENTRY_DELIMITER, REGISTER_TAG, SEPARATOR,
    },
};
use doomstack::{here, Doom, ResultExt, Top};
use std::{io, str};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpStream, ToSocketAddrs},
};

/// One participant of a rendezvous: registers under `name`, learns where
/// every other participant lives, then reports done and waits for
/// everyone else to do the same.
pub struct Peer {
    name: String,
    stream: TcpStream,
    inbound: Vec<u8>,
    settings: PeerSettings,
}

#[derive(Doom)]
pub enum PeerError {
    #[doom(description("Name is empty or contains a reserved tag or delimiter"))]
    NameInvalid,
    #[doom(description("Receive chunk must be positive"))]
    ReceiveChunkEmpty,
    #[doom(description("Failed to connect: {:?}", source))]
    #[doom(wrap(connect_failed))]
    ConnectFailed { source: io::Error },
    #[doom(description("Failed to send: {:?}", source))]
    #[doom(wrap(send_failed))]
    SendFailed { source: io::Error },
    #[doom(description("Failed to receive: {:?}", source))]
    #[doom(wrap(receive_failed))]
    ReceiveFailed { source: io::Error },
    #[doom(description("Connection closed by rendezvous server"))]
    ConnectionClosed,
    #[doom(description("Response is not valid UTF-8: {:?}", source))]
    #[doom(wrap(response_not_utf8))]
    ResponseNotUtf8 { source: str::Utf8Error },
    #[doom(description("Address list malformed"))]
    AddressesMalformed,
}

impl Peer {
    pub async fn connect<A, N>(
        rendezvous: A,
        name: N,
        settings: PeerSettings,
    ) -> Result<Self, Top<PeerError>>
    where
        A: ToSocketAddrs,
        N: Into<String>,
    {
        let name = name.into();

        if !Peer::valid_name(name.as_str()) {
            return PeerError::NameInvalid.fail().spot(here!());
        }

        if settings.receive_chunk == 0 {
            return PeerError::ReceiveChunkEmpty.fail().spot(here!());
        }

        let stream = TcpStream::connect(rendezvous)
            .await
            .map_err(PeerError::connect_failed)
            .map_err(PeerError::into_top)
            .spot(here!())?;

        Ok(Peer {
            name,
            stream,
            inbound: Vec::new(),
            settings,
        })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Registers this peer and waits until every expected peer did.
    pub async fn register(&mut self) -> Result<Addresses, Top<PeerError>> {
        let message = Message::Register {
            name: self.name.clone(),
        };

        self.send(message).await?;

        let response = self.receive_until(ADDRESSES_SUFFIX).await?;

        let response = str::from_utf8(response.as_slice())
            .map_err(PeerError::response_not_utf8)
            .map_err(PeerError::into_top)
            .spot(here!())?;

        // Anything before the prefix is not part of the address list
        let start = response
            .find(ADDRESSES_PREFIX)
            .ok_or(PeerError::AddressesMalformed.into_top())
            .spot(here!())?;

        let addresses = Addresses::decode(&response[start..])
            .pot(PeerError::AddressesMalformed, here!())?;

        debug!("`{}` received {} addresses", self.name, addresses.len());

        Ok(addresses)
    }

    /// Reports done and waits until every expected peer did.
    pub async fn done(&mut self) -> Result<(), Top<PeerError>> {
        let message = Message::Done {
            name: self.name.clone(),
        };

        self.send(message).await?;
        self.receive_until(ALL_DONE).await?;

        Ok(())
    }

    fn valid_name(name: &str) -> bool {
        !name.is_empty()
            && !name.contains(SEPARATOR)
            && !name.contains(ENTRY_DELIMITER)
            && !name.contains(REGISTER_TAG)
            && !name.contains(DONE_TAG)
    }

    async fn send(&mut self, message: Message) -> Result<(), Top<PeerError>> {
        self.stream
            .write_all(message.encode().as_bytes())
            .await
            .map_err(PeerError::send_failed)
            .map_err(PeerError::into_top)
            .spot(here!())
    }

    // Returns everything received up to and including `delimiter`,
    // retaining the rest for later calls
    async fn receive_until(&mut self, delimiter: &str) -> Result<Vec<u8>, Top<PeerError>> {
        let delimiter = delimiter.as_bytes();
        let mut buffer = vec![0u8; self.settings.receive_chunk];

        loop {
            let position = self
                .inbound
                .windows(delimiter.len())
                .position(|window| window == delimiter);

            if let Some(position) = position {
                let end = position + delimiter.len();
                return Ok(self.inbound.drain(..end).collect());
            }

            let read = self
                .stream
                .read(buffer.as_mut_slice())
                .await
                .map_err(PeerError::receive_failed)
                .map_err(PeerError::into_top)
                .spot(here!())?;

            if read == 0 {
                return PeerError::ConnectionClosed.fail().spot(here!());
            }

            self.inbound.extend_from_slice(&buffer[..read]);
        }
    }
}
