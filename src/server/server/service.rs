use crate::{
    coordinator::Coordinator,
    debug,
    protocol::Message,
    server::{
        registry::{Receive, Slot},
        Server, ServerError, ServerSettings,
    },
    warn,
};
use doomstack::{here, ResultExt, Top};
use tokio::io::Ready;

enum Fate {
    Keep,
    Drop,
}

impl Server {
    pub(in crate::server::server) fn service(&mut self) -> Result<(), Top<ServerError>> {
        for (id, ready) in self.registry.ready(&self.coordinator) {
            let fate = match (ready, self.registry.get_mut(id)) {
                (Ok(ready), Some(slot)) => {
                    Server::service_connection(slot, ready, &mut self.coordinator, &self.settings)?
                }
                (Err(error), Some(slot)) => {
                    warn!(
                        "Failed to poll {}: {}",
                        slot.connection.address(),
                        error
                    );

                    Fate::Drop
                }
                (_, None) => Fate::Keep,
            };

            if let Fate::Drop = fate {
                self.registry.remove(id);
            }
        }

        Ok(())
    }

    fn service_connection(
        slot: &mut Slot,
        ready: Ready,
        coordinator: &mut Coordinator,
        settings: &ServerSettings,
    ) -> Result<Fate, Top<ServerError>> {
        let address = slot.connection.address();

        if ready.is_readable() || ready.is_read_closed() {
            match slot.receive(settings.receive_chunk) {
                Ok(Receive::Data(payload)) => match Message::decode(payload.as_slice()) {
                    Ok(messages) => {
                        for message in messages {
                            coordinator.on_message(&mut slot.connection, message);
                        }
                    }
                    Err(error) if settings.strict_decoding => {
                        warn!("Malformed payload from {}: {:?}", address, error);
                        return Err(error).pot(ServerError::MalformedMessage, here!());
                    }
                    Err(error) => {
                        warn!("Dropping {}: {:?}", address, error);
                        return Ok(Fate::Drop);
                    }
                },
                Ok(Receive::Idle) => {}
                Ok(Receive::Closed) => {
                    // The socket stays open: the peer may still be
                    // waiting for the address list or the completion notice
                    debug!("{} closed its sending half", address);
                    slot.close_read();
                }
                Err(error) => {
                    warn!("Failed to receive from {}: {}", address, error);
                    return Ok(Fate::Drop);
                }
            }
        }

        if ready.is_writable() {
            coordinator.on_writable(&mut slot.connection);

            if let Err(error) = slot.flush() {
                warn!("Failed to send to {}: {}", address, error);
                return Ok(Fate::Drop);
            }
        }

        Ok(Fate::Keep)
    }
}
