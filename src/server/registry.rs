use crate::{coordinator::Coordinator, debug, info, server::Connection};
use futures::{future, FutureExt};
use std::{
    collections::HashMap,
    io::{self, ErrorKind},
    net::SocketAddr,
};
use tokio::{
    io::{Interest, Ready},
    net::TcpStream,
};

pub(in crate::server) struct Registry {
    slots: HashMap<u64, Slot>,
    next_id: u64,
}

pub(in crate::server) struct Slot {
    stream: TcpStream,
    pub connection: Connection,
    read_closed: bool,
}

pub(in crate::server) enum Receive {
    Data(Vec<u8>),
    Idle,
    Closed,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            slots: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn accept(&mut self, accepted: io::Result<(TcpStream, SocketAddr)>) -> Option<u64> {
        let (stream, address) = match accepted {
            Ok(accepted) => accepted,
            Err(error) => {
                debug!("Failed to accept connection: {}", error);
                return None;
            }
        };

        info!(
            "[{}] accepted connection from {}",
            self.slots.len(),
            address
        );

        let id = self.next_id;
        self.next_id += 1;

        let slot = Slot {
            stream,
            connection: Connection::new(address),
            read_closed: false,
        };

        self.slots.insert(id, slot);

        Some(id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Slot> {
        self.slots.get_mut(&id)
    }

    pub fn remove(&mut self, id: u64) -> Option<Slot> {
        self.slots.remove(&id)
    }

    /// Resolves as soon as any connection is ready for its current
    /// interest. Never resolves if no connection is interested in anything.
    pub async fn wait_ready(&self, coordinator: &Coordinator) {
        let readiness = self
            .slots
            .values()
            .filter_map(|slot| {
                let interest = slot.interest(coordinator)?;
                Some(Box::pin(slot.stream.ready(interest)))
            })
            .collect::<Vec<_>>();

        if readiness.is_empty() {
            future::pending::<()>().await;
        }

        let _ = future::select_all(readiness).await;
    }

    /// Polls every connection's readiness once, without blocking.
    pub fn ready(&self, coordinator: &Coordinator) -> Vec<(u64, io::Result<Ready>)> {
        self.slots
            .iter()
            .filter_map(|(id, slot)| {
                let interest = slot.interest(coordinator)?;
                let ready = slot.stream.ready(interest).now_or_never()?;
                Some((*id, ready))
            })
            .collect()
    }
}

impl Slot {
    fn interest(&self, coordinator: &Coordinator) -> Option<Interest> {
        let read = if self.read_closed {
            None
        } else {
            Some(Interest::READABLE)
        };

        let write = if self.connection.is_pending() || coordinator.owes(&self.connection) {
            Some(Interest::WRITABLE)
        } else {
            None
        };

        match (read, write) {
            (Some(read), Some(write)) => Some(read.add(write)),
            (read, write) => read.or(write),
        }
    }

    pub fn receive(&self, chunk: usize) -> io::Result<Receive> {
        let mut buffer = vec![0u8; chunk];

        match self.stream.try_read(buffer.as_mut_slice()) {
            Ok(0) => Ok(Receive::Closed),
            Ok(read) => {
                buffer.truncate(read);
                Ok(Receive::Data(buffer))
            }
            Err(error) if is_transient(&error) => Ok(Receive::Idle),
            Err(error) => Err(error),
        }
    }

    pub fn close_read(&mut self) {
        self.read_closed = true;
    }

    /// Sends as much of the outbound buffer as the socket accepts,
    /// keeping the remainder for the next writable cycle.
    pub fn flush(&mut self) -> io::Result<usize> {
        if !self.connection.is_pending() {
            return Ok(0);
        }

        match self.stream.try_write(self.connection.outbound()) {
            Ok(sent) => {
                self.connection.advance(sent);
                Ok(sent)
            }
            Err(error) if is_transient(&error) => Ok(0),
            Err(error) => Err(error),
        }
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::{
        io::AsyncWriteExt,
        net::{TcpListener, TcpStream as Stream},
        time,
    };

    async fn accepted(registry: &mut Registry) -> (u64, Stream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let remote = Stream::connect(address).await.unwrap();
        let id = registry.accept(listener.accept().await).unwrap();

        (id, remote)
    }

    #[test]
    fn accept_failure_skipped() {
        let mut registry = Registry::new();

        let failed = Err(io::Error::new(ErrorKind::ConnectionAborted, "aborted"));

        assert!(registry.accept(failed).is_none());
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn receive_and_close() {
        let coordinator = Coordinator::new(2);
        let mut registry = Registry::new();

        let (id, mut remote) = accepted(&mut registry).await;

        assert_eq!(registry.len(), 1);
        assert!(registry.ready(&coordinator).is_empty());

        remote.write_all(b"name:alice").await.unwrap();

        time::timeout(Duration::from_secs(5), registry.wait_ready(&coordinator))
            .await
            .unwrap();

        let ready = registry.ready(&coordinator);
        assert_eq!(ready.len(), 1);

        let (ready_id, ready) = ready.into_iter().next().unwrap();
        assert_eq!(ready_id, id);
        assert!(ready.unwrap().is_readable());

        match registry.get_mut(id).unwrap().receive(1024).unwrap() {
            Receive::Data(payload) => assert_eq!(payload, b"name:alice"),
            _ => panic!("expected data"),
        }

        drop(remote);

        // Readiness can linger from the previous read: keep receiving
        // until the end of stream shows up
        time::timeout(Duration::from_secs(5), async {
            loop {
                registry.wait_ready(&coordinator).await;

                let slot = registry.get_mut(id).unwrap();

                if let Receive::Closed = slot.receive(1024).unwrap() {
                    break;
                }
            }
        })
        .await
        .unwrap();

        let slot = registry.get_mut(id).unwrap();
        slot.close_read();

        assert!(slot.interest(&coordinator).is_none());
        assert!(registry.remove(id).is_some());
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn write_interest_follows_output() {
        let coordinator = Coordinator::new(2);
        let mut registry = Registry::new();

        let (id, _remote) = accepted(&mut registry).await;
        let slot = registry.get_mut(id).unwrap();

        assert_eq!(slot.interest(&coordinator), Some(Interest::READABLE));

        slot.connection.enqueue(b"all done");

        assert_eq!(
            slot.interest(&coordinator),
            Some(Interest::READABLE.add(Interest::WRITABLE))
        );

        time::timeout(Duration::from_secs(5), registry.wait_ready(&coordinator))
            .await
            .unwrap();

        let slot = registry.get_mut(id).unwrap();

        assert_eq!(slot.flush().unwrap(), 8);
        assert!(!slot.connection.is_pending());
        assert_eq!(slot.interest(&coordinator), Some(Interest::READABLE));
    }
}
