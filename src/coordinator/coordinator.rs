use crate::{
    coordinator::{Barrier, BarrierState, Completion, Signal},
    debug, info,
    protocol::{Message, ALL_DONE},
    server::Connection,
    warn,
};

/// Owns all rendezvous state: who registered from where, who is still
/// owed the address list, and who reported done.
pub(crate) struct Coordinator {
    expected: usize,
    barrier: Barrier,
    completion: Completion,
}

impl Coordinator {
    pub fn new(expected: usize) -> Self {
        Coordinator {
            expected,
            barrier: Barrier::new(expected),
            completion: Completion::new(expected),
        }
    }

    pub fn registered(&self) -> usize {
        self.barrier.registered()
    }

    pub fn signalled(&self) -> usize {
        self.completion.signalled()
    }

    pub fn on_message(&mut self, connection: &mut Connection, message: Message) {
        match message {
            Message::Register { name } => self.on_registration(connection, name),
            Message::Done { name } => self.on_done(name),
            Message::Unknown => {
                debug!("Ignoring unknown payload from {}", connection.address());
            }
        }
    }

    fn on_registration(&mut self, connection: &mut Connection, name: String) {
        connection.assign(name.clone());

        if self.barrier.state() != &BarrierState::Waiting {
            warn!(
                "Late registration of `{}` from {} (address list already broadcast)",
                name,
                connection.address()
            );
            return;
        }

        if self.barrier.register(name, connection.address()) {
            info!(
                "All {} peers registered, broadcasting addresses",
                self.expected
            );
        } else {
            debug!(
                "[{}/{}] registered {}",
                self.barrier.registered(),
                self.expected,
                connection.address()
            );
        }
    }

    fn on_done(&mut self, name: String) {
        match self.completion.signal(name.clone()) {
            Signal::First => {
                info!("done {}", name);

                if self.completion.is_complete() {
                    info!("All {} peers done", self.expected);
                }
            }
            Signal::Repeated => {}
            Signal::Overflow => {
                warn!(
                    "Ignoring `done` from `{}`: all {} peers already done",
                    name, self.expected
                );
            }
        }
    }

    /// Whether `connection` is owed output it has not been handed yet.
    pub fn owes(&self, connection: &Connection) -> bool {
        let broadcast = connection
            .name()
            .map(|name| self.barrier.owes(name))
            .unwrap_or(false);

        let notice = self.completion.is_complete() && !connection.notified();

        broadcast || notice
    }

    /// Appends whatever `connection` is owed to its outbound buffer.
    /// Called every time the connection is found writable.
    pub fn on_writable(&mut self, connection: &mut Connection) {
        let broadcast = connection
            .name()
            .and_then(|name| self.barrier.deliver(name));

        if let Some(message) = broadcast {
            debug!("Writing addresses to {}", connection.address());
            connection.enqueue(message.as_bytes());
        }

        if self.completion.is_complete() && (connection.is_pending() || !connection.notified()) {
            connection.enqueue(ALL_DONE.as_bytes());
            connection.mark_notified();
        }
    }
}
