use crate::protocol::Addresses;
use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    sync::Arc,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BarrierState {
    Waiting,
    ThresholdReached { message: Arc<str> },
    BroadcastSent { message: Arc<str> },
}

pub(crate) struct Barrier {
    expected: usize,
    registrations: HashMap<String, SocketAddr>,
    pending: HashSet<String>,
    state: BarrierState,
}

impl Barrier {
    pub fn new(expected: usize) -> Self {
        Barrier {
            expected,
            registrations: HashMap::new(),
            pending: HashSet::new(),
            state: BarrierState::Waiting,
        }
    }

    pub fn state(&self) -> &BarrierState {
        &self.state
    }

    pub fn registered(&self) -> usize {
        self.registrations.len()
    }

    pub fn message(&self) -> Option<&Arc<str>> {
        match &self.state {
            BarrierState::Waiting => None,
            BarrierState::ThresholdReached { message } | BarrierState::BroadcastSent { message } => {
                Some(message)
            }
        }
    }

    /// Records `name` as observed at `address`. Returns `true` on the one
    /// registration that completes the barrier.
    ///
    /// Registrations after the barrier completes are not recorded: the
    /// set of addresses is frozen once broadcast.
    pub fn register(&mut self, name: String, address: SocketAddr) -> bool {
        if self.state != BarrierState::Waiting {
            return false;
        }

        self.registrations.insert(name, address);

        if self.registrations.len() != self.expected {
            return false;
        }

        let message: Arc<str> = Addresses::from_registrations(&self.registrations)
            .encode()
            .into();

        self.pending = self.registrations.keys().cloned().collect();
        self.state = BarrierState::ThresholdReached { message };

        true
    }

    pub fn owes(&self, name: &str) -> bool {
        self.pending.contains(name)
    }

    /// Hands out the broadcast message to `name`, at most once per name.
    ///
    /// A name whose connection is dropped before delivery stays pending,
    /// so the barrier then remains in `ThresholdReached` for good.
    pub fn deliver(&mut self, name: &str) -> Option<Arc<str>> {
        if !self.pending.remove(name) {
            return None;
        }

        let message = self.message().cloned()?;

        if self.pending.is_empty() {
            self.state = BarrierState::BroadcastSent {
                message: message.clone(),
            };
        }

        Some(message)
    }
}
