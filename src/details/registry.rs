use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::details::icmp::{Identifier, SequenceNumber};

/// Identifies which outstanding echo request a reply belongs to.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) struct CorrelationKey {
    pub addr: IpAddr,
    pub protocol: u8,
    pub identifier: Identifier,
    pub sequence_number: SequenceNumber,
}

/// An echo request waiting for its reply.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    pub key: CorrelationKey,
    pub sent_at: Instant,
    reply_tx: oneshot::Sender<Instant>,
}

impl PendingRequest {
    pub(crate) fn new(key: CorrelationKey, sent_at: Instant) -> (Self, oneshot::Receiver<Instant>) {
        let (reply_tx, reply_rx) = oneshot::channel();
        (PendingRequest { key, sent_at, reply_tx }, reply_rx)
    }

    /// Hands the receipt time to whoever awaits this request. Never blocks; if the
    /// awaiting side already gave up the time is dropped.
    pub(crate) fn deliver(self, received_at: Instant) -> bool {
        self.reply_tx.send(received_at).is_ok()
    }
}

/// In-flight requests by correlation key. Every operation is one short critical
/// section; the lock is never held across socket I/O.
#[derive(Debug, Default)]
pub(crate) struct RequestRegistry {
    requests: Mutex<HashMap<CorrelationKey, PendingRequest>>,
}

impl RequestRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers `request`, handing it back if its key is already taken.
    pub(crate) fn register(&self, request: PendingRequest) -> Result<(), PendingRequest> {
        let mut requests = self.lock();
        if requests.contains_key(&request.key) {
            return Err(request);
        }
        requests.insert(request.key, request);
        Ok(())
    }

    /// Looks up and removes the request for `key` in one step.
    pub(crate) fn take(&self, key: &CorrelationKey) -> Option<PendingRequest> {
        self.lock().remove(key)
    }

    pub(crate) fn remove(&self, key: &CorrelationKey) {
        self.lock().remove(key);
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CorrelationKey, PendingRequest>> {
        // The map stays consistent even if a holder panicked: each operation is a single call.
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
