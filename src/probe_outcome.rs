use std::time::Duration;

use crate::{PingError, PingResult};

/// Result of one `Pinger::ping` call.
#[derive(Debug)]
pub struct ProbeOutcome {
    /// Echo requests written to the socket during this probe.
    pub requests_sent: usize,
    /// Round-trip time of the first answered request, or why there was none.
    pub result: PingResult<Duration>,
}

impl ProbeOutcome {
    pub(crate) fn succeeded(requests_sent: usize, rtt: Duration) -> Self {
        ProbeOutcome { requests_sent, result: Ok(rtt) }
    }

    pub(crate) fn failed(requests_sent: usize, error: PingError) -> Self {
        ProbeOutcome { requests_sent, result: Err(error) }
    }

    pub fn is_up(&self) -> bool {
        self.result.is_ok()
    }

    pub fn rtt(&self) -> Option<Duration> {
        self.result.as_ref().ok().copied()
    }

    pub fn into_result(self) -> PingResult<(Duration, usize)> {
        let requests_sent = self.requests_sent;
        self.result.map(|rtt| (rtt, requests_sent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimeoutError;

    #[test]
    fn succeeded_outcome() {
        let outcome = ProbeOutcome::succeeded(2, Duration::from_millis(300));
        assert!(outcome.is_up());
        assert_eq!(Some(Duration::from_millis(300)), outcome.rtt());
        assert_eq!((Duration::from_millis(300), 2), outcome.into_result().unwrap());
    }

    #[test]
    fn failed_outcome() {
        let outcome = ProbeOutcome::failed(4, TimeoutError.into());
        assert!(!outcome.is_up());
        assert_eq!(None, outcome.rtt());
        assert!(outcome.into_result().unwrap_err().is_timeout());
    }
}
