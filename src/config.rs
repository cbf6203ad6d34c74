use std::time::Duration;

#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Debug)]
pub struct PingerConfig {
    /// Read deadline of the receive loops; bounds how long they take to notice a stop.
    pub read_timeout: Duration,
    /// Echo payload size in bytes. The first 8 bytes carry the send time.
    pub payload_size: usize,
    /// Fall back to unprivileged ICMP datagram sockets when raw sockets are denied.
    pub allow_unprivileged: bool,
    pub receive_buffer_size: usize,
}

impl Default for PingerConfig {
    fn default() -> Self {
        PingerConfig {
            read_timeout: Duration::from_secs(1),
            payload_size: 56,
            allow_unprivileged: true,
            receive_buffer_size: 1500,
        }
    }
}
