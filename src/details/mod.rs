pub(crate) use ping_loop::PingLoop;

pub(crate) mod acquirer;
pub(crate) mod dispatcher;
pub(crate) mod icmp;
mod ping_loop;
pub(crate) mod registry;
pub(crate) mod socket;
