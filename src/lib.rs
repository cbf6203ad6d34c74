#![warn(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub use config::PingerConfig;
pub use details::socket::SocketMode;
pub use ip_version::{IpVersion, NetworkMode};
pub use ping_error::{PingError, PingResult, TimeoutError};
pub use pinger::Pinger;
pub use probe_outcome::ProbeOutcome;

mod config;
mod details;
mod ip_version;
mod ping_error;
mod pinger;
mod probe_outcome;
