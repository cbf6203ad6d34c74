use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use uptime_ping::{Pinger, PingerConfig};

type GenericError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(argh::FromArgs)]
/// uptime-ping - probe IP addresses with ICMP echo requests
struct Args {
    #[argh(option, short = 't', default = "5000")]
    /// give up on an address after <timeout-ms> milliseconds
    timeout_ms: u64,

    #[argh(option, short = 'i', default = "1000")]
    /// resend an echo request every <interval-ms> milliseconds, 0 sends one
    interval_ms: u64,

    #[argh(switch, short = 'v')]
    /// trace every request and reply
    verbose: bool,

    #[argh(positional)]
    /// IP addresses
    addresses: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), GenericError> {
    let args: Args = argh::from_env();

    let level = if args.verbose { tracing::Level::TRACE } else { tracing::Level::WARN };
    let subscriber = tracing_subscriber::FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut addresses = Vec::<IpAddr>::new();
    for address in args.addresses {
        addresses.push(address.parse::<IpAddr>()?);
    }
    let timeout = Duration::from_millis(args.timeout_ms);
    let interval = Duration::from_millis(args.interval_ms);

    let pinger = Arc::new(Pinger::new(PingerConfig::default()));
    pinger.init()?;

    let probes: Vec<_> = addresses
        .into_iter()
        .map(|addr| {
            let pinger = pinger.clone();
            tokio::spawn(async move { (addr, pinger.ping(addr, timeout, interval).await) })
        })
        .collect();

    for probe in probes {
        let (addr, outcome) = probe.await?;
        match outcome.result {
            Ok(rtt) => println!("{addr} up rtt={rtt:?} sent={}", outcome.requests_sent),
            Err(e) => println!("{addr} down ({e}) sent={}", outcome.requests_sent),
        }
    }

    Ok(())
}
