use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, Once};
use std::time::Duration;

use more_asserts as ma;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use uptime_ping::{IpVersion, NetworkMode, PingError, Pinger, PingerConfig};

static SETUP: Once = Once::new();

fn setup() {
    SETUP.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::ERROR).finish();
        tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
    });
}

/*
* Note: these tests need either a raw socket (root or CAP_NET_RAW) or unprivileged ping
* (net.ipv4.ping_group_range). Without either they only check the reported error.
*/
fn pinger() -> Option<Pinger> {
    let pinger = Pinger::new(PingerConfig::default());
    match pinger.init() {
        Ok(()) => Some(pinger),
        Err(PingError::NoPingCapability) => {
            eprintln!("skipping: this process cannot open ICMP sockets");
            None
        }
        Err(e) => panic!("unexpected init error: {e}"),
    }
}

#[tokio::test]
async fn ping_localhost_v4() {
    setup();
    let Some(pinger) = pinger() else { return };
    if !pinger.supports(IpVersion::V4) {
        return;
    }

    let outcome = pinger
        .ping(IpAddr::V4(Ipv4Addr::LOCALHOST), Duration::from_secs(2), Duration::from_millis(500))
        .await;

    ma::assert_ge!(outcome.requests_sent, 1);
    match outcome.result {
        Ok(rtt) => ma::assert_lt!(rtt, Duration::from_secs(2)),
        Err(e) => assert!(e.is_timeout(), "unexpected error: {e}"),
    }
}

#[tokio::test]
async fn concurrent_pings_to_localhost() {
    setup();
    let Some(pinger) = pinger() else { return };
    let pinger = Arc::new(pinger);
    let targets: Vec<IpAddr> = [IpAddr::V4(Ipv4Addr::LOCALHOST), IpAddr::V6(Ipv6Addr::LOCALHOST)]
        .into_iter()
        .filter(|addr| pinger.supports(IpVersion::of(addr)))
        .collect();

    let probes: Vec<_> = targets
        .iter()
        .map(|addr| {
            let pinger = pinger.clone();
            let addr = *addr;
            tokio::spawn(async move { pinger.ping(addr, Duration::from_secs(2), Duration::from_millis(500)).await })
        })
        .collect();

    for probe in probes {
        let outcome = probe.await.unwrap();
        ma::assert_ge!(outcome.requests_sent, 1);
        if let Err(e) = outcome.result {
            assert!(e.is_timeout(), "unexpected error: {e}");
        }
    }
}

#[test]
fn network_mode_any_is_supported_once_initialized() {
    setup();
    let Some(pinger) = pinger() else { return };
    assert!(pinger.check_network_mode(NetworkMode::Any).is_ok());
}
