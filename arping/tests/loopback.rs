#![cfg(target_os = "linux")]

use arping::{Arping, Error};
use std::time::{Duration, Instant};

// Raw sockets need CAP_NET_RAW: `cargo test -- --ignored` as root.
// Loopback never answers ARP, so every ping must end in a timeout.

#[test]
#[ignore]
fn loopback_ping_times_out() {
    let mut arping = Arping::new();
    arping.set_timeout(Duration::from_millis(10));

    for _ in 0..5 {
        let started = Instant::now();
        match arping.ping("127.0.0.1") {
            Err(Error::Timeout) => {}
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}

#[test]
#[ignore]
fn loopback_ping_over_named_interface() {
    let mut arping = Arping::new();
    arping.set_timeout(Duration::from_millis(10));
    assert!(arping
        .ping_over_interface_by_name("127.0.0.1", "lo")
        .unwrap_err()
        .is_timeout());
}

#[test]
#[ignore]
fn loopback_gratuitous_arp() {
    arping::gratuitous_arp_over_interface_by_name("127.0.0.1", "lo").unwrap();
}

#[test]
fn rejects_ipv6_before_touching_the_network() {
    assert!(matches!(
        arping::ping("fe80::e2cb:4eff:fed5:ca4e"),
        Err(Error::InvalidAddress(_))
    ));
    assert!(matches!(
        arping::gratuitous_arp("invalid"),
        Err(Error::InvalidAddress(_))
    ));
}
