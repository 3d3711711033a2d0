use crate::select::{find_usable_interface_for_destination, resolve_binding};
use crate::{
    Config, Error, Interface, InterfaceSource, IntoIpv4, Link, MacAddr, Options, Override,
    PacketLink, Session, SystemInterfaces, Transport,
};
use arping_packets::ArpDatagram;
use crossbeam::channel::{self as crossbeam_channel, RecvTimeoutError};
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// A successful ping: who answered and how long it took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reply {
    pub mac: MacAddr,
    pub elapsed: Duration,
}

/// Runs pings and gratuitous announcements with a fixed interface source, link and default
/// configuration.
///
/// Configuration is read once at the start of every operation; changing it requires
/// `&mut self`, so it can never shift under an operation in flight.
pub struct Arping<S = SystemInterfaces, L = PacketLink> {
    interfaces: S,
    link: L,
    config: Config,
}

impl Arping {
    /// Uses the host's interfaces and raw `AF_PACKET` sockets.
    pub fn new() -> Self {
        Arping::with_parts(SystemInterfaces, PacketLink)
    }
}

impl Default for Arping {
    fn default() -> Self {
        Arping::new()
    }
}

impl<S: InterfaceSource, L: Link> Arping<S, L> {
    pub fn with_parts(interfaces: S, link: L) -> Self {
        Arping {
            interfaces,
            link,
            config: Config::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Sets how long later pings wait for a reply.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    /// Emits progress events through `tracing` for later operations.
    pub fn enable_verbose_log(&mut self) {
        self.config.verbose = true;
    }

    pub fn ping<A: IntoIpv4>(&self, dst: A) -> Result<Reply, Error> {
        self.ping_with_options(dst, None)
    }

    pub fn ping_over_interface_by_name<A: IntoIpv4>(&self, dst: A, name: &str) -> Result<Reply, Error> {
        self.ping_with_options(dst, Some(Override::InterfaceNamed(name.to_owned())))
    }

    pub fn ping_over_interface<A: IntoIpv4>(&self, dst: A, iface: Interface) -> Result<Reply, Error> {
        self.ping_with_options(dst, Some(Override::Interface(iface)))
    }

    /// Sends one ARP request to `dst` and waits for the matching reply.
    ///
    /// Exactly one request is sent. `Error::Timeout` means nobody answered within the
    /// timeout; every other error means the ping could not be carried out.
    pub fn ping_with_options<A, I>(&self, dst: A, overrides: I) -> Result<Reply, Error>
    where
        A: IntoIpv4,
        I: IntoIterator<Item = Override>,
    {
        let config = self.config;
        let dst = dst.into_ipv4()?;
        let options = Options::resolve(&config, overrides, &self.interfaces)?;
        let binding = resolve_binding(&self.interfaces, dst, &options, config.verbose)?;

        let request = ArpDatagram::request(
            binding.interface.mac,
            binding.source,
            MacAddr::BROADCAST,
            dst,
        );

        let session = Arc::new(Session::open(&self.link, &binding.interface)?);
        verbose!(
            config.verbose,
            "arping '{}' over interface: '{}' with address: '{}'",
            dst,
            session.interface(),
            binding.source
        );
        let outcome = exchange(&session, request, options.timeout, config.verbose);
        session.close();
        outcome
    }

    /// Announces `src` to the local network. Nothing is awaited.
    pub fn gratuitous_arp<A: IntoIpv4>(&self, src: A) -> Result<(), Error> {
        let src = src.into_ipv4()?;
        self.gratuitous_arp_with_options(Some(Override::SourceAddr(src)))
    }

    pub fn gratuitous_arp_over_interface_by_name<A: IntoIpv4>(&self, src: A, name: &str) -> Result<(), Error> {
        let src = src.into_ipv4()?;
        self.gratuitous_arp_with_options(vec![
            Override::SourceAddr(src),
            Override::InterfaceNamed(name.to_owned()),
        ])
    }

    pub fn gratuitous_arp_over_interface<A: IntoIpv4>(&self, src: A, iface: Interface) -> Result<(), Error> {
        let src = src.into_ipv4()?;
        self.gratuitous_arp_with_options(vec![Override::SourceAddr(src), Override::Interface(iface)])
    }

    /// Broadcasts a gratuitous ARP for the address set by `Override::SourceAddr`. Without an
    /// explicit interface, the first interface whose network holds that address is used.
    /// Timeouts do not apply.
    pub fn gratuitous_arp_with_options<I>(&self, overrides: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Override>,
    {
        let config = self.config;
        let options = Options::resolve(&config, overrides, &self.interfaces)?;
        let src = options
            .source
            .ok_or_else(|| Error::InvalidAddress("<none>".into()))?;

        let iface = match options.interface {
            Some(iface) => iface,
            None => find_usable_interface_for_destination(&self.interfaces, src, config.verbose)?.interface,
        };
        let announcement = ArpDatagram::gratuitous(iface.mac, src);

        let session = Session::open(&self.link, &iface)?;
        verbose!(
            config.verbose,
            "gratuitous arp over interface: '{}' with address: '{}'",
            session.interface(),
            src
        );
        let sent = session.send(&announcement).map(|_| ());
        session.close();
        sent
    }
}

/// Sends `request` and races a receive worker against `timeout`.
///
/// On timeout the worker is not joined: the session is closed at once, which fails the
/// worker's blocking receive and lets it exit on its own. The result channel has
/// one slot, so a late worker never blocks delivering a result nobody reads.
fn exchange<T: Transport>(
    session: &Arc<Session<T>>,
    request: ArpDatagram,
    timeout: Duration,
    verbose: bool,
) -> Result<Reply, Error> {
    let sent_at = session.send(&request)?;

    let (tx, rx) = crossbeam_channel::bounded(1);
    let worker = Arc::clone(session);
    thread::Builder::new()
        .name("arping-recv".into())
        .spawn(move || {
            let result = await_reply(&worker, &request, sent_at, verbose);
            let _ = tx.try_send(result);
        })
        .map_err(Error::Receive)?;

    // A deadline past what `Instant` can represent means waiting without one.
    let received = match Instant::now().checked_add(timeout) {
        Some(deadline) => rx.recv_deadline(deadline),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };
    match received {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            session.close();
            Err(Error::Timeout)
        }
        Err(RecvTimeoutError::Disconnected) => Err(Error::Receive(io::Error::new(
            io::ErrorKind::Other,
            "receive worker exited without a result",
        ))),
    }
}

fn await_reply<T: Transport>(
    session: &Session<T>,
    request: &ArpDatagram,
    sent_at: Instant,
    verbose: bool,
) -> Result<Reply, Error> {
    loop {
        let (response, received_at) = session.receive_one()?;

        if response.is_response_of(request) {
            verbose!(
                verbose,
                "process received arp: srcIP: '{}', srcMac: '{}'",
                response.sender_protocol_addr(),
                response.sender_hardware_addr()
            );
            return Ok(Reply {
                mac: response.sender_hardware_addr(),
                elapsed: received_at.saturating_duration_since(sent_at),
            });
        }

        verbose!(
            verbose,
            "ignore received arp: srcIP: '{}', srcMac: '{}'",
            response.sender_protocol_addr(),
            response.sender_hardware_addr()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test::interfaces::{iface, StaticInterfaces};
    use crate::utils::test::link::{reply_frame, MockLink};
    use arping_packets::{ArpOp, EthernetFrame};
    use std::convert::TryFrom;
    use std::net::Ipv4Addr;

    const PEER: MacAddr = MacAddr {
        bytes: [0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee],
    };

    fn lan() -> StaticInterfaces {
        StaticInterfaces::new(vec![
            iface("lo", 0, true, &[([127, 0, 0, 1], 8)]),
            iface("eth0", 1, true, &[([192, 168, 1, 10], 24)]),
        ])
    }

    fn arping(link: &MockLink) -> Arping<StaticInterfaces, &MockLink> {
        Arping::with_parts(lan(), link)
    }

    fn wait_until_released(link: &MockLink) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while link.live() > 0 {
            assert!(Instant::now() < deadline, "{} sessions still alive", link.live());
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn ping_resolves_peer() {
        let link = MockLink::answering(PEER);
        let reply = arping(&link).ping("192.168.1.1").unwrap();
        assert_eq!(reply.mac, PEER);
        assert!(reply.elapsed < Duration::from_secs(1));

        let sent = link.sent_datagrams();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].op(), Some(ArpOp::Request));
        assert_eq!(sent[0].sender_protocol_addr(), Ipv4Addr::new(192, 168, 1, 10));
        assert_eq!(sent[0].target_protocol_addr(), Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(sent[0].target_hardware_addr(), MacAddr::BROADCAST);
        wait_until_released(&link);
    }

    #[test]
    fn ping_ignores_unrelated_traffic() {
        let link = MockLink::with_responder(|request| {
            vec![
                vec![0xde, 0xad],
                reply_frame(
                    MacAddr::new([2, 0, 0, 0, 0, 0x66]),
                    Ipv4Addr::new(192, 168, 1, 66),
                    request,
                ),
                EthernetFrame::encap_arp(request, request.sender_hardware_addr()).data,
                reply_frame(PEER, request.target_protocol_addr(), request),
            ]
        });
        let reply = arping(&link).ping(Ipv4Addr::new(192, 168, 1, 1)).unwrap();
        assert_eq!(reply.mac, PEER);
    }

    #[test]
    fn ping_times_out_without_leaking_workers() {
        let link = MockLink::silent();
        let mut arping = arping(&link);
        arping.set_timeout(Duration::from_millis(10));

        for _ in 0..5 {
            let started = Instant::now();
            let err = arping.ping("192.168.1.1").unwrap_err();
            let took = started.elapsed();
            assert!(err.is_timeout(), "unexpected {:?}", err);
            assert!(took >= Duration::from_millis(10));
            assert!(took < Duration::from_secs(2));
        }

        wait_until_released(&link);
        assert_eq!(link.opened(), 5);
        assert_eq!(link.shutdowns(), 5);
    }

    #[test]
    fn timeout_override_beats_config() {
        let link = MockLink::silent();
        let arping = arping(&link);
        let started = Instant::now();
        let err = arping
            .ping_with_options("192.168.1.1", vec![Override::Timeout(Duration::from_millis(5))])
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < arping.config().timeout);
    }

    #[test]
    fn unrepresentable_timeout_waits_for_the_reply() {
        let link = MockLink::answering(PEER);
        let reply = arping(&link)
            .ping_with_options(
                "192.168.1.1",
                vec![Override::Timeout(Duration::from_secs(u64::MAX))],
            )
            .unwrap();
        assert_eq!(reply.mac, PEER);

        let mut arping = arping(&link);
        arping.set_timeout(Duration::new(u64::MAX, 999_999_999));
        assert_eq!(arping.ping("192.168.1.1").unwrap().mac, PEER);
        wait_until_released(&link);
    }

    #[test]
    fn invalid_addresses_are_rejected() {
        let link = MockLink::answering(PEER);
        let arping = arping(&link);
        for input in &["invalid", "fe80::e2cb:4eff:fed5:ca4e", "fe80::1"] {
            assert!(matches!(arping.ping(*input), Err(Error::InvalidAddress(_))));
            assert!(matches!(
                arping.gratuitous_arp(*input),
                Err(Error::InvalidAddress(_))
            ));
        }
        assert_eq!(link.opened(), 0);
    }

    #[test]
    fn unreachable_destination() {
        let link = MockLink::answering(PEER);
        let arping = arping(&link);
        assert!(matches!(
            arping.ping("172.16.0.1"),
            Err(Error::NoUsableInterface)
        ));
        assert!(matches!(
            arping.ping_over_interface_by_name("172.16.0.1", "eth0"),
            Err(Error::Unreachable { .. })
        ));
        assert!(matches!(
            arping.ping_over_interface_by_name("192.168.1.1", "eth7"),
            Err(Error::InterfaceNotFound(_))
        ));
        assert_eq!(link.opened(), 0);
    }

    #[test]
    fn explicit_interface_skips_scan() {
        let link = MockLink::answering(PEER);
        let interfaces = lan();
        let arping = Arping::with_parts(&interfaces, &link);
        let tap = iface("tap0", 5, true, &[([10, 9, 0, 1], 16)]);

        let reply = arping.ping_over_interface("10.9.8.7", tap.clone()).unwrap();
        assert_eq!(reply.mac, PEER);
        assert_eq!(interfaces.scans(), 0);
        assert_eq!(link.opened_on(), vec![tap.name]);
    }

    #[test]
    fn open_failure_is_reported() {
        let link = MockLink::failing_open();
        assert!(matches!(
            arping(&link).ping("192.168.1.1"),
            Err(Error::Open(_))
        ));
    }

    #[test]
    fn send_failure_closes_session() {
        let link = MockLink::failing_send();
        assert!(matches!(
            arping(&link).ping("192.168.1.1"),
            Err(Error::Send(_))
        ));
        assert_eq!(link.live(), 0);
        assert_eq!(link.shutdowns(), 1);
    }

    #[test]
    fn gratuitous_arp_broadcasts_without_waiting() {
        let link = MockLink::silent();
        let mut arping = arping(&link);
        arping.set_timeout(Duration::from_secs(30));

        let started = Instant::now();
        arping.gratuitous_arp("192.168.1.10").unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(link.live(), 0);

        let sent = link.sent();
        assert_eq!(sent.len(), 1);
        let frame = EthernetFrame::from_buffer(sent[0].clone()).unwrap();
        assert_eq!(frame.dest_mac(), MacAddr::BROADCAST);
        let datagram = ArpDatagram::try_from(&frame).unwrap();
        let addr = Ipv4Addr::new(192, 168, 1, 10);
        assert_eq!(datagram.sender_protocol_addr(), addr);
        assert_eq!(datagram.target_protocol_addr(), addr);
        assert_eq!(datagram.target_hardware_addr(), MacAddr::BROADCAST);
        let eth0 = lan().interface_by_name("eth0").unwrap();
        assert_eq!(datagram, ArpDatagram::gratuitous(eth0.mac, addr));
    }

    #[test]
    fn gratuitous_arp_over_named_interface() {
        let link = MockLink::silent();
        arping(&link)
            .gratuitous_arp_over_interface_by_name("10.20.30.40", "lo")
            .unwrap();
        assert_eq!(link.opened_on(), vec!["lo".to_string()]);
    }

    #[test]
    fn gratuitous_arp_needs_a_source() {
        let link = MockLink::silent();
        assert!(matches!(
            arping(&link).gratuitous_arp_with_options(vec![Override::InterfaceNamed("eth0".into())]),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            arping(&link).gratuitous_arp("172.16.0.1"),
            Err(Error::NoUsableInterface)
        ));
    }
}
