//! Resolve the hardware address of a host on the local network, or check that it is alive, by
//! exchanging ARP datagrams over a raw link-layer socket. Gratuitous (unsolicited) ARP
//! announcements are supported as well.
//!
//! Raw socket access is required: run as root, or under Linux grant the binary
//! `cap_net_raw` (`sudo setcap cap_net_raw+ep <BIN>`).
//!
//! ```no_run
//! match arping::ping("192.168.1.1") {
//!     Ok(reply) => println!("online: {} in {:?}", reply.mac, reply.elapsed),
//!     Err(arping::Error::Timeout) => println!("offline"),
//!     Err(err) => println!("{}", err),
//! }
//! ```

/// Emits a progress event when verbose logging is enabled for the running operation.
macro_rules! verbose {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            ::tracing::info!($($arg)+);
        }
    };
}

mod addr;
mod config;
mod error;
mod interface;
mod link;
mod options;
mod ping;
mod select;
mod session;

#[cfg(test)]
mod utils;

pub use addr::IntoIpv4;
pub use arping_packets::{ArpDatagram, ArpOp, MacAddr};
pub use config::{Config, DEFAULT_TIMEOUT};
pub use error::Error;
pub use interface::{Interface, InterfaceSource, Ipv4Network, SystemInterfaces};
pub use link::PacketLink;
pub use options::{Options, Override};
pub use ping::{Arping, Reply};
pub use select::{
    find_local_address_on_interface, find_usable_interface_for_destination, InterfaceBinding,
};
pub use session::{Link, Session, Transport};

/// Sends an ARP request to `dst` over the interface whose network contains it.
pub fn ping<A: IntoIpv4>(dst: A) -> Result<Reply, Error> {
    Arping::new().ping(dst)
}

/// Sends an ARP request to `dst` over the interface called `name`.
pub fn ping_over_interface_by_name<A: IntoIpv4>(dst: A, name: &str) -> Result<Reply, Error> {
    Arping::new().ping_over_interface_by_name(dst, name)
}

/// Sends an ARP request to `dst` over `iface`.
pub fn ping_over_interface<A: IntoIpv4>(dst: A, iface: Interface) -> Result<Reply, Error> {
    Arping::new().ping_over_interface(dst, iface)
}

/// Sends an ARP request to `dst`, applying `overrides` in order.
pub fn ping_with_options<A, I>(dst: A, overrides: I) -> Result<Reply, Error>
where
    A: IntoIpv4,
    I: IntoIterator<Item = Override>,
{
    Arping::new().ping_with_options(dst, overrides)
}

/// Announces `src` with a gratuitous ARP.
pub fn gratuitous_arp<A: IntoIpv4>(src: A) -> Result<(), Error> {
    Arping::new().gratuitous_arp(src)
}

/// Announces `src` with a gratuitous ARP over the interface called `name`.
pub fn gratuitous_arp_over_interface_by_name<A: IntoIpv4>(src: A, name: &str) -> Result<(), Error> {
    Arping::new().gratuitous_arp_over_interface_by_name(src, name)
}

/// Announces `src` with a gratuitous ARP over `iface`.
pub fn gratuitous_arp_over_interface<A: IntoIpv4>(src: A, iface: Interface) -> Result<(), Error> {
    Arping::new().gratuitous_arp_over_interface(src, iface)
}

/// Sends a gratuitous ARP for the address given by an `Override::SourceAddr`.
pub fn gratuitous_arp_with_options<I>(overrides: I) -> Result<(), Error>
where
    I: IntoIterator<Item = Override>,
{
    Arping::new().gratuitous_arp_with_options(overrides)
}
