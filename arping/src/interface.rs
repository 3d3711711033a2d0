use crate::{Error, MacAddr};
use cidr::Ipv4Inet;
use std::net::Ipv4Addr;

/// An IPv4 address bound to an interface, together with the length of its network prefix.
pub type Ipv4Network = Ipv4Inet;

/// A local network interface as seen at the start of an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub index: i32,
    pub mac: MacAddr,
    pub up: bool,
    pub networks: Vec<Ipv4Network>,
}

impl Interface {
    /// Returns the first bound address whose network contains `dst`.
    pub fn address_for(&self, dst: Ipv4Addr) -> Option<Ipv4Addr> {
        self.networks
            .iter()
            .find(|net| net.contains(&dst))
            .map(|net| net.address())
    }
}

/// Enumerates local interfaces.
pub trait InterfaceSource {
    /// All interfaces, in the order the platform reports them.
    fn interfaces(&self) -> Result<Vec<Interface>, Error>;

    fn interface_by_name(&self, name: &str) -> Result<Interface, Error> {
        self.interfaces()?
            .into_iter()
            .find(|iface| iface.name == name)
            .ok_or_else(|| Error::InterfaceNotFound(name.to_owned()))
    }
}

impl<S: InterfaceSource + ?Sized> InterfaceSource for &S {
    fn interfaces(&self) -> Result<Vec<Interface>, Error> {
        (**self).interfaces()
    }

    fn interface_by_name(&self, name: &str) -> Result<Interface, Error> {
        (**self).interface_by_name(name)
    }
}

/// The host's own interfaces.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemInterfaces;

#[cfg(target_os = "linux")]
impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> Result<Vec<Interface>, Error> {
        Ok(afpacket::interfaces()
            .map_err(Error::Enumerate)?
            .into_iter()
            .map(Interface::from)
            .collect())
    }
}

#[cfg(not(target_os = "linux"))]
impl InterfaceSource for SystemInterfaces {
    fn interfaces(&self) -> Result<Vec<Interface>, Error> {
        Err(Error::UnsupportedPlatform)
    }
}

#[cfg(target_os = "linux")]
impl From<afpacket::InterfaceAddrs> for Interface {
    fn from(addrs: afpacket::InterfaceAddrs) -> Self {
        let up = addrs.is_up();
        let networks = addrs
            .ipv4
            .iter()
            .filter_map(|&(addr, netmask)| Ipv4Inet::new(addr, prefix_len(netmask)).ok())
            .collect();
        Interface {
            name: addrs.name,
            index: addrs.index,
            mac: addrs.hardware_addr.map(MacAddr::new).unwrap_or_default(),
            up,
            networks,
        }
    }
}

/// Prefix length of a contiguous netmask such as 255.255.255.0.
pub(crate) fn prefix_len(netmask: Ipv4Addr) -> u8 {
    (!u32::from(netmask)).leading_zeros() as u8
}
