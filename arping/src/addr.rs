use crate::Error;
use std::net::{IpAddr, Ipv4Addr};

/// Conversion into the IPv4 address an operation targets. IPv6 input is rejected rather than
/// mapped, so `::ffff:10.0.0.1` is an error too.
pub trait IntoIpv4 {
    fn into_ipv4(self) -> Result<Ipv4Addr, Error>;
}

impl IntoIpv4 for Ipv4Addr {
    fn into_ipv4(self) -> Result<Ipv4Addr, Error> {
        Ok(self)
    }
}

impl IntoIpv4 for IpAddr {
    fn into_ipv4(self) -> Result<Ipv4Addr, Error> {
        match self {
            IpAddr::V4(v4) => Ok(v4),
            IpAddr::V6(v6) => Err(Error::InvalidAddress(v6.to_string())),
        }
    }
}

impl IntoIpv4 for &str {
    fn into_ipv4(self) -> Result<Ipv4Addr, Error> {
        self.trim()
            .parse::<IpAddr>()
            .map_err(|_| Error::InvalidAddress(self.to_owned()))?
            .into_ipv4()
    }
}

impl IntoIpv4 for &String {
    fn into_ipv4(self) -> Result<Ipv4Addr, Error> {
        self.as_str().into_ipv4()
    }
}

impl IntoIpv4 for String {
    fn into_ipv4(self) -> Result<Ipv4Addr, Error> {
        self.as_str().into_ipv4()
    }
}
