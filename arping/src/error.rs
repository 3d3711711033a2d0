use std::io;
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not a valid v4 address: {0}")]
    InvalidAddress(String),

    #[error("no usable interface found")]
    NoUsableInterface,

    #[error("no such network interface: '{0}'")]
    InterfaceNotFound(String),

    #[error("iface: '{interface}' can't reach ip: '{destination}'")]
    Unreachable {
        interface: String,
        destination: Ipv4Addr,
    },

    #[error("unable to open raw socket: {0}")]
    Open(#[source] io::Error),

    #[error("unable to send arp datagram: {0}")]
    Send(#[source] io::Error),

    #[error("unable to receive arp datagram: {0}")]
    Receive(#[source] io::Error),

    #[error("timeout")]
    Timeout,

    #[error("raw socket access is not supported on this platform")]
    UnsupportedPlatform,

    #[error("unable to list network interfaces: {0}")]
    Enumerate(#[source] io::Error),
}

impl Error {
    /// True for the expected "nobody answered" outcome, as opposed to a failure.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout => true,
            _ => false,
        }
    }
}
