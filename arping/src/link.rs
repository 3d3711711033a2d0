use crate::{Error, Interface, Link, Transport};
use std::io;

/// Raw `AF_PACKET` sockets restricted to ARP frames. Only available on Linux; elsewhere
/// opening fails with `Error::UnsupportedPlatform`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PacketLink;

#[cfg(target_os = "linux")]
impl Link for PacketLink {
    type Transport = afpacket::BoundSocket;

    fn open(&self, interface: &Interface) -> Result<Self::Transport, Error> {
        use arping_packets::ARP_ETHER_TYPE;
        use std::ffi::CString;

        let name = CString::new(interface.name.as_str())
            .map_err(|err| Error::Open(io::Error::new(io::ErrorKind::InvalidInput, err)))?;
        let sock = afpacket::Socket::new(ARP_ETHER_TYPE).map_err(|err| {
            if err.kind() == io::ErrorKind::PermissionDenied {
                tracing::warn!("raw socket access requires root or cap_net_raw");
            }
            Error::Open(err)
        })?;
        sock.bind(&name).map_err(Error::Open)
    }
}

#[cfg(target_os = "linux")]
impl Transport for afpacket::BoundSocket {
    fn send_frame(&self, frame: &[u8]) -> io::Result<()> {
        let sent = self.send(frame)?;
        if sent != frame.len() {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "short frame write"));
        }
        Ok(())
    }

    fn recv_frame(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv(buf)
    }

    fn shutdown(&self) {
        afpacket::BoundSocket::shutdown(self)
    }
}

/// Transport type of platforms without raw socket support. It cannot be constructed.
#[cfg(not(target_os = "linux"))]
pub enum Unsupported {}

#[cfg(not(target_os = "linux"))]
impl Transport for Unsupported {
    fn send_frame(&self, _frame: &[u8]) -> io::Result<()> {
        match *self {}
    }

    fn recv_frame(&self, _buf: &mut [u8]) -> io::Result<usize> {
        match *self {}
    }

    fn shutdown(&self) {
        match *self {}
    }
}

#[cfg(not(target_os = "linux"))]
impl Link for PacketLink {
    type Transport = Unsupported;

    fn open(&self, _interface: &Interface) -> Result<Self::Transport, Error> {
        Err(Error::UnsupportedPlatform)
    }
}
