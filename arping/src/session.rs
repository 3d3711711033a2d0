use crate::{Error, Interface, MacAddr};
use arping_packets::{ArpDatagram, EthernetFrame};
use std::convert::TryFrom;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Largest frame read off the wire: an untagged Ethernet II frame without FCS.
const MAX_FRAME_LEN: usize = 1514;

/// A raw link-layer channel bound to a single interface.
///
/// `shutdown` may be called from any thread and must make a concurrent or later
/// `recv_frame` fail instead of blocking.
pub trait Transport: Send + Sync + 'static {
    fn send_frame(&self, frame: &[u8]) -> io::Result<()>;
    fn recv_frame(&self, buf: &mut [u8]) -> io::Result<usize>;
    fn shutdown(&self);
}

/// Opens transports on interfaces.
pub trait Link {
    type Transport: Transport;

    fn open(&self, interface: &Interface) -> Result<Self::Transport, Error>;
}

impl<L: Link + ?Sized> Link for &L {
    type Transport = L::Transport;

    fn open(&self, interface: &Interface) -> Result<Self::Transport, Error> {
        (**self).open(interface)
    }
}

/// Exclusive use of one raw socket for the duration of one operation.
///
/// The session is closed when dropped, so every exit path of the owning operation releases
/// the socket. `close` can be called earlier from another thread to abandon a pending
/// `receive_one`.
pub struct Session<T: Transport> {
    transport: T,
    interface: String,
    mac: MacAddr,
    closed: AtomicBool,
}

impl<T: Transport> Session<T> {
    pub fn open<L>(link: &L, interface: &Interface) -> Result<Self, Error>
    where
        L: Link<Transport = T> + ?Sized,
    {
        let transport = link.open(interface)?;
        Ok(Session {
            transport,
            interface: interface.name.clone(),
            mac: interface.mac,
            closed: AtomicBool::new(false),
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Sends `datagram` in an Ethernet frame from this interface's hardware address to the
    /// datagram's target hardware address. Returns when the send completed.
    pub fn send(&self, datagram: &ArpDatagram) -> Result<Instant, Error> {
        if self.is_closed() {
            return Err(Error::Send(closed_error()));
        }
        let frame = EthernetFrame::encap_arp(datagram, self.mac);
        self.transport.send_frame(&frame.data).map_err(Error::Send)?;
        Ok(Instant::now())
    }

    /// Blocks until the next ARP datagram arrives, skipping frames that do not decode.
    pub fn receive_one(&self) -> Result<(ArpDatagram, Instant), Error> {
        let mut buf = vec![0; MAX_FRAME_LEN];
        loop {
            if self.is_closed() {
                return Err(Error::Receive(closed_error()));
            }
            let len = self.transport.recv_frame(&mut buf).map_err(Error::Receive)?;
            let received_at = Instant::now();

            let frame = match EthernetFrame::from_buffer(buf[..len].to_vec()) {
                Ok(frame) => frame,
                Err(reason) => {
                    tracing::trace!(len, reason, "dropping runt frame");
                    continue;
                }
            };
            match ArpDatagram::try_from(&frame) {
                Ok(datagram) => return Ok((datagram, received_at)),
                Err(err) => tracing::trace!(%err, "dropping frame"),
            }
        }
    }

    /// Releases the socket. Only the first call has an effect.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.transport.shutdown();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.close();
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "session closed")
}
