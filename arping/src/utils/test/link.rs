use crate::{Error, Interface, Link, MacAddr, Transport};
use arping_packets::{ArpDatagram, ArpOp, EthernetFrame};
use std::collections::VecDeque;
use std::convert::TryFrom;
use std::io;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

type Responder = dyn Fn(&ArpDatagram) -> Vec<Vec<u8>> + Send + Sync;

/// Encodes the reply `mac`/`from` would send to `request`, framed for the wire.
pub(crate) fn reply_frame(mac: MacAddr, from: Ipv4Addr, request: &ArpDatagram) -> Vec<u8> {
    let reply = ArpDatagram::new(
        ArpOp::Reply,
        mac,
        from,
        request.sender_hardware_addr(),
        request.sender_protocol_addr(),
    );
    EthernetFrame::encap_arp(&reply, mac).data
}

#[derive(Default)]
struct Shared {
    live: AtomicUsize,
    opened: AtomicUsize,
    shutdowns: AtomicUsize,
    sent: Mutex<Vec<Vec<u8>>>,
    opened_on: Mutex<Vec<String>>,
}

/// An in-memory link. Every frame a transport sends is recorded and shown to the responder,
/// whose frames are then queued for that transport to receive.
pub(crate) struct MockLink {
    shared: Arc<Shared>,
    responder: Arc<Responder>,
    fail_open: bool,
    fail_send: bool,
}

impl MockLink {
    pub(crate) fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&ArpDatagram) -> Vec<Vec<u8>> + Send + Sync + 'static,
    {
        MockLink {
            shared: Arc::new(Shared::default()),
            responder: Arc::new(responder),
            fail_open: false,
            fail_send: false,
        }
    }

    /// Nobody on the link answers.
    pub(crate) fn silent() -> Self {
        MockLink::with_responder(|_| vec![])
    }

    /// The target of every request answers from `mac`.
    pub(crate) fn answering(mac: MacAddr) -> Self {
        MockLink::with_responder(move |datagram| match datagram.op() {
            Some(ArpOp::Request) => vec![reply_frame(mac, datagram.target_protocol_addr(), datagram)],
            _ => vec![],
        })
    }

    pub(crate) fn failing_open() -> Self {
        MockLink {
            fail_open: true,
            ..MockLink::silent()
        }
    }

    pub(crate) fn failing_send() -> Self {
        MockLink {
            fail_send: true,
            ..MockLink::silent()
        }
    }

    /// Transports that have been opened and not yet dropped.
    pub(crate) fn live(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    pub(crate) fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn shutdowns(&self) -> usize {
        self.shared.shutdowns.load(Ordering::SeqCst)
    }

    pub(crate) fn opened_on(&self) -> Vec<String> {
        self.shared.opened_on.lock().unwrap().clone()
    }

    pub(crate) fn sent(&self) -> Vec<Vec<u8>> {
        self.shared.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_datagrams(&self) -> Vec<ArpDatagram> {
        self.sent().into_iter().filter_map(decode).collect()
    }
}

fn decode(frame: Vec<u8>) -> Option<ArpDatagram> {
    let frame = EthernetFrame::from_buffer(frame).ok()?;
    ArpDatagram::try_from(&frame).ok()
}

impl Link for MockLink {
    type Transport = MockTransport;

    fn open(&self, interface: &Interface) -> Result<MockTransport, Error> {
        if self.fail_open {
            return Err(Error::Open(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "Operation not permitted",
            )));
        }
        self.shared.live.fetch_add(1, Ordering::SeqCst);
        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        self.shared
            .opened_on
            .lock()
            .unwrap()
            .push(interface.name.clone());
        Ok(MockTransport {
            shared: Arc::clone(&self.shared),
            responder: Arc::clone(&self.responder),
            fail_send: self.fail_send,
            inbox: Mutex::new(Inbox::default()),
            ready: Condvar::new(),
        })
    }
}

#[derive(Default)]
struct Inbox {
    frames: VecDeque<Vec<u8>>,
    shut: bool,
}

pub(crate) struct MockTransport {
    shared: Arc<Shared>,
    responder: Arc<Responder>,
    fail_send: bool,
    inbox: Mutex<Inbox>,
    ready: Condvar,
}

impl Transport for MockTransport {
    fn send_frame(&self, frame: &[u8]) -> io::Result<()> {
        if self.fail_send {
            return Err(io::Error::new(io::ErrorKind::Other, "network is down"));
        }
        let mut inbox = self.inbox.lock().unwrap();
        if inbox.shut {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "shut down"));
        }
        self.shared.sent.lock().unwrap().push(frame.to_vec());
        if let Some(datagram) = decode(frame.to_vec()) {
            inbox.frames.extend((self.responder)(&datagram));
        }
        self.ready.notify_all();
        Ok(())
    }

    fn recv_frame(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inbox = self.inbox.lock().unwrap();
        loop {
            if inbox.shut {
                return Err(io::Error::new(io::ErrorKind::NotConnected, "shut down"));
            }
            if let Some(frame) = inbox.frames.pop_front() {
                let len = frame.len().min(buf.len());
                buf[..len].copy_from_slice(&frame[..len]);
                return Ok(len);
            }
            inbox = self.ready.wait(inbox).unwrap();
        }
    }

    fn shutdown(&self) {
        self.shared.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.inbox.lock().unwrap().shut = true;
        self.ready.notify_all();
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.shared.live.fetch_sub(1, Ordering::SeqCst);
    }
}
