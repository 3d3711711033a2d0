use crate::{EthernetFrame, MacAddr, ARP_ETHER_TYPE, IPV4_ETHER_TYPE};
use std::convert::{TryFrom, TryInto};
use std::net::Ipv4Addr;
use thiserror::Error;

/// Size of an ARP payload for Ethernet hardware and IPv4 protocol addresses.
pub const ARP_DATAGRAM_LEN: usize = 28;

pub const ARP_HARDWARE_TYPE_ETHERNET: u16 = 1;
pub const ARP_PROTOCOL_TYPE_IPV4: u16 = IPV4_ETHER_TYPE;
pub const ARP_HARDWARE_ADDR_LEN: u8 = 6;
pub const ARP_PROTOCOL_ADDR_LEN: u8 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

impl ArpOp {
    pub fn from_u16(code: u16) -> Option<ArpOp> {
        match code {
            1 => Some(ArpOp::Request),
            2 => Some(ArpOp::Reply),
            _ => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("arp datagram too short: {len} bytes, expected at least 28")]
    TooShort { len: usize },
    #[error("unsupported arp hardware type: {0:#06x}")]
    HardwareType(u16),
    #[error("unsupported arp protocol type: {0:#06x}")]
    ProtocolType(u16),
    #[error("unexpected hardware address length: {0}")]
    HardwareAddrLen(u8),
    #[error("unexpected protocol address length: {0}")]
    ProtocolAddrLen(u8),
    #[error("frame does not have ARP ether type: {0:#06x}")]
    EtherType(u16),
}

// 0      2      4    5    6      8         14        18        24        28
// |-htype-|-ptype-|hlen|plen|--op--|--sha--|--spa--|--tha--|--tpa--|
const HARDWARE_TYPE_RANGE: (usize, usize) = (0, 2);
const PROTOCOL_TYPE_RANGE: (usize, usize) = (2, 4);
const HARDWARE_ADDR_LEN_OFFSET: usize = 4;
const PROTOCOL_ADDR_LEN_OFFSET: usize = 5;
const OPCODE_RANGE: (usize, usize) = (6, 8);
const SENDER_HARDWARE_ADDR_RANGE: (usize, usize) = (8, 14);
const SENDER_PROTOCOL_ADDR_RANGE: (usize, usize) = (14, 18);
const TARGET_HARDWARE_ADDR_RANGE: (usize, usize) = (18, 24);
const TARGET_PROTOCOL_ADDR_RANGE: (usize, usize) = (24, 28);

/// Serializes an Ethernet/IPv4 ARP payload as described in RFC 826.
/// https://tools.ietf.org/html/rfc826
pub fn encode(
    sender_mac: MacAddr,
    sender_ip: Ipv4Addr,
    target_mac: MacAddr,
    target_ip: Ipv4Addr,
    op: ArpOp,
) -> [u8; ARP_DATAGRAM_LEN] {
    let mut data = [0; ARP_DATAGRAM_LEN];
    put(&mut data, HARDWARE_TYPE_RANGE, &ARP_HARDWARE_TYPE_ETHERNET.to_be_bytes());
    put(&mut data, PROTOCOL_TYPE_RANGE, &ARP_PROTOCOL_TYPE_IPV4.to_be_bytes());
    data[HARDWARE_ADDR_LEN_OFFSET] = ARP_HARDWARE_ADDR_LEN;
    data[PROTOCOL_ADDR_LEN_OFFSET] = ARP_PROTOCOL_ADDR_LEN;
    put(&mut data, OPCODE_RANGE, &(op as u16).to_be_bytes());
    put(&mut data, SENDER_HARDWARE_ADDR_RANGE, &sender_mac.bytes);
    put(&mut data, SENDER_PROTOCOL_ADDR_RANGE, &sender_ip.octets());
    put(&mut data, TARGET_HARDWARE_ADDR_RANGE, &target_mac.bytes);
    put(&mut data, TARGET_PROTOCOL_ADDR_RANGE, &target_ip.octets());
    data
}

fn put(data: &mut [u8; ARP_DATAGRAM_LEN], (start, end): (usize, usize), bytes: &[u8]) {
    data[start..end].copy_from_slice(bytes);
}

///
/// Immutable view over a validated 28 byte ARP payload carrying Ethernet hardware addresses
/// and IPv4 protocol addresses.
///
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ArpDatagram {
    data: [u8; ARP_DATAGRAM_LEN],
}

impl ArpDatagram {
    pub fn new(
        op: ArpOp,
        sender_mac: MacAddr,
        sender_ip: Ipv4Addr,
        target_mac: MacAddr,
        target_ip: Ipv4Addr,
    ) -> Self {
        ArpDatagram {
            data: encode(sender_mac, sender_ip, target_mac, target_ip, op),
        }
    }

    pub fn request(
        sender_mac: MacAddr,
        sender_ip: Ipv4Addr,
        target_mac: MacAddr,
        target_ip: Ipv4Addr,
    ) -> Self {
        ArpDatagram::new(ArpOp::Request, sender_mac, sender_ip, target_mac, target_ip)
    }

    /// Builds an unsolicited announcement of `addr`: sender and target protocol addresses are
    /// both `addr` and the target hardware address is broadcast.
    pub fn gratuitous(sender_mac: MacAddr, addr: Ipv4Addr) -> Self {
        ArpDatagram::request(sender_mac, addr, MacAddr::BROADCAST, addr)
    }

    ///
    /// Validates and copies the first 28 bytes of `bytes`. Trailing bytes, such as Ethernet
    /// padding, are ignored.
    ///
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < ARP_DATAGRAM_LEN {
            return Err(DecodeError::TooShort { len: bytes.len() });
        }

        let mut data = [0; ARP_DATAGRAM_LEN];
        data.copy_from_slice(&bytes[..ARP_DATAGRAM_LEN]);
        let datagram = ArpDatagram { data };

        if datagram.hardware_type() != ARP_HARDWARE_TYPE_ETHERNET {
            return Err(DecodeError::HardwareType(datagram.hardware_type()));
        }
        if datagram.protocol_type() != ARP_PROTOCOL_TYPE_IPV4 {
            return Err(DecodeError::ProtocolType(datagram.protocol_type()));
        }
        if datagram.hardware_addr_len() != ARP_HARDWARE_ADDR_LEN {
            return Err(DecodeError::HardwareAddrLen(datagram.hardware_addr_len()));
        }
        if datagram.protocol_addr_len() != ARP_PROTOCOL_ADDR_LEN {
            return Err(DecodeError::ProtocolAddrLen(datagram.protocol_addr_len()));
        }

        Ok(datagram)
    }

    pub fn as_bytes(&self) -> &[u8; ARP_DATAGRAM_LEN] {
        &self.data
    }

    pub fn hardware_type(&self) -> u16 {
        self.u16_at(HARDWARE_TYPE_RANGE)
    }

    pub fn protocol_type(&self) -> u16 {
        self.u16_at(PROTOCOL_TYPE_RANGE)
    }

    pub fn hardware_addr_len(&self) -> u8 {
        self.data[HARDWARE_ADDR_LEN_OFFSET]
    }

    pub fn protocol_addr_len(&self) -> u8 {
        self.data[PROTOCOL_ADDR_LEN_OFFSET]
    }

    pub fn opcode(&self) -> u16 {
        self.u16_at(OPCODE_RANGE)
    }

    /// Returns `None` for opcodes other than request and reply (e.g. RARP).
    pub fn op(&self) -> Option<ArpOp> {
        ArpOp::from_u16(self.opcode())
    }

    pub fn sender_hardware_addr(&self) -> MacAddr {
        MacAddr::new(self.arp_data(SENDER_HARDWARE_ADDR_RANGE).try_into().unwrap())
    }

    pub fn sender_protocol_addr(&self) -> Ipv4Addr {
        self.ipv4_at(SENDER_PROTOCOL_ADDR_RANGE)
    }

    pub fn target_hardware_addr(&self) -> MacAddr {
        MacAddr::new(self.arp_data(TARGET_HARDWARE_ADDR_RANGE).try_into().unwrap())
    }

    pub fn target_protocol_addr(&self) -> Ipv4Addr {
        self.ipv4_at(TARGET_PROTOCOL_ADDR_RANGE)
    }

    /// A datagram answers `request` if it is a reply sent from the address that was asked for.
    /// ARP carries no transaction id, so the protocol address is the only correlation key.
    pub fn is_response_of(&self, request: &ArpDatagram) -> bool {
        self.op() == Some(ArpOp::Reply)
            && self.sender_protocol_addr() == request.target_protocol_addr()
    }

    fn arp_data(&self, (start, end): (usize, usize)) -> &[u8] {
        &self.data[start..end]
    }

    fn u16_at(&self, range: (usize, usize)) -> u16 {
        u16::from_be_bytes(self.arp_data(range).try_into().unwrap())
    }

    fn ipv4_at(&self, range: (usize, usize)) -> Ipv4Addr {
        let octets: [u8; 4] = self.arp_data(range).try_into().unwrap();
        Ipv4Addr::from(octets)
    }
}

impl std::fmt::Debug for ArpDatagram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArpDatagram")
            .field("opcode", &self.opcode())
            .field("sender_hardware_addr", &self.sender_hardware_addr())
            .field("sender_protocol_addr", &self.sender_protocol_addr())
            .field("target_hardware_addr", &self.target_hardware_addr())
            .field("target_protocol_addr", &self.target_protocol_addr())
            .finish()
    }
}

impl TryFrom<&EthernetFrame> for ArpDatagram {
    type Error = DecodeError;

    fn try_from(frame: &EthernetFrame) -> Result<Self, Self::Error> {
        if frame.ether_type() != ARP_ETHER_TYPE {
            return Err(DecodeError::EtherType(frame.ether_type()));
        }
        ArpDatagram::decode(frame.payload())
    }
}
