use crate::{ArpDatagram, MacAddr};
use std::convert::TryInto;

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const ARP_ETHER_TYPE: u16 = 0x0806;
pub const IPV4_ETHER_TYPE: u16 = 0x0800;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EthernetFrame {
    pub data: Vec<u8>,
}

impl EthernetFrame {
    pub fn from_buffer(frame: Vec<u8>) -> Result<EthernetFrame, &'static str> {
        // Ethernet II frames must be at least the header, which is 14bytes
        // 0                    6                    12                      14
        // |---6 byte Dest_MAC--|---6 byte Src_MAC---|--2 Byte EtherType---|
        if frame.len() < ETHERNET_HEADER_LEN {
            return Err("Frame is less than the minimum of 14 bytes");
        }

        Ok(EthernetFrame { data: frame })
    }

    /// Returns a header-only frame with every field zeroed.
    pub fn empty() -> EthernetFrame {
        EthernetFrame {
            data: vec![0; ETHERNET_HEADER_LEN],
        }
    }

    /// Wraps an ARP datagram in a frame addressed to the datagram's target hardware address.
    pub fn encap_arp(datagram: &ArpDatagram, src_mac: MacAddr) -> EthernetFrame {
        let mut frame = EthernetFrame::empty();
        frame.set_dest_mac(datagram.target_hardware_addr());
        frame.set_src_mac(src_mac);
        frame.set_ether_type(ARP_ETHER_TYPE);
        frame.set_payload(datagram.as_bytes());
        frame
    }

    pub fn dest_mac(&self) -> MacAddr {
        MacAddr::new(self.data[0..6].try_into().unwrap())
    }

    pub fn src_mac(&self) -> MacAddr {
        MacAddr::new(self.data[6..12].try_into().unwrap())
    }

    pub fn set_dest_mac(&mut self, mac: MacAddr) {
        self.data[..6].copy_from_slice(&mac.bytes);
    }

    pub fn set_src_mac(&mut self, mac: MacAddr) {
        self.data[6..12].copy_from_slice(&mac.bytes);
    }

    pub fn ether_type(&self) -> u16 {
        u16::from_be_bytes(self.data[12..=13].try_into().unwrap())
    }

    pub fn set_ether_type(&mut self, ether_type: u16) {
        self.data[12..=13].copy_from_slice(&ether_type.to_be_bytes());
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[ETHERNET_HEADER_LEN..]
    }

    pub fn set_payload(&mut self, payload: &[u8]) {
        self.data.truncate(ETHERNET_HEADER_LEN);
        self.data.reserve_exact(payload.len());
        self.data.extend_from_slice(payload);
    }
}
