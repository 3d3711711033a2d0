use libc;
use std::{ffi::CStr, io, net::Ipv4Addr, ptr};

/// Everything `getifaddrs(3)` reports about one network interface that matters for link-layer
/// neighbor discovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceAddrs {
    pub name: String,
    pub index: i32,
    /// `IFF_*` flags, see man 7 netdevice.
    pub flags: u32,
    pub hardware_addr: Option<[u8; 6]>,
    /// (address, netmask) pairs bound to the interface.
    pub ipv4: Vec<(Ipv4Addr, Ipv4Addr)>,
}

impl InterfaceAddrs {
    fn named(name: &str) -> Self {
        InterfaceAddrs {
            name: name.to_owned(),
            index: 0,
            flags: 0,
            hardware_addr: None,
            ipv4: vec![],
        }
    }

    pub fn is_up(&self) -> bool {
        self.flags & libc::IFF_UP as u32 != 0
    }
}

/// Lists the host's interfaces in the order the kernel reports them.
///
/// IPv4 addresses on alias labels such as `eth0:1` are merged into their parent interface.
pub fn interfaces() -> io::Result<Vec<InterfaceAddrs>> {
    let mut head: *mut libc::ifaddrs = ptr::null_mut();
    // Resources:
    // man 3 getifaddrs
    if unsafe { libc::getifaddrs(&mut head) } < 0 {
        return Err(io::Error::last_os_error());
    }

    let mut found: Vec<InterfaceAddrs> = vec![];
    let mut cursor = head;
    // The list is owned by libc until `freeifaddrs`; nothing borrowed from it escapes the loop.
    while !cursor.is_null() {
        let entry = unsafe { &*cursor };
        cursor = entry.ifa_next;

        if entry.ifa_name.is_null() {
            continue;
        }
        let label = unsafe { CStr::from_ptr(entry.ifa_name) }.to_string_lossy();
        let name = label.split(':').next().unwrap_or_default();

        let pos = match found.iter().position(|i| i.name == name) {
            Some(pos) => pos,
            None => {
                found.push(InterfaceAddrs::named(name));
                found.len() - 1
            }
        };
        let iface = &mut found[pos];
        iface.flags |= entry.ifa_flags as u32;

        if entry.ifa_addr.is_null() {
            continue;
        }
        match unsafe { (*entry.ifa_addr).sa_family } as libc::c_int {
            libc::AF_PACKET => {
                let ll = unsafe { &*(entry.ifa_addr as *const libc::sockaddr_ll) };
                iface.index = ll.sll_ifindex;
                if ll.sll_halen == 6 {
                    let mut mac = [0; 6];
                    mac.copy_from_slice(&ll.sll_addr[..6]);
                    iface.hardware_addr = Some(mac);
                }
            }
            libc::AF_INET => {
                let addr = unsafe { ipv4_of(entry.ifa_addr) };
                let netmask = if entry.ifa_netmask.is_null() {
                    Ipv4Addr::new(255, 255, 255, 255)
                } else {
                    unsafe { ipv4_of(entry.ifa_netmask) }
                };
                iface.ipv4.push((addr, netmask));
            }
            _ => {}
        }
    }

    unsafe { libc::freeifaddrs(head) };
    Ok(found)
}

/// Reads the address out of a `sockaddr` known to be `AF_INET`. The netmask entries of
/// `getifaddrs` do not always carry a family, so the caller decides.
unsafe fn ipv4_of(addr: *const libc::sockaddr) -> Ipv4Addr {
    let sin = &*(addr as *const libc::sockaddr_in);
    Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr))
}
