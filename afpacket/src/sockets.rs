#![deny(missing_docs)]

use crate::linux;
use libc;
use std::{
    ffi::CStr,
    io,
    mem::{self, MaybeUninit},
    ptr,
    sync::atomic::{AtomicBool, Ordering},
};

/// Represents an unbound `AF_PACKET` socket. At this phase of a socket's lifecycle, it only
/// knows which ethertype it will exchange.
pub struct Socket {
    fd: libc::c_int,
    protocol: u16,
}

/// Represents a bound `AF_PACKET` socket. At this phase of a socket's lifecycle, it can be read
/// from and written to, possibly from different threads at once.
///
/// A `BoundSocket` can be shut down while another thread is blocked in [`recv`](#method.recv):
/// the blocked call returns an error of kind `NotConnected`, as will every later `send` or
/// `recv`. The descriptor itself is released when the socket is dropped.
pub struct BoundSocket {
    fd: libc::c_int,
    wake_fd: libc::c_int,
    send_addr: libc::sockaddr_ll,
    shut: AtomicBool,
}

impl Socket {
    /// Creates a new unbound raw socket that only sees frames of the given ethertype, e.g.
    /// `0x0806` for ARP.
    pub fn new(ethertype: u16) -> io::Result<Self> {
        // This block must be marked as unsafe because it uses FFI with C code. It does not touch
        // any memory owned by Rust code, and it returns an Err if the descriptor is not created.
        let fd = unsafe {
            // Resources:
            // man 7 packet
            // The protocol is given in network byte order.
            let fd = libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                ethertype.to_be() as libc::c_int,
            );
            if fd < 0 {
                return Err(io::Error::last_os_error());
            }
            fd
        };
        Ok(Self {
            fd,
            protocol: ethertype,
        })
    }

    /// Binds the socket to a network interface. This function consumes the `Socket` instance, as
    /// no more configuration options may be safely changed.
    pub fn bind(self, iface: impl AsRef<CStr>) -> io::Result<BoundSocket> {
        let name = iface.as_ref().to_bytes_with_nul();
        if name.len() > libc::IFNAMSIZ {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "interface name too long",
            ));
        }

        // This block is marked as unsafe because it uses FFI. The interface name is copied with
        // its length checked above, and every failure is reported through `last_os_error`.
        let send_addr = unsafe {
            // get the index of the interface
            let mut ifr: linux::ifreq = MaybeUninit::zeroed().assume_init();
            ptr::copy_nonoverlapping(
                name.as_ptr() as *const libc::c_char,
                ifr.ifr_ifrn.ifrn_name.as_mut_ptr(),
                name.len(),
            );
            // ioctl(SIOCGIFINDEX) fills in the index field of the ifreq object
            // Resources:
            // man 7 netdevice
            let err = libc::ioctl(self.fd, linux::SIOCGIFINDEX, &mut ifr);
            if err < 0 {
                return Err(io::Error::last_os_error());
            }

            // bind the socket
            let mut ll: libc::sockaddr_ll = MaybeUninit::zeroed().assume_init();
            ll.sll_family = libc::AF_PACKET as libc::c_ushort;
            ll.sll_protocol = self.protocol.to_be();
            ll.sll_ifindex = ifr.ifr_ifru.ifru_ivalue; // expanded from `ifr_ifindex` in kernel headers
            let err = libc::bind(
                self.fd,
                &ll as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            );
            if err < 0 {
                return Err(io::Error::last_os_error());
            }
            ll
        };

        // An eventfd that becomes readable once the socket is shut down.
        // Resources:
        // man 2 eventfd
        let wake_fd = unsafe { libc::eventfd(0, libc::EFD_CLOEXEC | libc::EFD_NONBLOCK) };
        if wake_fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let fd = self.fd;
        // The descriptor is transferred to the BoundSocket, so `self` must not close it.
        mem::forget(self);
        Ok(BoundSocket {
            fd,
            wake_fd,
            send_addr,
            shut: AtomicBool::new(false),
        })
    }
}

impl BoundSocket {
    /// Sends a complete link-layer frame to the NIC.
    pub fn send(&self, frame: &[u8]) -> io::Result<usize> {
        if self.is_shut_down() {
            return Err(shut_down_error());
        }
        // This block is marked as unsafe because it uses FFI. The frame is borrowed for the
        // duration of the call and its length is passed along with it.
        unsafe {
            // Resources:
            // https://beej.us/guide/bgnet/html/multi/syscalls.html#sendtorecv
            let bytes = libc::sendto(
                self.fd,
                frame.as_ptr() as *const _,
                frame.len(),
                0,
                &self.send_addr as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            );
            if bytes < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(bytes as usize)
            }
        }
    }

    /// Blocks until a frame is received from the NIC or the socket is shut down.
    pub fn recv(&self, frame: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.is_shut_down() {
                return Err(shut_down_error());
            }

            let mut fds = [
                libc::pollfd {
                    fd: self.fd,
                    events: libc::POLLIN,
                    revents: 0,
                },
                libc::pollfd {
                    fd: self.wake_fd,
                    events: libc::POLLIN,
                    revents: 0,
                },
            ];
            // Resources:
            // man 2 poll
            let ready = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
            if ready < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            if fds[1].revents != 0 {
                return Err(shut_down_error());
            }
            if fds[0].revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "socket error"));
            }
            if fds[0].revents & libc::POLLIN == 0 {
                continue;
            }

            // Note comment in `send` call.
            let bytes = unsafe {
                libc::recv(
                    self.fd,
                    frame.as_mut_ptr() as *mut _,
                    frame.len(),
                    libc::MSG_DONTWAIT,
                )
            };
            if bytes < 0 {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => continue,
                    _ => return Err(err),
                }
            }
            return Ok(bytes as usize);
        }
    }

    /// Shuts the socket down, waking any thread blocked in `recv`. Calling this more than once
    /// has no further effect.
    pub fn shutdown(&self) {
        if self.shut.swap(true, Ordering::AcqRel) {
            return;
        }
        let wake = linux::WAKE.to_ne_bytes();
        // A failed write leaves the flag set, which `recv` checks on its next iteration.
        unsafe {
            libc::write(self.wake_fd, wake.as_ptr() as *const _, wake.len());
        }
    }

    /// Returns true once `shutdown` has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shut.load(Ordering::Acquire)
    }
}

fn shut_down_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "socket has been shut down")
}

impl Drop for Socket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

impl Drop for BoundSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
            libc::close(self.wake_fd);
        }
    }
}
