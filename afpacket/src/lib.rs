#![cfg(target_os = "linux")]
mod ifaddrs;
mod linux;
mod sockets;

pub use ifaddrs::{interfaces, InterfaceAddrs};
pub use sockets::{BoundSocket, Socket};
