use crate::{Error, Interface, InterfaceSource, Options};
use std::net::Ipv4Addr;

/// The interface an operation runs on and the local address it speaks from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceBinding {
    pub interface: Interface,
    pub source: Ipv4Addr,
}

/// Returns the local address on `iface` whose network contains `dst`.
pub fn find_local_address_on_interface(dst: Ipv4Addr, iface: &Interface) -> Result<Ipv4Addr, Error> {
    iface.address_for(dst).ok_or_else(|| Error::Unreachable {
        interface: iface.name.clone(),
        destination: dst,
    })
}

/// Picks the first interface that is up and has a network containing `dst`.
///
/// When several interfaces qualify the platform's enumeration order decides.
pub fn find_usable_interface_for_destination<S>(
    source: &S,
    dst: Ipv4Addr,
    verbose: bool,
) -> Result<InterfaceBinding, Error>
where
    S: InterfaceSource + ?Sized,
{
    verbose!(verbose, "search usable interface");
    for iface in source.interfaces()? {
        if !iface.up {
            verbose!(verbose, iface = %iface.name, mac = %iface.mac, "DOWN");
            continue;
        }

        match iface.address_for(dst) {
            None => {
                verbose!(verbose, iface = %iface.name, mac = %iface.mac, "OTHER NET");
            }
            Some(local) => {
                verbose!(verbose, iface = %iface.name, mac = %iface.mac, "USABLE");
                return Ok(InterfaceBinding {
                    interface: iface,
                    source: local,
                });
            }
        }
    }
    Err(Error::NoUsableInterface)
}

/// Resolves the binding for an operation addressed to `dst`.
///
/// An explicit interface skips the scan; an explicit source address skips local-address
/// derivation.
pub(crate) fn resolve_binding<S>(
    source: &S,
    dst: Ipv4Addr,
    options: &Options,
    verbose: bool,
) -> Result<InterfaceBinding, Error>
where
    S: InterfaceSource + ?Sized,
{
    match (&options.interface, options.source) {
        (Some(iface), Some(addr)) => Ok(InterfaceBinding {
            interface: iface.clone(),
            source: addr,
        }),
        (Some(iface), None) => Ok(InterfaceBinding {
            interface: iface.clone(),
            source: find_local_address_on_interface(dst, iface)?,
        }),
        (None, explicit) => {
            let mut binding = find_usable_interface_for_destination(source, dst, verbose)?;
            if let Some(addr) = explicit {
                binding.source = addr;
            }
            Ok(binding)
        }
    }
}
