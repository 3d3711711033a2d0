use crate::{Config, Error, Interface, InterfaceSource};
use std::net::Ipv4Addr;
use std::time::Duration;

/// A per-call adjustment of an operation's settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Override {
    /// Use the interface with this name. Fails if the host has no such interface.
    InterfaceNamed(String),
    /// Use this interface instead of searching for one.
    Interface(Interface),
    /// Speak from this address instead of deriving it from the interface.
    SourceAddr(Ipv4Addr),
    /// Wait this long for a reply. Has no effect on gratuitous ARP.
    Timeout(Duration),
}

/// Effective settings of a single operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub interface: Option<Interface>,
    pub source: Option<Ipv4Addr>,
    pub timeout: Duration,
}

impl Options {
    pub fn new(config: &Config) -> Self {
        Options {
            interface: None,
            source: None,
            timeout: config.timeout,
        }
    }

    /// Folds `overrides` over the defaults from `config`, in order. A later override of the
    /// same field wins; the first failing override aborts the whole resolution.
    pub fn resolve<S, I>(config: &Config, overrides: I, interfaces: &S) -> Result<Self, Error>
    where
        S: InterfaceSource + ?Sized,
        I: IntoIterator<Item = Override>,
    {
        overrides
            .into_iter()
            .try_fold(Options::new(config), |options, o| options.apply(o, interfaces))
    }

    pub fn apply<S>(mut self, o: Override, interfaces: &S) -> Result<Self, Error>
    where
        S: InterfaceSource + ?Sized,
    {
        match o {
            Override::InterfaceNamed(name) => {
                self.interface = Some(interfaces.interface_by_name(&name)?);
            }
            Override::Interface(iface) => self.interface = Some(iface),
            Override::SourceAddr(addr) => self.source = Some(addr),
            Override::Timeout(timeout) => self.timeout = timeout,
        }
        Ok(self)
    }
}
