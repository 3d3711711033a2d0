use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Settings every operation starts from. Per-call `Override`s are applied on top.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// How long a ping waits for the reply. Gratuitous ARP has no wait phase and ignores it.
    pub timeout: Duration,
    /// Emit progress events through `tracing`.
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            timeout: DEFAULT_TIMEOUT,
            verbose: false,
        }
    }
}
