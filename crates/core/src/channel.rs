//! Release channels
//!
//! sdkmanager filters packages with `--channel=<id>`, where the id is an
//! inclusive upper bound: channel 1 means "stable or beta".

use std::fmt;

/// Release-stability tier of SDK packages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Channel {
    #[default]
    Stable,
    Beta,
    Dev,
    Canary,
}

/// All channels in ordinal order
pub const CHANNELS: [Channel; 4] = [Channel::Stable, Channel::Beta, Channel::Dev, Channel::Canary];

impl Channel {
    /// Ordinal id passed to sdkmanager
    pub fn id(self) -> u32 {
        match self {
            Channel::Stable => 0,
            Channel::Beta => 1,
            Channel::Dev => 2,
            Channel::Canary => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Stable => "stable",
            Channel::Beta => "beta",
            Channel::Dev => "dev",
            Channel::Canary => "canary",
        }
    }

    /// Look up a channel by its exact name
    pub fn from_name(name: &str) -> Option<Self> {
        CHANNELS.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map an already-validated channel name to its id.
///
/// Callers must pass a name accepted by [`crate::validator::check_channel`].
/// Debug builds assert this; release builds map anything unrecognised to
/// the stable channel.
pub fn channel_id(name: &str) -> u32 {
    let channel = Channel::from_name(name);
    debug_assert!(channel.is_some(), "unvalidated channel name: {name:?}");
    channel.unwrap_or_default().id()
}
