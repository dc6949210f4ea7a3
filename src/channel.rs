//! Channel addressing and the channel alias registry types

use crate::error::{Result, RubbleError};
use crate::process::Pid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a message goes: a registered alias or a numeric process ID
///
/// Holding exactly one of the two is enforced by the type. Whether an alias
/// maps to a live process is only known to the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelAddress {
    /// A registered channel alias, sent verbatim
    Alias(String),
    /// A process ID, sent as `pid(N)`
    Pid(Pid),
}

impl ChannelAddress {
    /// Resolve a caller-supplied target
    ///
    /// An empty alias counts as absent. Fails with
    /// [`RubbleError::AmbiguousTarget`] when both are given and
    /// [`RubbleError::MissingTarget`] when neither is.
    pub fn resolve(alias: Option<&str>, pid: Option<Pid>) -> Result<Self> {
        let alias = alias.filter(|a| !a.is_empty());
        match (alias, pid) {
            (Some(_), Some(_)) => Err(RubbleError::AmbiguousTarget),
            (None, None) => Err(RubbleError::MissingTarget),
            (Some(alias), None) => Ok(ChannelAddress::Alias(alias.to_string())),
            (None, Some(pid)) => Ok(ChannelAddress::Pid(pid)),
        }
    }

    /// Address a process by alias
    ///
    /// Not checked here; [`call`](crate::RubbleClient::call) and
    /// [`send`](crate::RubbleClient::send) reject an empty alias before
    /// anything is sent. An alias spelled `pid(N)` goes out verbatim and the
    /// server reads it as that pid.
    pub fn alias(name: impl Into<String>) -> Self {
        ChannelAddress::Alias(name.into())
    }

    /// Address a process by ID
    pub fn pid(pid: impl Into<Pid>) -> Self {
        ChannelAddress::Pid(pid.into())
    }

    /// Fails with [`RubbleError::MissingTarget`] for an empty alias
    pub fn validate(&self) -> Result<()> {
        match self {
            ChannelAddress::Alias(name) if name.is_empty() => Err(RubbleError::MissingTarget),
            _ => Ok(()),
        }
    }

    /// The value of the `channel` query parameter
    pub fn to_wire_form(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelAddress::Alias(name) => f.write_str(name),
            ChannelAddress::Pid(pid) => write!(f, "pid({})", pid),
        }
    }
}

/// Parses the wire form back: `pid(N)` is a pid, anything else an alias
///
/// The wire form cannot tell an alias literally named `pid(5)` from process
/// 5, so such a name parses as the pid.
impl FromStr for ChannelAddress {
    type Err = RubbleError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(RubbleError::MissingTarget);
        }
        let pid = s
            .strip_prefix("pid(")
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(|digits| digits.parse::<u64>().ok());
        Ok(match pid {
            Some(pid) => ChannelAddress::Pid(Pid(pid)),
            None => ChannelAddress::Alias(s.to_string()),
        })
    }
}

impl From<Pid> for ChannelAddress {
    fn from(pid: Pid) -> Self {
        ChannelAddress::Pid(pid)
    }
}

/// An entry of the channel alias registry
///
/// A `pid` of `0` in an update request deletes the alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAlias {
    /// Alias name
    #[serde(alias = "channel")]
    pub name: String,
    /// Process the alias points at
    pub pid: Pid,
}

/// Options for listing channel aliases
#[derive(Debug, Clone, Default)]
pub struct AliasListOptions {
    /// Include globally scoped aliases common to all domains
    pub include_global: bool,
    /// `Some("*")` lists only globally scoped aliases
    pub domain: Option<String>,
    /// Skip this many entries (pagination)
    pub skip_items: Option<u32>,
    /// Return at most this many entries (pagination)
    pub max_items: Option<u32>,
}

impl AliasListOptions {
    /// Only the aliases common to all domains
    pub fn global_only() -> Self {
        Self {
            include_global: true,
            domain: Some("*".to_string()),
            ..Default::default()
        }
    }

    pub(crate) fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if self.include_global {
            params.push(("includeGlobal", "1".to_string()));
        }
        if let Some(ref domain) = self.domain {
            params.push(("domain", domain.clone()));
        }
        if let Some(skip) = self.skip_items {
            params.push(("skipItems", skip.to_string()));
        }
        if let Some(max) = self.max_items {
            params.push(("maxItems", max.to_string()));
        }
        params
    }
}
