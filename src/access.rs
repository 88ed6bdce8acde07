//! Authorization gate.
//!
//! The gate decides once per session whether the verified identity may use the
//! tools. The decision selects which tool groups get registered; an
//! unauthorized caller simply sees fewer tools.

use std::collections::HashSet;
use tracing::{info, warn};

/// Usernames allowed past the gate. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    names: HashSet<String>,
}

impl AllowList {
    /// Parse a comma-separated list. Entries are trimmed and empty entries
    /// dropped, so `""` and `" , "` both yield an empty list.
    pub fn parse(raw: &str) -> Self {
        let names = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        Self { names }
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.names.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Gate decision for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    Unauthorized,
    Authorized,
}

/// A set of tools registered or withheld together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolGroup {
    /// The GitHub identity tool.
    Identity,
    /// The query, table and plugin tools.
    Database,
}

impl Access {
    pub fn is_authorized(self) -> bool {
        self == Access::Authorized
    }

    /// Tool groups a session with this decision gets.
    pub fn permitted_groups(self) -> &'static [ToolGroup] {
        match self {
            Access::Authorized => &[ToolGroup::Identity, ToolGroup::Database],
            Access::Unauthorized => &[],
        }
    }
}

/// Decides access from a verified identity.
#[derive(Debug, Clone)]
pub struct AccessGate {
    allow_list: AllowList,
}

impl AccessGate {
    pub fn new(allow_list: AllowList) -> Self {
        if allow_list.is_empty() {
            warn!("Allow-list is empty; every session will be unauthorized");
        }
        Self { allow_list }
    }

    pub fn decide(&self, identity: &str) -> Access {
        let access = if self.allow_list.contains(identity) {
            Access::Authorized
        } else {
            Access::Unauthorized
        };
        info!(identity, ?access, "Access decided");
        access
    }
}
