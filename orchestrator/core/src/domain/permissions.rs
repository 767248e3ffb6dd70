// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Permission Gate
//!
//! Role-membership checks applied before every command. There is no
//! authentication here; the chat gateway vouches for the caller's identity and
//! role names.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Allow/deny decisions from an allow-list of role names

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use crate::domain::server::ServerRecord;

/// Role names granted access when no allow-list is configured.
pub const DEFAULT_ALLOWED_ROLES: [&str; 3] = ["Admin", "Moderator", "ServerManager"];

/// The operator issuing a command, as reported by the chat gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Stable display identity (e.g. `steve#0001`); stored as `created_by`.
    pub id: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Caller {
    pub fn new<I, S>(id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

/// Permission enforcement result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Deny(String),
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

#[derive(Debug, Clone)]
pub struct PermissionGate {
    allowed_roles: BTreeSet<String>,
}

impl PermissionGate {
    pub fn new<I, S>(allowed_roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_roles: allowed_roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allowed_roles(&self) -> &BTreeSet<String> {
        &self.allowed_roles
    }

    /// `true` iff the caller holds at least one allow-listed role.
    pub fn has_required_role(&self, roles: &BTreeSet<String>) -> bool {
        !self.allowed_roles.is_disjoint(roles)
    }

    /// Creators may always manage their own servers; everyone else needs a role.
    pub fn can_manage(&self, caller: &Caller, record: &ServerRecord) -> bool {
        if !record.created_by.is_empty() && record.created_by == caller.id {
            return true;
        }
        self.has_required_role(&caller.roles)
    }

    /// Gate for commands that are not about one particular server.
    pub fn check_role(&self, caller: &Caller) -> PolicyDecision {
        if self.has_required_role(&caller.roles) {
            PolicyDecision::Allow
        } else {
            PolicyDecision::Deny(format!("{} holds none of the allowed roles", caller.id))
        }
    }

    /// Gate for commands that target one server. `record` is `None` when the
    /// server does not exist; only role holders may learn that.
    pub fn check_manage(&self, caller: &Caller, record: Option<&ServerRecord>) -> PolicyDecision {
        match record {
            Some(record) if self.can_manage(caller, record) => PolicyDecision::Allow,
            None if self.has_required_role(&caller.roles) => PolicyDecision::Allow,
            Some(record) => PolicyDecision::Deny(format!(
                "{} may not manage server '{}'",
                caller.id, record.name
            )),
            None => PolicyDecision::Deny(format!("{} holds none of the allowed roles", caller.id)),
        }
    }
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_ROLES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_by(creator: &str) -> ServerRecord {
        ServerRecord::new("survival", "vanilla", None, creator)
    }

    #[test]
    fn test_default_roles() {
        let gate = PermissionGate::default();
        assert!(gate.has_required_role(&Caller::new("a", ["Moderator"]).roles));
        assert!(gate.has_required_role(&Caller::new("a", ["Member", "ServerManager"]).roles));
        assert!(!gate.has_required_role(&Caller::new("a", ["Member"]).roles));
        assert!(!gate.has_required_role(&BTreeSet::new()));
    }

    #[test]
    fn test_role_names_are_case_sensitive() {
        let gate = PermissionGate::default();
        assert!(!gate.has_required_role(&Caller::new("a", ["admin"]).roles));
    }

    #[test]
    fn test_creator_bypasses_roles() {
        let gate = PermissionGate::default();
        let owner = Caller::new("steve#0001", Vec::<String>::new());
        assert!(gate.can_manage(&owner, &record_by("steve#0001")));
        assert!(!gate.can_manage(&owner, &record_by("alex#0002")));
    }

    #[test]
    fn test_check_manage_hides_missing_servers_from_outsiders() {
        let gate = PermissionGate::default();
        let outsider = Caller::new("eve", ["Member"]);
        let admin = Caller::new("root", ["Admin"]);

        assert!(!gate.check_manage(&outsider, None).is_allowed());
        assert!(gate.check_manage(&admin, None).is_allowed());
        assert!(gate.check_manage(&admin, Some(&record_by("steve"))).is_allowed());
    }

    #[test]
    fn test_custom_allow_list() {
        let gate = PermissionGate::new(["Ops"]);
        assert!(gate.check_role(&Caller::new("a", ["Ops"])).is_allowed());
        assert_eq!(
            gate.check_role(&Caller::new("a", ["Admin"])),
            PolicyDecision::Deny("a holds none of the allowed roles".to_string())
        );
    }
}
