//! In-memory role vocabulary.
//!
//! Built-in roles occupy ranks 0 through 4; custom groups get ranks from 5
//! upward, allocated in the order they are registered during bootstrap.
//! Readers run concurrently; mutation only happens at bootstrap and config
//! reload, guarded by the write lock.

use std::collections::HashMap;

use parking_lot::RwLock;
use role_model_sdk::{Action, CustomPrivilege, Role};

use crate::domain::error::DomainError;

/// Source marker for the cross-tenant read pool.
pub const INNER_SOURCE: &str = "InnerSource";

const FIRST_CUSTOM_RANK: i64 = 5;

struct RegistryState {
    ranks: HashMap<String, i64>,
    names: HashMap<String, String>,
    next_rank: i64,
}

pub struct RoleRegistry {
    inner: RwLock<RegistryState>,
}

impl RoleRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut ranks = HashMap::new();
        let mut names = HashMap::new();
        for (role, name) in [
            (Role::TechnicalUser, "Technical user"),
            (Role::Owner, "Owner"),
            (Role::Manager, "Manager"),
            (Role::Writer, "Writer"),
            (Role::Reader, "Reader"),
        ] {
            let rank = i64::from(role.builtin_rank().unwrap_or(0));
            ranks.insert(role.code().to_owned(), rank);
            names.insert(role.code().to_owned(), name.to_owned());
        }
        Self {
            inner: RwLock::new(RegistryState {
                ranks,
                names,
                next_rank: FIRST_CUSTOM_RANK,
            }),
        }
    }

    /// Codes that may never be used for a custom group: built-in role codes
    /// and the five custom-privilege codes.
    #[must_use]
    pub fn is_reserved_code(code: &str) -> bool {
        Role::from_builtin_code(code).is_some() || CustomPrivilege::from_code(code).is_some()
    }

    /// True when the code names an action or a custom privilege, the two
    /// things a custom group may bundle.
    #[must_use]
    pub fn is_known_privilege_code(code: &str) -> bool {
        Action::from_code(code).is_some() || CustomPrivilege::from_code(code).is_some()
    }

    /// Register a custom role, allocating the next free rank. Re-registering
    /// an existing code keeps its rank and refreshes the display name.
    pub fn register_custom(&self, code: &str, name: &str) -> i64 {
        let mut state = self.inner.write();
        state.names.insert(code.to_owned(), name.to_owned());
        if let Some(rank) = state.ranks.get(code) {
            return *rank;
        }
        let rank = state.next_rank;
        state.next_rank += 1;
        state.ranks.insert(code.to_owned(), rank);
        rank
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.inner.read().ranks.contains_key(code)
    }

    #[must_use]
    pub fn rank_of(&self, code: &str) -> Option<i64> {
        self.inner.read().ranks.get(code).copied()
    }

    #[must_use]
    pub fn display_name(&self, code: &str) -> Option<String> {
        self.inner.read().names.get(code).cloned()
    }

    /// Resolve a role code against the vocabulary.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NonExistentRole`] for codes neither built in
    /// nor registered as custom groups.
    pub fn resolve(&self, code: &str) -> Result<Role, DomainError> {
        if let Some(role) = Role::from_builtin_code(code) {
            return Ok(role);
        }
        if self.contains(code) {
            return Ok(Role::Custom(code.to_owned()));
        }
        Err(DomainError::non_existent_role(code))
    }

    /// Registered custom codes, ordered by rank.
    #[must_use]
    pub fn custom_codes(&self) -> Vec<String> {
        let state = self.inner.read();
        let mut customs: Vec<(i64, String)> = state
            .ranks
            .iter()
            .filter(|(_, rank)| **rank >= FIRST_CUSTOM_RANK)
            .map(|(code, rank)| (*rank, code.clone()))
            .collect();
        customs.sort_unstable();
        customs.into_iter().map(|(_, code)| code).collect()
    }
}

impl Default for RoleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_codes_are_reserved() {
        for code in ["tuz", "owner", "manager", "writer", "reader", "mergePR"] {
            assert!(RoleRegistry::is_reserved_code(code), "{code}");
        }
        assert!(!RoleRegistry::is_reserved_code("deployer"));
    }

    #[test]
    fn custom_ranks_start_at_five_in_registration_order() {
        let registry = RoleRegistry::new();
        assert_eq!(registry.register_custom("deployer", "Deployer"), 5);
        assert_eq!(registry.register_custom("auditor", "Auditor"), 6);
        // Re-registration keeps the rank.
        assert_eq!(registry.register_custom("deployer", "Deployer v2"), 5);
        assert_eq!(registry.display_name("deployer").as_deref(), Some("Deployer v2"));
        assert_eq!(registry.custom_codes(), vec!["deployer", "auditor"]);
    }

    #[test]
    fn resolve_rejects_unknown_codes() {
        let registry = RoleRegistry::new();
        assert_eq!(registry.resolve("owner").unwrap(), Role::Owner);
        assert!(matches!(
            registry.resolve("ghost"),
            Err(DomainError::NonExistentRole { .. })
        ));
        registry.register_custom("ghost", "Ghost");
        assert_eq!(
            registry.resolve("ghost").unwrap(),
            Role::Custom("ghost".to_owned())
        );
    }

    #[test]
    fn privilege_codes_cover_actions_and_custom_privileges() {
        assert!(RoleRegistry::is_known_privilege_code("read"));
        assert!(RoleRegistry::is_known_privilege_code("viewBranch"));
        assert!(!RoleRegistry::is_known_privilege_code("fly"));
    }
}
