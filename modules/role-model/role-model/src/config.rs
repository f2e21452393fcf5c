//! Configuration surface of the role-model module.

use std::collections::BTreeMap;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// A declarative custom privilege group: display name plus a comma-separated
/// list of action and custom-privilege codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomGroupConfig {
    pub name: String,
    pub privileges: String,
}

impl CustomGroupConfig {
    /// Privilege codes, trimmed, empty segments dropped.
    #[must_use]
    pub fn privilege_codes(&self) -> Vec<String> {
        self.privileges
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

/// Module configuration.
///
/// `custom_groups` is a `BTreeMap` so reconciliation walks groups in a stable
/// order; custom role ranks depend on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleModelConfig {
    /// Master switch for the whole subsystem.
    #[serde(default)]
    pub tenant_with_role_model_enabled: bool,

    /// Required for tenant deletion cascades.
    #[serde(default)]
    pub multi_tenant_enabled: bool,

    /// Tool field an incoming IAM privilege string must carry to be applied.
    #[serde(default = "default_iam_tool_name")]
    pub iam_tool_name: String,

    /// Lets administrators bypass the merge-without-check action.
    #[serde(default)]
    pub admin_can_merge_without_checks: bool,

    #[serde(default)]
    pub custom_groups_enabled: bool,

    #[serde(default)]
    pub custom_groups: BTreeMap<String, CustomGroupConfig>,
}

impl Default for RoleModelConfig {
    fn default() -> Self {
        Self {
            tenant_with_role_model_enabled: false,
            multi_tenant_enabled: false,
            iam_tool_name: default_iam_tool_name(),
            admin_can_merge_without_checks: false,
            custom_groups_enabled: false,
            custom_groups: BTreeMap::new(),
        }
    }
}

fn default_iam_tool_name() -> String {
    "sc".to_owned()
}

impl RoleModelConfig {
    /// Load configuration from a YAML file, letting `ROLE_MODEL_*` environment
    /// variables override individual keys.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, DomainError> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("ROLE_MODEL_").split("__"))
            .extract()
            .map_err(|e| DomainError::invalid_input(format!("config '{path}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_disabled() {
        let cfg = RoleModelConfig::default();
        assert!(!cfg.tenant_with_role_model_enabled);
        assert!(!cfg.custom_groups_enabled);
        assert_eq!(cfg.iam_tool_name, "sc");
    }

    #[test]
    fn privilege_codes_are_trimmed() {
        let group = CustomGroupConfig {
            name: "Deployers".to_owned(),
            privileges: "read, write ,viewBranch,".to_owned(),
        };
        assert_eq!(group.privilege_codes(), vec!["read", "write", "viewBranch"]);
    }

    #[test]
    fn yaml_round_trip() {
        let yaml = r"
tenant_with_role_model_enabled: true
custom_groups_enabled: true
custom_groups:
  deployer:
    name: Deployer
    privileges: read,viewBranch
";
        let cfg: RoleModelConfig = Figment::new()
            .merge(Yaml::string(yaml))
            .extract()
            .unwrap();
        assert!(cfg.tenant_with_role_model_enabled);
        assert_eq!(cfg.custom_groups["deployer"].name, "Deployer");
    }
}
