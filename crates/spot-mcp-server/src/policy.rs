//! Access policy: which commands are advertised and executable.
//!
//! The policy is resolved once at startup and never changes afterwards.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CommandError;
use crate::registry::{CommandDefinition, CommandInfo, CommandRegistry};

/// Whether a command only reads state or changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    Mutate,
}

/// Process-wide access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
    /// Every command is advertised and executable.
    #[default]
    Permissive,
    /// Only `read` commands are advertised; `mutate` commands are refused.
    Restricted,
}

impl AccessPolicy {
    /// Resolve from the read-only flag: `"true"` or `"1"` means restricted,
    /// anything else (or nothing) means permissive.
    pub fn from_read_only_flag(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Self::Restricted,
            _ => Self::Permissive,
        }
    }

    pub fn allows(self, capability: Capability) -> bool {
        match self {
            Self::Permissive => true,
            Self::Restricted => capability == Capability::Read,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::Restricted => "restricted",
        }
    }
}

/// The registry seen through the active policy.
#[derive(Clone)]
pub struct AccessGate {
    registry: Arc<CommandRegistry>,
    policy: AccessPolicy,
}

impl AccessGate {
    pub fn new(registry: Arc<CommandRegistry>, policy: AccessPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Externally visible commands allowed by the policy, in catalog order.
    pub fn list_commands(&self) -> Vec<CommandInfo> {
        self.registry
            .iter()
            .filter(|command| self.policy.allows(command.capability()))
            .map(|command| command.info())
            .collect()
    }

    /// Resolve `name` to a command the policy allows.
    pub fn authorize(&self, name: &str) -> Result<Arc<CommandDefinition>, CommandError> {
        let command = self
            .registry
            .get(name)
            .ok_or_else(|| CommandError::NotFound {
                name: name.to_string(),
            })?;

        if !self.policy.allows(command.capability()) {
            return Err(CommandError::Policy {
                name: name.to_string(),
            });
        }

        Ok(command)
    }
}
