//! Per-module lifecycle.

use std::fmt;

/// Where a module is in its lifecycle.
///
/// States only move forward, in declaration order. `Error` is reachable from
/// any state short of `Executed` and is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ModuleState {
    /// Known by id only.
    #[default]
    Init,
    /// Its script has been requested.
    Fetching,
    /// Registered by a fetched script; dependencies not looked at yet.
    Fetched,
    /// Dependencies resolved to ids and requested.
    Resolving,
    /// Every module reachable from it is registered.
    Resolved,
    /// Factory running. Dependents in a cycle see partial exports.
    Executing,
    Executed,
    Error,
}

impl ModuleState {
    pub fn can_advance_to(self, next: ModuleState) -> bool {
        match next {
            ModuleState::Error => !matches!(self, ModuleState::Executed | ModuleState::Error),
            _ => self != ModuleState::Error && next > self,
        }
    }

    /// Dependencies have been wired up, so the module can take part in a
    /// readiness check.
    pub fn is_linked(self) -> bool {
        matches!(
            self,
            ModuleState::Resolving
                | ModuleState::Resolved
                | ModuleState::Executing
                | ModuleState::Executed
        )
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModuleState::Init => "INIT",
            ModuleState::Fetching => "FETCHING",
            ModuleState::Fetched => "FETCHED",
            ModuleState::Resolving => "RESOLVING",
            ModuleState::Resolved => "RESOLVED",
            ModuleState::Executing => "EXECUTING",
            ModuleState::Executed => "EXECUTED",
            ModuleState::Error => "ERROR",
        };
        f.write_str(name)
    }
}
