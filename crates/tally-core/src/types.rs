//! # Domain Types
//!
//! Request-scoped types shared by every reporting component.
//!
//! ## Request Context
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       RequestContext                                    │
//! │                                                                         │
//! │  Bearer token ──► Identity { user_id, company_id?, role }               │
//! │                        │                                                │
//! │                        ▼  tenant resolution                             │
//! │  RequestContext { company_id, role, range, staff_filter }               │
//! │                        │                                                │
//! │                        ▼  passed BY VALUE into every component          │
//! │  Bucketizer • Cost Resolver • Reconciler • Metrics                      │
//! │                                                                         │
//! │  Nothing reads identity or filters from anywhere else.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::CoreError;
use crate::period::DateRange;

// =============================================================================
// Role
// =============================================================================

/// Role of the authenticated user.
///
/// Only `SystemAdmin` changes reporting behaviour: it bypasses the module
/// gate and may report on any company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    SystemAdmin,
    Manager,
    Cashier,
    Technician,
    Staff,
}

impl Role {
    pub const fn is_system_admin(&self) -> bool {
        matches!(self, Role::SystemAdmin)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::SystemAdmin => "system_admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
            Role::Technician => "technician",
            Role::Staff => "staff",
        }
    }
}

/// Unknown role names parse as `Staff` rather than failing.
impl FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "system_admin" => Role::SystemAdmin,
            "manager" | "admin" => Role::Manager,
            "cashier" | "salesperson" => Role::Cashier,
            "technician" => Role::Technician,
            _ => Role::Staff,
        })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Module Keys
// =============================================================================

/// Per-company feature flags consulted before a data domain is queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ModuleKey {
    Pos,
    Repairs,
    Swaps,
    Inventory,
}

impl ModuleKey {
    pub const ALL: [ModuleKey; 4] = [
        ModuleKey::Pos,
        ModuleKey::Repairs,
        ModuleKey::Swaps,
        ModuleKey::Inventory,
    ];

    /// Value stored in `company_modules.module_key`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ModuleKey::Pos => "pos",
            ModuleKey::Repairs => "repairs",
            ModuleKey::Swaps => "swaps",
            ModuleKey::Inventory => "inventory",
        }
    }
}

/// Resolved module flags for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ModuleSet {
    pub pos: bool,
    pub repairs: bool,
    pub swaps: bool,
    pub inventory: bool,
}

impl ModuleSet {
    /// Every module enabled (system admin, or no gate table present).
    pub const fn all() -> Self {
        ModuleSet {
            pos: true,
            repairs: true,
            swaps: true,
            inventory: true,
        }
    }

    pub fn is_enabled(&self, key: ModuleKey) -> bool {
        match key {
            ModuleKey::Pos => self.pos,
            ModuleKey::Repairs => self.repairs,
            ModuleKey::Swaps => self.swaps,
            ModuleKey::Inventory => self.inventory,
        }
    }

    pub fn set(&mut self, key: ModuleKey, enabled: bool) {
        match key {
            ModuleKey::Pos => self.pos = enabled,
            ModuleKey::Repairs => self.repairs = enabled,
            ModuleKey::Swaps => self.swaps = enabled,
            ModuleKey::Inventory => self.inventory = enabled,
        }
    }
}

impl Default for ModuleSet {
    fn default() -> Self {
        ModuleSet::all()
    }
}

// =============================================================================
// Report Policy
// =============================================================================

/// Tunable reporting ratios.
///
/// ## Defaults
/// ```text
/// estimated_cost_bps   7000  cost assumed when nothing resolves (70% of revenue)
/// default_labour_bps   5000  labour assumed when a repair has none (50%)
/// default_range_days     90  window used when no dates are supplied
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPolicy {
    pub estimated_cost_bps: u32,
    pub default_labour_bps: u32,
    pub default_range_days: u64,
}

impl Default for ReportPolicy {
    fn default() -> Self {
        ReportPolicy {
            estimated_cost_bps: crate::DEFAULT_ESTIMATED_COST_BPS,
            default_labour_bps: crate::DEFAULT_LABOUR_BPS,
            default_range_days: crate::DEFAULT_RANGE_DAYS,
        }
    }
}

// =============================================================================
// Identity & Request Context
// =============================================================================

/// Who is asking, as established by authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub company_id: Option<String>,
    pub role: Role,
}

impl Identity {
    /// Picks the tenant this request reports on.
    ///
    /// ## Rules
    /// ```text
    /// regular user  → own company_id (requested company ignored)
    /// system_admin  → requested company_id, else own company_id
    /// neither       → CoreError::MissingTenantContext
    /// ```
    pub fn resolve_company(&self, requested: Option<&str>) -> Result<String, CoreError> {
        let requested = requested.map(str::trim).filter(|c| !c.is_empty());

        let company = if self.role.is_system_admin() {
            requested.map(str::to_string).or_else(|| self.company_id.clone())
        } else {
            self.company_id.clone()
        };

        company
            .filter(|c| !c.trim().is_empty())
            .ok_or(CoreError::MissingTenantContext)
    }
}

/// Everything a report needs to know about the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub company_id: String,
    pub role: Role,
    pub range: DateRange,
    pub staff_filter: Option<String>,
}

impl RequestContext {
    /// Same request narrowed to one staff member.
    pub fn for_staff(&self, staff_id: &str) -> Self {
        RequestContext {
            staff_filter: Some(staff_id.to_string()),
            ..self.clone()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(company: Option<&str>, role: Role) -> Identity {
        Identity {
            user_id: "u-1".to_string(),
            company_id: company.map(str::to_string),
            role,
        }
    }

    #[test]
    fn test_role_parse_is_lenient() {
        assert_eq!("system_admin".parse::<Role>().unwrap(), Role::SystemAdmin);
        assert_eq!(" Manager ".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!("intern".parse::<Role>().unwrap(), Role::Staff);
    }

    #[test]
    fn test_regular_user_cannot_pick_company() {
        let user = identity(Some("c-1"), Role::Manager);
        assert_eq!(user.resolve_company(Some("c-2")).unwrap(), "c-1");
    }

    #[test]
    fn test_user_without_company_is_rejected() {
        let user = identity(None, Role::Cashier);
        assert!(matches!(
            user.resolve_company(None),
            Err(CoreError::MissingTenantContext)
        ));
    }

    #[test]
    fn test_system_admin_names_company() {
        let admin = identity(None, Role::SystemAdmin);
        assert_eq!(admin.resolve_company(Some("c-9")).unwrap(), "c-9");
        assert!(admin.resolve_company(Some("  ")).is_err());
    }

    #[test]
    fn test_module_set_toggle() {
        let mut modules = ModuleSet::all();
        modules.set(ModuleKey::Swaps, false);
        assert!(!modules.is_enabled(ModuleKey::Swaps));
        assert!(modules.is_enabled(ModuleKey::Repairs));
    }

    #[test]
    fn test_policy_defaults() {
        let policy = ReportPolicy::default();
        assert_eq!(policy.estimated_cost_bps, 7_000);
        assert_eq!(policy.default_labour_bps, 5_000);
        assert_eq!(policy.default_range_days, 90);
    }
}
