//! Authorization - permission catalog, role map, and route access decisions
//!
//! This module covers:
//! - The closed role and permission enumerations
//! - The static role -> permission mapping (super admin gets the whole catalog)
//! - The route accessibility evaluator and action-level helpers

mod catalog;
mod evaluator;
mod principal;
mod role_map;

pub use catalog::{full_catalog, ParsePermissionError, ParseRoleError, Permission, PermissionSet, Role};
pub use evaluator::{can_access, can_perform_action, has_any_role, has_permissions, AccessEvaluator, DefaultAccessEvaluator};
pub use principal::{Principal, PrincipalSummary};
pub use role_map::{permissions_for, permissions_for_name};
