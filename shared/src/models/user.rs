//! Users, roles and the access policy

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role carried in the access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "staff" => Some(Role::Staff),
            _ => None,
        }
    }

    /// Admins can do everything staff can
    pub fn satisfies(&self, required: Role) -> bool {
        match required {
            Role::Staff => true,
            Role::Admin => *self == Role::Admin,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resources guarded by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Item,
    Contact,
    Machine,
    Bill,
    Purchase,
    PurchaseOrder,
    Grn,
    StockTransfer,
    Production,
    ProformaInvoice,
    DeliveryChallan,
    Account,
    Expense,
    Report,
    User,
}

/// Actions that can be performed on resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    ChangeStatus,
    Delete,
    Import,
}

/// Rules that differ from the per-action default
pub const POLICY: &[(Resource, Action, Role)] = &[
    (Resource::Item, Action::Import, Role::Admin),
    (Resource::Item, Action::Edit, Role::Admin),
    (Resource::Contact, Action::Delete, Role::Staff),
    (Resource::Machine, Action::Create, Role::Admin),
    (Resource::Machine, Action::Edit, Role::Admin),
    (Resource::Account, Action::Create, Role::Admin),
    (Resource::Account, Action::View, Role::Admin),
    (Resource::Report, Action::View, Role::Admin),
    (Resource::User, Action::View, Role::Admin),
    (Resource::User, Action::Create, Role::Admin),
];

/// Role required when no rule in [`POLICY`] matches
fn default_role(action: Action) -> Role {
    match action {
        Action::View | Action::Create | Action::Edit | Action::ChangeStatus => Role::Staff,
        Action::Delete | Action::Import => Role::Admin,
    }
}

pub fn required_role(resource: Resource, action: Action) -> Role {
    POLICY
        .iter()
        .find(|(r, a, _)| *r == resource && *a == action)
        .map(|(_, _, role)| *role)
        .unwrap_or_else(|| default_role(action))
}

/// Whether `role` may perform `action` on `resource`
pub fn is_allowed(role: Role, resource: Resource, action: Action) -> bool {
    role.satisfies(required_role(resource, action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_satisfies_everything() {
        assert!(Role::Admin.satisfies(Role::Staff));
        assert!(Role::Admin.satisfies(Role::Admin));
        assert!(!Role::Staff.satisfies(Role::Admin));
    }

    #[test]
    fn test_staff_can_bill_but_not_delete_documents() {
        assert!(is_allowed(Role::Staff, Resource::Bill, Action::Create));
        assert!(is_allowed(Role::Staff, Resource::Grn, Action::ChangeStatus));
        assert!(!is_allowed(Role::Staff, Resource::PurchaseOrder, Action::Delete));
    }

    #[test]
    fn test_overrides_apply() {
        assert_eq!(required_role(Resource::User, Action::Create), Role::Admin);
        assert_eq!(required_role(Resource::Contact, Action::Delete), Role::Staff);
        assert!(!is_allowed(Role::Staff, Resource::Item, Action::Import));
    }

    #[test]
    fn test_policy_has_no_duplicate_rules() {
        for (i, (r, a, _)) in POLICY.iter().enumerate() {
            assert!(!POLICY[i + 1..].iter().any(|(r2, a2, _)| r2 == r && a2 == a));
        }
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("owner"), None);
    }
}
