//! Customers and suppliers

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Customer,
    Supplier,
    Both,
}

impl ContactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactKind::Customer => "customer",
            ContactKind::Supplier => "supplier",
            ContactKind::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(ContactKind::Customer),
            "supplier" => Some(ContactKind::Supplier),
            "both" => Some(ContactKind::Both),
            _ => None,
        }
    }

    pub fn is_supplier(&self) -> bool {
        matches!(self, ContactKind::Supplier | ContactKind::Both)
    }

    pub fn is_customer(&self) -> bool {
        matches!(self, ContactKind::Customer | ContactKind::Both)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_plays_either_side() {
        assert!(ContactKind::Both.is_supplier());
        assert!(ContactKind::Both.is_customer());
        assert!(!ContactKind::Customer.is_supplier());
    }
}
