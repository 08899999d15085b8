//! Status transition tests
//!
//! For every family and every (from, to) pair, a transition succeeds exactly
//! when the table lists it; a refused transition leaves the status as it was.

use proptest::prelude::*;
use shared::{
    allowed_next, apply_transition, can_transition, ChallanStatus, DocumentFamily, GrnStatus,
    ProductionStatus, ProformaStatus, PurchaseOrderStatus, StatusMachine, StockTransferStatus,
};

/// Expected edges, written out by hand
fn expected_edges(family: DocumentFamily) -> Vec<(&'static str, &'static str)> {
    match family {
        DocumentFamily::PurchaseOrder => vec![
            ("Draft", "Sent"),
            ("Draft", "Cancelled"),
            ("Sent", "Partial"),
            ("Sent", "Completed"),
            ("Sent", "Cancelled"),
            ("Partial", "Completed"),
            ("Partial", "Cancelled"),
        ],
        DocumentFamily::Grn => vec![
            ("Draft", "Inspected"),
            ("Draft", "Completed"),
            ("Inspected", "Completed"),
        ],
        DocumentFamily::StockTransfer => vec![
            ("Pending", "In Transit"),
            ("Pending", "Cancelled"),
            ("In Transit", "Completed"),
            ("In Transit", "Cancelled"),
        ],
        DocumentFamily::Production => vec![
            ("Planned", "In Progress"),
            ("Planned", "Cancelled"),
            ("In Progress", "Completed"),
            ("In Progress", "Cancelled"),
        ],
        DocumentFamily::ProformaInvoice => vec![
            ("Draft", "Sent"),
            ("Draft", "Cancelled"),
            ("Sent", "Accepted"),
            ("Sent", "Expired"),
            ("Sent", "Cancelled"),
        ],
        DocumentFamily::DeliveryChallan => vec![
            ("Draft", "Dispatched"),
            ("Draft", "Cancelled"),
            ("Dispatched", "Delivered"),
            ("Dispatched", "Cancelled"),
        ],
        _ => Vec::new(),
    }
}

fn statuses_of(family: DocumentFamily) -> Vec<&'static str> {
    fn names<S: StatusMachine>() -> Vec<&'static str> {
        S::ALL.iter().map(|s| s.as_str()).collect()
    }
    match family {
        DocumentFamily::PurchaseOrder => names::<PurchaseOrderStatus>(),
        DocumentFamily::Grn => names::<GrnStatus>(),
        DocumentFamily::StockTransfer => names::<StockTransferStatus>(),
        DocumentFamily::Production => names::<ProductionStatus>(),
        DocumentFamily::ProformaInvoice => names::<ProformaStatus>(),
        DocumentFamily::DeliveryChallan => names::<ChallanStatus>(),
        _ => Vec::new(),
    }
}

const STATUS_FAMILIES: [DocumentFamily; 6] = [
    DocumentFamily::PurchaseOrder,
    DocumentFamily::Grn,
    DocumentFamily::StockTransfer,
    DocumentFamily::Production,
    DocumentFamily::ProformaInvoice,
    DocumentFamily::DeliveryChallan,
];

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_table_matches_for_every_pair() {
        for family in STATUS_FAMILIES {
            let edges = expected_edges(family);
            let statuses = statuses_of(family);
            for from in &statuses {
                for to in &statuses {
                    let expected = edges.contains(&(*from, *to));
                    assert_eq!(
                        can_transition(family, from, to).unwrap(),
                        expected,
                        "{family}: {from} -> {to}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_allowed_next_lists_outgoing_edges() {
        for family in STATUS_FAMILIES {
            for from in statuses_of(family) {
                let mut expected: Vec<&str> = expected_edges(family)
                    .into_iter()
                    .filter(|(f, _)| *f == from)
                    .map(|(_, t)| t)
                    .collect();
                let mut actual = allowed_next(family, from).unwrap();
                expected.sort();
                actual.sort();
                assert_eq!(actual, expected, "{family}: next of {from}");
            }
        }
    }

    #[test]
    fn test_refused_transition_leaves_status() {
        let mut status = PurchaseOrderStatus::Draft;
        let err = apply_transition(&mut status, PurchaseOrderStatus::Completed).unwrap_err();
        assert_eq!(status, PurchaseOrderStatus::Draft);
        assert_eq!(err.from, "Draft");
        assert_eq!(err.to, "Completed");
    }

    #[test]
    fn test_no_moving_backward() {
        let mut status = ChallanStatus::Delivered;
        assert!(apply_transition(&mut status, ChallanStatus::Dispatched).is_err());
        assert!(apply_transition(&mut status, ChallanStatus::Draft).is_err());
        assert_eq!(status, ChallanStatus::Delivered);
    }

    #[test]
    fn test_accepted_transition_returns_previous() {
        let mut status = ProductionStatus::Planned;
        let previous = apply_transition(&mut status, ProductionStatus::InProgress).unwrap();
        assert_eq!(previous, ProductionStatus::Planned);
        assert_eq!(status, ProductionStatus::InProgress);
    }

    #[test]
    fn test_unknown_status_is_an_error() {
        assert!(can_transition(DocumentFamily::Grn, "Draft", "Shipped").is_err());
        assert!(allowed_next(DocumentFamily::StockTransfer, "in transit").is_err());
    }

    #[test]
    fn test_families_without_status_never_move() {
        assert_eq!(can_transition(DocumentFamily::Bill, "x", "y").unwrap(), false);
        assert!(allowed_next(DocumentFamily::Machine, "x").unwrap().is_empty());
    }

    #[test]
    fn test_initial_states() {
        assert_eq!(PurchaseOrderStatus::initial().as_str(), "Draft");
        assert_eq!(GrnStatus::initial().as_str(), "Draft");
        assert_eq!(StockTransferStatus::initial().as_str(), "Pending");
        assert_eq!(ProductionStatus::initial().as_str(), "Planned");
        assert_eq!(ProformaStatus::initial().as_str(), "Draft");
        assert_eq!(ChallanStatus::initial().as_str(), "Draft");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

fn po_status_strategy() -> impl Strategy<Value = PurchaseOrderStatus> {
    prop::sample::select(PurchaseOrderStatus::ALL.to_vec())
}

proptest! {
    /// Any walk through the table only ever follows listed edges and ends
    /// in a terminal state once no edge is left
    #[test]
    fn prop_random_walk_follows_table(
        targets in prop::collection::vec(po_status_strategy(), 1..30),
    ) {
        let edges = expected_edges(DocumentFamily::PurchaseOrder);
        let mut status = PurchaseOrderStatus::initial();

        for to in targets {
            let before = status;
            match apply_transition(&mut status, to) {
                Ok(previous) => {
                    prop_assert_eq!(previous, before);
                    prop_assert!(edges.contains(&(before.as_str(), to.as_str())));
                    prop_assert_eq!(status, to);
                }
                Err(_) => {
                    prop_assert!(!edges.contains(&(before.as_str(), to.as_str())));
                    prop_assert_eq!(status, before);
                }
            }
        }
    }
}
