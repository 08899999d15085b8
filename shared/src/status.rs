//! Status transition tables for the stateful document families
//!
//! Every family owns a small finite state machine. A status change is only
//! legal along an edge listed in the family's table; terminal states have no
//! outgoing edges and nothing ever moves backward.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::numbering::DocumentFamily;

/// A document status governed by a fixed transition table
pub trait StatusMachine: Copy + Eq + fmt::Debug + fmt::Display + 'static {
    const FAMILY: DocumentFamily;

    /// Every status of the family, initial state first
    const ALL: &'static [Self];

    fn initial() -> Self;

    /// Statuses reachable in one step
    fn next_states(self) -> &'static [Self];

    fn as_str(self) -> &'static str;

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|status| status.as_str() == s)
    }

    fn can_transition_to(self, to: Self) -> bool {
        self.next_states().contains(&to)
    }

    fn is_initial(self) -> bool {
        self == Self::initial()
    }

    fn is_terminal(self) -> bool {
        self.next_states().is_empty()
    }
}

/// Raised when a status change is not an edge of the family's table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{family} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub family: DocumentFamily,
    pub from: String,
    pub to: String,
}

/// Raised when a status string is not part of the family's table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {family} status: {value}")]
pub struct UnknownStatus {
    pub family: DocumentFamily,
    pub value: String,
}

/// Move `status` to `to` if the table allows it, returning the previous status.
/// On failure `status` is left untouched.
pub fn apply_transition<S: StatusMachine>(status: &mut S, to: S) -> Result<S, TransitionError> {
    let from = *status;
    if !from.can_transition_to(to) {
        return Err(TransitionError {
            family: S::FAMILY,
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        });
    }
    *status = to;
    Ok(from)
}

/// Parse a status string for the given machine
pub fn parse_status<S: StatusMachine>(value: &str) -> Result<S, UnknownStatus> {
    S::parse(value).ok_or_else(|| UnknownStatus {
        family: S::FAMILY,
        value: value.to_string(),
    })
}

fn check<S: StatusMachine>(from: &str, to: &str) -> Result<bool, UnknownStatus> {
    let from = parse_status::<S>(from)?;
    let to = parse_status::<S>(to)?;
    Ok(from.can_transition_to(to))
}

fn next_of<S: StatusMachine>(from: &str) -> Result<Vec<&'static str>, UnknownStatus> {
    let from = parse_status::<S>(from)?;
    Ok(from.next_states().iter().map(|s| s.as_str()).collect())
}

/// Whether `family` may move from `from` to `to`, by status name.
///
/// Families without a status machine (bills, purchases, expenses, machines)
/// never transition.
pub fn can_transition(family: DocumentFamily, from: &str, to: &str) -> Result<bool, UnknownStatus> {
    match family {
        DocumentFamily::PurchaseOrder => check::<PurchaseOrderStatus>(from, to),
        DocumentFamily::Grn => check::<GrnStatus>(from, to),
        DocumentFamily::StockTransfer => check::<StockTransferStatus>(from, to),
        DocumentFamily::Production => check::<ProductionStatus>(from, to),
        DocumentFamily::ProformaInvoice => check::<ProformaStatus>(from, to),
        DocumentFamily::DeliveryChallan => check::<ChallanStatus>(from, to),
        DocumentFamily::Bill
        | DocumentFamily::Purchase
        | DocumentFamily::Expense
        | DocumentFamily::Machine => Ok(false),
    }
}

/// Status names reachable in one step from `from`
pub fn allowed_next(family: DocumentFamily, from: &str) -> Result<Vec<&'static str>, UnknownStatus> {
    match family {
        DocumentFamily::PurchaseOrder => next_of::<PurchaseOrderStatus>(from),
        DocumentFamily::Grn => next_of::<GrnStatus>(from),
        DocumentFamily::StockTransfer => next_of::<StockTransferStatus>(from),
        DocumentFamily::Production => next_of::<ProductionStatus>(from),
        DocumentFamily::ProformaInvoice => next_of::<ProformaStatus>(from),
        DocumentFamily::DeliveryChallan => next_of::<ChallanStatus>(from),
        DocumentFamily::Bill
        | DocumentFamily::Purchase
        | DocumentFamily::Expense
        | DocumentFamily::Machine => Ok(Vec::new()),
    }
}

// ============================================================================
// Purchase orders
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PurchaseOrderStatus {
    Draft,
    Sent,
    Partial,
    Completed,
    Cancelled,
}

impl StatusMachine for PurchaseOrderStatus {
    const FAMILY: DocumentFamily = DocumentFamily::PurchaseOrder;
    const ALL: &'static [Self] = &[
        Self::Draft,
        Self::Sent,
        Self::Partial,
        Self::Completed,
        Self::Cancelled,
    ];

    fn initial() -> Self {
        Self::Draft
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Sent, Self::Cancelled],
            Self::Sent => &[Self::Partial, Self::Completed, Self::Cancelled],
            Self::Partial => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Sent => "Sent",
            Self::Partial => "Partial",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl PurchaseOrderStatus {
    /// Whether goods can still be received against the order
    pub fn is_receivable(self) -> bool {
        matches!(self, Self::Sent | Self::Partial)
    }
}

// ============================================================================
// Goods receipt notes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrnStatus {
    Draft,
    Inspected,
    Completed,
}

impl StatusMachine for GrnStatus {
    const FAMILY: DocumentFamily = DocumentFamily::Grn;
    const ALL: &'static [Self] = &[Self::Draft, Self::Inspected, Self::Completed];

    fn initial() -> Self {
        Self::Draft
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Inspected, Self::Completed],
            Self::Inspected => &[Self::Completed],
            Self::Completed => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Inspected => "Inspected",
            Self::Completed => "Completed",
        }
    }
}

// ============================================================================
// Stock transfers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockTransferStatus {
    Pending,
    #[serde(rename = "In Transit")]
    InTransit,
    Completed,
    Cancelled,
}

impl StatusMachine for StockTransferStatus {
    const FAMILY: DocumentFamily = DocumentFamily::StockTransfer;
    const ALL: &'static [Self] = &[
        Self::Pending,
        Self::InTransit,
        Self::Completed,
        Self::Cancelled,
    ];

    fn initial() -> Self {
        Self::Pending
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::InTransit, Self::Cancelled],
            Self::InTransit => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InTransit => "In Transit",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

// ============================================================================
// Production batches
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductionStatus {
    Planned,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
}

impl StatusMachine for ProductionStatus {
    const FAMILY: DocumentFamily = DocumentFamily::Production;
    const ALL: &'static [Self] = &[
        Self::Planned,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    fn initial() -> Self {
        Self::Planned
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            Self::Planned => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "Planned",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

// ============================================================================
// Proforma invoices
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProformaStatus {
    Draft,
    Sent,
    Accepted,
    Expired,
    Cancelled,
}

impl StatusMachine for ProformaStatus {
    const FAMILY: DocumentFamily = DocumentFamily::ProformaInvoice;
    const ALL: &'static [Self] = &[
        Self::Draft,
        Self::Sent,
        Self::Accepted,
        Self::Expired,
        Self::Cancelled,
    ];

    fn initial() -> Self {
        Self::Draft
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Sent, Self::Cancelled],
            Self::Sent => &[Self::Accepted, Self::Expired, Self::Cancelled],
            Self::Accepted | Self::Expired | Self::Cancelled => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Sent => "Sent",
            Self::Accepted => "Accepted",
            Self::Expired => "Expired",
            Self::Cancelled => "Cancelled",
        }
    }
}

// ============================================================================
// Delivery challans
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallanStatus {
    Draft,
    Dispatched,
    Delivered,
    Cancelled,
}

impl StatusMachine for ChallanStatus {
    const FAMILY: DocumentFamily = DocumentFamily::DeliveryChallan;
    const ALL: &'static [Self] = &[
        Self::Draft,
        Self::Dispatched,
        Self::Delivered,
        Self::Cancelled,
    ];

    fn initial() -> Self {
        Self::Draft
    }

    fn next_states(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Dispatched, Self::Cancelled],
            Self::Dispatched => &[Self::Delivered, Self::Cancelled],
            Self::Delivered | Self::Cancelled => &[],
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Dispatched => "Dispatched",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

macro_rules! impl_status_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

impl_status_display!(
    PurchaseOrderStatus,
    GrnStatus,
    StockTransferStatus,
    ProductionStatus,
    ProformaStatus,
    ChallanStatus,
);
