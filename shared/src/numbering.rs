//! Human-readable document numbers
//!
//! Year-scoped families are numbered `<PREFIX>-<YEAR>-<NNNNN>` (e.g.
//! `GRN-2026-00007`); machines are numbered `<PREFIX>-<NNNN>` with no year.
//! The sequence suffix is zero-padded to a fixed width so that string order
//! and numeric order agree inside a bucket.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Document families that carry a minted number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFamily {
    PurchaseOrder,
    Grn,
    StockTransfer,
    Production,
    ProformaInvoice,
    DeliveryChallan,
    Bill,
    Purchase,
    Expense,
    Machine,
}

impl DocumentFamily {
    pub const ALL: [DocumentFamily; 10] = [
        DocumentFamily::PurchaseOrder,
        DocumentFamily::Grn,
        DocumentFamily::StockTransfer,
        DocumentFamily::Production,
        DocumentFamily::ProformaInvoice,
        DocumentFamily::DeliveryChallan,
        DocumentFamily::Bill,
        DocumentFamily::Purchase,
        DocumentFamily::Expense,
        DocumentFamily::Machine,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentFamily::PurchaseOrder => "PO",
            DocumentFamily::Grn => "GRN",
            DocumentFamily::StockTransfer => "ST",
            DocumentFamily::Production => "PRD",
            DocumentFamily::ProformaInvoice => "PI",
            DocumentFamily::DeliveryChallan => "DC",
            DocumentFamily::Bill => "BILL",
            DocumentFamily::Purchase => "PUR",
            DocumentFamily::Expense => "EXP",
            DocumentFamily::Machine => "MCH",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.prefix() == prefix)
    }

    /// Human label used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            DocumentFamily::PurchaseOrder => "Purchase order",
            DocumentFamily::Grn => "GRN",
            DocumentFamily::StockTransfer => "Stock transfer",
            DocumentFamily::Production => "Production",
            DocumentFamily::ProformaInvoice => "Proforma invoice",
            DocumentFamily::DeliveryChallan => "Delivery challan",
            DocumentFamily::Bill => "Bill",
            DocumentFamily::Purchase => "Purchase",
            DocumentFamily::Expense => "Expense",
            DocumentFamily::Machine => "Machine",
        }
    }

    pub fn is_year_scoped(&self) -> bool {
        !matches!(self, DocumentFamily::Machine)
    }

    /// Zero-padded width of the numeric suffix
    pub fn sequence_width(&self) -> usize {
        if self.is_year_scoped() {
            5
        } else {
            4
        }
    }

    /// Largest sequence that still fits the fixed width
    pub fn max_sequence(&self) -> u32 {
        10u32.pow(self.sequence_width() as u32) - 1
    }

    /// Scope a new number falls into for the given calendar year
    pub fn scope_for_year(&self, year: i32) -> NumberScope {
        if self.is_year_scoped() {
            NumberScope::Year(year)
        } else {
            NumberScope::Unscoped
        }
    }
}

impl fmt::Display for DocumentFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bucket within a family inside which sequences are monotonic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberScope {
    Year(i32),
    Unscoped,
}

impl NumberScope {
    /// Key stored alongside the counter row; empty for unscoped families
    pub fn key(&self) -> String {
        match self {
            NumberScope::Year(year) => year.to_string(),
            NumberScope::Unscoped => String::new(),
        }
    }
}

/// Errors raised while parsing or advancing document numbers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberError {
    #[error("malformed document number: {0}")]
    Malformed(String),

    #[error("unknown document prefix: {0}")]
    UnknownPrefix(String),

    #[error("document number {0} belongs to a different family or scope")]
    WrongBucket(String),

    #[error("sequence exhausted for {0}")]
    Exhausted(String),
}

/// A parsed document number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentNumber {
    pub family: DocumentFamily,
    pub scope: NumberScope,
    pub sequence: u32,
}

impl DocumentNumber {
    pub fn new(
        family: DocumentFamily,
        scope: NumberScope,
        sequence: u32,
    ) -> Result<Self, NumberError> {
        let number = Self {
            family,
            scope,
            sequence,
        };
        if sequence == 0 || sequence > family.max_sequence() {
            return Err(NumberError::Exhausted(bucket_prefix(family, scope)));
        }
        Ok(number)
    }

    /// First number of a bucket
    pub fn first(family: DocumentFamily, scope: NumberScope) -> Self {
        Self {
            family,
            scope,
            sequence: 1,
        }
    }

    /// The number that follows this one in the same bucket
    pub fn next(&self) -> Result<Self, NumberError> {
        Self::new(self.family, self.scope, self.sequence + 1)
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.family.sequence_width();
        match self.scope {
            NumberScope::Year(year) => write!(
                f,
                "{}-{}-{:0width$}",
                self.family.prefix(),
                year,
                self.sequence,
                width = width
            ),
            NumberScope::Unscoped => write!(
                f,
                "{}-{:0width$}",
                self.family.prefix(),
                self.sequence,
                width = width
            ),
        }
    }
}

impl FromStr for DocumentNumber {
    type Err = NumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        let prefix = parts
            .first()
            .copied()
            .ok_or_else(|| NumberError::Malformed(s.to_string()))?;
        let family = DocumentFamily::from_prefix(prefix)
            .ok_or_else(|| NumberError::UnknownPrefix(prefix.to_string()))?;

        let (scope, digits) = match (family.is_year_scoped(), parts.as_slice()) {
            (true, [_, year, digits]) => {
                if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
                    return Err(NumberError::Malformed(s.to_string()));
                }
                let year = year
                    .parse::<i32>()
                    .map_err(|_| NumberError::Malformed(s.to_string()))?;
                (NumberScope::Year(year), *digits)
            }
            (false, [_, digits]) => (NumberScope::Unscoped, *digits),
            _ => return Err(NumberError::Malformed(s.to_string())),
        };

        if digits.len() != family.sequence_width() || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return Err(NumberError::Malformed(s.to_string()));
        }

        let sequence = digits
            .parse::<u32>()
            .map_err(|_| NumberError::Malformed(s.to_string()))?;

        Self::new(family, scope, sequence).map_err(|_| NumberError::Malformed(s.to_string()))
    }
}

/// Prefix shared by every number in a bucket, e.g. `PO-2026-` or `MCH-`
pub fn bucket_prefix(family: DocumentFamily, scope: NumberScope) -> String {
    match scope {
        NumberScope::Year(year) => format!("{}-{}-", family.prefix(), year),
        NumberScope::Unscoped => format!("{}-", family.prefix()),
    }
}

/// Compute the next number of a bucket from the greatest number issued so far.
///
/// `latest` is the lexicographically greatest existing number that starts
/// with the bucket prefix, or `None` when the bucket is empty.
pub fn next_number(
    family: DocumentFamily,
    scope: NumberScope,
    latest: Option<&str>,
) -> Result<DocumentNumber, NumberError> {
    match latest {
        None => Ok(DocumentNumber::first(family, scope)),
        Some(latest) => {
            let parsed: DocumentNumber = latest.parse()?;
            if parsed.family != family || parsed.scope != scope {
                return Err(NumberError::WrongBucket(latest.to_string()));
            }
            parsed.next()
        }
    }
}
