//! Validation utilities for the retail ERP
//!
//! Each check returns a static message suitable for a `400` response body.

use rust_decimal::Decimal;

use crate::models::Priced;

// ============================================================================
// Document Validations
// ============================================================================

/// A document must carry at least one line
pub fn validate_has_lines<T>(lines: &[T]) -> Result<(), &'static str> {
    if lines.is_empty() {
        return Err("At least one line item is required");
    }
    Ok(())
}

/// Quantities on a line must be strictly positive
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Prices and amounts may be zero but never negative
pub fn validate_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

/// Tax rates are percentages between 0 and 100
pub fn validate_tax_rate(rate: Decimal) -> Result<(), &'static str> {
    if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
        return Err("Tax rate must be between 0 and 100");
    }
    Ok(())
}

/// Validate every line of a priced document.
///
/// Returns the index of the first bad line alongside the message.
pub fn validate_lines<L: Priced>(lines: &[L]) -> Result<(), (usize, &'static str)> {
    validate_has_lines(lines).map_err(|e| (0, e))?;
    for (i, line) in lines.iter().enumerate() {
        validate_quantity(line.quantity()).map_err(|e| (i, e))?;
        validate_amount(line.unit_price()).map_err(|e| (i, e))?;
        validate_amount(line.subtotal()).map_err(|e| (i, e))?;
    }
    Ok(())
}

// ============================================================================
// Master Data Validations
// ============================================================================

/// SKUs are 1-64 characters of letters, digits, `-`, `_` or `.`
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.is_empty() || sku.len() > 64 {
        return Err("SKU must be between 1 and 64 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err("SKU may only contain letters, digits, '-', '_' and '.'");
    }
    Ok(())
}

/// Names must not be blank
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name cannot be empty");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_empty_lines_rejected() {
        assert!(validate_has_lines::<LineItem>(&[]).is_err());
        assert_eq!(
            validate_lines::<LineItem>(&[]),
            Err((0, "At least one line item is required"))
        );
    }

    #[test]
    fn test_bad_line_index_reported() {
        let lines = vec![
            LineItem::new(Uuid::new_v4(), dec!(1), dec!(2)),
            LineItem::new(Uuid::new_v4(), dec!(0), dec!(2)),
        ];
        assert_eq!(validate_lines(&lines).unwrap_err().0, 1);
    }

    #[test]
    fn test_tax_rate_bounds() {
        assert!(validate_tax_rate(dec!(0)).is_ok());
        assert!(validate_tax_rate(dec!(100)).is_ok());
        assert!(validate_tax_rate(dec!(100.01)).is_err());
        assert!(validate_tax_rate(dec!(-1)).is_err());
    }

    #[test]
    fn test_sku() {
        assert!(validate_sku("RICE-5KG").is_ok());
        assert!(validate_sku("milk.1l_v2").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku("has space").is_err());
    }

    #[test]
    fn test_email_and_password() {
        assert!(validate_email("admin@mart.local").is_ok());
        assert!(validate_email("admin").is_err());
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
