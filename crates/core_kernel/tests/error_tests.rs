//! Tests for kernel error conversions

use core_kernel::{CoreError, MoneyError, TemporalError, SaleId};

#[test]
fn test_money_error_converts() {
    let err: CoreError = MoneyError::Overflow.into();
    assert!(matches!(err, CoreError::Money(MoneyError::Overflow)));
    assert!(err.to_string().contains("Overflow"));
}

#[test]
fn test_temporal_error_converts() {
    let err: CoreError = TemporalError::UnknownTimezone("Nowhere/City".into()).into();
    assert!(err.to_string().contains("Nowhere/City"));
}

#[test]
fn test_identifier_error_converts() {
    let parse_err = "SALE-abc".parse::<SaleId>().unwrap_err();
    let err: CoreError = parse_err.into();
    assert!(matches!(err, CoreError::Identifier(_)));
}

#[test]
fn test_helper_constructors() {
    assert!(matches!(CoreError::validation("bad"), CoreError::Validation(m) if m == "bad"));
    assert!(matches!(CoreError::configuration("missing"), CoreError::Configuration(_)));
}
