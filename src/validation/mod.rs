use bigdecimal::BigDecimal;
use std::fmt;
use std::str::FromStr;

use crate::domain::{BundleKind, NewTransaction};

pub const ADDRESS_MIN_LEN: usize = 9;
pub const ADDRESS_MAX_LEN: usize = 20;
pub const AMOUNT_INPUT_MAX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T = ()> = Result<T, ValidationError>;

/// Raw payment request as received from the presentation layer.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub payer_address: String,
    pub recipient_address: String,
    pub amount: String,
}

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

/// Wallet account number: digits with an optional leading `+`. Returns the sanitized form.
pub fn validate_address(field: &'static str, value: &str) -> ValidationResult<String> {
    let address = sanitize_string(value);
    validate_required(field, &address)?;
    validate_max_len(field, &address, ADDRESS_MAX_LEN)?;

    if address.len() < ADDRESS_MIN_LEN {
        return Err(ValidationError::new(
            field,
            format!("must be at least {} characters", ADDRESS_MIN_LEN),
        ));
    }

    let digits = address.strip_prefix('+').unwrap_or(&address);
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new(
            field,
            "must contain only digits, optionally prefixed with '+'",
        ));
    }

    Ok(address)
}

/// Resolves the bundle for a price. Only the enumerated prices are accepted.
pub fn validate_amount(raw: &str) -> ValidationResult<BundleKind> {
    let raw = sanitize_string(raw);
    validate_required("amount", &raw)?;
    validate_max_len("amount", &raw, AMOUNT_INPUT_MAX_LEN)?;

    if !is_plain_decimal(&raw) {
        return Err(ValidationError::new(
            "amount",
            "must be a plain decimal with at most 2 fractional digits",
        ));
    }

    let amount = BigDecimal::from_str(&raw)
        .map_err(|_| ValidationError::new("amount", "must be a decimal number"))?;

    BundleKind::from_amount(&amount).ok_or_else(|| {
        let allowed = BundleKind::ALL
            .iter()
            .map(|kind| kind.amount().to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        ValidationError::new("amount", format!("must be {}", allowed))
    })
}

/// `[+]digits[.d[d]]`. No exponent notation: comparing a value like `1e99999999` against
/// the price list rescales it by that power of ten.
fn is_plain_decimal(raw: &str) -> bool {
    let unsigned = raw.strip_prefix('+').unwrap_or(raw);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };

    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    !whole.is_empty()
        && all_digits(whole)
        && fraction.map_or(true, |f| (1..=2).contains(&f.len()) && all_digits(f))
}

pub fn validate_payment_request(request: &PaymentRequest) -> ValidationResult<NewTransaction> {
    let payer_address = validate_address("payerAddress", &request.payer_address)?;
    let recipient_address = validate_address("recipientAddress", &request.recipient_address)?;
    let bundle_kind = validate_amount(&request.amount)?;

    Ok(NewTransaction::new(payer_address, recipient_address, bundle_kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(payer: &str, recipient: &str, amount: &str) -> PaymentRequest {
        PaymentRequest {
            payer_address: payer.to_string(),
            recipient_address: recipient.to_string(),
            amount: amount.to_string(),
        }
    }

    #[test]
    fn validates_required_field() {
        assert!(validate_required("field", "value").is_ok());
        assert!(validate_required("field", "   ").is_err());
    }

    #[test]
    fn validates_max_len() {
        assert!(validate_max_len("field", "abc", 3).is_ok());
        assert!(validate_max_len("field", "abcd", 3).is_err());
    }

    #[test]
    fn sanitizes_string() {
        assert_eq!(sanitize_string("  hello\tworld  "), "hello world");
        assert_eq!(sanitize_string(" \n "), "");
        assert_eq!(sanitize_string("06\u{0000}10000001"), "0610000001");
    }

    #[test]
    fn validates_addresses() {
        assert_eq!(
            validate_address("payerAddress", " 0610000001 "),
            Ok("0610000001".to_string())
        );
        assert!(validate_address("payerAddress", "+252610000001").is_ok());
        assert!(validate_address("payerAddress", "").is_err());
        assert!(validate_address("payerAddress", "061000").is_err());
        assert!(validate_address("payerAddress", "06100000ab").is_err());
        assert!(validate_address("payerAddress", "061 000 0001").is_err());
        assert!(validate_address("payerAddress", &"1".repeat(21)).is_err());
        assert!(validate_address("payerAddress", "+++++++++").is_err());
    }

    #[test]
    fn validates_amounts() {
        assert_eq!(validate_amount("0.20"), Ok(BundleKind::Short));
        assert_eq!(validate_amount("0.2"), Ok(BundleKind::Short));
        assert_eq!(validate_amount("0.40"), Ok(BundleKind::Long));

        for bad in ["0.30", "0", "-0.20", "1", "abc", "", "0.20.1"] {
            let err = validate_amount(bad).unwrap_err();
            assert_eq!(err.field, "amount", "input {:?}", bad);
        }
    }

    #[test]
    fn refuses_exponent_and_long_fraction_forms() {
        let started = std::time::Instant::now();
        for bad in [
            "1e99999999999999",
            "1e-9999999",
            "2e-1",
            "2E-1",
            "0.200",
            ".20",
            "0.",
            "+",
            "0x14",
        ] {
            let err = validate_amount(bad).unwrap_err();
            assert_eq!(err.field, "amount", "input {:?}", bad);
        }
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        assert_eq!(validate_amount("+0.40"), Ok(BundleKind::Long));
        assert_eq!(validate_amount("00.2"), Ok(BundleKind::Short));
    }

    #[test]
    fn amount_error_lists_allowed_values() {
        let err = validate_amount("0.30").unwrap_err();
        assert_eq!(err.message, "must be 0.20 or 0.40");
    }

    #[test]
    fn validates_whole_request() {
        let tx = validate_payment_request(&request("0610000001", "0650000001", "0.40")).unwrap();
        assert_eq!(tx.payer_address, "0610000001");
        assert_eq!(tx.recipient_address, "0650000001");
        assert_eq!(tx.bundle_kind, BundleKind::Long);

        let err = validate_payment_request(&request("0610000001", "", "0.40")).unwrap_err();
        assert_eq!(err.field, "recipientAddress");
    }
}
