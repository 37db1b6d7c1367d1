//! Canonical XSD lexical forms used by the node store (at intern time) and by
//! the canonicalizing sink.
//!
//! Grounded in spirit on `oxsdatatypes::{Decimal, Double, Float, Boolean}`'s
//! `Display` impls (this crate has no dependency on `oxsdatatypes` itself, so the
//! canonicalization is reimplemented directly against each type's lexical
//! grammar rather than routed through a typed numeric value).

use crate::error::{Result, Status};
use base64::Engine;

fn bad_text(what: &str, input: &str) -> Status {
    Status::BadText(format!("invalid {what} lexical form {input:?}"))
}

/// `xsd:boolean`: `"true"` or `"false"`.
#[must_use]
pub fn canonical_boolean(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

pub fn parse_boolean(input: &str) -> Result<bool> {
    match input.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(bad_text("xsd:boolean", input)),
    }
}

/// `xsd:integer`: base-10, no leading zeros, optional leading `-`.
pub fn canonical_integer(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad_text("xsd:integer", input));
    }
    let stripped = digits.trim_start_matches('0');
    let stripped = if stripped.is_empty() { "0" } else { stripped };
    Ok(if negative && stripped != "0" {
        format!("-{stripped}")
    } else {
        stripped.to_owned()
    })
}

/// `xsd:decimal`: exactly one `.`, no exponent, shortest round-trippable fixed point.
pub fn canonical_decimal(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (int_part, frac_part) = rest.split_once('.').unwrap_or((rest, ""));
    if (int_part.is_empty() && frac_part.is_empty())
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(bad_text("xsd:decimal", input));
    }
    let int_trimmed = int_part.trim_start_matches('0');
    let int_trimmed = if int_trimmed.is_empty() {
        "0"
    } else {
        int_trimmed
    };
    let frac_trimmed = frac_part.trim_end_matches('0');
    let is_zero = int_trimmed == "0" && frac_trimmed.is_empty();
    let frac_final = if frac_trimmed.is_empty() {
        "0"
    } else {
        frac_trimmed
    };
    let body = format!("{int_trimmed}.{frac_final}");
    Ok(if negative && !is_zero {
        format!("-{body}")
    } else {
        body
    })
}

/// `xsd:double` / `xsd:float`: `M.NNNE±E` form, capital `E`, exactly one fractional digit group.
#[must_use]
pub fn canonical_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "INF" } else { "-INF" }.to_owned();
    }
    if value == 0.0 {
        return if value.is_sign_negative() {
            "-0.0E0"
        } else {
            "0.0E0"
        }
        .to_owned();
    }
    let raw = format!("{value:E}");
    let (mantissa, exponent) = raw.split_once('E').expect("UpperExp always emits an E");
    let mantissa = if mantissa.contains('.') {
        mantissa.to_owned()
    } else {
        format!("{mantissa}.0")
    };
    format!("{mantissa}E{exponent}")
}

#[must_use]
pub fn canonical_float(value: f32) -> String {
    canonical_double(f64::from(value))
}

/// `xsd:base64Binary`: RFC 4648 base64 with `=` padding.
#[must_use]
pub fn canonical_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn parse_base64(input: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| Status::BadText(format!("invalid xsd:base64Binary lexical form: {e}")))
}

/// `xsd:hexBinary`: uppercase hex pairs.
#[must_use]
pub fn canonical_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

pub fn parse_hex(input: &str) -> Result<Vec<u8>> {
    hex::decode(input.trim())
        .map_err(|e| Status::BadText(format!("invalid xsd:hexBinary lexical form: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_drops_leading_zeros_but_keeps_sign() {
        assert_eq!(canonical_integer("007").unwrap(), "7");
        assert_eq!(canonical_integer("-007").unwrap(), "-7");
        assert_eq!(canonical_integer("+42").unwrap(), "42");
        assert_eq!(canonical_integer("000").unwrap(), "0");
        assert!(canonical_integer("4.2").is_err());
    }

    #[test]
    fn decimal_keeps_one_dot_and_trims_zeros() {
        assert_eq!(canonical_decimal("010.2300").unwrap(), "10.23");
        assert_eq!(canonical_decimal("-0.0").unwrap(), "0.0");
        assert_eq!(canonical_decimal("5").unwrap(), "5.0");
        assert_eq!(canonical_decimal(".5").unwrap(), "0.5");
    }

    #[test]
    fn double_uses_scientific_form_with_capital_e() {
        assert_eq!(canonical_double(100.0), "1.0E2");
        assert_eq!(canonical_double(1.5), "1.5E0");
        assert_eq!(canonical_double(0.0), "0.0E0");
        assert_eq!(canonical_double(f64::NAN), "NaN");
        assert_eq!(canonical_double(f64::INFINITY), "INF");
    }

    #[test]
    fn base64_and_hex_round_trip() {
        let bytes = b"hello";
        let b64 = canonical_base64(bytes);
        assert_eq!(parse_base64(&b64).unwrap(), bytes);
        let hx = canonical_hex(bytes);
        assert_eq!(hx, "68656C6C6F");
        assert_eq!(parse_hex(&hx).unwrap(), bytes);
    }
}
