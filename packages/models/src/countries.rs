//! Country code sets used across analyses.

/// ISO 3166-1 alpha-2 codes of the European Economic Area members
/// (EU-27 plus Iceland, Liechtenstein, and Norway).
pub const EEE_COUNTRY_CODES: &[&str] = &[
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT", "LV",
    "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE", "IS", "LI", "NO",
];

/// Returns `true` if `code` is an EEE member. Case-insensitive.
#[must_use]
pub fn is_eee_member(code: &str) -> bool {
    EEE_COUNTRY_CODES
        .iter()
        .any(|member| member.eq_ignore_ascii_case(code.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eee_count() {
        assert_eq!(EEE_COUNTRY_CODES.len(), 30);
    }

    #[test]
    fn membership() {
        assert!(is_eee_member("ES"));
        assert!(is_eee_member("no"));
        assert!(!is_eee_member("GB"));
        assert!(!is_eee_member("CH"));
        assert!(!is_eee_member(""));
    }
}
