//! Name and ID definitions.

use crate::{define_id, define_name, IdError};

/// Maximum length of a DNS-1123 subdomain.
pub const MAX_SUBDOMAIN_LEN: usize = 253;

/// Maximum length of a profile name.
pub const MAX_PROFILE_NAME_LEN: usize = 253;

// =============================================================================
// Names
// =============================================================================

define_name!(NodeName, "node name", validate_dns_subdomain);
define_name!(ProfileName, "profile name", validate_profile_name);

// =============================================================================
// Passes
// =============================================================================

define_id!(PassId, "pass");

// =============================================================================
// Validation
// =============================================================================

/// Validates a DNS-1123 subdomain: lowercase alphanumerics, `-` and `.`,
/// starting and ending with an alphanumeric, at most 253 characters.
pub fn validate_dns_subdomain(kind: &'static str, s: &str) -> Result<(), IdError> {
    validate_with(kind, s, MAX_SUBDOMAIN_LEN, |c| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.'
    })
}

/// Validates a profile name: ASCII alphanumerics, `-`, `_` and `.`,
/// starting and ending with an alphanumeric.
pub fn validate_profile_name(kind: &'static str, s: &str) -> Result<(), IdError> {
    validate_with(kind, s, MAX_PROFILE_NAME_LEN, |c| {
        c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
    })
}

fn validate_with(
    kind: &'static str,
    s: &str,
    max: usize,
    allowed: impl Fn(char) -> bool,
) -> Result<(), IdError> {
    if s.is_empty() {
        return Err(IdError::Empty { kind });
    }

    let len = s.chars().count();
    if len > max {
        return Err(IdError::TooLong {
            kind,
            max,
            actual: len,
        });
    }

    if let Some((offset, ch)) = s.char_indices().find(|(_, c)| !allowed(*c)) {
        return Err(IdError::InvalidCharacter {
            kind,
            value: s.to_string(),
            ch,
            offset,
        });
    }

    let boundary_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !boundary_ok(s.chars().next()) || !boundary_ok(s.chars().last()) {
        return Err(IdError::InvalidBoundary {
            kind,
            value: s.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_node_name_accepts_subdomain() {
        let name: NodeName = "worker-0.rack-a".parse().unwrap();
        assert_eq!(name.as_str(), "worker-0.rack-a");
        assert_eq!(name.to_string(), "worker-0.rack-a");
    }

    #[test]
    fn test_node_name_rejects_uppercase() {
        let err = NodeName::parse("Worker-0").unwrap_err();
        assert!(matches!(err, IdError::InvalidCharacter { ch: 'W', offset: 0, .. }));
    }

    #[test]
    fn test_node_name_rejects_empty() {
        let err = NodeName::parse("").unwrap_err();
        assert!(err.is_empty());
    }

    #[test]
    fn test_node_name_rejects_trailing_dash() {
        let err = NodeName::parse("worker-").unwrap_err();
        assert!(matches!(err, IdError::InvalidBoundary { .. }));
    }

    #[test]
    fn test_node_name_rejects_too_long() {
        let long = "a".repeat(MAX_SUBDOMAIN_LEN + 1);
        let err = NodeName::parse(&long).unwrap_err();
        assert!(matches!(err, IdError::TooLong { actual: 254, .. }));
    }

    #[test]
    fn test_profile_name_allows_underscore_and_case() {
        let name: ProfileName = "Grandmaster_eth0".parse().unwrap();
        assert_eq!(name.as_str(), "Grandmaster_eth0");
        assert!(ProfileName::parse("_hidden").is_err());
    }

    #[test]
    fn test_names_order_lexicographically() {
        let mut names: Vec<ProfileName> = ["slave", "boundary", "default"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        names.sort();
        let sorted: Vec<&str> = names.iter().map(ProfileName::as_str).collect();
        assert_eq!(sorted, vec!["boundary", "default", "slave"]);
    }

    #[test]
    fn test_name_serde_validates() {
        let name: NodeName = serde_json::from_str("\"node-1\"").unwrap();
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"node-1\"");

        let bad: Result<NodeName, _> = serde_json::from_str("\"Node_1\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_pass_id_roundtrip() {
        let id = PassId::new();
        let s = id.to_string();
        assert!(s.starts_with("pass_"));
        let parsed: PassId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_pass_id_invalid_prefix() {
        let result: Result<PassId, _> = "node_01HV4Z2WQXKJNM8GPQY6VBKC3D".parse();
        assert!(result.unwrap_err().is_prefix_error());
    }

    #[test]
    fn test_pass_id_missing_separator() {
        let result: Result<PassId, _> = "pass01HV4Z2WQXKJNM8GPQY6VBKC3D".parse();
        assert_eq!(result.unwrap_err(), IdError::MissingSeparator);
    }

    proptest! {
        #[test]
        fn prop_valid_subdomains_parse(s in "[a-z0-9]([a-z0-9.-]{0,60}[a-z0-9])?") {
            let name = NodeName::parse(&s).unwrap();
            prop_assert_eq!(name.as_str(), s.as_str());
        }

        #[test]
        fn prop_parse_never_panics(s in "\\PC{0,80}") {
            let _ = NodeName::parse(&s);
            let _ = ProfileName::parse(&s);
        }
    }
}
