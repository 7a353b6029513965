use crate::utils::errors::{CertSyncError, Result};

/// Reduce user input to a bare host name: drop any `scheme://` prefix and
/// trailing slashes, then require `label(.label)+` with an alphabetic TLD of
/// at least two characters.
pub fn normalize_domain(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let without_scheme = match trimmed.find("://") {
        Some(pos) => &trimmed[pos + 3..],
        None => trimmed,
    };
    let domain = without_scheme.trim_end_matches('/');

    if is_valid_domain(domain) {
        Ok(domain.to_string())
    } else {
        tracing::debug!("Rejected domain input {input:?}");
        Err(CertSyncError::NetworkTest("invalid domain format".to_string()))
    }
}

fn is_valid_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let well_formed = labels
        .iter()
        .all(|label| !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));

    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));

    well_formed && tld_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scheme_and_slash() {
        assert_eq!(normalize_domain("https://example.com").unwrap(), "example.com");
        assert_eq!(normalize_domain("http://example.com/").unwrap(), "example.com");
        assert_eq!(normalize_domain("intranet.corp.example.org").unwrap(), "intranet.corp.example.org");
        assert_eq!(normalize_domain("my-host.co").unwrap(), "my-host.co");
    }

    #[test]
    fn test_rejects_malformed_input() {
        for input in [
            "not a domain!!",
            "localhost",
            "example.c",
            "example.123",
            "example..com",
            ".example.com",
            "example.com/path",
            "",
            "https://",
        ] {
            let err = normalize_domain(input).unwrap_err();
            assert!(
                matches!(err, CertSyncError::NetworkTest(ref m) if m == "invalid domain format"),
                "{input:?} should be rejected"
            );
        }
    }
}
