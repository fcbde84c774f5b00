//! Email harvesting over scraped text: pattern match, normalize,
//! deduplicate, filter.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";

/// Throwaway/free providers excluded when the caller asks for business
/// addresses only.
pub const FREE_MAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "outlook.com",
    "hotmail.com",
    "aol.com",
    "mail.com",
    "protonmail.com",
    "icloud.com",
];

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("valid email pattern"))
}

/// All distinct addresses in `text`, lowercased for consistency.
pub fn extract_emails(text: &str) -> HashSet<String> {
    email_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Whether `candidate` is a single well-formed address.
pub fn is_valid_email(candidate: &str) -> bool {
    email_regex()
        .find(candidate)
        .is_some_and(|m| m.start() == 0 && m.end() == candidate.len())
}

/// Drop addresses whose domain appears in `exclude_domains`
/// (case-insensitive).
pub fn filter_excluding_domains(
    emails: HashSet<String>,
    exclude_domains: &[&str],
) -> HashSet<String> {
    if exclude_domains.is_empty() {
        return emails;
    }
    let excluded: Vec<String> = exclude_domains.iter().map(|d| d.to_lowercase()).collect();
    emails
        .into_iter()
        .filter(|email| {
            email
                .rsplit_once('@')
                .map(|(_, domain)| !excluded.iter().any(|d| d == domain))
                .unwrap_or(false)
        })
        .collect()
}

/// Drop addresses at well-known free providers.
pub fn exclude_free_providers(emails: HashSet<String>) -> HashSet<String> {
    filter_excluding_domains(emails, FREE_MAIL_DOMAINS)
}

/// Deterministic output order for display and export.
pub fn sorted_emails(emails: HashSet<String>) -> Vec<String> {
    let mut list: Vec<String> = emails.into_iter().collect();
    list.sort();
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_lowercases() {
        let text = "Contact Sales@Example.COM or support@example.com today";
        let emails = extract_emails(text);
        assert_eq!(emails.len(), 2);
        assert!(emails.contains("sales@example.com"));
        assert!(emails.contains("support@example.com"));
    }

    #[test]
    fn deduplicates_case_variants() {
        let emails = extract_emails("a@b.co A@B.CO a@b.co");
        assert_eq!(emails.len(), 1);
    }

    #[test]
    fn ignores_non_addresses() {
        assert!(extract_emails("no emails here, just an @ sign and a.dot").is_empty());
        assert!(extract_emails("half@address").is_empty());
    }

    #[test]
    fn validates_whole_string_only() {
        assert!(is_valid_email("user@example.org"));
        assert!(!is_valid_email("see user@example.org for details"));
        assert!(!is_valid_email("user@"));
    }

    #[test]
    fn filters_excluded_domains() {
        let emails: HashSet<String> = ["a@gmail.com", "b@corp.io", "c@Yahoo.com"]
            .iter()
            .map(|s| s.to_lowercase())
            .collect();
        let kept = exclude_free_providers(emails);
        assert_eq!(sorted_emails(kept), vec!["b@corp.io".to_string()]);
    }

    #[test]
    fn sorted_output_is_deterministic() {
        let emails = extract_emails("z@z.zz a@a.aa m@m.mm");
        assert_eq!(
            sorted_emails(emails),
            vec!["a@a.aa".to_string(), "m@m.mm".to_string(), "z@z.zz".to_string()]
        );
    }
}
