//! Canonical hostname form and the subdomain-membership predicate.
//!
//! Every hostname that enters the system passes through [`normalize`], and
//! every scope decision goes through [`is_subdomain_of`]. Adapters use
//! [`scoped_hosts`] to apply both at their boundary.

use std::collections::BTreeSet;

/// Canonicalize a raw hostname or domain.
///
/// Trims surrounding whitespace, lowercases, strips a trailing `.`, a
/// leading `*.` wildcard marker and a leading `.`. Stripping repeats until
/// the value stops changing so that `normalize(normalize(x)) == normalize(x)` holds for
/// every input, including degenerate ones such as `"*.*.example.com"`.
pub fn normalize(raw: &str) -> String {
    let mut current = raw.trim().to_lowercase();
    loop {
        let stripped = current.strip_suffix('.').unwrap_or(&current);
        let stripped = stripped.strip_prefix("*.").unwrap_or(stripped);
        let stripped = stripped.strip_prefix('.').unwrap_or(stripped).trim();
        if stripped.len() == current.len() {
            return current;
        }
        current = stripped.to_string();
    }
}

/// `true` iff `candidate` equals `root` or ends with `"." + root`, after
/// normalizing both. Names with an empty label (`a..example.com`) and empty
/// names are never in scope.
pub fn is_subdomain_of(candidate: &str, root: &str) -> bool {
    let candidate = normalize(candidate);
    let root = normalize(root);
    if has_empty_label(&candidate) || has_empty_label(&root) {
        return false;
    }
    candidate == root || candidate.ends_with(&format!(".{root}"))
}

fn has_empty_label(name: &str) -> bool {
    name.split('.').any(str::is_empty)
}

/// Normalize, scope-filter and deduplicate a batch of raw names for `domain`.
///
/// Out-of-scope and empty entries are dropped silently. The result is sorted.
pub fn scoped_hosts<I, S>(domain: &str, names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let root = normalize(domain);
    let mut seen = BTreeSet::new();
    for raw in names {
        let name = normalize(raw.as_ref());
        if is_subdomain_of(&name, &root) {
            seen.insert(name);
        }
    }
    seen.into_iter().collect()
}

/// Join a provider-supplied label with its root domain.
///
/// Label-style providers return `"api"` for `api.example.com`; an empty
/// label stands for the apex itself.
pub fn join_label(label: &str, domain: &str) -> String {
    let label = label.trim().trim_end_matches('.');
    if label.is_empty() {
        domain.to_string()
    } else {
        format!("{label}.{domain}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic_forms() {
        assert_eq!(normalize("  API.Example.COM. "), "api.example.com");
        assert_eq!(normalize("*.example.com"), "example.com");
        assert_eq!(normalize("*.Dev.Example.com."), "dev.example.com");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("."), "");
        assert_eq!(normalize(".example.com"), "example.com");
        assert_eq!(normalize("..www.example.com"), "www.example.com");
        assert_eq!(normalize("*..api.example.com"), "api.example.com");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "Example.com",
            "*.*.example.com",
            "example.com..",
            "*. example.com",
            " *.",
            "*",
            "\tMAIL.example.COM.\n",
            "xn--bcher-kva.example",
            "İstanbul.example",
            "..www.example.com",
            ". *.x.example.com",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_subdomain_predicate() {
        assert!(is_subdomain_of("api.example.com", "example.com"));
        assert!(is_subdomain_of("example.com", "example.com"));
        assert!(is_subdomain_of("A.B.EXAMPLE.COM.", "*.example.com"));
        assert!(!is_subdomain_of("notexample.com", "example.com"));
        assert!(!is_subdomain_of("example.com.evil.net", "example.com"));
        assert!(!is_subdomain_of("com", "example.com"));
        assert!(!is_subdomain_of("", "example.com"));
        assert!(!is_subdomain_of("example.com", ""));
        assert!(!is_subdomain_of("a..example.com", "example.com"));
        assert!(!is_subdomain_of("api.example.com", "example..com"));
    }

    #[test]
    fn test_scoped_hosts_filters_and_dedups() {
        let hosts = scoped_hosts(
            "example.com",
            [
                "a.example.com",
                "A.EXAMPLE.COM",
                "*.b.example.com",
                "evil.com",
                "",
                ".example.com",
                "..www.example.com",
                "c..example.com",
            ],
        );
        assert_eq!(
            hosts,
            vec!["a.example.com", "b.example.com", "example.com", "www.example.com"]
        );
    }

    #[test]
    fn test_join_label() {
        assert_eq!(join_label("api", "example.com"), "api.example.com");
        assert_eq!(join_label(" ", "example.com"), "example.com");
        assert_eq!(join_label("www.", "example.com"), "www.example.com");
    }
}
