//! Filesystem-safe slug generation (SPEC_FULL.md §4.9, §6 Outputs
//! `saved_<slug>`): derived from `(netloc, path)` with an md5 tail so two
//! distinct query strings for the same path never collide.

/// `saved_<slug>` directory name for one URL's output tree.
#[must_use]
pub fn slug_for_url(url: &str) -> String {
    let parsed = url::Url::parse(url).ok();
    let netloc = parsed.as_ref().and_then(|u| u.host_str()).unwrap_or("unknown-host");
    let path = parsed.as_ref().map(|u| u.path()).unwrap_or("/");

    let base = format!("{netloc}{path}");
    let safe_base: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let trimmed = super::string_utils::safe_truncate_chars(safe_base.trim_matches('_'), 80);
    let trimmed = if trimmed.is_empty() { "root" } else { trimmed };

    let hash = format!("{:x}", md5::compute(url));
    format!("{trimmed}_{}", &hash[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_has_no_path_separators() {
        let slug = slug_for_url("https://example.com/a/b?x=1");
        assert!(!slug.contains('/'));
        assert!(!slug.is_empty());
    }

    #[test]
    fn distinct_query_strings_yield_distinct_slugs() {
        let a = slug_for_url("https://example.com/p?x=1");
        let b = slug_for_url("https://example.com/p?x=2");
        assert_ne!(a, b);
    }
}
