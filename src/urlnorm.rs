//! Obfuscated-URL normalization (SPEC_FULL.md §6 Inputs, §8 round-trip
//! property): threat-intel target lists commonly write `hxxp(s)://` and
//! `[.]`/`[:]` to defang links so they don't auto-render as clickable. This
//! core reads them as plain targets.

use once_cell::sync::Lazy;
use regex::Regex;

static BRACKET_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\.\]").expect("valid regex"));
static BRACKET_COLON: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[:\]").expect("valid regex"));
static HXXP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^hxxp").expect("valid regex"));

/// Normalize a single obfuscated URL/line. Idempotent: normalizing an
/// already-normal URL is a no-op (SPEC_FULL.md invariant `normalize ∘ obfuscate
/// = identity`).
#[must_use]
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let de_bracketed = BRACKET_COLON.replace_all(&BRACKET_DOT.replace_all(trimmed, "."), ":");
    HXXP.replace(&de_bracketed, "http").into_owned()
}

/// Read a text file of one URL per line, normalizing each and skipping blank
/// lines / `#`-prefixed comments (SPEC_FULL.md §6 Inputs).
pub fn read_url_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(normalize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_defanged_scheme_and_dots() {
        assert_eq!(normalize("hxxps://a[.]b[.]c[:]8080/p"), "https://a.b.c:8080/p");
        assert_eq!(normalize("hxxp://evil[.]example"), "http://evil.example");
    }

    #[test]
    fn normalize_is_idempotent_on_plain_urls() {
        let url = "https://example.com/path?x=1";
        assert_eq!(normalize(url), url);
        assert_eq!(normalize(&normalize(url)), url);
    }

    #[test]
    fn read_url_list_skips_blanks_and_comments() {
        let list = read_url_list("# comment\n\nhxxp://a[.]b\nhttps://c.d\n");
        assert_eq!(list, vec!["http://a.b".to_string(), "https://c.d".to_string()]);
    }
}
