//! Archive name rendering and filesystem-safe sanitation.
//!
//! Placeholder substitution is literal string replacement: `{timestamp}`,
//! `{date}`, `{user}`, and `{userid}` are recognized, anything else stays
//! verbatim. The rendered name always passes through the sanitizer, and an
//! empty sanitized result falls back to a generated default so the caller
//! always receives a usable filename.

use chrono::{DateTime, Utc};

/// Characters rejected by common filesystems, beyond separators.
const UNSAFE_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Render `pattern` into a sanitized archive base name (no extension).
#[must_use]
pub fn render(pattern: &str, timestamp: DateTime<Utc>, user_login: &str, user_id: u64) -> String {
    let epoch = timestamp.timestamp();
    let rendered = pattern
        .replace("{timestamp}", &epoch.to_string())
        .replace("{date}", &timestamp.format("%Y-%m-%d").to_string())
        .replace("{user}", user_login)
        .replace("{userid}", &user_id.to_string());

    let sanitized = sanitize_file_name(&rendered);
    if sanitized.is_empty() {
        format!("library-download-{epoch}")
    } else {
        sanitized
    }
}

/// Strip path separators, control characters, unsafe punctuation, and
/// leading dots; collapse whitespace runs. May return an empty string.
#[must_use]
pub fn sanitize_file_name(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.chars() {
        if ch.is_control() || ch == '/' || ch == '\\' || UNSAFE_CHARS.contains(&ch) {
            continue;
        }
        if ch.is_whitespace() {
            pending_space = !cleaned.is_empty();
            continue;
        }
        if pending_space {
            cleaned.push(' ');
            pending_space = false;
        }
        cleaned.push(ch);
    }
    cleaned.trim_start_matches('.').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_timestamp() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).single().expect("valid")
    }

    #[test]
    fn renders_user_and_timestamp_placeholders() {
        let name = render("{user}-{timestamp}", fixed_timestamp(), "alice", 3);
        assert_eq!(name, "alice-1700000000");
    }

    #[test]
    fn renders_date_and_userid_placeholders() {
        let name = render("{date}_{userid}", fixed_timestamp(), "alice", 3);
        assert_eq!(name, "2023-11-14_3");
    }

    #[test]
    fn unrecognized_placeholders_stay_verbatim() {
        let name = render("{site}-{timestamp}", fixed_timestamp(), "alice", 3);
        assert_eq!(name, "{site}-1700000000");
    }

    #[test]
    fn sanitizer_strips_separators_and_unsafe_characters() {
        assert_eq!(sanitize_file_name("../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_file_name("a<b>c:d\"e|f?g*h"), "abcdefgh");
        assert_eq!(sanitize_file_name("back\\slash"), "backslash");
    }

    #[test]
    fn sanitizer_collapses_whitespace_and_leading_dots() {
        assert_eq!(sanitize_file_name("  my   archive  "), "my archive");
        assert_eq!(sanitize_file_name("...hidden"), "hidden");
        assert_eq!(sanitize_file_name("tab\tand\nnewline"), "tab and newline");
    }

    #[test]
    fn empty_pattern_falls_back_to_generated_default() {
        let name = render("///", fixed_timestamp(), "alice", 3);
        assert_eq!(name, "library-download-1700000000");
    }
}
