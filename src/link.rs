//! # Link Normalizer
//! Reduces a submitted link to its canonical `domain.tld` form.
//!
//! Accepted shape, anchored at the start of the input:
//! - optional `http://` or `https://`,
//! - a core label of at least two word characters, a dot, and a word run,
//! - optionally one more `.word` suffix (e.g. the `.uk` of `bbc.co.uk`).
//!
//! The canonical domain is the core plus the suffix. Scheme, path, query and
//! fragment are dropped. A word character is `_` or a Unicode letter or number
//! (general categories `L*` and `Nd`/`Nl`/`No`). Combining marks are not word
//! characters, even where Unicode counts them as alphabetic.

use std::collections::BTreeSet;

use unicode_general_category::{get_general_category, GeneralCategory as Gc};

const SCHEMES: [&str; 2] = ["https://", "http://"];

fn is_word(c: char) -> bool {
    c == '_'
        || matches!(
            get_general_category(c),
            Gc::UppercaseLetter
                | Gc::LowercaseLetter
                | Gc::TitlecaseLetter
                | Gc::ModifierLetter
                | Gc::OtherLetter
                | Gc::DecimalNumber
                | Gc::LetterNumber
                | Gc::OtherNumber
        )
}

/// Leading word run of `s` as `(byte_len, char_count)`.
fn word_run(s: &str) -> (usize, usize) {
    let mut bytes = 0;
    let mut chars = 0;
    for c in s.chars().take_while(|&c| is_word(c)) {
        bytes += c.len_utf8();
        chars += 1;
    }
    (bytes, chars)
}

/// Byte length of a leading `.word+` group, if `s` starts with one.
fn dot_label(s: &str) -> Option<usize> {
    let rest = s.strip_prefix('.')?;
    let (len, _) = word_run(rest);
    (len > 0).then_some(len + 1)
}

/// Normalize one raw link. Returns `None` when the input is not a recognizable link.
///
/// ```
/// use visit_ledger::link::normalize_link;
/// assert_eq!(normalize_link("https://ya.ru?q=123").as_deref(), Some("ya.ru"));
/// assert_eq!(normalize_link("abc"), None);
/// ```
pub fn normalize_link(raw: &str) -> Option<String> {
    let body = SCHEMES
        .iter()
        .find_map(|scheme| raw.strip_prefix(scheme))
        .unwrap_or(raw);

    // Word runs are taken greedily; a shorter run can never be followed by '.',
    // so there is nothing to backtrack into.
    let (label_len, label_chars) = word_run(body);
    if label_chars < 2 {
        return None;
    }
    let core_end = label_len + dot_label(&body[label_len..])?;
    let suffix_len = dot_label(&body[core_end..]).unwrap_or(0);

    Some(body[..core_end + suffix_len].to_string())
}

/// Normalize a whole batch, all-or-nothing.
///
/// On success returns the deduplicated set of canonical domains. If any item is
/// rejected, returns every rejected raw item (input order) and nothing else.
pub fn normalize_batch<S: AsRef<str>>(raw: &[S]) -> Result<BTreeSet<String>, Vec<String>> {
    let mut domains = BTreeSet::new();
    let mut rejected = Vec::new();

    for item in raw {
        let item = item.as_ref();
        match normalize_link(item) {
            Some(domain) => {
                domains.insert(domain);
            }
            None => rejected.push(item.to_string()),
        }
    }

    if rejected.is_empty() {
        Ok(domains)
    } else {
        Err(rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> Option<String> {
        normalize_link(s)
    }

    #[test]
    fn strips_scheme_path_and_query() {
        assert_eq!(norm("https://ya.ru"), Some("ya.ru".to_string()));
        assert_eq!(norm("http://ya.ru/"), Some("ya.ru".to_string()));
        assert_eq!(norm("https://ya.ru?q=123"), Some("ya.ru".to_string()));
        assert_eq!(
            norm("https://stackoverflow.com/questions/11828270/how-to-exit-the-vim-editor"),
            Some("stackoverflow.com".to_string())
        );
        assert_eq!(norm("funbox.ru#top"), Some("funbox.ru".to_string()));
    }

    #[test]
    fn keeps_one_extra_suffix_only() {
        assert_eq!(norm("bbc.co.uk/news"), Some("bbc.co.uk".to_string()));
        assert_eq!(norm("www.google.com"), Some("www.google.com".to_string()));
        // A third dot group is cut off.
        assert_eq!(norm("www.google.co.uk"), Some("www.google.co".to_string()));
    }

    #[test]
    fn rejects_short_or_dotless_labels() {
        assert_eq!(norm("abc"), None);
        assert_eq!(norm("a.ru"), None);
        assert_eq!(norm("https://a.ru"), None);
        assert_eq!(norm("ya."), None);
        assert_eq!(norm(""), None);
        assert_eq!(norm("https://"), None);
    }

    #[test]
    fn scheme_is_case_sensitive_and_only_http() {
        assert_eq!(norm("HTTPS://ya.ru"), None);
        assert_eq!(norm("ftp://ya.ru"), None);
        assert_eq!(norm("//ya.ru"), None);
    }

    #[test]
    fn unicode_and_underscore_are_word_chars() {
        assert_eq!(norm("яндекс.рф/путь"), Some("яндекс.рф".to_string()));
        assert_eq!(norm("my_site.io"), Some("my_site.io".to_string()));
        // '-' is not a word char: the label stops there.
        assert_eq!(norm("my-site.io"), None);
        assert_eq!(norm("x²y.io"), Some("x²y.io".to_string()));
    }

    #[test]
    fn combining_marks_end_a_label() {
        // U+093F (Mc) follows the first letter, leaving a one-char label.
        assert_eq!(norm("हिंदी.भारत"), None);
        assert!(!is_word('\u{093F}'));
        assert!(!is_word('\u{0301}'));
        assert_eq!(norm("cafe\u{0301}.fr"), None);
        assert_eq!(norm("caf\u{00E9}.fr"), Some("caf\u{00E9}.fr".to_string()));
    }

    #[test]
    fn batch_dedups_and_collects_all_rejects() {
        let ok = normalize_batch(&["https://ya.ru", "https://ya.ru?q=123", "funbox.ru"]).unwrap();
        assert_eq!(
            ok.into_iter().collect::<Vec<_>>(),
            vec!["funbox.ru".to_string(), "ya.ru".to_string()]
        );

        let bad = normalize_batch(&["abc", "ya.ru", "asd", "asdasd"]).unwrap_err();
        assert_eq!(bad, vec!["abc", "asd", "asdasd"]);
    }
}
