//! Pure field normalization helpers shared by all source adapters

pub mod author;
pub mod date;
pub mod ident;
pub mod issn;
pub mod pages;
pub mod title;

use std::hash::Hash;

use rustc_hash::FxHashSet;

/// Remove repeated items, keeping the first occurrence of each in place.
pub fn dedup_in_place<T: Hash + Eq + Clone>(items: &mut Vec<T>) {
    let mut seen = FxHashSet::default();
    items.retain(|item| seen.insert(item.clone()));
}

/// Trimmed value, or `None` for blank and "n.n." (nomen nescio) placeholders.
pub fn non_placeholder(s: &str) -> Option<&str> {
    let t = s.trim();
    if t.is_empty() || t.eq_ignore_ascii_case("n.n.") {
        None
    } else {
        Some(t)
    }
}

/// First `max` characters of `s`, cut at a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_is_stable() {
        let mut v = vec![3, 1, 3, 2, 1];
        dedup_in_place(&mut v);
        assert_eq!(v, vec![3, 1, 2]);
    }

    #[test]
    fn placeholders() {
        assert_eq!(non_placeholder("  N.N. "), None);
        assert_eq!(non_placeholder(""), None);
        assert_eq!(non_placeholder(" 12 "), Some("12"));
    }

    #[test]
    fn truncate_on_char_boundary() {
        assert_eq!(truncate_chars("Müller", 2), "Mü");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
