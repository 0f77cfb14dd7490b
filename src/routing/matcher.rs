//! Tool path matching.
//!
//! # Responsibilities
//! - Split the path after the mount point into tool slug and remainder
//! - Fall back to prefix matching when the first segment is not a slug
//!
//! # Design Decisions
//! - Slug matching is case-sensitive
//! - No regex; candidate lists are tiny
//! - First match wins, in tool-table order

/// Split `slug/rest/of/path` into `("slug", "rest/of/path")`.
/// Leading slashes on either part are dropped.
pub fn split_first_segment(path: &str) -> (&str, &str) {
    let path = path.trim_start_matches('/');
    match path.split_once('/') {
        Some((first, rest)) => (first, rest.trim_start_matches('/')),
        None => (path, ""),
    }
}

/// Find the first slug that prefixes the whole path and return it with
/// the remaining path after that prefix.
pub fn match_by_prefix<'a, 'p>(
    slugs: impl IntoIterator<Item = &'a str>,
    path: &'p str,
) -> Option<(&'a str, &'p str)> {
    let path = path.trim_start_matches('/');
    slugs
        .into_iter()
        .filter(|slug| !slug.is_empty())
        .find(|slug| path.starts_with(slug))
        .map(|slug| (slug, path[slug.len()..].trim_start_matches('/')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_first_segment() {
        assert_eq!(split_first_segment("sheets/api/rows"), ("sheets", "api/rows"));
        assert_eq!(split_first_segment("/sheets/"), ("sheets", ""));
        assert_eq!(split_first_segment("sheets"), ("sheets", ""));
        assert_eq!(split_first_segment("sheets//x"), ("sheets", "x"));
        assert_eq!(split_first_segment(""), ("", ""));
    }

    #[test]
    fn test_match_by_prefix_recomputes_remainder() {
        let slugs = ["sheets", "mer-report"];
        assert_eq!(
            match_by_prefix(slugs, "mer-reportexport/pdf"),
            Some(("mer-report", "export/pdf"))
        );
        assert_eq!(match_by_prefix(slugs, "sheets"), Some(("sheets", "")));
        assert_eq!(match_by_prefix(slugs, "unknown/x"), None);
    }

    #[test]
    fn test_match_by_prefix_first_wins() {
        let slugs = ["data", "data-extractor"];
        assert_eq!(match_by_prefix(slugs, "data-extractor/x"), Some(("data", "-extractor/x")));
    }
}
