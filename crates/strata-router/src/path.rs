//! Request path normalization
//!
//! Both functions are pure and only ever borrow from their input.
use std::borrow::Cow;

/// Checks whether a path is already in route-key form
///
/// A route key carries no leading or trailing `/`. The empty string is the
/// key of the top-level page.
///
/// # Examples
///
/// ```
/// use strata_router::path::is_normalized;
///
/// assert!(is_normalized(""));
/// assert!(is_normalized("about"));
/// assert!(is_normalized("users/123"));
///
/// assert!(!is_normalized("/about"));
/// assert!(!is_normalized("about/"));
/// assert!(!is_normalized("/"));
/// ```
pub fn is_normalized(path: &str) -> bool {
    !path.starts_with('/') && !path.ends_with('/')
}

/// Normalizes a request path into a route key
///
/// Trims every leading and trailing `/`. Interior segments are left alone,
/// so `a//b` stays `a//b` and will not match any compiled pattern.
///
/// Returns `Cow::Borrowed` in every case; the result is always a sub-slice
/// of the input.
///
/// # Examples
///
/// ```
/// use strata_router::path::normalize_path;
///
/// assert_eq!(normalize_path("/"), "");
/// assert_eq!(normalize_path("/about/"), "about");
/// assert_eq!(normalize_path("//blog/hello//"), "blog/hello");
/// ```
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if is_normalized(path) {
        return Cow::Borrowed(path);
    }

    Cow::Borrowed(path.trim_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_normalized() {
        assert!(is_normalized(""));
        assert!(is_normalized("blog/posts/hello-world"));
        assert!(!is_normalized("/blog"));
        assert!(!is_normalized("blog/"));
    }

    #[test]
    fn test_normalize_root() {
        assert_eq!(normalize_path(""), "");
        assert_eq!(normalize_path("/"), "");
        assert_eq!(normalize_path("///"), "");
    }

    #[test]
    fn test_normalize_trims_both_ends() {
        assert_eq!(normalize_path("/about"), "about");
        assert_eq!(normalize_path("about/"), "about");
        assert_eq!(normalize_path("/users/123/"), "users/123");
    }

    #[test]
    fn test_normalize_keeps_interior_slashes() {
        assert_eq!(normalize_path("/a//b/"), "a//b");
    }

    #[test]
    fn test_normalize_borrows_valid_input() {
        assert!(matches!(normalize_path("about"), Cow::Borrowed("about")));
    }
}
