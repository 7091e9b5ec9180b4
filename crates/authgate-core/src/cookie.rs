//! Session cookie lookup in `Cookie` request headers.

/// Find the value of cookie `name` across one or more `Cookie` header values
/// (`a=1; b=2`). Names compare exactly; an empty value counts as absent,
/// so a later non-empty duplicate still wins.
pub fn find_cookie<'a, I>(header_values: I, name: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    header_values
        .into_iter()
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"'))
        .find(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_cookie_among_others() {
        let headers = ["theme=dark; authgate=abc+/=="];
        assert_eq!(find_cookie(headers, "authgate"), Some("abc+/=="));
    }

    #[test]
    fn scans_multiple_headers() {
        let headers = ["a=1", "b=2; authgate=tok"];
        assert_eq!(find_cookie(headers, "authgate"), Some("tok"));
    }

    #[test]
    fn name_must_match_exactly() {
        let headers = ["authgate_old=x; Authgate=y"];
        assert_eq!(find_cookie(headers, "authgate"), None);
    }

    #[test]
    fn empty_value_is_absent() {
        assert_eq!(find_cookie(["authgate="], "authgate"), None);
        assert_eq!(find_cookie(std::iter::empty(), "authgate"), None);
    }

    #[test]
    fn empty_duplicate_does_not_hide_later_value() {
        assert_eq!(find_cookie(["authgate=; authgate=tok"], "authgate"), Some("tok"));
        assert_eq!(find_cookie(["authgate=\"\"", "authgate=tok"], "authgate"), Some("tok"));
    }
}
