/// HTMX utils
use axum::http::{HeaderMap, HeaderValue};

pub fn redirect(to: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Hx-Redirect",
        HeaderValue::from_str(to)
            .unwrap_or(HeaderValue::from_static("/")),
    );
    headers
}

/// Error fragments are swapped into the page-level `#alerts` region instead
/// of whatever element fired the request.
pub fn retarget_alert() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Hx-Retarget", HeaderValue::from_static("#alerts"));
    headers.insert("Hx-Reswap", HeaderValue::from_static("innerHTML"));
    headers
}

/// Full page reload; for changes that touch the page shell, like the theme.
pub fn refresh() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Hx-Refresh", HeaderValue::from_static("true"));
    headers
}

/// Did htmx ask for a fragment? Boosted navigation sends `Hx-Request` too,
/// but it wants the whole page.
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("Hx-Request") && !headers.contains_key("Hx-Boosted")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boosted_navigation_is_not_a_fragment_request() {
        let mut headers = HeaderMap::new();
        assert!(!is_htmx(&headers));
        headers.insert("Hx-Request", HeaderValue::from_static("true"));
        assert!(is_htmx(&headers));
        headers.insert("Hx-Boosted", HeaderValue::from_static("true"));
        assert!(!is_htmx(&headers));
    }
}
