use super::{
    config,
    models::{AppState, User},
    session,
    theme::Theme,
};
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, HeaderValue, StatusCode},
};
use regex::Regex;
use std::{convert::Infallible, sync::OnceLock};

/// Signed-in user; page loads without a valid session get bounced to the
/// login screen.
pub struct AuthenticatedUser(pub User);

/// Signed-in user if there is one. Controllers that write hand this to the
/// record access layer, which decides what "not signed in" means.
pub struct MaybeUser(pub Option<User>);

/// The palette the user picked, or the default one.
pub struct CurrentTheme(pub Theme);

fn redirect_to_login() -> (StatusCode, HeaderMap) {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Location",
        HeaderValue::from_static("/authentication/login"),
    );

    (StatusCode::FOUND, headers)
}

fn cookie_pattern(name: &str) -> Regex {
    Regex::new(&format!(r"(?:^|;\s*){}=([^;]*)", regex::escape(name)))
        .expect("cookie pattern is a valid regex")
}

/// Value of the cookie called `name`, if the request carries one.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    static SESSION: OnceLock<Regex> = OnceLock::new();
    static THEME: OnceLock<Regex> = OnceLock::new();
    let re = match name {
        config::SESSION_COOKIE => SESSION.get_or_init(|| cookie_pattern(name)),
        config::THEME_COOKIE => THEME.get_or_init(|| cookie_pattern(name)),
        _ => return None,
    };
    headers
        .get_all("Cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            re.captures(cookie)
                .and_then(|captures| captures.get(1))
                .map(|m| m.as_str())
        })
        .filter(|value| !value.is_empty())
}

fn session_user(parts: &Parts, state: &AppState) -> Option<User> {
    let token = read_cookie(&parts.headers, config::SESSION_COOKIE)?;
    match session::deserialize_session(&state.config.session_secret, token) {
        Ok(session) => Some(session.user),
        Err(reason) => {
            tracing::debug!(reason, "ignoring invalid session cookie");
            None
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = (StatusCode, HeaderMap);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        session_user(parts, state)
            .map(AuthenticatedUser)
            .ok_or_else(redirect_to_login)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(session_user(parts, state)))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentTheme
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(CurrentTheme(
            read_cookie(&parts.headers, config::THEME_COOKIE)
                .and_then(Theme::parse)
                .unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Cookie", HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_read_cookie_among_others() {
        let h = headers("theme=dark; session=abc:def; other=1");
        assert_eq!(read_cookie(&h, "session"), Some("abc:def"));
        assert_eq!(read_cookie(&h, "theme"), Some("dark"));
    }

    #[test]
    fn test_read_cookie_is_not_fooled_by_suffixes() {
        let h = headers("mysession=evil; session=good");
        assert_eq!(read_cookie(&h, "session"), Some("good"));
        let h = headers("mysession=evil");
        assert_eq!(read_cookie(&h, "session"), None);
    }

    #[test]
    fn test_cleared_cookie_reads_as_absent() {
        let h = headers("session=");
        assert_eq!(read_cookie(&h, "session"), None);
        assert_eq!(read_cookie(&HeaderMap::new(), "session"), None);
    }
}
