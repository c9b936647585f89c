// ABOUTME: Cookie parsing and assembly for browser sessions
// ABOUTME: HttpOnly token cookies plus JS-readable expiry companions
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 AMS Works

//! Browser cookie handling.
//!
//! Four cookies carry a browser session: the HttpOnly access and refresh
//! token cookies, and two non-HttpOnly expiry companions so frontend code
//! can know when tokens lapse without being able to read them. Outside the
//! local environment every cookie is `Secure; SameSite=Strict`.

use axum::http::{header, HeaderMap, HeaderValue};
use std::collections::HashMap;

use crate::auth::TokenPair;
use crate::config::environment::{CookieConfig, Environment};
use crate::constants::cookies as cookie_constants;

/// Resolved cookie names for one deployment
#[derive(Debug, Clone)]
pub struct CookieNames {
    prefix: String,
}

impl CookieNames {
    #[must_use]
    pub fn new(config: &CookieConfig) -> Self {
        Self {
            prefix: config.prefix.clone(),
        }
    }

    #[must_use]
    pub fn access(&self) -> String {
        format!("{}{}", self.prefix, cookie_constants::ACCESS_SUFFIX)
    }

    #[must_use]
    pub fn refresh(&self) -> String {
        format!("{}{}", self.prefix, cookie_constants::REFRESH_SUFFIX)
    }

    #[must_use]
    pub fn access_expiry(&self) -> String {
        format!("{}{}", self.prefix, cookie_constants::ACCESS_EXPIRY_SUFFIX)
    }

    #[must_use]
    pub fn refresh_expiry(&self) -> String {
        format!("{}{}", self.prefix, cookie_constants::REFRESH_EXPIRY_SUFFIX)
    }
}

/// Read one cookie's value from the request headers
#[must_use]
pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    parse_cookies(headers).remove(name)
}

/// Parse every cookie on the request into a map
#[must_use]
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for value in headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                cookies.insert(name.to_owned(), value.to_owned());
            }
        }
    }
    cookies
}

/// Assemble one `Set-Cookie` value
#[must_use]
pub fn build_cookie(
    name: &str,
    value: &str,
    max_age_secs: u64,
    http_only: bool,
    environment: &Environment,
) -> String {
    let mut cookie = format!("{name}={value}; Path=/; Max-Age={max_age_secs}");
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    if environment.strict_cookies() {
        cookie.push_str("; Secure; SameSite=Strict");
    }
    cookie
}

/// Assemble a `Set-Cookie` value that clears a cookie
#[must_use]
pub fn clear_cookie(name: &str, environment: &Environment) -> String {
    build_cookie(name, "", 0, true, environment)
}

/// The four `Set-Cookie` headers carrying a fresh session
///
/// Token cookies are HttpOnly; expiry companions are readable by browser JS.
#[must_use]
pub fn session_cookies(
    names: &CookieNames,
    pair: &TokenPair,
    environment: &Environment,
) -> Vec<String> {
    let now = chrono::Utc::now();
    let access_max_age = (pair.access_expires_at - now).num_seconds().max(0) as u64;
    let refresh_max_age = (pair.refresh_expires_at - now).num_seconds().max(0) as u64;

    vec![
        build_cookie(
            &names.access(),
            &pair.access_token,
            access_max_age,
            true,
            environment,
        ),
        build_cookie(
            &names.refresh(),
            &pair.refresh_token,
            refresh_max_age,
            true,
            environment,
        ),
        build_cookie(
            &names.access_expiry(),
            &pair.access_expires_at.to_rfc3339(),
            access_max_age,
            false,
            environment,
        ),
        build_cookie(
            &names.refresh_expiry(),
            &pair.refresh_expires_at.to_rfc3339(),
            refresh_max_age,
            false,
            environment,
        ),
    ]
}

/// The four `Set-Cookie` headers clearing a session
#[must_use]
pub fn clear_session_cookies(names: &CookieNames, environment: &Environment) -> Vec<String> {
    vec![
        clear_cookie(&names.access(), environment),
        clear_cookie(&names.refresh(), environment),
        build_cookie(&names.access_expiry(), "", 0, false, environment),
        build_cookie(&names.refresh_expiry(), "", 0, false, environment),
    ]
}

/// Append `Set-Cookie` headers to a response header map
pub fn append_set_cookies(headers: &mut HeaderMap, cookies: &[String]) {
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            headers.append(header::SET_COOKIE, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> CookieNames {
        CookieNames::new(&CookieConfig::default())
    }

    #[test]
    fn test_cookie_names_from_prefix() {
        let names = names();
        assert_eq!(names.access(), "ams_at");
        assert_eq!(names.refresh(), "ams_rt");
        assert_eq!(names.access_expiry(), "ams_at_exp");
        assert_eq!(names.refresh_expiry(), "ams_rt_exp");
    }

    #[test]
    fn test_parse_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("ams_at=tok; g_state=XYZ.abc"),
        );
        let cookies = parse_cookies(&headers);
        assert_eq!(cookies.get("ams_at").map(String::as_str), Some("tok"));
        assert_eq!(cookies.get("g_state").map(String::as_str), Some("XYZ.abc"));
        assert_eq!(get_cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_local_cookies_are_relaxed() {
        let cookie = build_cookie("ams_at", "v", 900, true, &Environment::Local);
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));
        assert!(!cookie.contains("SameSite"));
    }

    #[test]
    fn test_production_cookies_are_strict() {
        let cookie = build_cookie("ams_at", "v", 900, true, &Environment::Production);
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
    }

    #[test]
    fn test_expiry_companions_are_not_http_only() {
        let authority = crate::auth::TokenAuthority::new(
            &crate::config::environment::TokenConfig::default(),
        );
        let mut user = crate::models::User::new("A", "B", "a@b.c");
        user.transition_to(crate::models::UserStatus::Active).unwrap();
        let pair = authority.create_token_pair(&user).unwrap();

        let cookies = session_cookies(&names(), &pair, &Environment::Production);
        assert_eq!(cookies.len(), 4);
        assert!(cookies[0].contains("HttpOnly"));
        assert!(cookies[1].contains("HttpOnly"));
        assert!(!cookies[2].contains("HttpOnly"));
        assert!(!cookies[3].contains("HttpOnly"));
    }
}
