// ABOUTME: Concrete OAuth adapter implementations for Google and GitHub
// ABOUTME: Each does the code exchange and identity fetch for its provider
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::{OAuthAdapter, OAuthError, ProviderUserData};
use crate::config::environment::OAuthProviderConfig;
use serde::Deserialize;
use std::collections::HashMap;

/// Google OAuth adapter (OpenID Connect)
pub struct GoogleAdapter {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: String,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
}

impl GoogleAdapter {
    #[must_use]
    pub fn new(config: &OAuthProviderConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl OAuthAdapter for GoogleAdapter {
    fn name(&self) -> &str {
        "google"
    }

    fn auth_code_url(&self, state: &str) -> String {
        let scope = "openid email profile";
        format!(
            "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(scope),
            urlencoding::encode(state)
        )
    }

    async fn user_data(
        &self,
        query: &HashMap<String, String>,
    ) -> Result<ProviderUserData, OAuthError> {
        let code = query.get("code").ok_or(OAuthError::MissingCode)?;

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let token_response: GoogleTokenResponse = self
            .http
            .post("https://oauth2.googleapis.com/token")
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed(format!("parse error: {e}")))?;

        let info: GoogleUserInfo = self
            .http
            .get("https://openidconnect.googleapis.com/v1/userinfo")
            .bearer_auth(&token_response.access_token)
            .send()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(format!("parse error: {e}")))?;

        Ok(ProviderUserData {
            email: info.email,
            first_name: info.given_name,
            last_name: info.family_name,
            email_verified: info.email_verified,
        })
    }
}

/// GitHub OAuth adapter
pub struct GithubAdapter {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GithubTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

impl GithubAdapter {
    #[must_use]
    pub fn new(config: &OAuthProviderConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl OAuthAdapter for GithubAdapter {
    fn name(&self) -> &str {
        "github"
    }

    fn auth_code_url(&self, state: &str) -> String {
        let scope = "read:user user:email";
        format!(
            "https://github.com/login/oauth/authorize?client_id={}&redirect_uri={}&scope={}&state={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(scope),
            urlencoding::encode(state)
        )
    }

    async fn user_data(
        &self,
        query: &HashMap<String, String>,
    ) -> Result<ProviderUserData, OAuthError> {
        let code = query.get("code").ok_or(OAuthError::MissingCode)?;

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let token_response: GithubTokenResponse = self
            .http
            .post("https://github.com/login/oauth/access_token")
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed(format!("parse error: {e}")))?;

        // GitHub requires a User-Agent on API calls.
        let user: GithubUser = self
            .http
            .get("https://api.github.com/user")
            .header(reqwest::header::USER_AGENT, "ams-server")
            .bearer_auth(&token_response.access_token)
            .send()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(format!("parse error: {e}")))?;

        // The profile email may be private; fall back to the primary address.
        let (email, email_verified) = match user.email {
            Some(email) if !email.is_empty() => (email, false),
            _ => {
                let emails: Vec<GithubEmail> = self
                    .http
                    .get("https://api.github.com/user/emails")
                    .header(reqwest::header::USER_AGENT, "ams-server")
                    .bearer_auth(&token_response.access_token)
                    .send()
                    .await
                    .map_err(|e| OAuthError::UserInfoFailed(e.to_string()))?
                    .json()
                    .await
                    .map_err(|e| OAuthError::UserInfoFailed(format!("parse error: {e}")))?;

                emails
                    .into_iter()
                    .find(|e| e.primary)
                    .map(|e| (e.email, e.verified))
                    .ok_or_else(|| {
                        OAuthError::UserInfoFailed("no primary email on account".into())
                    })?
            }
        };

        let full_name = user.name.unwrap_or_default();
        let (first_name, last_name) = split_name(&full_name);

        Ok(ProviderUserData {
            email,
            first_name,
            last_name,
            email_verified,
        })
    }
}

/// Split a display name into first and last on the first space
fn split_name(full: &str) -> (String, String) {
    match full.trim().split_once(' ') {
        Some((first, last)) => (first.to_owned(), last.trim().to_owned()),
        None => (full.trim().to_owned(), String::new()),
    }
}
