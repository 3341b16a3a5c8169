//! Google OAuth 2.0 authorization-code flow.

use rand::{distr::Alphanumeric, Rng};
use serde::Deserialize;
use url::Url;

use crate::{config::Settings, error::ApiError};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USER_INFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

#[derive(Debug, Deserialize)]
pub struct GoogleTokens {
    pub access_token: String,
}

/// Subset of the v2 `userinfo` payload we use.
#[derive(Debug, Deserialize)]
pub struct GoogleUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
}

impl GoogleOAuth {
    pub fn new(client_id: String, client_secret: String) -> Self {
        GoogleOAuth {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
        }
    }

    /// `None` unless both client id and secret are configured.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        match (&settings.google_client_id, &settings.google_client_secret) {
            (Some(id), Some(secret)) => Some(GoogleOAuth::new(id.clone(), secret.clone())),
            _ => None,
        }
    }

    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<String, ApiError> {
        let url = Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| ApiError::Internal(e.into()))?;
        Ok(url.into())
    }

    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<GoogleTokens, ApiError> {
        let resp = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;

        if !resp.status().is_success() {
            log::warn!("google token exchange returned {}", resp.status());
            return Err(ApiError::bad_request("Failed to exchange code for token"));
        }
        resp.json()
            .await
            .map_err(|_| ApiError::bad_request("Failed to exchange code for token"))
    }

    pub async fn user_info(&self, access_token: &str) -> Result<GoogleUser, ApiError> {
        let resp = self
            .http
            .get(USER_INFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;

        if !resp.status().is_success() {
            return Err(ApiError::bad_request("Failed to get user info from Google"));
        }
        resp.json()
            .await
            .map_err(|_| ApiError::bad_request("Failed to get user info from Google"))
    }
}

/// Random CSRF nonce for the `state` parameter.
pub fn new_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_encodes_parameters() {
        let google = GoogleOAuth::new("client-123".into(), "secret".into());
        let raw = google
            .authorization_url("http://localhost:8080/auth/callback", "abc")
            .unwrap();
        let url = Url::parse(&raw).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["redirect_uri"], "http://localhost:8080/auth/callback");
        assert_eq!(params["scope"], "openid email profile");
        assert_eq!(params["state"], "abc");
        assert!(!raw.contains("secret"));
    }

    #[test]
    fn state_is_random_alphanumeric() {
        let a = new_state();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, new_state());
    }

    #[test]
    fn disabled_without_credentials() {
        let settings = Settings::for_tests();
        assert!(GoogleOAuth::from_settings(&settings).is_none());
    }
}
