//! Google OAuth login flow: redirect out, exchange the code on callback,
//! upsert the account and hand the browser back to the client app.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, warn};
use url::Url;

use crate::config;
use crate::error::ApiError;
use crate::handlers::auth::session_cookies;
use crate::services::account_service::AccountService;
use crate::state::AppState;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

#[derive(Debug, Deserialize)]
pub struct RedirectParams {
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleProfile {
    id: String,
    email: String,
    name: Option<String>,
    picture: Option<String>,
}

fn oauth_config() -> Result<(&'static str, &'static str), ApiError> {
    let cfg = config::config();
    match (
        cfg.oauth.google_client_id.as_deref(),
        cfg.oauth.google_client_secret.as_deref(),
    ) {
        (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok((id, secret)),
        _ => Err(ApiError::service_unavailable(
            "Google OAuth is not configured",
        )),
    }
}

pub async fn google_redirect(
    Query(params): Query<RedirectParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (client_id, _) = oauth_config()?;
    let cfg = config::config();

    let mut url = Url::parse(GOOGLE_AUTH_URL)
        .map_err(|_| ApiError::internal_server_error("Invalid OAuth endpoint"))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("client_id", client_id);
        query.append_pair("redirect_uri", &cfg.oauth.google_callback_url);
        query.append_pair("response_type", "code");
        query.append_pair("scope", "openid email profile");
        if let Some(return_to) = &params.return_to {
            query.append_pair("state", return_to);
        }
    }

    Ok(Redirect::temporary(url.as_str()))
}

pub async fn google_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (client_id, client_secret) = oauth_config()?;
    let cfg = config::config();

    if let Some(e) = params.error {
        warn!(error = %e, "oauth provider returned an error");
        return Ok(failure_redirect().into_response());
    }
    let Some(code) = params.code else {
        return Ok(failure_redirect().into_response());
    };

    let profile = match fetch_profile(client_id, client_secret, &code).await {
        Ok(profile) => profile,
        Err(e) => {
            error!(error = %e, "oauth code exchange failed");
            return Ok(failure_redirect().into_response());
        }
    };

    let service = AccountService::new(state.store.clone());
    let name = profile.name.clone().unwrap_or_else(|| profile.email.clone());
    let outcome = service
        .oauth_login(&profile.id, &profile.email, &name, profile.picture)
        .await?;

    let mut target = format!("{}/auth/success", cfg.client.origin_url);
    if let Some(return_to) = params.state.filter(|s| s.starts_with('/')) {
        target = format!("{}{}", cfg.client.origin_url, return_to);
    }

    Ok((
        session_cookies(&outcome.token),
        Redirect::temporary(&target),
    )
        .into_response())
}

fn failure_redirect() -> Redirect {
    let cfg = config::config();
    Redirect::temporary(&format!("{}/auth/failed", cfg.client.origin_url))
}

async fn fetch_profile(
    client_id: &str,
    client_secret: &str,
    code: &str,
) -> Result<GoogleProfile, reqwest::Error> {
    let cfg = config::config();
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let token: TokenResponse = client
        .post(GOOGLE_TOKEN_URL)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", &cfg.oauth.google_callback_url),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    client
        .get(GOOGLE_USERINFO_URL)
        .bearer_auth(&token.access_token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}
