use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub oauth: OAuthConfig,
    pub client: ClientConfig,
    pub invitations: InvitationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cookie_domain: Option<String>,
    /// Email address granted the system-admin capability (tenant enumeration)
    pub system_admin_email: Option<String>,
    pub require_csrf: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_callback_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Front-end origin used for OAuth success/failure redirects
    pub origin_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationConfig {
    pub default_expiry_days: i64,
    pub max_expiry_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("COOKIE_DOMAIN") {
            self.security.cookie_domain = Some(v);
        }
        if let Ok(v) = env::var("SYSTEM_ADMIN_EMAIL") {
            self.security.system_admin_email = Some(v);
        }
        if let Ok(v) = env::var("REQUIRE_CSRF") {
            self.security.require_csrf = v.parse().unwrap_or(self.security.require_csrf);
        }

        if let Ok(v) = env::var("GOOGLE_CLIENT_ID") {
            self.oauth.google_client_id = Some(v);
        }
        if let Ok(v) = env::var("GOOGLE_CLIENT_SECRET") {
            self.oauth.google_client_secret = Some(v);
        }
        if let Ok(v) = env::var("GOOGLE_CALLBACK_URL") {
            self.oauth.google_callback_url = v;
        }

        if let Ok(v) = env::var("CLIENT_URL") {
            self.client.origin_url = v;
        }

        if let Ok(v) = env::var("INVITATION_EXPIRY_DAYS") {
            self.invitations.default_expiry_days =
                v.parse().unwrap_or(self.invitations.default_expiry_days);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 5000 },
            security: SecurityConfig {
                jwt_secret: "dev-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                cookie_domain: None,
                system_admin_email: None,
                require_csrf: false,
            },
            oauth: OAuthConfig {
                google_client_id: None,
                google_client_secret: None,
                google_callback_url: "http://localhost:5000/api/auth/google/callback".to_string(),
            },
            client: ClientConfig {
                origin_url: "http://localhost:3000".to_string(),
            },
            invitations: InvitationConfig {
                default_expiry_days: 7,
                max_expiry_days: 30,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cookie_domain: None,
                system_admin_email: None,
                require_csrf: true,
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            security: SecurityConfig {
                jwt_secret: String::new(), // must come from JWT_SECRET
                jwt_expiry_hours: 24 * 7,
                cookie_domain: None,
                system_admin_email: None,
                require_csrf: true,
            },
            ..Self::development()
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_defaults() {
        let config = AppConfig::development();
        assert!(!config.security.require_csrf);
        assert!(!config.security.jwt_secret.is_empty());
        assert_eq!(config.invitations.default_expiry_days, 7);
        assert_eq!(config.invitations.max_expiry_days, 30);
    }

    #[test]
    fn production_requires_explicit_secret() {
        let config = AppConfig::production();
        assert!(config.security.jwt_secret.is_empty());
        assert!(config.security.require_csrf);
    }
}
