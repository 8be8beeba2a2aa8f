use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Reset tokens are signed with their own secret so a leaked session key
/// cannot forge reset links (and vice versa).
#[derive(Debug, Clone, Deserialize)]
pub struct ResetConfig {
    pub secret: String,
    pub ttl_minutes: i64,
    /// Frontend base the reset link points at, e.g. "https://directory.example.edu".
    pub link_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailerConfig {
    pub relay_url: String,
    pub api_token: Option<String>,
    pub sender: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub reset: ResetConfig,
    pub mailer: MailerConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is required")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "campus-directory".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "campus-directory-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        let reset = ResetConfig {
            secret: std::env::var("RESET_SECRET").context("RESET_SECRET is required")?,
            ttl_minutes: std::env::var("RESET_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
            link_base: std::env::var("RESET_LINK_BASE")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
        };
        let mailer = MailerConfig {
            relay_url: std::env::var("MAIL_RELAY_URL").context("MAIL_RELAY_URL is required")?,
            api_token: std::env::var("MAIL_RELAY_TOKEN").ok(),
            sender: std::env::var("MAIL_SENDER")
                .unwrap_or_else(|_| "no-reply@campus-directory.local".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            reset,
            mailer,
        })
    }
}
