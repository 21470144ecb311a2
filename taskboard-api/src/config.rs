/// Configuration management for the API server
///
/// Loads configuration from environment variables (with `.env` support) into a
/// type-safe struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `ACCESS_TOKEN_SECRET`: HS256 secret for access tokens (required, 32+ chars)
/// - `REFRESH_TOKEN_SECRET`: HS256 secret for refresh tokens (required, 32+ chars)
/// - `ACCESS_TOKEN_EXPIRY_MINUTES`: Access token lifetime (default: 1440)
/// - `REFRESH_TOKEN_EXPIRY_DAYS`: Refresh token lifetime (default: 10)
/// - `CORS_ORIGIN`: Comma-separated allowed origins, `*` for any (default: http://localhost:5173)
/// - `SERVER_URL`: Public base URL used in mailed links (default: http://localhost:8080)
/// - `PRODUCTION`: `true` marks cookies `Secure` and enables HSTS (default: false)
/// - `RUST_LOG`, `LOG_FORMAT`: read by `main`, not here
///
/// # Example
///
/// ```no_run
/// use taskboard_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use std::env;
use taskboard_shared::auth::jwt::TokenSettings;

/// Minimum length of each token secret
const MIN_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins
    pub cors_origins: Vec<String>,

    /// Public base URL of this server
    pub server_url: String,

    /// Production mode (secure cookies, HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Access token secret
    ///
    /// Must be kept secret and be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub access_secret: String,

    /// Refresh token secret, distinct from the access secret
    pub refresh_secret: String,

    pub access_expiry_minutes: i64,
    pub refresh_expiry_days: i64,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a value does not
    /// parse, or a secret is too short.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_host = var_or("API_HOST", "0.0.0.0");
        let api_port = var_or("API_PORT", "8080").parse::<u16>()?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var_or("DATABASE_MAX_CONNECTIONS", "10").parse::<u32>()?;

        let access_secret = required_secret(&lookup, "ACCESS_TOKEN_SECRET")?;
        let refresh_secret = required_secret(&lookup, "REFRESH_TOKEN_SECRET")?;

        let access_expiry_minutes = var_or("ACCESS_TOKEN_EXPIRY_MINUTES", "1440").parse::<i64>()?;
        let refresh_expiry_days = var_or("REFRESH_TOKEN_EXPIRY_DAYS", "10").parse::<i64>()?;

        if access_expiry_minutes <= 0 || refresh_expiry_days <= 0 {
            anyhow::bail!("Token expiry values must be positive");
        }

        let cors_origins = var_or("CORS_ORIGIN", "http://localhost:5173")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let server_url = var_or("SERVER_URL", "http://localhost:8080")
            .trim_end_matches('/')
            .to_string();

        let production = matches!(
            var_or("PRODUCTION", "false").to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        );

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                server_url,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                access_secret,
                refresh_secret,
                access_expiry_minutes,
                refresh_expiry_days,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Secrets and lifetimes for issuing tokens
    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            access_secret: self.jwt.access_secret.clone(),
            refresh_secret: self.jwt.refresh_secret.clone(),
            access_ttl: Duration::minutes(self.jwt.access_expiry_minutes),
            refresh_ttl: Duration::days(self.jwt.refresh_expiry_days),
        }
    }

    /// Pool settings for `taskboard_shared::db::pool`
    pub fn pool_config(&self) -> taskboard_shared::db::pool::DatabaseConfig {
        taskboard_shared::db::pool::DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            ..Default::default()
        }
    }
}

fn required_secret<F>(lookup: &F, key: &str) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let secret = lookup(key)
        .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))?;

    if secret.len() < MIN_SECRET_LENGTH {
        anyhow::bail!("{} must be at least {} characters long", key, MIN_SECRET_LENGTH);
    }

    Ok(secret)
}
