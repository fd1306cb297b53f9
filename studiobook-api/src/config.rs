/// Configuration management for the API server
///
/// Configuration comes from environment variables, with a `.env` file
/// loaded first when present.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `PORT`: Port to bind to (default: 3000)
/// - `APP_ENV`: `development`, `test` or `production` (default: development)
/// - `CLIENT_URL`: Allowed CORS origins, comma-separated, `*` for any
///   (default: http://localhost:3000)
/// - `API_VERSION`: Versioned route prefix (default: v1)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `RUN_MIGRATIONS`: Apply pending migrations at startup (default: true)
/// - `JWT_SECRET`: Token signing secret, at least 32 characters (required)
/// - `RATE_LIMIT_WINDOW_SECS`: Rate limit window (default: 900)
/// - `RATE_LIMIT_MAX_REQUESTS`: Requests per window and client (default: 100)
/// - `REDIS_URL`: Redis holding the rate-limit counters (required in
///   production; rate limiting is off when unset elsewhere)
/// - `TRUST_PROXY`: Key clients on the first `X-Forwarded-For` hop
///   (default: false)
/// - `REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 30)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use studiobook_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::{env, str::FromStr};

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => anyhow::bail!("Unknown APP_ENV '{}'", other),
        }
    }
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,

    /// Prefix segment of versioned routes, e.g. `v1`
    pub version: String,

    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for token signing, at least 32 characters.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u32,
    pub redis_url: Option<String>,

    /// Only enable behind a proxy that overwrites `X-Forwarded-For`
    pub trust_proxy: bool,
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Fails if `DATABASE_URL` or `JWT_SECRET` is missing, the secret is
    /// shorter than 32 characters, `REDIS_URL` is missing in production, or
    /// a value does not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let environment: Environment = var("APP_ENV", "development").parse()?;

        let redis_url = lookup("REDIS_URL").filter(|url| !url.trim().is_empty());
        if redis_url.is_none() && environment.is_production() {
            anyhow::bail!("REDIS_URL environment variable is required in production");
        }

        let cors_origins = var("CLIENT_URL", "http://localhost:3000")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST", "0.0.0.0"),
                port: parse(&var("PORT", "3000"), "PORT")?,
                environment,
                cors_origins,
                version: var("API_VERSION", "v1"),
                request_timeout_secs: parse(&var("REQUEST_TIMEOUT_SECS", "30"), "REQUEST_TIMEOUT_SECS")?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse(
                    &var("DATABASE_MAX_CONNECTIONS", "10"),
                    "DATABASE_MAX_CONNECTIONS",
                )?,
                run_migrations: parse(&var("RUN_MIGRATIONS", "true"), "RUN_MIGRATIONS")?,
            },
            jwt: JwtConfig { secret: jwt_secret },
            rate_limit: RateLimitConfig {
                window_secs: parse(&var("RATE_LIMIT_WINDOW_SECS", "900"), "RATE_LIMIT_WINDOW_SECS")?,
                max_requests: parse(
                    &var("RATE_LIMIT_MAX_REQUESTS", "100"),
                    "RATE_LIMIT_MAX_REQUESTS",
                )?,
                redis_url,
                trust_proxy: parse(&var("TRUST_PROXY", "false"), "TRUST_PROXY")?,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn is_production(&self) -> bool {
        self.api.environment.is_production()
    }
}

fn parse<T>(value: &str, key: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/studiobook"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.api.environment, Environment::Development);
        assert_eq!(config.api.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.api.version, "v1");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.database.max_connections, 10);
        assert!(config.database.run_migrations);
        assert_eq!(config.rate_limit.window_secs, 900);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert!(config.rate_limit.redis_url.is_none());
        assert!(!config.rate_limit.trust_proxy);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://db/studiobook"),
            ("JWT_SECRET", SECRET),
            ("PORT", "8080"),
            ("APP_ENV", "production"),
            ("CLIENT_URL", "https://app.example.com, https://admin.example.com"),
            ("RUN_MIGRATIONS", "false"),
            ("REDIS_URL", "redis://cache:6379"),
            ("TRUST_PROXY", "true"),
        ]))
        .unwrap();

        assert_eq!(config.api.port, 8080);
        assert!(config.is_production());
        assert_eq!(config.api.cors_origins.len(), 2);
        assert_eq!(config.api.cors_origins[1], "https://admin.example.com");
        assert!(!config.database.run_migrations);
        assert_eq!(config.rate_limit.redis_url.as_deref(), Some("redis://cache:6379"));
        assert!(config.rate_limit.trust_proxy);
    }

    #[test]
    fn test_production_requires_redis() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://db/x"),
            ("JWT_SECRET", SECRET),
            ("APP_ENV", "production"),
        ]));
        assert!(result.unwrap_err().to_string().contains("REDIS_URL"));
    }

    #[test]
    fn test_required_and_invalid_values() {
        assert!(Config::from_lookup(lookup(&[("JWT_SECRET", SECRET)])).is_err());
        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "postgresql://db/x")])).is_err());

        let short = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://db/x"),
            ("JWT_SECRET", "short"),
        ]));
        assert!(short.unwrap_err().to_string().contains("at least 32"));

        let bad_port = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://db/x"),
            ("JWT_SECRET", SECRET),
            ("PORT", "http"),
        ]));
        assert!(bad_port.unwrap_err().to_string().contains("PORT"));
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("PRODUCTION".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("test".parse::<Environment>().unwrap(), Environment::Test);
        assert!("staging".parse::<Environment>().is_err());
    }
}
