use anyhow::Result;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Détecte automatiquement l'environnement
    pub fn detect() -> Self {
        // Dans AWS Lambda on est toujours en production
        if env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
            return Self::Production;
        }

        Self::from_app_env(env::var("APP_ENV").ok().as_deref())
    }

    fn from_app_env(app_env: Option<&str>) -> Self {
        match app_env {
            Some("production" | "prod") => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    /// `None` only in development: the service then runs on the in-memory store.
    pub database_url: Option<String>,
    pub db_pool_size: u32,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_expiration_minutes: i64,
    pub bcrypt_cost: u32,
    pub lockout_max_attempts: u32,
    pub lockout_duration_minutes: i64,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_seconds: u64,
    /// Reverse proxies in front of the service that append to `X-Forwarded-For`.
    pub trusted_proxies: usize,
    pub password_reset_ttl_minutes: i64,
    pub frontend_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub seed_demo_data: bool,
}

impl Config {
    /// Charge la configuration depuis les variables d'environnement
    /// avec détection automatique de l'environnement
    pub fn from_env() -> Result<Self> {
        let environment = Environment::detect();

        tracing::info!(
            "🌍 Environment detected: {}",
            environment.as_str().to_uppercase()
        );

        let database_url = Self::get_database_url(&environment)?;
        let jwt_secret = Self::get_jwt_secret(&environment)?;
        let frontend_url = Self::get_frontend_url(&environment);

        let config = Self {
            database_url,
            db_pool_size: parse_var("DB_POOL_SIZE", 5),
            jwt_secret,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "timesheet-portal".to_string()),
            jwt_expiration_minutes: parse_var("JWT_EXPIRATION_MINUTES", 60),
            bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)
                .clamp(4, 31),
            lockout_max_attempts: parse_var("LOCKOUT_MAX_ATTEMPTS", 5),
            lockout_duration_minutes: parse_var("LOCKOUT_DURATION_MINUTES", 15),
            rate_limit_max_requests: parse_var("RATE_LIMIT_MAX_REQUESTS", 20),
            rate_limit_window_seconds: parse_var("RATE_LIMIT_WINDOW_SECONDS", 900),
            trusted_proxies: parse_var("TRUSTED_PROXIES", Self::default_trusted_proxies()),
            password_reset_ttl_minutes: parse_var("PASSWORD_RESET_TTL_MINUTES", 60),
            frontend_url,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: parse_var("SERVER_PORT", 3000),
            seed_demo_data: !environment.is_production() && parse_var("SEED_DEMO_DATA", false),
            environment,
        };

        tracing::info!("✅ Configuration loaded successfully");
        match &config.database_url {
            Some(url) => tracing::debug!("   Database: {}", Self::mask_credentials(url)),
            None => tracing::warn!("   DATABASE_URL not set, using the in-memory store"),
        }
        tracing::debug!("   Frontend: {}", config.frontend_url);
        tracing::debug!("   Server: {}:{}", config.server_host, config.server_port);
        tracing::debug!("   Trusted proxies: {}", config.trusted_proxies);
        tracing::debug!(
            "   Lockout: {} attempts / {} min, token lifetime {} min",
            config.lockout_max_attempts,
            config.lockout_duration_minutes,
            config.jwt_expiration_minutes
        );

        Ok(config)
    }

    /// Dans Lambda, API Gateway ajoute l'adresse du client à `X-Forwarded-For`.
    fn default_trusted_proxies() -> usize {
        usize::from(env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok())
    }

    /// DATABASE_URL est obligatoire en production, optionnel en dev
    fn get_database_url(environment: &Environment) -> Result<Option<String>> {
        match env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => Ok(Some(url)),
            _ if environment.is_production() => anyhow::bail!(
                "DATABASE_URL must be set in production! \
                 Configure it in Lambda environment variables."
            ),
            _ => Ok(None),
        }
    }

    /// Récupère JWT_SECRET avec validation
    fn get_jwt_secret(environment: &Environment) -> Result<String> {
        let secret = match env::var("JWT_SECRET") {
            Ok(s) => s,
            Err(_) if environment.is_production() => {
                tracing::error!("❌ JWT_SECRET not set in production!");
                anyhow::bail!("JWT_SECRET is required in production");
            }
            Err(_) => {
                tracing::warn!("⚠️  JWT_SECRET not set, using default (DEVELOPMENT ONLY!)");
                "dev_secret_key_change_in_production".to_string()
            }
        };

        if environment.is_production() && secret.len() < 32 {
            anyhow::bail!(
                "JWT_SECRET must be at least 32 characters in production (current: {})",
                secret.len()
            );
        }

        Ok(secret)
    }

    fn get_frontend_url(environment: &Environment) -> String {
        env::var("FRONTEND_URL").unwrap_or_else(|_| {
            if environment.is_production() {
                "https://timesheets.example.com".to_string()
            } else {
                "http://localhost:8080".to_string()
            }
        })
    }

    /// Masque les credentials dans les logs
    fn mask_credentials(url: &str) -> String {
        if let Some(at_pos) = url.find('@')
            && let Some(scheme_end) = url.find("://")
        {
            let scheme = &url[..scheme_end + 3];
            let after_at = &url[at_pos..];
            return format!("{scheme}***:***{after_at}");
        }
        url.to_string()
    }
}

/// Lit une variable typée; une valeur absente ou invalide retombe sur `default`.
fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{name}={raw:?} is not valid, falling back to {default}");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by unit tests: in-memory store, cheap bcrypt cost.
    pub fn for_tests() -> Self {
        Self {
            environment: Environment::Development,
            database_url: None,
            db_pool_size: 1,
            jwt_secret: "test_secret_for_timesheet_portal".to_string(),
            jwt_issuer: "timesheet-portal-test".to_string(),
            jwt_expiration_minutes: 60,
            bcrypt_cost: 4,
            lockout_max_attempts: 5,
            lockout_duration_minutes: 15,
            rate_limit_max_requests: 100,
            rate_limit_window_seconds: 900,
            trusted_proxies: 0,
            password_reset_ttl_minutes: 60,
            frontend_url: "http://localhost:8080".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            seed_demo_data: false,
        }
    }
}
