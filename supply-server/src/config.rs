//! Server configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Where persistent state lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL connection URL
    Postgres(String),
    /// Process-local store (`DATABASE_URL=memory://`)
    Memory,
}

/// How password reset mails are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailBackend {
    /// Write a delivery record to the log only
    Log,
    /// AWS SES v2
    Ses,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    pub store: StoreBackend,
    /// HTTP port
    pub http_port: u16,
    /// HS256 signing secret for bearer tokens
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    /// Bearer token lifetime in minutes
    pub jwt_expiration_minutes: i64,
    pub email_backend: EmailBackend,
    /// SES sender email address
    pub ses_from_email: String,
    /// SES region override; the default AWS region otherwise
    pub ses_region: Option<String>,
    /// Allowed CORS origins
    pub cors_origins: Vec<String>,
    /// Seed demo catalog data into an empty store
    pub seed_demo_data: bool,
    /// Let anonymous `register` calls ask for the admin role
    pub allow_admin_registration: bool,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
        let store = if database_url.starts_with("memory://") {
            StoreBackend::Memory
        } else {
            StoreBackend::Postgres(database_url)
        };

        let email_backend = match std::env::var("EMAIL_BACKEND").as_deref() {
            Ok("ses") => EmailBackend::Ses,
            Ok("log") | Err(_) => EmailBackend::Log,
            Ok(other) => return Err(format!("unknown EMAIL_BACKEND: {other}").into()),
        };

        Ok(Self {
            store,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            jwt_issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "supply-server".into()),
            jwt_audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "supply-clients".into()),
            jwt_expiration_minutes: std::env::var("JWT_EXPIRATION_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1440),
            email_backend,
            ses_from_email: std::env::var("SES_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@supply.local".into()),
            ses_region: std::env::var("SES_REGION").ok().filter(|s| !s.is_empty()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            seed_demo_data: std::env::var("SEED_DEMO_DATA")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            allow_admin_registration: std::env::var("ALLOW_ADMIN_REGISTRATION")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            environment,
        })
    }

    /// In-memory configuration for tests and local experiments
    pub fn in_memory() -> Self {
        Self {
            environment: "development".into(),
            store: StoreBackend::Memory,
            http_port: 0,
            jwt_secret: "test-secret-at-least-32-bytes-long!!".into(),
            jwt_issuer: "supply-server".into(),
            jwt_audience: "supply-clients".into(),
            jwt_expiration_minutes: 60,
            email_backend: EmailBackend::Log,
            ses_from_email: "noreply@supply.local".into(),
            ses_region: None,
            cors_origins: vec!["http://localhost:3000".into()],
            seed_demo_data: false,
            allow_admin_registration: false,
        }
    }
}
