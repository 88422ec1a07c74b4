//! Server configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Stripe rejects Checkout Sessions that expire sooner than 30 minutes
const MIN_RESERVATION_TTL_MINUTES: i64 = 30;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// JWT secret for admin/staff authentication
    pub jwt_secret: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// HMAC key for ticket QR payloads
    pub ticket_signing_secret: String,
    /// URL to redirect after successful checkout (`{CHECKOUT_SESSION_ID}` is filled by Stripe)
    pub checkout_success_url: String,
    /// URL to redirect after cancelled checkout
    pub checkout_cancel_url: String,
    /// SES sender email address
    pub ses_from_email: String,
    /// ISO currency code (lower-case, as Stripe expects)
    pub currency: String,
    /// How long a pending registration holds its stock
    pub reservation_ttl_minutes: i64,
    /// Expiry sweeper interval
    pub sweep_interval_secs: u64,
    /// Ticket number prefix
    pub ticket_prefix: String,
    /// Event details printed on tickets and emails
    pub event_name: String,
    pub event_venue: String,
    pub event_date: String,
    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,
    /// First admin account, created when no admin exists yet
    pub admin_bootstrap_username: Option<String>,
    pub admin_bootstrap_password: Option<String>,
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

    fn env_or(name: &str, default: &str) -> String {
        std::env::var(name).unwrap_or_else(|_| default.into())
    }

    fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = Self::env_or("ENVIRONMENT", "development");

        let reservation_ttl_minutes: i64 = Self::env_parse("RESERVATION_TTL_MINUTES", 30);
        if reservation_ttl_minutes < MIN_RESERVATION_TTL_MINUTES {
            tracing::warn!(
                configured = reservation_ttl_minutes,
                "RESERVATION_TTL_MINUTES below Stripe minimum, using {MIN_RESERVATION_TTL_MINUTES}"
            );
        }

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: Self::env_parse("HTTP_PORT", 8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            stripe_secret_key: Self::require_secret("STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: Self::require_secret("STRIPE_WEBHOOK_SECRET", &environment)?,
            ticket_signing_secret: Self::require_secret("TICKET_SIGNING_SECRET", &environment)?,
            checkout_success_url: Self::env_or(
                "CHECKOUT_SUCCESS_URL",
                "https://emstradefair.com/registration/success?session_id={CHECKOUT_SESSION_ID}",
            ),
            checkout_cancel_url: Self::env_or(
                "CHECKOUT_CANCEL_URL",
                "https://emstradefair.com/registration/cancel",
            ),
            ses_from_email: Self::env_or("SES_FROM_EMAIL", "tickets@emstradefair.com"),
            currency: Self::env_or("CURRENCY", "eur").to_lowercase(),
            reservation_ttl_minutes: reservation_ttl_minutes.max(MIN_RESERVATION_TTL_MINUTES),
            sweep_interval_secs: Self::env_parse("SWEEP_INTERVAL_SECS", 60),
            ticket_prefix: Self::env_or("TICKET_PREFIX", "EMS").to_uppercase(),
            event_name: Self::env_or("EVENT_NAME", "EMS Trade Fair"),
            event_venue: Self::env_or("EVENT_VENUE", "VR Room Malta"),
            event_date: Self::env_or("EVENT_DATE", "TBA"),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            admin_bootstrap_username: std::env::var("ADMIN_BOOTSTRAP_USERNAME")
                .ok()
                .filter(|s| !s.is_empty()),
            admin_bootstrap_password: std::env::var("ADMIN_BOOTSTRAP_PASSWORD")
                .ok()
                .filter(|s| !s.is_empty()),
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Reservation lifetime in milliseconds
    pub fn reservation_ttl_millis(&self) -> i64 {
        self.reservation_ttl_minutes * 60 * 1000
    }
}
