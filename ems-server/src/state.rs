//! Application state for ems-server

use std::sync::Arc;

use aws_sdk_sesv2::Client as SesClient;
use sqlx::PgPool;

use crate::auth::RateLimiter;
use crate::config::Config;
use crate::email::EmailService;
use crate::error::BoxError;
use crate::stripe::StripeClient;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    pub config: Arc<Config>,
    /// Per-IP limiter for the public and login routes
    pub rate_limiter: RateLimiter,
    pub stripe: StripeClient,
    pub email: EmailService,
}

impl AppState {
    /// Connect to PostgreSQL, run migrations and build the AWS clients
    pub async fn new(config: Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let ses = if let Ok(ses_region) = std::env::var("SES_REGION") {
            let ses_config = aws_config
                .to_builder()
                .region(aws_config::Region::new(ses_region))
                .build();
            SesClient::new(&ses_config)
        } else {
            SesClient::new(&aws_config)
        };

        Ok(Self::from_parts(pool, ses, config))
    }

    /// Assemble state from already-built clients (tests use a lazy pool)
    pub fn from_parts(pool: PgPool, ses: SesClient, config: Config) -> Self {
        let config = Arc::new(config);
        Self {
            stripe: StripeClient::new(config.stripe_secret_key.clone()),
            email: EmailService::new(ses, pool.clone(), config.clone()),
            rate_limiter: RateLimiter::new(),
            pool,
            config,
        }
    }
}
