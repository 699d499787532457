//! Application state for loyalty-cloud

use std::sync::Arc;

use aws_sdk_sesv2::Client as SesClient;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::auth::rate_limit::RateLimiter;
use crate::config::Config;
use crate::error::BoxError;
use crate::wallet::apple::AppleWallet;
use crate::wallet::google::GoogleWallet;
use crate::wallet::push::ApnsClient;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    pub config: Arc<Config>,
    /// AWS SES client for sending emails
    pub ses: SesClient,
    /// Rate limiter for login/registration routes
    pub rate_limiter: RateLimiter,
    /// Apple Wallet signing, `None` when not configured
    pub apple: Option<Arc<AppleWallet>>,
    /// APNs pushes for Apple passes
    pub apns: Option<Arc<ApnsClient>>,
    /// Google Wallet issuer, `None` when not configured
    pub google: Option<Arc<GoogleWallet>>,
}

impl AppState {
    /// Create a new AppState
    pub async fn new(config: Config) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(&config.database_url)
            .await?;

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

        let apple = match &config.apple {
            Some(apple_config) => match AppleWallet::load(
                apple_config,
                &config.shop_name,
                config.passkit_web_service_url(),
            ) {
                Ok(wallet) => {
                    tracing::info!(
                        pass_type = %apple_config.pass_type_identifier,
                        "Apple Wallet passes enabled"
                    );
                    Some(Arc::new(wallet))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Apple Wallet disabled: signing material unusable");
                    None
                }
            },
            None => {
                tracing::warn!("Apple Wallet not configured");
                None
            }
        };

        let apns = match (&config.apns, &apple) {
            (Some(apns_config), Some(_)) => match ApnsClient::load(apns_config) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    tracing::warn!(error = %e, "APNs disabled: key unusable");
                    None
                }
            },
            _ => None,
        };

        let google = match &config.google {
            Some(google_config) => {
                match GoogleWallet::load(google_config, &config.shop_name, &config.app_base_url) {
                    Ok(wallet) => {
                        tracing::info!("Google Wallet passes enabled");
                        Some(Arc::new(wallet))
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Google Wallet disabled: service account unusable");
                        None
                    }
                }
            }
            None => {
                tracing::warn!("Google Wallet not configured");
                None
            }
        };

        Ok(Self {
            pool,
            config: Arc::new(config),
            ses,
            rate_limiter: RateLimiter::new(),
            apple,
            apns,
            google,
        })
    }
}

#[cfg(test)]
impl AppState {
    /// State for router tests: the pool never connects unless a handler
    /// reaches the database, and SES is never called.
    pub fn for_tests(config: Config) -> Self {
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let ses_config = aws_sdk_sesv2::Config::builder()
            .behavior_version(aws_sdk_sesv2::config::BehaviorVersion::latest())
            .region(aws_sdk_sesv2::config::Region::new("us-east-1"))
            .build();
        Self {
            pool,
            config: Arc::new(config),
            ses: SesClient::from_conf(ses_config),
            rate_limiter: RateLimiter::new(),
            apple: None,
            apns: None,
            google: None,
        }
    }
}
