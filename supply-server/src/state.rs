//! Application state shared by every handler

use std::sync::Arc;

use aws_sdk_sesv2::Client as SesClient;

use crate::auth::{JwtConfig, JwtService};
use crate::config::{Config, EmailBackend, StoreBackend};
use crate::db::Database;
use crate::db::memory::MemoryStore;
use crate::db::pg::PgStore;
use crate::email::{LogNotifier, Notifier, SesNotifier};
use crate::seed;
use crate::services::{AccountService, CatalogService, CredentialService, OrderService};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub jwt: Arc<JwtService>,
    pub credentials: CredentialService,
    pub orders: OrderService,
    pub catalog: CatalogService,
    pub accounts: AccountService,
    pub config: Arc<Config>,
}

impl AppState {
    /// Connect the configured store and mail backend
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let db: Arc<dyn Database> = match &config.store {
            StoreBackend::Postgres(url) => {
                let store = PgStore::connect(url).await?;
                tracing::info!("PostgreSQL store ready");
                Arc::new(store)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store, data is lost on exit");
                Arc::new(MemoryStore::new())
            }
        };

        let notifier: Arc<dyn Notifier> = match config.email_backend {
            EmailBackend::Ses => {
                let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
                let ses = match &config.ses_region {
                    Some(region) => {
                        let ses_config = aws_config
                            .to_builder()
                            .region(aws_config::Region::new(region.clone()))
                            .build();
                        SesClient::new(&ses_config)
                    }
                    None => SesClient::new(&aws_config),
                };
                Arc::new(SesNotifier::new(ses, config.ses_from_email.clone()))
            }
            EmailBackend::Log => Arc::new(LogNotifier),
        };

        if config.seed_demo_data {
            seed::seed_demo_data(db.as_ref()).await?;
        }

        Ok(Self::with_parts(db, notifier, config.clone()))
    }

    /// Assemble state from already built parts
    pub fn with_parts(db: Arc<dyn Database>, notifier: Arc<dyn Notifier>, config: Config) -> Self {
        let jwt = Arc::new(JwtService::new(JwtConfig::from(&config)));
        Self {
            credentials: CredentialService::new(db.clone(), jwt.clone(), notifier)
                .allow_admin_registration(config.allow_admin_registration),
            orders: OrderService::new(db.clone()),
            catalog: CatalogService::new(db.clone()),
            accounts: AccountService::new(db.clone()),
            db,
            jwt,
            config: Arc::new(config),
        }
    }
}
