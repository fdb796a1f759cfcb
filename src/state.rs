use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, CatalogService, LogMailer, Mailer, ReviewService, SeaOrmAccountServiceImpl,
    SeaOrmCatalogServiceImpl, SeaOrmReviewServiceImpl, TokenIssuer,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub accounts: Arc<dyn AccountService>,

    pub catalog: Arc<dyn CatalogService>,

    pub reviews: Arc<dyn ReviewService>,

    pub mailer: Arc<dyn Mailer>,

    pub tokens: TokenIssuer,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::init_with_mailer(config, Arc::new(LogMailer)).await
    }

    /// Same wiring with a caller-supplied mailer. The integration tests use
    /// this to capture outgoing confirmation codes.
    pub async fn with_mailer(config: Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        Self::init_with_mailer(config, mailer).await
    }

    async fn init_with_mailer(config: Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let tokens = TokenIssuer::new(&config.auth);
        let code_length = config.auth.confirmation_code_length;
        let config_arc = Arc::new(RwLock::new(config));

        let accounts = Arc::new(SeaOrmAccountServiceImpl::new(
            store.clone(),
            mailer.clone(),
            tokens.clone(),
            code_length,
        )) as Arc<dyn AccountService>;

        let catalog =
            Arc::new(SeaOrmCatalogServiceImpl::new(store.clone())) as Arc<dyn CatalogService>;

        let reviews =
            Arc::new(SeaOrmReviewServiceImpl::new(store.clone())) as Arc<dyn ReviewService>;

        Ok(Self {
            config: config_arc,
            store,
            accounts,
            catalog,
            reviews,
            mailer,
            tokens,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
