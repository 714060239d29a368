mod config;
mod repos;
mod services;
mod system;

pub use config::Config;
pub use repos::{ClaimOutcome, IDispatchRecordRepo, IGuildGroupRepo, IReminderRepo, Repos};
pub use services::*;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
pub use system::{ISys, RealSys, StaticSys};

#[derive(Clone)]
pub struct WardenContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub game_data: Arc<dyn IGameDataClient>,
    pub messenger: Arc<dyn IMessenger>,
    pub cycle_cache: Arc<CycleCache>,
}

struct ContextParams {
    pub postgres_connection_string: String,
}

impl WardenContext {
    pub fn new(
        repos: Repos,
        config: Config,
        sys: Arc<dyn ISys>,
        game_data: Arc<dyn IGameDataClient>,
        messenger: Arc<dyn IMessenger>,
    ) -> Self {
        let cycle_cache = Arc::new(CycleCache::new(config.cycle_cache_ttl_millis));
        Self {
            repos,
            config,
            sys,
            game_data,
            messenger,
            cycle_cache,
        }
    }

    async fn create(params: ContextParams) -> Self {
        let repos = Repos::create_postgres(&params.postgres_connection_string)
            .await
            .expect("Postgres credentials must be set and valid");
        let config = Config::new();
        let game_data = Arc::new(GameApiClient::new(
            config.game_api_base_url.clone(),
            config.game_api_token.clone(),
        ));
        let messenger = Arc::new(WebhookMessenger::new(
            config.messenger_base_url.clone(),
            config.messenger_webhook_key.clone(),
        ));
        Self::new(repos, config, Arc::new(RealSys {}), game_data, messenger)
    }
}

/// Will setup the infrastructure context given the environment
pub async fn setup_context() -> WardenContext {
    WardenContext::create(ContextParams {
        postgres_connection_string: get_psql_connection_string(),
    })
    .await
}

/// Context backed by in-process repositories and service stand-ins. Used by
/// engine tests and local development without a database.
pub fn setup_context_inmemory() -> WardenContext {
    WardenContext::new(
        Repos::create_inmemory(),
        Config::new(),
        Arc::new(RealSys {}),
        Arc::new(InMemoryGameDataClient::new()),
        Arc::new(InMemoryMessenger::new()),
    )
}

fn get_psql_connection_string() -> String {
    const PSQL_CONNECTION_STRING: &str = "DATABASE_URL";

    std::env::var(PSQL_CONNECTION_STRING)
        .unwrap_or_else(|_| panic!("{} env var to be present.", PSQL_CONNECTION_STRING))
}

pub async fn run_migration() -> Result<(), MigrateError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&get_psql_connection_string())
        .await
        .expect("TO CONNECT TO POSTGRES");

    sqlx::migrate!().run(&pool).await
}
