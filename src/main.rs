//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here; membership rules live in MembershipService.

use club_directory::adapters::codes::RandomCodeGenerator;
use club_directory::adapters::firestore::FirestoreGroupStore;
use club_directory::adapters::persistence::{MemoryGroupStore, SqliteGroupStore};
use club_directory::adapters::ui::tui::TuiInputPort;
use club_directory::ports::{CodeGenerator, GroupStore, InputPort};
use club_directory::shared::{AppConfig, StoreBackend};
use club_directory::usecases::MembershipService;
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    club_directory::adapters::ui::init_ui();

    let cfg = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, "config could not be loaded; using defaults");
            AppConfig::default()
        }
    };

    let store = build_store(&cfg).await?;
    let codes: Arc<dyn CodeGenerator> = Arc::new(RandomCodeGenerator::new());

    let max_code_attempts = cfg.max_code_attempts_or_default();
    info!(max_code_attempts, "join code retry budget");
    let service = Arc::new(MembershipService::new(
        store,
        codes,
        max_code_attempts,
        cfg.share_base_url_or_default(),
    ));

    let export_dir = cfg.export_dir_or_default();
    let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(service, export_dir));

    // --- Run (main menu -> Create / Join / Rename / List / Watch / Export) ---
    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}

/// Pick the entity store from CLUBDIR_BACKEND.
async fn build_store(cfg: &AppConfig) -> anyhow::Result<Arc<dyn GroupStore>> {
    let backend = cfg.backend().map_err(|e| anyhow::anyhow!("{}", e))?;
    let store: Arc<dyn GroupStore> = match backend {
        StoreBackend::Memory => {
            warn!("memory backend: groups are lost on exit");
            Arc::new(MemoryGroupStore::new())
        }
        StoreBackend::Sqlite => {
            let data_dir = cfg.data_dir_or_default();
            let data_dir_abs = data_dir.canonicalize().unwrap_or_else(|_| data_dir.clone());
            info!(path = %data_dir_abs.display(), "data directory");
            Arc::new(
                SqliteGroupStore::connect(&data_dir)
                    .await
                    .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?,
            )
        }
        StoreBackend::Firestore => {
            let settings = cfg
                .firestore_settings()
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            if settings.api_key.is_none() && settings.auth_token.is_none() {
                warn!("no Firestore API key or auth token; requests rely on open security rules");
            }
            Arc::new(FirestoreGroupStore::new(settings))
        }
    };
    Ok(store)
}
