use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use bidbox::api::{self, ApiContext};
use bidbox::config::{self, Config, StorageMode};
use bidbox::db::sqlite::open_database;
use bidbox::pipeline::extraction::{GeminiClient, GeminiExtractor};
use bidbox::pipeline::queue::spawn_pending_scan;
use bidbox::pipeline::{ExtractionQueue, Pipeline};
use bidbox::storage::{BlobStore, HttpBlobStore, LocalBlobStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            std::process::exit(1);
        }
    };

    if let Some(parent) = config.db_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!(path = %parent.display(), error = %e, "Cannot create data directory");
            std::process::exit(1);
        }
    }

    // Run migrations up front so workers and handlers open a ready schema.
    if let Err(e) = open_database(&config.db_path) {
        tracing::error!(path = %config.db_path.display(), error = %e, "Database initialization failed");
        std::process::exit(1);
    }

    let blob: Arc<dyn BlobStore> = match &config.storage {
        StorageMode::Local { root } => {
            tracing::info!(root = %root.display(), "Using local blob storage");
            Arc::new(LocalBlobStore::new(root.clone()))
        }
        StorageMode::Http {
            base_url,
            bucket,
            api_key,
        } => {
            tracing::info!(base_url, bucket, "Using hosted blob storage");
            Arc::new(HttpBlobStore::new(base_url, bucket, api_key))
        }
    };

    let client = GeminiClient::new(&config.gemini_base_url, &config.gemini_api_key);
    let model = Arc::new(GeminiExtractor::new(
        client,
        config.gemini_model.clone(),
        config.poll_interval,
        config.poll_deadline,
    ));
    tracing::info!(model = %config.gemini_model, "Extraction model configured");

    let pipeline = Arc::new(Pipeline::new(&config.db_path, blob.clone(), model));
    let queue = Arc::new(ExtractionQueue::start(
        pipeline.clone(),
        config.queue.clone(),
    ));
    let scan = spawn_pending_scan(
        queue.clone(),
        config.db_path.clone(),
        config.scan_interval,
    );

    let ctx = ApiContext {
        db_path: config.db_path.clone(),
        blob,
        pipeline,
        queue,
    };

    if let Err(e) = api::server::serve(ctx, config.bind_addr).await {
        tracing::error!(error = %e, "API server error");
    }
    scan.abort();
}
