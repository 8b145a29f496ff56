//! WebPics - a tag-filtered photo gallery.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webpics::{
    config::{Cli, Command, MigrateConfig, ServeConfig},
    gallery::{migrate_scalar_tags, AccountService, GalleryService, TagVocabulary},
    server::{create_router, AppState, RouterConfig, SessionSigner},
    store::{create_s3_client, FirebaseIdentity, FirestoreStore, S3BlobStore},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(config) => run_serve(config).await,
        Command::MigrateTags(config) => run_migrate(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let vocabulary = match TagVocabulary::load(&config.tags_file) {
        Ok(vocabulary) => vocabulary,
        Err(e) => {
            error!("Failed to load tags: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if vocabulary.is_empty() {
        warn!(
            "Tag file {} is empty; uploads will only accept untagged photos",
            config.tags_file.display()
        );
    }

    let public_base_url = config.public_base_url();

    info!("Configuration:");
    info!("  S3 bucket: {}", config.bucket());
    if let Some(ref endpoint) = config.s3_endpoint {
        info!("  S3 endpoint: {}", endpoint);
    }
    info!("  S3 region: {}", config.s3_region);
    info!("  Public URL: {}", public_base_url);
    info!("  Firestore project: {}", config.firestore.project());
    info!("  Tags: {} from {}", vocabulary.len(), config.tags_file.display());
    info!("  Page size: {}", config.page_size);
    if !config.secure_cookies {
        warn!("  Session cookies are not marked Secure; enable --secure-cookies behind HTTPS");
    }

    let s3_client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;
    let blobs = S3BlobStore::new(s3_client, config.bucket().to_string(), public_base_url);

    let store = match FirestoreStore::new(config.firestore.store_config()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to create document store client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let identity = match FirebaseIdentity::new(
        config.identity_endpoint.clone(),
        config.firebase_api_key_or_empty(),
        config.firestore.timeout(),
    ) {
        Ok(identity) => identity,
        Err(e) => {
            error!("Failed to create identity client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let gallery = GalleryService::new(store.clone(), Arc::new(blobs), Arc::new(vocabulary))
        .with_page_size(config.page_size)
        .with_key_prefix(config.s3_prefix.clone());
    let accounts =
        AccountService::new(Arc::new(identity), store).with_admin_role(config.admin_role.clone());
    let sessions = SessionSigner::new(config.session_secret_or_empty(), config.session_ttl())
        .with_secure_cookies(config.secure_cookies);

    let mut state = AppState::new(gallery, accounts, sessions);
    if let Some(offset) = config.display_offset() {
        state = state.with_display_offset(offset);
    }

    let router = create_router(state, build_router_config(&config));

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "webpics=debug,tower_http=debug"
    } else {
        "webpics=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_tracing(!config.no_tracing)
        .with_max_upload_bytes(config.max_upload_bytes);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    if let Some(ref dir) = config.static_dir {
        router_config = router_config.with_static_dir(dir.clone());
    }

    router_config
}

// =============================================================================
// Migrate Command
// =============================================================================

async fn run_migrate(config: MigrateConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let store = match FirestoreStore::new(config.firestore.store_config()) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to create document store client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = match migrate_scalar_tags(&store, config.dry_run).await {
        Ok(report) => report,
        Err(e) => {
            error!("Migration failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for rewrite in &report.rewrites {
        println!("{}: {:?} -> {:?}", rewrite.id, rewrite.before, rewrite.after);
    }

    if report.dry_run {
        println!(
            "{} record(s) with scalar tags found (dry run, nothing written)",
            report.rewrites.len()
        );
    } else {
        println!("{} record(s) updated", report.updated());
    }

    ExitCode::SUCCESS
}
