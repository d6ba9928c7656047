use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use lifecycle_api::app::build_router;
use lifecycle_api::config;
use lifecycle_api::services::account_service::{AccountService, RegisterInput};
use lifecycle_api::services::catalog_service::CatalogService;
use lifecycle_api::state::AppState;
use lifecycle_api::store::memory::MemoryStore;
use lifecycle_api::store::postgres::PgStore;
use lifecycle_api::store::models::TechnologyDraft;
use lifecycle_api::store::Store;

#[derive(Parser)]
#[command(name = "lifecycle-api", about = "Technology lifecycle catalog API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Create the first admin account and its organization
    InitAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        organization: Option<String>,
    },
    /// Bulk-load technologies from a JSON file into a tenant
    Import {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        tenant_key: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(port).await,
        Command::InitAdmin {
            email,
            password,
            name,
            organization,
        } => init_admin(email, password, name, organization).await,
        Command::Import { file, tenant_key } => import(file, tenant_key).await,
    }
}

async fn build_store() -> anyhow::Result<Arc<dyn Store>> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PgStore::connect(&url).await.context("database connection")?;
            store.init_schema().await.context("schema migration")?;
            info!("connected to postgres");
            Ok(Arc::new(store))
        }
        Err(_) => {
            warn!("DATABASE_URL not set, falling back to the in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let cfg = config::config();
    info!(environment = ?cfg.environment, "starting lifecycle-api");

    let store = build_store().await?;
    let app = build_router(AppState::new(store));

    let port = port.unwrap_or(cfg.server.port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!("listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server")
}

async fn init_admin(
    email: String,
    password: String,
    name: String,
    organization: Option<String>,
) -> anyhow::Result<()> {
    let store = build_store().await?;

    if store.find_user_by_email(&email.to_lowercase()).await?.is_some() {
        println!("Account {email} already exists, nothing to do");
        return Ok(());
    }

    let service = AccountService::new(store);
    let outcome = service
        .register(RegisterInput {
            email,
            password,
            name,
            tenant_key: None,
            organization_name: organization,
        })
        .await
        .map_err(|e| anyhow::anyhow!("{}", e.message()))?;

    println!(
        "Created admin {} in organization '{}' (join key: {})",
        outcome.user.email, outcome.tenant.name, outcome.tenant.tenant_key
    );
    Ok(())
}

async fn import(file: PathBuf, tenant_key: String) -> anyhow::Result<()> {
    let store = build_store().await?;

    let tenant = store
        .find_tenant_by_key(&tenant_key)
        .await?
        .context("no tenant with that key")?;

    let raw = std::fs::read_to_string(&file)
        .with_context(|| format!("reading {}", file.display()))?;
    let drafts: Vec<TechnologyDraft> = serde_json::from_str(&raw).context("parsing import file")?;

    let catalog = CatalogService::new(store);
    let mut imported = 0usize;
    let mut skipped = 0usize;
    for draft in drafts {
        let name = draft.name.clone();
        match catalog.create(draft, tenant.id, None).await {
            Ok(_) => imported += 1,
            Err(e) => {
                warn!(technology = %name, error = %e.message(), "skipping record");
                skipped += 1;
            }
        }
    }

    println!(
        "Imported {imported} technologies into '{}' ({skipped} skipped)",
        tenant.name
    );
    Ok(())
}
