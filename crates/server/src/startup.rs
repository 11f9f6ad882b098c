use std::{env, net::SocketAddr};

use axum::Router;
use common::utils::logging::init_logging_default;
use dotenvy::dotenv;
use tracing::{info, warn};

use crate::gateway;
use crate::routes::{self, auth};

/// Public entry: load configuration, attach the store, build the app and
/// serve until the process is terminated.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging_default();

    let cfg = configs::AppConfig::load_and_validate()?;

    // Lazily-connecting handle; only a malformed URI fails here.
    let db = models::db::connect(&cfg.database).await?;

    // Reachability is probed as an explicit branch. An offline store is
    // non-fatal at this layer: the listener starts anyway and handlers that
    // need the store answer 500 until it comes back.
    match models::db::ping(&db).await {
        Ok(()) => {
            info!(database = models::db::DB_NAME, "connected to MongoDB");
            if let Err(e) = models::db::ensure_indexes(&db).await {
                warn!(error = %e, "failed to ensure indexes");
            }
        }
        Err(e) => {
            warn!(error = %e, "MongoDB connection failed; make sure MongoDB is running");
        }
    }

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".to_string());
    let state = auth::ServerState {
        db,
        auth: auth::ServerAuthConfig { jwt_secret },
        env: cfg.env,
    };

    let cors = gateway::build_cors(&cfg.cors.allowed_origins);
    let app: Router = routes::build_router(cors, state);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, mode = ?cfg.env, "starting task manager server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
