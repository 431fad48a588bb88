use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use okra_core::{init_logging, open_db};
use okra_server::{build_router, AppState, Args};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level(), args.log_dir.as_deref()).map_err(anyhow::Error::msg)?;

    let conn = open_db(&args.database)
        .with_context(|| format!("failed to open database `{}`", args.database.display()))?;
    let app = build_router(AppState::new(conn, args.session_ttl()));

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!(
        "event=server_start module=http status=ok listen={} database={}",
        args.listen,
        args.database.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("event=server_stop module=http status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("event=signal_listen module=http status=error error={err}");
    }
}
