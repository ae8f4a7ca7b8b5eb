use anyhow::Context;
use clap::Parser;
use gallerist_server::{
    infra::{
        app_context::AppContext,
        app_state::AppState,
        config::{Config, ServeArgs, load_env_file},
        startup::{bind_listener, init_tracing, shutdown_signal},
    },
    routes,
};
use tracing::info;

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "gallerist-server")]
#[command(about = "Local media catalog server with paged galleries and byte-range streaming")]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_file_loaded = load_env_file();
    let cli = Cli::parse();
    let config =
        Config::load(cli.serve, env_file_loaded).context("invalid configuration")?;

    init_tracing();
    if config.env_file_loaded {
        info!("loaded .env file");
    }
    info!(
        page_size = config.page_size,
        result_order = %config.result_order,
        media_root = ?config.media_root,
        "starting gallerist"
    );

    let context = AppContext::new(config);
    info!(
        cache_capacity = context.cache().capacity(),
        probe_workers = context.pool().width(),
        "catalog ready"
    );
    let listener = bind_listener(&context).await?;
    let app = routes::create_app(AppState::new(context));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}
