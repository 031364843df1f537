use redis_clone::command::apply_replayed;
use redis_clone::config::Config;
use redis_clone::engine::Engine;
use redis_clone::persistence::aof::AofManager;
use redis_clone::server;
use redis_clone::store::Keyspace;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = Config::load(&args);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.loglevel)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut keyspace = Keyspace::new();
    match AofManager::replay(&config.aof_file, |cmd, args| {
        apply_replayed(&mut keyspace, &cmd, &args);
    }) {
        Ok((count, truncated)) => info!(
            "replayed {count} commands from {} (tail truncated: {truncated})",
            config.aof_file
        ),
        Err(e) => tracing::warn!("failed to replay aof: {e}"),
    }

    let aof = AofManager::new(&config.aof_file, config.fsync_policy);
    aof.start().await?;

    let engine = Engine::new(Arc::new(RwLock::new(keyspace)), aof);

    server::run_server(engine, &config).await
}
