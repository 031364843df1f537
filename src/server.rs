use crate::command;
use crate::config::Config;
use crate::engine::Engine;
use crate::resp::{Parser, Value};
use bytes::BytesMut;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Accept connections until a shutdown signal arrives, then let
/// in-flight commands finish before stopping the AOF manager.
pub async fn run_server(engine: Engine, config: &Config) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("redis-clone listening on {addr}");

    let admission = Arc::new(Semaphore::new(config.max_clients));
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = result?;
                let engine = engine.clone();
                let admission = admission.clone();

                connections.spawn(async move {
                    let _permit = match admission.acquire_owned().await {
                        Ok(p) => p,
                        Err(_) => return,
                    };
                    debug!("connection opened: {peer_addr}");
                    if let Err(e) = handle_connection(stream, engine).await {
                        debug!("connection error from {peer_addr}: {e}");
                    }
                    debug!("connection closed: {peer_addr}");
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received, no longer accepting connections");
                break;
            }
        }
    }

    info!("waiting for {} in-flight connection(s) to finish", connections.len());
    while connections.join_next().await.is_some() {}

    engine.aof.stop().await;
    info!("aof closed, exiting");
    Ok(())
}

async fn handle_connection(mut stream: TcpStream, engine: Engine) -> std::io::Result<()> {
    let mut buf = BytesMut::with_capacity(4096);

    loop {
        loop {
            match Parser::parse(&mut buf) {
                Ok(Some(value)) => {
                    let reply = process_request(value, &engine).await;
                    stream.write_all(&reply.serialize()).await?;
                }
                Ok(None) => break,
                Err(e) => {
                    let err = Value::error(format!("ERR protocol error: {e}"));
                    stream.write_all(&err.serialize()).await?;
                    return Ok(());
                }
            }
        }

        match stream.read_buf(&mut buf).await {
            Ok(0) => return Ok(()),
            Ok(_) => {}
            Err(e) => {
                warn!("read error: {e}");
                return Err(e);
            }
        }
    }
}

async fn process_request(value: Value, engine: &Engine) -> Value {
    let items = match value {
        Value::Array(Some(items)) if !items.is_empty() => items,
        _ => return Value::error("ERR invalid request, expected a non-empty array"),
    };

    let cmd_name = match items[0].to_string_lossy() {
        Some(name) => name.to_uppercase(),
        None => return Value::error("ERR invalid command name"),
    };

    command::dispatch(&cmd_name, &items[1..], engine).await
}
