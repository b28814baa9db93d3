use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, Command};
use fern::colors::{Color, ColoredLevelConfig};
use tokio::net::TcpListener;
use tokio::signal;

use strait::{server, ObjectCache, MAX_CACHE_SIZE, MAX_OBJECT_SIZE};

fn cli() -> Command {
    Command::new("strait")
        .about("A concurrent caching web proxy")
        .arg(
            Arg::new("port")
                .help("TCP port to listen on")
                .required(true)
                .value_parser(value_parser!(u16)),
        )
}

fn init_logging() -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .debug(Color::Blue)
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let port = *matches.get_one::<u16>("port").expect("port is required");

    init_logging()?;

    let cache = Arc::new(ObjectCache::new(MAX_CACHE_SIZE, MAX_OBJECT_SIZE));

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    log::info!("strait proxy listening on 0.0.0.0:{port}");

    tokio::select! {
        _ = server::serve(listener, Arc::clone(&cache)) => {}
        _ = shutdown_signal() => {
            log::info!("shutdown signal received, stopping listener");
        }
    }

    // In-flight workers keep the cache alive through their Arc; draining
    // here only releases the entries.
    cache.clear();
    println!("cache drained, bye!");
    Ok(())
}
