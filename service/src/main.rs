use std::path::{Path, PathBuf};

use abi::Config;
use anyhow::{anyhow, Result};
use reservation_service::start_server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let filename = match std::env::var("RESERVATION_CONFIG") {
        Ok(filename) => PathBuf::from(filename),
        Err(_) => config_path().ok_or_else(|| anyhow!("config file not found"))?,
    };
    let mut config = Config::load(&filename)?;
    if let Ok(topic) = std::env::var("RESERVATION_ALERT_TOPIC") {
        config.notifier.topic = Some(topic);
    }

    start_server(&config).await
}

fn config_path() -> Option<PathBuf> {
    let home = shellexpand::tilde("~/.config/reservation.yml");
    let found = [
        Path::new("./reservation.yml"),
        Path::new(home.as_ref()),
        Path::new("/etc/reservation.yml"),
    ]
    .into_iter()
    .find(|p| p.exists())
    .map(Path::to_path_buf);
    found
}
