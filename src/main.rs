use harbor_lens::config::Config;

/// Entry point for the Harbor Lens container monitor.
///
/// Reads the configuration from the environment, installs the logger and serves container
/// reports over HTTP.
///
/// # Examples
///
/// ```bash
/// HOST_HOSTNAME=192.168.1.20 VERBOSE=1 cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let default_level = if config.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    harbor_lens::run(config).await
}
