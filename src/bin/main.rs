use aehttpd::{config::AppConfig, error::Result, server::Server};

fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.yaml".to_string());
    let config = AppConfig::load(std::path::Path::new(&config_path))?;

    config.display_config();

    let server = Server::new(config)?;
    server.run()
}
