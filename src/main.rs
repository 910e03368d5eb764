use clap::Parser;
use stream_proxy::config::Config;
use stream_proxy::server::run_server;
use stream_proxy::utils::error::ProxyError;
use stream_proxy::utils::Logger;

#[tokio::main]
async fn main() -> Result<(), ProxyError> {
    let config = Config::parse();
    Logger::init(&config.log_level, config.log_json);

    run_server(config).await
}
