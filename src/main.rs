use log::{error, info};
use nf_dump::configuration::Config;
use nf_dump::controller::Controller;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();

    let config = match Config::from_args() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let controller = match Controller::new(config) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Unable to create a controller instance: {}, exiting...", e);
            std::process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match controller.run(shutdown).await {
        Ok(stats) => info!(
            "Stopped: {} datagrams ({} bytes), {} routed, {} decode errors, {} read errors, {} sessions evicted",
            stats.datagrams,
            stats.bytes,
            stats.routed,
            stats.decode_errors,
            stats.read_errors,
            stats.evicted
        ),
        Err(e) => {
            error!("Error occured in the controller process: {}, exiting...", e);
            std::process::exit(1);
        }
    }
}
