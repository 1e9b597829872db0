use clap::Parser;

use rentroute::cli::Cli;
use rentroute::runtime::modes::{Mode, detect_mode};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.config.as_deref() {
        Some(path) => rentroute::config::init_config_from(path),
        None => rentroute::config::init_config(),
    }
    let config = rentroute::config::get_config();

    match detect_mode(&cli) {
        Mode::Server { use_memory } => {
            // 必须持有 guard 直到进程退出，否则非阻塞日志会丢失
            let _guard = rentroute::system::init_logging(&config.logging);
            rentroute::runtime::modes::run_server(use_memory).await
        }
        Mode::Cli => {
            let Some(command) = cli.command else {
                return Ok(());
            };
            if let Err(e) = rentroute::interfaces::cli::run_cli_command(command).await {
                eprintln!("{}", e.format_colored());
                std::process::exit(1);
            }
            Ok(())
        }
        Mode::Unknown => {
            eprintln!("No execution mode available, rebuild with the `server` feature");
            std::process::exit(1);
        }
    }
}
