//! Mode routing
//!
//! - Server mode (HTTP server)
//! - CLI mode (one-off commands against the same services)

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "server")]
pub use server::run_server;

use crate::cli::{Cli, Commands};

/// Mode detection result
#[derive(Debug, PartialEq)]
pub enum Mode {
    #[cfg(feature = "server")]
    Server { use_memory: bool },
    #[cfg(feature = "cli")]
    Cli,
    Unknown,
}

/// 根据解析后的命令行选择运行模式
///
/// 1. 没有子命令或 `serve` -> Server
/// 2. 其他子命令且启用 CLI -> Cli
/// 3. 否则 -> Unknown
pub fn detect_mode(cli: &Cli) -> Mode {
    match &cli.command {
        #[cfg(feature = "server")]
        None => Mode::Server { use_memory: false },
        #[cfg(feature = "server")]
        Some(Commands::Serve { memory }) => Mode::Server {
            use_memory: *memory,
        },
        #[cfg(feature = "cli")]
        Some(_) => Mode::Cli,
        #[allow(unreachable_patterns)]
        _ => Mode::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_detect_mode() {
        let cli = Cli::parse_from(["rentroute"]);
        assert_eq!(detect_mode(&cli), Mode::Server { use_memory: false });

        let cli = Cli::parse_from(["rentroute", "serve", "--memory"]);
        assert_eq!(detect_mode(&cli), Mode::Server { use_memory: true });

        let cli = Cli::parse_from(["rentroute", "config", "generate"]);
        assert_eq!(detect_mode(&cli), Mode::Cli);
    }
}
