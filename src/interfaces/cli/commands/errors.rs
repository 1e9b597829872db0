//! `rentroute errors`：最近错误日志统计

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::reporting::ErrorReporter;
use crate::storage::StorageFactory;

pub async fn show_error_stats(days: i64) -> Result<(), CliError> {
    if days <= 0 {
        return Err(CliError::ParseError("--days must be positive".to_string()));
    }

    let store = StorageFactory::create()
        .await
        .map_err(|e| CliError::StorageError(e.to_string()))?;
    let config = crate::config::get_config();
    let reporter = ErrorReporter::new(store, &config.reporting);

    let stats = reporter.error_stats(days).await?;

    println!(
        "{} {} (last {} days)",
        "Error logs:".bold(),
        stats.total.to_string().cyan(),
        days
    );
    for (title, map) in [
        ("By type", &stats.by_type),
        ("By severity", &stats.by_severity),
        ("By resolved", &stats.by_resolved),
    ] {
        if map.is_empty() {
            continue;
        }
        println!("  {}", title.yellow());
        for (key, count) in map {
            println!("    {:<20} {}", key, count);
        }
    }

    if !stats.recent.is_empty() {
        println!("  {}", "Recent".yellow());
        for entry in &stats.recent {
            println!(
                "    {} [{}] {}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                entry.severity,
                entry.message
            );
        }
    }
    Ok(())
}
