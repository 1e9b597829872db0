//! `rentroute config generate`
//!
//! 写出一份带默认值的 TOML 配置，`-` 表示输出到 stdout。

use std::io::{self, BufRead, Write};
use std::path::Path;

use colored::Colorize;

use crate::config::StaticConfig;
use crate::interfaces::cli::CliError;

const DEFAULT_OUTPUT: &str = "config.example.toml";

pub async fn config_generate(output_path: Option<String>, force: bool) -> Result<(), CliError> {
    let path = output_path.unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    let sample = StaticConfig::generate_sample_config();

    if path == "-" {
        print!("{}", sample);
        return Ok(());
    }

    if !force && Path::new(&path).exists() && !confirm_overwrite(&path)? {
        println!("{}", "Aborted.".red());
        return Ok(());
    }

    write_sample(&path, &sample)?;
    println!("{} {}", "Wrote sample configuration to".green(), path.blue());
    println!(
        "  {}",
        "Copy it to config.toml, or override single keys with RR__SECTION__KEY".dimmed()
    );
    Ok(())
}

fn confirm_overwrite(path: &str) -> Result<bool, CliError> {
    print!(
        "{} {} {}",
        "File already exists:".yellow(),
        path.blue(),
        "Overwrite? [y/N] ".yellow()
    );
    io::stdout()
        .flush()
        .map_err(|e| CliError::CommandError(e.to_string()))?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .map_err(|e| CliError::CommandError(e.to_string()))?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn write_sample(path: &str, sample: &str) -> Result<(), CliError> {
    let target = Path::new(path);
    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            CliError::CommandError(format!("Unable to create {}: {}", parent.display(), e))
        })?;
    }
    std::fs::write(target, sample)
        .map_err(|e| CliError::CommandError(format!("Unable to write {}: {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_into_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf/rentroute.toml");
        let path_str = path.to_string_lossy().into_owned();

        config_generate(Some(path_str.clone()), true).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: StaticConfig = toml::from_str(&written).unwrap();
        assert_eq!(parsed.partners.default_new_tab, "skyscanner");

        // --force 时直接覆盖
        std::fs::write(&path, "garbage").unwrap();
        config_generate(Some(path_str), true).await.unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[pipeline]"));
    }
}
