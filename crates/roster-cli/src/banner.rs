use std::path::Path;

use roster_config::AppConfig;

/// Print the startup banner with a config summary.
pub fn print_banner(config: &AppConfig, config_path: Option<&Path>) {
    for line in banner_lines(config, config_path) {
        println!("{line}");
    }
}

fn banner_lines(config: &AppConfig, config_path: Option<&Path>) -> Vec<String> {
    let version = env!("CARGO_PKG_VERSION");

    let url = format!("http://{}", config.server.addr());
    let config_source = config_path
        .map(|p| display_path(p))
        .unwrap_or_else(|| "defaults + environment".to_string());

    // Layout
    let width = 64;
    let inner = width - 4; // "│ " + " │"

    let title = format!("Roster v{version}");
    let title_dashes = width - 2 - title.len() - 5; // 2 for ╭╮, 5 for "─── " + " "
    let top = format!("╭─── {title} {}╮", "─".repeat(title_dashes));
    let bottom = format!("╰{}╯", "─".repeat(width - 2));

    let row = |s: &str| format!("│ {:<inner$} │", fit(s, inner));

    vec![
        top,
        row(""),
        row(&format!("Gateway      {url}")),
        row(&format!(
            "Database     {}",
            display_path(&config.database.path)
        )),
        row(&format!(
            "Migrations   {}",
            display_path(&config.database.migrations_dir)
        )),
        row(&format!("Config       {config_source}")),
        row(""),
        row("Press Ctrl+C to stop"),
        bottom,
    ]
}

/// Shorten `s` to `width` chars, keeping the tail since that is where a
/// path's file name lives.
fn fit(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len <= width {
        return s.to_string();
    }
    let tail: String = s.chars().skip(len - width + 1).collect();
    format!("…{tail}")
}

fn display_path(path: &Path) -> String {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => path.to_string_lossy().replace(&home, "~"),
        _ => path.to_string_lossy().to_string(),
    }
}
