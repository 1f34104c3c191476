use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use plugwright_core::config::Config;
use plugwright_core::{
    FetchOptions, InstallStatus, Platform, PlugwrightError, PluginManager, Result,
    UninstallReport,
};

mod args;
use args::{Cli, Commands, ConfigAction, FetchArgs, Shell};

const LOG_ENV: &str = "PLUGWRIGHT_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let project = cli.project.unwrap_or_else(|| PathBuf::from("."));
    let result = resolve_base_dir(cli.base_dir).and_then(|base_dir| {
        tracing::debug!(
            base_dir = %base_dir.display(),
            project = %project.display(),
            "resolved directories"
        );
        run(cli.command, &base_dir, &project)
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(command: Option<Commands>, base_dir: &Path, project: &Path) -> Result<()> {
    match command {
        Some(Commands::Install {
            plugin,
            platform,
            fetch,
        }) => handle_install(base_dir, project, &plugin, &platform, &fetch),
        Some(Commands::Uninstall { id, platform }) => {
            handle_uninstall(base_dir, project, &id, &platform)
        }
        Some(Commands::Fetch { plugin, fetch }) => handle_fetch(base_dir, project, &plugin, &fetch),
        Some(Commands::Prepare { platform }) => handle_prepare(base_dir, project, &platform),
        Some(Commands::List { platform }) => handle_list(base_dir, project, &platform),
        Some(Commands::Config { action }) => handle_config(action, base_dir),
        Some(Commands::Completions { shell }) => {
            handle_completions(shell);
            Ok(())
        }
        None => {
            Cli::command().print_help().ok();
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "plugwright=debug"
    } else if quiet {
        "plugwright=error"
    } else {
        "plugwright=info"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let shell = match shell {
        Shell::Bash => clap_complete::Shell::Bash,
        Shell::Zsh => clap_complete::Shell::Zsh,
        Shell::Fish => clap_complete::Shell::Fish,
        Shell::PowerShell => clap_complete::Shell::PowerShell,
        Shell::Elvish => clap_complete::Shell::Elvish,
    };
    generate(shell, &mut cmd, "plugwright", &mut io::stdout());
}

fn resolve_base_dir(cli_base: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(base) = cli_base {
        return Ok(base);
    }

    if let Ok(base) = std::env::var("PLUGWRIGHT_BASE") {
        return Ok(PathBuf::from(base));
    }

    Config::default_base_dir()
}

/// Config defaults overridden by command-line flags
fn build_fetch_options(config: &Config, args: &FetchArgs) -> FetchOptions {
    let mut options = config.fetch_options();
    options.link |= args.link;
    options.no_registry |= args.no_registry;
    // Command-line directories are scanned after (and so win over) configured ones
    options.search_path.extend(args.search_path.iter().cloned());
    options.expected_id = args.expect.clone();
    options
}

/// Manager whose local index covers configured and command-line search paths
fn build_manager(config: &Config, project: &Path, extra_search_path: &[PathBuf]) -> PluginManager {
    let mut config = config.clone();
    config
        .fetch
        .search_path
        .extend(extra_search_path.iter().cloned());
    PluginManager::from_config(project, &config)
}

fn handle_install(
    base_dir: &Path,
    project: &Path,
    plugin: &str,
    platform: &str,
    args: &FetchArgs,
) -> Result<()> {
    let platform: Platform = platform.parse()?;
    let config = Config::load(base_dir)?;
    let options = build_fetch_options(&config, args);
    let manager = build_manager(&config, project, &args.search_path);

    println!(
        "{} {} ({})",
        "Installing:".cyan().bold(),
        plugin,
        platform.name()
    );
    let outcome = manager.install(plugin, platform, &options)?;

    for id in &outcome.installed {
        println!("  {} {}", "+".green(), id);
    }
    for id in &outcome.skipped {
        println!("  {} {} (already installed)", "=".yellow(), id);
    }
    println!();
    println!(
        "{} {} installed, {} skipped",
        "Done:".green().bold(),
        outcome.installed.len(),
        outcome.skipped.len()
    );
    Ok(())
}

fn handle_uninstall(base_dir: &Path, project: &Path, id: &str, platform: &str) -> Result<()> {
    let platform: Platform = platform.parse()?;
    let config = Config::load(base_dir)?;
    let manager = build_manager(&config, project, &[]);

    println!("{} {} ({})", "Uninstalling:".cyan().bold(), id, platform.name());
    let report = manager.uninstall(id, platform)?;
    print_uninstall_report(&report);
    Ok(())
}

fn print_uninstall_report(report: &UninstallReport) {
    for path in &report.modified {
        println!(
            "  {} {} (modified since install)",
            "!".yellow(),
            path.display()
        );
    }
    for path in &report.kept {
        println!(
            "  {} {} (not installed by this plugin, kept)",
            "=".yellow(),
            path.display()
        );
    }
    for path in &report.missing {
        println!("  {} {} (already gone)", "-".dimmed(), path.display());
    }
    for path in &report.failed {
        println!("  {} {}", "x".red(), path.display());
    }
    println!();
    println!(
        "{} {} files, {} directories removed, {} edits reverted",
        "Done:".green().bold(),
        report.removed_files,
        report.removed_dirs,
        report.reverted_patches
    );
}

fn handle_fetch(base_dir: &Path, project: &Path, plugin: &str, args: &FetchArgs) -> Result<()> {
    let config = Config::load(base_dir)?;
    let options = build_fetch_options(&config, args);
    let manager = build_manager(&config, project, &args.search_path);

    let dir = manager.fetch(plugin, &options)?;
    println!("{} {}", "Fetched:".green(), dir.display());
    Ok(())
}

fn handle_prepare(base_dir: &Path, project: &Path, platform: &str) -> Result<()> {
    let platform: Platform = platform.parse()?;
    let config = Config::load(base_dir)?;
    let manager = build_manager(&config, project, &[]);

    manager.prepare(platform)?;
    println!("{} {}", "Prepared:".green(), platform.name());
    Ok(())
}

fn handle_list(base_dir: &Path, project: &Path, platform: &str) -> Result<()> {
    let platform: Platform = platform.parse()?;
    let config = Config::load(base_dir)?;
    let manager = build_manager(&config, project, &[]);

    let records = manager.list(platform)?;
    if records.is_empty() {
        println!("No plugins installed for {}", platform.name());
        return Ok(());
    }

    println!();
    println!("{}", format!("Installed plugins ({})", platform.name()).cyan().bold());
    println!();
    for record in records {
        let status = match record.status {
            InstallStatus::Complete => "complete".green(),
            InstallStatus::Partial => "partial".red(),
        };
        println!(
            "  {} {} [{}] {}",
            record.id.bold(),
            record.version,
            status,
            record.installed_at.dimmed()
        );
    }
    println!();
    Ok(())
}

fn handle_config(action: ConfigAction, base_dir: &Path) -> Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load(base_dir)?;
            match config.get(&key) {
                Some(value) => {
                    println!("{}", value);
                }
                None => {
                    return Err(PlugwrightError::ConfigKeyNotFound { key });
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load(base_dir)?;
            config.set(&key, &value)?;
            config.save(base_dir)?;
            println!("{} {} = {}", "Set:".green(), key, value);
        }
        ConfigAction::List => {
            let config = Config::load(base_dir)?;
            println!();
            for (key, value) in config.list() {
                println!("{} = {}", key.cyan(), value);
            }
            println!();
        }
        ConfigAction::Path => {
            let path = Config::path(base_dir);
            println!("{}", path.display());
        }
        ConfigAction::Init => {
            let path = Config::init(base_dir)?;
            println!("{} {}", "Initialized:".green(), path.display());
        }
    }

    Ok(())
}
