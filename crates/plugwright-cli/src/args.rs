use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "plugwright")]
#[command(about = "Plugin package manager for hybrid native app projects")]
#[command(version)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Base directory (default: ~/.plugwright)
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Project root (default: current directory)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Options shared by commands that fetch plugins
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Symlink local plugin sources instead of copying them
    #[arg(long)]
    pub link: bool,

    /// Extra directory to search for local plugins (repeatable)
    #[arg(long = "search-path", value_name = "DIR")]
    pub search_path: Vec<PathBuf>,

    /// Never fall back to the registry
    #[arg(long)]
    pub no_registry: bool,

    /// Expected plugin id (`id` or `id@version`)
    #[arg(long, value_name = "ID")]
    pub expect: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a plugin and install it into a platform project
    Install {
        /// Plugin reference: git URL (`url#ref:subdir`), local path, or `id[@version]`
        plugin: String,

        /// Target platform
        #[arg(short, long, default_value = "android")]
        platform: String,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Reverse a plugin install
    Uninstall {
        /// Plugin id
        id: String,

        /// Target platform
        #[arg(short, long, default_value = "android")]
        platform: String,
    },

    /// Fetch a plugin into the project's plugin store without installing it
    Fetch {
        /// Plugin reference: git URL (`url#ref:subdir`), local path, or `id[@version]`
        plugin: String,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Write project configuration and web assets into a platform project
    Prepare {
        /// Target platform
        #[arg(short, long, default_value = "android")]
        platform: String,
    },

    /// List installed plugins
    List {
        /// Target platform
        #[arg(short, long, default_value = "android")]
        platform: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g., fetch.search_path)
        key: String,
    },

    /// Set a config value
    Set {
        /// Config key (e.g., fetch.search_path)
        key: String,

        /// Value to set (e.g., "~/plugins,/opt/plugins" or "true")
        value: String,
    },

    /// List all config values
    List,

    /// Show config file path
    Path,

    /// Initialize config file with defaults
    Init,
}
