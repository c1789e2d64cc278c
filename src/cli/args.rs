//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{ModuleFormat, Overrides};

/// Kiln server-rendering runtime CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// Port number to listen on
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the development server with live reload
    #[command(visible_alias = "d")]
    Dev {
        /// Project directory (default: current directory)
        #[arg(value_hint = clap::ValueHint::DirPath)]
        dir: Option<PathBuf>,

        /// Extra glob to watch, relative to the project (repeatable)
        #[arg(short, long = "watch", value_name = "GLOB")]
        watch: Vec<String>,

        /// Emit split ES modules instead of a single CommonJS bundle
        #[arg(long)]
        esm: bool,
    },

    /// Serve the output of the last `build`
    #[command(visible_alias = "s")]
    Start {
        /// Project directory (default: current directory)
        #[arg(value_hint = clap::ValueHint::DirPath)]
        dir: Option<PathBuf>,
    },

    /// Compile the project for production
    #[command(visible_alias = "b")]
    Build {
        /// Project directory (default: current directory)
        #[arg(value_hint = clap::ValueHint::DirPath)]
        dir: Option<PathBuf>,

        /// Emit split ES modules instead of a single CommonJS bundle
        #[arg(long)]
        esm: bool,
    },
}

impl Cli {
    /// Project directory named by the subcommand.
    pub fn dir(&self) -> &Path {
        let dir = match &self.command {
            Commands::Dev { dir, .. } | Commands::Start { dir } | Commands::Build { dir, .. } => {
                dir.as_deref()
            }
        };
        dir.unwrap_or(Path::new("."))
    }

    /// Flags that take precedence over `kiln.toml`.
    pub fn overrides(&self) -> Overrides {
        let esm = matches!(
            self.command,
            Commands::Dev { esm: true, .. } | Commands::Build { esm: true, .. }
        );
        let watch = match &self.command {
            Commands::Dev { watch, .. } => watch.clone(),
            _ => Vec::new(),
        };
        Overrides {
            port: self.port,
            format: esm.then_some(ModuleFormat::Esm),
            watch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_flags() {
        let cli = Cli::parse_from(["kiln", "dev", "site", "-w", "content/**", "--watch", "*.md", "--esm"]);
        assert_eq!(cli.dir(), Path::new("site"));
        let overrides = cli.overrides();
        assert_eq!(overrides.watch, ["content/**", "*.md"]);
        assert_eq!(overrides.format, Some(ModuleFormat::Esm));
        assert_eq!(overrides.port, None);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["kiln", "start", "--port", "8080", "--verbose"]);
        assert!(matches!(cli.command, Commands::Start { .. }));
        assert_eq!(cli.dir(), Path::new("."));
        assert!(cli.verbose);
        assert_eq!(cli.overrides().port, Some(8080));
        assert_eq!(cli.overrides().format, None);
    }

    #[test]
    fn test_build_alias() {
        let cli = Cli::parse_from(["kiln", "b", "--esm"]);
        assert!(matches!(cli.command, Commands::Build { esm: true, .. }));
    }
}
