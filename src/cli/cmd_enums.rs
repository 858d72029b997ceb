use clap::{Parser, Subcommand};

/// Command-line interface for `setup-ide`.
#[derive(Parser)]
#[command(name = "setup-ide")]
#[command(version, about = "Install IDEs from vendor archives, verified and wired into the desktop", long_about = None)]
pub struct Cli {
    /// Enables detailed debug output for troubleshooting.
    #[arg(short, long, global = true)]
    pub(crate) debug: bool,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install one tool (run `setup-ide list` for the ids).
    Install {
        /// Tool id, e.g. `pycharm`, `eclipse`, `arduino`.
        tool: String,
        /// Install into this directory instead of `<install_root>/ide/<tool>`.
        #[arg(long)]
        path: Option<String>,
        /// Path to config.yaml (defaults to ~/.setup-ide/config.yaml).
        #[arg(long, env = "SETUP_IDE_CONFIG")]
        config: Option<String>,
    },
    /// List every installable tool and whether it is installed.
    List {
        /// Path to config.yaml (defaults to ~/.setup-ide/config.yaml).
        #[arg(long, env = "SETUP_IDE_CONFIG")]
        config: Option<String>,
    },
    /// Elevated worker that adds a user to a group. Spawned by `install`.
    #[command(hide = true)]
    AddToGroup {
        #[arg(long)]
        user: String,
        #[arg(long)]
        group: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_arguments() {
        let cli = Cli::try_parse_from(["setup-ide", "--debug", "install", "pycharm", "--path", "/opt/pycharm"]).unwrap();
        assert!(cli.debug);
        match cli.command {
            Commands::Install { tool, path, .. } => {
                assert_eq!(tool, "pycharm");
                assert_eq!(path.as_deref(), Some("/opt/pycharm"));
            }
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn test_hidden_group_worker_parses() {
        let cli = Cli::try_parse_from(["setup-ide", "add-to-group", "--user", "alice", "--group", "dialout"]).unwrap();
        assert!(matches!(cli.command, Commands::AddToGroup { ref user, ref group } if user == "alice" && group == "dialout"));
    }
}
