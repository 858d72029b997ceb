mod cli;
mod commands;
mod installers;
mod libs;
mod logger;
mod schemas;

use clap::Parser;
use cli::cmd_enums::{Cli, Commands};
use commands::{group_helper, install, list};

fn main() {
    let cli = Cli::parse();
    logger::init(cli.debug);

    match cli.command {
        Commands::Install { tool, path, config } => install::run(&tool, path.as_deref(), config.as_deref()),
        Commands::List { config } => list::run(config.as_deref()),
        Commands::AddToGroup { user, group } => group_helper::run(&user, &group),
    }
}
