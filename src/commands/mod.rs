// Register application subcommands.
// Each module corresponds to a specific `setup-ide` command-line action.

// Runs the installer pipeline for one tool.
pub mod install;
// Prints the tool registry with install status.
pub mod list;
// Hidden elevated worker spawned by `install` for group membership.
pub mod group_helper;
