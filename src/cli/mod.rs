// Command-line surface: argument definitions only, no behaviour.
pub mod cmd_enums;
