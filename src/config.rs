use clap::ValueEnum;
use std::path::PathBuf;

// REPL history, relative to the home directory
pub const DEFAULT_HISTORY_FILE: &str = ".dum_history";

pub const PROMPT_PREFIX: &str = "> ";
pub const CONTINUATION_PREFIX: &str = "| ";

/// What the CLI prints for each piece of source it runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// The token list
    Tokens,
    /// The syntax tree
    Ast,
    /// The evaluated value
    #[default]
    Result,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub mode: OutputMode,
    pub debug: bool,
    pub json: bool,
    pub history_file: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            // set default values here, unless overridden via command-line
            mode: OutputMode::default(),
            debug: false,
            json: false,
            history_file: dirs::home_dir().map(|home| home.join(DEFAULT_HISTORY_FILE)),
        }
    }
}
