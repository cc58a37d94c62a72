use crate::error::Result;
use crate::job::Reaper;

pub const PROMPT: &str = "duosh> ";

/// Settings of one interpreter session. Built in code; the shell reads no
/// flags and no environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub prompt: String,
	/// `tracing` filter directive for the diagnostics log on stderr.
	pub log_directive: String,
}

impl Default for Config {
	fn default() -> Config {
		Config { prompt: PROMPT.to_owned(), log_directive: "warn".to_owned() }
	}
}

#[derive(Debug)]
pub struct State {
	pub config: Config,
	pub reaper: Reaper,
}

impl State {
	/// Registers the SIGCHLD notification; done once per session.
	pub fn new(config: Config) -> Result<State> {
		let reaper = Reaper::install()?;
		Ok(State { config, reaper })
	}
}
