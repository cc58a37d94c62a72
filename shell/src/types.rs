use std::ffi::OsString;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectType { Input, Output }

/// The part of a command line a process is started from. Words keep the
/// exact bytes of the input line.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Stage {
	pub executable: OsString,
	/// `args[0]` is always `executable`.
	pub args: Vec<OsString>,
	pub output_redirect: Option<OsString>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CommandIntent {
	pub executable: OsString,
	pub args: Vec<OsString>,
	pub input_redirect: Option<OsString>,
	pub output_redirect: Option<OsString>,
	pub background: bool,
	/// Reads from the pipe; never carries an input redirect of its own.
	pub stage2: Option<Stage>,
}

impl CommandIntent {
	pub fn is_pipeline(&self) -> bool {
		self.stage2.is_some()
	}
}

#[derive(Debug, PartialEq, Eq)]
pub enum Line {
	Empty,
	Command(CommandIntent),
}
