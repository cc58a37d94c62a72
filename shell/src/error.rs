use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
	#[error("missing command")]
	MissingCommand,
	#[error("missing command after '|'")]
	MissingPipelineCommand,
	#[error("only two pipeline stages are supported")]
	TooManyStages,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	Parse(#[from] ParseError),
	#[error("nul byte in argument: {0:?}")]
	Argument(OsString),
	#[error("cannot open input redirect file {}: {source}", .path.display())]
	OpenInput { path: PathBuf, source: io::Error },
	#[error("cannot open output redirect file {}: {source}", .path.display())]
	OpenOutput { path: PathBuf, source: io::Error },
	#[error("fork failed: {0}")]
	Spawn(nix::Error),
	#[error("cannot create pipe: {0}")]
	Pipe(nix::Error),
	#[error("wait failed: {0}")]
	Wait(nix::Error),
	#[error("cd: {}: {source}", .path.display())]
	Chdir { path: PathBuf, source: nix::Error },
	#[error("cd: missing operand")]
	ChdirOperand,
	#[error("cannot register SIGCHLD handler: {0}")]
	Signal(io::Error),
	#[error("cannot read input: {0}")]
	Read(io::Error),
}

impl Error {
	/// Fatal errors end the whole session; the rest are reported and the
	/// loop goes on.
	pub fn is_fatal(&self) -> bool {
		match *self {
			Error::OpenInput { .. } | Error::OpenOutput { .. } => true,
			Error::Spawn(..) | Error::Pipe(..) | Error::Wait(..) => true,
			Error::Signal(..) | Error::Read(..) => true,
			Error::Parse(..) | Error::Argument(..) => false,
			Error::Chdir { .. } | Error::ChdirOperand => false,
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;
