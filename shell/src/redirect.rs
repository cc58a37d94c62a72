use std::fs;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{CommandIntent, RedirectType};

/// An open redirect file, owned by the shell until the line's work is done.
#[derive(Debug)]
pub struct RedirectionHandle {
	fd: OwnedFd,
	pub typ: RedirectType,
}

impl RedirectionHandle {
	pub fn fd(&self) -> BorrowedFd<'_> {
		self.fd.as_fd()
	}
}

#[derive(Debug, Default)]
pub struct Redirections {
	pub input: Option<RedirectionHandle>,
	pub output: Option<RedirectionHandle>,
}

fn open_output(path: &Path) -> Result<RedirectionHandle> {
	let file = fs::OpenOptions::new()
		.write(true)
		.create(true)
		.truncate(true)
		.mode(0o600)
		.open(path)
		.map_err(|e| Error::OpenOutput { path: PathBuf::from(path), source: e })?;
	Ok(RedirectionHandle { fd: OwnedFd::from(file), typ: RedirectType::Output })
}

fn open_input(path: &Path) -> Result<RedirectionHandle> {
	let file = fs::OpenOptions::new()
		.read(true)
		.open(path)
		.map_err(|e| Error::OpenInput { path: PathBuf::from(path), source: e })?;
	Ok(RedirectionHandle { fd: OwnedFd::from(file), typ: RedirectType::Input })
}

/// Opens every redirect target of `intent` before anything is forked.
///
/// Files are opened close-on-exec; a child only sees them once they are
/// bound onto one of its standard slots. The output target may sit on the
/// second stage of a pipeline.
pub fn resolve(intent: &CommandIntent) -> Result<Redirections> {
	let output_target = intent.output_redirect.as_ref()
		.or_else(|| intent.stage2.as_ref().and_then(|s| s.output_redirect.as_ref()));

	let mut redirections = Redirections::default();
	if let Some(target) = output_target {
		redirections.output = Some(open_output(Path::new(target))?);
		debug!(path = ?target, "opened output redirect");
	}
	if let Some(target) = intent.input_redirect.as_ref() {
		redirections.input = Some(open_input(Path::new(target))?);
		debug!(path = ?target, "opened input redirect");
	}
	Ok(redirections)
}
