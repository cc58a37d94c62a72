use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use nix::unistd;
use tracing::debug;

use crate::error::{Error, Result};
use crate::global;

pub type Builtin = fn(&mut global::State, &[OsString]) -> Result<i32>;

pub fn builtin_cd(_: &mut global::State, args: &[OsString]) -> Result<i32> {
	let path = args.get(1).ok_or(Error::ChdirOperand)?;
	unistd::chdir(Path::new(path))
		.map_err(|e| Error::Chdir { path: PathBuf::from(path), source: e })?;
	debug!(path = ?path, "changed directory");
	Ok(0)
}

pub fn match_builtin(name: &OsStr) -> Option<Builtin> {
	match name.as_bytes() {
		b"cd" => Some(builtin_cd),
		_ => None,
	}
}
