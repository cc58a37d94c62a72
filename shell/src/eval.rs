use std::convert::Infallible;
use std::ffi::{CStr, CString, OsString};
use std::io;
use std::iter;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::ptr;

use nix::errno::Errno;
use nix::fcntl::{self, FcntlArg, FdFlag, OFlag};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::{self, ForkResult, Pid};
use tracing::debug;

use crate::builtin;
use crate::error::{Error, Result};
use crate::global;
use crate::job;
use crate::parser;
use crate::redirect::{self, Redirections};
use crate::types::{CommandIntent, Line};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Slot { Stdin, Stdout }

impl Slot {
	fn fileno(self) -> RawFd {
		match self {
			Slot::Stdin => libc::STDIN_FILENO,
			Slot::Stdout => libc::STDOUT_FILENO,
		}
	}
}

/// Makes `source` the child's descriptor for `slot` before the exec.
#[derive(Debug, Clone, Copy)]
pub struct Binding<'a> {
	pub slot: Slot,
	pub source: BorrowedFd<'a>,
}

impl<'a> Binding<'a> {
	pub fn new(slot: Slot, source: BorrowedFd<'a>) -> Binding<'a> {
		Binding { slot, source }
	}
}

fn bind(binding: &Binding) -> nix::Result<()> {
	let (src, dst) = (binding.source.as_raw_fd(), binding.slot.fileno());
	if src == dst {
		// dup2 onto itself would keep close-on-exec set
		fcntl::fcntl(src, FcntlArg::F_SETFD(FdFlag::empty()))?;
	} else {
		unistd::dup2(src, dst)?;
	}
	Ok(())
}

/// Null-terminated pointer array over `argv`, built before the fork.
fn argv_ptrs(argv: &[CString]) -> Vec<*const libc::c_char> {
	argv.iter().map(|a| a.as_ptr()).chain(iter::once(ptr::null())).collect()
}

// Runs in the forked child: no allocation from here on.
fn do_exec_command(argv: &[*const libc::c_char], bindings: &[Binding]) -> nix::Result<Infallible> {
	// the Rust runtime ignores SIGPIPE, and exec keeps ignored signals ignored
	unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl)?; }
	for binding in bindings {
		bind(binding)?;
	}
	unsafe { libc::execvp(argv[0], argv.as_ptr()) };
	Err(Errno::last())
}

fn exec_failure(e: Errno) -> (i32, &'static str) {
	match e {
		Errno::ENOENT => (127, "command not found"),
		e => (126, e.desc()),
	}
}

fn exec_command(name: &CStr, argv: &[*const libc::c_char], bindings: &[Binding]) -> ! {
	let (code, reason) = match do_exec_command(argv, bindings) {
		Ok(never) => match never {},
		Err(e) => exec_failure(e),
	};
	let parts: [&[u8]; 5] = [b"duosh: ", name.to_bytes(), b": ", reason.as_bytes(), b"\n"];
	for part in parts {
		let _ = unistd::write(io::stderr(), part);
	}
	unsafe { libc::_exit(code) }
}

/// Forks a process that runs `argv` (searched in `PATH`) with `bindings`
/// applied to its standard descriptors.
///
/// A failed exec only ends the child, with 127 for a missing command and
/// 126 otherwise. `argv` must not be empty.
pub fn spawn(argv: &[CString], bindings: &[Binding]) -> Result<Pid> {
	let ptrs = argv_ptrs(argv);
	match unsafe { unistd::fork() } {
		Ok(ForkResult::Parent { child }) => {
			debug!(pid = child.as_raw(), command = ?argv[0], ?bindings, "spawned");
			Ok(child)
		},
		Ok(ForkResult::Child) => exec_command(&argv[0], &ptrs, bindings),
		Err(e) => Err(Error::Spawn(e)),
	}
}

fn to_argv(args: &[OsString]) -> Result<Vec<CString>> {
	args.iter()
		.map(|a| CString::new(a.as_bytes()).map_err(|_| Error::Argument(a.clone())))
		.collect()
}

fn spawn_commands(argv: &[CString], argv2: Option<&[CString]>, redirections: &Redirections,
                  job_builder: &mut job::JobBuilder) -> Result<()> {
	let input = redirections.input.as_ref().map(|h| h.fd());
	let output = redirections.output.as_ref().map(|h| h.fd());

	let argv2 = match argv2 {
		None => {
			let mut bindings = vec![];
			if let Some(fd) = output {
				bindings.push(Binding::new(Slot::Stdout, fd));
			}
			if let Some(fd) = input {
				bindings.push(Binding::new(Slot::Stdin, fd));
			}
			job_builder.push(spawn(argv, &bindings)?);
			return Ok(());
		},
		Some(argv2) => argv2,
	};

	let (pipe_read, pipe_write) = unistd::pipe2(OFlag::O_CLOEXEC).map_err(Error::Pipe)?;

	let mut first = vec![Binding::new(Slot::Stdout, pipe_write.as_fd())];
	if let Some(fd) = input {
		first.push(Binding::new(Slot::Stdin, fd));
	}
	job_builder.push(spawn(argv, &first)?);

	let mut second = vec![Binding::new(Slot::Stdin, pipe_read.as_fd())];
	if let Some(fd) = output {
		second.push(Binding::new(Slot::Stdout, fd));
	}
	job_builder.push(spawn(argv2, &second)?);

	// both children hold their own copies now
	drop(pipe_read);
	drop(pipe_write);
	Ok(())
}

#[derive(Debug, PartialEq, Eq)]
pub enum EvalResult {
	Empty,
	Done(i32),
	Running(Vec<Pid>),
}

/// Runs one command intent: opens its redirects, then either calls a
/// builtin or spawns its stages and waits for them unless it is a
/// background job.
pub fn eval(state: &mut global::State, intent: &CommandIntent) -> Result<EvalResult> {
	let argv = to_argv(&intent.args)?;
	let argv2 = match intent.stage2 {
		Some(ref stage) => Some(to_argv(&stage.args)?),
		None => None,
	};

	let redirections = redirect::resolve(intent)?;

	if !intent.is_pipeline() {
		if let Some(builtin) = builtin::match_builtin(&intent.executable) {
			return builtin(state, &intent.args).map(EvalResult::Done);
		}
	}

	let mut job_builder = job::JobBuilder::new(intent.background, 1 + argv2.iter().len());
	spawn_commands(&argv, argv2.as_deref(), &redirections, &mut job_builder)?;
	let job = job_builder.build()?;
	drop(redirections);

	if job.background {
		Ok(EvalResult::Running(job.processes.iter().map(|pr| pr.pid).collect()))
	} else {
		Ok(EvalResult::Done(job.code()))
	}
}

pub fn run_line(state: &mut global::State, line: &[u8]) -> Result<EvalResult> {
	match parser::parse(line)? {
		Line::Empty => Ok(EvalResult::Empty),
		Line::Command(intent) => eval(state, &intent),
	}
}
