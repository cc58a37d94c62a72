use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use signal_hook::consts::SIGCHLD;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Status {
	Running,
	Exited(i32),
	Signaled(Signal),
	/// Collected by someone else before this job got to wait on it.
	Reaped,
}

impl Status {
	pub fn code(self) -> i32 {
		match self {
			Status::Exited(code) => code,
			Status::Signaled(sig) => 128 + sig as i32,
			Status::Running | Status::Reaped => 0,
		}
	}
}

trait WaitStatusExt {
	fn status(self) -> Status;
}

impl WaitStatusExt for WaitStatus {
	fn status(self) -> Status {
		match self {
			WaitStatus::Exited(_, code) => Status::Exited(code),
			WaitStatus::Signaled(_, sig, _) => Status::Signaled(sig),
			_ => Status::Running,
		}
	}
}

/// `waitpid` retried across `EINTR`.
fn waitpid(pid: Option<Pid>, flags: Option<WaitPidFlag>) -> nix::Result<WaitStatus> {
	loop {
		match wait::waitpid(pid, flags) {
			Err(Errno::EINTR) => (),
			result => return result,
		}
	}
}

/// Blocks until exactly `pid` terminates.
pub fn wait_exact(pid: Pid) -> Result<Status> {
	loop {
		match waitpid(Some(pid), None) {
			Ok(ws) => {
				let status = ws.status();
				if status != Status::Running {
					debug!(pid = pid.as_raw(), ?status, "foreground process finished");
					return Ok(status);
				}
			},
			Err(Errno::ECHILD) => {
				debug!(pid = pid.as_raw(), "foreground process was already reaped");
				return Ok(Status::Reaped);
			},
			Err(e) => return Err(Error::Wait(e)),
		}
	}
}

/// One non-blocking collection attempt; the pid is not tracked afterwards.
pub fn try_wait(pid: Pid) -> Status {
	match waitpid(Some(pid), Some(WaitPidFlag::WNOHANG)) {
		Ok(ws) => ws.status(),
		Err(Errno::ECHILD) => Status::Reaped,
		Err(e) => {
			warn!(pid = pid.as_raw(), error = %e, "non-blocking wait failed");
			Status::Running
		},
	}
}

/// Collects every child that has already terminated, without blocking.
pub fn drain() -> usize {
	let mut reaped = 0;
	loop {
		match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
			Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
			Ok(ws) => {
				debug!(pid = ws.pid().map(Pid::as_raw), status = ?ws.status(), "reaped child");
				reaped += 1;
			},
			Err(e) => {
				warn!(error = %e, "reaping children failed");
				break;
			},
		}
	}
	reaped
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Process {
	pub pid: Pid,
	pub status: Status,
}

#[derive(Debug)]
pub struct Job {
	pub background: bool,
	pub processes: Vec<Process>,
}

impl Job {
	/// Exit code of the last stage, as a shell reports it.
	pub fn code(&self) -> i32 {
		self.processes.last().map_or(0, |pr| pr.status.code())
	}
}

#[derive(Debug)]
pub struct JobBuilder {
	imp: Job,
}

impl JobBuilder {
	pub fn new(background: bool, size_hint: usize) -> JobBuilder {
		JobBuilder {
			imp: Job { background, processes: Vec::with_capacity(size_hint) }
		}
	}

	/// Records a freshly spawned process. A background process gets its
	/// single non-blocking wait right here.
	pub fn push(&mut self, pid: Pid) {
		let status = if self.imp.background {
			let status = try_wait(pid);
			trace!(pid = pid.as_raw(), ?status, "detached background process");
			status
		} else {
			Status::Running
		};
		self.imp.processes.push(Process { pid, status });
	}

	/// Waits for every stage of a foreground job, first to last. A
	/// background job is returned as is.
	pub fn build(mut self) -> Result<Job> {
		if !self.imp.background {
			for pr in self.imp.processes.iter_mut() {
				pr.status = wait_exact(pr.pid)?;
			}
		}
		Ok(self.imp)
	}
}

/// Deferred SIGCHLD handling.
///
/// The signal handler only raises a flag; the children are collected by
/// [`Reaper::reap_pending`] from the main flow, between lines.
#[derive(Debug)]
pub struct Reaper {
	pending: Arc<AtomicBool>,
}

impl Reaper {
	pub fn install() -> Result<Reaper> {
		let pending = Arc::new(AtomicBool::new(false));
		signal_hook::flag::register(SIGCHLD, Arc::clone(&pending)).map_err(Error::Signal)?;
		Ok(Reaper { pending })
	}

	pub fn reap_pending(&self) -> usize {
		if self.pending.swap(false, Ordering::SeqCst) {
			drain()
		} else {
			0
		}
	}
}
