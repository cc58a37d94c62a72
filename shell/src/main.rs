use std::io;
use std::io::{BufRead, Write};
use std::process;

use tracing::debug;

use duosh::{eval, global, logging, Error};

fn report(e: &Error) {
	let _ = writeln!(&mut io::stderr(), "duosh: {}", e);
}

fn interact(state: &mut global::State) -> duosh::Result<()> {
	let mut stdout = io::stdout();
	let stdin = io::stdin();
	let mut stdin_locked = stdin.lock();
	loop {
		state.reaper.reap_pending();
		let _ = stdout.write_all(state.config.prompt.as_bytes());
		let _ = stdout.flush();

		let mut line: Vec<u8> = vec![];
		match stdin_locked.read_until(b'\n', &mut line) {
			Ok(0) => return Ok(()),
			Ok(_) => (),
			Err(e) => return Err(Error::Read(e)),
		}

		match eval::run_line(state, &line) {
			Ok(result) => debug!(?result, "line done"),
			Err(e) => {
				if e.is_fatal() {
					return Err(e);
				}
				report(&e);
			},
		}
	}
}

fn main() {
	let config = global::Config::default();
	logging::init(&config);
	let r = global::State::new(config).and_then(|mut state| interact(&mut state));
	if let Err(e) = r {
		report(&e);
		process::exit(1);
	}
}
