use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const PROMPT: &str = "duosh> ";

fn shell(dir: &Path) -> Command {
	let mut cmd = Command::new(env!("CARGO_BIN_EXE_duosh"));
	cmd.current_dir(dir)
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped());
	cmd
}

/// Feeds `input` to a fresh shell, closes its stdin and collects everything.
fn session(dir: &Path, input: &str) -> Output {
	let mut child = shell(dir).spawn().unwrap();
	child.stdin.take().unwrap().write_all(input.as_bytes()).unwrap();
	child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
	String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
	String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Reads from `r` until everything read so far contains `needle`.
fn read_until_contains(r: &mut impl Read, needle: &str) -> String {
	let mut seen = vec![];
	let mut buf = [0; 256];
	while !String::from_utf8_lossy(&seen).contains(needle) {
		let n = r.read(&mut buf).unwrap();
		assert!(n > 0, "eof before {:?} in {:?}", needle, String::from_utf8_lossy(&seen));
		seen.extend_from_slice(&buf[..n]);
	}
	String::from_utf8_lossy(&seen).into_owned()
}

/// Zombie children of `parent`, read from `/proc/<pid>/stat`.
fn zombies_of(parent: u32) -> Vec<u32> {
	let mut zombies = vec![];
	for entry in fs::read_dir("/proc").unwrap().flatten() {
		let pid = match entry.file_name().to_str().and_then(|n| n.parse().ok()) {
			Some(pid) => pid,
			None => continue,
		};
		let stat = match fs::read_to_string(entry.path().join("stat")) {
			Ok(stat) => stat,
			Err(_) => continue,
		};
		// "pid (comm) state ppid ..."; comm may hold spaces and parentheses
		let rest = match stat.rfind(')') {
			Some(i) => &stat[i + 1..],
			None => continue,
		};
		let mut fields = rest.split_whitespace();
		if fields.next() == Some("Z") && fields.next().and_then(|p| p.parse().ok()) == Some(parent) {
			zombies.push(pid);
		}
	}
	zombies
}

#[test]
fn eof_ends_the_session() {
	let dir = tempfile::tempdir().unwrap();
	let output = session(dir.path(), "");
	assert!(output.status.success());
	assert_eq!(stdout(&output), PROMPT);
}

#[test]
fn echo_hello() {
	let dir = tempfile::tempdir().unwrap();
	let output = session(dir.path(), "echo hello\n");
	assert!(output.status.success());
	assert_eq!(stdout(&output), format!("{}hello\n{}", PROMPT, PROMPT));
}

#[test]
fn empty_line_only_prompts_again() {
	let dir = tempfile::tempdir().unwrap();
	let output = session(dir.path(), "\n   \n");
	assert_eq!(stdout(&output), PROMPT.repeat(3));
	assert_eq!(stderr(&output), "");
}

#[test]
fn output_redirect_replaces_contents() {
	let dir = tempfile::tempdir().unwrap();
	let output = session(dir.path(), "echo hi > out.txt\n");
	assert_eq!(stdout(&output), PROMPT.repeat(2));
	assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "hi\n");

	session(dir.path(), "echo bye > out.txt\n");
	assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "bye\n");
}

#[test]
fn input_redirect() {
	let dir = tempfile::tempdir().unwrap();
	fs::write(dir.path().join("in.txt"), "abc").unwrap();
	let output = session(dir.path(), "cat < in.txt\n");
	assert_eq!(stdout(&output), format!("{}abc{}", PROMPT, PROMPT));
}

#[test]
fn pipeline() {
	let dir = tempfile::tempdir().unwrap();
	let output = session(dir.path(), "printf X | tr X Y\n");
	assert_eq!(stdout(&output), format!("{}Y{}", PROMPT, PROMPT));
}

#[test]
fn background_job_returns_to_prompt() {
	let dir = tempfile::tempdir().unwrap();
	let mut child = shell(dir.path()).spawn().unwrap();
	let mut stdin = child.stdin.take().unwrap();
	let mut reader = BufReader::new(child.stdout.take().unwrap());

	let start = Instant::now();
	stdin.write_all(b"sleep 5 &\necho done\n").unwrap();
	let mut line = String::new();
	reader.read_line(&mut line).unwrap();
	assert!(start.elapsed() < Duration::from_secs(1));
	assert_eq!(line, format!("{}{}done\n", PROMPT, PROMPT));

	drop(stdin);
	assert!(child.wait().unwrap().success());
}

#[test]
fn finished_background_job_is_collected_before_the_next_prompt() {
	let dir = tempfile::tempdir().unwrap();
	let mut child = shell(dir.path()).spawn().unwrap();
	let mut stdin = child.stdin.take().unwrap();
	let mut stdout = child.stdout.take().unwrap();

	stdin.write_all(b"sleep 0.2 &\n").unwrap();
	read_until_contains(&mut stdout, &PROMPT.repeat(2));
	thread::sleep(Duration::from_millis(800));
	// the shell is blocked reading the next line
	assert_eq!(zombies_of(child.id()).len(), 1);

	stdin.write_all(b"echo next\n").unwrap();
	read_until_contains(&mut stdout, &format!("next\n{}", PROMPT));
	assert_eq!(zombies_of(child.id()), vec![]);

	drop(stdin);
	assert!(child.wait().unwrap().success());
}

#[test]
fn cd_changes_directory() {
	let dir = tempfile::tempdir().unwrap();
	fs::create_dir(dir.path().join("sub")).unwrap();
	let sub = dir.path().join("sub").canonicalize().unwrap();
	let output = session(dir.path(), "cd sub\npwd\n");
	assert_eq!(stdout(&output), format!("{}{}{}\n{}", PROMPT, PROMPT, sub.display(), PROMPT));
}

#[test]
fn cd_to_missing_directory_is_reported() {
	let dir = tempfile::tempdir().unwrap();
	let cwd = dir.path().canonicalize().unwrap();
	let output = session(dir.path(), "cd does-not-exist\npwd\n");
	assert!(output.status.success());
	assert!(stderr(&output).starts_with("duosh: cd: does-not-exist: "));
	assert!(stdout(&output).contains(&format!("{}\n", cwd.display())));
}

#[test]
fn missing_command_keeps_the_shell_running() {
	let dir = tempfile::tempdir().unwrap();
	let output = session(dir.path(), "duosh-no-such-command\necho after\n");
	assert!(output.status.success());
	assert_eq!(stderr(&output), "duosh: duosh-no-such-command: command not found\n");
	assert!(stdout(&output).contains("after\n"));
}

#[test]
fn parse_error_keeps_the_shell_running() {
	let dir = tempfile::tempdir().unwrap();
	let output = session(dir.path(), "| wc\necho after\n");
	assert!(output.status.success());
	assert_eq!(stderr(&output), "duosh: missing command\n");
	assert!(stdout(&output).contains("after\n"));
}

#[test]
fn unopenable_redirect_ends_the_session() {
	let dir = tempfile::tempdir().unwrap();
	let output = session(dir.path(), "cat < missing.txt\necho after\n");
	assert_eq!(output.status.code(), Some(1));
	assert!(stderr(&output).starts_with("duosh: cannot open input redirect file missing.txt: "));
	assert!(!stdout(&output).contains("after"));
}
