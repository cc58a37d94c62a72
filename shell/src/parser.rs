use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

use crate::error::ParseError;
use crate::types::*;

type ParseResult<T> = Result<T, ParseError>;

struct Parser<'a> {
	line: &'a [u8],
	i: usize,
}

impl<'a> Parser<'a> {
	fn new(line: &'a [u8], i: usize) -> Parser<'a> {
		Parser { line, i }
	}

	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.line.get(self.i) {
			if !f(*c) { break; }
			self.i += 1;
		}
	}

	fn is_whitespace(c: u8) -> bool {
		matches!(c, b' ' | b'\t' | b'\r' | b'\n')
	}

	fn is_meta(c: u8) -> bool {
		matches!(c, b'>' | b'<' | b'&' | b'|')
	}

	fn is_letter(c: u8) -> bool {
		!Parser::is_meta(c) && !Parser::is_whitespace(c)
	}

	fn skip_whitespaces(&mut self) {
		self.proceed_while(Parser::is_whitespace);
	}

	fn read_word(&mut self) -> &'a [u8] {
		let orig = self.i;
		self.proceed_while(Parser::is_letter);
		&self.line[orig .. self.i]
	}

	fn read_words(&mut self) -> Vec<OsString> {
		let mut words = vec![];
		loop {
			self.skip_whitespaces();
			let word = self.read_word();
			if word.is_empty() {
				break;
			}
			words.push(OsStr::from_bytes(word).to_os_string());
		}
		words
	}
}

fn find_meta(line: &[u8]) -> usize {
	line.iter().position(|&c| Parser::is_meta(c)).unwrap_or(line.len())
}

/// The word right after the first `meta`, if there is one before the next
/// metacharacter or the end of the line.
fn redirect_target(line: &[u8], meta: u8) -> Option<OsString> {
	let at = line.iter().position(|&c| c == meta)?;
	let mut parser = Parser::new(line, at + 1);
	parser.skip_whitespaces();
	let target = parser.read_word();
	if target.is_empty() {
		None
	} else {
		Some(OsStr::from_bytes(target).to_os_string())
	}
}

fn parse_stage2(rest: &[u8]) -> ParseResult<Vec<OsString>> {
	if rest.contains(&b'|') {
		return Err(ParseError::TooManyStages);
	}
	let args = Parser::new(&rest[.. find_meta(rest)], 0).read_words();
	if args.is_empty() {
		return Err(ParseError::MissingPipelineCommand);
	}
	Ok(args)
}

/// Turns one input line into a command intent.
///
/// Metacharacters are detected by presence, not by position: `&` anywhere
/// makes the line a background job, the word after the first `>`/`<` is the
/// redirect target, and the command is whatever precedes the first
/// metacharacter. With a `|`, the second command is the text after it up to
/// the next metacharacter, and the output redirect moves to that stage.
pub fn parse(line: &[u8]) -> ParseResult<Line> {
	if line.iter().all(|&c| Parser::is_whitespace(c)) {
		return Ok(Line::Empty);
	}

	let background = line.contains(&b'&');
	let input_redirect = redirect_target(line, b'<');
	let output_redirect = redirect_target(line, b'>');

	let args = Parser::new(&line[.. find_meta(line)], 0).read_words();
	if args.is_empty() {
		return Err(ParseError::MissingCommand);
	}

	let (output_redirect, stage2) = match line.iter().position(|&c| c == b'|') {
		None => (output_redirect, None),
		Some(at) => {
			let args2 = parse_stage2(&line[at + 1 ..])?;
			let stage = Stage { executable: args2[0].clone(), args: args2, output_redirect };
			(None, Some(stage))
		},
	};

	Ok(Line::Command(CommandIntent {
		executable: args[0].clone(),
		args,
		input_redirect,
		output_redirect,
		background,
		stage2,
	}))
}
