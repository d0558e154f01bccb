use std::io::{self, Read};

use log::{debug, info};
use vimcore::{TextBuffer, Vim};

const USAGE: &str = "\
usage: vimcore [--input TEXT | --file PATH] [--keys SEQ]... [--ex CMD]... [--config JSON_PATH]

Loads text (stdin by default), applies each key sequence and Ex command in the order given,
then prints the resulting buffer.

  --input TEXT        use TEXT as the buffer
  --file PATH         read the buffer from PATH
  -k, --keys SEQ      feed a key sequence, e.g. 'dw' or 'ihello<Esc>'
  -e, --ex CMD        run an Ex command, e.g. '%s/foo/bar/g'
  --config PATH       load option values from a JSON file";

#[derive(Debug,PartialEq)]
enum Cmd {
	Keys(String),
	Ex(String)
}

#[derive(Default,Debug)]
struct Argv {
	input: Option<String>,
	file: Option<String>,
	config: Option<String>,

	cmds: Vec<Cmd>
}

impl Argv {
	pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self,String> {
		let mut new = Self::default();
		let mut args = args.into_iter();
		while let Some(arg) = args.next() {
			match arg.as_str() {
				"--input" => {
					let Some(arg) = args.next() else {
						return Err("Expected a string after '--input'".into())
					};
					if new.file.is_some() {
						return Err("--input and --file are mutually exclusive".into())
					}
					new.input = Some(arg);
				}
				"--file" => {
					let Some(arg) = args.next() else {
						return Err("Expected a path after '--file'".into())
					};
					if arg.starts_with('-') {
						return Err(format!("Expected a path after '--file', found {arg}"))
					}
					if new.input.is_some() {
						return Err("--input and --file are mutually exclusive".into())
					}
					new.file = Some(arg);
				}
				"--config" => {
					let Some(arg) = args.next() else {
						return Err("Expected a path after '--config'".into())
					};
					new.config = Some(arg);
				}
				"--keys" | "-k" => {
					let Some(arg) = args.next() else {
						return Err(format!("Expected a key sequence after '{arg}'"))
					};
					new.cmds.push(Cmd::Keys(arg))
				}
				"--ex" | "-e" => {
					let Some(arg) = args.next() else {
						return Err(format!("Expected an Ex command after '{arg}'"))
					};
					new.cmds.push(Cmd::Ex(arg))
				}
				arg => { return Err(format!("Unrecognized argument '{arg}'")) }
			}
		}
		Ok(new)
	}

	fn read_input(&self) -> Result<String,String> {
		let mut text = if let Some(input) = &self.input {
			return Ok(input.clone())
		} else if let Some(path) = &self.file {
			std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?
		} else {
			let mut buf = String::new();
			io::stdin().read_to_string(&mut buf).map_err(|e| e.to_string())?;
			buf
		};
		if text.ends_with('\n') {
			text.pop();
		}
		Ok(text)
	}
}

fn load_config(vim: &mut Vim, path: &str) -> Result<(),String> {
	let json = std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
	let changed = vim.load_options_json(&json).map_err(|e| format!("{path}: {e}"))?;
	debug!("config {path} set {changed:?}");
	Ok(())
}

/// Run the commands in `args` over `text` and return the final buffer
fn run(args: &Argv, text: &str) -> Result<String,String> {
	let mut vim = Vim::new();
	if let Some(path) = &args.config {
		load_config(&mut vim, path)?;
	}
	let mut editor = vim.editor(TextBuffer::new(text));
	for cmd in &args.cmds {
		info!("applying {cmd:?}");
		let result = match cmd {
			Cmd::Keys(seq) => vim.handle_keys(&mut editor, seq),
			Cmd::Ex(line) => vim.handle_ex(&mut editor, line),
		};
		result.map_err(|e| e.to_string())?;
		if let Some(msg) = editor.host_mut().messages.drain(..).next_back() {
			eprintln!("vimcore: {msg}");
		}
	}
	Ok(editor.into_host().text())
}

fn main() {
	env_logger::init();
	if std::env::args().skip(1).count() == 0 {
		eprintln!("{USAGE}");
		return
	}
	let args = match Argv::parse(std::env::args().skip(1)) {
		Ok(args) => args,
		Err(e) => {
			eprintln!("vimcore: {e}");
			std::process::exit(1);
		}
	};
	let text = match args.read_input() {
		Ok(text) => text,
		Err(e) => {
			eprintln!("vimcore: {e}");
			std::process::exit(1);
		}
	};
	match run(&args, &text) {
		Ok(output) => println!("{output}"),
		Err(e) => {
			eprintln!("vimcore: {e}");
			std::process::exit(1);
		}
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use pretty_assertions::assert_eq;

	use super::*;

	fn argv(args: &[&str]) -> Result<Argv,String> {
		Argv::parse(args.iter().map(|s| s.to_string()))
	}

	#[test]
	fn parses_commands_in_order() {
		let args = argv(&["--input", "foo", "-k", "dw", "--ex", "s/a/b/", "--keys", "x"]).unwrap();
		assert_eq!(args.input.as_deref(), Some("foo"));
		assert_eq!(args.cmds, vec![
			Cmd::Keys("dw".into()),
			Cmd::Ex("s/a/b/".into()),
			Cmd::Keys("x".into()),
		]);
	}

	#[test]
	fn rejects_bad_arguments() {
		assert!(argv(&["--input", "a", "--file", "b"]).is_err());
		assert!(argv(&["--keys"]).is_err());
		assert!(argv(&["--frobnicate"]).is_err());
	}

	#[test]
	fn runs_keys_and_ex() {
		let args = argv(&["-k", "wdw", "-e", "s/brown/slow/"]).unwrap();
		let output = run(&args, "the quick brown fox").unwrap();
		assert_eq!(output, "the slow fox");
	}

	#[test]
	fn reads_file_and_config() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "one\ntwo\nthree").unwrap();
		let mut config = tempfile::NamedTempFile::new().unwrap();
		write!(config, r#"{{"shiftwidth": 2, "expandtab": true}}"#).unwrap();

		let file_path = file.path().to_string_lossy().to_string();
		let config_path = config.path().to_string_lossy().to_string();
		let args = argv(&["--file", &file_path, "--config", &config_path, "-k", "j>>"]).unwrap();
		let text = args.read_input().unwrap();
		assert_eq!(text, "one\ntwo\nthree");
		assert_eq!(run(&args, &text).unwrap(), "one\n  two\nthree");
	}

	#[test]
	fn missing_config_is_an_error() {
		let args = argv(&["--config", "/nonexistent/vimcore.json"]).unwrap();
		assert!(run(&args, "text").is_err());
	}
}
