use pretty_assertions::assert_eq;

use crate::host::{Host, TextBuffer};
use crate::pos::Pos;
use crate::{Editor, Vim};

pub const LOREM_IPSUM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.";

pub const LOREM_IPSUM_MULTILINE: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.\nUt enim ad minim veniam, quis nostrud exercitation.\n\nDuis aute irure dolor in reprehenderit in voluptate.\nExcepteur sint occaecat cupidatat non proident.";

pub mod api;
pub mod ex_commands;
pub mod insert;
pub mod keymap;
pub mod operators;
pub mod props;
pub mod visual;

/// A fresh engine with one editor over `text`, cursor at `line`/`ch`
pub fn setup(text: &str, line: usize, ch: usize) -> (Vim, Editor<TextBuffer>) {
	let _ = env_logger::builder().is_test(true).try_init();
	let mut vim = Vim::new();
	vim.suppress_error_logging = true;
	let editor = vim.editor(TextBuffer::new(text).with_cursor(line, ch));
	(vim, editor)
}

/// Feed `keys` to a buffer holding `text` with the cursor at `cursor`.
/// Returns the resulting text and cursor.
pub fn vim_cmd(keys: &str, text: &str, cursor: (usize,usize)) -> (String,(usize,usize)) {
	let (mut vim, mut editor) = setup(text, cursor.0, cursor.1);
	vim.handle_keys(&mut editor, keys).unwrap();
	let Pos { line, ch } = editor.host().cursor();
	(editor.host().text(), (line, ch))
}

/// Feed `keys` with the cursor at the start of `input` and check the resulting text
pub fn vim_test(input: &str, keys: &str, expected: &str) {
	let (mut vim, mut editor) = setup(input, 0, 0);
	vim.handle_keys(&mut editor, keys).unwrap();
	assert_eq!(editor.host().text(), expected);
}

/// Run one Ex command line over `text`
pub fn ex_cmd(cmd: &str, text: &str, cursor: (usize,usize)) -> (String,(usize,usize)) {
	let (mut vim, mut editor) = setup(text, cursor.0, cursor.1);
	vim.handle_ex(&mut editor, cmd).unwrap();
	let Pos { line, ch } = editor.host().cursor();
	(editor.host().text(), (line, ch))
}

pub fn register_text(vim: &mut Vim, name: char) -> String {
	vim.global.registers.get(Some(name)).text()
}
