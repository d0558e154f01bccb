use pretty_assertions::assert_eq;

use crate::events::{Mode, SubMode};
use crate::host::Host;

use super::{register_text, setup, vim_cmd, vim_test};

#[test]
fn visual_delete() {
	assert_eq!(vim_cmd("vld", "abcd", (0,0)), ("cd".into(), (0,0)));
	vim_test("abcde", "3vd", "de");
	vim_test("abc\ndef", "vjd", "ef");
}

#[test]
fn visual_yank_moves_to_start() {
	let (mut vim, mut editor) = setup("abc\ndef", 0, 1);
	vim.handle_keys(&mut editor, "vjy").unwrap();
	assert_eq!(register_text(&mut vim, '0'), "bc\nde");
	assert_eq!(editor.host().cursor(), crate::Pos::new(0, 1));
	assert_eq!(editor.mode().mode, Mode::Normal);
}

#[test]
fn visual_line_delete() {
	assert_eq!(vim_cmd("Vd", "a\nb\nc", (1,0)), ("a\nc".into(), (1,0)));
	vim_test("a\nb\nc", "Vjd", "c");
	let (mut vim, mut editor) = setup("a\nb", 0, 0);
	vim.handle_keys(&mut editor, "Vy").unwrap();
	let reg = vim.global.registers.get(Some('0'));
	assert_eq!(reg.text(), "a\n");
	assert!(reg.linewise);
}

#[test]
fn visual_change() {
	vim_test("abcd", "vlcX<Esc>", "Xcd");
	let (mut vim, mut editor) = setup("abcd", 0, 0);
	vim.handle_keys(&mut editor, "vlc").unwrap();
	assert_eq!(editor.mode().mode, Mode::Insert);
}

#[test]
fn visual_indent_and_case() {
	vim_test("a", "V>", "    a");
	vim_test("    a\n    b", "Vj<", "a\nb");
	vim_test("abc", "vlU", "ABc");
	vim_test("ABC", "Vu", "abc");
	vim_test("aB", "vl~", "Ab");
}

#[test]
fn visual_swap_ends() {
	vim_test("abcdef", "lvllohd", "ef");
}

#[test]
fn visual_reselect() {
	vim_test("abcd", "vl<Esc>gvd", "cd");
	vim_test("abcd", "vl<Esc>$gvd", "cd");
}

#[test]
fn visual_text_object() {
	assert_eq!(vim_cmd("viwd", "foo bar", (0,5)).0, "foo ");
}

#[test]
fn visual_join_and_replace() {
	vim_test("a\nb\nc", "VjJ", "a b\nc");
	assert_eq!(vim_cmd("vlrx", "abc", (0,0)), ("xxc".into(), (0,0)));
	vim_test("ab\ncd", "Vrx", "xx\ncd");
}

#[test]
fn visual_put_linewise() {
	vim_test("a\nb", "yyjVp", "a\na");
}

#[test]
fn visual_block_delete() {
	vim_test("abc\ndef", "<C-v>jld", "c\nf");
}

#[test]
fn visual_block_insert_and_append() {
	vim_test("ab\ncd", "<C-v>jIx<Esc>", "xab\nxcd");
	vim_test("ab\ncd", "<C-v>jAx<Esc>", "axb\ncxd");
	vim_test("ab\ncdef", "<C-v>j$Ax<Esc>", "abx\ncdefx");
}

#[test]
fn visual_mode_switching() {
	let (mut vim, mut editor) = setup("abc", 0, 0);
	vim.handle_keys(&mut editor, "v").unwrap();
	assert_eq!(editor.mode().mode, Mode::Visual);
	assert_eq!(editor.mode().sub_mode, None);
	vim.handle_keys(&mut editor, "V").unwrap();
	assert_eq!(editor.mode().sub_mode, Some(SubMode::Linewise));
	vim.handle_keys(&mut editor, "<C-v>").unwrap();
	assert_eq!(editor.mode().sub_mode, Some(SubMode::Blockwise));
	vim.handle_keys(&mut editor, "<C-v>").unwrap();
	assert_eq!(editor.mode().mode, Mode::Normal);
	vim.handle_keys(&mut editor, "v<Esc>").unwrap();
	assert_eq!(editor.mode().mode, Mode::Normal);
}

#[test]
fn visual_selection_reaches_host() {
	let (mut vim, mut editor) = setup("abc\ndef", 0, 0);
	vim.handle_keys(&mut editor, "vl").unwrap();
	let sel = editor.host().selections().to_vec();
	assert_eq!(sel.len(), 1);
	assert_eq!((sel[0].from(), sel[0].to()), (crate::Pos::new(0, 0), crate::Pos::new(0, 2)));
	vim.handle_keys(&mut editor, "<Esc>").unwrap();
	assert!(editor.host().selections().is_empty());
}
