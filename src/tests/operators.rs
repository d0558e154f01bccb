use pretty_assertions::assert_eq;

use crate::host::Host;

use super::{register_text, setup, vim_cmd, vim_test};

#[test]
fn op_delete_word() {
	let (mut vim, mut editor) = setup("foo bar baz", 0, 0);
	vim.handle_keys(&mut editor, "dw").unwrap();
	assert_eq!(editor.host().text(), "bar baz");
	assert_eq!(register_text(&mut vim, '"'), "foo ");
	assert_eq!(register_text(&mut vim, '-'), "foo ");
}

#[test]
fn op_delete_words_with_count() {
	vim_test("foo bar baz qux", "2dw", "baz qux");
	vim_test("foo bar baz qux", "d3w", "qux");
}

#[test]
fn op_delete_word_stops_at_line_end() {
	assert_eq!(vim_cmd("dw", "foo\nbar", (0,0)), ("\nbar".into(), (0,0)));
	assert_eq!(vim_cmd("dw", "foo bar", (0,4)), ("foo ".into(), (0,3)));
}

#[test]
fn op_delete_line() {
	let (mut vim, mut editor) = setup("a\nb\nc", 1, 0);
	vim.handle_keys(&mut editor, "dd").unwrap();
	assert_eq!(editor.host().text(), "a\nc");
	assert_eq!(editor.host().cursor().line, 1);
	assert_eq!(register_text(&mut vim, '1'), "b\n");
	assert!(vim.global.registers.get(Some('"')).linewise);
}

#[test]
fn op_delete_last_line() {
	let (mut vim, mut editor) = setup("a\nb\nc", 2, 0);
	vim.handle_keys(&mut editor, "dd").unwrap();
	assert_eq!(editor.host().text(), "a\nb");
	assert_eq!(editor.host().cursor().line, 1);
	assert_eq!(register_text(&mut vim, '"'), "c\n");
}

#[test]
fn op_delete_lines_with_count() {
	vim_test("a\nb\nc\nd", "2dd", "c\nd");
	vim_test("a\nb\nc\nd", "dj", "c\nd");
	vim_test("a\nb\nc\nd", "jdk", "c\nd");
	vim_test("a\nb\nc\nd", "jdG", "a");
}

#[test]
fn op_delete_chars() {
	let (mut vim, mut editor) = setup("one two", 0, 0);
	vim.handle_keys(&mut editor, "3x").unwrap();
	assert_eq!(editor.host().text(), " two");
	assert_eq!(register_text(&mut vim, '-'), "one");
	assert_eq!(register_text(&mut vim, '"'), "one");

	let (mut vim, mut editor) = setup("one", 0, 0);
	vim.handle_keys(&mut editor, "3x").unwrap();
	assert_eq!(editor.host().text(), "");
	assert_eq!(register_text(&mut vim, '-'), "one");
}

#[test]
fn op_delete_char_before() {
	assert_eq!(vim_cmd("X", "abc", (0,2)), ("ac".into(), (0,1)));
}

#[test]
fn op_delete_to_eol() {
	assert_eq!(vim_cmd("D", "foo bar", (0,4)), ("foo ".into(), (0,3)));
	assert_eq!(vim_cmd("d$", "foo bar", (0,1)), ("f".into(), (0,0)));
}

#[test]
fn op_delete_to_char() {
	vim_test("foo(bar)", "dt(", "(bar)");
	vim_test("foo(bar)", "df(", "bar)");
}

#[test]
fn op_delete_text_objects() {
	assert_eq!(vim_cmd("di(", "f(a, b)", (0,3)).0, "f()");
	assert_eq!(vim_cmd("da(", "f(a, b)", (0,3)).0, "f");
	assert_eq!(vim_cmd("di\"", "say \"hello\"", (0,6)).0, "say \"\"");
	assert_eq!(vim_cmd("diw", "foo bar baz", (0,5)).0, "foo  baz");
	assert_eq!(vim_cmd("daw", "foo bar baz", (0,5)).0, "foo baz");
}

#[test]
fn op_change_word() {
	assert_eq!(vim_cmd("cwbaz<Esc>", "foo bar", (0,0)), ("baz bar".into(), (0,2)));
	assert_eq!(vim_cmd("ciwxyz<Esc>", "foo bar", (0,5)), ("foo xyz".into(), (0,6)));
}

#[test]
fn op_change_line_keeps_indent() {
	vim_test("  foo\nbar", "ccx<Esc>", "  x\nbar");
	vim_test("  foo\nbar", "Sx<Esc>", "  x\nbar");
}

#[test]
fn op_change_to_eol() {
	vim_test("foo bar", "wCqux<Esc>", "foo qux");
	vim_test("foo bar", "sF<Esc>", "Foo bar");
}

#[test]
fn op_indent() {
	assert_eq!(vim_cmd(">>", "foo", (0,0)), ("    foo".into(), (0,4)));
	vim_test("        foo", "<<", "    foo");
	vim_test("a\nb\nc", "2>>", "    a\n    b\nc");
	vim_test("a\nb\nc", ">j", "    a\n    b\nc");
}

#[test]
fn op_indent_skips_blank_lines() {
	vim_test("a\n\nb", ">2j", "    a\n\n    b");
}

#[test]
fn op_indent_with_tabs() {
	let (mut vim, mut editor) = setup("foo", 0, 0);
	vim.handle_ex(&mut editor, "set noexpandtab").unwrap();
	vim.handle_keys(&mut editor, ">>").unwrap();
	assert_eq!(editor.host().text(), "\tfoo");
}

#[test]
fn op_change_case() {
	vim_test("foo bar", "gUiw", "FOO bar");
	vim_test("Foo", "g~~", "fOO");
	vim_test("FOO Bar", "guu", "foo bar");
	vim_test("foo bar", "gUU", "FOO BAR");
	assert_eq!(vim_cmd("~", "abc", (0,0)), ("Abc".into(), (0,1)));
	assert_eq!(vim_cmd("3~", "abcd", (0,0)), ("ABCd".into(), (0,3)));
}

#[test]
fn op_join() {
	assert_eq!(vim_cmd("J", "foo\n  bar", (0,0)), ("foo bar".into(), (0,3)));
	vim_test("a\nb\nc\nd", "3J", "a b c\nd");
	vim_test("foo\n\nbar", "J", "foo\nbar");
	vim_test("foo\n  bar", "gJ", "foo  bar");
}

#[test]
fn op_swap_chars() {
	assert_eq!(vim_cmd("xp", "ab", (0,0)), ("ba".into(), (0,1)));
}

#[test]
fn op_replace_char() {
	assert_eq!(vim_cmd("rx", "abc", (0,0)), ("xbc".into(), (0,0)));
	assert_eq!(vim_cmd("3rx", "abcd", (0,0)), ("xxxd".into(), (0,2)));
}

#[test]
fn op_increment() {
	assert_eq!(vim_cmd("<C-a>", "x 7 y", (0,0)), ("x 8 y".into(), (0,2)));
	vim_test("10", "5<C-a>", "15");
	vim_test("0", "<C-x>", "-1");
	vim_test("-3", "<C-a>", "-2");
	vim_test("0x0f", "<C-a>", "0x10");
	vim_test("007", "<C-a>", "010");
	// not an octal number
	vim_test("09", "<C-a>", "10");
	// numbers before the cursor are skipped
	assert_eq!(vim_cmd("<C-a>", "1 2", (0,1)).0, "1 3");
}

#[test]
fn op_dot_repeats_last_edit() {
	vim_test("a b c d", "dw.", "c d");
	vim_test("a b c d e f", "dw2.", "d e f");
	vim_test("a\nb\nc\nd", "dd.", "c\nd");
	vim_test("abcdef", "x..", "def");
	vim_test("foo foo", "cwbar<Esc>w.", "bar bar");
}

#[test]
fn op_dot_after_count_uses_count() {
	vim_test("a b c d e f g", "2dw.", "e f g");
}

#[test]
fn op_undo_redo() {
	let (mut vim, mut editor) = setup("foo bar", 0, 0);
	vim.handle_keys(&mut editor, "dw").unwrap();
	assert_eq!(editor.host().text(), "bar");
	vim.handle_keys(&mut editor, "u").unwrap();
	assert_eq!(editor.host().text(), "foo bar");
	vim.handle_keys(&mut editor, "<C-r>").unwrap();
	assert_eq!(editor.host().text(), "bar");
}

#[test]
fn op_undo_takes_whole_command() {
	let (mut vim, mut editor) = setup("a\nb\nc\nd", 0, 0);
	vim.handle_keys(&mut editor, "3dd").unwrap();
	assert_eq!(editor.host().text(), "d");
	vim.handle_keys(&mut editor, "u").unwrap();
	assert_eq!(editor.host().text(), "a\nb\nc\nd");
}

#[test]
fn op_read_only_buffer() {
	let (mut vim, mut editor) = setup("foo bar", 0, 0);
	editor.host_mut().read_only = true;
	vim.handle_keys(&mut editor, "dwxiabc<Esc>").unwrap();
	assert_eq!(editor.host().text(), "foo bar");
	// motions still work
	vim.handle_keys(&mut editor, "w").unwrap();
	assert_eq!(editor.host().cursor().ch, 4);
}

#[test]
fn op_yank_keeps_cursor() {
	let (mut vim, mut editor) = setup("foo bar", 0, 4);
	vim.handle_keys(&mut editor, "yb").unwrap();
	assert_eq!(register_text(&mut vim, '0'), "foo ");
	assert_eq!(editor.host().cursor().ch, 4);
}

#[test]
fn op_pending_status() {
	let (mut vim, mut editor) = setup("foo bar", 0, 0);
	vim.handle_keys(&mut editor, "2d").unwrap();
	assert_eq!(editor.status_text(), "2d");
	vim.handle_keys(&mut editor, "<Esc>").unwrap();
	assert_eq!(editor.status_text(), "");
	assert_eq!(editor.host().text(), "foo bar");
}

#[test]
fn op_shift_with_huge_count_is_refused() {
	let (mut vim, mut editor) = setup("a\nb", 0, 0);
	vim.handle_keys(&mut editor, "Vj99999999999>").unwrap();
	assert_eq!(editor.host().text(), "a\nb");
	assert_eq!(editor.host().last_message(), Some("Resulting text too long"));
}
