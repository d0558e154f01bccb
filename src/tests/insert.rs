use pretty_assertions::assert_eq;

use crate::events::Mode;
use crate::host::Host;

use super::{register_text, setup, vim_cmd, vim_test};

#[test]
fn insert_entry_points() {
	assert_eq!(vim_cmd("ihi<Esc>", "abc", (0,0)), ("hiabc".into(), (0,1)));
	assert_eq!(vim_cmd("ahi<Esc>", "abc", (0,0)), ("ahibc".into(), (0,2)));
	assert_eq!(vim_cmd("A!<Esc>", "abc", (0,0)), ("abc!".into(), (0,3)));
	assert_eq!(vim_cmd("I-<Esc>", "  abc", (0,4)), ("  -abc".into(), (0,2)));
	assert_eq!(vim_cmd("gI-<Esc>", "  abc", (0,4)), ("-  abc".into(), (0,0)));
}

#[test]
fn insert_open_line_keeps_indent() {
	assert_eq!(vim_cmd("ox<Esc>", "  a\nb", (0,0)), ("  a\n  x\nb".into(), (1,2)));
	assert_eq!(vim_cmd("Ox<Esc>", "  a", (0,0)), ("  x\n  a".into(), (0,2)));
	vim_test("a\nb", "jOx<Esc>", "a\nx\nb");
}

#[test]
fn insert_at_last_edit() {
	vim_test("", "ifoo<Esc>0gibar<Esc>", "foobar");
}

#[test]
fn insert_mode_is_reported() {
	let (mut vim, mut editor) = setup("abc", 0, 0);
	vim.handle_keys(&mut editor, "i").unwrap();
	assert_eq!(editor.mode().mode, Mode::Insert);
	vim.handle_keys(&mut editor, "<Esc>").unwrap();
	assert_eq!(editor.mode().mode, Mode::Normal);
	assert_eq!(editor.host().cursor().ch, 0);
}

#[test]
fn insert_backspace() {
	vim_test("", "iab<BS><Esc>", "a");
	assert_eq!(vim_cmd("i<BS><Esc>", "a\nb", (1,0)), ("ab".into(), (0,0)));
	vim_test("abc", "i<BS><Esc>", "abc");
}

#[test]
fn insert_delete_key() {
	vim_test("abc", "i<Del><Esc>", "bc");
	vim_test("a\nb", "A<Del><Esc>", "ab");
}

#[test]
fn insert_line_break_carries_indent() {
	assert_eq!(vim_cmd("A<CR>x<Esc>", "  foo", (0,0)), ("  foo\n  x".into(), (1,2)));
	assert_eq!(vim_cmd("i<CR><Esc>", "  foo", (0,4)), ("  fo\n  o".into(), (1,1)));
}

#[test]
fn insert_delete_word_and_line() {
	vim_test("", "ifoo bar<C-w><Esc>", "foo ");
	vim_test("", "ifoo<C-u>bar<Esc>", "bar");
}

#[test]
fn insert_register_contents() {
	let (mut vim, mut editor) = setup("", 0, 0);
	vim.global.registers.get_mut('a').set_text("xy", false, false);
	vim.handle_keys(&mut editor, "i<C-r>a!<Esc>").unwrap();
	assert_eq!(editor.host().text(), "xy!");
}

#[test]
fn insert_one_normal_command() {
	let (mut vim, mut editor) = setup("foo", 0, 0);
	vim.handle_keys(&mut editor, "A<C-o>").unwrap();
	assert_eq!(editor.mode().mode, Mode::Normal);
	vim.handle_keys(&mut editor, "0").unwrap();
	assert_eq!(editor.mode().mode, Mode::Insert);
	vim.handle_keys(&mut editor, "bar<Esc>").unwrap();
	assert_eq!(editor.host().text(), "barfoo");
}

#[test]
fn insert_with_count() {
	vim_test("", "3ihi<Esc>", "hihihi");
	vim_test("x", "2ax<Esc>", "xxx");
	vim_test("a\nb", "2oc<Esc>", "a\nc\nc\nb");
}

#[test]
fn insert_dot_repeat() {
	vim_test("", "ifoo<Esc>.", "fofooo");
	vim_test("a\nb", "A;<Esc>j.", "a;\nb;");
}

#[test]
fn insert_last_inserted_register() {
	let (mut vim, mut editor) = setup("", 0, 0);
	vim.handle_keys(&mut editor, "ifoo<Esc>").unwrap();
	assert_eq!(register_text(&mut vim, '.'), "foo");
	vim.handle_keys(&mut editor, "\".p").unwrap();
	assert_eq!(editor.host().text(), "foofoo");
}

#[test]
fn insert_cursor_keys() {
	vim_test("", "iab<Left>X<Esc>", "aXb");
	vim_test("ab\ncd", "i<Down>X<Esc>", "ab\nXcd");
	vim_test("abc", "i<End>X<Esc>", "abcX");
}

#[test]
fn insert_replace_mode() {
	assert_eq!(vim_cmd("Rxy<Esc>", "abcd", (0,0)), ("xycd".into(), (0,1)));
	vim_test("ab", "Rxyz<Esc>", "xyz");
	let (mut vim, mut editor) = setup("ab", 0, 0);
	vim.handle_keys(&mut editor, "R").unwrap();
	assert_eq!(editor.mode().mode, Mode::Replace);
}

#[test]
fn insert_toggle_overwrite() {
	vim_test("abc", "<Ins>x<Esc>", "xabc");
	vim_test("abc", "i<Ins>xy<Esc>", "xyc");
}

#[test]
fn insert_shift_indent() {
	vim_test("foo", "i<C-t><Esc>", "    foo");
	vim_test("        foo", "A<C-d><Esc>", "    foo");
	vim_test("foo", "A<C-d>!<Esc>", "foo!");
}

#[test]
fn insert_read_only_host() {
	let (mut vim, mut editor) = setup("abc", 0, 0);
	editor.host_mut().read_only = true;
	vim.handle_keys(&mut editor, "ix").unwrap();
	assert_eq!(editor.mode().mode, Mode::Normal);
	assert_eq!(editor.host().text(), "abc");
}

#[test]
fn insert_with_huge_count_keeps_one_copy() {
	let (mut vim, mut editor) = setup("", 0, 0);
	vim.handle_keys(&mut editor, "99999999999ix<Esc>").unwrap();
	assert_eq!(editor.host().text(), "x");
	assert_eq!(editor.mode().mode, Mode::Normal);
	assert_eq!(editor.host().last_message(), Some("Resulting text too long"));
}
