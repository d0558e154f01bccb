use pretty_assertions::assert_eq;

use crate::events::Mode;
use crate::ex::parse_input;
use crate::host::Host;
use crate::options::{OptionValue, Scope};
use crate::pos::Pos;
use crate::state::Cx;

use super::{ex_cmd, register_text, setup};

fn ex_message(cmd: &str, text: &str) -> String {
	let (mut vim, mut editor) = setup(text, 0, 0);
	vim.handle_ex(&mut editor, cmd).unwrap();
	editor.host().last_message().unwrap_or_default().to_string()
}

#[test]
fn ex_unknown_command() {
	assert_eq!(ex_message("foo", "a"), "Not an editor command \":foo\"");
	assert_eq!(ex_message("sortx", "a"), "Not an editor command \":sortx\"");
}

#[test]
fn ex_prefix_resolution() {
	assert_eq!(ex_cmd("d", "a\nb", (0,0)).0, "b");
	assert_eq!(ex_cmd("del", "a\nb", (0,0)).0, "b");
	assert_eq!(ex_cmd("sor", "b\na", (0,0)).0, "a\nb");
	assert_eq!(ex_cmd("norm x", "ab", (0,0)).0, "b");
	assert_eq!(ex_cmd(":::d", "a\nb", (1,0)).0, "a");
}

#[test]
fn ex_goto_line() {
	assert_eq!(ex_cmd("2", "a\n  b\nc", (0,0)).1, (1,2));
	assert_eq!(ex_cmd("$", "a\nb\nc", (0,0)).1, (2,0));
	assert_eq!(ex_cmd(".+1", "a\nb\nc", (0,0)).1, (1,0));
	assert_eq!(ex_cmd("99", "a\nb", (0,0)).1, (1,0));
}

#[test]
fn ex_goto_mark_line() {
	let (mut vim, mut editor) = setup("a\nb\nc", 2, 0);
	vim.handle_keys(&mut editor, "mxgg").unwrap();
	vim.handle_ex(&mut editor, "'x").unwrap();
	assert_eq!(editor.host().cursor(), Pos::new(2, 0));
	vim.handle_ex(&mut editor, "'q").unwrap();
	assert_eq!(editor.host().last_message(), Some("Mark not set"));
}

#[test]
fn ex_delete_ranges() {
	assert_eq!(ex_cmd("2d", "a\nb\nc", (0,0)), ("a\nc".into(), (1,0)));
	assert_eq!(ex_cmd("2,3d", "a\nb\nc\nd", (0,0)).0, "a\nd");
	assert_eq!(ex_cmd("1,2d", "a\nb\nc", (0,0)).0, "c");
	assert_eq!(ex_cmd("%d", "a\nb\nc", (1,0)).0, "");
}

#[test]
fn ex_join() {
	assert_eq!(ex_cmd("j", "a\nb\nc", (0,0)).0, "a b\nc");
	assert_eq!(ex_cmd("1,3j", "a\nb\nc", (1,0)).0, "a b c");
}

#[test]
fn ex_yank_line() {
	let (mut vim, mut editor) = setup("foo\nbar", 1, 0);
	vim.handle_ex(&mut editor, "y").unwrap();
	assert_eq!(register_text(&mut vim, '0'), "bar\n");
	vim.handle_keys(&mut editor, "gg\"0P").unwrap();
	assert_eq!(editor.host().text(), "bar\nfoo\nbar");
}

#[test]
fn ex_write_undo_redo() {
	let (mut vim, mut editor) = setup("abc", 0, 0);
	vim.handle_ex(&mut editor, "w").unwrap();
	assert_eq!(editor.host().saves, 1);
	vim.handle_keys(&mut editor, "x").unwrap();
	vim.handle_ex(&mut editor, "u").unwrap();
	assert_eq!(editor.host().text(), "abc");
	vim.handle_ex(&mut editor, "red").unwrap();
	assert_eq!(editor.host().text(), "bc");
}

#[test]
fn ex_startinsert() {
	let (mut vim, mut editor) = setup("abc", 0, 1);
	vim.handle_ex(&mut editor, "startinsert").unwrap();
	assert_eq!(editor.mode().mode, Mode::Insert);
	assert_eq!(editor.host().cursor(), Pos::new(0, 1));

	let (mut vim, mut editor) = setup("abc", 0, 1);
	vim.handle_ex(&mut editor, "startinsert!").unwrap();
	assert_eq!(editor.mode().mode, Mode::Insert);
	assert_eq!(editor.host().cursor(), Pos::new(0, 3));
}

#[test]
fn ex_set_and_query_options() {
	let (mut vim, mut editor) = setup("", 0, 0);
	vim.handle_ex(&mut editor, "set tw?").unwrap();
	assert_eq!(editor.host().last_message(), Some("  tw=80"));
	vim.handle_ex(&mut editor, "set ts=2").unwrap();
	assert_eq!(vim.options().get("tabstop", None, Scope::Global), Ok(OptionValue::Number(2)));
	vim.handle_ex(&mut editor, "set tabstop").unwrap();
	assert_eq!(editor.host().last_message(), Some("  tabstop=2"));

	vim.handle_ex(&mut editor, "set nohlsearch").unwrap();
	vim.handle_ex(&mut editor, "set hlsearch?").unwrap();
	assert_eq!(editor.host().last_message(), Some(" nohlsearch"));
	vim.handle_ex(&mut editor, "set hls!").unwrap();
	vim.handle_ex(&mut editor, "set hls?").unwrap();
	assert_eq!(editor.host().last_message(), Some(" hls"));
}

#[test]
fn ex_set_errors() {
	assert_eq!(ex_message("set foo", ""), "Unknown option: foo");
	assert_eq!(ex_message("set ts=abc", ""), "Invalid argument: ts=abc");
	assert_eq!(ex_message("set", ""), "Argument required");
}

#[test]
fn ex_setlocal_stays_with_the_editor() {
	let (mut vim, mut editor) = setup("", 0, 0);
	vim.handle_ex(&mut editor, "setlocal sw=8").unwrap();
	assert_eq!(vim.options().get("sw", None, Scope::Global), Ok(OptionValue::Number(4)));
	assert_eq!(editor.state().options.get("shiftwidth"), Some(&OptionValue::Number(8)));

	let mut other = vim.editor(crate::TextBuffer::new(""));
	vim.handle_ex(&mut other, "set sw?").unwrap();
	assert_eq!(other.host().last_message(), Some("  sw=4"));
}

#[test]
fn ex_map_and_unmap() {
	let (mut vim, mut editor) = setup("a\nb\nc", 0, 0);
	vim.handle_ex(&mut editor, "nmap Q dd").unwrap();
	vim.handle_keys(&mut editor, "Q").unwrap();
	assert_eq!(editor.host().text(), "b\nc");
	vim.handle_ex(&mut editor, "nunmap Q").unwrap();
	vim.handle_keys(&mut editor, "Q").unwrap();
	assert_eq!(editor.host().text(), "b\nc");
	vim.handle_ex(&mut editor, "unmap Z").unwrap();
	assert_eq!(editor.host().last_message(), Some("No such mapping: unmap Z"));
	vim.handle_ex(&mut editor, "map").unwrap();
	assert_eq!(editor.host().last_message(), Some("Invalid mapping: map"));
}

#[test]
fn ex_imap_and_mapclear() {
	let (mut vim, mut editor) = setup("", 0, 0);
	vim.handle_ex(&mut editor, "imap jk <Esc>").unwrap();
	vim.handle_keys(&mut editor, "ihijk").unwrap();
	assert_eq!(editor.host().text(), "hi");
	assert_eq!(editor.mode().mode, Mode::Normal);
	vim.handle_ex(&mut editor, "imapclear").unwrap();
	vim.handle_keys(&mut editor, "Ajk<Esc>").unwrap();
	assert_eq!(editor.host().text(), "hijk");
}

#[test]
fn ex_ex_mappings() {
	let (mut vim, mut editor) = setup("b\na", 0, 0);
	vim.handle_ex(&mut editor, "map :ss :sort").unwrap();
	vim.handle_ex(&mut editor, "ss").unwrap();
	assert_eq!(editor.host().text(), "a\nb");
	vim.handle_ex(&mut editor, "unmap :ss").unwrap();
	vim.handle_ex(&mut editor, "ss").unwrap();
	assert_eq!(editor.host().last_message(), Some("Not an editor command \":ss\""));
}

#[test]
fn ex_substitute() {
	assert_eq!(ex_cmd("%s/foo/bar/g", "foo foo\nfoo", (0,0)), ("bar bar\nbar".into(), (1,0)));
	assert_eq!(ex_cmd("s/foo/bar/", "foo foo", (0,0)).0, "bar foo");
	assert_eq!(ex_cmd("s/foo/bar/", "x\nfoo foo", (1,0)).0, "x\nbar foo");
	assert_eq!(ex_cmd("s/a/b/ 2", "a\na\na", (0,0)).0, "b\nb\na");
	assert_eq!(ex_cmd("2,3s/a/b/", "a\na\na", (0,0)).0, "a\nb\nb");
}

#[test]
fn ex_substitute_groups_and_whole_match() {
	assert_eq!(ex_cmd(r"s/(\w+) (\w+)/\2 \1/", "hello world", (0,0)).0, "world hello");
	assert_eq!(ex_cmd("s/o/[&]/g", "foo", (0,0)).0, "f[o][o]");
	assert_eq!(ex_cmd(r"s/o/\&/g", "foo", (0,0)).0, "f&&");
	assert_eq!(ex_cmd(r"s/ /\n/g", "a b", (0,0)).0, "a\nb");
}

#[test]
fn ex_substitute_case() {
	assert_eq!(ex_cmd("s/FOO/x/", "foo FOO", (0,0)).0, "foo x");
	assert_eq!(ex_cmd("s/foo/x/", "FOO foo", (0,0)).0, "x foo");
	assert_eq!(ex_cmd("s/foo/x/I", "FOO foo", (0,0)).0, "FOO x");
}

#[test]
fn ex_substitute_reuses_last_search() {
	let (mut vim, mut editor) = setup("foo bar", 0, 0);
	vim.handle_keys(&mut editor, "/bar<CR>").unwrap();
	vim.handle_ex(&mut editor, "s//x/").unwrap();
	assert_eq!(editor.host().text(), "foo x");
	vim.handle_ex(&mut editor, "s/foo").unwrap();
	assert_eq!(editor.host().text(), "x x");
}

#[test]
fn ex_substitute_errors() {
	assert_eq!(ex_message("s/zzz/x/", "foo"), "No matches for zzz");
	assert_eq!(ex_message("s/foo", "foo"), "No previous substitute regular expression");
	assert_eq!(ex_message("s", "foo"), "No previous substitute regular expression");
}

#[test]
fn ex_substitute_confirm() {
	let (mut vim, mut editor) = setup("a a a", 0, 0);
	vim.handle_ex(&mut editor, "s/a/b/gc").unwrap();
	assert_eq!(editor.host().prompt.as_deref(), Some("replace with b (y/n/a/q/l)"));
	vim.handle_keys(&mut editor, "yn").unwrap();
	assert_eq!(editor.host().text(), "b a a");
	vim.handle_keys(&mut editor, "y").unwrap();
	assert_eq!(editor.host().text(), "b a b");
	assert_eq!(editor.host().prompt, None);
	assert!(editor.state().prompt.is_none());
}

#[test]
fn ex_substitute_confirm_all_and_quit() {
	let (mut vim, mut editor) = setup("a a a", 0, 0);
	vim.handle_ex(&mut editor, "s/a/b/gc").unwrap();
	vim.handle_keys(&mut editor, "a").unwrap();
	assert_eq!(editor.host().text(), "b b b");

	let (mut vim, mut editor) = setup("a a a", 0, 0);
	vim.handle_ex(&mut editor, "s/a/b/gc").unwrap();
	vim.handle_keys(&mut editor, "nq").unwrap();
	assert_eq!(editor.host().text(), "a a a");
	assert_eq!(editor.host().prompt, None);
}

#[test]
fn ex_global() {
	assert_eq!(ex_cmd("g/x/d", "ax\nb\ncx\nd", (0,0)).0, "b\nd");
	assert_eq!(ex_cmd("v/x/d", "ax\nb\ncx\nd", (0,0)).0, "ax\ncx");
	assert_eq!(ex_cmd("g!/x/d", "ax\nb\ncx\nd", (0,0)).0, "ax\ncx");
	assert_eq!(ex_cmd("g/x/s/x/y/", "ax\nb\ncx\nd", (0,0)).0, "ay\nb\ncy\nd");
	assert_eq!(ex_cmd("g/x/normal Az", "ax\nb\ncx", (0,0)).0, "axz\nb\ncxz");
}

#[test]
fn ex_global_listing_and_errors() {
	assert_eq!(ex_message("g/x", "ax\nb\ncx"), "ax\ncx");
	assert_eq!(ex_message("g", "a"), "Regular Expression missing from global");
}

#[test]
fn ex_normal() {
	assert_eq!(ex_cmd("%norm Ax", "a\nb", (0,0)).0, "ax\nbx");
	assert_eq!(ex_cmd("norm dw", "foo bar", (0,0)).0, "bar");
	assert_eq!(ex_message("norm", "a"), "Argument is required.");
}

#[test]
fn ex_normal_bang_skips_mappings() {
	let (mut vim, mut editor) = setup("abc", 0, 0);
	vim.map("x", "dd", None).unwrap();
	vim.handle_ex(&mut editor, "normal! x").unwrap();
	assert_eq!(editor.host().text(), "bc");
	vim.handle_ex(&mut editor, "normal x").unwrap();
	assert_eq!(editor.host().text(), "");
}

#[test]
fn ex_sort() {
	assert_eq!(ex_cmd("sort", "c\na\nb", (0,0)).0, "a\nb\nc");
	assert_eq!(ex_cmd("sort!", "c\na\nb", (0,0)).0, "c\nb\na");
	assert_eq!(ex_cmd("sort u", "b\na\nb", (0,0)).0, "a\nb");
	assert_eq!(ex_cmd("sort i", "b\nA\na", (0,0)).0, "A\na\nb");
	assert_eq!(ex_cmd("2,3sort", "z\nc\nb", (0,0)).0, "z\nb\nc");
}

#[test]
fn ex_sort_numeric() {
	assert_eq!(ex_cmd("sort n", "10\nx\n9", (0,0)).0, "x\n9\n10");
	assert_eq!(ex_cmd("sort! n", "10\nx\n9", (0,0)).0, "10\n9\nx");
	assert_eq!(ex_cmd("sort x", "0x1F\n0xA", (0,0)).0, "0xA\n0x1F");
	assert_eq!(ex_cmd("sort b", "0b11\n0b1", (0,0)).0, "0b1\n0b11");
}

#[test]
fn ex_sort_by_pattern() {
	assert_eq!(ex_cmd(r"sort /\d/", "a2\nb1\nc", (0,0)).0, "c\nb1\na2");
	assert_eq!(ex_message("sort nx", "a\nb"), "Invalid arguments:  nx");
}

#[test]
fn ex_parse_ranges_and_args() {
	let (mut vim, mut editor) = setup("a\nb\nc\nd", 1, 0);
	let mut cx = Cx::new(&mut editor.host, &mut editor.vim, &mut vim, editor.id);
	insta::assert_debug_snapshot!(parse_input(&mut cx, ":.,+2d").unwrap(), @r#"
	ExParams {
	    input: ":.,+2d",
	    command_name: "d",
	    line: Some(
	        1,
	    ),
	    line_end: Some(
	        3,
	    ),
	    selection_line: 1,
	    selection_line_end: Some(
	        3,
	    ),
	    arg_string: None,
	    args: [],
	}
	"#);
	insta::assert_debug_snapshot!(parse_input(&mut cx, "%s/a/b/ g").unwrap(), @r#"
	ExParams {
	    input: "%s/a/b/ g",
	    command_name: "s",
	    line: Some(
	        0,
	    ),
	    line_end: Some(
	        3,
	    ),
	    selection_line: 0,
	    selection_line_end: Some(
	        3,
	    ),
	    arg_string: Some(
	        "/a/b/ g",
	    ),
	    args: [
	        "/a/b/",
	        "g",
	    ],
	}
	"#);
	insta::assert_debug_snapshot!(parse_input(&mut cx, "!!sort").unwrap(), @r#"
	ExParams {
	    input: "!!sort",
	    command_name: "!!",
	    line: None,
	    line_end: None,
	    selection_line: 1,
	    selection_line_end: None,
	    arg_string: Some(
	        "sort",
	    ),
	    args: [
	        "sort",
	    ],
	}
	"#);
}

#[test]
fn ex_registers_listing() {
	let (mut vim, mut editor) = setup("foo bar", 0, 0);
	vim.handle_keys(&mut editor, "ye\"ayy").unwrap();
	vim.handle_ex(&mut editor, "registers").unwrap();
	let msg = editor.host().last_message().unwrap_or_default().to_string();
	insta::assert_snapshot!(msg.trim_end(), @r#"
	----------Registers----------

	""    foo bar

	"0    foo
	"a    foo bar
	"#);
	// the listing itself is not remembered as the last command
	assert_eq!(register_text(&mut vim, ':'), "");

	vim.handle_ex(&mut editor, "reg a0z").unwrap();
	let msg = editor.host().last_message().unwrap_or_default().to_string();
	assert_eq!(msg, "----------Registers----------\n\n\"a    foo bar\n\n\"0    foo\n\"z    \n");
}

#[test]
fn ex_command_history() {
	let (mut vim, mut editor) = setup("b\na", 0, 0);
	vim.handle_keys(&mut editor, ":sort<CR>").unwrap();
	assert_eq!(editor.host().text(), "a\nb");
	assert_eq!(register_text(&mut vim, ':'), "sort");
	vim.handle_keys(&mut editor, "dd:<Up>").unwrap();
	assert_eq!(editor.host().prompt.as_deref(), Some(":sort"));
	vim.handle_keys(&mut editor, "<Esc>").unwrap();
	assert_eq!(vim.global.ex_command_history.entries(), ["sort"]);
}

#[test]
fn ex_prompt_from_visual_mode() {
	let (mut vim, mut editor) = setup("a\nb\nc", 0, 0);
	vim.handle_keys(&mut editor, "Vj:").unwrap();
	assert_eq!(editor.host().prompt.as_deref(), Some(":'<,'>"));
	vim.handle_keys(&mut editor, "d<CR>").unwrap();
	assert_eq!(editor.host().text(), "c");
	assert_eq!(editor.mode().mode, Mode::Normal);
}
