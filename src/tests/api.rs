use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use crate::dispatch::KeyOrigin;
use crate::error::{VimError, VimResult};
use crate::events::{Event, EventKind, Mode, SubMode};
use crate::ex::ExParams;
use crate::host::Host;
use crate::keys::KeyEvent;
use crate::motion::MotionResult;
use crate::options::{OptionValue, Scope};
use crate::pos::{Pos, Range};
use crate::registry::{ActionFn, ExFn, MotionFn, OperatorFn};
use crate::state::Cx;
use crate::vicmd::{Action, ActionArgs, Command, CommandKind, Context, Motion, MotionArgs, Operator, OperatorArgs};

use super::{register_text, setup};

fn motion_fn(f: impl Fn(&mut Cx, Pos, &MotionArgs) -> VimResult<Option<MotionResult>> + 'static) -> MotionFn {
	Rc::new(f)
}
fn operator_fn(f: impl Fn(&mut Cx, &OperatorArgs, &[Range], Pos, Pos) -> VimResult<Option<Pos>> + 'static) -> OperatorFn {
	Rc::new(f)
}
fn action_fn(f: impl Fn(&mut Cx, &ActionArgs) -> VimResult<()> + 'static) -> ActionFn {
	Rc::new(f)
}
fn ex_fn(f: impl Fn(&mut Cx, &ExParams) -> VimResult<()> + 'static) -> ExFn {
	Rc::new(f)
}

#[test]
fn api_map_keys() {
	let (mut vim, mut editor) = setup("foo bar", 0, 0);
	vim.map("Q", "dw", None).unwrap();
	vim.handle_keys(&mut editor, "Q").unwrap();
	assert_eq!(editor.host().text(), "bar");
}

#[test]
fn api_recursive_mapping_terminates() {
	let (mut vim, mut editor) = setup("foo", 0, 0);
	vim.map("a", "b", Some(Context::Normal)).unwrap();
	vim.map("b", "a", Some(Context::Normal)).unwrap();
	vim.handle_keys(&mut editor, "a").unwrap();
	assert_eq!(editor.host().text(), "foo");
	assert!(vim.key_to_key_stack.is_empty());
	assert!(!vim.noremap);
}

#[test]
fn api_noremap_skips_user_mappings() {
	let (mut vim, mut editor) = setup("a\nb", 0, 0);
	vim.map("x", "dd", None).unwrap();
	vim.noremap("Q", "x", None).unwrap();
	vim.handle_keys(&mut editor, "Q").unwrap();
	assert_eq!(editor.host().text(), "\nb");

	let (mut vim, mut editor) = setup("a\nb", 0, 0);
	vim.map("x", "dd", None).unwrap();
	vim.map("Q", "x", None).unwrap();
	vim.handle_keys(&mut editor, "Q").unwrap();
	assert_eq!(editor.host().text(), "b");
}

#[test]
fn api_unmap() {
	let (mut vim, mut editor) = setup("abc", 0, 0);
	vim.map("x", "dd", None).unwrap();
	assert_eq!(vim.unmap("x", None), Ok(true));
	assert_eq!(vim.unmap("x", Some(Context::Visual)), Ok(false));
	vim.handle_keys(&mut editor, "x").unwrap();
	assert_eq!(editor.host().text(), "bc");
}

#[test]
fn api_mapclear() {
	let (mut vim, mut editor) = setup("foo bar", 0, 0);
	vim.map("Q", "dw", None).unwrap();
	vim.mapclear(None);
	assert_eq!(vim.keymap.user_len(), 0);
	vim.handle_keys(&mut editor, "Q").unwrap();
	assert_eq!(editor.host().text(), "foo bar");
}

#[test]
fn api_mapclear_one_context_keeps_the_rest() {
	let (mut vim, mut editor) = setup("foo", 0, 0);
	vim.map("Q", "d", None).unwrap();
	vim.mapclear(Some(Context::Normal));
	assert_eq!(vim.keymap.user_len(), 2);
	vim.handle_keys(&mut editor, "Q").unwrap();
	assert_eq!(editor.host().text(), "foo");
	vim.handle_keys(&mut editor, "vQ").unwrap();
	assert_eq!(editor.host().text(), "oo");
}

#[test]
fn api_insert_mode_mapping() {
	let (mut vim, mut editor) = setup("", 0, 0);
	vim.map("jk", "<Esc>", Some(Context::Insert)).unwrap();
	vim.handle_keys(&mut editor, "iabjk").unwrap();
	assert_eq!(editor.host().text(), "ab");
	assert_eq!(editor.mode().mode, Mode::Normal);
	assert_eq!(editor.host().cursor(), Pos::new(0, 1));
}

#[test]
fn api_expired_insert_keys_stay_typed() {
	let (mut vim, mut editor) = setup("", 0, 0);
	vim.map("jk", "<Esc>", Some(Context::Insert)).unwrap();
	vim.handle_keys(&mut editor, "ij").unwrap();
	assert_eq!(editor.host().text(), "j");
	vim.expire_pending_keys(&mut editor).unwrap();
	vim.handle_keys(&mut editor, "k").unwrap();
	assert_eq!(editor.host().text(), "jk");
	assert_eq!(editor.mode().mode, Mode::Insert);
}

#[test]
fn api_custom_motion() {
	let (mut vim, mut editor) = setup("foo bar", 0, 0);
	vim.define_motion("lastChar", motion_fn(|cx, head, _args| {
		let len = cx.line_len(head.line);
		Ok(Some(MotionResult::Head(Pos::new(head.line, len.saturating_sub(1)))))
	}));
	let args = MotionArgs { inclusive: true, ..Default::default() };
	vim.map_command(Command::new("gl", CommandKind::Motion(Motion::Custom("lastChar".into()), args)));
	vim.handle_keys(&mut editor, "gl").unwrap();
	assert_eq!(editor.host().cursor(), Pos::new(0, 6));
	vim.handle_keys(&mut editor, "0dgl").unwrap();
	assert_eq!(editor.host().text(), "");
}

#[test]
fn api_custom_operator() {
	let (mut vim, mut editor) = setup("foo bar", 0, 0);
	vim.define_operator("shout", operator_fn(|cx, _args, ranges, _anchor, _head| {
		for range in ranges.iter().rev() {
			let text = cx.get_range(range.from(), range.to()).to_uppercase();
			cx.replace_range(&text, range.from(), range.to());
		}
		Ok(ranges.first().map(|r| r.from()))
	}));
	vim.map_command(Command::new("gs", CommandKind::Operator(Operator::Custom("shout".into()), OperatorArgs::default())));
	vim.handle_keys(&mut editor, "gsiw").unwrap();
	assert_eq!(editor.host().text(), "FOO bar");
	vim.handle_keys(&mut editor, "w.").unwrap();
	assert_eq!(editor.host().text(), "FOO BAR");
}

#[test]
fn api_custom_action() {
	let (mut vim, mut editor) = setup("foo", 0, 0);
	vim.define_action("greet", action_fn(|cx, args| {
		cx.notify(&format!("hello x{}", args.repeat));
		Ok(())
	}));
	let kind = CommandKind::Action { action: Action::Custom("greet".into()), args: ActionArgs::default(), motion: None };
	vim.map_command(Command::new("gh", kind).in_context(Context::Normal));
	vim.handle_keys(&mut editor, "3gh").unwrap();
	assert_eq!(editor.host().last_message(), Some("hello x3"));
}

#[test]
fn api_custom_action_notification() {
	let (mut vim, mut editor) = setup("foo", 0, 0);
	vim.define_action("nope", action_fn(|_cx, _args| Err(VimError::notify("not here"))));
	let kind = CommandKind::Action { action: Action::Custom("nope".into()), args: ActionArgs::default(), motion: None };
	vim.map_command(Command::new("gn", kind));
	vim.handle_keys(&mut editor, "gn").unwrap();
	assert_eq!(editor.host().last_message(), Some("not here"));
	assert_eq!(editor.status_text(), "");
}

#[test]
fn api_fault_resets_modal_state() {
	let (mut vim, mut editor) = setup("foo", 0, 0);
	vim.define_action("boom", action_fn(|_cx, _args| Err(VimError::fault("boom"))));
	let kind = CommandKind::Action { action: Action::Custom("boom".into()), args: ActionArgs::default(), motion: None };
	vim.map_command(Command::new("gb", kind));

	let err = vim.handle_keys(&mut editor, "vgb").unwrap_err();
	assert_eq!(err, VimError::Fault("boom".into()));
	assert_eq!(err.to_string(), "internal fault: boom");
	assert_eq!(editor.mode().mode, Mode::Normal);
	assert_eq!(editor.status_text(), "");
	assert!(editor.host().selections().is_empty());
	assert_eq!(editor.host().cursor(), Pos::new(0, 0));

	vim.handle_keys(&mut editor, "x").unwrap();
	assert_eq!(editor.host().text(), "oo");
}

#[test]
fn api_fault_is_unhandled_key() {
	let (mut vim, mut editor) = setup("foo", 0, 0);
	vim.define_action("boom", action_fn(|_cx, _args| Err(VimError::fault("boom"))));
	let kind = CommandKind::Action { action: Action::Custom("boom".into()), args: ActionArgs::default(), motion: None };
	vim.map_command(Command::new("Q", kind));
	assert!(!vim.handle_key(&mut editor, "Q"));
	assert_eq!(
		vim.try_handle_key(&mut editor, "Q", KeyOrigin::User),
		Err(VimError::Fault("boom".into()))
	);
}

#[test]
fn api_custom_ex_command() {
	let (mut vim, mut editor) = setup("foo", 0, 0);
	vim.define_ex("hello", Some("hel"), ex_fn(|cx, params| {
		cx.notify(&format!("hello {}", params.args.join(" ")));
		Ok(())
	})).unwrap();
	vim.handle_ex(&mut editor, "hell world").unwrap();
	assert_eq!(editor.host().last_message(), Some("hello world"));
	vim.handle_ex(&mut editor, "he").unwrap();
	assert_eq!(editor.host().last_message(), Some("Not an editor command \":he\""));
}

#[test]
fn api_custom_ex_bad_prefix() {
	let (mut vim, _editor) = setup("foo", 0, 0);
	let res = vim.define_ex("foo", Some("bar"), ex_fn(|_cx, _params| Ok(())));
	assert_eq!(
		res,
		Err(VimError::notify("\"bar\" is not a prefix of \"foo\", command not registered"))
	);
}

#[test]
fn api_ex_mapping_to_keys() {
	let (mut vim, mut editor) = setup("a\nb", 0, 0);
	vim.map(":cut", "dd", None).unwrap();
	vim.handle_ex(&mut editor, "cut").unwrap();
	assert_eq!(editor.host().text(), "b");
	assert_eq!(
		vim.map(":cut", "dd", Some(Context::Normal)),
		Err(VimError::notify("Mode not supported for ex mappings"))
	);
}

#[test]
fn api_mode_change_events() {
	let (mut vim, mut editor) = setup("foo", 0, 0);
	let seen = Rc::new(RefCell::new(vec![]));
	let log = seen.clone();
	let sub = vim.subscribe(EventKind::ModeChange, move |event| {
		if let Event::ModeChange(info) = event {
			log.borrow_mut().push((info.mode, info.sub_mode));
		}
	});
	vim.handle_keys(&mut editor, "ifoo<Esc>V<Esc>").unwrap();
	assert_eq!(*seen.borrow(), vec![
		(Mode::Insert, None),
		(Mode::Normal, None),
		(Mode::Visual, Some(SubMode::Linewise)),
		(Mode::Normal, None),
	]);

	assert!(vim.unsubscribe(sub));
	assert!(!vim.unsubscribe(sub));
	vim.handle_keys(&mut editor, "i<Esc>").unwrap();
	assert_eq!(seen.borrow().len(), 4);
}

#[test]
fn api_command_done_events() {
	let (mut vim, mut editor) = setup("foo bar", 0, 0);
	let count = Rc::new(RefCell::new(0));
	let counter = count.clone();
	vim.subscribe(EventKind::CommandDone, move |_| *counter.borrow_mut() += 1);
	vim.handle_keys(&mut editor, "d").unwrap();
	assert_eq!(*count.borrow(), 0);
	vim.handle_keys(&mut editor, "w").unwrap();
	assert!(*count.borrow() >= 1);
	assert_eq!(editor.host().text(), "bar");
}

#[test]
fn api_status_text() {
	let (mut vim, mut editor) = setup("foo bar", 0, 0);
	assert_eq!(editor.status_text(), "");
	vim.handle_keys(&mut editor, "2d").unwrap();
	assert_eq!(editor.status_text(), "2d");
	vim.handle_keys(&mut editor, "<Esc>v").unwrap();
	assert_eq!(editor.status_text(), "VISUAL");
	vim.handle_keys(&mut editor, "i").unwrap();
	assert_eq!(editor.status_text(), "VISUAL i");
	vim.handle_keys(&mut editor, "<Esc>V").unwrap();
	assert_eq!(editor.status_text(), "VISUAL LINE");
	vim.handle_keys(&mut editor, "<C-v>").unwrap();
	assert_eq!(editor.status_text(), "VISUAL BLOCK");
	vim.handle_keys(&mut editor, "<Esc>i").unwrap();
	assert_eq!(editor.status_text(), "INSERT");
}

#[test]
fn api_mode_info() {
	let (mut vim, mut editor) = setup("foo", 0, 0);
	assert_eq!(editor.mode().mode, Mode::Normal);
	vim.handle_keys(&mut editor, "R").unwrap();
	assert_eq!(editor.mode().mode, Mode::Replace);
	vim.handle_keys(&mut editor, "<Esc><C-v>").unwrap();
	assert_eq!(editor.mode().sub_mode, Some(SubMode::Blockwise));
}

#[test]
fn api_leave_and_enter_vim_mode() {
	let (mut vim, mut editor) = setup("foo", 0, 0);
	vim.handle_keys(&mut editor, "v").unwrap();
	editor.leave_vim_mode();
	assert!(!editor.is_enabled());
	assert!(editor.host().selections().is_empty());
	assert_eq!(editor.host().cursor(), Pos::new(0, 0));
	assert!(!vim.handle_key(&mut editor, "x"));
	assert_eq!(editor.host().text(), "foo");

	editor.enter_vim_mode(&mut vim);
	assert_eq!(editor.mode().mode, Mode::Normal);
	assert!(vim.handle_key(&mut editor, "x"));
	assert_eq!(editor.host().text(), "oo");
}

#[test]
fn api_reset_global_state() {
	let (mut vim, mut editor) = setup("foo bar foo", 0, 0);
	vim.handle_keys(&mut editor, "yw/foo<CR>").unwrap();
	assert_eq!(editor.host().cursor(), Pos::new(0, 8));
	assert_eq!(register_text(&mut vim, '0'), "foo ");

	vim.reset_global_state();
	assert!(vim.global.search_query.is_none());
	assert_eq!(register_text(&mut vim, '0'), "");
	vim.handle_keys(&mut editor, "0n").unwrap();
	assert_eq!(editor.host().cursor(), Pos::new(0, 0));
}

#[test]
fn api_registers_shared_between_editors() {
	let (mut vim, mut first) = setup("foo bar", 0, 0);
	let mut second = vim.editor(crate::TextBuffer::new("baz"));
	vim.handle_keys(&mut first, "yw").unwrap();
	vim.handle_keys(&mut second, "P").unwrap();
	assert_eq!(second.host().text(), "foo baz");
	assert_eq!(first.host().text(), "foo bar");
}

#[test]
fn api_key_from_event() {
	let (mut vim, mut editor) = setup("foo", 0, 0);
	let ctrl_w = KeyEvent::parse("<C-w>").unwrap();
	assert_eq!(vim.key_from_event(&editor, &ctrl_w).as_deref(), Some("<C-w>"));

	vim.load_options_json(r#"{"langmap": "фa,ыs"}"#).unwrap();
	let cyrillic = KeyEvent::parse("ф").unwrap();
	assert_eq!(vim.key_from_event(&editor, &cyrillic).as_deref(), Some("a"));

	vim.handle_keys(&mut editor, "i").unwrap();
	assert_eq!(vim.key_from_event(&editor, &cyrillic).as_deref(), Some("ф"));
}

#[test]
fn api_load_options_json() {
	let (mut vim, _editor) = setup("", 0, 0);
	let changed = vim.load_options_json(r#"{"tabstop": 2, "hlsearch": false}"#).unwrap();
	assert_eq!(changed.len(), 2);
	assert_eq!(vim.options().get("ts", None, Scope::Global), Ok(OptionValue::Number(2)));
	assert_eq!(vim.options().get("hlsearch", None, Scope::Global), Ok(OptionValue::Bool(false)));
	assert!(vim.load_options_json("[1, 2]").is_err());
}

#[test]
fn api_define_option() {
	let (mut vim, mut editor) = setup("", 0, 0);
	vim.define_option("scrolloff", OptionValue::Number(5), &["so"]);
	assert_eq!(vim.options().get("so", None, Scope::Global), Ok(OptionValue::Number(5)));
	vim.handle_ex(&mut editor, "set so=3").unwrap();
	vim.handle_ex(&mut editor, "set scrolloff?").unwrap();
	assert_eq!(editor.host().last_message(), Some("  scrolloff=3"));
	vim.handle_ex(&mut editor, "set so=x").unwrap();
	assert_eq!(editor.host().last_message(), Some("Invalid argument: so=x"));
}

#[test]
fn api_read_only_host_refuses_edits() {
	let (mut vim, mut editor) = setup("foo bar", 0, 0);
	editor.host_mut().read_only = true;
	vim.handle_keys(&mut editor, "x").unwrap();
	assert_eq!(editor.host().text(), "foo bar");
	vim.handle_keys(&mut editor, "w").unwrap();
	assert_eq!(editor.host().cursor(), Pos::new(0, 4));
}
