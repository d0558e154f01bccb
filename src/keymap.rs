//! The keymap: the default binding table, user mappings pushed on top of it, and the matcher
//! that resolves a pending key string against both.

use log::debug;

use crate::host::{FoldCommand, ScrollPos};
use crate::state::InputState;
use crate::vicmd::{Action, ActionArgs, CmdFlags, Command, CommandKind, Context, InsertAt, Motion, MotionArgs, Operator, OperatorArgs, QuerySrc, SearchArgs};

#[derive(Clone,PartialEq,Eq,Debug)]
pub enum MatchResult {
	None,
	Partial {
		/// The only candidate ends in `<character>`, so the next key is literal (no langmap)
		expect_literal_next: bool
	},
	Full {
		command: Command,
		selected_character: Option<char>
	},
	/// A placeholder matched something other than one char, so the keys are dropped
	Clear
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
enum KeyMatch {
	Partial,
	Full
}

fn command_match(pressed: &str, mapped: &str) -> Option<KeyMatch> {
	let placeholder = ["<character>", "<register>"].into_iter().find(|p| mapped.ends_with(p));
	if let Some(placeholder) = placeholder {
		let mapped_prefix = &mapped[..mapped.len() - placeholder.len()];
		if pressed.len() > mapped_prefix.len() && pressed.starts_with(mapped_prefix) {
			return Some(KeyMatch::Full)
		}
		return mapped_prefix.starts_with(pressed).then_some(KeyMatch::Partial)
	}
	if pressed == mapped {
		Some(KeyMatch::Full)
	} else {
		mapped.starts_with(pressed).then_some(KeyMatch::Partial)
	}
}

/// The argument key at the end of `keys`. `<CR>` and `<Space>` stand for their chars,
/// any other named key is no argument at all.
fn last_char(keys: &str) -> Option<char> {
	if keys.len() > 2 && keys.ends_with('>')
		&& let Some(start) = keys[..keys.len() - 1].rfind('<')
		&& !keys[start + 1..keys.len() - 1].contains('>')
		&& keys.len() - start > 2 {
		return match &keys[start..] {
			"<CR>" => Some('\n'),
			"<Space>" => Some(' '),
			_ => None
		}
	}
	keys.chars().last()
}

#[derive(Clone,Debug)]
pub struct Keymap {
	commands: Vec<Command>,
	/// Entries at the back of `commands` that came from the default table
	default_len: usize,
}

impl Default for Keymap {
	fn default() -> Self {
		let commands = default_keymap();
		let default_len = commands.len();
		Self { commands, default_len }
	}
}

impl Keymap {
	pub fn new() -> Self {
		Self::default()
	}
	pub fn commands(&self) -> &[Command] {
		&self.commands
	}
	pub fn user_len(&self) -> usize {
		self.commands.len() - self.default_len
	}
	/// User mappings go in front so the newest one wins ties
	pub fn push_front(&mut self, command: Command) {
		debug!("mapping {:?} in {:?}", command.keys, command.context);
		self.commands.insert(0, command);
	}
	pub fn map(&mut self, lhs: &str, rhs: &str, context: Option<Context>, noremap: bool) {
		let mut command = Command::new(lhs, CommandKind::KeyToKey(rhs.to_string()));
		command.context = context;
		command.noremap = noremap;
		self.push_front(command);
	}
	/// Remove the first entry with exactly these keys and context. Default bindings can be removed too.
	pub fn unmap(&mut self, lhs: &str, context: Option<Context>) -> bool {
		let Some(idx) = self.commands.iter().position(|c| c.keys == lhs && c.context == context) else {
			return false
		};
		if idx >= self.user_len() {
			self.default_len -= 1;
		}
		self.commands.remove(idx);
		true
	}
	/// Drop user mappings. With a context, only that context's mappings go; a context-free
	/// mapping is split into per-context copies for the remaining contexts.
	pub fn mapclear(&mut self, context: Option<Context>) {
		let user: Vec<Command> = self.commands.drain(..self.user_len()).collect();
		let Some(ctx) = context else { return };
		for mapping in user.into_iter().rev() {
			match mapping.context {
				Some(c) if c == ctx => {}
				Some(_) => self.push_front(mapping),
				None => {
					for other in [Context::Normal, Context::Insert, Context::Visual] {
						if other != ctx {
							self.push_front(mapping.clone().in_context(other));
						}
					}
				}
			}
		}
	}

	/// Resolve `keys` against the table.
	///
	/// A pending operator switches the context to operator-pending and rules out actions.
	/// Insert context only sees insert bindings. With `noremap`, user mappings are skipped.
	pub fn match_command(&self, keys: &str, input: &InputState, context: Context, noremap: bool) -> MatchResult {
		let context = if input.operator.is_some() { Context::OperatorPending } else { context };
		let start = if noremap { self.user_len() } else { 0 };
		let mut partial: Vec<&Command> = vec![];
		let mut full: Option<&Command> = None;
		for command in &self.commands[start..] {
			if context == Context::Insert && command.context != Some(Context::Insert) {
				continue
			}
			if command.context.is_some_and(|c| c != context) {
				continue
			}
			if input.operator.is_some() && command.is_action() {
				continue
			}
			match command_match(keys, &command.keys) {
				Some(KeyMatch::Full) => {
					full.get_or_insert(command);
				}
				Some(KeyMatch::Partial) => partial.push(command),
				None => {}
			}
		}
		let Some(command) = full else {
			if partial.is_empty() {
				return MatchResult::None
			}
			let expect_literal_next = partial.len() == 1 && partial[0].keys.ends_with("<character>");
			return MatchResult::Partial { expect_literal_next }
		};
		let mut selected_character = None;
		if command.placeholder().is_some() {
			let Some(ch) = last_char(keys) else {
				return MatchResult::Clear
			};
			selected_character = Some(ch);
		}
		MatchResult::Full { command: command.clone(), selected_character }
	}
}

fn key_to_key(keys: &str, to: &str) -> Command {
	Command::new(keys, CommandKind::KeyToKey(to.to_string()))
}
fn motion(keys: &str, motion: Motion, args: MotionArgs) -> Command {
	Command::new(keys, CommandKind::Motion(motion, args))
}
fn operator(keys: &str, op: Operator, args: OperatorArgs) -> Command {
	Command::new(keys, CommandKind::Operator(op, args))
}
fn operator_motion(keys: &str, op: Operator, operator_args: OperatorArgs, motion: Motion, motion_args: MotionArgs, visual_line: bool) -> Command {
	Command::new(keys, CommandKind::OperatorMotion { operator: op, operator_args, motion, motion_args, visual_line })
}
fn action(keys: &str, action: Action, args: ActionArgs) -> Command {
	Command::new(keys, CommandKind::Action { action, args, motion: None })
}
fn edit(keys: &str, act: Action, args: ActionArgs) -> Command {
	action(keys, act, args).with_flags(CmdFlags::IS_EDIT)
}
fn search(keys: &str, forward: bool, query_src: QuerySrc, whole_word_only: bool) -> Command {
	Command::new(keys, CommandKind::Search(SearchArgs { forward, query_src, whole_word_only, to_jumplist: true }))
}
fn scroll_to_cursor(keys: &str, position: ScrollPos, to_first_char: bool) -> Command {
	let motion = to_first_char.then(|| (Motion::MoveToFirstNonWhiteSpaceCharacter, MotionArgs::default()));
	let args = ActionArgs { position, ..Default::default() };
	Command::new(keys, CommandKind::Action { action: Action::ScrollToCursor, args, motion })
}
fn fold(keys: &str, cmd: FoldCommand, all: bool) -> Command {
	action(keys, Action::Fold, ActionArgs { fold: Some(cmd), all, ..Default::default() })
}

fn fwd(forward: bool) -> MotionArgs {
	MotionArgs { forward, ..Default::default() }
}
fn words(forward: bool, word_end: bool, big_word: bool) -> MotionArgs {
	MotionArgs { forward, word_end, big_word, inclusive: word_end, ..Default::default() }
}
fn insert_at(insert_at: InsertAt) -> ActionArgs {
	ActionArgs { insert_at, ..Default::default() }
}

pub fn default_keymap() -> Vec<Command> {
	use Context::{Insert, Normal, Visual};
	use Motion as Mo;
	use Operator as Op;
	use Action as A;
	let none = MotionArgs::default;
	let no_op = OperatorArgs::default;
	let no_act = ActionArgs::default;
	vec![
		key_to_key("<Left>", "h"),
		key_to_key("<Right>", "l"),
		key_to_key("<Up>", "k"),
		key_to_key("<Down>", "j"),
		key_to_key("g<Up>", "gk"),
		key_to_key("g<Down>", "gj"),
		key_to_key("<Space>", "l"),
		key_to_key("<BS>", "h"),
		key_to_key("<Del>", "x"),
		key_to_key("<C-Space>", "W"),
		key_to_key("<C-BS>", "B"),
		key_to_key("<S-Space>", "w"),
		key_to_key("<S-BS>", "b"),
		key_to_key("<C-n>", "j"),
		key_to_key("<C-p>", "k"),
		key_to_key("<C-[>", "<Esc>"),
		key_to_key("<C-c>", "<Esc>"),
		key_to_key("<C-[>", "<Esc>").in_context(Insert),
		key_to_key("<C-c>", "<Esc>").in_context(Insert),
		key_to_key("<C-Esc>", "<Esc>"),
		key_to_key("<C-Esc>", "<Esc>").in_context(Insert),
		key_to_key("s", "cl").in_context(Normal),
		key_to_key("s", "c").in_context(Visual),
		key_to_key("S", "cc").in_context(Normal),
		key_to_key("S", "VdO").in_context(Visual),
		key_to_key("<Home>", "0"),
		key_to_key("<End>", "$"),
		key_to_key("<PageUp>", "<C-b>"),
		key_to_key("<PageDown>", "<C-f>"),
		key_to_key("<CR>", "j^").in_context(Normal),
		key_to_key("<Ins>", "i").in_context(Normal),
		action("<Ins>", A::ToggleOverwrite, no_act()).in_context(Insert),

		motion("H", Mo::MoveToTopLine, MotionArgs { linewise: true, to_jumplist: true, ..none() }),
		motion("M", Mo::MoveToMiddleLine, MotionArgs { linewise: true, to_jumplist: true, ..none() }),
		motion("L", Mo::MoveToBottomLine, MotionArgs { linewise: true, to_jumplist: true, ..none() }),
		motion("h", Mo::MoveByCharacters, fwd(false)),
		motion("l", Mo::MoveByCharacters, fwd(true)),
		motion("j", Mo::MoveByLines, MotionArgs { forward: true, linewise: true, ..none() }),
		motion("k", Mo::MoveByLines, MotionArgs { forward: false, linewise: true, ..none() }),
		motion("gj", Mo::MoveByDisplayLines, fwd(true)),
		motion("gk", Mo::MoveByDisplayLines, fwd(false)),
		motion("w", Mo::MoveByWords, words(true, false, false)),
		motion("W", Mo::MoveByWords, words(true, false, true)),
		motion("e", Mo::MoveByWords, words(true, true, false)),
		motion("E", Mo::MoveByWords, words(true, true, true)),
		motion("b", Mo::MoveByWords, words(false, false, false)),
		motion("B", Mo::MoveByWords, words(false, false, true)),
		motion("ge", Mo::MoveByWords, words(false, true, false)),
		motion("gE", Mo::MoveByWords, words(false, true, true)),
		motion("{", Mo::MoveByParagraph, MotionArgs { forward: false, to_jumplist: true, ..none() }),
		motion("}", Mo::MoveByParagraph, MotionArgs { forward: true, to_jumplist: true, ..none() }),
		motion("(", Mo::MoveBySentence, fwd(false)),
		motion(")", Mo::MoveBySentence, fwd(true)),
		motion("<C-f>", Mo::MoveByPage, fwd(true)),
		motion("<C-b>", Mo::MoveByPage, fwd(false)),
		motion("<C-d>", Mo::MoveByScroll, MotionArgs { forward: true, explicit_repeat: true, ..none() }),
		motion("<C-u>", Mo::MoveByScroll, MotionArgs { forward: false, explicit_repeat: true, ..none() }),
		motion("gg", Mo::MoveToLineOrEdgeOfDocument, MotionArgs { forward: false, explicit_repeat: true, linewise: true, to_jumplist: true, ..none() }),
		motion("G", Mo::MoveToLineOrEdgeOfDocument, MotionArgs { forward: true, explicit_repeat: true, linewise: true, to_jumplist: true, ..none() }),
		motion("g$", Mo::MoveToEndOfDisplayLine, none()),
		motion("g^", Mo::MoveToStartOfDisplayLine, none()),
		motion("g0", Mo::MoveToStartOfDisplayLine, none()),
		motion("0", Mo::MoveToStartOfLine, none()),
		motion("^", Mo::MoveToFirstNonWhiteSpaceCharacter, none()),
		motion("+", Mo::MoveByLines, MotionArgs { forward: true, to_first_char: true, ..none() }),
		motion("-", Mo::MoveByLines, MotionArgs { forward: false, to_first_char: true, ..none() }),
		motion("_", Mo::MoveByLines, MotionArgs { forward: true, to_first_char: true, repeat_offset: -1, ..none() }),
		motion("$", Mo::MoveToEol, MotionArgs { inclusive: true, ..none() }),
		motion("%", Mo::MoveToMatchedSymbol, MotionArgs { inclusive: true, to_jumplist: true, ..none() }),
		motion("f<character>", Mo::MoveToCharacter, MotionArgs { forward: true, inclusive: true, ..none() }),
		motion("F<character>", Mo::MoveToCharacter, fwd(false)),
		motion("t<character>", Mo::MoveTillCharacter, MotionArgs { forward: true, inclusive: true, ..none() }),
		motion("T<character>", Mo::MoveTillCharacter, fwd(false)),
		motion(";", Mo::RepeatLastCharacterSearch, fwd(true)),
		motion(",", Mo::RepeatLastCharacterSearch, fwd(false)),
		motion("'<register>", Mo::GoToMark, MotionArgs { to_jumplist: true, linewise: true, ..none() }),
		motion("`<register>", Mo::GoToMark, MotionArgs { to_jumplist: true, ..none() }),
		motion("]`", Mo::JumpToMark, fwd(true)),
		motion("[`", Mo::JumpToMark, fwd(false)),
		motion("]'", Mo::JumpToMark, MotionArgs { forward: true, linewise: true, ..none() }),
		motion("['", Mo::JumpToMark, MotionArgs { forward: false, linewise: true, ..none() }),
		edit("]p", A::Paste, ActionArgs { after: true, is_edit: true, match_indent: true, ..no_act() }),
		edit("[p", A::Paste, ActionArgs { after: false, is_edit: true, match_indent: true, ..no_act() }),
		motion("]<character>", Mo::MoveToSymbol, MotionArgs { forward: true, to_jumplist: true, ..none() }),
		motion("[<character>", Mo::MoveToSymbol, MotionArgs { forward: false, to_jumplist: true, ..none() }),
		motion("|", Mo::MoveToColumn, none()),
		motion("o", Mo::MoveToOtherHighlightedEnd, none()).in_context(Visual),
		motion("O", Mo::MoveToOtherHighlightedEnd, MotionArgs { same_line: true, ..none() }).in_context(Visual),

		operator("d", Op::Delete, no_op()),
		operator("y", Op::Yank, no_op()),
		operator("c", Op::Change, no_op()),
		operator("=", Op::IndentAuto, no_op()),
		operator(">", Op::Indent, OperatorArgs { indent_right: true, ..no_op() }),
		operator("<", Op::Indent, OperatorArgs { indent_right: false, ..no_op() }),
		operator("g~", Op::ChangeCase, no_op()),
		operator("gu", Op::ChangeCase, OperatorArgs { to_lower: Some(true), ..no_op() }).with_flags(CmdFlags::IS_EDIT),
		operator("gU", Op::ChangeCase, OperatorArgs { to_lower: Some(false), ..no_op() }).with_flags(CmdFlags::IS_EDIT),
		motion("n", Mo::FindNext, MotionArgs { forward: true, to_jumplist: true, ..none() }),
		motion("N", Mo::FindNext, MotionArgs { forward: false, to_jumplist: true, ..none() }),
		motion("gn", Mo::FindAndSelectNextInclusive, fwd(true)),
		motion("gN", Mo::FindAndSelectNextInclusive, fwd(false)),
		operator("gq", Op::HardWrap, no_op()),
		operator("gw", Op::HardWrap, OperatorArgs { keep_cursor: true, ..no_op() }),

		operator_motion("x", Op::Delete, no_op(), Mo::MoveByCharacters, fwd(true), false),
		operator_motion("X", Op::Delete, no_op(), Mo::MoveByCharacters, fwd(false), true),
		operator_motion("D", Op::Delete, no_op(), Mo::MoveToEol, MotionArgs { inclusive: true, ..none() }, false).in_context(Normal),
		operator("D", Op::Delete, OperatorArgs { linewise: true, ..no_op() }).in_context(Visual),
		operator_motion("Y", Op::Yank, no_op(), Mo::ExpandToLine, MotionArgs { linewise: true, ..none() }, false).in_context(Normal),
		operator("Y", Op::Yank, OperatorArgs { linewise: true, ..no_op() }).in_context(Visual),
		operator_motion("C", Op::Change, no_op(), Mo::MoveToEol, MotionArgs { inclusive: true, ..none() }, false).in_context(Normal),
		operator("C", Op::Change, OperatorArgs { linewise: true, ..no_op() }).in_context(Visual),
		operator_motion("~", Op::ChangeCase, OperatorArgs { should_move_cursor: true, ..no_op() }, Mo::MoveByCharacters, fwd(true), false).in_context(Normal),
		operator("~", Op::ChangeCase, no_op()).in_context(Visual),
		operator_motion("<C-u>", Op::Delete, no_op(), Mo::MoveToStartOfLine, none(), false).in_context(Insert),
		operator_motion("<C-w>", Op::Delete, no_op(), Mo::MoveByWords, words(false, false, false), false).in_context(Insert),
		Command::new("<C-w>", CommandKind::Idle).in_context(Normal),

		action("<C-i>", A::JumpListWalk, ActionArgs { forward: true, ..no_act() }),
		action("<C-o>", A::JumpListWalk, ActionArgs { forward: false, ..no_act() }),
		action("<C-e>", A::Scroll, ActionArgs { forward: true, linewise: true, ..no_act() }),
		action("<C-y>", A::Scroll, ActionArgs { forward: false, linewise: true, ..no_act() }),
		edit("a", A::EnterInsertMode, insert_at(InsertAt::CharAfter)).in_context(Normal),
		edit("A", A::EnterInsertMode, insert_at(InsertAt::Eol)).in_context(Normal),
		edit("A", A::EnterInsertMode, insert_at(InsertAt::EndOfSelectedArea)).in_context(Visual),
		edit("i", A::EnterInsertMode, insert_at(InsertAt::Inplace)).in_context(Normal),
		edit("gi", A::EnterInsertMode, insert_at(InsertAt::LastEdit)).in_context(Normal),
		edit("I", A::EnterInsertMode, insert_at(InsertAt::FirstNonBlank)).in_context(Normal),
		edit("gI", A::EnterInsertMode, insert_at(InsertAt::Bol)).in_context(Normal),
		edit("I", A::EnterInsertMode, insert_at(InsertAt::StartOfSelectedArea)).in_context(Visual),
		edit("o", A::NewLineAndEnterInsertMode, ActionArgs { after: true, ..no_act() })
			.with_flags(CmdFlags::INTERLACE_INSERT_REPEAT)
			.in_context(Normal),
		edit("O", A::NewLineAndEnterInsertMode, ActionArgs { after: false, ..no_act() })
			.with_flags(CmdFlags::INTERLACE_INSERT_REPEAT)
			.in_context(Normal),
		action("v", A::ToggleVisualMode, no_act()),
		action("V", A::ToggleVisualMode, ActionArgs { linewise: true, ..no_act() }),
		action("<C-v>", A::ToggleVisualMode, ActionArgs { blockwise: true, ..no_act() }),
		action("<C-q>", A::ToggleVisualMode, ActionArgs { blockwise: true, ..no_act() }),
		action("gv", A::ReselectLastSelection, no_act()),
		edit("J", A::JoinLines, no_act()),
		edit("gJ", A::JoinLines, ActionArgs { keep_spaces: true, ..no_act() }),
		edit("p", A::Paste, ActionArgs { after: true, is_edit: true, ..no_act() }),
		edit("P", A::Paste, ActionArgs { after: false, is_edit: true, ..no_act() }),
		edit("r<character>", A::Replace, no_act()),
		action("@<register>", A::ReplayMacro, no_act()),
		action("q<register>", A::EnterMacroRecordMode, no_act()),
		edit("R", A::EnterInsertMode, ActionArgs { replace: true, ..no_act() }).in_context(Normal),
		operator("R", Op::Change, OperatorArgs { linewise: true, full_line: true, ..no_op() })
			.with_flags(CmdFlags::EXIT_VISUAL_BLOCK)
			.in_context(Visual),
		action("u", A::Undo, no_act()).in_context(Normal),
		operator("u", Op::ChangeCase, OperatorArgs { to_lower: Some(true), ..no_op() })
			.with_flags(CmdFlags::IS_EDIT)
			.in_context(Visual),
		operator("U", Op::ChangeCase, OperatorArgs { to_lower: Some(false), ..no_op() })
			.with_flags(CmdFlags::IS_EDIT)
			.in_context(Visual),
		action("<C-r>", A::Redo, no_act()),
		action("m<register>", A::SetMark, no_act()),
		action("\"<register>", A::SetRegister, no_act()),
		edit("<C-r><register>", A::InsertRegister, no_act()).in_context(Insert),
		action("<C-o>", A::OneNormalCommand, no_act()).in_context(Insert),
		scroll_to_cursor("zz", ScrollPos::Center, false),
		scroll_to_cursor("z.", ScrollPos::Center, true),
		scroll_to_cursor("zt", ScrollPos::Top, false),
		scroll_to_cursor("z<CR>", ScrollPos::Top, true),
		scroll_to_cursor("zb", ScrollPos::Bottom, false),
		scroll_to_cursor("z-", ScrollPos::Bottom, true),
		action(".", A::RepeatLastEdit, no_act()),
		edit("<C-a>", A::IncrementNumberToken, ActionArgs { increase: true, backtrack: false, ..no_act() }),
		edit("<C-x>", A::IncrementNumberToken, ActionArgs { increase: false, backtrack: false, ..no_act() }),
		action("<C-t>", A::Indent, ActionArgs { indent_right: true, ..no_act() }).in_context(Insert),
		action("<C-d>", A::Indent, ActionArgs { indent_right: false, ..no_act() }).in_context(Insert),
		motion("a<register>", Mo::TextObjectManipulation, none()),
		motion("i<register>", Mo::TextObjectManipulation, MotionArgs { text_object_inner: true, ..none() }),
		search("/", true, QuerySrc::Prompt, false),
		search("?", false, QuerySrc::Prompt, false),
		search("*", true, QuerySrc::WordUnderCursor, true),
		search("#", false, QuerySrc::WordUnderCursor, true),
		search("g*", true, QuerySrc::WordUnderCursor, false),
		search("g#", false, QuerySrc::WordUnderCursor, false),
		Command::new(":", CommandKind::Ex),
		fold("zc", FoldCommand::Close, false),
		fold("zC", FoldCommand::Close, true),
		fold("zo", FoldCommand::Open, false),
		fold("zO", FoldCommand::Open, true),
		fold("za", FoldCommand::Toggle, false),
		fold("zA", FoldCommand::Toggle, true),
	]
}
