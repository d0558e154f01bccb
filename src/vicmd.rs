use std::sync::Arc;

use bitflags::bitflags;

use crate::host::{FoldCommand, ScrollPos};
use crate::pos::Pos;

#[derive(Clone,Copy,PartialEq,Eq,Hash,Debug)]
pub enum Context {
	Normal,
	Insert,
	Visual,
	OperatorPending
}

impl Context {
	pub fn parse(s: &str) -> Option<Self> {
		match s {
			"normal" => Some(Self::Normal),
			"insert" => Some(Self::Insert),
			"visual" => Some(Self::Visual),
			"operatorPending" => Some(Self::OperatorPending),
			_ => None
		}
	}
}

bitflags! {
	#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct CmdFlags: u32 {
		/// The command changes the buffer: recorded for `.` and refused on read-only hosts
		const IS_EDIT = 1<<0;
		/// With a count, `.` alternates running the command and replaying the insert (`3o`)
		const INTERLACE_INSERT_REPEAT = 1<<1;
		const EXIT_VISUAL_BLOCK = 1<<2;
	}
}

#[derive(Clone,PartialEq,Eq,Hash,Debug)]
pub enum Motion {
	ExpandToLine,
	FindNext,
	FindAndSelectNextInclusive,
	GoToMark,
	MoveToOtherHighlightedEnd,
	JumpToMark,
	MoveByCharacters,
	MoveByLines,
	MoveByDisplayLines,
	MoveByPage,
	MoveByScroll,
	MoveByParagraph,
	MoveBySentence,
	MoveByWords,
	MoveTillCharacter,
	MoveToCharacter,
	RepeatLastCharacterSearch,
	MoveToSymbol,
	MoveToColumn,
	MoveToEol,
	MoveToFirstNonWhiteSpaceCharacter,
	MoveToMatchedSymbol,
	MoveToStartOfLine,
	MoveToLineOrEdgeOfDocument,
	MoveToTopLine,
	MoveToMiddleLine,
	MoveToBottomLine,
	MoveToStartOfDisplayLine,
	MoveToEndOfDisplayLine,
	TextObjectManipulation,
	Custom(Arc<str>)
}

impl Motion {
	/// Vertical motions keep the remembered column instead of resetting it
	pub fn keeps_hpos(&self) -> bool {
		matches!(self,
			Self::MoveByLines |
			Self::MoveByDisplayLines |
			Self::MoveByScroll |
			Self::MoveToColumn |
			Self::MoveToEol
		)
	}
}

#[derive(Clone,Default,PartialEq,Eq,Debug)]
pub struct MotionArgs {
	pub forward: bool,
	pub linewise: bool,
	pub inclusive: bool,
	pub to_jumplist: bool,
	pub explicit_repeat: bool,
	pub no_repeat: bool,
	pub word_end: bool,
	pub big_word: bool,
	pub to_first_char: bool,
	pub repeat_offset: isize,
	pub same_line: bool,
	pub text_object_inner: bool,
	pub keep_hpos: bool,
	pub repeat: usize,
	pub repeat_is_explicit: bool,
	pub selected_character: Option<char>,
}

#[derive(Clone,PartialEq,Eq,Hash,Debug)]
pub enum Operator {
	Change,
	Delete,
	Yank,
	Indent,
	IndentAuto,
	HardWrap,
	ChangeCase,
	Custom(Arc<str>)
}

/// Where the previous visual selection sat relative to its anchor, so `.` can rebuild it
#[derive(Clone,Copy,Default,PartialEq,Eq,Debug)]
pub struct LastSel {
	pub anchor: Pos,
	pub head: Pos,
	pub visual_line: bool,
	pub visual_block: bool
}

#[derive(Clone,Default,PartialEq,Eq,Debug)]
pub struct OperatorArgs {
	pub linewise: bool,
	pub full_line: bool,
	pub indent_right: bool,
	pub to_lower: Option<bool>,
	pub should_move_cursor: bool,
	pub keep_cursor: bool,
	pub repeat: usize,
	pub register_name: Option<char>,
	pub last_sel: Option<LastSel>,
	pub selected_character: Option<char>,
}

#[derive(Clone,PartialEq,Eq,Hash,Debug)]
pub enum Action {
	JumpListWalk,
	Scroll,
	ScrollToCursor,
	ReplayMacro,
	EnterMacroRecordMode,
	ToggleOverwrite,
	EnterInsertMode,
	ToggleVisualMode,
	ReselectLastSelection,
	JoinLines,
	NewLineAndEnterInsertMode,
	Paste,
	Undo,
	Redo,
	SetRegister,
	InsertRegister,
	OneNormalCommand,
	SetMark,
	Replace,
	IncrementNumberToken,
	RepeatLastEdit,
	Indent,
	Fold,
	Custom(Arc<str>)
}

#[derive(Clone,Copy,Default,PartialEq,Eq,Debug)]
pub enum InsertAt {
	#[default]
	Inplace,
	CharAfter,
	Eol,
	Bol,
	FirstNonBlank,
	StartOfSelectedArea,
	EndOfSelectedArea,
	LastEdit
}

#[derive(Clone,Default,PartialEq,Eq,Debug)]
pub struct ActionArgs {
	pub forward: bool,
	pub linewise: bool,
	pub blockwise: bool,
	pub insert_at: InsertAt,
	pub replace: bool,
	pub after: bool,
	pub is_edit: bool,
	pub match_indent: bool,
	pub keep_spaces: bool,
	pub position: ScrollPos,
	pub increase: bool,
	pub backtrack: bool,
	pub indent_right: bool,
	pub fold: Option<FoldCommand>,
	pub all: bool,
	pub repeat: usize,
	pub repeat_is_explicit: bool,
	pub register_name: Option<char>,
	pub selected_character: Option<char>,
	/// Overrides the cursor as the insert position
	pub head: Option<Pos>,
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum QuerySrc {
	Prompt,
	WordUnderCursor
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub struct SearchArgs {
	pub forward: bool,
	pub query_src: QuerySrc,
	pub whole_word_only: bool,
	pub to_jumplist: bool
}

#[derive(Clone,PartialEq,Eq,Debug)]
pub enum CommandKind {
	Motion(Motion, MotionArgs),
	Operator(Operator, OperatorArgs),
	OperatorMotion {
		operator: Operator,
		operator_args: OperatorArgs,
		motion: Motion,
		motion_args: MotionArgs,
		/// In visual mode, extend the selection to whole lines first (`X`)
		visual_line: bool,
	},
	Action {
		action: Action,
		args: ActionArgs,
		/// Motion evaluated before the action runs (`z.` lands on the first non-blank)
		motion: Option<(Motion,MotionArgs)>,
	},
	Search(SearchArgs),
	Ex,
	KeyToEx(String),
	KeyToKey(String),
	Idle
}

/// One keymap entry
#[derive(Clone,PartialEq,Eq,Debug)]
pub struct Command {
	pub keys: String,
	pub context: Option<Context>,
	pub kind: CommandKind,
	pub flags: CmdFlags,
	/// Only meaningful for `KeyToKey`: whether the produced keys may trigger user mappings
	pub noremap: bool,
	pub repeat_override: Option<usize>,
}

impl Command {
	pub fn new(keys: &str, kind: CommandKind) -> Self {
		Self {
			keys: keys.to_string(),
			context: None,
			kind,
			flags: CmdFlags::empty(),
			noremap: false,
			repeat_override: None
		}
	}
	pub fn in_context(mut self, ctx: Context) -> Self {
		self.context = Some(ctx);
		self
	}
	pub fn with_flags(mut self, flags: CmdFlags) -> Self {
		self.flags |= flags;
		self
	}
	pub fn is_edit(&self) -> bool {
		self.flags.contains(CmdFlags::IS_EDIT)
	}
	pub fn is_action(&self) -> bool {
		matches!(self.kind, CommandKind::Action { .. })
	}
	pub fn has_operator(&self) -> bool {
		matches!(self.kind, CommandKind::Operator(..) | CommandKind::OperatorMotion { .. })
	}
	/// Keys ending in `<character>` or `<register>` take one literal key as an argument
	pub fn placeholder(&self) -> Option<&'static str> {
		["<character>", "<register>"].into_iter().find(|p| self.keys.ends_with(p))
	}
}
