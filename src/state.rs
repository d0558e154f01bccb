//! Modal state: what one editor is in the middle of, what every editor shares, and the
//! context object command implementations run against.

use std::collections::HashMap;
use std::time::Instant;

use log::trace;

use crate::events::{Event, Mode, ModeInfo, SubMode};
use crate::ex::Substitution;
use crate::history::History;
use crate::host::Host;
use crate::jumplist::JumpList;
use crate::options::{LocalOptions, Scope};
use crate::pos::{Edit, Pos, Range, SelectionMode, EOL};
use crate::register::RegisterController;
use crate::search::SearchQuery;
use crate::text::first_non_ws;
use crate::vicmd::{Command, Motion, MotionArgs, Operator, OperatorArgs};
use crate::Vim;

#[derive(Clone,Copy,PartialEq,Eq,Hash,Debug)]
pub struct EditorId(pub(crate) u64);

/// Characters typed during a partial insert-mode mapping match, so they can be taken back
/// if the mapping completes
#[derive(Clone,Default,PartialEq,Eq,Debug)]
pub struct ChangeQueue {
	pub inserted: String,
	pub removed: Vec<String>
}

/// The command being assembled from keys.
///
/// Transitions take the state by value and hand back the next one.
#[derive(Clone,Default,PartialEq,Eq,Debug)]
pub struct InputState {
	pub prefix_repeat: String,
	pub motion_repeat: String,
	pub operator: Option<Operator>,
	pub operator_args: OperatorArgs,
	pub motion: Option<Motion>,
	pub motion_args: MotionArgs,
	pub key_buffer: Vec<String>,
	pub register_name: Option<char>,
	pub selected_character: Option<char>,
	pub change_queue: Option<ChangeQueue>,
	/// Keys of a multi-key operator, so `gUU` can act like `gUgU`
	pub operator_shortcut: Option<String>,
	pub repeat_override: Option<usize>,
}

impl InputState {
	/// Digits typed before an operator multiply with digits typed after it
	pub fn push_repeat_digit(mut self, digits: &str) -> Self {
		if self.operator.is_none() {
			self.prefix_repeat.push_str(digits);
		} else {
			self.motion_repeat.push_str(digits);
		}
		self
	}
	/// Product of the prefix and motion counts. Zero means no count was typed.
	pub fn get_repeat(&self) -> usize {
		if self.prefix_repeat.is_empty() && self.motion_repeat.is_empty() {
			return 0
		}
		let parse = |s: &str| if s.is_empty() { 1 } else { s.parse::<usize>().unwrap_or(usize::MAX) };
		parse(&self.prefix_repeat).saturating_mul(parse(&self.motion_repeat))
	}
	pub fn with_motion(mut self, motion: Motion, args: MotionArgs) -> Self {
		self.motion = Some(motion);
		self.motion_args = args;
		self
	}
	pub fn with_operator(mut self, operator: Operator, args: OperatorArgs) -> Self {
		self.operator = Some(operator);
		self.operator_args = args;
		self
	}
	pub fn with_register(mut self, name: Option<char>) -> Self {
		self.register_name = name;
		self
	}
	pub fn with_key(mut self, key: &str) -> Self {
		self.key_buffer.push(key.to_string());
		self
	}
}

#[derive(Clone,PartialEq,Eq,Debug)]
pub enum InsertChange {
	Text(String),
	/// Text typed in replace mode, overwriting as many chars as it has
	Overwrite(String),
	/// A key replayed through the insert-mode handler (`<BS>`, `<Del>`, cursor keys)
	Key(String)
}

#[derive(Clone,Default,PartialEq,Eq,Debug)]
pub struct InsertModeChanges {
	pub changes: Vec<InsertChange>,
	/// Height minus one of the block the insert was replicated over
	pub visual_block: usize,
	/// Set when the cursor moved on its own; the next change starts a fresh list
	pub maybe_reset: bool,
}

impl InsertModeChanges {
	pub fn text(&self) -> String {
		self.changes.iter()
			.filter_map(|c| match c {
				InsertChange::Text(s) | InsertChange::Overwrite(s) => Some(s.as_str()),
				InsertChange::Key(_) => None
			})
			.collect()
	}
}

#[derive(Clone,Default,Debug)]
pub struct MacroModeState {
	pub latest_register: Option<char>,
	pub is_playing: bool,
	pub is_recording: bool,
	pub replay_search_queries: Vec<String>,
	pub last_insert_mode_changes: InsertModeChanges,
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub struct LastCharacterSearch {
	/// `t`/`T` stop one short of the char
	pub till: bool,
	pub forward: bool,
	pub selected_character: char
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub struct LastSelection {
	pub anchor: Pos,
	pub head: Pos,
	pub visual_mode: bool,
	pub visual_line: bool,
	pub visual_block: bool
}

#[derive(Clone,Debug)]
pub enum PromptKind {
	Search {
		forward: bool,
		to_jumplist: bool,
		original_query: Option<SearchQuery>
	},
	Ex,
	Confirm(Box<Substitution>)
}

/// The single-line command line. Keys go here while it is open.
#[derive(Clone,Debug)]
pub struct Prompt {
	pub kind: PromptKind,
	pub prefix: String,
	pub value: String
}

/// A `:global` run in progress. Lines are tracked through edits and become `None` once deleted.
#[derive(Clone,Debug)]
pub struct GlobalRun {
	pub lines: Vec<Option<usize>>,
	pub next: usize,
	pub command: String
}

/// Per-editor modal state
#[derive(Clone,Debug)]
pub struct VimState {
	pub input: InputState,
	pub last_edit_input_state: Option<InputState>,
	pub last_edit_action: Option<Command>,
	pub last_hpos: usize,
	pub last_motion: Option<Motion>,
	pub marks: HashMap<char,Pos>,
	pub insert_mode: bool,
	pub insert_mode_return: bool,
	/// Count typed before entering insert mode; the insert is replayed that many times on exit
	pub insert_mode_repeat: usize,
	pub overwrite: bool,
	/// Extra cursors of a block insert, primary first
	pub insert_cursors: Vec<Pos>,
	pub visual_mode: bool,
	pub visual_line: bool,
	pub visual_block: bool,
	pub sel: Range,
	pub last_selection: Option<LastSelection>,
	pub last_pasted_text: Option<String>,
	pub last_edit_pos: Option<Pos>,
	pub options: LocalOptions,
	pub expect_literal_next: bool,
	pub prompt: Option<Prompt>,
	pub global_run: Option<GlobalRun>,
	pub last_insert_key_at: Option<Instant>,
	/// Keys typed towards the current command; `None` right after a command completes
	pub status: Option<String>,
	pub enabled: bool,
}

impl Default for VimState {
	fn default() -> Self {
		Self {
			input: InputState::default(),
			last_edit_input_state: None,
			last_edit_action: None,
			last_hpos: 0,
			last_motion: None,
			marks: HashMap::new(),
			insert_mode: false,
			insert_mode_return: false,
			insert_mode_repeat: 0,
			overwrite: false,
			insert_cursors: vec![],
			visual_mode: false,
			visual_line: false,
			visual_block: false,
			sel: Range::default(),
			last_selection: None,
			last_pasted_text: None,
			last_edit_pos: None,
			options: LocalOptions::new(),
			expect_literal_next: false,
			prompt: None,
			global_run: None,
			last_insert_key_at: None,
			status: None,
			enabled: true,
		}
	}
}

impl VimState {
	pub fn mode_info(&self) -> ModeInfo {
		if self.insert_mode {
			let mode = if self.overwrite { Mode::Replace } else { Mode::Insert };
			return ModeInfo { mode, sub_mode: None }
		}
		if self.visual_mode {
			let sub_mode = if self.visual_line {
				Some(SubMode::Linewise)
			} else if self.visual_block {
				Some(SubMode::Blockwise)
			} else {
				None
			};
			return ModeInfo { mode: Mode::Visual, sub_mode }
		}
		ModeInfo::default()
	}
	pub fn selection_mode(&self) -> SelectionMode {
		if self.visual_line {
			SelectionMode::Line
		} else if self.visual_block {
			SelectionMode::Block
		} else {
			SelectionMode::Char
		}
	}
}

/// State shared by every editor. Thrown away by `Vim::reset_global_state`.
#[derive(Debug,Default)]
pub struct GlobalState {
	pub search_query: Option<SearchQuery>,
	pub search_is_reversed: bool,
	pub last_substitute_replace_part: Option<String>,
	pub jump_list: JumpList,
	pub macro_mode_state: MacroModeState,
	pub last_character_search: Option<LastCharacterSearch>,
	pub registers: RegisterController,
	pub search_history: History,
	pub ex_command_history: History,
}

impl GlobalState {
	pub fn reset(&mut self) {
		let mut registers = std::mem::take(&mut self.registers);
		registers.reset();
		*self = Self { registers, ..Default::default() };
	}
}

/// Everything a command implementation can touch: the host buffer, this editor's modal
/// state and the shared [`Vim`].
pub struct Cx<'a> {
	pub host: &'a mut dyn Host,
	pub vim: &'a mut VimState,
	pub g: &'a mut Vim,
	pub id: EditorId,
	op_depth: usize,
}

impl<'a> Cx<'a> {
	pub fn new(host: &'a mut dyn Host, vim: &'a mut VimState, g: &'a mut Vim, id: EditorId) -> Self {
		Self { host, vim, g, id, op_depth: 0 }
	}

	/// Run `f` as one host operation. Nested calls join the outer operation.
	pub fn operation<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
		if self.op_depth == 0 {
			self.host.begin_operation();
		}
		self.op_depth += 1;
		let result = f(self);
		self.op_depth -= 1;
		if self.op_depth == 0 {
			self.host.end_operation();
		}
		result
	}

	pub fn line_count(&self) -> usize {
		self.host.line_count().max(1)
	}
	pub fn last_line(&self) -> usize {
		self.line_count() - 1
	}
	pub fn line(&self, line: usize) -> String {
		self.host.line(line).into_owned()
	}
	pub fn chars(&self, line: usize) -> Vec<char> {
		self.host.line(line).chars().collect()
	}
	pub fn line_len(&self, line: usize) -> usize {
		self.host.line(line).chars().count()
	}
	pub fn first_non_ws(&self, line: usize) -> Pos {
		Pos::new(line, first_non_ws(&self.chars(line)))
	}

	pub fn cursor(&self) -> Pos {
		self.host.cursor()
	}
	pub fn set_cursor(&mut self, pos: Pos) {
		let pos = self.clip_pos(pos);
		self.host.set_cursor(pos);
	}
	pub fn set_selections(&mut self, ranges: &[Range], primary: usize) {
		self.host.set_selections(ranges, primary);
	}

	/// Clip to the document: any line, any column up to the line's length.
	/// Positions past the last line clip to the end of the buffer.
	pub fn clip_pos(&self, pos: Pos) -> Pos {
		let last = self.last_line();
		if pos.line > last {
			return self.eol_of(last)
		}
		Pos::new(pos.line, pos.ch.min(self.line_len(pos.line)))
	}
	/// Clip to where a cursor may sit in the current mode. Only insert and visual mode may sit past the last char.
	pub fn clip_to_content(&self, pos: Pos) -> Pos {
		let line = pos.line.min(self.last_line());
		let len = self.line_len(line);
		let max_ch = if self.vim.insert_mode || self.vim.visual_mode { len } else { len.saturating_sub(1) };
		Pos::new(line, pos.ch.min(max_ch))
	}

	pub fn get_range(&self, from: Pos, to: Pos) -> String {
		let (from, to) = (self.clip_pos(from.min(to)), self.clip_pos(from.max(to)));
		if from.line == to.line {
			return self.chars(from.line)[from.ch..to.ch].iter().collect()
		}
		let mut out: String = self.chars(from.line)[from.ch..].iter().collect();
		for line in from.line + 1..to.line {
			out.push('\n');
			out.push_str(&self.line(line));
		}
		out.push('\n');
		out.extend(&self.chars(to.line)[..to.ch]);
		out
	}

	/// Replace text and carry every tracked position (marks, jumps, `:global` lines, the last
	/// selection and block-insert cursors) across the edit.
	pub fn replace_range(&mut self, text: &str, from: Pos, to: Pos) {
		let (from, to) = (self.clip_pos(from.min(to)), self.clip_pos(from.max(to)));
		trace!("replace {from}..{to} with {text:?}");
		self.host.replace_range(text, from, to);
		let edit = Edit::new(from, to, text);
		for mark in self.vim.marks.values_mut() {
			*mark = edit.map_pos(*mark);
		}
		if let Some(sel) = self.vim.last_selection.as_mut() {
			sel.anchor = edit.map_pos(sel.anchor);
			sel.head = edit.map_pos(sel.head);
		}
		if let Some(run) = self.vim.global_run.as_mut() {
			for line in run.lines.iter_mut() {
				*line = line.and_then(|l| edit.map_line(l));
			}
		}
		for cursor in self.vim.insert_cursors.iter_mut() {
			*cursor = edit.map_pos(*cursor);
		}
		self.g.global.jump_list.map_edit(self.id, &edit);
		self.vim.last_edit_pos = Some(edit.new_end);
	}
	pub fn replace_selections(&mut self, ranges: &[Range], texts: &[String]) {
		// bottom up so earlier ranges stay valid
		let mut pairs: Vec<(Range,&String)> = ranges.iter().copied().zip(texts).collect();
		pairs.sort_by_key(|(r,_)| std::cmp::Reverse(r.from()));
		for (range, text) in pairs {
			self.replace_range(text, range.from(), range.to());
		}
	}
	pub fn index_from_pos(&self, pos: Pos) -> usize {
		let pos = self.clip_pos(pos);
		(0..pos.line).map(|l| self.line_len(l) + 1).sum::<usize>() + pos.ch
	}
	pub fn pos_from_index(&self, mut index: usize) -> Pos {
		for line in 0..self.line_count() {
			let len = self.line_len(line);
			if index <= len {
				return Pos::new(line, index)
			}
			index -= len + 1;
		}
		Pos::new(self.last_line(), self.line_len(self.last_line()))
	}

	pub fn opt(&self, name: &str) -> crate::options::OptionValue {
		self.g.options.get(name, Some(&self.vim.options), Scope::Both)
			.unwrap_or(crate::options::OptionValue::Bool(false))
	}
	pub fn opt_bool(&self, name: &str) -> bool {
		self.opt(name).as_bool()
	}
	pub fn opt_num(&self, name: &str) -> usize {
		self.opt(name).as_number().max(0) as usize
	}

	pub fn notify(&mut self, msg: &str) {
		self.host.notify(msg);
	}
	pub fn emit(&mut self, event: Event) {
		self.g.events.emit(event);
	}
	pub fn emit_mode(&mut self) {
		let info = self.vim.mode_info();
		self.emit(Event::ModeChange(info));
	}
	pub fn registers(&mut self) -> &mut RegisterController {
		&mut self.g.global.registers
	}
	pub fn is_playing(&self) -> bool {
		self.g.global.macro_mode_state.is_playing
	}

	/// Point a mark at `pos`. Only word chars and the selection marks `<` `>` are settable.
	pub fn update_mark(&mut self, name: char, pos: Pos) {
		if name == '<' || name == '>' || name.is_ascii_alphanumeric() || name == '_' {
			self.vim.marks.insert(name, pos);
		}
	}
	pub fn mark_pos(&mut self, name: char) -> Option<Pos> {
		match name {
			'\'' | '`' => {
				let cursor = self.cursor();
				Some(self.g.global.jump_list.peek(self.id, -1, cursor).unwrap_or_default())
			}
			'.' => self.vim.last_edit_pos,
			_ => self.vim.marks.get(&name).copied()
		}
	}

	/// Turn a visual selection into host ranges. Char mode is inclusive of the head unless
	/// `exclusive`; line mode spans whole lines; block mode yields one range per line.
	pub fn make_selection(&self, sel: Range, mode: SelectionMode, exclusive: bool) -> (Vec<Range>,usize) {
		let Range { mut anchor, mut head } = sel;
		match mode {
			SelectionMode::Char => {
				let head_offset = if !exclusive && !(sel.head < sel.anchor) { 1 } else { 0 };
				let anchor_offset = if sel.head < sel.anchor { 1 } else { 0 };
				head = head.offset_ch(head_offset);
				anchor = anchor.offset_ch(anchor_offset);
				(vec![Range::new(anchor, head)], 0)
			}
			SelectionMode::Line => {
				if !(sel.head < sel.anchor) {
					anchor.ch = 0;
					head.line = head.line.min(self.last_line());
					head.ch = self.line_len(head.line);
				} else {
					head.ch = 0;
					anchor.ch = self.line_len(anchor.line);
				}
				(vec![Range::new(anchor, head)], 0)
			}
			SelectionMode::Block => {
				let top = anchor.line.min(head.line);
				let bottom = anchor.line.max(head.line);
				let (mut from_ch, mut to_ch) = (anchor.ch, head.ch);
				if from_ch < to_ch {
					to_ch = to_ch.saturating_add(1);
				} else {
					from_ch = from_ch.saturating_add(1);
				}
				let ranges = (top..=bottom)
					.map(|line| {
						let len = self.line_len(line);
						Range::new(Pos::new(line, from_ch.min(len)), Pos::new(line, to_ch.min(len)))
					})
					.collect::<Vec<_>>();
				let primary = if head.line == top { 0 } else { ranges.len() - 1 };
				(ranges, primary)
			}
		}
	}
	pub fn update_selection(&mut self) {
		let (ranges, primary) = self.make_selection(self.vim.sel, self.vim.selection_mode(), false);
		self.set_selections(&ranges, primary);
	}
	pub fn update_last_selection(&mut self) {
		let anchor = self.vim.sel.anchor;
		let mut head = self.vim.sel.head;
		if let Some(pasted) = self.vim.last_pasted_text.take() {
			head = self.pos_from_index(self.index_from_pos(anchor) + pasted.chars().count());
		}
		self.vim.last_selection = Some(LastSelection {
			anchor,
			head,
			visual_mode: self.vim.visual_mode,
			visual_line: self.vim.visual_line,
			visual_block: self.vim.visual_block
		});
	}
	/// Selection start and end in document order, from the host's current ranges or the last visual selection
	pub fn selected_area(&self, ranges: &[Range]) -> (Pos,Pos) {
		match (ranges.first(), ranges.last()) {
			(Some(first), Some(last)) => (first.from(), last.to()),
			_ => {
				let cur = self.cursor();
				(cur, cur)
			}
		}
	}
	pub fn eol_of(&self, line: usize) -> Pos {
		Pos::new(line, self.line_len(line))
	}
	/// Resolve `EOL` against the real line length
	pub fn resolve(&self, pos: Pos) -> Pos {
		if pos.ch == EOL { self.eol_of(pos.line.min(self.last_line())) } else { pos }
	}
}
