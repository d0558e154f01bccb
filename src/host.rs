//! The capability surface a host editor exposes to the core.
//!
//! Only the first five methods are required. Everything else has a default that either
//! does nothing or tells the core to fall back to its own implementation.

use std::borrow::Cow;

use log::info;
use regex::Regex;
use unicode_width::UnicodeWidthStr;

use crate::options::OptionValue;
use crate::pos::{Pos, Range};

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum TokenKind {
	Comment,
	String,
	Code
}

#[derive(Default,Clone,Copy,PartialEq,Eq,Debug)]
pub enum ScrollPos {
	Top,
	#[default]
	Center,
	Bottom
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum FoldCommand {
	Open,
	Close,
	Toggle
}

/// First and last fully visible rows
#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub struct VisibleLines {
	pub top: usize,
	pub bottom: usize
}

pub trait Host {
	fn line_count(&self) -> usize;
	fn line(&self, line: usize) -> Cow<'_, str>;
	/// Replace the text between `from` and `to` (half-open, char columns) with `text`.
	fn replace_range(&mut self, text: &str, from: Pos, to: Pos);
	fn cursor(&self) -> Pos;
	fn set_cursor(&mut self, pos: Pos);

	/// Show a selection. `primary` indexes the range that owns the cursor.
	fn set_selections(&mut self, ranges: &[Range], primary: usize) {
		if let Some(range) = ranges.get(primary) {
			self.set_cursor(range.head);
		}
	}
	fn token_type_at(&self, _pos: Pos) -> Option<TokenKind> {
		None
	}
	/// Position of the bracket matching the one just before `pos`. `None` makes the core scan for itself.
	fn find_matching_bracket(&self, _pos: Pos) -> Option<Pos> {
		None
	}
	/// Folded line range containing `line`, if any
	fn fold_at(&self, _line: usize) -> Option<(usize,usize)> {
		None
	}
	fn fold(&mut self, _cmd: FoldCommand, _all: bool, _line: usize) {}
	fn visible_lines(&self) -> VisibleLines {
		VisibleLines { top: 0, bottom: self.line_count().saturating_sub(1) }
	}
	fn scroll_to(&mut self, _line: usize, _pos: ScrollPos) {}
	fn scroll_by(&mut self, _lines: isize) {}
	fn begin_operation(&mut self) {}
	fn end_operation(&mut self) {}
	fn notify(&mut self, msg: &str) {
		info!("{msg}");
	}
	fn show_prompt(&mut self, _prefix: &str, _text: &str) {}
	fn close_prompt(&mut self) {}
	fn highlight_search(&mut self, _query: Option<&Regex>) {}
	/// Returns false when there was nothing to undo
	fn undo(&mut self) -> bool {
		false
	}
	fn redo(&mut self) -> bool {
		false
	}
	fn read_only(&self) -> bool {
		false
	}
	fn save(&mut self) {}
	/// Reflow `from..=to` at `column`. Returns the last row of the reflowed text, or `None` if unsupported.
	fn hard_wrap(&mut self, _from: usize, _to: usize, _column: usize) -> Option<usize> {
		None
	}
	fn auto_indent(&mut self, _from: usize, _to: usize) {}
	fn option_changed(&mut self, _name: &str, _value: &OptionValue) {}
	/// Move by `delta` display rows. `None` falls back to buffer lines.
	fn display_line_move(&mut self, _pos: Pos, _delta: isize) -> Option<Pos> {
		None
	}
}

#[derive(Clone,Debug,PartialEq)]
struct Snapshot {
	lines: Vec<String>,
	cursor: Pos
}

/// A plain in-memory document implementing [`Host`].
///
/// Undo history is grouped by operation: everything between the outermost
/// `begin_operation`/`end_operation` pair becomes one undo step.
#[derive(Debug)]
pub struct TextBuffer {
	lines: Vec<String>,
	cursor: Pos,
	selections: Vec<Range>,
	undo_stack: Vec<Snapshot>,
	redo_stack: Vec<Snapshot>,
	op_depth: usize,
	op_start: Option<Snapshot>,
	pub messages: Vec<String>,
	pub prompt: Option<String>,
	pub highlight: Option<String>,
	pub saves: usize,
	pub read_only: bool,
	pub visible: Option<VisibleLines>,
}

impl Default for TextBuffer {
	fn default() -> Self {
		Self {
			lines: vec![String::new()],
			cursor: Pos::default(),
			selections: vec![],
			undo_stack: vec![],
			redo_stack: vec![],
			op_depth: 0,
			op_start: None,
			messages: vec![],
			prompt: None,
			highlight: None,
			saves: 0,
			read_only: false,
			visible: None,
		}
	}
}

impl TextBuffer {
	pub fn new(text: &str) -> Self {
		Self {
			lines: text.split('\n').map(str::to_string).collect(),
			..Default::default()
		}
	}
	pub fn with_cursor(mut self, line: usize, ch: usize) -> Self {
		self.cursor = self.clip(Pos::new(line, ch));
		self
	}
	pub fn text(&self) -> String {
		self.lines.join("\n")
	}
	pub fn lines(&self) -> &[String] {
		&self.lines
	}
	pub fn selections(&self) -> &[Range] {
		&self.selections
	}
	pub fn last_message(&self) -> Option<&str> {
		self.messages.last().map(|s| s.as_str())
	}
	fn clip(&self, pos: Pos) -> Pos {
		let line = pos.line.min(self.lines.len().saturating_sub(1));
		let len = self.lines.get(line).map(|l| l.chars().count()).unwrap_or(0);
		Pos::new(line, pos.ch.min(len))
	}
	fn byte_idx(line: &str, ch: usize) -> usize {
		line.char_indices().nth(ch).map(|(i,_)| i).unwrap_or(line.len())
	}
	fn snapshot(&self) -> Snapshot {
		Snapshot { lines: self.lines.clone(), cursor: self.cursor }
	}
	fn restore(&mut self, snap: Snapshot) {
		self.lines = snap.lines;
		self.cursor = self.clip(snap.cursor);
		self.selections.clear();
		// keep an open operation from recording the restore as a new edit
		if self.op_depth > 0 {
			self.op_start = Some(self.snapshot());
		}
	}
}

impl Host for TextBuffer {
	fn line_count(&self) -> usize {
		self.lines.len()
	}
	fn line(&self, line: usize) -> Cow<'_, str> {
		match self.lines.get(line) {
			Some(l) => Cow::Borrowed(l.as_str()),
			None => Cow::Borrowed("")
		}
	}
	fn replace_range(&mut self, text: &str, from: Pos, to: Pos) {
		let (from, to) = (self.clip(from.min(to)), self.clip(from.max(to)));
		if self.op_depth == 0 {
			// edits outside an operation are their own undo step
			self.undo_stack.push(self.snapshot());
			self.redo_stack.clear();
		}
		let head = &self.lines[from.line];
		let prefix = head[..Self::byte_idx(head, from.ch)].to_string();
		let tail = &self.lines[to.line];
		let suffix = tail[Self::byte_idx(tail, to.ch)..].to_string();
		let joined = format!("{prefix}{text}{suffix}");
		let new_lines: Vec<String> = joined.split('\n').map(str::to_string).collect();
		self.lines.splice(from.line..=to.line, new_lines);
		let edit = crate::pos::Edit::new(from, to, text);
		self.cursor = self.clip(edit.map_pos(self.cursor));
	}
	fn cursor(&self) -> Pos {
		self.cursor
	}
	fn set_cursor(&mut self, pos: Pos) {
		self.cursor = self.clip(pos);
		self.selections.clear();
	}
	fn set_selections(&mut self, ranges: &[Range], primary: usize) {
		if let Some(range) = ranges.get(primary) {
			self.cursor = self.clip(range.head);
		}
		self.selections = ranges.to_vec();
	}
	fn visible_lines(&self) -> VisibleLines {
		self.visible.unwrap_or(VisibleLines { top: 0, bottom: self.lines.len().saturating_sub(1) })
	}
	fn begin_operation(&mut self) {
		if self.op_depth == 0 {
			self.op_start = Some(self.snapshot());
		}
		self.op_depth += 1;
	}
	fn end_operation(&mut self) {
		self.op_depth = self.op_depth.saturating_sub(1);
		if self.op_depth == 0 && let Some(start) = self.op_start.take() && start.lines != self.lines {
			self.undo_stack.push(start);
			self.redo_stack.clear();
		}
	}
	fn notify(&mut self, msg: &str) {
		self.messages.push(msg.to_string());
	}
	fn show_prompt(&mut self, prefix: &str, text: &str) {
		self.prompt = Some(format!("{prefix}{text}"));
	}
	fn close_prompt(&mut self) {
		self.prompt = None;
	}
	fn highlight_search(&mut self, query: Option<&Regex>) {
		self.highlight = query.map(|q| q.as_str().to_string());
	}
	fn undo(&mut self) -> bool {
		let Some(snap) = self.undo_stack.pop() else {
			return false
		};
		self.redo_stack.push(self.snapshot());
		self.restore(snap);
		true
	}
	fn redo(&mut self) -> bool {
		let Some(snap) = self.redo_stack.pop() else {
			return false
		};
		self.undo_stack.push(self.snapshot());
		self.restore(snap);
		true
	}
	fn read_only(&self) -> bool {
		self.read_only
	}
	fn save(&mut self) {
		self.saves += 1;
	}
	fn hard_wrap(&mut self, from: usize, to: usize, column: usize) -> Option<usize> {
		let last = self.lines.len().saturating_sub(1);
		let (from, to) = (from.min(last), to.min(last));
		let mut out: Vec<String> = vec![];
		let mut row = from;
		while row <= to {
			// gather one paragraph of non-empty lines sharing the first line's indent
			if self.lines[row].trim().is_empty() {
				out.push(self.lines[row].clone());
				row += 1;
				continue
			}
			let indent: String = self.lines[row].chars().take_while(|c| c.is_whitespace()).collect();
			let mut words: Vec<String> = vec![];
			while row <= to && !self.lines[row].trim().is_empty() {
				words.extend(self.lines[row].split_whitespace().map(str::to_string));
				row += 1;
			}
			let mut current = indent.clone();
			for word in words {
				let fits = current.trim().is_empty() || current.width() + 1 + word.width() <= column;
				if !fits {
					out.push(std::mem::replace(&mut current, indent.clone()));
				}
				if !current.trim().is_empty() {
					current.push(' ');
				}
				current.push_str(&word);
			}
			out.push(current);
		}
		let new_last = from + out.len().saturating_sub(1);
		let end = Pos::new(to, self.lines[to].chars().count());
		self.replace_range(&out.join("\n"), Pos::new(from, 0), end);
		Some(new_last)
	}
}
