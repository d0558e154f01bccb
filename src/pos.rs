//! Cursor and range algebra.
//!
//! Positions are zero-based `(line, ch)` pairs where `ch` counts chars, not bytes.
//! Ordering is lexicographic on `(line, ch)`, which the derived `Ord` gives us for free.

use std::fmt::Display;

/// Column sentinel meaning "end of line". Clipped against the real line length wherever it is used.
pub const EOL: usize = usize::MAX;

#[derive(Default,Clone,Copy,PartialEq,Eq,PartialOrd,Ord,Hash,Debug)]
pub struct Pos {
	pub line: usize,
	pub ch: usize
}

impl Pos {
	pub const fn new(line: usize, ch: usize) -> Self {
		Self { line, ch }
	}
	pub const fn eol(line: usize) -> Self {
		Self { line, ch: EOL }
	}
	pub fn with_ch(self, ch: usize) -> Self {
		Self { ch, ..self }
	}
	pub fn with_line(self, line: usize) -> Self {
		Self { line, ..self }
	}
	/// Column offset that saturates at zero and at `EOL` instead of wrapping.
	pub fn offset_ch(self, delta: isize) -> Self {
		let ch = if delta < 0 {
			self.ch.saturating_sub(delta.unsigned_abs())
		} else {
			self.ch.saturating_add(delta as usize)
		};
		Self { ch, ..self }
	}
	pub fn offset_line(self, delta: isize) -> Self {
		let line = if delta < 0 {
			self.line.saturating_sub(delta.unsigned_abs())
		} else {
			self.line.saturating_add(delta as usize)
		};
		Self { line, ..self }
	}
	pub fn is_eol(&self) -> bool {
		self.ch == EOL
	}
}

impl Display for Pos {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.is_eol() {
			write!(f, "({},$)", self.line)
		} else {
			write!(f, "({},{})", self.line, self.ch)
		}
	}
}

pub fn cursor_min(a: Pos, b: Pos) -> Pos {
	a.min(b)
}

pub fn cursor_max(a: Pos, b: Pos) -> Pos {
	a.max(b)
}

/// Strict betweenness: `a < b < c`
pub fn cursor_is_between(a: Pos, b: Pos, c: Pos) -> bool {
	a < b && b < c
}

/// A selection range. `anchor` is the fixed end, `head` is the end that moves.
/// Ranges handed to the host are half-open: the char at `to()` is not included.
#[derive(Default,Clone,Copy,PartialEq,Eq,Hash,Debug)]
pub struct Range {
	pub anchor: Pos,
	pub head: Pos
}

impl Range {
	pub const fn new(anchor: Pos, head: Pos) -> Self {
		Self { anchor, head }
	}
	pub const fn cursor(pos: Pos) -> Self {
		Self { anchor: pos, head: pos }
	}
	pub fn from(&self) -> Pos {
		self.anchor.min(self.head)
	}
	pub fn to(&self) -> Pos {
		self.anchor.max(self.head)
	}
	pub fn is_empty(&self) -> bool {
		self.anchor == self.head
	}
	pub fn is_reversed(&self) -> bool {
		self.head < self.anchor
	}
}

/// How a range of text is interpreted by an operator
#[derive(Default,Clone,Copy,PartialEq,Eq,Debug)]
pub enum SelectionMode {
	#[default]
	Char,
	Line,
	Block
}

/// A buffer replacement, recorded so tracked positions (marks, jumps, line handles) can follow it.
#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub struct Edit {
	pub from: Pos,
	pub to: Pos,
	/// End of the inserted text in post-edit coordinates
	pub new_end: Pos,
	inserted_newlines: usize,
	whole_line: bool,
}

impl Edit {
	pub fn new(from: Pos, to: Pos, text: &str) -> Self {
		let inserted_newlines = text.matches('\n').count();
		let new_end = match text.rsplit_once('\n') {
			Some((_,tail)) => Pos::new(from.line + inserted_newlines, tail.chars().count()),
			None => Pos::new(from.line, from.ch + text.chars().count())
		};
		let whole_line = from.ch == 0 && to.ch == 0 && (text.is_empty() || text.ends_with('\n'));
		Self { from, to, new_end, inserted_newlines, whole_line }
	}

	pub fn line_delta(&self) -> isize {
		self.inserted_newlines as isize - (self.to.line as isize - self.from.line as isize)
	}

	/// Map a position through this edit. Positions inside the replaced span collapse onto its start,
	/// and a position sitting exactly at the insertion point stays in front of the new text.
	pub fn map_pos(&self, pos: Pos) -> Pos {
		if pos <= self.from {
			return pos
		}
		if pos < self.to {
			return self.from
		}
		if pos.line == self.to.line {
			let ch = if pos.is_eol() { EOL } else { self.new_end.ch + (pos.ch - self.to.ch) };
			Pos::new(self.new_end.line, ch)
		} else {
			pos.offset_line(self.line_delta())
		}
	}

	/// Map a line through this edit, treating lines as objects.
	/// Returns `None` when the edit removed the line.
	pub fn map_line(&self, line: usize) -> Option<usize> {
		let (first_removed, last_removed) = if self.whole_line {
			(self.from.line, self.to.line)
		} else {
			(self.from.line + 1, self.to.line + 1)
		};
		if line < first_removed {
			Some(line)
		} else if line < last_removed {
			None
		} else {
			let shifted = line as isize + self.line_delta();
			Some(shifted.max(0) as usize)
		}
	}
}
