use crate::pos::{Edit, Pos};
use crate::state::EditorId;

const JUMP_LIST_SIZE: usize = 100;

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
struct JumpMark {
	editor: EditorId,
	pos: Pos
}

/// Bounded circular list of jump positions shared by every editor.
///
/// Entries belong to the editor that recorded them; other editors skip over them as if they were gone.
#[derive(Clone,Debug)]
pub struct JumpList {
	buffer: Vec<Option<JumpMark>>,
	pointer: isize,
	head: isize,
	tail: isize,
	/// Where `*`/`#` started, so the jump is recorded from there rather than from the word start
	pub cached_cursor: Option<Pos>,
}

impl Default for JumpList {
	fn default() -> Self {
		Self {
			buffer: vec![None; JUMP_LIST_SIZE],
			pointer: -1,
			head: 0,
			tail: 0,
			cached_cursor: None
		}
	}
}

impl JumpList {
	fn slot(&self, pointer: isize) -> usize {
		pointer.rem_euclid(JUMP_LIST_SIZE as isize) as usize
	}
	fn find_mark(&self, editor: EditorId, pointer: isize) -> Option<Pos> {
		self.buffer[self.slot(pointer)].filter(|m| m.editor == editor).map(|m| m.pos)
	}
	fn use_next_slot(&mut self, editor: EditorId, pos: Pos) {
		self.pointer += 1;
		let slot = self.slot(self.pointer);
		self.buffer[slot] = Some(JumpMark { editor, pos });
	}

	/// Record a jump from `old` to `new`. `old` is skipped when the current entry already sits there.
	pub fn add(&mut self, editor: EditorId, old: Pos, new: Pos) {
		match self.buffer[self.slot(self.pointer)] {
			Some(mark) => {
				if mark.editor == editor && mark.pos != old {
					self.use_next_slot(editor, old);
				}
			}
			None => self.use_next_slot(editor, old)
		}
		self.use_next_slot(editor, new);
		self.head = self.pointer;
		self.tail = (self.pointer - JUMP_LIST_SIZE as isize + 1).max(0);
	}

	/// Move the pointer by `offset`, skipping entries that are gone or equal to `cursor`
	pub fn step(&mut self, editor: EditorId, offset: isize, cursor: Pos) -> Option<Pos> {
		self.pointer = (self.pointer + offset).clamp(self.tail, self.head.max(self.tail));
		let has_entry = self.buffer[self.slot(self.pointer)].is_some();
		let mut found = self.find_mark(editor, self.pointer);
		if has_entry && found.is_none() {
			let inc = if offset > 0 { 1 } else { -1 };
			loop {
				self.pointer += inc;
				found = self.find_mark(editor, self.pointer);
				if found.is_some_and(|pos| pos != cursor) {
					break
				}
				if !(self.pointer < self.head && self.pointer > self.tail) {
					break
				}
			}
		}
		found
	}

	/// Like [`Self::step`] but leaves the pointer where it was
	pub fn peek(&mut self, editor: EditorId, offset: isize, cursor: Pos) -> Option<Pos> {
		let old = self.pointer;
		let found = self.step(editor, offset, cursor);
		self.pointer = old;
		found
	}

	pub fn map_edit(&mut self, editor: EditorId, edit: &Edit) {
		for mark in self.buffer.iter_mut().flatten() {
			if mark.editor == editor {
				mark.pos = edit.map_pos(mark.pos);
			}
		}
	}
}
