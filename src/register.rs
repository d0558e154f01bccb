use std::collections::HashMap;

use crate::clipboard::{Clipboard, MemoryClipboard};
use crate::state::InsertModeChanges;

/// Registers that are valid besides the word characters
const SPECIAL_REGISTERS: [char;7] = ['-', '"', '.', ':', '_', '/', '+'];

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum RegisterOp {
	Yank,
	Delete,
	Change
}

/// A register's contents.
///
/// Text is kept as a list of chunks so that macro recording can push keys one at a time.
/// Reading a register joins the chunks.
#[derive(Clone,Default,PartialEq,Debug)]
pub struct Register {
	pub key_buffer: Vec<String>,
	pub insert_mode_changes: Vec<InsertModeChanges>,
	pub search_queries: Vec<String>,
	pub linewise: bool,
	pub blockwise: bool,
}

impl Register {
	pub fn new(text: &str, linewise: bool, blockwise: bool) -> Self {
		Self {
			key_buffer: vec![text.to_string()],
			linewise,
			blockwise,
			..Default::default()
		}
	}
	pub fn set_text(&mut self, text: &str, linewise: bool, blockwise: bool) {
		self.key_buffer = vec![text.to_string()];
		self.linewise = linewise;
		self.blockwise = blockwise;
	}
	/// Append to the register. Appending linewise text to a charwise register starts a new line first.
	pub fn push_text(&mut self, text: &str, linewise: bool) {
		if linewise {
			if !self.linewise {
				self.key_buffer.push("\n".into());
			}
			self.linewise = true;
		}
		self.key_buffer.push(text.to_string());
	}
	pub fn push_insert_mode_changes(&mut self, changes: InsertModeChanges) {
		self.insert_mode_changes.push(changes);
	}
	pub fn push_search_query(&mut self, query: &str) {
		self.search_queries.push(query.to_string());
	}
	pub fn clear(&mut self) {
		self.key_buffer.clear();
		self.insert_mode_changes.clear();
		self.search_queries.clear();
		self.linewise = false;
	}
	pub fn text(&self) -> String {
		self.key_buffer.concat()
	}
}

pub fn is_valid_register(name: char) -> bool {
	SPECIAL_REGISTERS.contains(&name) || name.is_ascii_alphanumeric()
}

pub struct RegisterController {
	registers: HashMap<char,Register>,
	clipboard: Box<dyn Clipboard>,
}

impl std::fmt::Debug for RegisterController {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RegisterController").field("registers", &self.registers).finish_non_exhaustive()
	}
}

impl Default for RegisterController {
	fn default() -> Self {
		Self::new(Box::new(MemoryClipboard::default()))
	}
}

impl RegisterController {
	pub fn new(clipboard: Box<dyn Clipboard>) -> Self {
		let registers = ['"', '.', ':', '/', '+'].into_iter()
			.map(|name| (name, Register::default()))
			.collect();
		Self { registers, clipboard }
	}
	/// Throw away every register but keep the clipboard backend
	pub fn reset(&mut self) {
		let clipboard = std::mem::replace(&mut self.clipboard, Box::new(MemoryClipboard::default()));
		*self = Self::new(clipboard);
	}
	pub fn set_clipboard(&mut self, clipboard: Box<dyn Clipboard>) {
		self.clipboard = clipboard;
	}

	/// Store text produced by an operator.
	///
	/// With no (valid) register named, yanks land in `0`, multi-line deletes shift the numbered
	/// registers and land in `1`, and small deletes land in `-`. The unnamed register always mirrors
	/// the result.
	pub fn push_text(&mut self, name: Option<char>, op: RegisterOp, text: &str, linewise: bool, blockwise: bool) {
		if name == Some('_') {
			return
		}
		let mut text = text.to_string();
		if linewise && !text.ends_with('\n') {
			text.push('\n');
		}
		let Some(name) = name.filter(|n| is_valid_register(*n)) else {
			match op {
				RegisterOp::Yank => {
					self.registers.insert('0', Register::new(&text, linewise, blockwise));
				}
				RegisterOp::Delete | RegisterOp::Change => {
					if text.contains('\n') {
						self.shift_numeric_registers();
						self.registers.insert('1', Register::new(&text, linewise, false));
					} else {
						self.registers.insert('-', Register::new(&text, linewise, false));
					}
				}
			}
			self.unnamed_mut().set_text(&text, linewise, blockwise);
			return
		};
		let register = self.get_mut(name);
		if name.is_uppercase() {
			register.push_text(&text, linewise);
		} else {
			register.set_text(&text, linewise, blockwise);
		}
		let joined = register.text();
		if name == '+' {
			self.clipboard.set(text);
		}
		self.unnamed_mut().set_text(&joined, linewise, false);
	}

	/// Look up a register. Invalid names resolve to the unnamed register and uppercase names to
	/// their lowercase counterpart. Missing registers are created empty.
	pub fn get_mut(&mut self, name: char) -> &mut Register {
		let key = if is_valid_register(name) { name.to_lowercase().next().unwrap_or(name) } else { '"' };
		self.registers.entry(key).or_default()
	}
	/// Read-only lookup with the same name resolution as [`Self::get_mut`].
	/// The `+` register is read through from the clipboard.
	pub fn get(&mut self, name: Option<char>) -> Register {
		let name = name.unwrap_or('"');
		if name == '+' && let Some(text) = self.clipboard.get() {
			let reg = self.get_mut('+');
			if reg.text() != text {
				reg.set_text(&text, text.ends_with('\n'), false);
			}
		}
		self.get_mut(name).clone()
	}
	pub fn peek(&self, name: char) -> Option<&Register> {
		self.registers.get(&name)
	}
	pub fn unnamed_mut(&mut self) -> &mut Register {
		self.registers.entry('"').or_default()
	}
	/// Registers in listing order: unnamed, numbered, named, then the specials
	pub fn listing(&self) -> Vec<(char,&Register)> {
		let order = "\"0123456789abcdefghijklmnopqrstuvwxyz-.:/+";
		order.chars()
			.filter_map(|name| self.registers.get(&name).map(|reg| (name, reg)))
			.collect()
	}
	fn shift_numeric_registers(&mut self) {
		for i in (2..=9u32).rev() {
			let (Some(dst), Some(src)) = (char::from_digit(i, 10), char::from_digit(i - 1, 10)) else {
				continue
			};
			let prev = self.get_mut(src).clone();
			self.registers.insert(dst, prev);
		}
	}
}
