//! A modal Vim keybinding engine for embedding in text editors.
//!
//! The engine owns no text. A host implements [`Host`] over its buffer, wraps it in an
//! [`Editor`], and feeds keys through [`Vim::handle_key`]. Everything shared between editors
//! (registers, the keymap, search and jump history, options) lives in [`Vim`].

pub mod action;
pub mod clipboard;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod ex;
pub mod history;
pub mod host;
pub mod jumplist;
pub mod keymap;
pub mod keys;
pub mod motion;
pub mod operator;
pub mod options;
pub mod pos;
pub mod register;
pub mod registry;
pub mod search;
pub mod state;
pub mod text;
pub mod vicmd;

#[cfg(test)]
mod tests;

use log::{debug, trace};

use crate::dispatch::KeyOrigin;
use crate::events::{EventKind, Event, ModeInfo, Subscription};
use crate::ex::ExCommands;
use crate::keymap::Keymap;
use crate::keys::{split_keys, vim_key_from_event, KeyEvent, Langmap};
use crate::options::{OptionValue, Options, Scope};
use crate::registry::{ActionFn, ExFn, MotionFn, OperatorFn, Registry};
use crate::state::{Cx, EditorId, GlobalState, VimState};
use crate::vicmd::{Command, Context};

pub use crate::error::{VimError, VimResult};
pub use crate::host::{Host, TextBuffer};
pub use crate::pos::Pos;

/// One host buffer under Vim control, with its own modal state
#[derive(Debug)]
pub struct Editor<H: Host> {
	host: H,
	vim: VimState,
	id: EditorId,
}

impl<H: Host> Editor<H> {
	pub fn host(&self) -> &H {
		&self.host
	}
	pub fn host_mut(&mut self) -> &mut H {
		&mut self.host
	}
	pub fn into_host(self) -> H {
		self.host
	}
	pub fn state(&self) -> &VimState {
		&self.vim
	}
	pub fn mode(&self) -> ModeInfo {
		self.vim.mode_info()
	}
	pub fn is_enabled(&self) -> bool {
		self.vim.enabled
	}

	/// Text for a status bar: the mode name followed by the keys of the command being typed
	pub fn status_text(&self) -> String {
		if self.vim.insert_mode {
			return "INSERT".into()
		}
		let mut status = String::new();
		if self.vim.visual_mode {
			status.push_str("VISUAL");
			if self.vim.visual_line {
				status.push_str(" LINE");
			}
			if self.vim.visual_block {
				status.push_str(" BLOCK");
			}
		}
		if let Some(pending) = self.vim.status.as_deref().filter(|s| !s.is_empty()) {
			if !status.is_empty() {
				status.push(' ');
			}
			status.push_str(pending);
		}
		status
	}

	/// Start handling keys again, in normal mode
	pub fn enter_vim_mode(&mut self, vim: &mut Vim) {
		if self.vim.enabled {
			return
		}
		let options = std::mem::take(&mut self.vim.options);
		self.vim = VimState { options, ..Default::default() };
		self.vim.status = None;
		vim.events.emit(Event::ModeChange(self.vim.mode_info()));
	}
	/// Stop handling keys. Modal state is dropped; keys are reported unhandled until re-entered.
	pub fn leave_vim_mode(&mut self) {
		if self.vim.prompt.take().is_some() {
			self.host.close_prompt();
		}
		self.host.highlight_search(None);
		let at = if self.vim.visual_mode { self.vim.sel.head } else { self.host.cursor() };
		let options = std::mem::take(&mut self.vim.options);
		self.vim = VimState { options, enabled: false, ..Default::default() };
		self.collapse_selection(at);
	}

	/// Drop any host selection, leaving a normal-mode cursor at `at`
	fn collapse_selection(&mut self, at: Pos) {
		let line = at.line.min(self.host.line_count().saturating_sub(1));
		let len = self.host.line(line).chars().count();
		self.host.set_cursor(Pos::new(line, at.ch.min(len.saturating_sub(1))));
	}
}

/// Engine state shared by every [`Editor`]
#[derive(Debug)]
pub struct Vim {
	pub global: GlobalState,
	pub keymap: Keymap,
	pub ex: ExCommands,
	pub options: Options,
	pub registry: Registry,
	pub events: events::Events,
	/// Set while the keys of a `noremap` mapping are being fed
	pub noremap: bool,
	/// Mappings currently expanding, innermost last
	pub key_to_key_stack: Vec<String>,
	pub langmap: Langmap,
	/// Keep faults out of the log, for tests that provoke them
	pub suppress_error_logging: bool,
	next_editor_id: u64,
}

impl Default for Vim {
	fn default() -> Self {
		Self {
			global: GlobalState::default(),
			keymap: Keymap::new(),
			ex: ExCommands::new(),
			options: Options::default(),
			registry: Registry::default(),
			events: events::Events::default(),
			noremap: false,
			key_to_key_stack: vec![],
			langmap: Langmap::default(),
			suppress_error_logging: false,
			next_editor_id: 0,
		}
	}
}

impl Vim {
	pub fn new() -> Self {
		Self::default()
	}

	/// Put `host` under Vim control
	pub fn editor<H: Host>(&mut self, host: H) -> Editor<H> {
		let id = EditorId(self.next_editor_id);
		self.next_editor_id += 1;
		trace!("attached editor {id:?}");
		Editor { host, vim: VimState::default(), id }
	}

	/// Forget searches, macros, jumps, history and register contents. The clipboard backend
	/// is kept.
	pub fn reset_global_state(&mut self) {
		debug!("resetting global state");
		self.global.reset();
		self.key_to_key_stack.clear();
		self.noremap = false;
	}

	pub fn options(&self) -> &Options {
		&self.options
	}
	pub fn options_mut(&mut self) -> &mut Options {
		&mut self.options
	}
	/// Apply a JSON object of option values, e.g. `{"tabstop": 2}`. Returns the names that were set.
	pub fn load_options_json(&mut self, json: &str) -> VimResult<Vec<String>> {
		let changed = self.options.load_json(json)?;
		if changed.iter().any(|name| self.options.resolve(name) == Some("langmap")) {
			let source = self.options.get("langmap", None, Scope::Global)?.as_str();
			self.langmap = Langmap::parse(&source);
		}
		Ok(changed)
	}
	pub fn define_option(&mut self, name: &str, default: OptionValue, aliases: &[&str]) {
		self.options.define(name, default, aliases);
	}

	/// Feed one key name such as `x`, `<C-w>` or `<Esc>`. Returns whether the key was used.
	///
	/// A fault counts as unhandled; use [`Vim::try_handle_key`] to see it.
	pub fn handle_key<H: Host>(&mut self, editor: &mut Editor<H>, key: &str) -> bool {
		self.try_handle_key(editor, key, KeyOrigin::User).unwrap_or(false)
	}

	pub fn try_handle_key<H: Host>(&mut self, editor: &mut Editor<H>, key: &str, origin: KeyOrigin) -> VimResult<bool> {
		if !editor.vim.enabled {
			return Ok(false)
		}
		let vim = &editor.vim;
		if key == "<Esc>" && !vim.insert_mode && !vim.visual_mode && vim.prompt.is_none() {
			editor.host.highlight_search(None);
		}
		if editor.vim.status.is_none() {
			editor.vim.status = Some(String::new());
		}
		let result = {
			let mut cx = Cx::new(&mut editor.host, &mut editor.vim, self, editor.id);
			dispatch::handle_key(&mut cx, key, origin)
		};
		match (&result, editor.vim.status.as_mut()) {
			(Ok(true), Some(status)) => status.push_str(key),
			(_, None) => editor.vim.status = Some(String::new()),
			_ => {}
		}
		result
	}

	/// Feed a whole key sequence, e.g. `d2w` or `ihello<Esc>`
	pub fn handle_keys<H: Host>(&mut self, editor: &mut Editor<H>, seq: &str) -> VimResult<()> {
		for key in split_keys(seq) {
			self.try_handle_key(editor, &key, KeyOrigin::User)?;
		}
		Ok(())
	}

	/// Run one Ex command line, with or without the leading `:`
	pub fn handle_ex<H: Host>(&mut self, editor: &mut Editor<H>, input: &str) -> VimResult<()> {
		if !editor.vim.enabled {
			return Ok(())
		}
		let mut cx = Cx::new(&mut editor.host, &mut editor.vim, self, editor.id);
		ex::process_command(&mut cx, input)
	}

	/// Key name for a host key event. The langmap is skipped while a literal char is expected.
	pub fn key_from_event<H: Host>(&self, editor: &Editor<H>, event: &KeyEvent) -> Option<String> {
		let vim = &editor.vim;
		let literal = vim.expect_literal_next || vim.insert_mode || vim.prompt.is_some();
		vim_key_from_event(event, &self.langmap, literal)
	}

	/// Drop insert-mode keys waiting on a longer mapping. Chars typed so far stay in the buffer.
	pub fn expire_pending_keys<H: Host>(&mut self, editor: &mut Editor<H>) -> VimResult<()> {
		if !editor.vim.insert_mode || editor.vim.input.key_buffer.is_empty() {
			return Ok(())
		}
		debug!("expiring pending keys {:?}", editor.vim.input.key_buffer);
		editor.vim.last_insert_key_at = None;
		let mut cx = Cx::new(&mut editor.host, &mut editor.vim, self, editor.id);
		dispatch::clear_input_state(&mut cx)
	}

	/// `lhs` keys produce `rhs` keys. A `:name` lhs maps an Ex command instead.
	pub fn map(&mut self, lhs: &str, rhs: &str, context: Option<Context>) -> VimResult<()> {
		ex::map_keys(self, lhs, rhs, context, false)
	}
	/// Like [`Vim::map`], but the produced keys skip user mappings
	pub fn noremap(&mut self, lhs: &str, rhs: &str, context: Option<Context>) -> VimResult<()> {
		ex::map_keys(self, lhs, rhs, context, true)
	}
	pub fn unmap(&mut self, lhs: &str, context: Option<Context>) -> VimResult<bool> {
		ex::unmap_keys(self, lhs, context)
	}
	pub fn mapclear(&mut self, context: Option<Context>) {
		self.keymap.mapclear(context);
	}
	/// Bind keys straight to a command, e.g. a motion registered with [`Vim::define_motion`]
	pub fn map_command(&mut self, command: Command) {
		self.keymap.push_front(command);
	}

	pub fn define_motion(&mut self, name: &str, func: MotionFn) {
		self.registry.define_motion(name, func);
	}
	pub fn define_operator(&mut self, name: &str, func: OperatorFn) {
		self.registry.define_operator(name, func);
	}
	pub fn define_action(&mut self, name: &str, func: ActionFn) {
		self.registry.define_action(name, func);
	}
	/// Register an Ex command. `prefix` is the shortest abbreviation that runs it.
	pub fn define_ex(&mut self, name: &str, prefix: Option<&str>, func: ExFn) -> VimResult<()> {
		self.ex.define(name, prefix)?;
		self.registry.define_ex(name, func);
		Ok(())
	}

	pub fn subscribe(&mut self, kind: EventKind, listener: impl FnMut(&Event) + 'static) -> Subscription {
		self.events.subscribe(kind, listener)
	}
	pub fn unsubscribe(&mut self, sub: Subscription) -> bool {
		self.events.unsubscribe(sub)
	}
}
