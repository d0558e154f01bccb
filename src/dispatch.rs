//! Key dispatch: turns keys into commands and commands into motions, operators and actions.
//!
//! Keys arrive one at a time. They are buffered until the keymap resolves them to a command,
//! which then runs as a single host operation. While the command line is open every key
//! goes to it instead.

use std::time::{Duration, Instant};

use log::{debug, error, trace};

use crate::action;
use crate::error::{VimError, VimResult};
use crate::events::Event;
use crate::ex;
use crate::history::History;
use crate::host::ScrollPos;
use crate::keymap::MatchResult;
use crate::keys::{literal_text, split_keys};
use crate::motion::{self, MotionResult};
use crate::operator;
use crate::pos::{Pos, Range, SelectionMode, EOL};
use crate::search::{self, escape_regex, SearchQuery};
use crate::state::{ChangeQueue, Cx, InputState, Prompt, PromptKind, VimState};
use crate::text::{expand_word_under_cursor, WordQuery};
use crate::vicmd::{ActionArgs, CmdFlags, Command, CommandKind, Context, LastSel, Motion, MotionArgs, Operator, OperatorArgs, QuerySrc, SearchArgs};

/// Where a key came from. Keys produced by a mapping are not recorded into macros a second time.
#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum KeyOrigin {
	User,
	Mapping,
	Macro
}

enum Found {
	/// The key was swallowed: buffered, or it finished something by itself
	Consumed,
	/// Nothing wants the key
	Unhandled,
	Command(Command)
}

/// Feed one key. Returns whether the key was used.
///
/// User-facing errors are shown through the host and swallowed. Anything else resets this
/// editor's modal state and is returned.
pub fn handle_key(cx: &mut Cx, key: &str, origin: KeyOrigin) -> VimResult<bool> {
	trace!("key {key:?} from {origin:?}");
	if let Some(prompt) = cx.vim.prompt.take() {
		// search queries are recorded on their own when submitted
		let searching = matches!(prompt.kind, PromptKind::Search { .. });
		if cx.g.global.macro_mode_state.is_recording && !searching && origin != KeyOrigin::Mapping {
			log_key(cx, key);
		}
		return guard(cx, origin, |cx| prompt_key(cx, prompt, key)).map(|_| true)
	}
	let was_insert = cx.vim.insert_mode;
	let found = guard(cx, origin, |cx| {
		if was_insert { find_key_insert_mode(cx, key) } else { find_key_normal_mode(cx, key, origin) }
	})?;
	let command = match found {
		Some(Found::Command(command)) => command,
		Some(Found::Consumed) | None => return Ok(true),
		Some(Found::Unhandled) => {
			if was_insert && cx.vim.insert_mode {
				return Ok(guard(cx, origin, |cx| Ok(action::insert_key(cx, key)))?.unwrap_or(true))
			}
			return Ok(!cx.vim.insert_mode && key.chars().count() == 1)
		}
	};
	if (command.has_operator() || command.is_edit()) && cx.host.read_only() {
		return Ok(true)
	}
	guard(cx, origin, |cx| {
		cx.operation(|cx| match &command.kind {
			CommandKind::KeyToKey(keys) => key_to_key(cx, keys, Some((&command.keys, command.noremap))),
			_ => process_command(cx, &command)
		})
	})?;
	Ok(true)
}

/// Run `f`, turning user-facing errors into notifications. `Ok(None)` means a notification was shown.
fn guard<T>(cx: &mut Cx, origin: KeyOrigin, f: impl FnOnce(&mut Cx) -> VimResult<T>) -> VimResult<Option<T>> {
	match f(cx) {
		Ok(val) => Ok(Some(val)),
		Err(VimError::Notify(msg)) => {
			cx.notify(&msg);
			clear_input_state(cx)?;
			Ok(None)
		}
		Err(e) => {
			// nested dispatch leaves recovery to the outermost key
			if origin == KeyOrigin::User {
				let at = if cx.vim.visual_mode { cx.vim.sel.head } else { cx.host.cursor() };
				let options = std::mem::take(&mut cx.vim.options);
				*cx.vim = VimState { options, ..Default::default() };
				let at = cx.clip_to_content(at);
				cx.host.set_cursor(at);
				if !cx.g.suppress_error_logging {
					error!("{e}");
				}
			}
			Err(e)
		}
	}
}

fn handle_esc(cx: &mut Cx, key: &str) -> VimResult<bool> {
	if key != "<Esc>" {
		return Ok(false)
	}
	if cx.vim.visual_mode {
		action::exit_visual_mode(cx, true);
	} else if cx.vim.insert_mode {
		action::exit_insert_mode(cx, false)?;
	} else {
		return Ok(false)
	}
	clear_input_state(cx)?;
	Ok(true)
}

fn log_key(cx: &mut Cx, key: &str) {
	let macros = &cx.g.global.macro_mode_state;
	if macros.is_playing {
		return
	}
	if let Some(name) = macros.latest_register {
		cx.registers().get_mut(name).push_text(key, false);
	}
}

fn log_search_query(cx: &mut Cx, query: &str) {
	let macros = &cx.g.global.macro_mode_state;
	if !macros.is_recording || macros.is_playing {
		return
	}
	if let Some(name) = macros.latest_register {
		cx.registers().get_mut(name).push_search_query(query);
	}
}

fn find_key_normal_mode(cx: &mut Cx, key: &str, origin: KeyOrigin) -> VimResult<Found> {
	if cx.g.global.macro_mode_state.is_recording {
		if key == "q" {
			action::exit_macro_record_mode(cx);
			clear_input_state(cx)?;
			return Ok(Found::Consumed)
		}
		if origin != KeyOrigin::Mapping {
			log_key(cx, key);
		}
	}
	if handle_esc(cx, key)? {
		return Ok(Found::Consumed)
	}
	cx.vim.input.key_buffer.push(key.to_string());
	let keys = cx.vim.input.key_buffer.concat();
	let digits_len = keys.len() - keys.trim_start_matches(|c: char| c.is_ascii_digit()).len();
	let (digits, rest) = keys.split_at(digits_len);
	// a count on its own, waiting for the command
	if rest.is_empty() && !digits.starts_with('0') {
		return Ok(Found::Consumed)
	}
	let mut main_key = if rest.is_empty() { digits.to_string() } else { rest.to_string() };
	if let Some(shortcut) = &cx.vim.input.operator_shortcut
		&& shortcut.chars().last().is_some_and(|c| main_key.chars().eq([c])) {
		main_key = shortcut.clone();
	}
	let context = if cx.vim.visual_mode { Context::Visual } else { Context::Normal };
	let found = cx.g.keymap.match_command(&main_key, &cx.vim.input, context, cx.g.noremap);
	trace!("{main_key:?} in {context:?}: {found:?}");
	match found {
		MatchResult::None => {
			clear_input_state(cx)?;
			Ok(Found::Unhandled)
		}
		MatchResult::Partial { expect_literal_next } => {
			if expect_literal_next {
				cx.vim.expect_literal_next = true;
			}
			Ok(Found::Consumed)
		}
		MatchResult::Clear => {
			clear_input_state(cx)?;
			Ok(Found::Consumed)
		}
		MatchResult::Full { command, selected_character } => {
			cx.vim.expect_literal_next = false;
			cx.vim.input.key_buffer.clear();
			if selected_character.is_some() {
				cx.vim.input.selected_character = selected_character;
			}
			if !digits.is_empty() && digits != "0" {
				cx.vim.input = std::mem::take(&mut cx.vim.input).push_repeat_digit(digits);
			}
			Ok(Found::Command(command))
		}
	}
}

fn find_key_insert_mode(cx: &mut Cx, key: &str) -> VimResult<Found> {
	if handle_esc(cx, key)? {
		return Ok(Found::Consumed)
	}
	let timeout = Duration::from_millis(cx.opt_num("insertModeEscKeysTimeout") as u64);
	if let Some(at) = cx.vim.last_insert_key_at.take()
		&& !cx.vim.input.key_buffer.is_empty()
		&& at.elapsed() > timeout {
		debug!("pending insert-mode keys {:?} expired", cx.vim.input.key_buffer);
		clear_input_state(cx)?;
	}
	cx.vim.input.key_buffer.push(key.to_string());
	let keys = cx.vim.input.key_buffer.concat();
	let keys_are_chars = key.chars().count() == 1;
	let found = cx.g.keymap.match_command(&keys, &cx.vim.input, Context::Insert, cx.g.noremap);
	match found {
		MatchResult::None => {
			clear_input_state(cx)?;
			Ok(Found::Unhandled)
		}
		MatchResult::Partial { expect_literal_next } => {
			if expect_literal_next {
				cx.vim.expect_literal_next = true;
			}
			if !keys_are_chars {
				return Ok(Found::Consumed)
			}
			// the char is typed now and taken back if the mapping completes
			cx.vim.last_insert_key_at = Some(Instant::now());
			let cursors = action::insert_cursors(cx);
			let mut queue = cx.vim.input.change_queue.take()
				.filter(|q| q.removed.len() == cursors.len())
				.unwrap_or_else(|| ChangeQueue { inserted: String::new(), removed: vec![String::new(); cursors.len()] });
			queue.inserted.push_str(key);
			for (removed, at) in queue.removed.iter_mut().zip(&cursors) {
				let to = if cx.vim.overwrite { at.offset_ch(1) } else { *at };
				removed.push_str(&cx.get_range(*at, to));
			}
			cx.vim.input.change_queue = Some(queue);
			Ok(Found::Unhandled)
		}
		MatchResult::Clear => {
			clear_input_state(cx)?;
			Ok(Found::Consumed)
		}
		MatchResult::Full { command, selected_character } => {
			cx.vim.expect_literal_next = false;
			cx.vim.last_insert_key_at = None;
			cx.vim.input.key_buffer.clear();
			if selected_character.is_some() {
				cx.vim.input.selected_character = selected_character;
			}
			if let Some(queue) = cx.vim.input.change_queue.take() {
				take_back_typed(cx, &queue);
			}
			Ok(Found::Command(command))
		}
	}
}

/// Undo the chars typed while an insert-mode mapping was pending
fn take_back_typed(cx: &mut Cx, queue: &ChangeQueue) {
	let typed = queue.inserted.chars().count();
	let cursors = action::insert_cursors(cx);
	let mut landed = cursors.clone();
	for (i, here) in cursors.iter().enumerate().rev() {
		let from = here.offset_ch(-(typed as isize));
		let removed = queue.removed.get(i).map(String::as_str).unwrap_or("");
		cx.replace_range(removed, from, *here);
		landed[i] = from;
	}
	if cx.vim.insert_cursors.is_empty() {
		cx.set_cursor(landed[0]);
	} else {
		cx.vim.insert_cursors = landed;
	}
	if !cx.is_playing() {
		let changes = &mut cx.g.global.macro_mode_state.last_insert_mode_changes.changes;
		changes.truncate(changes.len().saturating_sub(typed));
	}
}

/// Drop whatever command was being assembled. Also where `<C-o>` returns to insert mode.
pub fn clear_input_state(cx: &mut Cx) -> VimResult<()> {
	cx.vim.input = InputState::default();
	cx.vim.expect_literal_next = false;
	cx.vim.status = None;
	cx.emit(Event::CommandDone);
	if cx.vim.insert_mode_return && !cx.vim.visual_mode {
		cx.vim.insert_mode_return = false;
		if !cx.vim.insert_mode {
			action::enter_insert_mode(cx, &ActionArgs::default(), 1)?;
		}
	}
	Ok(())
}

/// Feed `keys` as if typed. `from` names the mapping or Ex command producing them and whether
/// its keys skip user mappings; a mapping that reaches itself again stops there.
pub fn key_to_key(cx: &mut Cx, keys: &str, from: Option<(&str,bool)>) -> VimResult<()> {
	let noremap_before = cx.g.noremap;
	if let Some((name, noremap)) = from {
		if cx.g.key_to_key_stack.iter().any(|k| k == name) {
			debug!("recursive mapping {name:?} ignored");
			return Ok(())
		}
		cx.g.key_to_key_stack.push(name.to_string());
		cx.g.noremap = noremap;
	}
	let result = split_keys(keys)
		.iter()
		.try_for_each(|key| handle_key(cx, key, KeyOrigin::Mapping).map(|_| ()));
	if from.is_some() {
		cx.g.key_to_key_stack.pop();
	}
	cx.g.noremap = if cx.g.key_to_key_stack.is_empty() { false } else { noremap_before };
	result
}

pub fn process_command(cx: &mut Cx, command: &Command) -> VimResult<()> {
	debug!("command {:?}: {:?}", command.keys, command.kind);
	cx.vim.input.repeat_override = command.repeat_override;
	match &command.kind {
		CommandKind::Motion(motion, args) => process_motion(cx, motion, args),
		CommandKind::Operator(op, args) => process_operator(cx, command, op, args),
		CommandKind::OperatorMotion { operator, operator_args, motion, motion_args, visual_line } => {
			let visual_mode = cx.vim.visual_mode;
			if visual_mode && *visual_line {
				cx.vim.visual_line = true;
			}
			process_operator(cx, command, operator, operator_args)?;
			if !visual_mode {
				process_motion(cx, motion, motion_args)?;
			}
			Ok(())
		}
		CommandKind::Action { .. } => process_action(cx, command),
		CommandKind::Search(args) => process_search(cx, args),
		CommandKind::Ex => {
			let value = if cx.vim.visual_mode { "'<,'>" } else { "" };
			open_prompt(cx, PromptKind::Ex, ":", value);
			Ok(())
		}
		CommandKind::KeyToEx(input) => ex::process_command(cx, input),
		CommandKind::KeyToKey(keys) => key_to_key(cx, keys, Some((&command.keys, command.noremap))),
		CommandKind::Idle => Ok(())
	}
}

fn process_motion(cx: &mut Cx, motion: &Motion, args: &MotionArgs) -> VimResult<()> {
	let input = std::mem::take(&mut cx.vim.input);
	cx.vim.input = input.with_motion(motion.clone(), args.clone());
	eval_input(cx, false)
}

fn process_operator(cx: &mut Cx, command: &Command, op: &Operator, args: &OperatorArgs) -> VimResult<()> {
	if let Some(pending) = &cx.vim.input.operator {
		// `dd`, `>>`, `gUU`
		if pending == op {
			let line_args = MotionArgs { linewise: true, ..Default::default() };
			let input = std::mem::take(&mut cx.vim.input);
			cx.vim.input = input.with_motion(Motion::ExpandToLine, line_args);
			return eval_input(cx, false)
		}
		clear_input_state(cx)?;
	}
	let input = std::mem::take(&mut cx.vim.input);
	cx.vim.input = input.with_operator(op.clone(), args.clone());
	if command.keys.chars().count() > 1 {
		cx.vim.input.operator_shortcut = Some(command.keys.clone());
	}
	if command.flags.contains(CmdFlags::EXIT_VISUAL_BLOCK) {
		cx.vim.visual_block = false;
		cx.update_selection();
	}
	if cx.vim.visual_mode {
		eval_input(cx, false)?;
	}
	Ok(())
}

fn process_action(cx: &mut Cx, command: &Command) -> VimResult<()> {
	let CommandKind::Action { action, args, motion } = &command.kind else {
		return Ok(())
	};
	let input = cx.vim.input.clone();
	let repeat = input.get_repeat();
	let mut args = args.clone();
	if input.selected_character.is_some() {
		args.selected_character = input.selected_character;
	}
	if let Some((motion, motion_args)) = motion {
		process_motion(cx, motion, motion_args)?;
	}
	args.repeat = repeat.max(1);
	args.repeat_is_explicit = repeat > 0;
	args.register_name = input.register_name;
	clear_input_state(cx)?;
	cx.vim.last_motion = None;
	if command.is_edit() {
		record_last_edit(cx, input, Some(command.clone()));
	}
	action::eval_action(cx, action, &args)
}

/// Remember the command for `.`. Nothing is recorded while a macro or `.` is replaying.
fn record_last_edit(cx: &mut Cx, input: InputState, action: Option<Command>) -> bool {
	if cx.is_playing() {
		return false
	}
	cx.vim.last_edit_input_state = Some(input);
	cx.vim.last_edit_action = action;
	let sel = cx.vim.sel;
	let visual_block = if cx.vim.visual_block { sel.head.line.abs_diff(sel.anchor.line) } else { 0 };
	let changes = &mut cx.g.global.macro_mode_state.last_insert_mode_changes;
	changes.changes.clear();
	changes.maybe_reset = false;
	changes.visual_block = visual_block;
	true
}

/// Resolve the assembled input: run the motion, then the operator over the range it spans.
///
/// `replaying` is set by `.`, whose recorded state is refreshed just like a fresh recording.
fn eval_input(cx: &mut Cx, replaying: bool) -> VimResult<()> {
	let input = cx.vim.input.clone();
	let mut motion_args = input.motion_args.clone();
	let mut operator_args = input.operator_args.clone();
	let mut sel = cx.vim.sel;
	let (old_head, old_anchor) = if cx.vim.visual_mode {
		(cx.clip_to_content(sel.head), cx.clip_to_content(sel.anchor))
	} else {
		(cx.cursor(), cx.cursor())
	};
	let recorded = input.operator.is_some() && record_last_edit(cx, input.clone(), None);

	let mut repeat = input.repeat_override.unwrap_or_else(|| input.get_repeat());
	if repeat > 0 && motion_args.explicit_repeat {
		motion_args.repeat_is_explicit = true;
	} else if motion_args.no_repeat || (!motion_args.explicit_repeat && repeat == 0) {
		repeat = 1;
		motion_args.repeat_is_explicit = false;
	}
	if let Some(ch) = input.selected_character {
		motion_args.selected_character = Some(ch);
		operator_args.selected_character = Some(ch);
	}
	motion_args.repeat = repeat;
	clear_input_state(cx)?;

	let mut new_head: Option<Pos> = None;
	let mut new_anchor: Option<Pos> = None;
	if let Some(motion) = &input.motion {
		let result = motion::eval_motion(cx, motion, old_head, &mut motion_args, &input)?;
		cx.vim.last_motion = Some(motion.clone());
		let Some(result) = result else {
			return Ok(())
		};
		let (anchor, mut head) = match result {
			MotionResult::Head(head) => (None, head),
			MotionResult::Range(anchor, head) => (Some(anchor), head)
		};
		if motion_args.to_jumplist {
			let from = cx.g.global.jump_list.cached_cursor.take().unwrap_or(old_head);
			let to = cx.resolve(head);
			motion::record_jump_position(cx, from, to);
		}
		if cx.vim.visual_mode {
			// `$` in block mode keeps extending every line to its end
			if !(cx.vim.visual_block && head.ch == EOL) {
				head = cx.clip_to_content(head);
			}
			let anchor = anchor.map(|a| cx.clip_to_content(a)).unwrap_or(old_anchor);
			sel = Range::new(anchor, head);
			cx.vim.sel = sel;
			cx.update_selection();
			cx.update_mark('<', anchor.min(head));
			cx.update_mark('>', anchor.max(head));
		} else if input.operator.is_none() {
			head = cx.clip_to_content(head);
			cx.set_cursor(head);
		}
		new_head = Some(cx.resolve(head));
		new_anchor = anchor.map(|a| cx.resolve(a));
	}

	let Some(op) = &input.operator else {
		return Ok(())
	};
	if let Some(last) = operator_args.last_sel {
		// `.` after a visual operator: rebuild a selection of the same shape at the cursor
		let anchor = old_anchor;
		let line_offset = last.head.line.abs_diff(last.anchor.line);
		let ch_offset = last.head.ch.abs_diff(last.anchor.ch);
		let head = if last.visual_line {
			Pos::new(anchor.line + line_offset, anchor.ch)
		} else if last.visual_block {
			Pos::new(anchor.line + line_offset, anchor.ch + ch_offset)
		} else if last.head.line == last.anchor.line {
			Pos::new(anchor.line, anchor.ch + ch_offset)
		} else {
			Pos::new(anchor.line + line_offset, anchor.ch)
		};
		new_anchor = Some(anchor);
		new_head = Some(head);
		cx.vim.visual_mode = true;
		cx.vim.visual_line = last.visual_line;
		cx.vim.visual_block = last.visual_block;
		sel = Range::new(anchor, head);
		cx.vim.sel = sel;
		cx.update_selection();
	} else if cx.vim.visual_mode {
		operator_args.last_sel = Some(LastSel {
			anchor: sel.anchor,
			head: sel.head,
			visual_line: cx.vim.visual_line,
			visual_block: cx.vim.visual_block
		});
	}

	let linewise;
	let (mut ranges, primary);
	if cx.vim.visual_mode {
		let (start, end) = (sel.head.min(sel.anchor), sel.head.max(sel.anchor));
		linewise = cx.vim.visual_line || operator_args.linewise;
		let mode = if cx.vim.visual_block {
			SelectionMode::Block
		} else if linewise {
			SelectionMode::Line
		} else {
			SelectionMode::Char
		};
		(ranges, primary) = cx.make_selection(Range::new(start, end), mode, false);
		if linewise {
			match mode {
				SelectionMode::Block => {
					for range in ranges.iter_mut() {
						range.head.ch = cx.line_len(range.head.line);
					}
				}
				SelectionMode::Line => ranges[0].head = Pos::new(ranges[0].head.line + 1, 0),
				SelectionMode::Char => {}
			}
		}
	} else {
		let mut start = new_anchor.unwrap_or(old_anchor);
		let mut end = new_head.unwrap_or(old_head);
		if end < start {
			std::mem::swap(&mut start, &mut end);
		}
		linewise = motion_args.linewise || operator_args.linewise;
		if linewise {
			start.ch = 0;
			end = Pos::new(end.line + 1, 0);
		} else if motion_args.forward {
			motion::clip_to_line(cx, start, &mut end);
		}
		let exclusive = !motion_args.inclusive || linewise;
		(ranges, primary) = cx.make_selection(Range::new(start, end), SelectionMode::Char, exclusive);
	}
	cx.set_selections(&ranges, primary);
	cx.vim.last_motion = None;
	operator_args.repeat = repeat;
	operator_args.register_name = input.register_name;
	operator_args.linewise = linewise;
	if (recorded || replaying) && let Some(last) = cx.vim.last_edit_input_state.as_mut() {
		last.operator_args = operator_args.clone();
		last.motion_args = motion_args.clone();
	}
	let move_to = operator::eval_operator(cx, op, &operator_args, &ranges, old_anchor, new_head.unwrap_or(old_head))?;
	if cx.vim.visual_mode {
		action::exit_visual_mode(cx, move_to.is_some());
	}
	if let Some(pos) = move_to {
		cx.set_cursor(pos);
	}
	Ok(())
}

/// `.`: replay the last edit `repeat` times. With `repeat_for_insert` only the typed text is
/// replayed, for the count of a command like `3i`.
pub fn repeat_last_edit(cx: &mut Cx, repeat: usize, repeat_for_insert: bool) -> VimResult<()> {
	let Some(last_input) = cx.vim.last_edit_input_state.clone() else {
		return Ok(())
	};
	let last_action = cx.vim.last_edit_action.clone();
	cx.g.global.macro_mode_state.is_playing = true;
	let cached_input = std::mem::replace(&mut cx.vim.input, last_input.clone());
	let is_action = last_action.is_some();
	let result = (|| -> VimResult<()> {
		let run_command = |cx: &mut Cx| -> VimResult<()> {
			match &last_action {
				Some(command) => {
					cx.vim.input = last_input.clone();
					process_action(cx, command)
				}
				None => {
					cx.vim.input = cx.vim.last_edit_input_state.clone().unwrap_or_default();
					eval_input(cx, true)
				}
			}
		};
		let repeat_insert = |cx: &mut Cx, repeat: usize| {
			let changes = cx.g.global.macro_mode_state.last_insert_mode_changes.changes.clone();
			if !changes.is_empty() {
				let repeat = if is_action { repeat } else { 1 };
				action::repeat_insert_mode_changes(cx, &changes, repeat);
			}
		};
		let interlace = last_action.as_ref().is_some_and(|c| c.flags.contains(CmdFlags::INTERLACE_INSERT_REPEAT));
		if interlace {
			for _ in 0..repeat {
				run_command(cx)?;
				repeat_insert(cx, 1);
			}
		} else {
			if !repeat_for_insert {
				run_command(cx)?;
			}
			repeat_insert(cx, repeat);
		}
		Ok(())
	})();
	cx.vim.input = cached_input;
	let result = result.and_then(|_| {
		if cx.vim.insert_mode && !repeat_for_insert {
			action::exit_insert_mode(cx, false)?;
		}
		Ok(())
	});
	cx.g.global.macro_mode_state.is_playing = false;
	result
}

/// Parse and install a search query, highlighting its matches when `hlsearch` is on.
/// An empty pattern leaves the previous query in place and returns `None`.
pub fn update_search_query(cx: &mut Cx, raw: &str, ignore_case: bool, smart_case: bool) -> VimResult<Option<SearchQuery>> {
	if raw.is_empty() {
		return Ok(None)
	}
	let pcre = cx.opt_bool("pcre");
	let Some(query) = search::parse_query(raw, ignore_case, smart_case, pcre)? else {
		return Ok(None)
	};
	if cx.opt_bool("hlsearch") {
		cx.host.highlight_search(Some(&query.regex));
	}
	if cx.g.global.search_query.as_ref() != Some(&query) {
		debug!("search query {query:?}");
		cx.g.global.search_query = Some(query.clone());
	}
	Ok(Some(query))
}

fn process_search(cx: &mut Cx, args: &SearchArgs) -> VimResult<()> {
	cx.g.global.search_is_reversed = !args.forward;
	match args.query_src {
		QuerySrc::Prompt => {
			if cx.is_playing() {
				let queries = &mut cx.g.global.macro_mode_state.replay_search_queries;
				let query = if queries.is_empty() { String::new() } else { queries.remove(0) };
				return handle_query(cx, &query, true, false, args.to_jumplist)
			}
			let original_query = cx.g.global.search_query.clone();
			let prefix = if args.forward { "/" } else { "?" };
			let kind = PromptKind::Search { forward: args.forward, to_jumplist: args.to_jumplist, original_query };
			open_prompt(cx, kind, prefix, "");
			Ok(())
		}
		QuerySrc::WordUnderCursor => {
			let cursor = cx.cursor();
			let keyword = WordQuery { no_symbol: true, ..Default::default() };
			let any = WordQuery { no_symbol: false, ..Default::default() };
			let (word, is_keyword) = match expand_word_under_cursor(&*cx.host, cursor, keyword) {
				Some(word) => (word, true),
				None => match expand_word_under_cursor(&*cx.host, cursor, any) {
					Some(word) => (word, false),
					None => {
						cx.notify("No word under cursor");
						return clear_input_state(cx)
					}
				}
			};
			let text = cx.get_range(word.0, word.1);
			let query = if is_keyword && args.whole_word_only {
				format!(r"\b{text}\b")
			} else {
				escape_regex(&text)
			};
			cx.g.global.jump_list.cached_cursor = Some(cursor);
			cx.set_cursor(word.0);
			handle_query(cx, &query, true, false, args.to_jumplist)
		}
	}
}

fn handle_query(cx: &mut Cx, query: &str, ignore_case: bool, smart_case: bool, to_jumplist: bool) -> VimResult<()> {
	let history = &mut cx.g.global.search_history;
	history.push_input(query);
	history.reset();
	if let Err(e) = update_search_query(cx, query, ignore_case, smart_case) {
		cx.notify(&e.to_string());
		return clear_input_state(cx)
	}
	let args = MotionArgs { forward: true, to_jumplist, ..Default::default() };
	process_motion(cx, &Motion::FindNext, &args)
}

fn open_prompt(cx: &mut Cx, kind: PromptKind, prefix: &str, value: &str) {
	cx.host.show_prompt(prefix, value);
	cx.vim.prompt = Some(Prompt { kind, prefix: prefix.to_string(), value: value.to_string() });
}

fn prompt_history<'a>(cx: &'a mut Cx<'_>, is_search: bool) -> &'a mut History {
	if is_search {
		&mut cx.g.global.search_history
	} else {
		&mut cx.g.global.ex_command_history
	}
}

/// A key typed while the command line is open
fn prompt_key(cx: &mut Cx, mut prompt: Prompt, key: &str) -> VimResult<()> {
	let kind = match prompt.kind {
		PromptKind::Confirm(sub) => return ex::confirm_key(cx, *sub, prompt.prefix, key),
		kind => kind
	};
	let is_search = matches!(kind, PromptKind::Search { .. });
	let cancel = matches!(key, "<Esc>" | "<C-c>" | "<C-[>") || (key == "<BS>" && prompt.value.is_empty());
	if cancel {
		let history = prompt_history(cx, is_search);
		history.push_input(&prompt.value);
		history.reset();
		if let PromptKind::Search { original_query, .. } = kind {
			cx.g.global.search_query = original_query;
			cx.host.highlight_search(None);
		}
		cx.host.close_prompt();
		return clear_input_state(cx)
	}
	match key {
		"<CR>" => {
			cx.host.close_prompt();
			return submit_prompt(cx, kind, prompt.value)
		}
		"<Up>" | "<Down>" => prompt.value = prompt_history(cx, is_search).next_match(&prompt.value, key == "<Up>"),
		"<Left>" | "<Right>" => {}
		_ => {
			match key {
				"<BS>" => {
					prompt.value.pop();
				}
				"<C-u>" => prompt.value.clear(),
				_ => {
					if let Some(text) = literal_text(key) {
						prompt.value.push_str(text);
					}
				}
			}
			prompt_history(cx, is_search).reset();
		}
	}
	if let PromptKind::Search { forward, .. } = &kind {
		incremental_search(cx, &prompt.value, *forward);
	}
	cx.host.show_prompt(&prompt.prefix, &prompt.value);
	prompt.kind = kind;
	cx.vim.prompt = Some(prompt);
	Ok(())
}

/// Highlight and scroll to the match for the query typed so far
fn incremental_search(cx: &mut Cx, raw: &str, forward: bool) {
	let query = update_search_query(cx, raw, true, true).ok().flatten();
	match query {
		Some(query) => {
			let cursor = cx.cursor();
			if let Some(pos) = search::find_next(&*cx.host, cursor, !forward, &query, 1) {
				cx.host.scroll_to(pos.line, ScrollPos::Center);
			}
		}
		None => cx.host.highlight_search(None)
	}
}

fn submit_prompt(cx: &mut Cx, kind: PromptKind, value: String) -> VimResult<()> {
	match kind {
		PromptKind::Search { to_jumplist, .. } => {
			if !value.is_empty() {
				cx.registers().get_mut('/').set_text(&value, false, false);
			}
			handle_query(cx, &value, true, true, to_jumplist)?;
			log_search_query(cx, &value);
			Ok(())
		}
		PromptKind::Ex => {
			let history = &mut cx.g.global.ex_command_history;
			history.push_input(&value);
			history.reset();
			ex::process_command(cx, &value)?;
			clear_input_state(cx)
		}
		PromptKind::Confirm(_) => Ok(())
	}
}
