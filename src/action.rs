//! Actions: everything that is neither a motion nor an operator.
//!
//! Insert and visual mode entry and exit live here as well, since operators and the
//! dispatcher both need them.

use std::cmp::Reverse;

use log::{debug, trace};
use regex::Regex;

use crate::dispatch::{self, KeyOrigin};
use crate::error::{VimError, VimResult};
use crate::ex;
use crate::keys::{literal_text, split_macro_keys};
use crate::operator::{indent_string, indent_width, repeated_len, shift_line};
use crate::pos::{Pos, Range, EOL};
use crate::register::is_valid_register;
use crate::state::{Cx, InsertChange};
use crate::text::first_non_ws;
use crate::vicmd::{Action, ActionArgs, InsertAt};

pub fn eval_action(cx: &mut Cx, action: &Action, args: &ActionArgs) -> VimResult<()> {
	debug!("{action:?} x{}", args.repeat);
	match action {
		Action::JumpListWalk => jump_list_walk(cx, args),
		Action::Scroll => scroll(cx, args),
		Action::ScrollToCursor => {
			let line = cx.cursor().line;
			cx.host.scroll_to(line, args.position);
		}
		Action::ReplayMacro => return replay_macro(cx, args),
		Action::EnterMacroRecordMode => enter_macro_record_mode(cx, args),
		Action::ToggleOverwrite => {
			cx.vim.overwrite = !cx.vim.overwrite;
			cx.emit_mode();
		}
		Action::EnterInsertMode => return enter_insert_mode(cx, args, 1),
		Action::ToggleVisualMode => toggle_visual_mode(cx, args),
		Action::ReselectLastSelection => reselect_last_selection(cx),
		Action::JoinLines => join_lines(cx, args),
		Action::NewLineAndEnterInsertMode => return new_line_and_enter_insert_mode(cx, args),
		Action::Paste => return paste(cx, args),
		Action::Undo => {
			for _ in 0..args.repeat.max(1) {
				if !cx.host.undo() {
					break
				}
			}
			let cursor = cx.clip_to_content(cx.cursor());
			cx.set_cursor(cursor);
		}
		Action::Redo => {
			for _ in 0..args.repeat.max(1) {
				if !cx.host.redo() {
					break
				}
			}
		}
		Action::SetRegister => cx.vim.input.register_name = args.selected_character,
		Action::InsertRegister => {
			let text = cx.registers().get(args.selected_character).text();
			if !text.is_empty() {
				type_text(cx, &text, false);
			}
		}
		Action::OneNormalCommand => {
			exit_insert_mode(cx, true)?;
			cx.vim.insert_mode_return = true;
		}
		Action::SetMark => {
			if let Some(name) = args.selected_character {
				let cursor = cx.cursor();
				cx.update_mark(name, cursor);
			}
		}
		Action::Replace => replace(cx, args),
		Action::IncrementNumberToken => increment_number_token(cx, args),
		Action::RepeatLastEdit => {
			let Some(last) = cx.vim.last_edit_input_state.as_mut() else {
				return Ok(())
			};
			let mut repeat = args.repeat;
			if args.repeat_is_explicit {
				last.repeat_override = Some(repeat);
			} else {
				repeat = last.repeat_override.unwrap_or(repeat);
			}
			return dispatch::repeat_last_edit(cx, repeat, false)
		}
		Action::Indent => {
			edit_at_cursors(cx, |cx, at| {
				let grown = shift_line(cx, at.line, args.indent_right);
				at.offset_ch(grown)
			});
		}
		Action::Fold => {
			if let Some(cmd) = args.fold {
				let line = cx.cursor().line;
				cx.host.fold(cmd, args.all, line);
			}
		}
		Action::Custom(name) => {
			let Some(func) = cx.g.registry.action(name) else {
				return Err(VimError::Fault(format!("no action named {name}")))
			};
			return func(&mut *cx, args)
		}
	}
	Ok(())
}

fn jump_list_walk(cx: &mut Cx, args: &ActionArgs) {
	if cx.vim.visual_mode {
		return
	}
	let repeat = args.repeat.max(1).min(isize::MAX as usize) as isize;
	let offset = if args.forward { repeat } else { -repeat };
	let cursor = cx.cursor();
	let id = cx.id;
	let target = cx.g.global.jump_list.step(id, offset, cursor).unwrap_or(cursor);
	let target = cx.clip_to_content(target);
	cx.set_cursor(target);
}

/// `<C-e>`/`<C-y>`: scroll the view, dragging the cursor along if it would leave the screen
fn scroll(cx: &mut Cx, args: &ActionArgs) {
	if cx.vim.visual_mode {
		return
	}
	let repeat = args.repeat.max(1);
	let visible = cx.host.visible_lines();
	let mut cursor = cx.cursor();
	if args.forward {
		let new_top = visible.top.saturating_add(repeat).min(cx.last_line());
		cursor.line = cursor.line.max(new_top);
		cx.host.scroll_by(repeat as isize);
	} else {
		let new_bottom = visible.bottom.saturating_sub(repeat);
		cursor.line = cursor.line.min(new_bottom);
		cx.host.scroll_by(-(repeat as isize));
	}
	let cursor = cx.clip_to_content(cursor);
	cx.set_cursor(cursor);
}

fn replay_macro(cx: &mut Cx, args: &ActionArgs) -> VimResult<()> {
	let Some(mut name) = args.selected_character else {
		return Ok(())
	};
	let macros = &mut cx.g.global.macro_mode_state;
	if name == '@' {
		let Some(latest) = macros.latest_register else {
			return Ok(())
		};
		name = latest;
	} else {
		macros.latest_register = Some(name);
	}
	for _ in 0..args.repeat.max(1) {
		execute_macro_register(cx, name)?;
	}
	Ok(())
}

/// Feed a register's keys back through the key handler. Insert-mode text recorded alongside
/// the keys is applied whenever a key leaves the editor in insert mode.
pub fn execute_macro_register(cx: &mut Cx, name: char) -> VimResult<()> {
	let register = cx.registers().get(Some(name));
	if name == ':' {
		if let Some(line) = register.key_buffer.first().filter(|l| !l.is_empty()) {
			ex::process_command(cx, line)?;
		}
		cx.g.global.macro_mode_state.is_playing = false;
		return Ok(())
	}
	debug!("replaying register {name}: {:?}", register.text());
	let macros = &mut cx.g.global.macro_mode_state;
	macros.is_playing = true;
	macros.replay_search_queries = register.search_queries.clone();
	let mut inserts = register.insert_mode_changes.iter();
	let result = (|| -> VimResult<()> {
		for chunk in &register.key_buffer {
			for key in split_macro_keys(chunk) {
				dispatch::handle_key(cx, &key, KeyOrigin::Macro)?;
				if cx.vim.insert_mode {
					let changes = inserts.next().cloned().unwrap_or_default();
					cx.g.global.macro_mode_state.last_insert_mode_changes.changes = changes.changes.clone();
					repeat_insert_mode_changes(cx, &changes.changes, 1);
					exit_insert_mode(cx, false)?;
				}
			}
		}
		Ok(())
	})();
	cx.g.global.macro_mode_state.is_playing = false;
	result
}

fn enter_macro_record_mode(cx: &mut Cx, args: &ActionArgs) {
	let Some(name) = args.selected_character.filter(|n| is_valid_register(*n)) else {
		return
	};
	cx.registers().get_mut(name).clear();
	let macros = &mut cx.g.global.macro_mode_state;
	macros.latest_register = Some(name);
	macros.is_recording = true;
	cx.notify(&format!("recording @{name}"));
}

pub fn exit_macro_record_mode(cx: &mut Cx) {
	cx.g.global.macro_mode_state.is_recording = false;
}

/// Enter insert (or replace) mode. `height` above one starts a block insert with one cursor
/// per line below the insert position.
pub fn enter_insert_mode(cx: &mut Cx, args: &ActionArgs, height: usize) -> VimResult<()> {
	if cx.host.read_only() {
		return Ok(())
	}
	cx.vim.insert_mode = true;
	cx.vim.insert_mode_repeat = args.repeat.max(1);
	let mut head = args.head.unwrap_or_else(|| cx.cursor());
	let mut height = height.max(1);
	if args.head.is_none() {
		let sel = cx.vim.sel;
		match args.insert_at {
			InsertAt::Eol => head = cx.eol_of(head.line),
			InsertAt::Bol => head.ch = 0,
			InsertAt::CharAfter => head = cx.clip_pos(head.offset_ch(1)),
			InsertAt::FirstNonBlank => head = cx.first_non_ws(head.line),
			InsertAt::StartOfSelectedArea | InsertAt::EndOfSelectedArea => {
				if !cx.vim.visual_mode {
					cx.vim.insert_mode = false;
					return Ok(())
				}
				let at_start = args.insert_at == InsertAt::StartOfSelectedArea;
				if cx.vim.visual_block {
					let top = sel.anchor.line.min(sel.head.line);
					let left = sel.anchor.ch.min(sel.head.ch);
					let right = sel.anchor.ch.max(sel.head.ch);
					head = Pos::new(top, if at_start { left } else { right.saturating_add(1) });
					height = sel.anchor.line.abs_diff(sel.head.line) + 1;
				} else if at_start {
					head = if sel.head.line < sel.anchor.line { sel.head } else { Pos::new(sel.anchor.line, 0) };
				} else {
					head = if sel.head.line >= sel.anchor.line { sel.head.offset_ch(1) } else { Pos::new(sel.anchor.line, 0) };
				}
			}
			InsertAt::Inplace => {
				if cx.vim.visual_mode {
					cx.vim.insert_mode = false;
					return Ok(())
				}
			}
			InsertAt::LastEdit => head = cx.vim.last_edit_pos.unwrap_or(head),
		}
	}
	cx.vim.overwrite = args.replace;
	cx.emit_mode();
	if cx.vim.visual_mode {
		exit_visual_mode(cx, true);
	}
	select_for_insert(cx, head, height);
	Ok(())
}

fn select_for_insert(cx: &mut Cx, head: Pos, height: usize) {
	let last = cx.last_line();
	let cursors = (0..height)
		.map(|i| head.offset_line(i as isize))
		.take_while(|pos| pos.line <= last)
		.map(|pos| cx.clip_pos(pos))
		.collect();
	set_insert_cursors(cx, cursors);
}

/// Leave insert mode. A count typed before entering replays the insert that many times,
/// and the cursor steps back onto the last inserted char unless `keep_cursor`.
pub fn exit_insert_mode(cx: &mut Cx, keep_cursor: bool) -> VimResult<()> {
	if !cx.is_playing() && cx.vim.insert_mode_repeat > 1 {
		let repeat = cx.vim.insert_mode_repeat;
		let typed = cx.g.global.macro_mode_state.last_insert_mode_changes.text().len();
		match repeated_len(typed, repeat) {
			Ok(_) => {
				dispatch::repeat_last_edit(cx, repeat - 1, true)?;
				if let Some(last) = cx.vim.last_edit_input_state.as_mut() {
					last.repeat_override = Some(repeat);
				}
			}
			Err(e) => cx.notify(&e.to_string())
		}
	}
	cx.vim.insert_mode_repeat = 0;
	cx.vim.insert_mode = false;
	let cursor = insert_cursors(cx)[0];
	cx.vim.insert_cursors.clear();
	let cursor = if keep_cursor { cursor } else { cursor.offset_ch(-1) };
	cx.set_cursor(cursor);
	cx.vim.overwrite = false;
	let text = cx.g.global.macro_mode_state.last_insert_mode_changes.text();
	cx.registers().get_mut('.').set_text(&text, false, false);
	cx.emit_mode();
	let macros = &cx.g.global.macro_mode_state;
	if macros.is_recording && !macros.is_playing && let Some(name) = macros.latest_register {
		let changes = macros.last_insert_mode_changes.clone();
		cx.registers().get_mut(name).push_insert_mode_changes(changes);
	}
	Ok(())
}

/// Leave visual mode, remembering the selection for `gv`. With `move_head` the cursor lands on
/// the selection head; otherwise the caller places it.
pub fn exit_visual_mode(cx: &mut Cx, move_head: bool) {
	cx.update_last_selection();
	cx.vim.visual_mode = false;
	cx.vim.visual_line = false;
	cx.vim.visual_block = false;
	if move_head {
		let head = cx.clip_to_content(cx.vim.sel.head);
		cx.set_cursor(head);
	}
	if !cx.vim.insert_mode {
		cx.emit_mode();
	}
}

fn toggle_visual_mode(cx: &mut Cx, args: &ActionArgs) {
	if !cx.vim.visual_mode {
		let anchor = cx.cursor();
		cx.vim.visual_mode = true;
		cx.vim.visual_line = args.linewise;
		cx.vim.visual_block = args.blockwise;
		let head = cx.clip_to_content(anchor.offset_ch(args.repeat.max(1) as isize - 1));
		cx.vim.sel = Range::new(anchor, head);
		cx.emit_mode();
		cx.update_selection();
		cx.update_mark('<', anchor.min(head));
		cx.update_mark('>', anchor.max(head));
	} else if cx.vim.visual_line != args.linewise || cx.vim.visual_block != args.blockwise {
		cx.vim.visual_line = args.linewise;
		cx.vim.visual_block = args.blockwise;
		cx.emit_mode();
		cx.update_selection();
	} else {
		exit_visual_mode(cx, true);
	}
}

/// `gv`. In visual mode this swaps the current selection with the previous one.
fn reselect_last_selection(cx: &mut Cx) {
	let last = cx.vim.last_selection;
	if cx.vim.visual_mode {
		cx.update_last_selection();
	}
	let Some(last) = last else {
		return
	};
	let anchor = cx.clip_pos(last.anchor);
	let head = cx.clip_pos(last.head);
	cx.vim.sel = Range::new(anchor, head);
	cx.vim.visual_mode = true;
	cx.vim.visual_line = last.visual_line;
	cx.vim.visual_block = last.visual_block;
	cx.update_selection();
	cx.update_mark('<', anchor.min(head));
	cx.update_mark('>', anchor.max(head));
	cx.emit_mode();
}

fn join_lines(cx: &mut Cx, args: &ActionArgs) {
	let (start, end) = if cx.vim.visual_mode {
		let sel = cx.vim.sel;
		let (start, end) = (sel.from(), sel.to());
		(start, Pos::new(end.line, cx.line_len(end.line).saturating_sub(1)))
	} else {
		let start = cx.cursor();
		let repeat = args.repeat.max(2);
		(start, cx.clip_to_content(Pos::new(start.line.saturating_add(repeat - 1), EOL)))
	};
	let mut final_ch = 0;
	for _ in start.line..end.line {
		final_ch = cx.line_len(start.line);
		let mut text = "";
		let mut next_start_ch = 0;
		if !args.keep_spaces {
			let next = cx.chars(start.line + 1);
			next_start_ch = first_non_ws(&next);
			if next_start_ch < next.len() {
				text = " ";
			}
		}
		cx.replace_range(text, Pos::new(start.line, final_ch), Pos::new(start.line + 1, next_start_ch));
	}
	let final_pos = cx.clip_to_content(Pos::new(start.line, final_ch));
	if cx.vim.visual_mode {
		exit_visual_mode(cx, false);
	}
	let final_pos = cx.clip_to_content(final_pos);
	cx.set_cursor(final_pos);
}

/// Leading whitespace of `line`, at most `max` chars of it
fn indent_of(cx: &Cx, line: usize, max: usize) -> String {
	let chars = cx.chars(line);
	chars[..first_non_ws(&chars).min(max)].iter().collect()
}

fn new_line_and_enter_insert_mode(cx: &mut Cx, args: &ActionArgs) -> VimResult<()> {
	cx.vim.insert_mode = true;
	let cursor = cx.cursor();
	if cursor.line == 0 && !args.after {
		let indent = indent_of(cx, 0, EOL);
		cx.replace_range(&format!("{indent}\n"), Pos::new(0, 0), Pos::new(0, 0));
		cx.set_cursor(Pos::new(0, indent.chars().count()));
	} else {
		let line = if args.after { cursor.line } else { cursor.line - 1 };
		let at = cx.eol_of(line);
		let text = format!("\n{}", indent_of(cx, line, EOL));
		cx.replace_range(&text, at, at);
		let landed = cx.vim.last_edit_pos.unwrap_or(at);
		cx.set_cursor(landed);
	}
	let insert = ActionArgs { repeat: args.repeat, ..Default::default() };
	enter_insert_mode(cx, &insert, 1)
}

/// Re-indent pasted text so its first line lines up with the cursor line (`]p`)
fn match_indent(cx: &Cx, text: &str) -> String {
	let tabstop = cx.opt_num("tabstop").max(1);
	let cursor = cx.cursor();
	let indent = indent_width(&indent_of(cx, cursor.line, EOL), tabstop) as isize;
	let chomped = text.strip_suffix('\n');
	let body = chomped.unwrap_or(text);
	let leading = |line: &str| -> String { line.chars().take_while(|c| c.is_whitespace()).collect() };
	let first_indent = indent_width(&leading(body), tabstop) as isize;
	let mut out = body.split('\n')
		.map(|line| {
			let ws = leading(line);
			let new_indent = indent + indent_width(&ws, tabstop) as isize - first_indent;
			let rest = &line[ws.len()..];
			if new_indent < 0 {
				rest.to_string()
			} else {
				format!("{}{rest}", indent_string(cx, new_indent as usize))
			}
		})
		.collect::<Vec<_>>()
		.join("\n");
	if chomped.is_some() {
		out.push('\n');
	}
	out
}

/// Insert `lines` as a block whose top left corner is `at`, padding short lines with spaces
/// and appending lines past the end of the buffer
fn paste_block(cx: &mut Cx, at: Pos, lines: &[String]) {
	for (i, text) in lines.iter().enumerate() {
		let line = at.line + i;
		if line > cx.last_line() {
			let end = cx.eol_of(cx.last_line());
			cx.replace_range("\n", end, end);
		}
		let len = cx.line_len(line);
		if len < at.ch {
			let eol = Pos::new(line, len);
			cx.replace_range(&" ".repeat(at.ch - len), eol, eol);
		}
		let pos = Pos::new(line, at.ch);
		cx.replace_range(text, pos, pos);
	}
}

fn paste(cx: &mut Cx, args: &ActionArgs) -> VimResult<()> {
	let register = cx.registers().get(args.register_name);
	let mut text = register.text();
	if text.is_empty() {
		return Ok(())
	}
	if args.match_indent {
		text = match_indent(cx, &text);
	}
	if args.repeat > 1 {
		repeated_len(text.len(), args.repeat)?;
		text = text.repeat(args.repeat);
	}
	let (linewise, blockwise) = (register.linewise, register.blockwise);
	let mut cur = cx.cursor();
	let mut block_lines: Vec<String> = vec![];
	if blockwise {
		block_lines = text.split('\n').map(str::to_string).collect();
		if linewise {
			block_lines.pop();
		}
		for line in block_lines.iter_mut().filter(|l| l.is_empty()) {
			*line = " ".into();
		}
		cur.ch = (cur.ch + args.after as usize).min(cx.line_len(cur.line));
	} else if linewise {
		let body = text.strip_suffix('\n').unwrap_or(&text).to_string();
		if cx.vim.visual_mode {
			text = if cx.vim.visual_line { body } else { format!("\n{body}\n") };
		} else if args.after {
			text = format!("\n{body}");
			cur.ch = cx.line_len(cur.line);
		} else {
			cur.ch = 0;
		}
	} else {
		cur.ch += args.after as usize;
	}
	trace!("paste {text:?} at {cur} linewise={linewise} blockwise={blockwise}");

	let mut final_pos;
	if cx.vim.visual_mode {
		cx.vim.last_pasted_text = Some(text.clone());
		let (ranges, _) = cx.make_selection(cx.vim.sel, cx.vim.selection_mode(), false);
		let (sel_start, sel_end) = cx.selected_area(&ranges);
		let selected = ranges.iter()
			.map(|r| cx.get_range(r.from(), r.to()))
			.collect::<Vec<_>>()
			.join("\n");
		let saved_head = cx.vim.last_selection.map(|s| s.head);
		let visual_line = cx.vim.visual_line;
		let selected = if visual_line { format!("{selected}\n") } else { selected };
		cx.registers().unnamed_mut().set_text(&selected, visual_line, false);
		if blockwise || cx.vim.visual_block {
			let empty = vec![String::new(); ranges.len()];
			cx.replace_selections(&ranges, &empty);
			if blockwise {
				paste_block(cx, sel_start, &block_lines);
			} else {
				cx.replace_range(&text, sel_start, sel_start);
			}
			final_pos = sel_start;
		} else {
			cx.replace_range(&text, sel_start, sel_end);
			let end = (cx.index_from_pos(sel_start) + text.chars().count()).saturating_sub(1);
			final_pos = cx.pos_from_index(end);
		}
		if let (Some(head), Some(last)) = (saved_head, cx.vim.last_selection.as_mut()) {
			last.head = head;
		}
		if linewise {
			final_pos.ch = 0;
		}
	} else if blockwise {
		paste_block(cx, cur, &block_lines);
		final_pos = cur;
	} else {
		cx.replace_range(&text, cur, cur);
		if linewise {
			let line = if args.after { cur.line + 1 } else { cur.line };
			final_pos = cx.first_non_ws(line.min(cx.last_line()));
		} else {
			final_pos = cur;
			if !text.contains('\n') {
				final_pos.ch = (cur.ch + text.chars().count()).saturating_sub(1);
			}
		}
	}
	if cx.vim.visual_mode {
		exit_visual_mode(cx, false);
	}
	let final_pos = cx.clip_to_content(final_pos);
	cx.set_cursor(final_pos);
	Ok(())
}

/// `r{char}`: overwrite chars under the cursor or the whole selection, keeping line breaks
fn replace(cx: &mut Cx, args: &ActionArgs) {
	let Some(with) = args.selected_character else {
		return
	};
	let (ranges, _) = if cx.vim.visual_mode {
		cx.make_selection(cx.vim.sel, cx.vim.selection_mode(), false)
	} else {
		let cur = cx.cursor();
		let end = (cur.ch + args.repeat.max(1)).min(cx.line_len(cur.line));
		(vec![Range::new(cur, Pos::new(cur.line, end))], 0)
	};
	let (start, end) = cx.selected_area(&ranges);
	if with == '\n' {
		cx.replace_range("", start, end);
		let text = format!("\n{}", indent_of(cx, start.line, start.ch));
		cx.replace_range(&text, start, start);
		let landed = cx.vim.last_edit_pos.unwrap_or(start);
		if cx.vim.visual_mode {
			exit_visual_mode(cx, false);
		}
		cx.set_cursor(landed);
		return
	}
	let swap = |s: &str| s.chars().map(|c| if c == '\n' { c } else { with }).collect::<String>();
	if cx.vim.visual_block {
		let spaces = " ".repeat(cx.opt_num("tabstop").max(1));
		let texts: Vec<String> = ranges.iter()
			.map(|r| swap(&cx.get_range(r.from(), r.to()).replace('\t', &spaces)))
			.collect();
		cx.replace_selections(&ranges, &texts);
	} else {
		let text = swap(&cx.get_range(start, end));
		cx.replace_range(&text, start, end);
	}
	if cx.vim.visual_mode {
		exit_visual_mode(cx, false);
		let start = cx.clip_to_content(start);
		cx.set_cursor(start);
	} else {
		cx.set_cursor(end.offset_ch(-1));
	}
}

/// `<C-a>`/`<C-x>`: add to the first number ending after the cursor. Hex, binary and octal
/// keep their prefix and zero padding.
fn increment_number_token(cx: &mut Cx, args: &ActionArgs) {
	let Ok(re) = Regex::new(r"(?i)(-?)(?:(0x)([\da-f]+)|(0b|0|)(\d+))") else {
		return
	};
	let cur = cx.cursor();
	let line = cx.line(cur.line);
	let ch_of = |byte: usize| line[..byte].chars().count();
	let Some(caps) = re.captures_iter(&line).find(|c| c.get(0).is_some_and(|m| ch_of(m.end()) > cur.ch)) else {
		return
	};
	let Some(whole) = caps.get(0) else { return };
	let (start, end) = (ch_of(whole.start()), ch_of(whole.end()));
	let sign = caps.get(1).map_or("", |m| m.as_str());
	let prefix = caps.get(2).or(caps.get(4)).map_or("", |m| m.as_str());
	let digits = caps.get(3).or(caps.get(5)).map_or("", |m| m.as_str());
	let mut base = match prefix.to_ascii_lowercase().as_str() {
		"0x" => 16,
		"0b" => 2,
		"0" => 8,
		_ => 10
	};
	let mut prefix = prefix;
	let number = match i128::from_str_radix(&format!("{sign}{digits}"), base) {
		Ok(n) => n,
		Err(_) if base == 8 => {
			// `09` is not octal, read it as a plain decimal
			base = 10;
			prefix = "";
			match format!("{sign}0{digits}").parse::<i128>() {
				Ok(n) => n,
				Err(_) => return
			}
		}
		Err(_) => return
	};
	let delta = args.repeat.max(1) as i128;
	let number = if args.increase { number.saturating_add(delta) } else { number.saturating_sub(delta) };
	let magnitude = number.unsigned_abs();
	let body = match base {
		16 => format!("{magnitude:x}"),
		8 => format!("{magnitude:o}"),
		2 => format!("{magnitude:b}"),
		_ => magnitude.to_string()
	};
	let minus = if number < 0 { "-" } else { "" };
	let padding = if prefix.is_empty() {
		String::new()
	} else {
		let width = digits.len() + sign.len();
		"0".repeat(width.saturating_sub(body.len() + minus.len()))
	};
	let replacement = format!("{minus}{prefix}{padding}{body}");
	cx.replace_range(&replacement, Pos::new(cur.line, start), Pos::new(cur.line, end));
	cx.set_cursor(Pos::new(cur.line, (start + replacement.chars().count()).saturating_sub(1)));
}

/// Cursors typed text goes to: the block-insert cursors, or the host cursor
pub fn insert_cursors(cx: &Cx) -> Vec<Pos> {
	if cx.vim.insert_cursors.is_empty() {
		vec![cx.cursor()]
	} else {
		cx.vim.insert_cursors.clone()
	}
}

fn set_insert_cursors(cx: &mut Cx, cursors: Vec<Pos>) {
	match cursors.as_slice() {
		[] => {}
		[only] => {
			cx.vim.insert_cursors.clear();
			cx.set_cursor(*only);
		}
		_ => {
			let ranges: Vec<Range> = cursors.iter().copied().map(Range::cursor).collect();
			cx.set_selections(&ranges, 0);
			cx.vim.insert_cursors = cursors;
		}
	}
}

/// Run `edit` at every insert cursor, bottom up so pending cursors stay valid.
/// `edit` returns where its cursor ends up.
fn edit_at_cursors(cx: &mut Cx, mut edit: impl FnMut(&mut Cx, Pos) -> Pos) {
	let mut cursors = insert_cursors(cx);
	let mut order: Vec<usize> = (0..cursors.len()).collect();
	order.sort_by_key(|&i| Reverse(cursors[i]));
	for i in order {
		let at = cursors[i];
		cx.vim.insert_cursors = cursors;
		let landed = edit(cx, at);
		cursors = std::mem::take(&mut cx.vim.insert_cursors);
		cursors[i] = landed;
	}
	set_insert_cursors(cx, cursors);
}

fn record_change(cx: &mut Cx, change: InsertChange) {
	if cx.is_playing() {
		return
	}
	let last = &mut cx.g.global.macro_mode_state.last_insert_mode_changes;
	if last.maybe_reset {
		last.changes.clear();
		last.maybe_reset = false;
	}
	last.changes.push(change);
}

fn type_text(cx: &mut Cx, text: &str, overwrite: bool) {
	let overwrite = overwrite && !text.contains('\n');
	let len = text.chars().count();
	edit_at_cursors(cx, |cx, at| {
		let end = if overwrite { Pos::new(at.line, (at.ch + len).min(cx.line_len(at.line))) } else { at };
		cx.replace_range(text, at, end);
		cx.vim.last_edit_pos.unwrap_or(at)
	});
	let change = if overwrite { InsertChange::Overwrite(text.into()) } else { InsertChange::Text(text.into()) };
	record_change(cx, change);
}

/// Type text the way a key press would, overwriting in replace mode
pub fn insert_text(cx: &mut Cx, text: &str) {
	type_text(cx, text, cx.vim.overwrite);
}

/// Handle a key insert mode treats as editing: literal text, line breaks carrying the current
/// indent, deletion and cursor keys. Returns false for any other key.
pub fn insert_key(cx: &mut Cx, key: &str) -> bool {
	match key {
		"<CR>" | "<S-CR>" => {
			let cur = insert_cursors(cx)[0];
			let text = format!("\n{}", indent_of(cx, cur.line, cur.ch));
			type_text(cx, &text, false);
		}
		"<BS>" | "<S-BS>" => {
			edit_at_cursors(cx, |cx, at| {
				let from = if at.ch > 0 {
					at.offset_ch(-1)
				} else if at.line > 0 {
					cx.eol_of(at.line - 1)
				} else {
					return at
				};
				cx.replace_range("", from, at);
				from
			});
			record_change(cx, InsertChange::Key(key.into()));
		}
		"<Del>" => {
			edit_at_cursors(cx, |cx, at| {
				let to = if at.ch < cx.line_len(at.line) {
					at.offset_ch(1)
				} else if at.line < cx.last_line() {
					Pos::new(at.line + 1, 0)
				} else {
					return at
				};
				cx.replace_range("", at, to);
				at
			});
			record_change(cx, InsertChange::Key(key.into()));
		}
		"<Left>" | "<Right>" | "<Up>" | "<Down>" | "<Home>" | "<End>" => {
			edit_at_cursors(cx, |cx, at| {
				let moved = match key {
					"<Left>" => at.offset_ch(-1),
					"<Right>" => at.offset_ch(1),
					"<Up>" => at.offset_line(-1),
					"<Down>" => at.offset_line(1),
					"<Home>" => at.with_ch(0),
					_ => at.with_ch(EOL)
				};
				cx.clip_pos(moved)
			});
			if !cx.is_playing() {
				cx.g.global.macro_mode_state.last_insert_mode_changes.maybe_reset = true;
			}
		}
		_ => {
			let Some(text) = literal_text(key) else {
				return false
			};
			insert_text(cx, text);
		}
	}
	true
}

pub fn apply_insert_change(cx: &mut Cx, change: &InsertChange) {
	match change {
		InsertChange::Text(text) => type_text(cx, text, false),
		InsertChange::Overwrite(text) => type_text(cx, text, true),
		InsertChange::Key(key) => {
			insert_key(cx, key);
		}
	}
}

/// Replay recorded insert-mode changes `repeat` times. After a block insert the changes are
/// replayed once per line of the block instead.
pub fn repeat_insert_mode_changes(cx: &mut Cx, changes: &[InsertChange], repeat: usize) {
	let head = cx.cursor();
	let visual_block = cx.g.global.macro_mode_state.last_insert_mode_changes.visual_block;
	let repeat = if visual_block > 0 { visual_block + 1 } else { repeat };
	for i in 0..repeat {
		if visual_block > 0 {
			cx.set_cursor(head.offset_line(i as isize));
		}
		for change in changes {
			apply_insert_change(cx, change);
		}
	}
	if visual_block > 0 {
		cx.set_cursor(head.offset_ch(1));
	}
}
