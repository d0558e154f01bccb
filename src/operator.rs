//! The operator engine. Operators act on the ranges built from a motion or a visual selection
//! and return where the cursor should land, if anywhere.

use itertools::Itertools;
use log::debug;

use crate::action;
use crate::error::{VimError, VimResult};
use crate::pos::{Pos, Range};
use crate::register::RegisterOp;
use crate::state::Cx;
use crate::vicmd::{ActionArgs, Motion, Operator, OperatorArgs};

pub fn eval_operator(cx: &mut Cx, op: &Operator, args: &OperatorArgs, ranges: &[Range], old_anchor: Pos, new_head: Pos) -> VimResult<Option<Pos>> {
	let Some(first) = ranges.first().copied() else {
		return Ok(None)
	};
	debug!("{op:?} over {} range(s) starting {}..{}", ranges.len(), first.anchor, first.head);
	match op {
		Operator::Change => change(cx, args, ranges, first).map(|_| None),
		Operator::Delete => Ok(Some(delete(cx, args, ranges, first))),
		Operator::Yank => Ok(Some(yank(cx, args, ranges, first, old_anchor))),
		Operator::Indent => indent(cx, args, ranges, first).map(Some),
		Operator::IndentAuto => {
			let to = if args.linewise { first.head.line.saturating_sub(1) } else { first.head.line };
			cx.host.auto_indent(first.anchor.line, to.max(first.anchor.line));
			Ok(Some(cx.first_non_ws(first.anchor.line)))
		}
		Operator::HardWrap => Ok(hard_wrap(cx, args, first, old_anchor)),
		Operator::ChangeCase => Ok(Some(change_case(cx, args, ranges, first, old_anchor, new_head))),
		Operator::Custom(name) => {
			let Some(func) = cx.g.registry.operator(name) else {
				return Err(VimError::Fault(format!("no operator named {name}")))
			};
			func(&mut *cx, args, ranges, old_anchor, new_head)
		}
	}
}

fn selection_text(cx: &Cx, ranges: &[Range]) -> String {
	ranges.iter()
		.map(|r| cx.get_range(r.from(), r.to()))
		.join("\n")
}

fn clear_ranges(cx: &mut Cx, ranges: &[Range]) {
	let empty = vec![String::new(); ranges.len()];
	cx.replace_selections(ranges, &empty);
}

fn change(cx: &mut Cx, args: &OperatorArgs, ranges: &[Range], first: Range) -> VimResult<()> {
	let text;
	let final_head;
	if !cx.vim.visual_mode {
		let (mut anchor, mut head) = (first.from(), first.to());
		let mut changed = cx.get_range(anchor, head);
		let trims_trailing_ws = cx.vim.last_edit_input_state.as_ref()
			.is_some_and(|s| s.motion == Some(Motion::MoveByWords) && s.motion_args.forward);
		if trims_trailing_ws && !changed.trim().is_empty() {
			// `cw` stops at the end of the word, not at the start of the next one
			let trimmed_len = changed.trim_end().chars().count();
			let trailing = changed.chars().count() - trimmed_len;
			if trailing > 0 {
				head = head.offset_ch(-(trailing as isize));
				changed = changed.chars().take(trimmed_len).collect();
			}
		}
		if args.linewise {
			anchor = cx.first_non_ws(anchor.line);
			if head.line > anchor.line {
				head = Pos::eol(head.line - 1);
			}
			changed = cx.get_range(anchor, head);
		}
		cx.replace_range("", anchor, head);
		text = changed;
		final_head = anchor;
	} else if args.full_line {
		let anchor = first.from();
		let head = Pos::eol(first.to().line.saturating_sub(1));
		text = cx.get_range(anchor, head);
		cx.replace_range("", anchor, head);
		final_head = anchor;
	} else {
		text = selection_text(cx, ranges);
		clear_ranges(cx, ranges);
		final_head = first.from();
	}
	let blockwise = ranges.len() > 1;
	cx.registers().push_text(args.register_name, RegisterOp::Change, &text, args.linewise, blockwise);
	let insert = ActionArgs { head: Some(final_head), repeat: 1, ..Default::default() };
	action::enter_insert_mode(cx, &insert, ranges.len())
}

fn delete(cx: &mut Cx, args: &OperatorArgs, ranges: &[Range], first: Range) -> Pos {
	let blockwise = cx.vim.visual_block;
	let text;
	let mut final_head;
	if !blockwise {
		let (mut anchor, head) = (first.from(), first.to());
		let deleted = cx.get_range(anchor, head);
		let last = cx.last_line();
		if args.linewise && head.line > last && head.line != 0 {
			// deleting through the last line takes the line break before it
			if anchor.line == 0 {
				anchor.ch = 0;
			} else {
				anchor = cx.eol_of(anchor.line - 1);
			}
		}
		cx.replace_range("", anchor, head);
		text = deleted;
		final_head = anchor;
		if args.linewise {
			final_head = cx.first_non_ws(anchor.line.min(cx.last_line()));
		}
	} else {
		text = selection_text(cx, ranges);
		clear_ranges(cx, ranges);
		final_head = ranges.iter().map(|r| r.from()).min().unwrap_or(first.from());
	}
	cx.registers().push_text(args.register_name, RegisterOp::Delete, &text, args.linewise, blockwise);
	cx.clip_to_content(final_head)
}

fn yank(cx: &mut Cx, args: &OperatorArgs, ranges: &[Range], first: Range, old_anchor: Pos) -> Pos {
	let text = selection_text(cx, ranges);
	let end = if cx.vim.visual_mode {
		let sel = cx.vim.sel;
		[sel.anchor, sel.head, first.head, first.anchor].into_iter().min().unwrap_or(old_anchor)
	} else {
		old_anchor
	};
	let blockwise = cx.vim.visual_block;
	cx.registers().push_text(args.register_name, RegisterOp::Yank, &text, args.linewise, blockwise);
	end
}

/// Longest text a counted put or shift may build, in bytes
const MAX_REPEATED_LEN: usize = 100_000_000;

/// Length of `unit_len` repeated `count` times. Errors instead of building something huge.
pub fn repeated_len(unit_len: usize, count: usize) -> VimResult<usize> {
	unit_len.checked_mul(count)
		.filter(|len| *len <= MAX_REPEATED_LEN)
		.ok_or_else(|| VimError::notify("Resulting text too long"))
}

/// One level of indentation as typed: a tab, or `tabstop` spaces with `expandtab`
fn indent_unit(cx: &Cx) -> String {
	if cx.opt_bool("expandtab") {
		" ".repeat(cx.opt_num("tabstop").max(1))
	} else {
		"\t".into()
	}
}

/// Display width of leading whitespace, with tabs expanded to `tabstop`
pub fn indent_width(ws: &str, tabstop: usize) -> usize {
	ws.chars().fold(0, |width, c| if c == '\t' { width + tabstop - width % tabstop } else { width + 1 })
}

/// Whitespace for an indent of `width` columns
pub fn indent_string(cx: &Cx, width: usize) -> String {
	let tabstop = cx.opt_num("tabstop").max(1);
	if cx.opt_bool("expandtab") {
		" ".repeat(width)
	} else {
		format!("{}{}", "\t".repeat(width / tabstop), " ".repeat(width % tabstop))
	}
}

/// Shift one line by `shiftwidth`. Blank lines are left alone when shifting right.
pub fn indent_line(cx: &mut Cx, line: usize, right: bool) {
	if right && cx.line(line).trim().is_empty() {
		return
	}
	shift_line(cx, line, right);
}

/// Shift one line by `shiftwidth` and return how many chars its indent grew by
pub fn shift_line(cx: &mut Cx, line: usize, right: bool) -> isize {
	let chars = cx.chars(line);
	let ws_len = crate::text::first_non_ws(&chars);
	let ws: String = chars[..ws_len].iter().collect();
	let tabstop = cx.opt_num("tabstop").max(1);
	let shift = cx.opt_num("shiftwidth").max(1);
	let width = indent_width(&ws, tabstop);
	let new_width = if right { width + shift } else { width.saturating_sub(shift) };
	let new_ws = indent_string(cx, new_width);
	if new_ws != ws {
		cx.replace_range(&new_ws, Pos::new(line, 0), Pos::new(line, ws_len));
	}
	new_ws.chars().count() as isize - ws_len as isize
}

fn indent(cx: &mut Cx, args: &OperatorArgs, ranges: &[Range], first: Range) -> VimResult<Pos> {
	let repeat = if cx.vim.visual_mode { args.repeat.max(1) } else { 1 };
	let shift = cx.opt_num("shiftwidth").max(cx.opt_num("tabstop")).max(1);
	repeated_len(shift, repeat)?;
	if cx.vim.visual_block {
		let unit = indent_unit(cx);
		let unit_len = unit.chars().count();
		let mut cursor = first.from();
		for range in ranges.iter().rev() {
			cursor = range.from();
			if args.indent_right {
				cx.replace_range(&unit.repeat(repeat), cursor, cursor);
				continue
			}
			let chars = cx.chars(cursor.line);
			let mut end = 0;
			for _ in 0..repeat {
				match chars.get(cursor.ch + end) {
					Some('\t') => end += 1,
					Some(' ') => {
						end += 1;
						for _ in 1..unit_len {
							if chars.get(cursor.ch + end) != Some(&' ') {
								break
							}
							end += 1;
						}
					}
					_ => break
				}
			}
			cx.replace_range("", cursor, cursor.offset_ch(end as isize));
		}
		return Ok(cursor)
	}
	let start = first.from().line;
	let mut end = first.to().line;
	if args.linewise {
		end = end.saturating_sub(1);
	}
	for line in start..=end.max(start).min(cx.last_line()) {
		for _ in 0..repeat {
			indent_line(cx, line, args.indent_right);
		}
	}
	Ok(cx.first_non_ws(start))
}

fn hard_wrap(cx: &mut Cx, args: &OperatorArgs, first: Range, old_anchor: Pos) -> Option<Pos> {
	let from = first.from().line;
	let mut to = first.to().line;
	if args.linewise {
		to = to.saturating_sub(1);
	}
	let width = cx.opt_num("textwidth");
	let mut end_row = cx.host.hard_wrap(from, to.max(from), width)?;
	if end_row > from && args.linewise {
		end_row -= 1;
	}
	Some(if args.keep_cursor { old_anchor } else { Pos::new(end_row, 0) })
}

fn swap_case(s: &str) -> String {
	s.chars()
		.flat_map(|c| {
			if c.is_uppercase() {
				c.to_lowercase().collect::<Vec<_>>()
			} else {
				c.to_uppercase().collect::<Vec<_>>()
			}
		})
		.collect()
}

fn change_case(cx: &mut Cx, args: &OperatorArgs, ranges: &[Range], first: Range, old_anchor: Pos, new_head: Pos) -> Pos {
	let swapped: Vec<String> = ranges.iter()
		.map(|r| {
			let text = cx.get_range(r.from(), r.to());
			match args.to_lower {
				Some(true) => text.to_lowercase(),
				Some(false) => text.to_uppercase(),
				None => swap_case(&text)
			}
		})
		.collect();
	cx.replace_selections(ranges, &swapped);
	if args.should_move_cursor {
		new_head
	} else if !cx.vim.visual_mode && args.linewise && first.anchor.line + 1 == first.head.line {
		cx.first_non_ws(old_anchor.line)
	} else if args.linewise {
		old_anchor
	} else {
		first.from()
	}
}
