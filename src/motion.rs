//! The motion engine. A motion maps the current head to a new head, or to a whole
//! `(anchor, head)` range for text objects and visual-mode motions.

use log::debug;
use unicode_width::UnicodeWidthChar;

use crate::error::VimResult;
use crate::pos::{Pos, EOL};
use crate::search;
use crate::state::{Cx, InputState, LastCharacterSearch};
use crate::text::{self, WordQuery};
use crate::vicmd::{Motion, MotionArgs};

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum MotionResult {
	Head(Pos),
	/// New anchor and head
	Range(Pos,Pos)
}

impl From<Pos> for MotionResult {
	fn from(pos: Pos) -> Self {
		Self::Head(pos)
	}
}

/// Run a motion from `head`. `None` means the motion failed and nothing should happen.
///
/// `args` is updated in place where a motion refines its own arguments (`;` sets its own
/// inclusiveness, `ap` turns linewise), since the caller builds the operator range from them.
pub fn eval_motion(cx: &mut Cx, motion: &Motion, head: Pos, args: &mut MotionArgs, prev: &InputState) -> VimResult<Option<MotionResult>> {
	use Motion as M;
	let repeat = args.repeat;
	let res: Option<MotionResult> = match motion {
		M::MoveToTopLine => {
			let line = (cx.host.visible_lines().top + repeat.saturating_sub(1)).min(cx.last_line());
			Some(cx.first_non_ws(line).into())
		}
		M::MoveToMiddleLine => {
			let visible = cx.host.visible_lines();
			let line = ((visible.top + visible.bottom) / 2).min(cx.last_line());
			Some(cx.first_non_ws(line).into())
		}
		M::MoveToBottomLine => {
			let visible = cx.host.visible_lines();
			let line = (visible.bottom + 1).saturating_sub(repeat).min(cx.last_line());
			Some(cx.first_non_ws(line).into())
		}
		M::ExpandToLine => Some(Pos::eol(head.line + repeat.saturating_sub(1)).into()),
		M::FindNext => find_next(cx, head, args),
		M::FindAndSelectNextInclusive => find_and_select_next(cx, args, prev),
		M::GoToMark => {
			let Some(name) = args.selected_character else { return Ok(None) };
			cx.mark_pos(name).map(|pos| {
				let pos = cx.clip_pos(pos);
				MotionResult::Head(if args.linewise { cx.first_non_ws(pos.line) } else { pos })
			})
		}
		M::MoveToOtherHighlightedEnd => {
			let sel = cx.vim.sel;
			if cx.vim.visual_block && args.same_line {
				Some(MotionResult::Range(
					cx.clip_to_content(Pos::new(sel.anchor.line, sel.head.ch)),
					cx.clip_to_content(Pos::new(sel.head.line, sel.anchor.ch))
				))
			} else {
				Some(MotionResult::Range(sel.head, sel.anchor))
			}
		}
		M::JumpToMark => Some(jump_to_mark(cx, head, args).into()),
		M::MoveByCharacters => {
			let delta = repeat.min(isize::MAX as usize) as isize;
			Some(head.offset_ch(if args.forward { delta } else { -delta }).into())
		}
		M::MoveByLines => Some(move_by_lines(cx, head, args).into()),
		M::MoveByDisplayLines => Some(move_by_display_lines(cx, head, args).into()),
		M::MoveByPage => {
			let visible = cx.host.visible_lines();
			let height = (visible.bottom.saturating_sub(visible.top) + 1).max(1);
			let delta = repeat.saturating_mul(height);
			let line = if args.forward { head.line.saturating_add(delta) } else { head.line.saturating_sub(delta) };
			Some(Pos::new(line.min(cx.last_line()), head.ch).into())
		}
		M::MoveByScroll => {
			let mut repeat = repeat;
			if repeat == 0 {
				let visible = cx.host.visible_lines();
				repeat = ((visible.bottom.saturating_sub(visible.top) + 1) / 2).max(1);
			}
			args.repeat = repeat;
			let end = move_by_display_lines(cx, head, args);
			let delta = end.line as isize - head.line as isize;
			cx.host.scroll_by(delta);
			Some(end.into())
		}
		M::MoveByParagraph => {
			let dir = if args.forward { 1 } else { -1 };
			Some(text::find_paragraph(&*cx.host, head, repeat, dir, false, None).0.into())
		}
		M::MoveBySentence => {
			let dir = if args.forward { 1 } else { -1 };
			Some(text::find_sentence(&*cx.host, head, repeat, dir).into())
		}
		M::MoveByWords => Some(text::move_to_word(&*cx.host, head, repeat, args.forward, args.word_end, args.big_word).into()),
		M::MoveTillCharacter => {
			let Some(target) = args.selected_character else { return Ok(None) };
			record_last_character_search(cx, true, args.forward, target);
			text::move_to_character(&*cx.host, head, repeat, args.forward, target)
				.map(|pos| pos.offset_ch(if args.forward { -1 } else { 1 }).into())
		}
		M::MoveToCharacter => {
			let Some(target) = args.selected_character else { return Ok(None) };
			record_last_character_search(cx, false, args.forward, target);
			Some(text::move_to_character(&*cx.host, head, repeat, args.forward, target).unwrap_or(head).into())
		}
		M::RepeatLastCharacterSearch => repeat_last_character_search(cx, head, args),
		M::MoveToSymbol => {
			let Some(symb) = args.selected_character else { return Ok(None) };
			Some(text::find_symbol(&*cx.host, head, repeat, args.forward, symb).into())
		}
		M::MoveToColumn => {
			cx.vim.last_hpos = repeat.saturating_sub(1);
			let ch = column_to_ch(&cx.chars(head.line), repeat.saturating_sub(1));
			Some(cx.clip_to_content(Pos::new(head.line, ch)).into())
		}
		M::MoveToEol => Some(move_to_eol(cx, head, args, false).into()),
		M::MoveToFirstNonWhiteSpaceCharacter => Some(cx.first_non_ws(head.line).into()),
		M::MoveToMatchedSymbol => Some(move_to_matched_symbol(cx, head).into()),
		M::MoveToStartOfLine => Some(Pos::new(head.line, 0).into()),
		M::MoveToLineOrEdgeOfDocument => {
			let mut line = if args.forward { cx.last_line() } else { 0 };
			if args.repeat_is_explicit {
				line = repeat.saturating_sub(1).min(cx.last_line());
			}
			Some(cx.first_non_ws(line).into())
		}
		M::MoveToStartOfDisplayLine => Some(Pos::new(head.line, 0).into()),
		M::MoveToEndOfDisplayLine => Some(Pos::new(head.line, cx.line_len(head.line).saturating_sub(1)).into()),
		M::TextObjectManipulation => text_object(cx, head, args),
		M::Custom(name) => {
			let Some(func) = cx.g.registry.motion(name) else {
				return Err(crate::error::VimError::Fault(format!("no motion named {name}")))
			};
			func(&mut *cx, head, &*args)?
		}
	};
	debug!("{motion:?} from {head} -> {res:?}");
	Ok(res)
}

fn record_last_character_search(cx: &mut Cx, till: bool, forward: bool, selected_character: char) {
	cx.g.global.last_character_search = Some(LastCharacterSearch { till, forward, selected_character });
}

/// Char index at display column `col`, measured with unicode widths
fn column_to_ch(chars: &[char], col: usize) -> usize {
	let mut width = 0;
	for (i, ch) in chars.iter().enumerate() {
		if width >= col {
			return i
		}
		width += ch.width().unwrap_or(0);
	}
	chars.len()
}

pub fn move_to_eol(cx: &mut Cx, head: Pos, args: &MotionArgs, keep_hpos: bool) -> Pos {
	if !keep_hpos {
		cx.vim.last_hpos = EOL;
	}
	Pos::eol((head.line + args.repeat.max(1) - 1).min(cx.last_line()))
}

fn move_by_lines(cx: &mut Cx, head: Pos, args: &MotionArgs) -> Pos {
	let mut end_ch = head.ch;
	if cx.vim.last_motion.as_ref().is_some_and(|m| m.keeps_hpos()) {
		end_ch = cx.vim.last_hpos;
	} else {
		cx.vim.last_hpos = end_ch;
	}
	let repeat = args.repeat as isize + args.repeat_offset;
	let mut line = if args.forward { head.line as isize + repeat } else { head.line as isize - repeat };
	let last = cx.last_line() as isize;
	if line < 0 && head.line == 0 {
		return Pos::new(head.line, 0)
	}
	if line > last && head.line as isize == last {
		return move_to_eol(cx, head, args, true)
	}
	line = line.clamp(0, last);
	if let Some((start, end)) = cx.host.fold_at(line as usize) {
		if args.forward {
			if line as usize > start {
				line = (end as isize + 1).min(last);
			}
		} else {
			line = start as isize;
		}
	}
	let line = line as usize;
	if args.to_first_char {
		end_ch = cx.first_non_ws(line).ch;
		cx.vim.last_hpos = end_ch;
	}
	Pos::new(line, end_ch)
}

fn move_by_display_lines(cx: &mut Cx, head: Pos, args: &MotionArgs) -> Pos {
	let delta = args.repeat.min(isize::MAX as usize) as isize;
	let delta = if args.forward { delta } else { -delta };
	let res = match cx.host.display_line_move(head, delta) {
		Some(pos) => pos,
		None => {
			let goal = if cx.vim.last_motion.as_ref().is_some_and(|m| m.keeps_hpos()) { cx.vim.last_hpos } else { head.ch };
			let line = (head.line as isize + delta).clamp(0, cx.last_line() as isize) as usize;
			Pos::new(line, goal)
		}
	};
	cx.vim.last_hpos = res.ch;
	res
}

fn jump_to_mark(cx: &mut Cx, head: Pos, args: &MotionArgs) -> Pos {
	let mut best = head;
	let marks: Vec<Pos> = cx.vim.marks.iter()
		.filter(|(name,_)| name.is_ascii_lowercase())
		.map(|(_,pos)| cx.clip_pos(*pos))
		.collect();
	for _ in 0..args.repeat.max(1) {
		let cursor = best;
		for &mark in &marks {
			let wrong_direction = if args.forward { mark < cursor } else { cursor < mark };
			if wrong_direction || (args.linewise && mark.line == cursor.line) {
				continue
			}
			let between = if args.forward {
				crate::pos::cursor_is_between(cursor, mark, best)
			} else {
				crate::pos::cursor_is_between(best, mark, cursor)
			};
			if cursor == best || between {
				best = mark;
			}
		}
	}
	if args.linewise {
		best = cx.first_non_ws(best.line);
	}
	best
}

fn find_next(cx: &mut Cx, head: Pos, args: &MotionArgs) -> Option<MotionResult> {
	let query = cx.g.global.search_query.clone()?;
	let prev = (!args.forward) != cx.g.global.search_is_reversed;
	if cx.opt_bool("hlsearch") {
		cx.host.highlight_search(Some(&query.regex));
	}
	search::find_next(&*cx.host, head, prev, &query, args.repeat).map(MotionResult::Head)
}

/// `gn`: select the next match. Enters visual mode unless an operator is waiting for the range.
fn find_and_select_next(cx: &mut Cx, args: &MotionArgs, prev_input: &InputState) -> Option<MotionResult> {
	let query = cx.g.global.search_query.clone()?;
	let reversed = cx.g.global.search_is_reversed;
	let prev = (!args.forward) != reversed;
	let cursor = if cx.vim.visual_mode { cx.vim.sel.head } else { cx.cursor() };
	let (from, to) = search::find_next_from_and_to_inclusive(&*cx.host, cursor, prev, &query, args.repeat, cx.vim.visual_mode)?;
	if prev_input.operator.is_some() {
		return Some(MotionResult::Range(from, to))
	}
	let to = to.offset_ch(-1);
	if cx.vim.visual_mode {
		if cx.vim.visual_line || cx.vim.visual_block {
			cx.vim.visual_line = false;
			cx.vim.visual_block = false;
			cx.emit_mode();
		}
		let anchor = cx.vim.sel.anchor;
		let head = if reversed == args.forward { from } else { to };
		return Some(MotionResult::Range(anchor, head))
	}
	cx.vim.visual_mode = true;
	cx.vim.visual_line = false;
	cx.vim.visual_block = false;
	cx.emit_mode();
	Some(if prev { MotionResult::Range(to, from) } else { MotionResult::Range(from, to) })
}

fn repeat_last_character_search(cx: &mut Cx, head: Pos, args: &mut MotionArgs) -> Option<MotionResult> {
	let Some(last) = cx.g.global.last_character_search else {
		return Some(head.into())
	};
	let forward = args.forward == last.forward;
	let increment: isize = if last.till { if forward { -1 } else { 1 } } else { 0 };
	args.inclusive = forward;
	let start = head.offset_ch(-increment);
	match text::move_to_character(&*cx.host, start, args.repeat, forward, last.selected_character) {
		Some(pos) => Some(pos.offset_ch(increment).into()),
		None => Some(head.into())
	}
}

fn move_to_matched_symbol(cx: &mut Cx, head: Pos) -> Pos {
	use crate::host::TokenKind;
	let chars = cx.chars(head.line);
	let found = (head.ch..chars.len()).find(|&ch| {
		matches!(chars[ch], '(' | ')' | '[' | ']' | '{' | '}')
			&& !matches!(cx.host.token_type_at(Pos::new(head.line, ch + 1)), Some(TokenKind::String | TokenKind::Comment))
	});
	let Some(ch) = found else {
		return head
	};
	let pos = Pos::new(head.line, ch);
	cx.host.find_matching_bracket(pos.offset_ch(1))
		.or_else(|| text::find_matching_bracket(&*cx.host, pos))
		.unwrap_or(head)
}

/// Grow the visual selection to cover `start..end` from a text object
fn expand_selection(cx: &Cx, start: Pos, end: Pos, move_sel: bool) -> MotionResult {
	let sel = cx.vim.sel;
	let mut head = if move_sel { start } else { sel.head };
	let mut anchor = if move_sel { start } else { sel.anchor };
	let (start, end) = if end < start { (end, start) } else { (start, end) };
	if head < anchor {
		head = start.min(head);
		anchor = anchor.max(end);
	} else {
		anchor = start.min(anchor);
		head = head.max(end);
		if head.ch == 0 {
			if head.line > 0 {
				head = cx.eol_of(head.line - 1);
			}
		} else {
			head = head.offset_ch(-1);
		}
	}
	MotionResult::Range(anchor, head)
}

fn text_object(cx: &mut Cx, head: Pos, args: &mut MotionArgs) -> Option<MotionResult> {
	let mut character = args.selected_character?;
	match character {
		'b' => character = '(',
		'B' => character = '{',
		_ => {}
	}
	let inclusive = !args.text_object_inner;
	let mut move_sel = false;
	let host = &*cx.host;
	let range: Option<(Pos,Pos)> = match character {
		'(' | ')' | '{' | '}' | '[' | ']' | '<' | '>' => {
			move_sel = true;
			text::select_companion_object(host, head, character, inclusive).or_else(|| {
				let next = scan_forward_for(host, head, character)?;
				text::select_companion_object(host, next, character, inclusive)
			})
		}
		'\'' | '"' | '`' => {
			move_sel = true;
			Some(text::find_beginning_and_end(host, head, character, inclusive))
		}
		'w' | 'W' => {
			let query = WordQuery {
				inclusive,
				inner_word: !inclusive,
				big_word: character == 'W',
				no_symbol: character == 'W',
				multiline: true
			};
			let mut range: Option<(Pos,Pos)> = None;
			for _ in 0..args.repeat.max(1) {
				let from = range.map_or(head, |(_,end)| end);
				if let Some((start, end)) = text::expand_word_under_cursor(host, from, query) {
					range = Some((range.map_or(start, |(s,_)| s), end));
				}
			}
			range
		}
		'p' => {
			let anchor = cx.vim.visual_line.then_some(cx.vim.sel.anchor);
			let (start, mut end) = text::find_paragraph(host, head, args.repeat, 0, inclusive, anchor);
			args.linewise = true;
			if cx.vim.visual_mode {
				cx.vim.visual_line = true;
			} else {
				end.line = end.line.saturating_sub(1);
			}
			Some((start, end))
		}
		't' => Some(text::expand_tag_under_cursor(host, head, inclusive)),
		's' => {
			let chars = cx.chars(head.line);
			let mut head = head;
			if head.ch > 0 && chars.get(head.ch).is_some_and(|c| text::is_end_of_sentence(*c)) {
				head.ch -= 1;
			}
			let end = text::get_sentence(host, head, args.repeat, 1, inclusive);
			let mut start = text::get_sentence(host, head, args.repeat, -1, inclusive);
			let ws = |line: usize, ch: Option<usize>| ch.is_none_or(|ch| cx.chars(line).get(ch).is_none_or(|c| c.is_whitespace()));
			if ws(start.line, Some(start.ch)) && ws(end.line, end.ch.checked_sub(1)) {
				start.ch += 1;
			}
			Some((start, end))
		}
		_ => None
	};
	let (start, end) = range?;
	if !cx.vim.visual_mode {
		return Some(MotionResult::Range(start, end))
	}
	Some(expand_selection(cx, start, end, move_sel))
}

/// First occurrence of `target` at or after `from`
fn scan_forward_for(host: &dyn crate::host::Host, from: Pos, target: char) -> Option<Pos> {
	let mut ch = from.ch;
	for line in from.line..host.line_count() {
		let text: Vec<char> = host.line(line).chars().collect();
		if let Some(idx) = text.iter().skip(ch).position(|c| *c == target) {
			return Some(Pos::new(line, ch + idx))
		}
		ch = 0;
	}
	None
}

/// For a forward charwise operator range ending in a line break: pull the end back so the
/// break (and any trailing blank lines) is not taken.
pub fn clip_to_line(cx: &Cx, start: Pos, end: &mut Pos) {
	let selection = cx.get_range(start, *end);
	let trimmed = selection.trim_end();
	if !selection[trimmed.len()..].contains('\n') {
		return
	}
	let mut lines: Vec<&str> = selection.split('\n').collect();
	lines.pop();
	let mut line = lines.pop();
	while !lines.is_empty() && line.is_some_and(|l| !l.is_empty() && l.trim().is_empty()) {
		end.line = end.line.saturating_sub(1);
		end.ch = 0;
		line = lines.pop();
	}
	if line.is_some_and(|l| !l.is_empty()) {
		end.line = end.line.saturating_sub(1);
		end.ch = cx.line_len(end.line);
	} else {
		end.ch = 0;
	}
}

/// Record a jump from `old` to `new` unless they are the same spot
pub fn record_jump_position(cx: &mut Cx, old: Pos, new: Pos) {
	if old != new {
		let id = cx.id;
		cx.g.global.jump_list.add(id, old, new);
	}
}
