//! Text analysis over a [`Host`] buffer: char classes, words, sentences, paragraphs,
//! bracket and quote pairs. Nothing in here edits the buffer.

use crate::host::Host;
use crate::pos::Pos;

pub fn is_word_char(ch: char) -> bool {
	ch.is_alphanumeric() || ch == '_'
}
/// Non-blank, non-word chars form their own words (`foo.bar` is three words)
pub fn is_punct(ch: char) -> bool {
	!is_word_char(ch) && !ch.is_whitespace()
}
pub fn is_big_word_char(ch: char) -> bool {
	!ch.is_whitespace()
}
pub fn is_end_of_sentence(ch: char) -> bool {
	matches!(ch, '.' | '?' | '!')
}
fn is_ws_at(chars: &[char], idx: usize) -> bool {
	chars.get(idx).is_none_or(|c| c.is_whitespace())
}

/// Index of the first non-blank char, or the line length if there is none
pub fn first_non_ws(chars: &[char]) -> usize {
	chars.iter().position(|c| !c.is_whitespace()).unwrap_or(chars.len())
}

fn chars(host: &dyn Host, line: usize) -> Vec<char> {
	host.line(line).chars().collect()
}
fn is_line(host: &dyn Host, line: isize) -> bool {
	line >= 0 && (line as usize) < host.line_count()
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub struct Word {
	pub line: usize,
	pub from: usize,
	pub to: usize
}

#[derive(Clone,Copy)]
enum CharClass {
	Word,
	Punct,
	BigWord
}

impl CharClass {
	fn test(self, ch: Option<char>) -> bool {
		let Some(ch) = ch else { return false };
		match self {
			Self::Word => is_word_char(ch),
			Self::Punct => is_punct(ch),
			Self::BigWord => is_big_word_char(ch)
		}
	}
}

fn classes(big_word: bool) -> &'static [CharClass] {
	if big_word { &[CharClass::BigWord] } else { &[CharClass::Word, CharClass::Punct] }
}

/// Find the next word from `cur` in the given direction.
///
/// A one-char word under the cursor is skipped. With `empty_line_is_word`, an empty line
/// counts as a word of its own.
pub fn find_word(host: &dyn Host, cur: Pos, forward: bool, big_word: bool, empty_line_is_word: bool) -> Option<Word> {
	let dir: isize = if forward { 1 } else { -1 };
	let mut line_num = cur.line as isize;
	let mut line = chars(host, cur.line);
	let mut pos = cur.ch as isize;
	if empty_line_is_word && line.is_empty() {
		line_num += dir;
		if !is_line(host, line_num) {
			return None
		}
		line = chars(host, line_num as usize);
		pos = if forward { 0 } else { line.len() as isize };
	}
	loop {
		if empty_line_is_word && line.is_empty() {
			return Some(Word { line: line_num as usize, from: 0, to: 0 })
		}
		let stop: isize = if dir > 0 { line.len() as isize } else { -1 };
		let at = |p: isize| if p < 0 { None } else { line.get(p as usize).copied() };
		while pos != stop {
			let mut found_word = false;
			for class in classes(big_word) {
				if found_word || !class.test(at(pos)) {
					continue
				}
				let word_start = pos;
				while pos != stop && class.test(at(pos)) {
					pos += dir;
				}
				let word_end = pos;
				found_word = word_start != word_end;
				let single_under_cursor = word_start == cur.ch as isize
					&& line_num == cur.line as isize
					&& word_end == word_start + dir;
				if single_under_cursor {
					continue
				}
				return Some(Word {
					line: line_num as usize,
					from: word_start.min(word_end + 1) as usize,
					to: word_start.max(word_end) as usize
				})
			}
			if !found_word {
				pos += dir;
			}
		}
		line_num += dir;
		if !is_line(host, line_num) {
			return None
		}
		line = chars(host, line_num as usize);
		pos = if dir > 0 { 0 } else { line.len() as isize };
	}
}

/// The `w`/`b`/`e`/`ge` family
pub fn move_to_word(host: &dyn Host, cur: Pos, mut repeat: usize, forward: bool, word_end: bool, big_word: bool) -> Pos {
	let start = cur;
	let mut cur = cur;
	let mut words = vec![];
	if forward != word_end {
		repeat += 1;
	}
	let empty_line_is_word = !(forward && word_end);
	for _ in 0..repeat {
		let Some(word) = find_word(host, cur, forward, big_word, empty_line_is_word) else {
			let last = host.line_count().saturating_sub(1);
			let eod = host.line(last).chars().count();
			words.push(if forward {
				Word { line: last, from: eod, to: eod }
			} else {
				Word { line: 0, from: 0, to: 0 }
			});
			break
		};
		words.push(word);
		cur = Pos::new(word.line, if forward { word.to.saturating_sub(1) } else { word.from });
	}
	let short_circuit = words.len() != repeat;
	let Some(first) = words.first().copied() else {
		return start
	};
	let Some(mut last) = words.pop() else {
		return start
	};
	match (forward, word_end) {
		(true, false) => {
			if !short_circuit && (first.from != start.ch || first.line != start.line) {
				last = words.pop().unwrap_or(last);
			}
			Pos::new(last.line, last.from)
		}
		(true, true) => Pos::new(last.line, last.to.saturating_sub(1)),
		(false, true) => {
			if !short_circuit && (first.to != start.ch || first.line != start.line) {
				last = words.pop().unwrap_or(last);
			}
			Pos::new(last.line, last.to)
		}
		(false, false) => Pos::new(last.line, last.from)
	}
}

#[derive(Clone,Copy,Default,Debug)]
pub struct WordQuery {
	/// Take trailing (or, failing that, leading) whitespace too, as `aw` does
	pub inclusive: bool,
	/// On whitespace, select the whitespace run itself, as `iw` does
	pub inner_word: bool,
	pub big_word: bool,
	/// Only word chars start a word; used by `*` before falling back to symbols
	pub no_symbol: bool,
	/// Look past the end of the line for the next word
	pub multiline: bool
}

/// The word at or after `cur` on its line. Returns `(start, end)` with `end` exclusive.
pub fn expand_word_under_cursor(host: &dyn Host, cur: Pos, q: WordQuery) -> Option<(Pos,Pos)> {
	let line = chars(host, cur.line);
	let at = |i: isize| if i < 0 { None } else { line.get(i as usize).copied() };
	let mut end_line = line.clone();
	let mut end_line_number = cur.line;
	let mut idx = cur.ch as isize;
	let mut word_on_next_line = None;
	let ws = |c: Option<char>| c.is_some_and(|c| c.is_whitespace());

	let mut test: Box<dyn Fn(Option<char>) -> bool> = if q.no_symbol {
		Box::new(|c| CharClass::Word.test(c))
	} else {
		Box::new(|c| CharClass::BigWord.test(c))
	};
	if q.inner_word && ws(at(idx)) {
		test = Box::new(ws);
	} else {
		while !test(at(idx)) {
			idx += 1;
			if idx >= line.len() as isize {
				if !q.multiline {
					return None
				}
				idx -= 1;
				word_on_next_line = find_word(host, cur, true, q.big_word, true);
				break
			}
		}
		test = if q.big_word {
			Box::new(|c| CharClass::BigWord.test(c))
		} else if CharClass::Word.test(at(idx)) {
			Box::new(|c| CharClass::Word.test(c))
		} else {
			Box::new(|c| CharClass::Punct.test(c))
		};
	}

	let mut start = idx;
	let mut end = idx;
	while start >= 0 && test(at(start)) {
		start -= 1;
	}
	start += 1;
	if let Some(word) = word_on_next_line {
		end = word.to as isize;
		end_line_number = word.line;
		end_line = chars(host, end_line_number);
		if end_line.is_empty() && end == 0 {
			end += 1;
		}
	} else {
		while end < line.len() as isize && test(at(end)) {
			end += 1;
		}
	}

	if q.inclusive {
		let word_end = end;
		let starts_with_space = cur.ch as isize <= start && ws(at(cur.ch as isize));
		if !starts_with_space {
			while end < end_line.len() as isize && end_line.get(end as usize).is_some_and(|c| c.is_whitespace()) {
				end += 1;
			}
		}
		if word_end == end || starts_with_space {
			let word_start = start;
			while start > 0 && ws(at(start - 1)) {
				start -= 1;
			}
			if start == 0 && !starts_with_space {
				start = word_start;
			}
		}
	}
	Some((Pos::new(cur.line, start.max(0) as usize), Pos::new(end_line_number, end.max(0) as usize)))
}

/// Column of the `repeat`th occurrence of `target` after (or before) `start` on `line`
pub fn char_idx_in_line(start: usize, line: &[char], target: char, forward: bool, include_char: bool) -> Option<usize> {
	if forward {
		let idx = line.iter().enumerate().skip(start + 1).find(|(_,c)| **c == target).map(|(i,_)| i)?;
		Some(if include_char { idx } else { idx - 1 })
	} else {
		let idx = line[..start.min(line.len())].iter().rposition(|c| *c == target)?;
		Some(if include_char { idx } else { idx + 1 })
	}
}

pub fn move_to_character(host: &dyn Host, head: Pos, repeat: usize, forward: bool, target: char) -> Option<Pos> {
	let line = chars(host, head.line);
	let mut start = head.ch;
	let mut idx = None;
	for _ in 0..repeat.max(1) {
		idx = Some(char_idx_in_line(start, &line, target, forward, true)?);
		start = idx.unwrap_or(start);
	}
	idx.map(|ch| Pos::new(head.line, ch))
}

/// Lines past either end of the buffer are not blank, so the buffer edges never count as paragraph breaks
fn is_blank_line(host: &dyn Host, line: isize) -> bool {
	is_line(host, line) && host.line(line as usize).trim().is_empty()
}

/// Paragraph motion target when `dir` is nonzero. With `dir == 0`, the bounds of the
/// paragraph (or blank run) under `head` for the `ip`/`ap` objects; `end` is exclusive.
pub fn find_paragraph(host: &dyn Host, head: Pos, mut repeat: usize, dir: isize, mut inclusive: bool, visual_line_anchor: Option<Pos>) -> (Pos,Pos) {
	let mut line = head.line as isize;
	let min = 0isize;
	let max = host.line_count() as isize - 1;
	let is_empty = |i: isize| is_blank_line(host, i);
	let is_boundary = |i: isize, dir: isize, any: bool| {
		if any {
			is_empty(i) != is_empty(i + dir)
		} else {
			!is_empty(i) && is_empty(i + dir)
		}
	};
	let skip_fold = |i: isize, dir: isize| -> isize {
		let dir = dir.signum();
		if let Some((start, end)) = host.fold_at(i as usize) {
			let (start, end) = (start as isize, end as isize);
			if i + dir > start && i + dir < end {
				return (if dir > 0 { end } else { start }) - i
			}
		}
		dir
	};
	if dir != 0 {
		let mut i = line;
		let mut dir = dir;
		while min <= i && i <= max && repeat > 0 {
			dir = skip_fold(i, dir);
			if is_boundary(i, dir, false) {
				repeat -= 1;
			}
			i += dir;
		}
		let pos = if i > max {
			Pos::eol(max.max(0) as usize)
		} else {
			Pos::new(i.max(0) as usize, 0)
		};
		return (pos, pos)
	}

	if let Some(anchor) = visual_line_anchor && is_boundary(line, 1, true) && is_boundary(anchor.line as isize, -1, true)
		&& (!inclusive || anchor.line as isize != line) {
		line += 1;
	}
	let mut start_state = is_empty(line);
	let mut i = line;
	while i <= max && repeat > 0 {
		if is_boundary(i, 1, true) && (!inclusive || is_empty(i) != start_state) {
			repeat -= 1;
		}
		i += 1;
	}
	let end = Pos::new(i.max(0) as usize, 0);
	if i > max && !start_state {
		start_state = true;
	} else {
		inclusive = false;
	}
	i = line;
	while i > min {
		if (!inclusive || is_empty(i) == start_state || i == line) && is_boundary(i, -1, true) {
			break
		}
		i -= 1;
	}
	(Pos::new(i.max(0) as usize, 0), end)
}

/// Sentence bounds within a line for the `is`/`as` objects
pub fn get_sentence(host: &dyn Host, cur: Pos, repeat: usize, dir: isize, inclusive: bool) -> Pos {
	let forward = |ln: usize, pos: usize| -> (usize,usize) {
		let line = chars(host, ln);
		if line.is_empty() {
			return (ln, pos)
		}
		let mut p = pos as isize;
		let mut last = p;
		let step = |p: &mut isize| -> bool {
			if *p + 1 >= line.len() as isize {
				false
			} else {
				*p += 1;
				true
			}
		};
		let mut alive = step(&mut p);
		while alive {
			last = p;
			if is_end_of_sentence(line[p as usize]) {
				if !inclusive {
					return (ln, p as usize + 1)
				}
				alive = step(&mut p);
				while alive {
					if line[p as usize].is_whitespace() {
						last = p;
						alive = step(&mut p);
					} else {
						break
					}
				}
				return (ln, last as usize + 1)
			}
			alive = step(&mut p);
		}
		(ln, last as usize + 1)
	};
	let reverse = |ln: usize, pos: usize| -> (usize,usize) {
		let line = chars(host, ln);
		if line.is_empty() {
			return (ln, pos)
		}
		let mut p = pos as isize;
		let mut last = p;
		let step = |p: &mut isize| -> bool {
			if *p - 1 < 0 || *p - 1 >= line.len() as isize {
				false
			} else {
				*p -= 1;
				true
			}
		};
		let mut alive = step(&mut p);
		while alive {
			let ch = line[p as usize];
			if !ch.is_whitespace() && !is_end_of_sentence(ch) {
				last = p;
			} else if is_end_of_sentence(ch) {
				if inclusive && is_ws_at(&line, p as usize + 1) && (p as usize + 1) < line.len() {
					return (ln, p as usize + 1)
				}
				return (ln, last as usize)
			}
			alive = step(&mut p);
		}
		if inclusive && line.get(pos).is_some_and(|c| c.is_whitespace()) {
			(ln, pos)
		} else {
			(ln, last.max(0) as usize)
		}
	};
	let mut idx = (cur.line, cur.ch);
	for _ in 0..repeat.max(1) {
		idx = if dir < 0 { reverse(idx.0, idx.1) } else { forward(idx.0, idx.1) };
	}
	Pos::new(idx.0, idx.1)
}

struct Walker<'a> {
	host: &'a dyn Host,
	line: Option<Vec<char>>,
	ln: isize,
	pos: isize,
	dir: isize
}

impl Walker<'_> {
	fn ch(&self) -> Option<char> {
		let line = self.line.as_ref()?;
		if self.pos < 0 { None } else { line.get(self.pos as usize).copied() }
	}
	fn is_empty_line(&self) -> bool {
		self.line.as_ref().is_some_and(|l| l.is_empty())
	}
	fn next(&mut self) {
		let Some(line) = self.line.as_ref() else { return };
		if self.pos + self.dir < 0 || self.pos + self.dir >= line.len() as isize {
			self.ln += self.dir;
			if !is_line(self.host, self.ln) {
				self.line = None;
				return
			}
			let line = chars(self.host, self.ln as usize);
			self.pos = if self.dir > 0 { 0 } else { line.len() as isize - 1 };
			self.line = Some(line);
		} else {
			self.pos += self.dir;
		}
	}
}

/// The `(`/`)` motion target
pub fn find_sentence(host: &dyn Host, cur: Pos, repeat: usize, dir: isize) -> Pos {
	let forward = |ln: usize, pos: usize| -> (usize,usize) {
		let line = chars(host, ln);
		let mut stop = line.is_empty();
		let skip_empty = line.is_empty();
		let mut w = Walker { host, line: Some(line), ln: ln as isize, pos: pos as isize, dir: 1 };
		let mut last_valid = (ln, pos as isize);
		w.next();
		while w.line.is_some() {
			last_valid = (w.ln as usize, w.pos);
			if w.is_empty_line() && !skip_empty {
				return (w.ln as usize, w.pos.max(0) as usize)
			}
			let line = w.line.as_deref().unwrap_or(&[]);
			if stop && !w.is_empty_line() && w.ch().is_some_and(|c| !c.is_whitespace()) {
				return (w.ln as usize, w.pos.max(0) as usize)
			}
			if w.ch().is_some_and(is_end_of_sentence) && !stop
				&& (w.pos == line.len() as isize - 1 || is_ws_at(line, w.pos as usize + 1)) {
				stop = true;
			}
			w.next();
		}
		let line = chars(host, last_valid.0);
		let pos = line.iter().rposition(|c| !c.is_whitespace()).unwrap_or(0);
		(last_valid.0, pos)
	};
	let reverse = |ln: usize, pos: usize| -> (usize,usize) {
		let line = chars(host, ln);
		let mut skip_empty = line.is_empty();
		let mut w = Walker { host, line: Some(line), ln: ln as isize, pos: pos as isize, dir: -1 };
		let mut last_valid: (usize,Option<isize>) = (ln, None);
		w.next();
		while w.line.is_some() {
			if w.is_empty_line() && !skip_empty {
				return match last_valid.1 {
					Some(p) => (last_valid.0, p.max(0) as usize),
					None => (w.ln as usize, w.pos.max(0) as usize)
				}
			}
			if w.ch().is_some_and(is_end_of_sentence)
				&& let Some(p) = last_valid.1
				&& !(w.ln as usize == last_valid.0 && w.pos + 1 == p) {
				return (last_valid.0, p.max(0) as usize)
			}
			if !w.is_empty_line() && w.ch().is_some_and(|c| !c.is_whitespace()) {
				skip_empty = false;
				last_valid = (w.ln as usize, Some(w.pos));
			}
			w.next();
		}
		let line = chars(host, last_valid.0);
		(last_valid.0, first_non_ws(&line).min(line.len().saturating_sub(1)))
	};
	let mut idx = (cur.line, cur.ch);
	for _ in 0..repeat.max(1) {
		idx = if dir < 0 { reverse(idx.0, idx.1) } else { forward(idx.0, idx.1) };
	}
	Pos::new(idx.0, idx.1)
}

/// Find the bracket balancing `open`/`close` starting at `pos`.
/// Forward scans from `pos` inclusive for the closer; backward scans from just before `pos` for the opener.
pub fn scan_for_bracket(host: &dyn Host, pos: Pos, forward: bool, open: char, close: char) -> Option<Pos> {
	let mut depth = 0usize;
	let line_count = host.line_count();
	if forward {
		let mut ch = pos.ch;
		for ln in pos.line..line_count {
			let line = chars(host, ln);
			for (i, c) in line.iter().enumerate().skip(ch) {
				if *c == open && open != close {
					depth += 1;
				} else if *c == close {
					if depth == 0 {
						return Some(Pos::new(ln, i))
					}
					depth -= 1;
				}
			}
			ch = 0;
		}
	} else {
		let mut end = Some(pos.ch);
		for ln in (0..=pos.line.min(line_count.saturating_sub(1))).rev() {
			let line = chars(host, ln);
			let upto = end.unwrap_or(line.len()).min(line.len());
			for i in (0..upto).rev() {
				let c = line[i];
				if c == close && open != close {
					depth += 1;
				} else if c == open {
					if depth == 0 {
						return Some(Pos::new(ln, i))
					}
					depth -= 1;
				}
			}
			end = None;
		}
	}
	None
}

fn bracket_pair(symb: char) -> Option<(char,char)> {
	match symb {
		'(' | ')' => Some(('(', ')')),
		'[' | ']' => Some(('[', ']')),
		'{' | '}' => Some(('{', '}')),
		'<' | '>' => Some(('<', '>')),
		_ => None
	}
}

/// Bounds of the bracket pair enclosing `head` for `i(`/`a(` and friends. `end` is exclusive.
pub fn select_companion_object(host: &dyn Host, head: Pos, symb: char, inclusive: bool) -> Option<(Pos,Pos)> {
	let (open, close) = bracket_pair(symb)?;
	let line = chars(host, head.line);
	let offset = if line.get(head.ch) == Some(&open) { 1 } else { 0 };
	let from = Pos::new(head.line, head.ch + offset);
	let mut start = scan_for_bracket(host, from, false, open, close)?;
	let mut end = scan_for_bracket(host, from, true, open, close)?;
	if start > end {
		std::mem::swap(&mut start, &mut end);
	}
	if inclusive {
		end.ch += 1;
	} else {
		start.ch += 1;
	}
	Some((start, end))
}

/// Bounds of the quoted string around `head` on its line for `i"`/`a"`. Falls back to an
/// empty range at the cursor when there is no enclosing pair.
pub fn find_beginning_and_end(host: &dyn Host, head: Pos, symb: char, inclusive: bool) -> (Pos,Pos) {
	use crate::host::TokenKind;
	let mut cur = head;
	let line = chars(host, head.line);
	let first_index = line.iter().position(|c| *c == symb);
	let mut start: Option<usize> = None;
	let mut end: Option<usize> = None;
	if let Some(first) = first_index {
		if cur.ch < first {
			cur.ch = first;
		} else if first < cur.ch && line.get(cur.ch) == Some(&symb) {
			let string_after = host.token_type_at(head.offset_ch(1)) == Some(TokenKind::String);
			let string_before = host.token_type_at(head) == Some(TokenKind::String);
			if !(string_after && !string_before) {
				end = Some(cur.ch);
				cur.ch -= 1;
			}
		}
	}
	if line.get(cur.ch) == Some(&symb) && end.is_none() {
		start = Some(cur.ch + 1);
	} else {
		start = line[..(cur.ch + 1).min(line.len())].iter().rposition(|c| *c == symb).map(|i| i + 1).or(start);
	}
	if let Some(s) = start && end.is_none() {
		end = line.iter().enumerate().skip(s).find(|(_,c)| **c == symb).map(|(i,_)| i);
	}
	let (Some(mut start), Some(mut end)) = (start, end) else {
		return (cur, cur)
	};
	if inclusive {
		start -= 1;
		end += 1;
	}
	(Pos::new(cur.line, start), Pos::new(cur.line, end))
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
enum SymbolMode {
	Bracket,
	Section,
	Comment,
	Method,
	Preprocess
}

/// Targets of the `[(`, `])`, `[{`, `]}`, `[[`, `]]`, `[m`, `]M`, `[*`, `]/` and `[#` motions
pub fn find_symbol(host: &dyn Host, cur: Pos, mut repeat: usize, forward: bool, symb: char) -> Pos {
	let mode = match symb {
		'(' | ')' | '{' | '}' => SymbolMode::Bracket,
		'[' | ']' => SymbolMode::Section,
		'*' | '/' => SymbolMode::Comment,
		'm' | 'M' => SymbolMode::Method,
		'#' => SymbolMode::Preprocess,
		_ => return cur
	};
	let increment: isize = if forward { 1 } else { -1 };
	let end_line: isize = if forward { host.line_count() as isize } else { -1 };
	let mut found = cur;
	let mut line = cur.line as isize;
	let mut line_text = chars(host, cur.line);
	let mut index = cur.ch as isize;
	let at = |text: &[char], i: isize| if i < 0 { None } else { text.get(i as usize).copied() };
	let mut next_ch = at(&line_text, index);
	let mut last_ch: Option<char> = None;
	let mut symb = symb;
	let mut reverse_symb = match (forward, symb) {
		(true, ')') => Some('('),
		(true, '}') => Some('{'),
		(false, '(') => Some(')'),
		(false, '{') => Some('}'),
		_ => None
	};
	let mut depth: isize = 0;
	let mut move_through = false;
	match mode {
		SymbolMode::Section => {
			move_through = true;
			symb = if (if forward { ']' } else { '[' }) == symb { '{' } else { '}' };
		}
		SymbolMode::Method => {
			symb = if symb == 'm' { '{' } else { '}' };
			reverse_symb = Some(if symb == '{' { '}' } else { '{' });
		}
		SymbolMode::Preprocess => index = 0,
		_ => {}
	}
	while line != end_line && repeat > 0 {
		index += increment;
		next_ch = at(&line_text, index);
		if next_ch.is_none() {
			line += increment;
			line_text = if is_line(host, line) { chars(host, line as usize) } else { vec![] };
			index = if increment > 0 { 0 } else { (line_text.len() as isize - 1).max(0) };
			next_ch = at(&line_text, index);
		}
		let complete = match mode {
			SymbolMode::Bracket => {
				if next_ch == Some(symb) {
					depth += 1;
					depth >= 1
				} else {
					if next_ch.is_some() && next_ch == reverse_symb {
						depth -= 1;
					}
					false
				}
			}
			SymbolMode::Section => index == 0 && next_ch == Some(symb),
			SymbolMode::Comment => {
				let found = last_ch == Some('*') && next_ch == Some('/');
				last_ch = next_ch;
				found
			}
			SymbolMode::Method => next_ch == Some(symb),
			SymbolMode::Preprocess => {
				let mut done = false;
				if next_ch == Some('#') {
					let text: String = line_text.iter().collect();
					let token: String = text.strip_prefix('#')
						.map(|t| t.chars().take_while(|c| is_word_char(*c)).collect())
						.unwrap_or_default();
					match token.as_str() {
						"endif" => {
							if forward && depth == 0 {
								done = true;
							}
							depth += 1;
						}
						"if" => {
							if !forward && depth == 0 {
								done = true;
							}
							depth -= 1;
						}
						_ => {}
					}
					if token == "else" && depth == 0 {
						done = true;
					}
				}
				done
			}
		};
		if complete {
			found = Pos::new(line.max(0) as usize, index.max(0) as usize);
			repeat -= 1;
		}
	}
	if next_ch.is_some() || move_through {
		let last = host.line_count().saturating_sub(1) as isize;
		return Pos::new(line.clamp(0, last) as usize, index.max(0) as usize)
	}
	found
}

/// Match for the bracket at `pos`, for `%`
pub fn find_matching_bracket(host: &dyn Host, pos: Pos) -> Option<Pos> {
	let line = chars(host, pos.line);
	let ch = *line.get(pos.ch)?;
	let (open, close) = bracket_pair(ch)?;
	if ch == open {
		scan_for_bracket(host, pos.offset_ch(1), true, open, close)
	} else {
		scan_for_bracket(host, pos, false, open, close)
	}
}

/// Bounds of the tag pair enclosing `head` for `it`/`at`.
/// Inner bounds sit between the tags, outer bounds include them.
pub fn expand_tag_under_cursor(host: &dyn Host, head: Pos, inclusive: bool) -> (Pos,Pos) {
	let lines: Vec<Vec<char>> = (0..host.line_count()).map(|l| chars(host, l)).collect();
	let mut flat: Vec<char> = vec![];
	let mut starts = vec![];
	for line in &lines {
		starts.push(flat.len());
		flat.extend(line);
		flat.push('\n');
	}
	let to_index = |p: Pos| starts.get(p.line).copied().unwrap_or(flat.len()) + p.ch;
	let to_pos = |i: usize| {
		let line = starts.iter().rposition(|s| *s <= i).unwrap_or(0);
		Pos::new(line, i - starts[line])
	};
	let cursor = to_index(head);

	// (name, open_start, open_end) for every open tag
	let mut stack: Vec<(String,usize,usize)> = vec![];
	let mut best: Option<(usize,usize,usize,usize)> = None;
	let mut i = 0;
	while i < flat.len() {
		if flat[i] != '<' {
			i += 1;
			continue
		}
		let Some(close_rel) = flat[i..].iter().position(|c| *c == '>') else { break };
		let tag_end = i + close_rel + 1;
		let body: String = flat[i + 1..tag_end - 1].iter().collect();
		if let Some(name) = body.strip_prefix('/') {
			let name = name.trim().to_string();
			if let Some(idx) = stack.iter().rposition(|(n,_,_)| *n == name) {
				let (_, open_start, open_end) = stack[idx].clone();
				stack.truncate(idx);
				if open_start <= cursor && cursor < tag_end {
					let span = tag_end - open_start;
					if best.is_none_or(|(s,_,_,e)| e - s > span) {
						best = Some((open_start, open_end, i, tag_end));
					}
				}
			}
		} else if !body.ends_with('/') && !body.starts_with('!') {
			let name: String = body.chars().take_while(|c| !c.is_whitespace()).collect();
			stack.push((name, i, tag_end));
		}
		i = tag_end;
	}
	match best {
		Some((open_start, _, _, close_end)) if inclusive => (to_pos(open_start), to_pos(close_end)),
		Some((_, open_end, close_start, _)) => (to_pos(open_end), to_pos(close_start)),
		None => (head, head)
	}
}
