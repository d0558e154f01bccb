//! Search queries: parsing `/pattern/flags`, Vim-flavored regex translation, and a search
//! cursor that walks matches over the whole buffer in either direction.

use regex::{Captures, Regex, RegexBuilder};

use crate::error::{VimError, VimResult};
use crate::host::Host;
use crate::pos::Pos;

#[derive(Clone)]
pub struct SearchQuery {
	/// The pattern as handed to the regex engine, after translation
	pub source: String,
	pub regex: Regex,
	pub ignore_case: bool
}

impl PartialEq for SearchQuery {
	fn eq(&self, other: &Self) -> bool {
		self.source == other.source && self.ignore_case == other.ignore_case
	}
}

impl std::fmt::Debug for SearchQuery {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let flags = if self.ignore_case { "im" } else { "m" };
		write!(f, "/{}/{flags}", self.source)
	}
}

impl SearchQuery {
	pub fn new(source: &str, ignore_case: bool) -> Result<Self,regex::Error> {
		let regex = RegexBuilder::new(source)
			.case_insensitive(ignore_case)
			.multi_line(true)
			.build()?;
		Ok(Self { source: source.to_string(), regex, ignore_case })
	}
}

/// Backslash-escape every regex metachar in `s`
pub fn escape_regex(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	for ch in s.chars() {
		if ".?*+$[]/\\(){}|-^".contains(ch) {
			out.push('\\');
		}
		out.push(ch);
	}
	out
}

/// Byte offsets of every separator not preceded by an unescaped backslash
pub fn find_unescaped_separators(s: &str, separator: char) -> Vec<usize> {
	let mut escape_next = false;
	let mut found = vec![];
	for (i, ch) in s.char_indices() {
		if !escape_next && ch == separator {
			found.push(i);
		}
		escape_next = !escape_next && ch == '\\';
	}
	found
}

/// Split `/a/b/c` into `["a", "b", "c"]`. Returns `None` when the string does not start with the separator.
pub fn split_by_separator(s: &str, separator: char) -> Option<Vec<String>> {
	let seps = find_unescaped_separators(s, separator);
	let Some(&first) = seps.first() else {
		return Some(vec![])
	};
	if first != 0 {
		return None
	}
	let tokens = seps.iter()
		.enumerate()
		.map(|(i, &start)| {
			let end = seps.get(i + 1).copied().unwrap_or(s.len());
			s[start + separator.len_utf8()..end].to_string()
		})
		.collect();
	Some(tokens)
}

pub fn split_by_slash(s: &str) -> Option<Vec<String>> {
	split_by_separator(s, '/')
}

/// Vim regex to engine regex: `\(`, `\|`, `\{` become groups, alternation and counts, and
/// their bare forms become literals.
pub fn translate_regex(s: &str) -> String {
	const SPECIALS: &str = "|(){";
	const UNESCAPE: &str = "}";
	let chars: Vec<char> = s.chars().collect();
	let mut out = String::with_capacity(s.len());
	let mut escape_next = false;
	for i in -1isize..chars.len() as isize {
		let c = if i < 0 { None } else { chars.get(i as usize).copied() };
		let n = chars.get((i + 1) as usize).copied();
		let mut special_comes_next = n.is_some_and(|n| SPECIALS.contains(n));
		if escape_next {
			if c != Some('\\') || !special_comes_next {
				out.extend(c);
			}
			escape_next = false;
		} else if c == Some('\\') {
			escape_next = true;
			if n.is_some_and(|n| UNESCAPE.contains(n)) {
				special_comes_next = true;
			}
			if !special_comes_next || n == Some('\\') {
				out.push('\\');
			}
		} else {
			out.extend(c);
			if special_comes_next && n != Some('\\') {
				out.push('\\');
			}
		}
	}
	out
}

/// Vim replacement text to the `$n` form understood by [`expand_replacement`]
pub fn translate_regex_replace(s: &str) -> String {
	let chars: Vec<char> = s.chars().collect();
	let mut out = String::with_capacity(s.len());
	let mut escape_next = false;
	let mut i: isize = -1;
	while i < chars.len() as isize {
		let c = if i < 0 { None } else { chars.get(i as usize).copied() };
		let n = chars.get((i + 1) as usize).copied();
		let unescaped = match (c, n) {
			(Some('\\'), Some('n')) => Some('\n'),
			(Some('\\'), Some('r')) => Some('\r'),
			(Some('\\'), Some('t')) => Some('\t'),
			_ => None
		};
		if let Some(u) = unescaped {
			out.push(u);
			i += 1;
		} else if escape_next {
			out.extend(c);
			escape_next = false;
		} else if c == Some('\\') {
			escape_next = true;
			if n.is_some_and(|n| n.is_ascii_digit() || n == '$') {
				out.push('$');
			} else if n != Some('/') && n != Some('\\') {
				out.push('\\');
			}
		} else {
			if c == Some('$') {
				out.push('$');
			}
			out.extend(c);
			if n == Some('/') {
				out.push('\\');
			}
		}
		i += 1;
	}
	out
}

/// Resolve `\/`, `\\`, `\n`, `\r`, `\t` and `\&` in replacement text. `\1` becomes `$1`.
pub fn unescape_regex_replace(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	let mut chars = s.chars().peekable();
	while let Some(ch) = chars.next() {
		if ch != '\\' {
			out.push(ch);
			continue
		}
		match chars.peek().copied() {
			Some(next @ ('/' | '\\' | '&')) => {
				out.push(next);
				chars.next();
			}
			Some('n') => { out.push('\n'); chars.next(); }
			Some('r') => { out.push('\r'); chars.next(); }
			Some('t') => { out.push('\t'); chars.next(); }
			Some(d) if d.is_ascii_digit() => {
				out.push('$');
				out.push(d);
				chars.next();
			}
			_ => out.push(ch)
		}
	}
	out
}

/// Expand a replacement template against one match.
/// `$&` and `$0` are the whole match, `$1`..`$99` the groups, `$$` a literal dollar.
pub fn expand_replacement(caps: &Captures, template: &str) -> String {
	let mut out = String::new();
	let mut chars = template.chars().peekable();
	while let Some(ch) = chars.next() {
		if ch != '$' {
			out.push(ch);
			continue
		}
		match chars.peek().copied() {
			Some('$') => {
				chars.next();
				out.push('$');
			}
			Some('&') => {
				chars.next();
				out.push_str(caps.get(0).map_or("", |m| m.as_str()));
			}
			Some(d) if d.is_ascii_digit() => {
				chars.next();
				let mut idx = d.to_digit(10).unwrap_or(0) as usize;
				if let Some(d2) = chars.peek().and_then(|c| c.to_digit(10)) {
					let two = idx * 10 + d2 as usize;
					if two < caps.len() {
						chars.next();
						idx = two;
					}
				}
				if idx < caps.len() {
					out.push_str(caps.get(idx).map_or("", |m| m.as_str()));
				} else {
					out.push('$');
					out.push(d);
				}
			}
			_ => out.push('$')
		}
	}
	out
}

/// Parse `pattern[/flags]`. Returns `Ok(None)` for an empty pattern.
///
/// A trailing `/i` forces case-insensitivity. With `smart_case`, the pattern is
/// case-insensitive exactly when it has no uppercase letter.
pub fn parse_query(raw: &str, ignore_case: bool, smart_case: bool, pcre: bool) -> VimResult<Option<SearchQuery>> {
	let slashes = find_unescaped_separators(raw, '/');
	let (mut part, force_ignore_case) = match slashes.first() {
		None => (raw.to_string(), false),
		Some(&i) => (raw[..i].to_string(), raw[i..].contains('i'))
	};
	if part.is_empty() {
		return Ok(None)
	}
	if !pcre {
		part = translate_regex(&part);
	}
	let mut ignore_case = ignore_case;
	if smart_case {
		ignore_case = !part.chars().any(|c| c.is_ascii_uppercase());
	}
	SearchQuery::new(&part, ignore_case || force_ignore_case)
		.map(Some)
		.map_err(|_| VimError::Notify(format!("Invalid regex: {raw}")))
}

/// The buffer flattened to one string, with char positions mapped to byte offsets
pub struct DocText {
	pub text: String,
	line_starts: Vec<usize>
}

impl DocText {
	pub fn new(host: &dyn Host) -> Self {
		let mut text = String::new();
		let mut line_starts = vec![];
		for line in 0..host.line_count().max(1) {
			if line > 0 {
				text.push('\n');
			}
			line_starts.push(text.len());
			text.push_str(&host.line(line));
		}
		Self { text, line_starts }
	}
	fn line_text(&self, line: usize) -> &str {
		let start = self.line_starts[line];
		let end = self.line_starts.get(line + 1).map_or(self.text.len(), |s| s - 1);
		&self.text[start..end]
	}
	pub fn byte_of(&self, pos: Pos) -> usize {
		let line = pos.line.min(self.line_starts.len() - 1);
		let text = self.line_text(line);
		let offset = text.char_indices().nth(pos.ch).map_or(text.len(), |(i,_)| i);
		self.line_starts[line] + offset
	}
	pub fn pos_of(&self, byte: usize) -> Pos {
		let line = self.line_starts.partition_point(|s| *s <= byte).saturating_sub(1);
		let start = self.line_starts[line];
		let ch = self.text[start..byte.min(self.text.len())].chars().count();
		Pos::new(line, ch)
	}
	pub fn end(&self) -> Pos {
		self.pos_of(self.text.len())
	}
}

/// Walks the matches of a regex from a starting position, without wrapping.
/// Each `find` continues from the previous match.
pub struct SearchCursor<'a> {
	regex: &'a Regex,
	doc: DocText,
	start: usize,
	last: Option<(usize,usize)>
}

impl<'a> SearchCursor<'a> {
	pub fn new(host: &dyn Host, regex: &'a Regex, pos: Pos) -> Self {
		let doc = DocText::new(host);
		let start = doc.byte_of(pos);
		Self { regex, doc, start, last: None }
	}

	/// Step to the next (or previous) match. Returns whether the match is non-empty.
	pub fn find(&mut self, back: bool) -> Option<bool> {
		let found = if back {
			let start = self.last.map_or(self.start, |(from,_)| from);
			self.regex.find_iter(&self.doc.text)
				.take_while(|m| m.start() < start)
				.last()
				.map(|m| (m.start(), m.end()))
		} else {
			let start = self.last.map_or(self.start, |(_,to)| to);
			let mut found = self.regex.find_at(&self.doc.text, start).map(|m| (m.start(), m.end()));
			if let Some((from, to)) = found && from == to && Some((from, to)) == self.last {
				let next = self.doc.text[start..].chars().next().map(|c| start + c.len_utf8());
				found = next.and_then(|n| self.regex.find_at(&self.doc.text, n)).map(|m| (m.start(), m.end()));
			}
			found
		};
		self.last = found;
		found.map(|(from, to)| from != to)
	}
	pub fn from(&self) -> Option<Pos> {
		self.last.map(|(from,_)| self.doc.pos_of(from))
	}
	pub fn to(&self) -> Option<Pos> {
		self.last.map(|(_,to)| self.doc.pos_of(to))
	}
	pub fn doc(&self) -> &DocText {
		&self.doc
	}
}

/// Position of the `repeat`th match from `pos`, wrapping around the buffer.
///
/// A match sitting exactly at `pos` is skipped so that `n` moves on.
pub fn find_next(host: &dyn Host, pos: Pos, prev: bool, query: &SearchQuery, repeat: usize) -> Option<Pos> {
	let mut cursor = SearchCursor::new(host, &query.regex, pos);
	for i in 0..repeat.max(1) {
		let mut found = cursor.find(prev);
		if i == 0 && found.is_some() && cursor.from() == Some(pos) {
			let last_end = if prev { cursor.from() } else { cursor.to() };
			found = cursor.find(prev);
			if found == Some(false) && cursor.from() == last_end
				&& let Some(end) = last_end
				&& host.line(end.line).chars().count() == end.ch {
				found = cursor.find(prev);
			}
		}
		if found.is_none() {
			let restart = if prev { DocText::new(host).end() } else { Pos::default() };
			cursor = SearchCursor::new(host, &query.regex, restart);
			cursor.find(prev)?;
		}
	}
	cursor.from()
}

/// Bounds of the `repeat`th match for `gn`. Outside visual mode, a match under the cursor counts as the first.
pub fn find_next_from_and_to_inclusive(host: &dyn Host, pos: Pos, prev: bool, query: &SearchQuery, repeat: usize, visual_mode: bool) -> Option<(Pos,Pos)> {
	let mut cursor = SearchCursor::new(host, &query.regex, pos);
	let found = cursor.find(!prev);
	if !visual_mode && found.is_some() && cursor.from() == Some(pos) {
		cursor.find(!prev);
	}
	for _ in 0..repeat.max(1) {
		if cursor.find(prev).is_none() {
			let restart = if prev { DocText::new(host).end() } else { Pos::default() };
			cursor = SearchCursor::new(host, &query.regex, restart);
			cursor.find(prev)?;
		}
	}
	Some((cursor.from()?, cursor.to()?))
}
