use std::{collections::HashMap, fmt::Display, sync::Arc};

use unicode_segmentation::UnicodeSegmentation;

/// A key press as delivered by a host, before it is turned into a key name.
#[derive(Clone,PartialEq,Eq,Debug)]
pub struct KeyEvent(pub KeyCode, pub ModKeys);

impl KeyEvent {
	/// Build a key event from raw input text, folding ASCII control characters into `CTRL` chords.
	pub fn new(ch: &str, mut mods: ModKeys) -> Self {
		use {KeyCode as K, KeyEvent as E, ModKeys as M};

		let mut graphemes = ch.graphemes(true);

		let Some(first) = graphemes.next() else {
			return E(K::Null, mods)
		};

		if graphemes.next().is_some() {
			return E(K::Null, mods);
		}

		let mut chars = first.chars();

		let single_char = chars.next();
		let is_single_char = chars.next().is_none();

		match single_char {
			Some(c) if is_single_char && c.is_control() => {
				match c {
					'\x00' => E(K::Char('@'), mods | M::CTRL),
					'\x08' | '\x7f' => E(K::Backspace, mods),
					'\x09' => {
						if mods.contains(M::SHIFT) {
							mods.remove(M::SHIFT);
							E(K::BackTab, mods)
						} else {
							E(K::Tab, mods)
						}
					}
					'\x0d' | '\x0a' => E(K::Enter, mods),
					'\x1b' => E(K::Esc, mods),
					'\x1c' => E(K::Char('\\'), mods | M::CTRL),
					'\x1d' => E(K::Char(']'), mods | M::CTRL),
					'\x1e' => E(K::Char('^'), mods | M::CTRL),
					'\x1f' => E(K::Char('_'), mods | M::CTRL),
					'\x01'..='\x1a' => {
						let letter = (b'a' + (c as u8 - 1)) as char;
						E(K::Char(letter), mods | M::CTRL)
					}
					_ => E(K::Null, mods),
				}
			}
			Some(c) if is_single_char => E(K::Char(c), mods),
			_ => E(K::Grapheme(Arc::from(first)), mods)
		}
	}

	/// Parse a key name such as `x`, `<Esc>` or `<C-S-Left>`
	pub fn parse(name: &str) -> Option<Self> {
		let Some(inner) = name.strip_prefix('<').and_then(|s| s.strip_suffix('>')).filter(|s| !s.is_empty()) else {
			let mut graphemes = name.graphemes(true);
			let first = graphemes.next()?;
			if graphemes.next().is_some() {
				return None
			}
			return Some(Self::new(first, ModKeys::NONE))
		};
		let mut mods = ModKeys::NONE;
		let mut rest = inner;
		loop {
			let Some((prefix, tail)) = rest.split_once('-') else { break };
			if tail.is_empty() {
				break
			}
			match prefix {
				"C" | "c" => mods |= ModKeys::CTRL,
				"A" | "a" => mods |= ModKeys::ALT,
				"M" | "m" => mods |= ModKeys::META,
				"S" | "s" => mods |= ModKeys::SHIFT,
				_ => break
			}
			rest = tail;
		}
		let code = KeyCode::from_name(rest)?;
		Some(Self(code, mods))
	}

	/// Render this event in the key-name grammar. Modifiers come in the fixed order `C- A- M- S-`;
	/// shift is only spelled out for named keys or alongside other modifiers.
	pub fn to_vim_key(&self) -> Option<String> {
		let KeyEvent(code, mods) = self;
		let base = code.name()?;
		let mut name = String::new();
		if mods.contains(ModKeys::CTRL) {
			name.push_str("C-");
		}
		if mods.contains(ModKeys::ALT) {
			name.push_str("A-");
		}
		if mods.contains(ModKeys::META) {
			name.push_str("M-");
		}
		if mods.contains(ModKeys::SHIFT) && (!name.is_empty() || base.chars().count() > 1) {
			name.push_str("S-");
		}
		name.push_str(&base);
		if name.chars().count() > 1 {
			Some(format!("<{name}>"))
		} else {
			Some(name)
		}
	}
}

impl Display for KeyEvent {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.to_vim_key() {
			Some(name) => write!(f, "{name}"),
			None => write!(f, "<Nop>")
		}
	}
}

#[derive(Clone,PartialEq,Eq,Debug)]
pub enum KeyCode {
	Backspace,
	BackTab,
	Char(char),
	Grapheme(Arc<str>),
	Delete,
	Down,
	End,
	Enter,
	Esc,
	F(u8),
	Home,
	Insert,
	Left,
	Null,
	PageDown,
	PageUp,
	Right,
	Tab,
	Up,
}

impl KeyCode {
	pub fn from_name(name: &str) -> Option<Self> {
		let code = match name.to_ascii_lowercase().as_str() {
			"bs" | "backspace" => Self::Backspace,
			"cr" | "enter" | "return" => Self::Enter,
			"esc" | "escape" => Self::Esc,
			"del" | "delete" => Self::Delete,
			"ins" | "insert" => Self::Insert,
			"tab" => Self::Tab,
			"left" => Self::Left,
			"right" => Self::Right,
			"up" => Self::Up,
			"down" => Self::Down,
			"home" => Self::Home,
			"end" => Self::End,
			"pageup" => Self::PageUp,
			"pagedown" => Self::PageDown,
			"space" => Self::Char(' '),
			"lt" => Self::Char('<'),
			"nop" => Self::Null,
			lower => {
				if let Some(num) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
					Self::F(num)
				} else {
					let mut chars = name.chars();
					let c = chars.next()?;
					if chars.next().is_some() {
						return None
					}
					Self::Char(c)
				}
			}
		};
		Some(code)
	}

	pub fn name(&self) -> Option<String> {
		let name = match self {
			Self::Backspace => "BS".into(),
			Self::BackTab => "S-Tab".into(),
			Self::Char(' ') => "Space".into(),
			Self::Char(c) => c.to_string(),
			Self::Grapheme(g) => g.to_string(),
			Self::Delete => "Del".into(),
			Self::Down => "Down".into(),
			Self::End => "End".into(),
			Self::Enter => "CR".into(),
			Self::Esc => "Esc".into(),
			Self::F(n) => format!("F{n}"),
			Self::Home => "Home".into(),
			Self::Insert => "Ins".into(),
			Self::Left => "Left".into(),
			Self::PageDown => "PageDown".into(),
			Self::PageUp => "PageUp".into(),
			Self::Right => "Right".into(),
			Self::Tab => "Tab".into(),
			Self::Up => "Up".into(),
			Self::Null => return None,
		};
		Some(name)
	}
}

bitflags::bitflags! {
	#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
	pub struct ModKeys: u8 {
		/// Control modifier
		const CTRL  = 1<<3;
		/// Escape or Alt modifier
		const ALT  = 1<<2;
		/// Shift modifier
		const SHIFT = 1<<1;
		/// Command/Super modifier
		const META = 1<<0;

		/// No modifier
		const NONE = 0;
		/// Ctrl + Shift
		const CTRL_SHIFT = Self::CTRL.bits() | Self::SHIFT.bits();
		/// Ctrl + Alt
		const CTRL_ALT = Self::CTRL.bits() | Self::ALT.bits();
	}
}

fn is_word_char(c: char) -> bool {
	c.is_alphanumeric() || c == '_'
}

/// Length of a `<C-A-x>` style token at the start of `chars`, modifiers limited to `C S M A`
fn mapping_token_len(chars: &[char]) -> Option<usize> {
	if chars.first() != Some(&'<') {
		return None
	}
	let mut i = 1;
	while i + 1 < chars.len() && "CSMAcsma".contains(chars[i]) && chars[i + 1] == '-' {
		i += 2;
	}
	let word_start = i;
	while i < chars.len() && is_word_char(chars[i]) {
		i += 1;
	}
	(i > word_start && chars.get(i) == Some(&'>')).then_some(i + 1)
}

/// Length of a macro key token: `<word-anything>` or `<word>`
fn macro_token_len(chars: &[char]) -> Option<usize> {
	if chars.first() != Some(&'<') {
		return None
	}
	let mut i = 1;
	while i < chars.len() && is_word_char(chars[i]) {
		i += 1;
	}
	if i == 1 {
		return None
	}
	match chars.get(i) {
		Some('>') => Some(i + 1),
		Some('-') => {
			// at least one char after the dash, then the first closing bracket
			let body_start = i + 1;
			(body_start + 1..chars.len())
				.find(|&j| chars[j] == '>')
				.map(|j| j + 1)
		}
		_ => None
	}
}

fn split_with(seq: &str, token_len: fn(&[char]) -> Option<usize>) -> Vec<String> {
	let chars: Vec<char> = seq.chars().collect();
	let mut keys = vec![];
	let mut i = 0;
	while i < chars.len() {
		let len = token_len(&chars[i..]).unwrap_or(1);
		keys.push(chars[i..i + len].iter().collect());
		i += len;
	}
	keys
}

/// Split a mapping or `:normal` argument into individual key names.
/// Anything that is not a well-formed `<...>` token is a literal char.
pub fn split_keys(seq: &str) -> Vec<String> {
	split_with(seq, mapping_token_len)
}

/// Split the contents of a macro register into key names. Macro registers may hold tokens like `<C-]>`.
pub fn split_macro_keys(seq: &str) -> Vec<String> {
	split_with(seq, macro_token_len)
}

/// The text a key inserts when it falls through to literal insertion, if any.
pub fn literal_text(key: &str) -> Option<&str> {
	if key.chars().count() == 1 {
		return Some(key)
	}
	match key.to_ascii_lowercase().as_str() {
		"<space>" | "<s-space>" => Some(" "),
		"<lt>" => Some("<"),
		"<tab>" => Some("\t"),
		"<cr>" | "<s-cr>" => Some("\n"),
		_ => None
	}
}

/// Keyboard layout translation applied to single-char keys, e.g. for typing commands on a non-latin layout.
///
/// The grammar is a comma separated list of either `fromto` pair runs (`aA`) or
/// `from;to` sections of equal length, with backslash escaping.
#[derive(Default,Clone,Debug)]
pub struct Langmap {
	keymap: HashMap<char,char>,
	source: String,
	pub remap_ctrl: bool,
}

impl Langmap {
	pub fn parse(source: &str) -> Self {
		let mut keymap = HashMap::new();
		for part in split_unescaped(source, ',') {
			let sections = split_unescaped(&part, ';');
			match sections.as_slice() {
				[from, to] => {
					let from = unescape_chars(from);
					let to = unescape_chars(to);
					if from.len() != to.len() {
						continue
					}
					keymap.extend(from.into_iter().zip(to));
				}
				[pairs] => {
					let pairs = unescape_chars(pairs);
					if pairs.len() % 2 != 0 {
						continue
					}
					for pair in pairs.chunks(2) {
						keymap.insert(pair[0], pair[1]);
					}
				}
				_ => continue
			}
		}
		Self { keymap, source: source.to_string(), remap_ctrl: true }
	}
	pub fn source(&self) -> &str {
		&self.source
	}
	pub fn is_empty(&self) -> bool {
		self.keymap.is_empty()
	}
	pub fn get(&self, ch: char) -> Option<char> {
		self.keymap.get(&ch).copied()
	}
}

fn split_unescaped(s: &str, sep: char) -> Vec<String> {
	let mut parts = vec![];
	let mut current = String::new();
	let mut chars = s.chars();
	while let Some(ch) = chars.next() {
		match ch {
			'\\' => {
				current.push(ch);
				if let Some(next) = chars.next() {
					current.push(next);
				}
			}
			_ if ch == sep => parts.push(std::mem::take(&mut current)),
			_ => current.push(ch)
		}
	}
	if !current.is_empty() {
		parts.push(current);
	}
	parts
}

fn unescape_chars(s: &str) -> Vec<char> {
	let mut out = vec![];
	let mut chars = s.chars();
	while let Some(ch) = chars.next() {
		if ch == '\\' {
			if let Some(next) = chars.next() {
				out.push(next);
			}
		} else {
			out.push(ch);
		}
	}
	out
}

/// Turn a host key event into a key name, applying the active langmap unless a literal char is expected.
pub fn vim_key_from_event(event: &KeyEvent, langmap: &Langmap, expect_literal: bool) -> Option<String> {
	let KeyEvent(code, mods) = event;
	if let KeyCode::Char(c) = code && !expect_literal && (langmap.remap_ctrl || mods.is_empty() || *mods == ModKeys::SHIFT) {
		if let Some(mapped) = langmap.get(*c) {
			return KeyEvent(KeyCode::Char(mapped), *mods).to_vim_key()
		}
	}
	event.to_vim_key()
}
