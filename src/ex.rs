//! The Ex command line: `:[range]name[!] [args]`.
//!
//! Input is parsed into [`ExParams`], the command name is resolved against the command table by
//! prefix, and the matching built-in (or host-defined) command runs against the editor.

use std::collections::HashMap;

use itertools::Itertools;
use log::debug;
use regex::{Regex, RegexBuilder};

use crate::action;
use crate::dispatch;
use crate::error::{VimError, VimResult};
use crate::keys::Langmap;
use crate::options::{OptionKind, OptionValue, Scope};
use crate::operator;
use crate::pos::{Pos, Range};
use crate::register::{is_valid_register, RegisterOp};
use crate::search::{expand_replacement, split_by_separator, split_by_slash, translate_regex_replace, unescape_regex_replace, DocText, SearchQuery};
use crate::state::{Cx, GlobalRun, Prompt, PromptKind};
use crate::vicmd::{Action, ActionArgs, Command, CommandKind, Context, Motion, MotionArgs, Operator, OperatorArgs};
use crate::Vim;

/// A parsed command line
#[derive(Clone,Default,PartialEq,Eq,Debug)]
pub struct ExParams {
	pub input: String,
	/// The name as typed, before prefix resolution
	pub command_name: String,
	pub line: Option<usize>,
	pub line_end: Option<usize>,
	/// Line the command acts on when no range was typed: the cursor line, or the start of the last visual selection
	pub selection_line: usize,
	pub selection_line_end: Option<usize>,
	/// Everything after the command name, untrimmed
	pub arg_string: Option<String>,
	pub args: Vec<String>,
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum Builtin {
	Map { context: Option<Context>, noremap: bool },
	Unmap(Option<Context>),
	MapClear(Option<Context>),
	Write,
	Undo,
	Redo,
	Set(Scope),
	Sort,
	Substitute,
	StartInsert,
	NoHlSearch,
	Yank,
	DelMarks,
	Registers,
	Global,
	VGlobal,
	Delete,
	Join,
	Normal,
}

#[derive(Clone,PartialEq,Eq,Debug)]
pub enum ExKind {
	Builtin(Builtin),
	/// Implemented by a function in the registry under the command's name
	Custom,
	/// `:map :name keys`
	ExToKey(String),
	/// `:map :name :other`
	ExToEx(String),
}

#[derive(Clone,PartialEq,Eq,Debug)]
pub struct ExCommand {
	pub name: String,
	pub short_name: Option<String>,
	pub kind: ExKind,
	/// Leave the `:` register holding the previous command
	pub exclude_from_history: bool,
	user: bool,
}

impl ExCommand {
	fn builtin(name: &str, short_name: Option<&str>, builtin: Builtin) -> Self {
		Self {
			name: name.to_string(),
			short_name: short_name.map(str::to_string),
			kind: ExKind::Builtin(builtin),
			exclude_from_history: false,
			user: false
		}
	}
	fn key(&self) -> String {
		self.short_name.clone().unwrap_or_else(|| self.name.clone())
	}
}

fn default_ex_commands() -> Vec<ExCommand> {
	use Builtin as B;
	use Context as C;
	let map = |context, noremap| B::Map { context, noremap };
	let mut registers = ExCommand::builtin("registers", Some("reg"), B::Registers);
	registers.exclude_from_history = true;
	vec![
		ExCommand::builtin("map", None, map(None, false)),
		ExCommand::builtin("imap", Some("im"), map(Some(C::Insert), false)),
		ExCommand::builtin("nmap", Some("nm"), map(Some(C::Normal), false)),
		ExCommand::builtin("vmap", Some("vm"), map(Some(C::Visual), false)),
		ExCommand::builtin("omap", Some("om"), map(Some(C::OperatorPending), false)),
		ExCommand::builtin("noremap", Some("no"), map(None, true)),
		ExCommand::builtin("nnoremap", Some("nn"), map(Some(C::Normal), true)),
		ExCommand::builtin("vnoremap", Some("vn"), map(Some(C::Visual), true)),
		ExCommand::builtin("inoremap", Some("ino"), map(Some(C::Insert), true)),
		ExCommand::builtin("onoremap", Some("ono"), map(Some(C::OperatorPending), true)),
		ExCommand::builtin("unmap", None, B::Unmap(None)),
		ExCommand::builtin("nunmap", Some("nun"), B::Unmap(Some(C::Normal))),
		ExCommand::builtin("vunmap", Some("vu"), B::Unmap(Some(C::Visual))),
		ExCommand::builtin("iunmap", Some("iu"), B::Unmap(Some(C::Insert))),
		ExCommand::builtin("mapclear", Some("mapc"), B::MapClear(None)),
		ExCommand::builtin("nmapclear", Some("nmapc"), B::MapClear(Some(C::Normal))),
		ExCommand::builtin("vmapclear", Some("vmapc"), B::MapClear(Some(C::Visual))),
		ExCommand::builtin("imapclear", Some("imapc"), B::MapClear(Some(C::Insert))),
		ExCommand::builtin("omapclear", Some("omapc"), B::MapClear(Some(C::OperatorPending))),
		ExCommand::builtin("write", Some("w"), B::Write),
		ExCommand::builtin("undo", Some("u"), B::Undo),
		ExCommand::builtin("redo", Some("red"), B::Redo),
		ExCommand::builtin("set", Some("se"), B::Set(Scope::Both)),
		ExCommand::builtin("setlocal", Some("setl"), B::Set(Scope::Local)),
		ExCommand::builtin("setglobal", Some("setg"), B::Set(Scope::Global)),
		ExCommand::builtin("sort", Some("sor"), B::Sort),
		ExCommand::builtin("substitute", Some("s"), B::Substitute),
		ExCommand::builtin("startinsert", Some("start"), B::StartInsert),
		ExCommand::builtin("nohlsearch", Some("noh"), B::NoHlSearch),
		ExCommand::builtin("yank", Some("y"), B::Yank),
		ExCommand::builtin("delmarks", Some("delm"), B::DelMarks),
		registers,
		ExCommand::builtin("vglobal", Some("v"), B::VGlobal),
		ExCommand::builtin("delete", Some("d"), B::Delete),
		ExCommand::builtin("join", Some("j"), B::Join),
		ExCommand::builtin("normal", Some("norm"), B::Normal),
		ExCommand::builtin("global", Some("g"), B::Global),
	]
}

/// The Ex command table, keyed by each command's shortest accepted prefix
#[derive(Clone,Debug)]
pub struct ExCommands {
	map: HashMap<String,ExCommand>
}

impl Default for ExCommands {
	fn default() -> Self {
		let map = default_ex_commands()
			.into_iter()
			.map(|cmd| (cmd.key(), cmd))
			.collect();
		Self { map }
	}
}

impl ExCommands {
	pub fn new() -> Self {
		Self::default()
	}

	/// Resolve a typed name: the longest registered prefix of it whose full name starts with what was typed
	pub fn match_command(&self, name: &str) -> Option<&ExCommand> {
		let ends = name.char_indices().map(|(i,c)| i + c.len_utf8()).rev();
		for end in ends {
			if let Some(cmd) = self.map.get(&name[..end]) && cmd.name.starts_with(name) {
				return Some(cmd)
			}
		}
		None
	}

	/// Register a host-defined command under `name`, typed as any prefix of it down to `prefix`
	pub fn define(&mut self, name: &str, prefix: Option<&str>) -> VimResult<()> {
		let prefix = prefix.unwrap_or(name);
		if !name.starts_with(prefix) {
			return Err(VimError::notify(format!("\"{prefix}\" is not a prefix of \"{name}\", command not registered")))
		}
		let cmd = ExCommand {
			name: name.to_string(),
			short_name: Some(prefix.to_string()),
			kind: ExKind::Custom,
			exclude_from_history: false,
			user: false
		};
		self.map.insert(prefix.to_string(), cmd);
		Ok(())
	}

	fn map_user(&mut self, name: &str, kind: ExKind) {
		let cmd = ExCommand {
			name: name.to_string(),
			short_name: None,
			kind,
			exclude_from_history: false,
			user: true
		};
		self.map.insert(name.to_string(), cmd);
	}

	fn unmap_user(&mut self, name: &str) -> bool {
		if self.map.get(name).is_some_and(|c| c.user) {
			self.map.remove(name);
			return true
		}
		false
	}
}

fn is_ex_lhs(lhs: &str) -> bool {
	lhs != ":" && lhs.starts_with(':')
}

/// Map keys to keys, or with a `:name` lhs, an Ex command to keys or to another Ex command
pub fn map_keys(g: &mut Vim, lhs: &str, rhs: &str, context: Option<Context>, noremap: bool) -> VimResult<()> {
	if !is_ex_lhs(lhs) {
		g.keymap.map(lhs, rhs, context, noremap);
		return Ok(())
	}
	if context.is_some() {
		return Err(VimError::notify("Mode not supported for ex mappings"))
	}
	let kind = if is_ex_lhs(rhs) {
		ExKind::ExToEx(rhs[1..].to_string())
	} else {
		ExKind::ExToKey(rhs.to_string())
	};
	g.ex.map_user(&lhs[1..], kind);
	Ok(())
}

pub fn unmap_keys(g: &mut Vim, lhs: &str, context: Option<Context>) -> VimResult<bool> {
	if !is_ex_lhs(lhs) {
		return Ok(g.keymap.unmap(lhs, context))
	}
	if context.is_some() {
		return Err(VimError::notify("Mode not supported for ex mappings"))
	}
	Ok(g.ex.unmap_user(&lhs[1..]))
}

/// Cursor over the command line being parsed
struct Stream<'a> {
	src: &'a str,
	pos: usize
}

impl<'a> Stream<'a> {
	fn new(src: &'a str) -> Self {
		Self { src, pos: 0 }
	}
	fn rest(&self) -> &'a str {
		&self.src[self.pos..]
	}
	fn eol(&self) -> bool {
		self.pos >= self.src.len()
	}
	fn peek(&self) -> Option<char> {
		self.rest().chars().next()
	}
	fn next(&mut self) -> Option<char> {
		let ch = self.peek()?;
		self.pos += ch.len_utf8();
		Some(ch)
	}
	fn eat(&mut self, ch: char) -> bool {
		if self.peek() == Some(ch) {
			self.pos += ch.len_utf8();
			return true
		}
		false
	}
	fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
		let start = self.pos;
		while let Some(ch) = self.peek() && pred(ch) {
			self.pos += ch.len_utf8();
		}
		&self.src[start..self.pos]
	}
	fn eat_space(&mut self) -> bool {
		!self.eat_while(char::is_whitespace).is_empty()
	}
	fn take_rest(&mut self) -> &'a str {
		let rest = self.rest();
		self.pos = self.src.len();
		rest
	}
}

/// Parse `[range]name[!] args` without running anything
pub fn parse_input(cx: &mut Cx, input: &str) -> VimResult<ExParams> {
	let mut params = ExParams { input: input.to_string(), ..Default::default() };
	let mut s = Stream::new(input);
	s.eat_while(|c| c == ':');
	if s.eat('%') {
		params.line = Some(0);
		params.line_end = Some(cx.last_line());
	} else {
		params.line = parse_line_spec(cx, &mut s)?;
		if params.line.is_some() && s.eat(',') {
			params.line_end = parse_line_spec(cx, &mut s)?;
		}
	}
	match params.line {
		Some(line) => {
			params.selection_line = line;
			params.selection_line_end = params.line_end;
		}
		None if cx.vim.visual_mode => {
			let start = cx.mark_pos('<').map(|p| p.line);
			params.selection_line = start.unwrap_or_else(|| cx.cursor().line);
			params.selection_line_end = cx.mark_pos('>').map(|p| p.line);
		}
		None => params.selection_line = cx.cursor().line
	}

	let rest = s.rest();
	params.command_name = if rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
		s.eat_while(|c| c.is_ascii_alphanumeric() || c == '_').to_string()
	} else if rest.starts_with("!!") || rest.starts_with("@@") {
		s.pos += 2;
		rest[..2].to_string()
	} else if rest.starts_with(|c: char| "!#&*<=>@~".contains(c)) {
		s.next().map(String::from).unwrap_or_default()
	} else {
		s.take_rest().to_string()
	};

	if !s.eol() {
		let arg_string = s.take_rest();
		params.args = arg_string.split_whitespace().map(str::to_string).collect();
		params.arg_string = Some(arg_string.to_string());
	}
	Ok(params)
}

fn parse_line_spec(cx: &mut Cx, s: &mut Stream) -> VimResult<Option<usize>> {
	let digits = s.eat_while(|c| c.is_ascii_digit());
	if !digits.is_empty() {
		return Ok(Some(digits.parse::<usize>().unwrap_or(usize::MAX).saturating_sub(1)))
	}
	let base = match s.peek() {
		Some('.') => {
			s.next();
			cx.cursor().line
		}
		Some('$') => {
			s.next();
			cx.last_line()
		}
		Some('\'') => {
			s.next();
			let mark = s.next().and_then(|name| cx.mark_pos(name));
			let Some(mark) = mark else {
				return Err(VimError::notify("Mark not set"))
			};
			mark.line
		}
		Some('+' | '-') => cx.cursor().line,
		_ => return Ok(None)
	};
	Ok(Some(parse_line_offset(s, base)))
}

fn parse_line_offset(s: &mut Stream, line: usize) -> usize {
	let start = s.pos;
	let negative = match s.peek() {
		Some('-') => { s.next(); true }
		Some('+') => { s.next(); false }
		_ => false
	};
	let digits = s.eat_while(|c| c.is_ascii_digit());
	if digits.is_empty() {
		s.pos = start;
		return line
	}
	let offset = digits.parse::<usize>().unwrap_or(usize::MAX);
	if negative { line.saturating_sub(offset) } else { line.saturating_add(offset) }
}

/// Run one command line as a single operation. User-facing errors end up on the host's
/// notification line; faults are handed back.
pub fn process_command(cx: &mut Cx, input: &str) -> VimResult<()> {
	cx.operation(|cx| {
		match run_command(cx, input) {
			Err(VimError::Notify(msg)) => {
				cx.notify(&msg);
				Ok(())
			}
			res => res
		}
	})
}

fn run_command(cx: &mut Cx, input: &str) -> VimResult<()> {
	debug!("ex: {input:?}");
	let previous = cx.registers().get(Some(':')).text();
	cx.registers().get_mut(':').set_text(input, false, false);
	let params = parse_input(cx, input)?;
	if cx.vim.visual_mode {
		action::exit_visual_mode(cx, true);
	}
	let not_a_command = || VimError::notify(format!("Not an editor command \":{input}\""));
	if params.command_name.is_empty() {
		let Some(line) = params.line else {
			return Err(not_a_command())
		};
		return move_to_line(cx, line)
	}
	let Some(command) = cx.g.ex.match_command(&params.command_name).cloned() else {
		return Err(not_a_command())
	};
	if command.exclude_from_history {
		cx.registers().get_mut(':').set_text(&previous, false, false);
	}
	match command.kind {
		ExKind::Builtin(builtin) => run_builtin(cx, builtin, &params),
		ExKind::Custom => {
			let Some(func) = cx.g.registry.ex(&command.name) else {
				return Err(VimError::fault(format!("no ex command named {}", command.name)))
			};
			func(&mut *cx, &params)
		}
		ExKind::ExToKey(keys) => {
			let from = format!(":{}", command.name);
			dispatch::key_to_key(cx, &keys, Some((&from, true)))
		}
		ExKind::ExToEx(line) => run_command(cx, &line)
	}
}

fn run_builtin(cx: &mut Cx, builtin: Builtin, params: &ExParams) -> VimResult<()> {
	use Builtin as B;
	match builtin {
		B::Map { context, noremap } => {
			let [lhs, rhs, ..] = params.args.as_slice() else {
				return Err(VimError::notify(format!("Invalid mapping: {}", params.input)))
			};
			map_keys(cx.g, lhs, rhs, context, noremap)
		}
		B::Unmap(context) => {
			let removed = match params.args.first() {
				Some(lhs) => unmap_keys(cx.g, lhs, context)?,
				None => false
			};
			if !removed {
				return Err(VimError::notify(format!("No such mapping: {}", params.input)))
			}
			Ok(())
		}
		B::MapClear(context) => {
			cx.g.keymap.mapclear(context);
			Ok(())
		}
		B::Write => {
			cx.host.save();
			Ok(())
		}
		B::Undo => action::eval_action(cx, &Action::Undo, &ActionArgs { repeat: 1, ..Default::default() }),
		B::Redo => action::eval_action(cx, &Action::Redo, &ActionArgs { repeat: 1, ..Default::default() }),
		B::Set(scope) => set(cx, params, scope),
		B::Sort => sort(cx, params),
		B::Substitute => substitute(cx, params),
		B::StartInsert => {
			let keys = if params.arg_string.as_deref() == Some("!") { "A" } else { "i" };
			dispatch::key_to_key(cx, keys, Some((":startinsert", true)))
		}
		B::NoHlSearch => {
			cx.host.highlight_search(None);
			Ok(())
		}
		B::Yank => {
			let text = cx.line(cx.cursor().line);
			cx.registers().push_text(Some('0'), RegisterOp::Yank, &text, true, false);
			Ok(())
		}
		B::DelMarks => delmarks(cx, params),
		B::Registers => {
			registers(cx, params);
			Ok(())
		}
		B::Global | B::VGlobal => global(cx, params),
		B::Delete => {
			let line = params.selection_line;
			let end = params.selection_line_end.unwrap_or(line).max(line);
			let args = OperatorArgs { linewise: true, ..Default::default() };
			let range = Range::new(Pos::new(line, 0), Pos::new(end + 1, 0));
			let anchor = Pos::new(line, 0);
			if let Some(pos) = operator::eval_operator(cx, &Operator::Delete, &args, &[range], anchor, anchor)? {
				cx.set_cursor(pos);
			}
			Ok(())
		}
		B::Join => {
			let line = params.selection_line;
			let end = params.selection_line_end.unwrap_or(line).max(line);
			cx.set_cursor(Pos::new(line, 0));
			let args = ActionArgs { repeat: end - line + 1, ..Default::default() };
			action::eval_action(cx, &Action::JoinLines, &args)
		}
		B::Normal => normal(cx, params),
	}
}

fn move_to_line(cx: &mut Cx, line: usize) -> VimResult<()> {
	let args = MotionArgs {
		forward: false,
		explicit_repeat: true,
		linewise: true,
		..Default::default()
	};
	let mut command = Command::new("", CommandKind::Motion(Motion::MoveToLineOrEdgeOfDocument, args));
	command.repeat_override = Some(line.saturating_add(1));
	dispatch::process_command(cx, &command)
}

fn set(cx: &mut Cx, params: &ExParams, scope: Scope) -> VimResult<()> {
	let Some(expr) = params.args.first() else {
		return Err(VimError::notify("Argument required"))
	};
	let (mut name, raw) = match expr.split_once('=') {
		Some((name, value)) => (name, Some(value)),
		None => (expr.as_str(), None)
	};
	let mut force_get = false;
	let mut force_toggle = false;
	if let Some(stripped) = name.strip_suffix('?') {
		if raw.is_some() {
			let trailing = params.arg_string.as_deref().unwrap_or("").trim();
			return Err(VimError::notify(format!("Trailing characters: {trailing}")))
		}
		name = stripped;
		force_get = true;
	} else if let Some(stripped) = name.strip_suffix('!') {
		name = stripped;
		force_toggle = true;
	}
	let mut value: Option<OptionValue> = None;
	if raw.is_none() && let Some(stripped) = name.strip_prefix("no") {
		name = stripped;
		value = Some(OptionValue::Bool(false));
	}

	let is_bool = cx.g.options.def(name).is_some_and(|d| d.kind == OptionKind::Boolean);
	if is_bool {
		if force_toggle {
			value = Some(OptionValue::Bool(!cx.opt_bool(name)));
		} else if value.is_none() && raw.is_none() {
			value = Some(OptionValue::Bool(true));
		}
	}

	if force_get || (!is_bool && raw.is_none() && value.is_none()) {
		let msg = match cx.g.options.get(name, Some(&cx.vim.options), scope) {
			Err(e) => e,
			Ok(OptionValue::Bool(on)) => format!(" {}{name}", if on { "" } else { "no" }),
			Ok(other) => format!("  {name}={other}")
		};
		cx.notify(&msg);
		return Ok(())
	}

	let value = match (value, raw) {
		(Some(value), _) => value,
		(None, raw) => cx.g.options.coerce(name, raw.unwrap_or(""))?
	};
	cx.g.options.set(name, value.clone(), Some(&mut cx.vim.options), scope)?;
	let canonical = cx.g.options.resolve(name).unwrap_or(name).to_string();
	debug!("set {canonical}={value}");
	if canonical == "langmap" {
		cx.g.langmap = Langmap::parse(&value.as_str());
	}
	cx.host.option_changed(&canonical, &value);
	Ok(())
}

fn registers(cx: &mut Cx, params: &ExParams) {
	let mut info = String::from("----------Registers----------\n\n");
	let registers = &cx.g.global.registers;
	if params.args.is_empty() {
		for (name, register) in registers.listing() {
			let text = register.text();
			if !text.is_empty() {
				info.push_str(&format!("\"{name}    {text}\n"));
			}
		}
	} else {
		for name in params.args.concat().chars().filter(|c| is_valid_register(*c)) {
			let key = name.to_lowercase().next().unwrap_or(name);
			let text = registers.peek(key).map(|r| r.text()).unwrap_or_default();
			info.push_str(&format!("\"{name}    {text}\n"));
		}
	}
	cx.notify(&info);
}

fn delmarks(cx: &mut Cx, params: &ExParams) -> VimResult<()> {
	let arg = params.arg_string.as_deref().unwrap_or("").trim();
	if arg.is_empty() {
		return Err(VimError::notify("Argument required"))
	}
	if arg == "!" {
		cx.vim.marks.retain(|name, _| !name.is_ascii_lowercase());
		return Ok(())
	}
	let mut s = Stream::new(arg);
	let invalid = |from: usize| VimError::notify(format!("Invalid argument: {}", &arg[from..]));
	while !s.eol() {
		s.eat_space();
		let start = s.pos;
		let Some(sym) = s.next().filter(|c| c.is_ascii_alphabetic()) else {
			return Err(invalid(start))
		};
		if !s.eat('-') {
			cx.vim.marks.remove(&sym);
			continue
		}
		let Some(finish) = s.next().filter(|c| c.is_ascii_alphabetic()) else {
			return Err(invalid(start))
		};
		let same_case = sym.is_ascii_lowercase() == finish.is_ascii_lowercase();
		if !same_case {
			return Err(VimError::notify(format!("Invalid argument: {sym}-")))
		}
		if sym >= finish {
			return Err(invalid(start))
		}
		for mark in sym..=finish {
			cx.vim.marks.remove(&mark);
		}
	}
	Ok(())
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
enum Radix {
	Decimal,
	Hex,
	Octal,
	Binary
}

impl Radix {
	fn pattern(self) -> &'static str {
		match self {
			Self::Decimal => r"(-?)(\d+)",
			Self::Hex => r"(?i)(-?)(?:0x)?([0-9a-f]+)",
			Self::Octal => r"()([0-7]+)",
			Self::Binary => r"(-?)(?:0b)?([01]+)"
		}
	}
	fn base(self) -> u32 {
		match self {
			Self::Decimal => 10,
			Self::Hex => 16,
			Self::Octal => 8,
			Self::Binary => 2
		}
	}
}

#[derive(Clone,Default,PartialEq,Eq,Debug)]
struct SortArgs {
	reverse: bool,
	ignore_case: bool,
	unique: bool,
	radix: Option<Radix>,
	pattern: Option<String>
}

fn parse_sort_args(arg: &str) -> Result<SortArgs,&'static str> {
	let mut args = SortArgs::default();
	let mut s = Stream::new(arg);
	args.reverse = s.eat('!');
	if s.eol() {
		return Ok(args)
	}
	if !s.eat_space() {
		return Err("Invalid arguments")
	}
	let flags = s.eat_while(|c| "dinuoxb".contains(c));
	args.ignore_case = flags.contains('i');
	args.unique = flags.contains('u');
	let radixes: Vec<Radix> = [
		(flags.contains('d') || flags.contains('n'), Radix::Decimal),
		(flags.contains('x'), Radix::Hex),
		(flags.contains('o'), Radix::Octal),
		(flags.contains('b'), Radix::Binary),
	].into_iter().filter(|(on,_)| *on).map(|(_,r)| r).collect();
	if radixes.len() > 1 {
		return Err("Invalid arguments")
	}
	args.radix = radixes.first().copied();
	s.eat_space();
	let rest = s.rest().trim_end();
	if !rest.is_empty() {
		match rest.strip_prefix('/').and_then(|r| r.rfind('/').map(|end| &r[..end])) {
			Some(pattern) if !pattern.is_empty() => args.pattern = Some(pattern.to_string()),
			_ => return Err("Invalid arguments")
		}
	}
	Ok(args)
}

fn sort(cx: &mut Cx, params: &ExParams) -> VimResult<()> {
	let arg = params.arg_string.as_deref().unwrap_or("");
	let args = parse_sort_args(arg).map_err(|e| VimError::notify(format!("{e}: {arg}")))?;
	let last = cx.last_line();
	let start = params.line.unwrap_or(0).min(last);
	let end = params.line_end.or(params.line).unwrap_or(last).min(last);
	if start >= end {
		return Ok(())
	}
	let lines: Vec<String> = (start..=end).map(|l| cx.line(l)).collect();
	let pattern = args.pattern.as_deref()
		.map(|p| RegexBuilder::new(p).case_insensitive(args.ignore_case).build()
			.map_err(|_| VimError::notify(format!("Invalid regex: {p}"))))
		.transpose()?;
	let number_re = args.radix
		.map(|r| Regex::new(r.pattern()).map_err(|e| VimError::fault(e.to_string())))
		.transpose()?;
	let fold = |s: &str| if args.ignore_case { s.to_lowercase() } else { s.to_string() };

	let mut text_part: Vec<String> = vec![];
	// (sort key, line)
	let mut key_part: Vec<(String,String)> = vec![];
	if pattern.is_some() || number_re.is_some() {
		for line in lines {
			if let Some(re) = &pattern {
				match re.find(&line) {
					Some(m) if !m.is_empty() => key_part.push((m.as_str().to_string(), line)),
					_ => text_part.push(line)
				}
			} else if number_re.as_ref().is_some_and(|re| re.is_match(&line)) {
				key_part.push((line.clone(), line));
			} else {
				text_part.push(line);
			}
		}
	} else {
		text_part = lines;
	}

	let number_of = |s: &str| -> i128 {
		let (Some(re), Some(radix)) = (&number_re, args.radix) else {
			return 0
		};
		let Some(caps) = re.captures(s) else {
			return 0
		};
		let digits = format!("{}{}", &caps[1], &caps[2]).to_lowercase();
		i128::from_str_radix(&digits, radix.base()).unwrap_or(0)
	};
	let order = |ord: std::cmp::Ordering| if args.reverse { ord.reverse() } else { ord };
	if pattern.is_some() {
		key_part.sort_by(|(a,_), (b,_)| order(fold(a).cmp(&fold(b))));
	} else if args.radix.is_some() {
		key_part.sort_by(|(a,_), (b,_)| order(number_of(a).cmp(&number_of(b))));
	} else {
		text_part.sort_by(|a, b| order(fold(a).cmp(&fold(b))));
	}
	let keyed = key_part.into_iter().map(|(_,line)| line);
	let mut sorted: Vec<String> = if args.reverse {
		keyed.chain(text_part).collect()
	} else {
		text_part.into_iter().chain(keyed).collect()
	};
	if args.unique {
		sorted = sorted.into_iter().dedup().collect();
	}
	let from = Pos::new(start, 0);
	let to = cx.eol_of(end);
	cx.replace_range(&sorted.join("\n"), from, to);
	Ok(())
}

fn global(cx: &mut Cx, params: &ExParams) -> VimResult<()> {
	let Some(mut arg) = params.arg_string.as_deref().filter(|a| !a.is_empty()) else {
		return Err(VimError::notify("Regular Expression missing from global"))
	};
	if cx.vim.global_run.is_some() {
		return Err(VimError::notify("Cannot do :global recursive"))
	}
	let mut inverted = params.command_name.starts_with('v');
	if params.command_name.starts_with('g') && let Some(rest) = arg.strip_prefix('!') {
		inverted = true;
		arg = rest;
	}
	let last = cx.last_line();
	let start = params.line.unwrap_or(0).min(last);
	let end = params.line_end.or(params.line).unwrap_or(last).min(last);
	let (regex_part, command) = match split_by_slash(arg) {
		Some(tokens) if !tokens.is_empty() => (tokens[0].clone(), tokens[1..].join("/")),
		_ => (arg.to_string(), String::new())
	};
	if !regex_part.is_empty() {
		dispatch::update_search_query(cx, &regex_part, true, true)?;
	}
	let Some(query) = cx.g.global.search_query.clone() else {
		return Err(VimError::notify("No previous regular expression"))
	};
	let matched: Vec<usize> = (start..=end)
		.filter(|&line| query.regex.is_match(&cx.line(line)) != inverted)
		.collect();
	debug!("global {:?} matched {} line(s)", query, matched.len());
	if command.is_empty() {
		let listing = matched.iter().map(|&l| cx.line(l)).join("\n");
		cx.notify(&listing);
		return Ok(())
	}
	cx.vim.global_run = Some(GlobalRun {
		lines: matched.into_iter().map(Some).collect(),
		next: 0,
		command
	});
	continue_global(cx)
}

/// Run the pending `:global` commands. Stops early while a confirm prompt waits for an answer.
pub fn continue_global(cx: &mut Cx) -> VimResult<()> {
	loop {
		if cx.vim.prompt.is_some() {
			return Ok(())
		}
		let Some(run) = cx.vim.global_run.as_mut() else {
			return Ok(())
		};
		let Some(entry) = run.lines.get(run.next).copied() else {
			cx.vim.global_run = None;
			return Ok(())
		};
		run.next += 1;
		// deleted by an earlier command
		let Some(line) = entry else {
			continue
		};
		let command = format!("{}{}", line + 1, run.command);
		if let Err(e) = run_command(cx, &command) {
			cx.vim.global_run = None;
			return Err(e)
		}
	}
}

fn normal(cx: &mut Cx, params: &ExParams) -> VimResult<()> {
	let mut arg = params.arg_string.as_deref().unwrap_or("");
	let mut noremap = false;
	if let Some(rest) = arg.strip_prefix('!') {
		arg = rest;
		noremap = true;
	}
	let keys = arg.trim_start();
	if keys.is_empty() {
		return Err(VimError::notify("Argument is required."))
	}
	let from = noremap.then_some((":normal!", true));
	let Some(line) = params.line else {
		dispatch::key_to_key(cx, keys, from)?;
		if cx.vim.insert_mode {
			action::exit_insert_mode(cx, true)?;
		}
		return Ok(())
	};
	let end = params.line_end.unwrap_or(line);
	for i in line..=end {
		if i > cx.last_line() {
			break
		}
		cx.set_cursor(Pos::new(i, 0));
		dispatch::key_to_key(cx, keys, from)?;
		if cx.vim.insert_mode {
			action::exit_insert_mode(cx, true)?;
		}
	}
	Ok(())
}

/// Unescaped `&` in a replacement stands for the whole match
fn amp_to_match(s: &str) -> String {
	let mut out = String::with_capacity(s.len());
	let mut escaped = false;
	for ch in s.chars() {
		if ch == '&' && !escaped {
			out.push_str("$&");
		} else {
			out.push(ch);
		}
		escaped = !escaped && ch == '\\';
	}
	out
}

fn substitute(cx: &mut Cx, params: &ExParams) -> VimResult<()> {
	let arg = params.arg_string.clone().unwrap_or_default();
	let tokens = arg.chars().next()
		.and_then(|sep| split_by_separator(&arg, sep))
		.unwrap_or_default();
	let pcre = cx.opt_bool("pcre");
	let mut regex_part = String::new();
	let mut replace_part: Option<String> = None;
	let mut trailing: Vec<&str> = vec![];
	if let Some(first) = tokens.first() {
		regex_part = first.clone();
		if let Some(replacement) = tokens.get(1) {
			let replacement = if pcre {
				unescape_regex_replace(&amp_to_match(replacement))
			} else {
				translate_regex_replace(replacement)
			};
			cx.g.global.last_substitute_replace_part = Some(replacement.clone());
			replace_part = Some(replacement);
		}
		if let Some(rest) = tokens.get(2) {
			trailing = rest.split(' ').collect();
		}
	} else if !arg.is_empty() {
		return Err(VimError::notify("Substitutions should be of the form :s/pattern/replace/"))
	}

	let flags = trailing.first().copied().unwrap_or("");
	let count = trailing.get(1).and_then(|c| c.parse::<usize>().ok()).filter(|c| *c > 0);
	let confirm = flags.contains('c');
	let global = flags.contains('g');
	if !flags.is_empty() {
		regex_part = format!("{regex_part}/{flags}");
	}
	if !regex_part.is_empty() {
		let ignore_case = !flags.contains('I');
		dispatch::update_search_query(cx, &regex_part, ignore_case, ignore_case)?;
	}
	let Some(replace_with) = replace_part.or_else(|| cx.g.global.last_substitute_replace_part.clone()) else {
		return Err(VimError::notify("No previous substitute regular expression"))
	};
	let Some(query) = cx.g.global.search_query.clone() else {
		return Err(VimError::notify("No previous regular expression"))
	};

	let last = cx.last_line();
	let mut line_start = params.line.unwrap_or_else(|| cx.cursor().line);
	let mut line_end = params.line_end.unwrap_or(line_start);
	if let Some(count) = count {
		line_start = line_end;
		line_end = line_start.saturating_add(count - 1);
	} else if line_start == 0 && line_end == last {
		line_end = usize::MAX;
	}
	let start = cx.clip_to_content(Pos::new(line_start, 0));
	let sub = Substitution {
		query,
		replace_with,
		global,
		confirm,
		line_end,
		search_from: start,
		current: None,
		last_pos: None,
		modified_line: None,
		joined: false,
		done: false
	};
	do_replace(cx, sub)
}

/// A `:substitute` in progress. With the `c` flag it sits in the prompt between matches.
#[derive(Clone,Debug)]
pub struct Substitution {
	query: SearchQuery,
	replace_with: String,
	global: bool,
	confirm: bool,
	/// `usize::MAX` when the range runs to the end of the buffer
	line_end: usize,
	search_from: Pos,
	/// The match waiting for an answer
	current: Option<(Pos,Pos)>,
	last_pos: Option<Pos>,
	modified_line: Option<usize>,
	/// The last replacement removed a line break, so its line may match again
	joined: bool,
	done: bool,
}

impl Substitution {
	fn find_valid_match(&self, cx: &Cx) -> Option<(Pos,Pos)> {
		let doc = DocText::new(&*cx.host);
		let start = doc.byte_of(self.search_from);
		let mut found = self.query.regex.find_at(&doc.text, start)?;
		// an empty match where the previous one ended would never advance
		if found.is_empty() && found.start() == start && self.last_pos.is_some() {
			let next = doc.text[start..].chars().next().map(|c| start + c.len_utf8())?;
			found = self.query.regex.find_at(&doc.text, next)?;
		}
		Some((doc.pos_of(found.start()), doc.pos_of(found.end())))
	}

	fn next(&mut self, cx: &mut Cx) {
		loop {
			let Some((from, to)) = self.find_valid_match(cx) else {
				break
			};
			self.search_from = to;
			if from.line > self.line_end {
				break
			}
			if !self.global && self.modified_line == Some(from.line) && !self.joined {
				continue
			}
			self.current = Some((from, to));
			self.last_pos = Some(from);
			cx.set_selections(&[Range::new(from, to)], 0);
			return
		}
		self.current = None;
		self.done = true;
	}

	fn replace(&mut self, cx: &mut Cx) {
		let Some((from, to)) = self.current.take() else {
			return
		};
		let doc = DocText::new(&*cx.host);
		let Some(caps) = self.query.regex.captures_at(&doc.text, doc.byte_of(from)) else {
			return
		};
		let text = expand_replacement(&caps, &self.replace_with);
		cx.replace_range(&text, from, to);
		let new_end = cx.vim.last_edit_pos.unwrap_or(from);
		if self.line_end != usize::MAX {
			let delta = new_end.line as isize - to.line as isize;
			self.line_end = self.line_end.saturating_add_signed(delta);
		}
		self.modified_line = Some(new_end.line);
		self.joined = new_end.line < to.line;
		self.search_from = new_end;
	}

	fn replace_all(&mut self, cx: &mut Cx) {
		while !self.done {
			self.replace(cx);
			self.next(cx);
		}
	}

	fn stop(&mut self, cx: &mut Cx) {
		self.done = true;
		if let Some(pos) = self.last_pos {
			let pos = cx.clip_to_content(pos);
			cx.set_cursor(pos);
			cx.vim.last_hpos = pos.ch;
		}
	}
}

fn do_replace(cx: &mut Cx, mut sub: Substitution) -> VimResult<()> {
	sub.next(cx);
	if sub.done {
		// inside :global, lines without a match are not an error
		if cx.vim.global_run.is_none() {
			cx.notify(&format!("No matches for {}", sub.query.source));
		}
		return Ok(())
	}
	if !sub.confirm {
		sub.replace_all(cx);
		sub.stop(cx);
		return Ok(())
	}
	let prefix = format!("replace with {} (y/n/a/q/l)", sub.replace_with);
	cx.host.show_prompt(&prefix, "");
	cx.vim.prompt = Some(Prompt {
		kind: PromptKind::Confirm(Box::new(sub)),
		prefix,
		value: String::new()
	});
	Ok(())
}

/// Answer the confirm prompt of a `:s///c`
pub fn confirm_key(cx: &mut Cx, mut sub: Substitution, prefix: String, key: &str) -> VimResult<()> {
	let mut stop = false;
	match key {
		"y" => {
			sub.replace(cx);
			sub.next(cx);
		}
		"n" => sub.next(cx),
		"a" => {
			sub.replace_all(cx);
			stop = true;
		}
		"l" => {
			sub.replace(cx);
			stop = true;
		}
		"q" | "<Esc>" | "<C-c>" | "<C-[>" => stop = true,
		_ => {}
	}
	if stop || sub.done {
		sub.stop(cx);
		cx.host.close_prompt();
		return continue_global(cx)
	}
	cx.vim.prompt = Some(Prompt {
		kind: PromptKind::Confirm(Box::new(sub)),
		prefix,
		value: String::new()
	});
	Ok(())
}
