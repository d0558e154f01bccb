//! The option table behind `:set`.
//!
//! Every option has a global value. Editors can carry local overrides (`:setlocal`), which
//! live in the editor's own state and are passed in here as a plain map.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Clone,PartialEq,Eq,Debug,Serialize,Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
	Bool(bool),
	Number(i64),
	String(String)
}

impl OptionValue {
	pub fn as_bool(&self) -> bool {
		match self {
			Self::Bool(b) => *b,
			Self::Number(n) => *n != 0,
			Self::String(s) => !s.is_empty()
		}
	}
	pub fn as_number(&self) -> i64 {
		match self {
			Self::Bool(b) => *b as i64,
			Self::Number(n) => *n,
			Self::String(s) => s.parse().unwrap_or(0)
		}
	}
	pub fn as_str(&self) -> String {
		self.to_string()
	}
	fn kind(&self) -> OptionKind {
		match self {
			Self::Bool(_) => OptionKind::Boolean,
			Self::Number(_) => OptionKind::Number,
			Self::String(_) => OptionKind::String
		}
	}
}

impl Display for OptionValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Bool(b) => write!(f, "{b}"),
			Self::Number(n) => write!(f, "{n}"),
			Self::String(s) => write!(f, "{s}")
		}
	}
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum OptionKind {
	Boolean,
	Number,
	String
}

#[derive(Default,Clone,Copy,PartialEq,Eq,Debug)]
pub enum Scope {
	/// Both the global value and the editor's local value
	#[default]
	Both,
	Global,
	Local
}

#[derive(Clone,Debug)]
pub struct OptionDef {
	pub name: String,
	pub kind: OptionKind,
	pub default: OptionValue,
	value: OptionValue
}

/// Options as they appear in a JSON config file: `{ "textwidth": 72, "expandtab": false }`
#[derive(Default,Clone,Debug,Serialize,Deserialize)]
pub struct OptionsConfig {
	#[serde(flatten)]
	pub values: BTreeMap<String,OptionValue>
}

pub type LocalOptions = HashMap<String,OptionValue>;

#[derive(Clone,Debug)]
pub struct Options {
	defs: BTreeMap<String,OptionDef>,
	aliases: HashMap<String,String>,
}

impl Default for Options {
	fn default() -> Self {
		use OptionValue as V;
		let mut opts = Self { defs: BTreeMap::new(), aliases: HashMap::new() };
		opts.define("textwidth", V::Number(80), &["tw"]);
		opts.define("tabstop", V::Number(4), &["ts"]);
		opts.define("shiftwidth", V::Number(4), &["sw"]);
		opts.define("expandtab", V::Bool(true), &["et"]);
		opts.define("ignorecase", V::Bool(true), &["ic"]);
		opts.define("smartcase", V::Bool(true), &["scs"]);
		opts.define("pcre", V::Bool(true), &[]);
		opts.define("hlsearch", V::Bool(true), &["hls"]);
		opts.define("wrap", V::Bool(false), &[]);
		opts.define("filetype", V::String(String::new()), &["ft"]);
		opts.define("langmap", V::String(String::new()), &["lmap"]);
		opts.define("insertModeEscKeysTimeout", V::Number(200), &[]);
		opts
	}
}

impl Options {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn define(&mut self, name: &str, default: OptionValue, aliases: &[&str]) {
		let def = OptionDef {
			name: name.to_string(),
			kind: default.kind(),
			value: default.clone(),
			default,
		};
		self.defs.insert(name.to_string(), def);
		for alias in aliases {
			self.aliases.insert(alias.to_string(), name.to_string());
		}
	}

	/// Canonical name for an option or one of its aliases
	pub fn resolve<'a>(&'a self, name: &'a str) -> Option<&'a str> {
		if self.defs.contains_key(name) {
			return Some(name)
		}
		self.aliases.get(name).map(|s| s.as_str())
	}

	pub fn def(&self, name: &str) -> Option<&OptionDef> {
		self.defs.get(self.resolve(name)?)
	}

	/// Turn the text after `=` into a value of the option's type
	pub fn coerce(&self, name: &str, raw: &str) -> Result<OptionValue,String> {
		let def = self.def(name).ok_or_else(|| format!("Unknown option: {name}"))?;
		let invalid = || format!("Invalid argument: {name}={raw}");
		match def.kind {
			OptionKind::Boolean => match raw {
				"true" => Ok(OptionValue::Bool(true)),
				"false" => Ok(OptionValue::Bool(false)),
				_ => Err(invalid())
			}
			OptionKind::Number => raw.parse().map(OptionValue::Number).map_err(|_| invalid()),
			OptionKind::String => Ok(OptionValue::String(raw.to_string()))
		}
	}

	pub fn set(&mut self, name: &str, value: OptionValue, local: Option<&mut LocalOptions>, scope: Scope) -> Result<(),String> {
		let Some(canonical) = self.resolve(name).map(str::to_string) else {
			return Err(format!("Unknown option: {name}"))
		};
		let Some(def) = self.defs.get_mut(&canonical) else {
			return Err(format!("Unknown option: {name}"))
		};
		if def.kind != value.kind() {
			return Err(format!("Invalid argument: {name}={value}"))
		}
		if scope != Scope::Local {
			def.value = value.clone();
		}
		if scope != Scope::Global && let Some(local) = local {
			local.insert(canonical, value);
		}
		Ok(())
	}

	pub fn get(&self, name: &str, local: Option<&LocalOptions>, scope: Scope) -> Result<OptionValue,String> {
		let Some(canonical) = self.resolve(name) else {
			return Err(format!("Unknown option: {name}"))
		};
		if scope != Scope::Global && let Some(value) = local.and_then(|l| l.get(canonical)) {
			return Ok(value.clone())
		}
		self.defs.get(canonical)
			.map(|def| def.value.clone())
			.ok_or_else(|| format!("Unknown option: {name}"))
	}

	/// Apply a JSON config object on top of the current global values
	pub fn load_json(&mut self, json: &str) -> Result<Vec<String>,String> {
		let config: OptionsConfig = serde_json::from_str(json).map_err(|e| e.to_string())?;
		let mut changed = vec![];
		for (name, value) in config.values {
			self.set(&name, value, None, Scope::Global)?;
			changed.push(name);
		}
		Ok(changed)
	}

	pub fn to_config(&self) -> OptionsConfig {
		let values = self.defs.iter()
			.map(|(name, def)| (name.clone(), def.value.clone()))
			.collect();
		OptionsConfig { values }
	}

	pub fn reset(&mut self) {
		for def in self.defs.values_mut() {
			def.value = def.default.clone();
		}
	}
}
