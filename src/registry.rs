//! Host-defined motions, operators, actions and Ex commands, looked up by name when a
//! `Custom` command runs.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::VimResult;
use crate::ex::ExParams;
use crate::motion::MotionResult;
use crate::pos::{Pos, Range};
use crate::state::Cx;
use crate::vicmd::{ActionArgs, MotionArgs, OperatorArgs};

pub type MotionFn = Rc<dyn Fn(&mut Cx, Pos, &MotionArgs) -> VimResult<Option<MotionResult>>>;
/// Called with the ranges to act on, the anchor before the motion and the head after it
pub type OperatorFn = Rc<dyn Fn(&mut Cx, &OperatorArgs, &[Range], Pos, Pos) -> VimResult<Option<Pos>>>;
pub type ActionFn = Rc<dyn Fn(&mut Cx, &ActionArgs) -> VimResult<()>>;
pub type ExFn = Rc<dyn Fn(&mut Cx, &ExParams) -> VimResult<()>>;

#[derive(Default,Clone)]
pub struct Registry {
	motions: HashMap<String,MotionFn>,
	operators: HashMap<String,OperatorFn>,
	actions: HashMap<String,ActionFn>,
	ex: HashMap<String,ExFn>,
}

fn sorted_keys<V>(map: &HashMap<String,V>) -> Vec<&str> {
	let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
	keys.sort();
	keys
}

impl std::fmt::Debug for Registry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Registry")
			.field("motions", &sorted_keys(&self.motions))
			.field("operators", &sorted_keys(&self.operators))
			.field("actions", &sorted_keys(&self.actions))
			.field("ex", &sorted_keys(&self.ex))
			.finish()
	}
}

impl Registry {
	pub fn define_motion(&mut self, name: &str, func: MotionFn) {
		self.motions.insert(name.to_string(), func);
	}
	pub fn define_operator(&mut self, name: &str, func: OperatorFn) {
		self.operators.insert(name.to_string(), func);
	}
	pub fn define_action(&mut self, name: &str, func: ActionFn) {
		self.actions.insert(name.to_string(), func);
	}
	pub fn define_ex(&mut self, name: &str, func: ExFn) {
		self.ex.insert(name.to_string(), func);
	}

	// Lookups hand out clones so the caller can drop its borrow of the registry before calling
	pub fn motion(&self, name: &str) -> Option<MotionFn> {
		self.motions.get(name).cloned()
	}
	pub fn operator(&self, name: &str) -> Option<OperatorFn> {
		self.operators.get(name).cloned()
	}
	pub fn action(&self, name: &str) -> Option<ActionFn> {
		self.actions.get(name).cloned()
	}
	pub fn ex(&self, name: &str) -> Option<ExFn> {
		self.ex.get(name).cloned()
	}
}
