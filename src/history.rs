/// Command-line history with prefix recall.
///
/// Walking with `<Up>`/`<Down>` only visits entries that start with whatever was typed
/// when the walk began.
#[derive(Clone,Default,Debug)]
pub struct History {
	entries: Vec<String>,
	iterator: usize,
	initial_prefix: Option<String>,
}

impl History {
	pub fn new() -> Self {
		Self::default()
	}
	pub fn entries(&self) -> &[String] {
		&self.entries
	}

	/// Next entry matching the walk's prefix, or the prefix itself once the walk runs off the newest end.
	/// Running off the oldest end leaves `input` unchanged.
	pub fn next_match(&mut self, input: &str, up: bool) -> String {
		let prefix = self.initial_prefix.get_or_insert_with(|| input.to_string()).clone();
		let mut i = self.iterator as isize;
		loop {
			i += if up { -1 } else { 1 };
			if i < 0 {
				return input.to_string()
			}
			let Some(entry) = self.entries.get(i as usize) else {
				self.iterator = self.entries.len();
				return prefix
			};
			if entry.starts_with(&prefix) {
				self.iterator = i as usize;
				return entry.clone()
			}
		}
	}

	/// Record a submitted line, moving an existing duplicate to the newest position. Empty input is dropped.
	pub fn push_input(&mut self, input: &str) {
		self.entries.retain(|e| e != input);
		if !input.is_empty() {
			self.entries.push(input.to_string());
		}
	}

	pub fn reset(&mut self) {
		self.initial_prefix = None;
		self.iterator = self.entries.len();
	}
}
