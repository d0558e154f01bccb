use std::fmt::Display;

#[derive(Default,Clone,Copy,PartialEq,Eq,Hash,Debug)]
pub enum Mode {
	#[default]
	Normal,
	Insert,
	Visual,
	Replace
}

#[derive(Clone,Copy,PartialEq,Eq,Hash,Debug)]
pub enum SubMode {
	Linewise,
	Blockwise
}

impl Display for Mode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Normal => write!(f, "normal"),
			Self::Insert => write!(f, "insert"),
			Self::Visual => write!(f, "visual"),
			Self::Replace => write!(f, "replace")
		}
	}
}

#[derive(Default,Clone,Copy,PartialEq,Eq,Debug)]
pub struct ModeInfo {
	pub mode: Mode,
	pub sub_mode: Option<SubMode>
}

#[derive(Clone,Copy,PartialEq,Eq,Hash,Debug)]
pub enum EventKind {
	ModeChange,
	CommandDone
}

#[derive(Clone,Copy,PartialEq,Eq,Debug)]
pub enum Event {
	ModeChange(ModeInfo),
	CommandDone
}

impl Event {
	pub fn kind(&self) -> EventKind {
		match self {
			Self::ModeChange(_) => EventKind::ModeChange,
			Self::CommandDone => EventKind::CommandDone
		}
	}
}

/// Handle returned by [`Events::subscribe`]
#[derive(Clone,Copy,PartialEq,Eq,Hash,Debug)]
pub struct Subscription(u64);

type Listener = Box<dyn FnMut(&Event)>;

#[derive(Default)]
pub struct Events {
	next_id: u64,
	listeners: Vec<(Subscription,EventKind,Listener)>
}

impl std::fmt::Debug for Events {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Events").field("listeners", &self.listeners.len()).finish()
	}
}

impl Events {
	pub fn subscribe(&mut self, kind: EventKind, listener: impl FnMut(&Event) + 'static) -> Subscription {
		let sub = Subscription(self.next_id);
		self.next_id += 1;
		self.listeners.push((sub, kind, Box::new(listener)));
		sub
	}
	pub fn unsubscribe(&mut self, sub: Subscription) -> bool {
		let before = self.listeners.len();
		self.listeners.retain(|(s,_,_)| *s != sub);
		self.listeners.len() != before
	}
	pub fn emit(&mut self, event: Event) {
		let kind = event.kind();
		for (_, listen_kind, listener) in self.listeners.iter_mut() {
			if *listen_kind == kind {
				listener(&event);
			}
		}
	}
}
