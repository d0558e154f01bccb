//! Backing store for the `+` register.

#[cfg(feature = "system-clipboard")]
use log::warn;

pub trait Clipboard {
	/// Current clipboard contents, or `None` if the clipboard could not be read.
	fn get(&mut self) -> Option<String>;
	fn set(&mut self, text: String);
}

/// Process-local clipboard. Used when no system clipboard is available.
#[derive(Default,Debug)]
pub struct MemoryClipboard {
	text: Option<String>
}

impl Clipboard for MemoryClipboard {
	fn get(&mut self) -> Option<String> {
		self.text.clone()
	}
	fn set(&mut self, text: String) {
		self.text = Some(text);
	}
}

#[cfg(feature = "system-clipboard")]
pub struct SystemClipboard {
	inner: arboard::Clipboard
}

#[cfg(feature = "system-clipboard")]
impl SystemClipboard {
	pub fn new() -> Option<Self> {
		match arboard::Clipboard::new() {
			Ok(inner) => Some(Self { inner }),
			Err(e) => {
				warn!("system clipboard unavailable: {e}");
				None
			}
		}
	}
}

#[cfg(feature = "system-clipboard")]
impl Clipboard for SystemClipboard {
	fn get(&mut self) -> Option<String> {
		self.inner.get_text().ok()
	}
	fn set(&mut self, text: String) {
		if let Err(e) = self.inner.set_text(text) {
			warn!("failed to write system clipboard: {e}");
		}
	}
}
