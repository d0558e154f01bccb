use thiserror::Error;

#[derive(Error,Debug,Clone,PartialEq,Eq)]
pub enum VimError {
	/// A message meant for the user's eyes. Recovered locally and sent to the host's notification line.
	#[error("{0}")]
	Notify(String),
	/// Something went wrong while executing a resolved command.
	#[error("internal fault: {0}")]
	Fault(String),
}

impl VimError {
	pub fn notify(msg: impl Into<String>) -> Self {
		Self::Notify(msg.into())
	}
	pub fn fault(msg: impl Into<String>) -> Self {
		Self::Fault(msg.into())
	}
}

impl From<String> for VimError {
	fn from(msg: String) -> Self {
		Self::Notify(msg)
	}
}

impl From<&str> for VimError {
	fn from(msg: &str) -> Self {
		Self::Notify(msg.to_string())
	}
}

pub type VimResult<T> = Result<T,VimError>;
