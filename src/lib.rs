pub mod config;
pub mod error;
pub mod kernel;
pub mod protocol;
pub mod services;

pub use kernel::intent::{classify, IntentClassifier, IntentKind, VoiceIntent};
pub use kernel::reactor::{Collaborators, Reactor, ReactorConfig};
pub use kernel::turn::{TurnCoordinator, TurnState};
