pub mod classifier;
pub mod patterns;
pub mod types;

pub use classifier::{classify, normalize, IntentClassifier};
pub use patterns::{CommandPatternTable, GamePattern, UiControlPattern, DEFAULT_TABLE};
pub use types::{IntentKind, VoiceIntent};
