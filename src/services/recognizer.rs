use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::error::RecognizerError;

/// Continuous speech recognizer. Transcripts arrive as `InputEvent::Transcript`.
pub trait Recognizer: Send + Sync {
    fn is_supported(&self) -> bool;
    fn start(&self) -> Result<(), RecognizerError>;
    fn pause(&self);
    fn resume(&self);
    fn stop(&self);
}

/// Flag-backed recognizer for the terminal driver, where stdin is the microphone.
#[derive(Debug, Default)]
pub struct ConsoleRecognizer {
    running: AtomicBool,
    paused: AtomicBool,
}

impl ConsoleRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_listening(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.paused.load(Ordering::SeqCst)
    }
}

impl Recognizer for ConsoleRecognizer {
    fn is_supported(&self) -> bool {
        true
    }

    fn start(&self) -> Result<(), RecognizerError> {
        self.running.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        debug!("console recognizer started");
        Ok(())
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        debug!("console recognizer paused");
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        debug!("console recognizer resumed");
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        debug!("console recognizer stopped");
    }
}
