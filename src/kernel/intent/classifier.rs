use super::patterns::{CommandPatternTable, GamePattern, DEFAULT_TABLE};
use super::types::VoiceIntent;

/// Phrases this short are too ambiguous to start a game on their own.
const SHORT_KEYWORD_CHARS: usize = 2;

/// How many leading phrases of a game category count as its core phrases.
const CORE_PHRASES: usize = 3;

/// Rule-based transcript classifier.
///
/// Categories are evaluated in a fixed order: UI control, game start, info
/// request, then general chat. Collisions are resolved by that order, never by
/// scoring. Pure and deterministic for a given table.
#[derive(Debug, Clone, Copy)]
pub struct IntentClassifier {
    table: &'static CommandPatternTable,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::with_table(&DEFAULT_TABLE)
    }

    pub fn with_table(table: &'static CommandPatternTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'static CommandPatternTable {
        self.table
    }

    /// Classify a transcript. Never fails; falls back to general chat.
    pub fn classify(&self, transcript: &str) -> VoiceIntent {
        let text = normalize(transcript);

        if let Some(intent) = self.match_ui_control(&text) {
            return intent;
        }
        if let Some(intent) = self.match_game_start(&text) {
            return intent;
        }
        if self.table.info_requests.iter().any(|p| text.contains(p)) {
            return VoiceIntent::info_request();
        }

        VoiceIntent::general_chat()
    }

    // UI phrases are short ("랭킹") and would be swallowed by game phrases if
    // checked later.
    fn match_ui_control(&self, text: &str) -> Option<VoiceIntent> {
        self.table
            .ui_controls
            .iter()
            .find(|c| c.phrases.iter().any(|p| text.contains(p)))
            .map(|c| VoiceIntent::ui_control(c.action))
    }

    fn match_game_start(&self, text: &str) -> Option<VoiceIntent> {
        let has_action_word = self.table.action_words.iter().any(|w| text.contains(w));

        for game in self.table.games {
            for phrase in game.phrases.iter().filter(|p| text.contains(*p)) {
                if self.accepts_game_phrase(game, phrase, text, has_action_word) {
                    return Some(VoiceIntent::game_start(game.game, has_action_word));
                }
            }
        }
        None
    }

    fn accepts_game_phrase(
        &self,
        game: &GamePattern,
        phrase: &str,
        text: &str,
        has_action_word: bool,
    ) -> bool {
        let is_explicit = self.table.game_markers.iter().any(|m| phrase.contains(m));
        let is_short = phrase.chars().count() <= SHORT_KEYWORD_CHARS;
        let mentions_core = game
            .phrases
            .iter()
            .take(CORE_PHRASES)
            .any(|p| text.contains(p));

        has_action_word || is_explicit || (!is_short && mentions_core)
    }
}

/// Lower-case, collapse internal whitespace, trim.
pub fn normalize(transcript: &str) -> String {
    transcript
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Classify against the default table.
pub fn classify(transcript: &str) -> VoiceIntent {
    IntentClassifier::new().classify(transcript)
}
