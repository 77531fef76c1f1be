//! Trigger phrase tables.
//!
//! Every phrase is stored already normalized (lower case, single spaces) so the
//! classifier can compare against a normalized transcript with plain substring
//! checks. Declaration order is significant: categories and phrases are tried
//! top to bottom and the first hit wins.

/// A host-page UI action and the phrases that trigger it.
#[derive(Debug, Clone, Copy)]
pub struct UiControlPattern {
    pub action: &'static str,
    pub phrases: &'static [&'static str],
}

/// A game and the phrases that can start it.
#[derive(Debug, Clone, Copy)]
pub struct GamePattern {
    pub game: &'static str,
    /// Spoken name used in confirmations.
    pub display_name: &'static str,
    pub phrases: &'static [&'static str],
}

/// Read-only keyword table driving classification.
#[derive(Debug, Clone, Copy)]
pub struct CommandPatternTable {
    pub ui_controls: &'static [UiControlPattern],
    pub games: &'static [GamePattern],
    pub info_requests: &'static [&'static str],
    /// Imperatives that turn a bare game keyword into a start request.
    pub action_words: &'static [&'static str],
    /// Words that make a matched phrase an explicit game/start phrase.
    pub game_markers: &'static [&'static str],
}

impl CommandPatternTable {
    pub fn game(&self, id: &str) -> Option<&GamePattern> {
        self.games.iter().find(|g| g.game == id)
    }
}

pub static DEFAULT_TABLE: CommandPatternTable = CommandPatternTable {
    ui_controls: &[
        UiControlPattern {
            action: "SHOW_RANKING",
            phrases: &["랭킹 보여", "순위 보여", "랭킹", "순위", "ranking"],
        },
        UiControlPattern {
            action: "SHOW_DASHBOARD",
            phrases: &["대시보드", "내 기록 보여", "통계 보여", "dashboard"],
        },
        UiControlPattern {
            action: "CLOSE_GAME",
            phrases: &["게임 종료", "게임 그만", "그만할래", "그만하기"],
        },
        UiControlPattern {
            action: "GO_HOME",
            phrases: &["홈으로", "처음으로", "메인 화면"],
        },
        UiControlPattern {
            action: "GO_BACK",
            phrases: &["뒤로 가", "이전 화면", "뒤로"],
        },
        UiControlPattern {
            action: "VOLUME_UP",
            phrases: &["소리 키워", "볼륨 올려", "크게 해"],
        },
        UiControlPattern {
            action: "VOLUME_DOWN",
            phrases: &["소리 줄여", "볼륨 내려", "작게 해"],
        },
        UiControlPattern {
            action: "SHOW_HELP",
            phrases: &["도움말", "사용법"],
        },
    ],
    games: &[
        GamePattern {
            game: "hwatu",
            display_name: "화투",
            phrases: &["화투 게임", "화투 시작", "화투", "고스톱"],
        },
        GamePattern {
            game: "number",
            display_name: "숫자 기억",
            phrases: &["숫자 게임", "숫자 기억", "숫자 맞추기", "숫자"],
        },
        GamePattern {
            game: "card",
            display_name: "카드 짝 맞추기",
            phrases: &["카드 게임", "카드 뒤집기", "짝 맞추기", "카드"],
        },
        GamePattern {
            game: "color",
            display_name: "색깔 기억",
            phrases: &["색깔 게임", "색깔 기억", "색깔 맞추기", "색깔"],
        },
        GamePattern {
            game: "word",
            display_name: "단어 기억",
            phrases: &["단어 게임", "단어 기억", "끝말잇기", "단어"],
        },
    ],
    info_requests: &[
        "내 점수",
        "점수 알려",
        "몇 점",
        "규칙 알려",
        "규칙 설명",
        "어떻게 하는",
        "방법 알려",
        "what's my score",
        "explain the rules",
        "how to play",
    ],
    action_words: &[
        "시작", "해줘", "할래", "하자", "실행", "열어", "켜줘", "틀어", "가자", "start", "do it",
        "run", "open", "turn on", "play", "go",
    ],
    game_markers: &["게임", "시작", "game", "start"],
};
