use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::card::{join_bracketed, join_compact, Card};
use crate::domain::chips::Chips;
use crate::domain::hand::Street;
use crate::domain::SeatIndex;
use crate::engine::actions::Action;

/// Маркер обрезки ленты игрока.
pub const TRUNCATION_MARKER: &str = "\n--- Log truncated due to size limit ---";

/// Индекс участника сессии: 0 - игрок (или его бот), 1 - бот-соперник.
pub type Participant = usize;

/// Тип события в раздаче.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum HandEventKind {
    /// Новая раздача началась; банкроллы участников до блайндов.
    HandStarted {
        hand_number: u32,
        bankrolls: [Chips; 2],
    },

    BlindPosted {
        participant: Participant,
        amount: Chips,
    },

    /// Карманные карты участнику, сидящему на месте `seat` раздачи.
    HoleCardsDealt {
        participant: Participant,
        seat: SeatIndex,
        cards: [Card; 2],
    },

    /// Открыта новая улица; `committed` - вклад участников в банк.
    StreetDealt {
        street: Street,
        board: Vec<Card>,
        committed: [Chips; 2],
    },

    /// Действие участника. `opening_bet` - рейз на улице без ставок.
    PlayerActed {
        participant: Participant,
        action: Action,
        opening_bet: bool,
    },

    ShowdownReveal {
        participant: Participant,
        cards: [Card; 2],
    },

    /// Итог раздачи для участника.
    PotAwarded {
        participant: Participant,
        delta: i64,
    },

    /// Бот упал / ответил мусором - подставлено действие по умолчанию.
    BotWarning {
        participant: Participant,
        message: String,
    },
}

/// Событие в раздаче с порядковым номером.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HandEvent {
    pub index: u32,
    pub kind: HandEventKind,
}

/// Полная история текущей раздачи.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct HandHistory {
    pub events: Vec<HandEvent>,
}

impl HandHistory {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, kind: HandEventKind) {
        let idx = self.events.len() as u32;
        self.events.push(HandEvent { index: idx, kind });
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|e| match &e.kind {
            HandEventKind::BotWarning { message, .. } => Some(message.as_str()),
            _ => None,
        })
    }
}

/// Компактная лента одного участника.
///
/// `hand` - токены текущей раздачи (их видит бот через контекст),
/// `log` - накопительный журнал за сессию, ограниченный по байтам.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerFeed {
    pub hand: Vec<String>,
    pub log: String,
    pub limit: usize,
    pub truncated: bool,
}

impl PlayerFeed {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn push_token(&mut self, token: String) {
        self.append_log(&format!("{token} "));
        self.hand.push(token);
    }

    pub fn start_hand(&mut self) {
        self.hand.clear();
        if !self.log.is_empty() {
            self.append_log("\n");
        }
    }

    /// Дописать текст в журнал; за лимитом - маркер обрезки и тишина.
    pub fn append_log(&mut self, text: &str) {
        if self.truncated {
            return;
        }
        let room = self.limit.saturating_sub(self.log.len());
        if text.len() <= room {
            self.log.push_str(text);
            return;
        }
        let mut cut = room;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        self.log.push_str(&text[..cut]);
        self.log.push_str(TRUNCATION_MARKER);
        self.truncated = true;
    }
}

/// Логи сессии: человекочитаемый транскрипт + ленты участников.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionLogs {
    pub names: [String; 2],
    pub transcript: Vec<String>,
    pub feeds: [PlayerFeed; 2],
    pub history: HandHistory,
    pub hand_number: u32,
}

impl SessionLogs {
    pub fn new(names: [String; 2], player_log_limit: usize) -> Self {
        let transcript = vec![format!("Poker Game - {} vs {}", names[0], names[1])];
        Self {
            names,
            transcript,
            feeds: [PlayerFeed::new(player_log_limit), PlayerFeed::new(player_log_limit)],
            history: HandHistory::new(),
            hand_number: 0,
        }
    }

    /// Записать событие: строка(и) транскрипта + токены в ленты.
    pub fn record(&mut self, kind: HandEventKind) {
        match &kind {
            HandEventKind::HandStarted {
                hand_number,
                bankrolls,
            } => {
                self.history.clear();
                self.hand_number = *hand_number;
                self.transcript.push(String::new());
                let status = self.status(*bankrolls);
                self.transcript.push(format!("Round #{hand_number}{status}"));
                for feed in self.feeds.iter_mut() {
                    feed.start_hand();
                    feed.push_token(format!("T{hand_number}."));
                }
            }
            HandEventKind::BlindPosted {
                participant,
                amount,
            } => {
                let name = &self.names[*participant];
                self.transcript.push(format!("{name} posts the blind of {amount}"));
            }
            HandEventKind::HoleCardsDealt {
                participant,
                seat,
                cards,
            } => {
                let name = &self.names[*participant];
                self.transcript.push(format!("{name} dealt {}", join_bracketed(cards)));
                let feed = &mut self.feeds[*participant];
                feed.push_token(format!("P{seat}"));
                feed.push_token(format!("H{}", join_compact(cards)));
            }
            HandEventKind::StreetDealt {
                street,
                board,
                committed,
            } => {
                let line = format!(
                    "{} {}, {} ({}), {} ({})",
                    street.title(),
                    join_bracketed(board),
                    self.names[0],
                    committed[0],
                    self.names[1],
                    committed[1],
                );
                self.transcript.push(line);
                self.push_both(format!("B{}", join_compact(board)));
            }
            HandEventKind::PlayerActed {
                participant,
                action,
                opening_bet,
            } => {
                let name = &self.names[*participant];
                let phrasing = match action {
                    Action::Fold => " folds".to_string(),
                    Action::Call => " calls".to_string(),
                    Action::Check => " checks".to_string(),
                    Action::Raise { amount } if *opening_bet => format!(" bets {amount}"),
                    Action::Raise { amount } => format!(" raises to {amount}"),
                };
                self.transcript.push(format!("{name}{phrasing}"));
                self.push_both(action.compact_code());
            }
            HandEventKind::ShowdownReveal { participant, cards } => {
                let name = &self.names[*participant];
                self.transcript.push(format!("{name} shows {}", join_bracketed(cards)));
                // соперник видит открытые карты
                self.feeds[1 - *participant].push_token(format!("O{}", join_compact(cards)));
            }
            HandEventKind::PotAwarded { participant, delta } => {
                let name = &self.names[*participant];
                self.transcript.push(format!("{name} awarded {delta}"));
                self.feeds[*participant].push_token(format!("D{delta}"));
            }
            HandEventKind::BotWarning {
                participant,
                message,
            } => {
                self.transcript.push(message.clone());
                self.feeds[*participant].append_log(&format!("\n{message}\n"));
            }
        }
        self.history.push(kind);
    }

    /// Итоговая строка сессии.
    pub fn finish(&mut self, bankrolls: [Chips; 2]) {
        self.transcript.push(String::new());
        let status = self.status(bankrolls);
        self.transcript.push(format!("Final{status}"));
    }

    /// Токены текущей раздачи участника.
    pub fn hand_messages(&self, participant: Participant) -> &[String] {
        &self.feeds[participant].hand
    }

    pub fn transcript_text(&self) -> String {
        self.transcript.join("\n")
    }

    /// Сохранить `gamelog.txt` и по файлу на участника.
    pub fn save_to_dir(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join("gamelog.txt"), self.transcript_text())?;
        for (name, feed) in self.names.iter().zip(self.feeds.iter()) {
            fs::write(dir.join(format!("{}.txt", file_stem(name))), &feed.log)?;
        }
        Ok(())
    }

    fn push_both(&mut self, token: String) {
        self.feeds[0].push_token(token.clone());
        self.feeds[1].push_token(token);
    }

    fn status(&self, bankrolls: [Chips; 2]) -> String {
        format!(
            ", {} ({}), {} ({})",
            self.names[0], bankrolls[0], self.names[1], bankrolls[1]
        )
    }
}

fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "player".to_string()
    } else {
        stem
    }
}
