use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::SmallRng;
use thiserror::Error;

use crate::catalog::{Catalog, Character, Language, WritingSystem};
use crate::engine::scheduler::{self, PracticeOrder};
use crate::engine::timer::{TimerKind, TimerQueue};
use crate::engine::validator;
use crate::session::input::ResponseInput;
use crate::session::speech::{SpeechStart, Speaker, Utterance};
use crate::store::score_store::{CharacterScores, ScoreStore, ScoreTable, score_key};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuizTimings {
    /// Longest wait for the speech-end event.
    pub speech_fallback: Duration,
    /// A solved character stays up at least this long.
    pub minimum_dwell: Duration,
    /// Gap between one character leaving and the next appearing.
    pub settle: Duration,
    /// Time without a correct answer before the character counts as failed.
    pub failure_timeout: Duration,
}

impl Default for QuizTimings {
    fn default() -> Self {
        Self {
            speech_fallback: Duration::from_secs(1),
            minimum_dwell: Duration::from_secs(1),
            settle: Duration::from_millis(500),
            failure_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No writing system selected.
    Idle,
    /// Character shown, input accepted.
    Presenting,
    /// Answered; speaking and dwelling, input frozen.
    AwaitingAdvance,
    /// Between characters, input frozen.
    Settling,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no language at index {0}")]
    UnknownLanguage(usize),
    #[error("{language} has no writing system at index {index}")]
    UnknownWritingSystem { language: String, index: usize },
    #[error("no writing system named '{writing_system}' for {language}")]
    NotFound {
        language: String,
        writing_system: String,
    },
    #[error("{language} {writing_system} has no characters")]
    EmptyWritingSystem {
        language: String,
        writing_system: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputOutcome {
    /// Input arrived while the quiz was not accepting it.
    Ignored,
    /// Buffer updated, not yet a match.
    Pending,
    /// Buffer matched an accepted response.
    Correct,
}

#[derive(Clone, Debug)]
struct Selection {
    language: usize,
    writing_system: usize,
    key: String,
}

/// Two conditions gate leaving a solved character: the speech branch
/// (speech end or its fallback, whichever comes first) and the dwell.
#[derive(Clone, Copy, Debug)]
struct AdvanceWait {
    utterance: Utterance,
    speech_done: bool,
    dwell_done: bool,
}

impl AdvanceWait {
    fn is_complete(&self) -> bool {
        self.speech_done && self.dwell_done
    }
}

/// What the presentation layer needs to draw the quiz.
#[derive(Clone, Debug)]
pub struct SessionView<'a> {
    pub language: Option<&'a Language>,
    pub writing_system: Option<&'a WritingSystem>,
    pub character: Option<&'a Character>,
    pub character_index: Option<usize>,
    pub scores: Option<&'a CharacterScores>,
    pub response: &'a str,
    pub phase: Phase,
    pub is_character_failed: bool,
    pub position: usize,
    pub pass_len: usize,
    pub close_menu: bool,
}

/// The quiz state machine.
///
/// Driven entirely by calls carrying the current `Instant`: selection,
/// response input, speech completion and `tick`. Nothing here blocks or
/// spawns; timers are deadlines in a generation-tagged `TimerQueue`.
pub struct QuizSession {
    catalog: Arc<Catalog>,
    store: ScoreStore,
    scores: ScoreTable,
    speaker: Box<dyn Speaker>,
    timers: TimerQueue,
    timings: QuizTimings,
    rng: SmallRng,
    selection: Option<Selection>,
    practice: PracticeOrder,
    response: String,
    is_character_failed: bool,
    phase: Phase,
    wait: Option<AdvanceWait>,
    next_utterance: u64,
    close_menu: bool,
    /// Failure-timer time left while the quiz is paused behind the menu.
    paused: Option<Duration>,
}

impl QuizSession {
    pub fn new(catalog: Arc<Catalog>, store: ScoreStore, speaker: Box<dyn Speaker>) -> Self {
        let scores = store.load();
        Self {
            catalog,
            store,
            scores,
            speaker,
            timers: TimerQueue::new(),
            timings: QuizTimings::default(),
            rng: SmallRng::from_entropy(),
            selection: None,
            practice: PracticeOrder::new(Vec::new()),
            response: String::new(),
            is_character_failed: false,
            phase: Phase::Idle,
            wait: None,
            next_utterance: 0,
            close_menu: false,
            paused: None,
        }
    }

    pub fn with_timings(mut self, timings: QuizTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_rng(mut self, rng: SmallRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn scores(&self) -> &ScoreTable {
        &self.scores
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn is_character_failed(&self) -> bool {
        self.is_character_failed
    }

    pub fn character_position(&self) -> usize {
        self.practice.position()
    }

    pub fn character_order(&self) -> &[usize] {
        self.practice.order()
    }

    pub fn selection(&self) -> Option<(usize, usize)> {
        self.selection
            .as_ref()
            .map(|s| (s.language, s.writing_system))
    }

    pub fn is_timer_pending(&self, kind: TimerKind) -> bool {
        self.timers.is_pending(kind)
    }

    pub fn current_character(&self) -> Option<&Character> {
        let selection = self.selection.as_ref()?;
        let ws = self
            .catalog
            .writing_system(selection.language, selection.writing_system)?;
        ws.character(self.practice.current()?)
    }

    /// Start a fresh session on a writing system.
    ///
    /// Every outstanding timer and speech wait of the previous session is
    /// dropped. The first visit to a writing system runs in catalog order;
    /// later visits use the score-weighted shuffle. The first character is
    /// shown silently.
    pub fn select_writing_system(
        &mut self,
        language: usize,
        writing_system: usize,
        now: Instant,
    ) -> Result<(), SessionError> {
        let catalog = Arc::clone(&self.catalog);
        let lang = catalog
            .language(language)
            .ok_or(SessionError::UnknownLanguage(language))?;
        let ws = lang
            .writing_system(writing_system)
            .ok_or_else(|| SessionError::UnknownWritingSystem {
                language: lang.code.clone(),
                index: writing_system,
            })?;
        if ws.is_empty() {
            return Err(SessionError::EmptyWritingSystem {
                language: lang.code.clone(),
                writing_system: ws.name.clone(),
            });
        }

        self.timers.reset();
        self.wait = None;
        self.paused = None;

        let key = score_key(lang, ws);
        let visited = self.store.ensure_seeded(&mut self.scores, lang, ws);
        let order = if visited {
            scheduler::build_weighted_order(ws, self.scores.get(&key), &mut self.rng)
        } else {
            scheduler::initial_order(ws)
        };
        log::info!(
            "selected {key} ({} slots, {})",
            order.len(),
            if visited { "weighted" } else { "first visit" }
        );

        self.practice = PracticeOrder::new(order);
        self.selection = Some(Selection {
            language,
            writing_system,
            key,
        });
        self.response.clear();
        self.is_character_failed = false;
        self.close_menu = true;
        self.present(now);
        Ok(())
    }

    /// Select by language code and writing system name.
    pub fn select_by_name(
        &mut self,
        language_code: &str,
        writing_system: &str,
        now: Instant,
    ) -> Result<(), SessionError> {
        let (l, w) = self.catalog.find(language_code, writing_system).ok_or_else(|| {
            SessionError::NotFound {
                language: language_code.to_string(),
                writing_system: writing_system.to_string(),
            }
        })?;
        self.select_writing_system(l, w, now)
    }

    /// Leave the quiz: cancel every timer and return to `Idle`.
    pub fn close(&mut self) {
        self.timers.reset();
        self.wait = None;
        self.paused = None;
        self.selection = None;
        self.practice = PracticeOrder::new(Vec::new());
        self.response.clear();
        self.is_character_failed = false;
        self.phase = Phase::Idle;
    }

    pub fn on_response_input(&mut self, input: ResponseInput, now: Instant) -> InputOutcome {
        if self.phase != Phase::Presenting {
            return InputOutcome::Ignored;
        }

        self.response = input.text;
        if input.is_deletion {
            self.is_character_failed = true;
        }

        let matched = self
            .current_character()
            .is_some_and(|c| validator::is_correct(&self.response, c));
        if !matched {
            return InputOutcome::Pending;
        }

        self.begin_advance(now);
        InputOutcome::Correct
    }

    /// Speech completion callback. Only the utterance currently awaited
    /// counts; anything else is a leftover from an earlier character or
    /// session.
    pub fn on_speech_finished(&mut self, utterance: Utterance, now: Instant) {
        let Some(wait) = self.wait.as_mut() else {
            return;
        };
        if wait.utterance != utterance || wait.speech_done {
            return;
        }
        wait.speech_done = true;
        self.timers.cancel(TimerKind::SpeechFallback);
        self.try_advance(now);
    }

    /// Stop the failure clock while the quiz is hidden. Speech, dwell and
    /// settle keep running; a character presented while paused starts
    /// with its full timeout held back.
    pub fn pause(&mut self, now: Instant) {
        if self.paused.is_some() || self.selection.is_none() {
            return;
        }
        self.tick(now);
        let remaining = match self.timers.deadline(TimerKind::FailureTimeout) {
            Some(deadline) => deadline.saturating_duration_since(now),
            None if self.phase == Phase::Presenting => Duration::ZERO,
            None => self.timings.failure_timeout,
        };
        self.timers.cancel(TimerKind::FailureTimeout);
        self.paused = Some(remaining);
    }

    /// Restart the failure clock with the time that was left at `pause`.
    pub fn resume(&mut self, now: Instant) {
        let Some(remaining) = self.paused.take() else {
            return;
        };
        if self.phase == Phase::Presenting && !remaining.is_zero() {
            self.timers.schedule(TimerKind::FailureTimeout, now, remaining);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.is_some()
    }

    /// Fire every timer due at `now`.
    pub fn tick(&mut self, now: Instant) {
        for kind in self.timers.expire(now) {
            match kind {
                TimerKind::FailureTimeout => {
                    if self.phase == Phase::Presenting {
                        log::debug!("no answer in {:?}, marking failed", self.timings.failure_timeout);
                        self.is_character_failed = true;
                    }
                }
                TimerKind::SpeechFallback => {
                    if let Some(wait) = self.wait.as_mut() {
                        wait.speech_done = true;
                    }
                    self.try_advance(now);
                }
                TimerKind::MinimumDwell => {
                    if let Some(wait) = self.wait.as_mut() {
                        wait.dwell_done = true;
                    }
                    self.try_advance(now);
                }
                TimerKind::Settle => {
                    if self.phase == Phase::Settling {
                        self.present(now);
                    }
                }
            }
        }
    }

    pub fn view(&self) -> SessionView<'_> {
        let selection = self.selection.as_ref();
        let language = selection.and_then(|s| self.catalog.language(s.language));
        let writing_system = selection
            .and_then(|s| self.catalog.writing_system(s.language, s.writing_system));
        SessionView {
            language,
            writing_system,
            character: self.current_character(),
            character_index: match self.phase {
                Phase::Settling => None,
                _ => self.practice.current(),
            },
            scores: selection.and_then(|s| self.scores.get(&s.key)),
            response: &self.response,
            phase: self.phase,
            is_character_failed: self.is_character_failed,
            position: self.practice.position(),
            pass_len: self.practice.len(),
            close_menu: self.close_menu,
        }
    }

    pub fn acknowledge_menu_closed(&mut self) {
        self.close_menu = false;
    }

    fn present(&mut self, now: Instant) {
        self.phase = Phase::Presenting;
        if self.paused.is_some() {
            self.paused = Some(self.timings.failure_timeout);
            return;
        }
        self.timers
            .schedule(TimerKind::FailureTimeout, now, self.timings.failure_timeout);
    }

    fn begin_advance(&mut self, now: Instant) {
        let Some(selection) = self.selection.clone() else {
            return;
        };
        let catalog = Arc::clone(&self.catalog);
        let (Some(lang), Some(ws)) = (
            catalog.language(selection.language),
            catalog.writing_system(selection.language, selection.writing_system),
        ) else {
            return;
        };
        let Some(character) = self.practice.current().and_then(|i| ws.character(i)) else {
            return;
        };

        self.timers.cancel(TimerKind::FailureTimeout);
        let score = self.store.update(
            &mut self.scores,
            lang,
            ws,
            character.id(),
            self.is_character_failed,
        );
        log::debug!(
            "{} {} answered ({}), score now {score}",
            selection.key,
            character.id(),
            if self.is_character_failed { "failed" } else { "clean" }
        );

        self.phase = Phase::AwaitingAdvance;
        let utterance = Utterance {
            generation: self.timers.generation(),
            id: self.next_utterance,
        };
        self.next_utterance += 1;

        let speech_done = match self.speaker.speak(character.spoken(), &lang.code, utterance) {
            SpeechStart::Started => {
                self.timers
                    .schedule(TimerKind::SpeechFallback, now, self.timings.speech_fallback);
                false
            }
            SpeechStart::Unavailable => true,
        };
        self.timers
            .schedule(TimerKind::MinimumDwell, now, self.timings.minimum_dwell);
        self.wait = Some(AdvanceWait {
            utterance,
            speech_done,
            dwell_done: false,
        });
    }

    fn try_advance(&mut self, now: Instant) {
        if !self.wait.is_some_and(|w| w.is_complete()) {
            return;
        }
        self.wait = None;
        self.timers.cancel(TimerKind::SpeechFallback);
        self.advance(now);
    }

    fn advance(&mut self, now: Instant) {
        let Some(selection) = self.selection.as_ref() else {
            return;
        };
        let catalog = Arc::clone(&self.catalog);
        let Some(ws) = catalog.writing_system(selection.language, selection.writing_system) else {
            return;
        };

        self.response.clear();
        self.is_character_failed = false;
        let new_pass = self
            .practice
            .advance(ws, self.scores.get(&selection.key), &mut self.rng);
        if new_pass {
            log::info!("{}: new pass of {} slots", selection.key, self.practice.len());
        }

        self.phase = Phase::Settling;
        self.timers.schedule(TimerKind::Settle, now, self.timings.settle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::speech::SilentSpeaker;
    use crate::store::json_store::MemoryStore;

    fn session() -> QuizSession {
        let catalog = Arc::new(Catalog::embedded().unwrap());
        let store = ScoreStore::new(Box::new(MemoryStore::new()));
        QuizSession::new(catalog, store, Box::new(SilentSpeaker))
            .with_rng(SmallRng::seed_from_u64(11))
    }

    #[test]
    fn test_starts_idle() {
        let s = session();
        assert_eq!(s.phase(), Phase::Idle);
        assert!(s.current_character().is_none());
        let view = s.view();
        assert!(view.language.is_none());
        assert_eq!(view.pass_len, 0);
    }

    #[test]
    fn test_input_ignored_when_idle() {
        let mut s = session();
        let outcome = s.on_response_input(ResponseInput::typed("a"), Instant::now());
        assert_eq!(outcome, InputOutcome::Ignored);
        assert_eq!(s.response(), "");
    }

    #[test]
    fn test_select_unknown_indices() {
        let mut s = session();
        let now = Instant::now();
        assert_eq!(
            s.select_writing_system(99, 0, now),
            Err(SessionError::UnknownLanguage(99))
        );
        assert!(matches!(
            s.select_writing_system(0, 99, now),
            Err(SessionError::UnknownWritingSystem { index: 99, .. })
        ));
        assert!(matches!(
            s.select_by_name("el-GR", "Runes", now),
            Err(SessionError::NotFound { .. })
        ));
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn test_select_presents_first_character_silently() {
        let mut s = session();
        let now = Instant::now();
        s.select_by_name("el-GR", "Uppercase", now).unwrap();
        assert_eq!(s.phase(), Phase::Presenting);
        assert_eq!(s.character_position(), 0);
        assert_eq!(s.current_character().unwrap().id(), "alpha");
        assert!(s.is_timer_pending(TimerKind::FailureTimeout));
        assert!(!s.is_timer_pending(TimerKind::SpeechFallback));
        assert!(s.view().close_menu);
        s.acknowledge_menu_closed();
        assert!(!s.view().close_menu);
    }

    #[test]
    fn test_full_cycle_with_silent_speaker() {
        let mut s = session();
        let t0 = Instant::now();
        s.select_by_name("ja-JP", "Hiragana", t0).unwrap();

        assert_eq!(s.on_response_input(ResponseInput::typed("A"), t0), InputOutcome::Correct);
        assert_eq!(s.phase(), Phase::AwaitingAdvance);

        // Input is frozen while waiting.
        assert_eq!(s.on_response_input(ResponseInput::typed("i"), t0), InputOutcome::Ignored);

        // Silent speaker resolves at once, but the dwell still holds for 1s.
        s.tick(t0 + Duration::from_millis(999));
        assert_eq!(s.phase(), Phase::AwaitingAdvance);

        s.tick(t0 + Duration::from_secs(1));
        assert_eq!(s.phase(), Phase::Settling);
        assert_eq!(s.response(), "");
        assert_eq!(s.character_position(), 1);

        s.tick(t0 + Duration::from_millis(1499));
        assert_eq!(s.phase(), Phase::Settling);
        s.tick(t0 + Duration::from_millis(1500));
        assert_eq!(s.phase(), Phase::Presenting);
        assert_eq!(s.current_character().unwrap().id(), "i");
    }

    #[test]
    fn test_settling_hides_next_character_index() {
        let mut s = session();
        let t0 = Instant::now();
        s.select_by_name("el-GR", "Uppercase", t0).unwrap();
        assert_eq!(s.view().character_index, Some(0));

        s.on_response_input(ResponseInput::typed("a"), t0);
        assert_eq!(s.view().character_index, Some(0));

        s.tick(t0 + Duration::from_secs(1));
        assert_eq!(s.phase(), Phase::Settling);
        assert_eq!(s.view().character_index, None);

        s.tick(t0 + Duration::from_millis(1500));
        assert_eq!(s.view().character_index, Some(1));
    }

    #[test]
    fn test_pause_holds_remaining_failure_time() {
        let mut s = session();
        let t0 = Instant::now();
        s.select_by_name("el-GR", "Uppercase", t0).unwrap();

        s.pause(t0 + Duration::from_secs(12));
        assert!(s.is_paused());
        assert!(!s.is_timer_pending(TimerKind::FailureTimeout));
        s.tick(t0 + Duration::from_secs(100));
        assert!(!s.is_character_failed());

        s.resume(t0 + Duration::from_secs(100));
        s.tick(t0 + Duration::from_millis(102_999));
        assert!(!s.is_character_failed());
        s.tick(t0 + Duration::from_secs(103));
        assert!(s.is_character_failed());
    }

    #[test]
    fn test_character_presented_while_paused_waits_for_resume() {
        let mut s = session();
        let t0 = Instant::now();
        s.select_by_name("el-GR", "Uppercase", t0).unwrap();
        s.on_response_input(ResponseInput::typed("a"), t0);
        s.pause(t0);

        // Dwell and settle keep running behind the menu.
        s.tick(t0 + Duration::from_secs(1));
        s.tick(t0 + Duration::from_millis(1500));
        assert_eq!(s.phase(), Phase::Presenting);
        assert!(!s.is_timer_pending(TimerKind::FailureTimeout));

        s.tick(t0 + Duration::from_secs(30));
        assert!(!s.is_character_failed());

        s.resume(t0 + Duration::from_secs(30));
        s.tick(t0 + Duration::from_secs(45));
        assert!(s.is_character_failed());
    }

    #[test]
    fn test_resume_after_timeout_does_not_rearm() {
        let mut s = session();
        let t0 = Instant::now();
        s.select_by_name("el-GR", "Uppercase", t0).unwrap();
        s.tick(t0 + Duration::from_secs(15));
        assert!(s.is_character_failed());

        s.pause(t0 + Duration::from_secs(16));
        s.resume(t0 + Duration::from_secs(20));
        assert!(!s.is_timer_pending(TimerKind::FailureTimeout));
    }

    #[test]
    fn test_close_cancels_timers() {
        let mut s = session();
        let t0 = Instant::now();
        s.select_by_name("el-GR", "Lowercase", t0).unwrap();
        s.close();
        assert_eq!(s.phase(), Phase::Idle);
        assert!(!s.is_timer_pending(TimerKind::FailureTimeout));
        s.tick(t0 + Duration::from_secs(20));
        assert!(!s.is_character_failed());
    }

    #[test]
    fn test_reselect_uses_weighted_order() {
        let mut s = session();
        let t0 = Instant::now();
        s.select_by_name("el-GR", "Uppercase", t0).unwrap();
        s.on_response_input(ResponseInput::deleted(""), t0);
        s.on_response_input(ResponseInput::typed("a"), t0);

        s.select_by_name("el-GR", "Uppercase", t0).unwrap();
        let ws_len = s.view().writing_system.unwrap().len();
        assert_eq!(s.character_order().len(), ws_len + 1);
    }
}
