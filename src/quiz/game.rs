//! Ties the session tracker to the round engine.
//!
//! At most one [`Round`] exists at a time. The previous round is torn down
//! before the next one is created, and discarding a game tears down its round.

use std::time::Instant;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    domain::track::Track,
    quiz::{
        error::QuizError,
        matcher::AnswerMatcher,
        round::{
            PlaybackFactory, Round, RoundEvent, RoundOutcome, RoundPhase, RoundSettings, Verdict,
        },
        session::{Progress, Session, Summary},
    },
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    Verdict { correct: bool, correct_answer: String },
    Advanced { index: usize },
    Finished(Summary),
}

impl From<&RoundOutcome> for GameEvent {
    fn from(outcome: &RoundOutcome) -> Self {
        GameEvent::Verdict {
            correct: outcome.verdict.is_correct(),
            correct_answer: outcome.correct_answer.clone(),
        }
    }
}

/// What the UI needs to render. The answer is only present once revealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub in_session: bool,
    pub finished: bool,
    pub index: usize,
    pub total: usize,
    pub score: u32,
    pub round_secs: u32,
    pub volume: f32,
    pub phase: Option<RoundPhase>,
    pub remaining: Option<u32>,
    pub artist: Option<String>,
    pub guess: Option<String>,
    pub verdict: Option<Verdict>,
    pub correct_answer: Option<String>,
    pub summary: Option<Summary>,
}

pub struct QuizGame<F: PlaybackFactory> {
    settings: RoundSettings,
    matcher: AnswerMatcher,
    factory: F,
    volume: f32,
    session: Option<Session>,
    round: Option<Round<F::Output>>,
}

impl<F: PlaybackFactory> QuizGame<F> {
    pub fn new(settings: RoundSettings, matcher: AnswerMatcher, factory: F) -> Self {
        Self {
            volume: settings.volume,
            settings,
            matcher,
            factory,
            session: None,
            round: None,
        }
    }

    /// Starts a new game, discarding the current one.
    pub fn start(&mut self, questions: Vec<Track>) {
        self.reset();
        info!("starting session with {} questions", questions.len());
        self.session = Some(Session::new(questions));
        self.open_round();
    }

    /// Drops all session state, releasing the active round.
    pub fn reset(&mut self) {
        self.close_round();
        self.session = None;
    }

    pub fn play(&mut self, now: Instant) -> Result<(), QuizError> {
        self.round_mut()?.start(now)
    }

    pub fn toggle_pause(&mut self, now: Instant) -> Result<RoundPhase, QuizError> {
        self.round_mut()?.toggle_pause(now)
    }

    pub fn submit(&mut self, guess: &str, now: Instant) -> Result<GameEvent, QuizError> {
        if self.session.as_ref().is_some_and(Session::is_finished) {
            return Err(QuizError::SessionFinished);
        }
        let round = self.round.as_mut().ok_or(QuizError::NoSession)?;
        let outcome = round.submit(&self.matcher, guess, now)?;
        Ok(GameEvent::from(&outcome))
    }

    pub fn skip(&mut self, now: Instant) -> Result<GameEvent, QuizError> {
        let outcome = self.round_mut()?.skip(now)?;
        Ok(GameEvent::from(&outcome))
    }

    /// Applies to the current round and every round after it.
    pub fn set_volume(&mut self, volume: f32) -> Result<(), QuizError> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(QuizError::InvalidVolume(volume));
        }
        self.volume = volume;
        if let Some(round) = self.round.as_mut() {
            round.set_volume(volume)?;
        }
        Ok(())
    }

    /// Heartbeat for the active round. Safe to call at any rate.
    pub fn tick(&mut self, now: Instant) -> Vec<GameEvent> {
        let Some(round) = self.round.as_mut() else {
            return vec![];
        };

        match round.tick(now) {
            None => vec![],
            Some(RoundEvent::TimedOut(outcome)) => vec![GameEvent::from(&outcome)],
            Some(RoundEvent::Complete(outcome)) => self.complete_round(outcome.verdict),
        }
    }

    pub fn snapshot(&self, now: Instant) -> GameSnapshot {
        let session = self.session.as_ref();
        let round = self.round.as_ref();
        let outcome = round.and_then(|r| r.outcome());
        let finished = session.map(Session::is_finished).unwrap_or(false);

        GameSnapshot {
            in_session: session.is_some(),
            finished,
            index: session.map(Session::current_index).unwrap_or(0),
            total: session.map(Session::total).unwrap_or(0),
            score: session.map(Session::score).unwrap_or(0),
            round_secs: self.settings.round_secs,
            volume: self.volume,
            phase: round.map(Round::phase),
            remaining: round.map(|r| r.remaining(now)),
            artist: round.map(|r| r.track().artist.clone()),
            guess: round
                .filter(|r| r.outcome().is_some())
                .map(|r| r.input().to_string())
                .filter(|s| !s.is_empty()),
            verdict: outcome.map(|o| o.verdict),
            correct_answer: outcome.map(|o| o.correct_answer.clone()),
            summary: session.filter(|s| s.is_finished()).map(Session::summary),
        }
    }

    fn complete_round(&mut self, verdict: Verdict) -> Vec<GameEvent> {
        self.close_round();
        let Some(session) = self.session.as_mut() else {
            return vec![];
        };

        match session.record(verdict) {
            Ok(Progress::Next(index)) => {
                self.open_round();
                vec![GameEvent::Advanced { index }]
            }
            Ok(Progress::Finished(summary)) => vec![GameEvent::Finished(summary)],
            Err(e) => {
                debug!("ignoring round completion: {e}");
                vec![]
            }
        }
    }

    fn open_round(&mut self) {
        self.close_round();
        let Some(track) = self.session.as_ref().and_then(Session::current).cloned() else {
            return;
        };
        let audio = self.factory.open(&track);
        let settings = RoundSettings {
            volume: self.volume,
            ..self.settings
        };
        debug!("opening round for track {}", track.id);
        self.round = Some(Round::new(track, settings, audio));
    }

    fn close_round(&mut self) {
        if let Some(mut round) = self.round.take() {
            round.teardown();
        }
    }

    fn round_mut(&mut self) -> Result<&mut Round<F::Output>, QuizError> {
        match (&self.session, self.round.as_mut()) {
            (None, _) => Err(QuizError::NoSession),
            (Some(s), _) if s.is_finished() => Err(QuizError::SessionFinished),
            (Some(_), Some(round)) => Ok(round),
            (Some(_), None) => Err(QuizError::NoSession),
        }
    }
}

impl<F: PlaybackFactory> Drop for QuizGame<F> {
    fn drop(&mut self) {
        self.close_round();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::quiz::{
        aliases::AliasTable,
        round::testing::{Call, FakeFactory},
    };

    fn questions() -> Vec<Track> {
        vec![
            Track::new("a", "Sign", "Seori", Some("https://p/a.mp3")),
            Track::new("b", "Butter", "BTS", Some("https://p/b.mp3")),
            Track::new("c", "Spring Day", "BTS", Some("https://p/c.mp3")),
        ]
    }

    fn game() -> (QuizGame<FakeFactory>, FakeFactory) {
        let factory = FakeFactory::default();
        let matcher = AnswerMatcher::new(AliasTable::from_pairs([("sign", "사인")]));
        let settings = RoundSettings {
            round_secs: 10,
            reveal_secs: 2,
            volume: 0.5,
        };
        (QuizGame::new(settings, matcher, factory.clone()), factory)
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    /// Ticks once per second through the reveal interval.
    fn run_reveal(game: &mut QuizGame<FakeFactory>, from: Instant) -> Vec<GameEvent> {
        let mut events = game.tick(from + secs(1));
        events.extend(game.tick(from + secs(2)));
        events
    }

    #[test]
    fn test_full_session_scores_two_of_three() -> anyhow::Result<()> {
        let (mut game, factory) = game();
        let t0 = Instant::now();
        game.start(questions());

        game.play(t0)?;
        let verdict = game.submit("사인", t0 + secs(3))?;
        assert_eq!(
            verdict,
            GameEvent::Verdict {
                correct: true,
                correct_answer: "Sign".into()
            }
        );
        assert_eq!(
            run_reveal(&mut game, t0 + secs(3)),
            vec![GameEvent::Advanced { index: 1 }]
        );

        let t1 = t0 + secs(10);
        game.play(t1)?;
        game.submit("Dynamite", t1)?;
        assert_eq!(
            run_reveal(&mut game, t1),
            vec![GameEvent::Advanced { index: 2 }]
        );
        assert!(!game.snapshot(t1).finished);

        let t2 = t0 + secs(20);
        game.play(t2)?;
        game.submit("spring day", t2)?;
        assert_eq!(
            run_reveal(&mut game, t2),
            vec![GameEvent::Finished(Summary { score: 2, total: 3 })]
        );

        let snapshot = game.snapshot(t2 + secs(5));
        assert!(snapshot.finished);
        assert_eq!(snapshot.summary, Some(Summary { score: 2, total: 3 }));
        assert_eq!(snapshot.phase, None);

        assert_eq!(*factory.opened.borrow(), vec!["a", "b", "c"]);
        assert_eq!(factory.playback.releases(), 3);

        Ok(())
    }

    #[test]
    fn test_timeout_advances_with_incorrect_verdict() -> anyhow::Result<()> {
        let (mut game, factory) = game();
        let t0 = Instant::now();
        game.start(questions());
        game.play(t0)?;

        let mut events = vec![];
        for s in 1..=12 {
            events.extend(game.tick(t0 + secs(s)));
        }

        assert_eq!(
            events,
            vec![
                GameEvent::Verdict {
                    correct: false,
                    correct_answer: "Sign".into()
                },
                GameEvent::Advanced { index: 1 },
            ]
        );
        assert_eq!(game.snapshot(t0 + secs(12)).score, 0);
        assert_eq!(factory.playback.releases(), 1);

        Ok(())
    }

    #[test]
    fn test_remaining_follows_the_clock() -> anyhow::Result<()> {
        let (mut game, _factory) = game();
        let t0 = Instant::now();
        game.start(questions());

        assert_eq!(game.snapshot(t0 + secs(30)).remaining, Some(10));
        game.play(t0)?;
        assert_eq!(
            game.snapshot(t0 + Duration::from_millis(150)).remaining,
            Some(10)
        );
        assert_eq!(game.snapshot(t0 + secs(4)).remaining, Some(6));

        Ok(())
    }

    #[test]
    fn test_answer_hidden_until_revealed() -> anyhow::Result<()> {
        let (mut game, _factory) = game();
        let t0 = Instant::now();
        game.start(questions());
        game.play(t0)?;

        let before = game.snapshot(t0);
        assert_eq!(before.correct_answer, None);
        assert_eq!(before.phase, Some(RoundPhase::Playing));
        assert_eq!(before.artist.as_deref(), Some("Seori"));

        game.skip(t0)?;
        let after = game.snapshot(t0);
        assert_eq!(after.correct_answer.as_deref(), Some("Sign"));
        assert_eq!(after.verdict, Some(Verdict::Incorrect));

        Ok(())
    }

    #[test]
    fn test_restart_tears_down_previous_round() -> anyhow::Result<()> {
        let (mut game, factory) = game();
        let t0 = Instant::now();
        game.start(questions());
        game.play(t0)?;

        game.start(questions());

        assert_eq!(factory.playback.releases(), 1);
        assert_eq!(game.snapshot(t0).phase, Some(RoundPhase::NotStarted));
        assert_eq!(game.snapshot(t0).index, 0);

        Ok(())
    }

    #[test]
    fn test_reset_and_drop_release_once() -> anyhow::Result<()> {
        let (mut game, factory) = game();
        game.start(questions());
        game.play(Instant::now())?;

        game.reset();
        drop(game);

        assert_eq!(factory.playback.releases(), 1);

        Ok(())
    }

    #[test]
    fn test_actions_without_session_fail() {
        let (mut game, _factory) = game();
        let now = Instant::now();

        assert!(matches!(game.play(now), Err(QuizError::NoSession)));
        assert!(matches!(game.submit("x", now), Err(QuizError::NoSession)));
        assert!(matches!(game.skip(now), Err(QuizError::NoSession)));
        assert!(game.tick(now).is_empty());
    }

    #[test]
    fn test_empty_question_list_finishes_immediately() {
        let (mut game, _factory) = game();
        let now = Instant::now();
        game.start(vec![]);

        let snapshot = game.snapshot(now);
        assert!(snapshot.finished);
        assert_eq!(snapshot.summary, Some(Summary { score: 0, total: 0 }));
        assert!(matches!(game.play(now), Err(QuizError::SessionFinished)));
    }

    #[test]
    fn test_volume_carries_over_to_next_round() -> anyhow::Result<()> {
        let (mut game, factory) = game();
        let t0 = Instant::now();
        game.start(questions());
        game.set_volume(0.2)?;
        game.skip(t0)?;
        run_reveal(&mut game, t0);

        game.play(t0 + secs(3))?;

        assert_eq!(
            factory
                .playback
                .count(&Call::Play(Some("https://p/b.mp3".into()), 0.2)),
            1
        );
        assert!(game.set_volume(-0.1).is_err());

        Ok(())
    }
}
