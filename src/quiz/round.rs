//! One question cycle: play the preview, count down, take a guess or time
//! out, then hold the revealed answer for a moment.
//!
//! ```text
//! NotStarted -> Playing <-> Paused
//!                  |          |
//!        (submit | timeout | skip)
//!                  v
//!              Revealed -> Done
//! ```
//!
//! The countdown and the audio handle belong to exactly one round. Both are
//! released by [`Round::teardown`], which is idempotent and also runs on drop,
//! so abandoning a round can never leave audio playing or a timer ticking.

use std::{
    fmt::Display,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    domain::track::Track,
    quiz::{
        error::{PlaybackError, QuizError},
        matcher::AnswerMatcher,
    },
};

pub const DEFAULT_ROUND_SECS: u32 = 10;
pub const DEFAULT_REVEAL_SECS: u32 = 2;
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Audio output for a single round.
pub trait Playback {
    /// Starts or resumes the preview.
    fn play(&mut self, url: Option<&str>, volume: f32) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn set_volume(&mut self, volume: f32);
    /// Stops playback for good. Called at most once per handle.
    fn release(&mut self);
}

/// Hands out a fresh [`Playback`] for every round.
pub trait PlaybackFactory {
    type Output: Playback;

    fn open(&mut self, track: &Track) -> Self::Output;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundSettings {
    pub round_secs: u32,
    pub reveal_secs: u32,
    pub volume: f32,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            round_secs: DEFAULT_ROUND_SECS,
            reveal_secs: DEFAULT_REVEAL_SECS,
            volume: DEFAULT_VOLUME,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    NotStarted,
    Playing,
    Paused,
    Revealed,
    Done,
}

impl Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RoundPhase::NotStarted => "not started",
            RoundPhase::Playing => "playing",
            RoundPhase::Paused => "paused",
            RoundPhase::Revealed => "revealed",
            RoundPhase::Done => "done",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect,
}

impl Verdict {
    pub fn from_correct(correct: bool) -> Self {
        if correct {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        }
    }

    pub fn is_correct(self) -> bool {
        self == Verdict::Correct
    }
}

/// How the guessing part of a round ended. Skipping counts as a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundEnding {
    Submitted,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundOutcome {
    pub ending: RoundEnding,
    pub verdict: Verdict,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    /// countdown ran out, the answer is now revealed
    TimedOut(RoundOutcome),
    /// reveal interval is over, the round can be torn down
    Complete(RoundOutcome),
}

/// Time left on the round clock.
///
/// The clock only runs between `resume` and `pause`. Elapsed time is
/// measured from the instants passed in, so fractions of a second played
/// before a pause are kept.
#[derive(Debug)]
struct Countdown {
    left: Duration,
    /// set while running
    resumed_at: Option<Instant>,
}

impl Countdown {
    fn new(secs: u32) -> Self {
        Self {
            left: Duration::from_secs(u64::from(secs)),
            resumed_at: None,
        }
    }

    fn is_running(&self) -> bool {
        self.resumed_at.is_some()
    }

    fn resume(&mut self, now: Instant) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(now);
        }
    }

    fn pause(&mut self, now: Instant) {
        self.left = self.left_at(now);
        self.resumed_at = None;
    }

    fn left_at(&self, now: Instant) -> Duration {
        match self.resumed_at {
            Some(since) => self.left.saturating_sub(now.saturating_duration_since(since)),
            None => self.left,
        }
    }

    fn expired(&self, now: Instant) -> bool {
        self.is_running() && self.left_at(now).is_zero()
    }

    /// Whole seconds left, rounded up.
    fn secs_at(&self, now: Instant) -> u32 {
        let left = self.left_at(now);
        let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
        u32::try_from(secs).unwrap_or(u32::MAX)
    }
}

pub struct Round<P: Playback> {
    track: Track,
    settings: RoundSettings,
    phase: RoundPhase,
    countdown: Countdown,
    reveal_until: Option<Instant>,
    volume: f32,
    input: String,
    outcome: Option<RoundOutcome>,
    audio: Option<P>,
}

impl<P: Playback> Round<P> {
    pub fn new(track: Track, settings: RoundSettings, audio: P) -> Self {
        Self {
            countdown: Countdown::new(settings.round_secs),
            reveal_until: None,
            volume: settings.volume,
            track,
            settings,
            phase: RoundPhase::NotStarted,
            input: String::new(),
            outcome: None,
            audio: Some(audio),
        }
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Seconds left at `now`, rounded up.
    pub fn remaining(&self, now: Instant) -> u32 {
        self.countdown.secs_at(now)
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn outcome(&self) -> Option<&RoundOutcome> {
        self.outcome.as_ref()
    }

    /// Whether the countdown and audio are still held by this round.
    pub fn holds_resources(&self) -> bool {
        self.countdown.is_running() || self.audio.is_some()
    }

    pub fn start(&mut self, now: Instant) -> Result<(), QuizError> {
        self.expect_phase("start", &[RoundPhase::NotStarted])?;
        info!("round started: track {}", self.track.id);
        self.phase = RoundPhase::Playing;
        self.countdown.resume(now);
        self.play_audio();
        Ok(())
    }

    /// Playing <-> Paused. Returns the new phase.
    pub fn toggle_pause(&mut self, now: Instant) -> Result<RoundPhase, QuizError> {
        match self.phase {
            RoundPhase::Playing => {
                self.countdown.pause(now);
                if let Some(audio) = self.audio.as_mut() {
                    audio.pause();
                }
                self.phase = RoundPhase::Paused;
                debug!("round paused with {:?} left", self.countdown.left);
            }
            RoundPhase::Paused => {
                self.phase = RoundPhase::Playing;
                self.countdown.resume(now);
                self.play_audio();
                debug!("round resumed with {:?} left", self.countdown.left);
            }
            phase => {
                return Err(QuizError::InvalidTransition {
                    action: "pause",
                    phase,
                });
            }
        }
        Ok(self.phase)
    }

    pub fn submit(
        &mut self,
        matcher: &AnswerMatcher,
        guess: &str,
        now: Instant,
    ) -> Result<RoundOutcome, QuizError> {
        self.expect_phase("submit", &[RoundPhase::Playing, RoundPhase::Paused])?;
        self.input = guess.to_string();
        let verdict = Verdict::from_correct(matcher.is_correct(guess, &self.track.name));
        Ok(self.finish(RoundEnding::Submitted, verdict, now))
    }

    /// Gives up on the question, scored like a timeout.
    pub fn skip(&mut self, now: Instant) -> Result<RoundOutcome, QuizError> {
        self.expect_phase(
            "skip",
            &[RoundPhase::NotStarted, RoundPhase::Playing, RoundPhase::Paused],
        )?;
        Ok(self.finish(RoundEnding::TimedOut, Verdict::Incorrect, now))
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<(), QuizError> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(QuizError::InvalidVolume(volume));
        }
        self.volume = volume;
        if let Some(audio) = self.audio.as_mut() {
            audio.set_volume(volume);
        }
        Ok(())
    }

    /// Heartbeat. Fires the timeout once the round has been playing for its
    /// whole budget, and completes the round once the reveal interval is over.
    /// Calling it more often only makes both land closer to their deadline.
    pub fn tick(&mut self, now: Instant) -> Option<RoundEvent> {
        match self.phase {
            RoundPhase::Playing => {
                if !self.countdown.expired(now) {
                    return None;
                }
                let outcome = self.finish(RoundEnding::TimedOut, Verdict::Incorrect, now);
                Some(RoundEvent::TimedOut(outcome))
            }
            RoundPhase::Revealed => {
                if self.reveal_until.is_some_and(|until| now < until) {
                    return None;
                }
                self.phase = RoundPhase::Done;
                self.outcome.clone().map(RoundEvent::Complete)
            }
            RoundPhase::NotStarted | RoundPhase::Paused | RoundPhase::Done => None,
        }
    }

    /// Stops the countdown and releases the audio handle. Safe to call
    /// any number of times.
    pub fn teardown(&mut self) {
        self.countdown.resumed_at = None;
        if let Some(mut audio) = self.audio.take() {
            audio.release();
            debug!("audio released for track {}", self.track.id);
        }
    }

    fn finish(&mut self, ending: RoundEnding, verdict: Verdict, now: Instant) -> RoundOutcome {
        self.countdown.pause(now);
        self.teardown();
        let outcome = RoundOutcome {
            ending,
            verdict,
            correct_answer: self.track.name.clone(),
        };
        info!(
            "round over ({:?}): {:?}, answer was {:?}",
            ending, verdict, self.track.name
        );
        self.phase = RoundPhase::Revealed;
        self.reveal_until = Some(now + Duration::from_secs(u64::from(self.settings.reveal_secs)));
        self.outcome = Some(outcome.clone());
        outcome
    }

    fn play_audio(&mut self) {
        let url = self.track.preview_url.as_deref();
        if let Some(audio) = self.audio.as_mut() {
            if let Err(e) = audio.play(url, self.volume) {
                warn!("audio play failed for track {}: {e}", self.track.id);
            }
        }
    }

    fn expect_phase(&self, action: &'static str, allowed: &[RoundPhase]) -> Result<(), QuizError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(QuizError::InvalidTransition {
                action,
                phase: self.phase,
            })
        }
    }
}

impl<P: Playback> Drop for Round<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Play(Option<String>, f32),
        Pause,
        Volume(f32),
        Release,
    }

    /// Records every call; optionally rejects `play`.
    #[derive(Debug, Clone, Default)]
    pub struct FakePlayback {
        pub calls: Rc<RefCell<Vec<Call>>>,
        pub reject_play: bool,
    }

    impl FakePlayback {
        pub fn count(&self, call: &Call) -> usize {
            self.calls.borrow().iter().filter(|c| *c == call).count()
        }

        pub fn releases(&self) -> usize {
            self.count(&Call::Release)
        }
    }

    impl Playback for FakePlayback {
        fn play(&mut self, url: Option<&str>, volume: f32) -> Result<(), PlaybackError> {
            self.calls
                .borrow_mut()
                .push(Call::Play(url.map(str::to_string), volume));
            if self.reject_play {
                Err(PlaybackError::Rejected("autoplay blocked".into()))
            } else {
                Ok(())
            }
        }

        fn pause(&mut self) {
            self.calls.borrow_mut().push(Call::Pause);
        }

        fn set_volume(&mut self, volume: f32) {
            self.calls.borrow_mut().push(Call::Volume(volume));
        }

        fn release(&mut self) {
            self.calls.borrow_mut().push(Call::Release);
        }
    }

    /// Every handle shares one call log.
    #[derive(Debug, Clone, Default)]
    pub struct FakeFactory {
        pub playback: FakePlayback,
        pub opened: Rc<RefCell<Vec<String>>>,
    }

    impl PlaybackFactory for FakeFactory {
        type Output = FakePlayback;

        fn open(&mut self, track: &Track) -> FakePlayback {
            self.opened.borrow_mut().push(track.id.to_string());
            self.playback.clone()
        }
    }
}
