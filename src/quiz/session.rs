//! Score keeping across the rounds of one game.

use log::info;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    domain::track::Track,
    quiz::{error::QuizError, round::Verdict},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub score: u32,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// index of the next question
    Next(usize),
    Finished(Summary),
}

/// Shuffles the pool with a seeded RNG and keeps the first `count` tracks.
///
/// The same pool and seed always give the same order.
pub fn select_questions(pool: &[Track], count: usize, seed: u64) -> Vec<Track> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut questions = pool.to_vec();
    questions.shuffle(&mut rng);
    questions.truncate(count);
    questions
}

#[derive(Debug)]
pub struct Session {
    questions: Vec<Track>,
    current_index: usize,
    score: u32,
    finished: bool,
}

impl Session {
    pub fn new(questions: Vec<Track>) -> Self {
        let finished = questions.is_empty();
        Self {
            questions,
            current_index: 0,
            score: 0,
            finished,
        }
    }

    pub fn current(&self) -> Option<&Track> {
        if self.finished {
            return None;
        }
        self.questions.get(self.current_index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn summary(&self) -> Summary {
        Summary {
            score: self.score,
            total: self.total(),
        }
    }

    /// Records the verdict of the current round and moves on.
    pub fn record(&mut self, verdict: Verdict) -> Result<Progress, QuizError> {
        if self.finished {
            return Err(QuizError::SessionFinished);
        }
        if verdict.is_correct() {
            self.score += 1;
        }

        let next = self.current_index + 1;
        if next < self.questions.len() {
            self.current_index = next;
            Ok(Progress::Next(next))
        } else {
            self.finished = true;
            let summary = self.summary();
            info!("session finished: {}/{}", summary.score, summary.total);
            Ok(Progress::Finished(summary))
        }
    }
}
