//! Browser-side audio as a [`Playback`] resource.
//!
//! The page polls the deck state and mirrors it onto its `<audio>` element.
//! Every round opens a handle with a new generation; a handle only affects
//! the deck while its generation is current, so a released or stale handle
//! can never touch the audio of a later round.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    domain::track::Track,
    quiz::{
        error::PlaybackError,
        round::{Playback, PlaybackFactory},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioStatus {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckState {
    pub generation: u64,
    pub url: Option<String>,
    pub status: AudioStatus,
    pub volume: f32,
    pub last_error: Option<String>,
}

impl Default for DeckState {
    fn default() -> Self {
        Self {
            generation: 0,
            url: None,
            status: AudioStatus::Stopped,
            volume: 0.0,
            last_error: None,
        }
    }
}

fn lock(state: &Mutex<DeckState>) -> MutexGuard<'_, DeckState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Default)]
pub struct AudioDeck {
    state: Arc<Mutex<DeckState>>,
}

impl AudioDeck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DeckState {
        lock(&self.state).clone()
    }

    /// The page could not play the preview. Logged only; the round goes on.
    pub fn report_error(&self, generation: u64, message: &str) -> bool {
        let mut state = lock(&self.state);
        if state.generation != generation {
            debug!("ignoring audio error for stale generation {generation}");
            return false;
        }
        warn!("audio playback failed in browser: {message}");
        state.last_error = Some(message.to_string());
        true
    }
}

impl PlaybackFactory for AudioDeck {
    type Output = DeckPlayback;

    fn open(&mut self, track: &Track) -> DeckPlayback {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.url = track.preview_url.clone();
        state.status = AudioStatus::Stopped;
        state.last_error = None;
        DeckPlayback {
            generation: state.generation,
            state: Arc::clone(&self.state),
        }
    }
}

pub struct DeckPlayback {
    generation: u64,
    state: Arc<Mutex<DeckState>>,
}

impl DeckPlayback {
    fn update<F: FnOnce(&mut DeckState)>(&self, f: F) {
        let mut state = lock(&self.state);
        if state.generation == self.generation {
            f(&mut state);
        }
    }
}

impl Playback for DeckPlayback {
    fn play(&mut self, url: Option<&str>, volume: f32) -> Result<(), PlaybackError> {
        if url.is_none_or(str::is_empty) {
            return Err(PlaybackError::NoPreview);
        }
        self.update(|s| {
            s.status = AudioStatus::Playing;
            s.volume = volume;
        });
        Ok(())
    }

    fn pause(&mut self) {
        self.update(|s| s.status = AudioStatus::Paused);
    }

    fn set_volume(&mut self, volume: f32) {
        self.update(|s| s.volume = volume);
    }

    fn release(&mut self) {
        self.update(|s| s.status = AudioStatus::Stopped);
    }
}
