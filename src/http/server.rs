use log::{debug, error, info};
use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    thread,
    time::{Duration, Instant},
};

use crate::{
    config::{HttpConfig, QuizConfig},
    domain::track::Track,
    http::{
        deck::{AudioDeck, DeckState},
        error::ApiError,
    },
    quiz::{
        error::QuizError,
        game::{GameEvent, GameSnapshot, QuizGame},
        matcher::AnswerMatcher,
        session::select_questions,
    },
};

const QUIZ_PAGE: &str = include_str!("../../html/quiz.html");
/// How often the ticker wakes up. Rounds keep their own time, so this only
/// bounds how late a timeout or the end of a reveal is noticed.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

pub type Game = QuizGame<AudioDeck>;

/// Monotonic time source for the game.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

pub struct HttpServer {
    game: Arc<Mutex<Game>>,
    deck: AudioDeck,
    pool: Arc<Vec<Track>>,
    quiz: QuizConfig,
    clock: Arc<dyn Clock>,
    pub config: HttpConfig,
}

#[derive(Debug, Default, Deserialize)]
struct StartRequest {
    count: Option<usize>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GuessRequest {
    answer: String,
}

#[derive(Debug, Deserialize)]
struct VolumeRequest {
    volume: f32,
}

#[derive(Debug, Deserialize)]
struct AudioErrorRequest {
    generation: u64,
    message: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateResponse {
    game: GameSnapshot,
    audio: DeckState,
}

/// Locks the game, recovering the state if a handler panicked while holding it.
fn lock_game(game: &Mutex<Game>) -> MutexGuard<'_, Game> {
    game.lock().unwrap_or_else(|poisoned| {
        error!("quiz state lock was poisoned, recovering");
        game.clear_poison();
        PoisonError::into_inner(poisoned)
    })
}

fn tick_game(game: &Mutex<Game>, now: Instant) -> Vec<GameEvent> {
    let events = lock_game(game).tick(now);
    for event in &events {
        info!("game event: {event:?}");
    }
    events
}

fn reply(result: Result<Response, ApiError>) -> Response {
    match result {
        Ok(r) => r,
        Err(e) => e.into_response(),
    }
}

impl HttpServer {
    pub fn new(pool: Vec<Track>, matcher: AnswerMatcher, quiz: QuizConfig, config: HttpConfig) -> Self {
        Self::with_clock(pool, matcher, quiz, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        pool: Vec<Track>,
        matcher: AnswerMatcher,
        quiz: QuizConfig,
        config: HttpConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let deck = AudioDeck::new();
        let game = QuizGame::new(quiz.round_settings(), matcher, deck.clone());
        Self {
            game: Arc::new(Mutex::new(game)),
            deck,
            pool: Arc::new(pool),
            quiz,
            clock,
            config,
        }
    }

    /// Starts the ticker thread and serves until the process exits.
    pub fn run(self) {
        self.spawn_ticker();
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    /// The only source of round timeouts. Stops once the server is dropped.
    fn spawn_ticker(&self) -> thread::JoinHandle<()> {
        let game: Weak<Mutex<Game>> = Arc::downgrade(&self.game);
        let clock = Arc::clone(&self.clock);
        thread::spawn(move || {
            while let Some(game) = game.upgrade() {
                tick_game(&game, clock.now());
                drop(game);
                thread::sleep(TICK_INTERVAL);
            }
            debug!("ticker stopped");
        })
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let response = rouille::router!(request,
            (GET) (/) => {
                Response::html(QUIZ_PAGE)
            },
            (GET) (/api/state) => {
                self.respond(|_, _| Ok(()))
            },
            (POST) (/api/session) => {
                reply(self.start(request))
            },
            (POST) (/api/play) => {
                self.respond(|game, now| game.play(now))
            },
            (POST) (/api/pause) => {
                self.respond(|game, now| game.toggle_pause(now).map(|_| ()))
            },
            (POST) (/api/guess) => {
                reply(self.guess(request))
            },
            (POST) (/api/skip) => {
                self.respond(|game, now| game.skip(now).map(|_| ()))
            },
            (POST) (/api/volume) => {
                reply(self.volume(request))
            },
            (POST) (/api/audio-error) => {
                reply(self.audio_error(request))
            },
            (POST) (/api/reset) => {
                self.respond(|game, _| {
                    game.reset();
                    Ok(())
                })
            },
            _ => Response::empty_404()
        );

        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    /// Applies `action` to the game and answers with the resulting state.
    fn apply<F>(&self, action: F) -> Result<Response, ApiError>
    where
        F: FnOnce(&mut Game, Instant) -> Result<(), QuizError>,
    {
        let mut game = lock_game(&self.game);
        let now = self.clock.now();
        action(&mut game, now)?;
        let state = StateResponse {
            game: game.snapshot(now),
            audio: self.deck.snapshot(),
        };
        Ok(Response::json(&state))
    }

    fn respond<F>(&self, action: F) -> Response
    where
        F: FnOnce(&mut Game, Instant) -> Result<(), QuizError>,
    {
        reply(self.apply(action))
    }

    fn start(&self, request: &Request) -> Result<Response, ApiError> {
        let body: StartRequest = rouille::input::json_input(request)?;
        let count = body.count.unwrap_or(self.quiz.question_count);
        if count == 0 {
            return Err(ApiError::BadRequest("count must be positive".into()));
        }
        let seed = body
            .seed
            .or(self.quiz.seed)
            .unwrap_or_else(rand::random::<u64>);
        info!("new game: {count} questions, seed {seed}");

        let questions = select_questions(&self.pool, count, seed);
        self.apply(|game, _| {
            game.start(questions);
            Ok(())
        })
    }

    fn guess(&self, request: &Request) -> Result<Response, ApiError> {
        let body: GuessRequest = rouille::input::json_input(request)?;
        debug!("guess: {:?}", body.answer);
        self.apply(|game, now| game.submit(&body.answer, now).map(|_| ()))
    }

    fn volume(&self, request: &Request) -> Result<Response, ApiError> {
        let body: VolumeRequest = rouille::input::json_input(request)?;
        self.apply(|game, _| game.set_volume(body.volume))
    }

    fn audio_error(&self, request: &Request) -> Result<Response, ApiError> {
        let body: AudioErrorRequest = rouille::input::json_input(request)?;
        self.deck.report_error(body.generation, &body.message);
        self.apply(|_, _| Ok(()))
    }
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}
