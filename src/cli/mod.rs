use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;

use crate::catalog::{self, client::SpotifyClient};
use crate::config::{self, Config};
use crate::domain::track::Track;
use crate::http::server::HttpServer;
use crate::quiz::matcher::AnswerMatcher;

#[derive(Parser)]
#[command(name = "songquiz")]
#[command(version = "0.1")]
#[command(about = "Guess the song from a short preview")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the quiz web server
    Serve,
    /// List playable questions from the catalog
    Tracks {
        /// Write the questions as JSON for offline play
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Check a guess against an answer
    Check { guess: String, answer: String },
}

/// Entrypoint for CLI
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = execute(cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> anyhow::Result<()> {
    let cfg = Config::load(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            let pool = load_questions(&cfg.catalog)?;
            let matcher = AnswerMatcher::new(cfg.quiz.alias_table()?);
            info!(
                "{} questions, {} aliases loaded",
                pool.len(),
                matcher.aliases().len()
            );

            let http_server = HttpServer::new(pool, matcher, cfg.quiz, cfg.http);
            println!(
                "Quiz running at http://{}:{}",
                http_server.config.bind_addr, http_server.config.port
            );
            http_server.run();
        }

        Commands::Tracks { export } => {
            let tracks = load_questions(&cfg.catalog)?;
            for track in &tracks {
                println!("{}  {} - {}", track.id, track.artist, track.name);
            }
            println!("{} playable questions", tracks.len());

            if let Some(path) = export {
                catalog::export_questions_file(&path, &tracks)
                    .with_context(|| format!("Failed to export to {}", path.display()))?;
                println!("Exported to {}", path.display());
            }
        }

        Commands::Check { guess, answer } => {
            let matcher = AnswerMatcher::new(cfg.quiz.alias_table()?);
            let report = matcher.evaluate(&guess, &answer);
            println!("guess:  {:?}", report.input_key);
            println!("answer: {:?}", report.answer_key);
            println!("{}", if report.correct { "correct" } else { "incorrect" });
        }
    }

    Ok(())
}

/// Exported questions take precedence over the remote catalog.
fn load_questions(cfg: &config::CatalogConfig) -> anyhow::Result<Vec<Track>> {
    if let Some(path) = &cfg.questions_file {
        return catalog::load_questions_file(path)
            .with_context(|| format!("Failed to load questions from {}", path.display()));
    }

    let mut client = SpotifyClient::new(cfg.credentials()?, cfg.accounts_url(), cfg.api_url());
    let tracks = catalog::load_playlist(&mut client, &cfg.playlist_query()?)
        .with_context(|| "Failed to load playlist")?;
    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let cli = Cli::parse_from(["songquiz", "check", "사인", "Sign"]);

        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert_eq!(
            cli.command,
            Commands::Check {
                guess: "사인".to_string(),
                answer: "Sign".to_string()
            }
        );
    }

    #[test]
    fn test_parse_tracks_export() {
        let cli = Cli::parse_from(["songquiz", "-c", "quiz.toml", "tracks", "--export", "q.json"]);

        assert_eq!(cli.config, PathBuf::from("quiz.toml"));
        assert_eq!(
            cli.command,
            Commands::Tracks {
                export: Some(PathBuf::from("q.json"))
            }
        );
    }

    #[test]
    fn test_questions_file_skips_remote() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("questions.json");
        catalog::export_questions_file(
            &path,
            &[Track::new("1", "Sign", "Artist", Some("https://p/1"))],
        )?;
        let cfg = config::CatalogConfig {
            questions_file: Some(path),
            ..Default::default()
        };

        let tracks = load_questions(&cfg)?;

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].name, "Sign");

        Ok(())
    }
}
