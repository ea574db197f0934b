//! Module to build the quiz question pool from a music catalog.
//!
//! Questions either come from a remote playlist (see [`client`]) or from a
//! previously exported JSON file.

use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use log::{debug, info};

use crate::{
    catalog::{
        error::CatalogError,
        model::{ArtistInfo, PlaylistPage, WireTrack},
    },
    domain::track::Track,
    quiz::normalize::normalize,
};

pub mod client;
pub mod error;
pub mod model;

const PAGE_LIMIT: u32 = 100;
/// most ids the artists endpoint accepts in one call
const ARTIST_BATCH: usize = 50;

/// The two catalog calls the question loader needs.
pub trait CatalogApi {
    /// Fetches one playlist page by absolute URL.
    fn playlist_page(&mut self, url: &str) -> Result<PlaylistPage, CatalogError>;

    fn artists(&mut self, ids: &[String]) -> Result<Vec<ArtistInfo>, CatalogError>;
}

#[derive(Debug, Clone)]
pub struct PlaylistQuery {
    pub api_url: String,
    pub playlist_id: String,
    /// keep only tracks whose primary artist has this genre
    pub required_genre: Option<String>,
}

impl PlaylistQuery {
    pub fn first_page_url(&self) -> String {
        format!(
            "{}/playlists/{}/tracks?limit={PAGE_LIMIT}",
            self.api_url.trim_end_matches('/'),
            self.playlist_id
        )
    }
}

/// A question needs audio and a title that leaves something to type once
/// normalized. Titles such as "(Intro) Persona" normalize to nothing and
/// could never be answered.
pub fn is_playable(track: &Track) -> bool {
    track.has_preview() && !normalize(&track.name).is_empty()
}

struct Candidate {
    track: Track,
    artist_id: Option<String>,
}

fn candidate(wire: WireTrack) -> Option<Candidate> {
    let id = wire.id?;
    let primary = wire.artists.into_iter().next();
    let (artist, artist_id) = match primary {
        Some(a) => (a.name, a.id),
        None => (String::new(), None),
    };
    Some(Candidate {
        track: Track::new(&id, &wire.name, &artist, wire.preview_url.as_deref()),
        artist_id,
    })
}

/// Walks every page of the playlist and returns playable questions.
///
/// Unplayable tracks, null entries and duplicates are dropped. With a
/// required genre, artist genres are looked up in batches.
pub fn load_playlist<C: CatalogApi>(
    api: &mut C,
    query: &PlaylistQuery,
) -> Result<Vec<Track>, CatalogError> {
    let mut candidates = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(query.first_page_url());
    let mut pages = 0;

    while let Some(url) = next {
        let page = api.playlist_page(&url)?;
        pages += 1;
        for item in page.items {
            let Some(c) = item.track.and_then(candidate) else {
                continue;
            };
            if seen.insert(c.track.id.clone()) {
                candidates.push(c);
            } else {
                debug!("duplicate track {} skipped", c.track.id);
            }
        }
        next = page.next;
    }
    info!("fetched {} tracks from {pages} playlist pages", candidates.len());

    let mut candidates: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| is_playable(&c.track))
        .collect();

    if let Some(genre) = &query.required_genre {
        let genres = artist_genres(api, &candidates)?;
        candidates.retain(|c| {
            c.artist_id
                .as_ref()
                .and_then(|id| genres.get(id))
                .is_some_and(|g| g.iter().any(|g| g.eq_ignore_ascii_case(genre)))
        });
        debug!("{} tracks left after genre filter '{genre}'", candidates.len());
    }

    info!("{} playable questions", candidates.len());
    Ok(candidates.into_iter().map(|c| c.track).collect())
}

fn artist_genres<C: CatalogApi>(
    api: &mut C,
    candidates: &[Candidate],
) -> Result<HashMap<String, Vec<String>>, CatalogError> {
    let mut ids: Vec<String> = Vec::new();
    for id in candidates.iter().filter_map(|c| c.artist_id.as_ref()) {
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }

    let mut genres = HashMap::new();
    for batch in ids.chunks(ARTIST_BATCH) {
        for artist in api.artists(batch)? {
            genres.insert(artist.id, artist.genres);
        }
    }
    Ok(genres)
}

pub fn load_questions_file(path: &Path) -> Result<Vec<Track>, CatalogError> {
    let contents = std::fs::read_to_string(path)?;
    let tracks: Vec<Track> = serde_json::from_str(&contents)?;
    let total = tracks.len();
    let playable: Vec<Track> = tracks
        .into_iter()
        .filter(is_playable)
        .collect();
    if playable.len() < total {
        info!("skipped {} unplayable questions", total - playable.len());
    }
    Ok(playable)
}

pub fn export_questions_file(path: &Path, tracks: &[Track]) -> Result<(), CatalogError> {
    let json = serde_json::to_string_pretty(tracks)?;
    std::fs::write(path, json)?;
    Ok(())
}
