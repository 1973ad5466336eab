use std::{
    collections::{BTreeSet, HashSet},
    ops::Index,
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{PlayerError, Result};

/// Immutable catalog record describing one playable audio item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Length in seconds.
    pub duration: f64,
    pub cover_url: String,
    pub audio_url: String,
    pub category: String,
    #[serde(default)]
    pub mood: BTreeSet<String>,
}

/// Ordered, immutable-after-load sequence of tracks. Order defines
/// next/previous traversal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    /// Builds a playlist, rejecting duplicate ids and non-positive durations.
    pub fn new(tracks: Vec<Track>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(tracks.len());
        for track in &tracks {
            if !seen.insert(track.id.as_str()) {
                return Err(PlayerError::InvalidInput("playlist contains duplicate track ids"));
            }
            if !(track.duration.is_finite() && track.duration > 0.0) {
                return Err(PlayerError::InvalidInput(
                    "track duration must be a positive number of seconds",
                ));
            }
        }
        Ok(Self { tracks })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Position of the track with the given id.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|track| track.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }
}

impl Index<usize> for Playlist {
    type Output = Track;

    fn index(&self, index: usize) -> &Track {
        &self.tracks[index]
    }
}

impl<'a> IntoIterator for &'a Playlist {
    type Item = &'a Track;
    type IntoIter = std::slice::Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}

/// Read-only source of the playlist, consulted once at startup.
pub trait TrackCatalog {
    fn playlist(&self) -> Result<Playlist>;
}

/// Catalog backed by an in-memory list of tracks.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    tracks: Vec<Track>,
}

impl StaticCatalog {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    /// Parses a JSON array of tracks using the client's camelCase keys.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let tracks: Vec<Track> = serde_json::from_str(json)?;
        Ok(Self::new(tracks))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

impl TrackCatalog for StaticCatalog {
    fn playlist(&self) -> Result<Playlist> {
        Playlist::new(self.tracks.clone())
    }
}

/// Per-user saved-track list. Used by the presentation layer only; the
/// playback controller never touches it.
pub trait ProfileStore {
    fn is_track_saved(&self, id: &str) -> bool;
    fn save_track(&mut self, id: &str);
    fn remove_track(&mut self, id: &str);

    /// Saves or removes the track and returns whether it is saved afterwards.
    fn toggle_track(&mut self, id: &str) -> bool {
        if self.is_track_saved(id) {
            self.remove_track(id);
            false
        } else {
            self.save_track(id);
            true
        }
    }
}

/// Profile store that keeps saved ids in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfile {
    saved_tracks: Vec<String>,
}

impl InMemoryProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved_tracks(&self) -> &[String] {
        &self.saved_tracks
    }
}

impl ProfileStore for InMemoryProfile {
    fn is_track_saved(&self, id: &str) -> bool {
        self.saved_tracks.iter().any(|saved| saved == id)
    }

    fn save_track(&mut self, id: &str) {
        if !self.is_track_saved(id) {
            self.saved_tracks.push(id.to_string());
        }
    }

    fn remove_track(&mut self, id: &str) {
        self.saved_tracks.retain(|saved| saved != id);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn track(id: &str, duration: f64) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Track {id}"),
            artist: "Test Artist".to_string(),
            duration,
            cover_url: format!("https://covers.test/{id}.jpg"),
            audio_url: format!("https://media.test/{id}.mp3"),
            category: "meditation".to_string(),
            mood: BTreeSet::from(["calm".to_string()]),
        }
    }

    #[test]
    fn parses_camel_case_catalog() {
        let json = r#"[{
            "id": "1",
            "title": "Deep Ocean Calm",
            "artist": "Harmonic Mind",
            "duration": 380,
            "coverUrl": "https://covers.test/1.jpg",
            "audioUrl": "https://media.test/1.mp3",
            "category": "meditation",
            "mood": ["calm", "relaxed"]
        }]"#;

        let playlist = StaticCatalog::from_json_str(json).unwrap().playlist().unwrap();
        assert_eq!(playlist.len(), 1);
        assert_eq!(playlist[0].audio_url, "https://media.test/1.mp3");
        assert_eq!(playlist[0].duration, 380.0);
        assert!(playlist[0].mood.contains("relaxed"));
    }

    #[test]
    fn rejects_duplicate_ids_and_bad_durations() {
        let err = Playlist::new(vec![track("a", 10.0), track("a", 20.0)]).unwrap_err();
        assert!(matches!(err, PlayerError::InvalidInput(_)));

        let err = Playlist::new(vec![track("a", 0.0)]).unwrap_err();
        assert!(matches!(err, PlayerError::InvalidInput(_)));
    }

    #[test]
    fn finds_positions_by_id() {
        let playlist = Playlist::new(vec![track("a", 1.0), track("b", 2.0)]).unwrap();
        assert_eq!(playlist.position_of("b"), Some(1));
        assert_eq!(playlist.position_of("z"), None);
    }

    #[test]
    fn toggles_saved_tracks() {
        let mut profile = InMemoryProfile::new();
        assert!(profile.toggle_track("5"));
        profile.save_track("5");
        assert_eq!(profile.saved_tracks(), ["5".to_string()]);
        assert!(!profile.toggle_track("5"));
        assert!(!profile.is_track_saved("5"));
    }
}
