use std::path::Path;

use super::error::PlaylistError;

/// One (run, eventNumber) stop of a playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub run: i32,
    pub event_number: u64,
}

/// Parse whitespace separated `<run> <eventNumber>` pairs. Reading stops at the first pair that
/// does not parse.
pub fn parse_playlist(contents: &str) -> Vec<PlaylistEntry> {
    let mut entries = Vec::new();
    let mut tokens = contents.split_whitespace();
    while let Some(run) = tokens.next() {
        let event = tokens.next();
        match (run.parse(), event.map(str::parse)) {
            (Ok(run), Some(Ok(event_number))) => entries.push(PlaylistEntry { run, event_number }),
            _ => {
                log::warn!(
                    "Stopped reading playlist at pair {} after {} entries",
                    match event {
                        Some(event) => format!("({run}, {event})"),
                        None => format!("({run})"),
                    },
                    entries.len()
                );
                break;
            }
        }
    }
    entries
}

/// Read a playlist file
pub fn read_playlist(path: &Path) -> Result<Vec<PlaylistEntry>, PlaylistError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| PlaylistError::IOError(path.to_path_buf(), e))?;
    let entries = parse_playlist(&contents);
    log::info!("Loaded {} playlist entries from {path:?}", entries.len());
    Ok(entries)
}
