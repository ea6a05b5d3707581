//! iTunes Search API artwork source.
//!
//! Searches `entity=album` for `"<artist> <album>"` and upsizes the returned
//! `artworkUrl100` thumbnails (`.../100x100bb.jpg`) to the configured size.
//! Results whose artist matches the query rank first; the service's own
//! order is kept otherwise.

use super::{ArtworkSource, CancelToken, CandidateArt, CandidateData, SourceQuery, SourcingError};
use crate::config::SourcingConfig;
use log::debug;
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::time::Duration;

/// Downloads larger than this are refused.
pub const MAX_ARTWORK_BYTES: u64 = 20 * 1024 * 1024;

const THUMBNAIL_MARKER: &str = "100x100bb";
const USER_AGENT: &str = concat!("cover-curator/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<AlbumResult>,
}

#[derive(Debug, Deserialize)]
struct AlbumResult {
    #[serde(rename = "artistName")]
    artist_name: Option<String>,
    #[serde(rename = "collectionName")]
    collection_name: Option<String>,
    #[serde(rename = "artworkUrl100")]
    artwork_url: Option<String>,
}

pub struct ItunesSource {
    agent: ureq::Agent,
    endpoint: String,
    timeout: Duration,
    artwork_size: u32,
    max_results: u32,
}

impl ItunesSource {
    pub fn new(config: &SourcingConfig) -> Self {
        let timeout = config.timeout();
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout.min(Duration::from_secs(5)))
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            endpoint: config.endpoint.clone(),
            timeout,
            artwork_size: config.artwork_size,
            max_results: config.max_results,
        }
    }

    fn search_url(&self, artist: &str, album: &str) -> String {
        search_url(&self.endpoint, artist, album, self.max_results)
    }

    fn classify(&self, error: ureq::Error) -> SourcingError {
        match error {
            ureq::Error::Status(code, _) => {
                SourcingError::Unavailable(format!("iTunes returned HTTP {code}"))
            }
            ureq::Error::Transport(transport) => {
                let lowered = transport.to_string().to_ascii_lowercase();
                if lowered.contains("timed out") || lowered.contains("timeout") {
                    SourcingError::TimedOut(self.timeout)
                } else {
                    SourcingError::Unavailable(format!("Request failed: {transport}"))
                }
            }
        }
    }

    fn read_error(&self, error: std::io::Error) -> SourcingError {
        if error.kind() == std::io::ErrorKind::TimedOut {
            SourcingError::TimedOut(self.timeout)
        } else {
            SourcingError::Unavailable(format!("Failed to read response: {error}"))
        }
    }
}

impl ArtworkSource for ItunesSource {
    fn name(&self) -> &str {
        "itunes"
    }

    fn search(
        &self,
        query: &SourceQuery,
        cancel: &CancelToken,
    ) -> Result<Vec<CandidateArt>, SourcingError> {
        let SourceQuery::Album { artist, album } = query else {
            return Err(SourcingError::UnsupportedQuery);
        };
        cancel.check()?;

        let url = self.search_url(artist, album);
        debug!("iTunes search: {url}");
        let response = self
            .agent
            .get(&url)
            .set("Accept", "application/json")
            .call()
            .map_err(|e| self.classify(e))?;
        let mut body = String::new();
        response
            .into_reader()
            .take(MAX_ARTWORK_BYTES)
            .read_to_string(&mut body)
            .map_err(|e| self.read_error(e))?;
        cancel.check()?;

        parse_response(&body, artist, self.artwork_size)
    }

    fn fetch(&self, candidate: &CandidateArt, cancel: &CancelToken) -> Result<Vec<u8>, SourcingError> {
        cancel.check()?;
        let url = match &candidate.data {
            CandidateData::Bytes(bytes) => return Ok(bytes.clone()),
            CandidateData::Url(url) => url,
        };

        debug!("Downloading artwork: {url}");
        let response = self.agent.get(url).call().map_err(|e| self.classify(e))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_ARTWORK_BYTES + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| self.read_error(e))?;
        cancel.check()?;

        if bytes.len() as u64 > MAX_ARTWORK_BYTES {
            return Err(SourcingError::Unavailable(format!(
                "Artwork larger than {} MiB: {url}",
                MAX_ARTWORK_BYTES / (1024 * 1024)
            )));
        }
        if bytes.is_empty() {
            return Err(SourcingError::Unavailable(format!("Empty artwork response: {url}")));
        }
        Ok(bytes)
    }
}

/// Search request URL for an album query.
pub fn search_url(endpoint: &str, artist: &str, album: &str, limit: u32) -> String {
    let term = format!("{} {}", artist.trim(), album.trim());
    format!(
        "{endpoint}?term={}&entity=album&limit={limit}",
        urlencoding::encode(&term)
    )
}

/// Replace the `100x100bb` thumbnail marker with `<size>x<size>bb`.
///
/// URLs without the marker are returned unchanged.
pub fn upscale_artwork_url(url: &str, size: u32) -> String {
    url.replacen(THUMBNAIL_MARKER, &format!("{size}x{size}bb"), 1)
}

/// Parse a search response body into ranked candidates.
pub fn parse_response(
    body: &str,
    artist: &str,
    artwork_size: u32,
) -> Result<Vec<CandidateArt>, SourcingError> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| SourcingError::Unavailable(format!("Invalid JSON response: {e}")))?;
    Ok(rank_results(response.results, artist, artwork_size))
}

fn rank_results(results: Vec<AlbumResult>, artist: &str, artwork_size: u32) -> Vec<CandidateArt> {
    let wanted = artist.trim().to_lowercase();
    let mut seen = HashSet::new();
    let mut usable: Vec<(bool, AlbumResult, String)> = results
        .into_iter()
        .filter_map(|r| {
            let url = upscale_artwork_url(r.artwork_url.as_deref()?, artwork_size);
            let matches = r
                .artist_name
                .as_deref()
                .is_some_and(|a| a.trim().to_lowercase() == wanted);
            Some((!matches, r, url))
        })
        .filter(|(_, _, url)| seen.insert(url.clone()))
        .collect();
    // Stable: service order is kept within each group.
    usable.sort_by_key(|(mismatch, _, _)| *mismatch);

    usable
        .into_iter()
        .enumerate()
        .map(|(rank, (_, result, url))| CandidateArt {
            data: CandidateData::Url(url),
            estimated_rank: rank as u32,
            label: match (result.artist_name, result.collection_name) {
                (Some(a), Some(c)) => Some(format!("{a} - {c}")),
                (None, Some(c)) => Some(c),
                (Some(a), None) => Some(a),
                (None, None) => None,
            },
        })
        .collect()
}
