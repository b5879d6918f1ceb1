//! Trakt wire format: the JSON shapes of the v2 API and their conversion
//! to and from the shared target model.

use chrono::{DateTime, Utc};
use media_sync_models::{TargetIds, TargetItem, TargetKind, TargetList, TargetRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TraktIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trakt: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb: Option<u32>,
}

impl From<&TargetIds> for TraktIds {
    fn from(ids: &TargetIds) -> Self {
        Self {
            trakt: ids.trakt,
            slug: ids.slug.clone(),
            imdb: ids.imdb.clone(),
            tmdb: ids.tmdb,
            tvdb: ids.tvdb,
        }
    }
}

impl From<TraktIds> for TargetIds {
    fn from(ids: TraktIds) -> Self {
        Self {
            // Trakt occasionally returns ids with stray slashes
            imdb: ids.imdb.map(|id| id.replace('/', "")).filter(|id| !id.is_empty()),
            trakt: ids.trakt,
            slug: ids.slug,
            tmdb: ids.tmdb,
            tvdb: ids.tvdb,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TraktMedia {
    title: Option<String>,
    year: Option<u32>,
    ids: TraktIds,
}

impl From<TraktMedia> for TargetRecord {
    fn from(media: TraktMedia) -> Self {
        Self {
            ids: media.ids.into(),
            title: media.title,
            year: media.year,
        }
    }
}

/// One row of a list, watchlist or ratings response.
#[derive(Debug, Deserialize)]
pub struct TraktEntry {
    #[serde(rename = "type")]
    item_type: String,
    movie: Option<TraktMedia>,
    show: Option<TraktMedia>,
    episode: Option<TraktMedia>,
    #[serde(default)]
    rating: Option<u8>,
    #[serde(default)]
    rated_at: Option<DateTime<Utc>>,
}

impl TraktEntry {
    /// Rows of other types (seasons, people) have no place in the model and yield `None`.
    pub fn into_target(self) -> Option<TargetItem> {
        let (kind, media) = match self.item_type.as_str() {
            "movie" => (TargetKind::Movie, self.movie),
            "show" => (TargetKind::Show, self.show),
            "episode" => (TargetKind::Episode, self.episode),
            other => {
                debug!(item_type = other, "Skipping unsupported Trakt entry");
                return None;
            }
        };
        let record: TargetRecord = media?.into();
        Some(TargetItem::new(kind, record).with_rating(self.rating.unwrap_or(0), self.rated_at))
    }
}

pub fn entries_to_targets(entries: Vec<TraktEntry>) -> Vec<TargetItem> {
    entries.into_iter().filter_map(TraktEntry::into_target).collect()
}

#[derive(Debug, Deserialize)]
struct TraktListIds {
    trakt: Option<u64>,
    slug: String,
}

#[derive(Debug, Deserialize)]
pub struct TraktList {
    name: String,
    ids: TraktListIds,
}

impl From<TraktList> for TargetList {
    fn from(list: TraktList) -> Self {
        Self {
            name: list.name,
            slug: list.ids.slug,
            trakt_id: list.ids.trakt,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewList<'a> {
    pub name: &'a str,
    pub privacy: &'a str,
}

/// Response of `/users/me`.
#[derive(Debug, Deserialize)]
pub struct UserProfile {
    pub ids: UserIds,
}

#[derive(Debug, Deserialize)]
pub struct UserIds {
    pub slug: String,
}

/// An entry of `/users/{user}/history/{type}/{id}`.
#[derive(Debug, Deserialize)]
pub struct TraktHistoryEntry {
    pub id: u64,
    pub watched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PayloadEntry {
    ids: TraktIds,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    watched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    /// Identity only: list and watchlist membership, rating and history removal.
    Ids,
    /// Rating value and timestamp.
    Ratings,
    /// Watched entry dated at the rating timestamp.
    History,
}

/// Request body grouping items by kind, as the `sync/*` and list item endpoints expect.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct SyncPayload {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    movies: Vec<PayloadEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    shows: Vec<PayloadEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    episodes: Vec<PayloadEntry>,
}

impl SyncPayload {
    pub fn build(items: &[TargetItem], mode: PayloadMode) -> Self {
        let mut payload = Self::default();
        for item in items {
            let mut entry = PayloadEntry {
                ids: item.ids().into(),
                rating: None,
                rated_at: None,
                watched_at: None,
            };
            match mode {
                PayloadMode::Ids => {}
                PayloadMode::Ratings => {
                    entry.rating = Some(item.rating);
                    entry.rated_at = item.rated_at;
                }
                PayloadMode::History => entry.watched_at = item.rated_at,
            }
            match item.kind() {
                TargetKind::Movie => payload.movies.push(entry),
                TargetKind::Show => payload.shows.push(entry),
                TargetKind::Episode => payload.episodes.push(entry),
            }
        }
        payload
    }

    pub fn len(&self) -> usize {
        self.movies.len() + self.shows.len() + self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default, Deserialize)]
struct NotFoundEntry {
    #[serde(default)]
    ids: TraktIds,
}

#[derive(Debug, Default, Deserialize)]
struct NotFoundGroups {
    #[serde(default)]
    movies: Vec<NotFoundEntry>,
    #[serde(default)]
    shows: Vec<NotFoundEntry>,
    #[serde(default)]
    episodes: Vec<NotFoundEntry>,
}

/// Summary returned by the `sync/*` and list item endpoints. Only the
/// `not_found` part matters; the added/deleted counts are not trusted.
#[derive(Debug, Default, Deserialize)]
pub struct SyncResponse {
    #[serde(default)]
    not_found: NotFoundGroups,
}

impl SyncResponse {
    /// Submitted items Trakt listed under `not_found`, matched by IMDb or Trakt id.
    pub fn unmatched(&self, items: &[TargetItem]) -> Vec<TargetItem> {
        let groups = &self.not_found;
        let reported: Vec<&TraktIds> = groups
            .movies
            .iter()
            .chain(&groups.shows)
            .chain(&groups.episodes)
            .map(|entry| &entry.ids)
            .collect();
        if reported.is_empty() {
            return Vec::new();
        }

        items
            .iter()
            .filter(|item| reported.iter().any(|ids| same_item(ids, item.ids())))
            .cloned()
            .collect()
    }
}

fn same_item(reported: &TraktIds, ids: &TargetIds) -> bool {
    let imdb = matches!((&reported.imdb, &ids.imdb), (Some(a), Some(b)) if a == b);
    let trakt = matches!((reported.trakt, ids.trakt), (Some(a), Some(b)) if a == b);
    imdb || trakt
}

/// Path segment Trakt uses for a kind in history lookups.
pub fn history_type(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Movie => "movies",
        TargetKind::Show => "shows",
        TargetKind::Episode => "episodes",
    }
}
