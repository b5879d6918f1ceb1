use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Movie,
    Show,
    Episode,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetKind::Movie => "movie",
            TargetKind::Show => "show",
            TargetKind::Episode => "episode",
        })
    }
}

/// Identity fields the target service knows an item by.
///
/// `imdb` is the cross-service join key; the remaining ids are only
/// carried so write requests can address the item precisely.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetIds {
    pub imdb: Option<String>,
    pub trakt: Option<u64>,
    pub slug: Option<String>,
    pub tmdb: Option<u32>,
    pub tvdb: Option<u32>,
}

impl TargetIds {
    pub fn from_imdb(imdb_id: impl Into<String>) -> Self {
        Self {
            imdb: Some(imdb_id.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetRecord {
    pub ids: TargetIds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
}

/// The single populated sub-record of a target item, selected by kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TargetMedia {
    Movie(TargetRecord),
    Show(TargetRecord),
    Episode(TargetRecord),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetItem {
    pub media: TargetMedia,
    /// 0 means unrated.
    pub rating: u8,
    pub rated_at: Option<DateTime<Utc>>,
}

impl TargetItem {
    pub fn new(kind: TargetKind, record: TargetRecord) -> Self {
        let media = match kind {
            TargetKind::Movie => TargetMedia::Movie(record),
            TargetKind::Show => TargetMedia::Show(record),
            TargetKind::Episode => TargetMedia::Episode(record),
        };
        Self {
            media,
            rating: 0,
            rated_at: None,
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self.media {
            TargetMedia::Movie(_) => TargetKind::Movie,
            TargetMedia::Show(_) => TargetKind::Show,
            TargetMedia::Episode(_) => TargetKind::Episode,
        }
    }

    pub fn record(&self) -> &TargetRecord {
        match &self.media {
            TargetMedia::Movie(record) | TargetMedia::Show(record) | TargetMedia::Episode(record) => record,
        }
    }

    pub fn ids(&self) -> &TargetIds {
        &self.record().ids
    }

    /// Cross-service identifier, if the target knows one for this item.
    pub fn external_id(&self) -> Option<&str> {
        self.ids().imdb.as_deref().filter(|id| !id.is_empty())
    }

    pub fn is_rated(&self) -> bool {
        self.rating > 0
    }

    pub fn with_rating(mut self, rating: u8, rated_at: Option<DateTime<Utc>>) -> Self {
        self.rating = rating;
        self.rated_at = rated_at;
        self
    }

    /// Short label for logs: external id, falling back to the target's own id.
    pub fn label(&self) -> String {
        match (self.external_id(), self.ids().trakt) {
            (Some(id), _) => id.to_string(),
            (None, Some(trakt)) => format!("trakt:{}", trakt),
            (None, None) => "<unidentified>".to_string(),
        }
    }
}

/// A named list as it exists on the target service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetList {
    pub name: String,
    pub slug: String,
    pub trakt_id: Option<u64>,
}
