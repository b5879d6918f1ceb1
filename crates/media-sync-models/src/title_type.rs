use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::target_item::TargetKind;

/// Title type as reported by the source catalog.
///
/// Exports use the human form ("TV Series") while page data uses the
/// camelCase form ("tvSeries"); both parse to the same variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TitleType {
    Movie,
    TvSeries,
    TvMiniSeries,
    TvEpisode,
    TvMovie,
    TvSpecial,
    TvShort,
    Short,
    Video,
    Other(String),
}

impl TitleType {
    /// Kind of record the target service stores this title as.
    pub fn target_kind(&self) -> TargetKind {
        match self {
            TitleType::TvSeries | TitleType::TvMiniSeries => TargetKind::Show,
            TitleType::TvEpisode => TargetKind::Episode,
            TitleType::Movie
            | TitleType::TvMovie
            | TitleType::TvSpecial
            | TitleType::TvShort
            | TitleType::Short
            | TitleType::Video
            | TitleType::Other(_) => TargetKind::Movie,
        }
    }
}

impl FromStr for TitleType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        Ok(match key.as_str() {
            "movie" => TitleType::Movie,
            "tvseries" => TitleType::TvSeries,
            "tvminiseries" => TitleType::TvMiniSeries,
            "tvepisode" => TitleType::TvEpisode,
            "tvmovie" => TitleType::TvMovie,
            "tvspecial" => TitleType::TvSpecial,
            "tvshort" => TitleType::TvShort,
            "short" => TitleType::Short,
            "video" => TitleType::Video,
            _ => TitleType::Other(s.trim().to_string()),
        })
    }
}

impl fmt::Display for TitleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TitleType::Movie => "movie",
            TitleType::TvSeries => "tvSeries",
            TitleType::TvMiniSeries => "tvMiniSeries",
            TitleType::TvEpisode => "tvEpisode",
            TitleType::TvMovie => "tvMovie",
            TitleType::TvSpecial => "tvSpecial",
            TitleType::TvShort => "tvShort",
            TitleType::Short => "short",
            TitleType::Video => "video",
            TitleType::Other(other) => other,
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_both_spellings() {
        assert_eq!("TV Series".parse::<TitleType>().unwrap(), TitleType::TvSeries);
        assert_eq!("tvSeries".parse::<TitleType>().unwrap(), TitleType::TvSeries);
        assert_eq!("TV Mini Series".parse::<TitleType>().unwrap(), TitleType::TvMiniSeries);
        assert_eq!("Movie".parse::<TitleType>().unwrap(), TitleType::Movie);
        assert_eq!("tvEpisode".parse::<TitleType>().unwrap(), TitleType::TvEpisode);
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let parsed = "Video Game".parse::<TitleType>().unwrap();
        assert_eq!(parsed, TitleType::Other("Video Game".to_string()));
        assert_eq!(parsed.target_kind(), TargetKind::Movie);
    }

    #[test]
    fn test_target_kind() {
        assert_eq!(TitleType::TvSeries.target_kind(), TargetKind::Show);
        assert_eq!(TitleType::TvMiniSeries.target_kind(), TargetKind::Show);
        assert_eq!(TitleType::TvEpisode.target_kind(), TargetKind::Episode);
        assert_eq!(TitleType::TvMovie.target_kind(), TargetKind::Movie);
    }
}
