use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::error::ModelError;
use crate::target_item::{TargetIds, TargetItem, TargetRecord};
use crate::title_type::TitleType;

/// A rating value together with the day it was given.
///
/// Both halves always travel together; an item is either rated with a
/// date or not rated at all.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SourceRating {
    value: u8,
    rated_on: NaiveDate,
}

impl SourceRating {
    pub fn new(value: u8, rated_on: NaiveDate) -> Result<Self, ModelError> {
        if !(1..=10).contains(&value) {
            return Err(ModelError::RatingOutOfRange(value));
        }
        Ok(Self { value, rated_on })
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn rated_on(&self) -> NaiveDate {
        self.rated_on
    }

    /// Rating date as a UTC timestamp (midnight), the target's convention.
    pub fn rated_at(&self) -> DateTime<Utc> {
        self.rated_on.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceItem {
    pub id: String,
    pub title_type: TitleType,
    pub rating: Option<SourceRating>,
}

impl SourceItem {
    pub fn new(id: impl Into<String>, title_type: TitleType) -> Result<Self, ModelError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ModelError::EmptyId);
        }
        Ok(Self {
            id,
            title_type,
            rating: None,
        })
    }

    pub fn rated(id: impl Into<String>, title_type: TitleType, rating: SourceRating) -> Result<Self, ModelError> {
        let mut item = Self::new(id, title_type)?;
        item.rating = Some(rating);
        Ok(item)
    }

    /// Convert to the target's item shape.
    ///
    /// Only the id is mapped; the kind comes from the title type and the
    /// rating is carried over when present.
    pub fn to_target(&self) -> TargetItem {
        let record = TargetRecord {
            ids: TargetIds::from_imdb(self.id.clone()),
            ..TargetRecord::default()
        };
        let item = TargetItem::new(self.title_type.target_kind(), record);
        match &self.rating {
            Some(rating) => item.with_rating(rating.value(), Some(rating.rated_at())),
            None => item,
        }
    }
}
