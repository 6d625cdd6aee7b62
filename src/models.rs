use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Album record as served to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub title: String,
    pub artist: String,
    /// Aggregate user score, 0–100 with decimals
    pub user_score: Option<f64>,
    pub num_ratings: u64,
    /// Strictly increasing by `number`
    pub tracks: Vec<Track>,
    pub critic_reviews: Vec<CriticReview>,
    pub popular_reviews: Vec<PopularReview>,
    /// True when the page carries the "must hear" badge
    pub is_must_hear: bool,
    pub buy_links: Vec<BuyLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub number: u32,
    pub title: String,
    /// `m:ss` o `h:mm:ss`
    pub length: Option<String>,
    pub rating: Option<u8>,
    pub featured_artists: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticReview {
    pub author: String,
    pub publication: Option<String>,
    pub rating: Option<u8>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularReview {
    pub author: String,
    pub rating: Option<u8>,
    pub text: String,
    pub likes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyLink {
    pub platform: String,
    pub url: String,
}

/// One album block on a search or "similar albums" page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Absolute URL of the album page
    pub locator: String,
    pub artist: String,
    pub title: String,
}

/// User profile record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub location: Option<String>,
    pub about: Option<String>,
    pub member_since: Option<String>,
    pub stats: UserStats,
    pub favorite_albums: Vec<String>,
    pub recent_reviews: Vec<ProfileReview>,
    /// Platform label -> profile URL
    pub social_links: BTreeMap<String, String>,
    pub rating_distribution: RatingDistribution,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub ratings: u64,
    pub reviews: u64,
    pub lists: u64,
    pub followers: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileReview {
    pub album_title: String,
    pub album_artist: String,
    pub rating: u8,
    pub review_text: String,
    pub likes: u64,
    /// Relative timestamp as printed by the site ("3d", "1mo", ...)
    pub timestamp: String,
}

/// Fixed rating buckets of the profile histogram, highest first.
///
/// The derived `Ord` follows declaration order, so a `BTreeMap` keyed by
/// bucket iterates in the same order the site renders them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RatingBucket {
    #[serde(rename = "100")]
    Perfect,
    #[serde(rename = "90-99")]
    Nineties,
    #[serde(rename = "80-89")]
    Eighties,
    #[serde(rename = "70-79")]
    Seventies,
    #[serde(rename = "60-69")]
    Sixties,
    #[serde(rename = "50-59")]
    Fifties,
    #[serde(rename = "40-49")]
    Forties,
    #[serde(rename = "30-39")]
    Thirties,
    #[serde(rename = "20-29")]
    Twenties,
    #[serde(rename = "10-19")]
    Teens,
    #[serde(rename = "0-9")]
    Bottom,
}

impl RatingBucket {
    pub const ALL: [RatingBucket; 11] = [
        Self::Perfect,
        Self::Nineties,
        Self::Eighties,
        Self::Seventies,
        Self::Sixties,
        Self::Fifties,
        Self::Forties,
        Self::Thirties,
        Self::Twenties,
        Self::Teens,
        Self::Bottom,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Perfect => "100",
            Self::Nineties => "90-99",
            Self::Eighties => "80-89",
            Self::Seventies => "70-79",
            Self::Sixties => "60-69",
            Self::Fifties => "50-59",
            Self::Forties => "40-49",
            Self::Thirties => "30-39",
            Self::Twenties => "20-29",
            Self::Teens => "10-19",
            Self::Bottom => "0-9",
        }
    }

    /// Parses a label as printed on the page, ignoring inner whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        let compact: String = label.chars().filter(|c| !c.is_whitespace()).collect();
        Self::ALL.into_iter().find(|bucket| bucket.label() == compact)
    }
}

impl fmt::Display for RatingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Histogram of a user's ratings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingDistribution(BTreeMap<RatingBucket, u64>);

impl RatingDistribution {
    pub fn insert(&mut self, bucket: RatingBucket, count: u64) {
        self.0.insert(bucket, count);
    }

    pub fn get(&self, bucket: RatingBucket) -> Option<u64> {
        self.0.get(&bucket).copied()
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RatingBucket, u64)> + '_ {
        self.0.iter().map(|(bucket, count)| (*bucket, *count))
    }
}
