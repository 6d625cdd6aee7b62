use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

use super::{element_text, parse_count, parse_rating, require_text, select_attr, select_text, selector};
use crate::error::ExtractionError;
use crate::models::{ProfileReview, RatingBucket, UserStats};

static PROFILE_HEAD: LazyLock<Selector> = LazyLock::new(|| selector(".profileHeadLeft"));
static PROFILE_NAME: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static ABOUT: LazyLock<Selector> = LazyLock::new(|| selector(".aboutUser"));
static LOCATION: LazyLock<Selector> = LazyLock::new(|| selector(".profileLocation"));
static RIGHT_BOX_DIV: LazyLock<Selector> = LazyLock::new(|| selector(".rightBox div"));

static STAT_CONTAINER: LazyLock<Selector> = LazyLock::new(|| selector(".profileStatContainer"));
static STAT_VALUE: LazyLock<Selector> = LazyLock::new(|| selector(".profileStat"));

static DIST_ROW: LazyLock<Selector> = LazyLock::new(|| selector(".dist .distRow"));
static DIST_LABEL: LazyLock<Selector> = LazyLock::new(|| selector(".distLabel"));
static DIST_COUNT: LazyLock<Selector> = LazyLock::new(|| selector(".distCount"));

static REVIEW_ROW: LazyLock<Selector> = LazyLock::new(|| selector(".albumReviewRow"));
static REVIEW_ALBUM: LazyLock<Selector> = LazyLock::new(|| selector(".albumTitle"));
static REVIEW_ARTIST: LazyLock<Selector> = LazyLock::new(|| selector(".artistTitle"));
static REVIEW_RATING: LazyLock<Selector> = LazyLock::new(|| selector(".rating"));
static REVIEW_TEXT: LazyLock<Selector> = LazyLock::new(|| selector(".albumReviewText"));
static REVIEW_LIKES: LazyLock<Selector> = LazyLock::new(|| selector(".review_likes"));
static REVIEW_TIMESTAMP: LazyLock<Selector> = LazyLock::new(|| selector(".actionContainer[title]"));

static SOCIAL_LINK: LazyLock<Selector> = LazyLock::new(|| selector(".profileLink"));
static SOCIAL_ICON: LazyLock<Selector> = LazyLock::new(|| selector(".logo i"));
static SOCIAL_HREF: LazyLock<Selector> = LazyLock::new(|| selector("a"));

static FAVORITE_BLOCK: LazyLock<Selector> = LazyLock::new(|| selector("#favAlbumsBlock .albumBlock"));
static FAVORITE_TITLE: LazyLock<Selector> = LazyLock::new(|| selector(".albumTitle"));

const MEMBER_SINCE_PREFIX: &str = "Member since";
const STAT_KEYS: usize = 4;

/// Profile header; its presence is what tells a profile from a 404 page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileHead {
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicInfo {
    pub about: Option<String>,
    pub location: Option<String>,
    pub member_since: Option<String>,
}

pub fn extract_profile_head(root: ElementRef<'_>) -> Result<ProfileHead, ExtractionError> {
    let head = root
        .select(&PROFILE_HEAD)
        .next()
        .ok_or(ExtractionError::StructureMismatch("user profile"))?;

    Ok(ProfileHead {
        username: select_text(head, &PROFILE_NAME),
    })
}

/// About, location and member-since; all optional.
pub fn extract_basic_info(root: ElementRef<'_>) -> BasicInfo {
    let member_since = root.select(&RIGHT_BOX_DIV).map(element_text).find_map(|text| {
        text.strip_prefix(MEMBER_SINCE_PREFIX)
            .map(|rest| rest.trim().to_string())
            .filter(|rest| !rest.is_empty())
    });

    BasicInfo {
        about: select_text(root, &ABOUT),
        location: select_text(root, &LOCATION),
        member_since,
    }
}

/// Ratings, reviews, lists and followers, in that on-page order.
pub fn extract_stats(root: ElementRef<'_>) -> Result<UserStats, ExtractionError> {
    let containers: Vec<_> = root.select(&STAT_CONTAINER).take(STAT_KEYS).collect();
    if containers.len() < STAT_KEYS {
        return Err(ExtractionError::StructureMismatch("profile stats"));
    }

    let mut values = [0u64; STAT_KEYS];
    for (slot, container) in values.iter_mut().zip(containers) {
        if let Some(raw) = select_text(container, &STAT_VALUE) {
            *slot = parse_count("stats", &raw)?;
        }
    }

    let [ratings, reviews, lists, followers] = values;
    Ok(UserStats {
        ratings,
        reviews,
        lists,
        followers,
    })
}

pub fn distribution_rows<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    root.select(&DIST_ROW)
}

pub fn extract_distribution_row(row: ElementRef<'_>) -> Result<(RatingBucket, u64), ExtractionError> {
    let label = require_text(row, &DIST_LABEL, "rating_distribution.label")?;
    let bucket = RatingBucket::from_label(&label)
        .ok_or_else(|| ExtractionError::MalformedValue("rating_distribution.label", label.clone()))?;
    let raw_count = require_text(row, &DIST_COUNT, "rating_distribution.count")?;

    Ok((bucket, parse_count("rating_distribution.count", &raw_count)?))
}

pub fn profile_review_rows<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    root.select(&REVIEW_ROW)
}

pub fn extract_profile_review(row: ElementRef<'_>) -> Result<ProfileReview, ExtractionError> {
    let album_title = require_text(row, &REVIEW_ALBUM, "recent_review.album_title")?;
    let album_artist = require_text(row, &REVIEW_ARTIST, "recent_review.album_artist")?;
    let raw_rating = require_text(row, &REVIEW_RATING, "recent_review.rating")?;
    let review_text = require_text(row, &REVIEW_TEXT, "recent_review.review_text")?;

    let likes = match select_text(row, &REVIEW_LIKES) {
        Some(raw) => parse_count("recent_review.likes", &raw)?,
        None => 0,
    };

    Ok(ProfileReview {
        album_title,
        album_artist,
        rating: parse_rating("recent_review.rating", &raw_rating)?,
        review_text,
        likes,
        timestamp: select_text(row, &REVIEW_TIMESTAMP).unwrap_or_default(),
    })
}

pub fn social_link_nodes<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    root.select(&SOCIAL_LINK)
}

/// Platform label comes from the icon's `fa-<platform>` class.
pub fn extract_social_link(node: ElementRef<'_>) -> Result<(String, String), ExtractionError> {
    let icon = node
        .select(&SOCIAL_ICON)
        .next()
        .ok_or(ExtractionError::MissingRequiredField("social_link.icon"))?;

    let platform = icon
        .value()
        .classes()
        .filter_map(|class| class.strip_prefix("fa-"))
        .find(|name| !name.is_empty())
        .ok_or_else(|| {
            ExtractionError::MalformedValue(
                "social_link.icon",
                icon.value().attr("class").unwrap_or_default().to_string(),
            )
        })?;

    let url = select_attr(node, &SOCIAL_HREF, "href")
        .ok_or(ExtractionError::MissingRequiredField("social_link.url"))?;

    Ok((platform.to_string(), url))
}

pub fn favorite_blocks<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    root.select(&FAVORITE_BLOCK)
}

pub fn extract_favorite_album(block: ElementRef<'_>) -> Result<String, ExtractionError> {
    require_text(block, &FAVORITE_TITLE, "favorite_album.title")
}
