use scraper::{ElementRef, Selector};
use std::sync::LazyLock;
use url::Url;

use super::{
    element_text, parse_count, parse_length, parse_optional_rating, parse_score, require_text,
    select_attr, select_text, selector,
};
use crate::error::ExtractionError;
use crate::models::{BuyLink, CriticReview, PopularReview, SearchHit, Track};

// Cabecera del álbum
static HEADLINE: LazyLock<Selector> = LazyLock::new(|| selector(".albumHeadline"));
static HEADLINE_TITLE: LazyLock<Selector> = LazyLock::new(|| selector(".albumTitle"));
static HEADLINE_ARTIST: LazyLock<Selector> = LazyLock::new(|| selector(".artist"));
static USER_SCORE: LazyLock<Selector> = LazyLock::new(|| selector(".albumUserScore a"));
static NUM_RATINGS: LazyLock<Selector> = LazyLock::new(|| selector(".numReviews strong"));
static MUST_HEAR: LazyLock<Selector> = LazyLock::new(|| selector(".mustHearButton"));

// Tracklist
static TRACK_ROW: LazyLock<Selector> = LazyLock::new(|| selector(".trackListTable tr"));
static TRACK_NUMBER: LazyLock<Selector> = LazyLock::new(|| selector(".trackNumber"));
static TRACK_TITLE: LazyLock<Selector> = LazyLock::new(|| selector(".trackTitle a"));
static TRACK_LENGTH: LazyLock<Selector> = LazyLock::new(|| selector(".length"));
static TRACK_RATING: LazyLock<Selector> = LazyLock::new(|| selector(".trackRating span"));
static FEATURED: LazyLock<Selector> = LazyLock::new(|| selector(".featuredArtists a"));

// Reseñas
static CRITIC_ROW: LazyLock<Selector> = LazyLock::new(|| selector("#critics .albumReviewRow"));
static CRITIC_AUTHOR: LazyLock<Selector> = LazyLock::new(|| selector(".author a"));
static CRITIC_PUBLICATION: LazyLock<Selector> = LazyLock::new(|| selector(".publication a"));
static CRITIC_RATING: LazyLock<Selector> = LazyLock::new(|| selector(".albumReviewRating"));
static USER_ROW: LazyLock<Selector> = LazyLock::new(|| selector("#users .albumReviewRow"));
static USER_NAME: LazyLock<Selector> = LazyLock::new(|| selector(".userReviewName a"));
static USER_RATING: LazyLock<Selector> = LazyLock::new(|| selector(".rating"));
static USER_LIKES: LazyLock<Selector> = LazyLock::new(|| selector(".review_likes a"));
static REVIEW_TEXT: LazyLock<Selector> = LazyLock::new(|| selector(".albumReviewText"));

static BUY_LINK: LazyLock<Selector> = LazyLock::new(|| selector(".buyButtons a"));

// Bloques de búsqueda / similares
static ALBUM_BLOCK: LazyLock<Selector> = LazyLock::new(|| selector(".albumBlock"));
static BLOCK_LINK: LazyLock<Selector> = LazyLock::new(|| selector(".image a"));
static BLOCK_ARTIST: LazyLock<Selector> = LazyLock::new(|| selector(".artistTitle"));
static BLOCK_TITLE: LazyLock<Selector> = LazyLock::new(|| selector(".albumTitle"));

/// Title and artist as printed in the album page headline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headline {
    pub title: Option<String>,
    pub artist: Option<String>,
}

/// Reads the album headline.
///
/// A page without any `.albumHeadline` is not an album page at all.
pub fn extract_headline(root: ElementRef<'_>) -> Result<Headline, ExtractionError> {
    let headline = root
        .select(&HEADLINE)
        .next()
        .ok_or(ExtractionError::StructureMismatch("album page"))?;

    Ok(Headline {
        title: select_text(headline, &HEADLINE_TITLE),
        artist: select_text(headline, &HEADLINE_ARTIST),
    })
}

/// Aggregate user score from the `title` attribute of the score link.
pub fn extract_user_score(root: ElementRef<'_>) -> Result<Option<f64>, ExtractionError> {
    match select_attr(root, &USER_SCORE, "title") {
        Some(raw) => parse_score("user_score", &raw).map(Some),
        None => Ok(None),
    }
}

/// Number of user ratings; absent counter means nobody rated yet.
pub fn extract_rating_count(root: ElementRef<'_>) -> Result<u64, ExtractionError> {
    match select_text(root, &NUM_RATINGS) {
        Some(raw) => parse_count("num_ratings", &raw),
        None => Ok(0),
    }
}

/// Must-hear rule: the page shows a `.mustHearButton` badge.
pub fn extract_must_hear(root: ElementRef<'_>) -> bool {
    root.select(&MUST_HEAR).next().is_some()
}

pub fn track_rows<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    root.select(&TRACK_ROW)
}

pub fn extract_track(row: ElementRef<'_>) -> Result<Track, ExtractionError> {
    let raw_number = require_text(row, &TRACK_NUMBER, "track.number")?;
    let number = match raw_number.parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => return Err(ExtractionError::MalformedValue("track.number", raw_number)),
    };

    let title = require_text(row, &TRACK_TITLE, "track.title")?;
    let length = select_text(row, &TRACK_LENGTH).and_then(|raw| parse_length(&raw));
    let rating = match select_text(row, &TRACK_RATING) {
        Some(raw) => parse_optional_rating("track.rating", &raw)?,
        None => None,
    };
    let featured_artists = row
        .select(&FEATURED)
        .map(element_text)
        .filter(|name| !name.is_empty())
        .collect();

    Ok(Track {
        number,
        title,
        length,
        rating,
        featured_artists,
    })
}

pub fn critic_rows<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    root.select(&CRITIC_ROW)
}

pub fn extract_critic_review(row: ElementRef<'_>) -> Result<CriticReview, ExtractionError> {
    let text = require_text(row, &REVIEW_TEXT, "critic_review.text")?;
    let author = select_text(row, &CRITIC_AUTHOR).unwrap_or_else(|| "Unknown".to_string());
    let publication = select_text(row, &CRITIC_PUBLICATION);
    let rating = match select_text(row, &CRITIC_RATING) {
        Some(raw) => parse_optional_rating("critic_review.rating", &raw)?,
        None => None,
    };

    Ok(CriticReview {
        author,
        publication,
        rating,
        text,
    })
}

pub fn popular_rows<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    root.select(&USER_ROW)
}

pub fn extract_popular_review(row: ElementRef<'_>) -> Result<PopularReview, ExtractionError> {
    let author = require_text(row, &USER_NAME, "popular_review.author")?;
    let text = require_text(row, &REVIEW_TEXT, "popular_review.text")?;
    let rating = match select_text(row, &USER_RATING) {
        Some(raw) => parse_optional_rating("popular_review.rating", &raw)?,
        None => None,
    };
    let likes = match select_text(row, &USER_LIKES) {
        Some(raw) => parse_count("popular_review.likes", &raw)?,
        None => 0,
    };

    Ok(PopularReview {
        author,
        rating,
        text,
        likes,
    })
}

pub fn buy_link_nodes<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    root.select(&BUY_LINK)
}

pub fn extract_buy_link(link: ElementRef<'_>) -> Result<BuyLink, ExtractionError> {
    let attr = |name: &str| {
        link.value()
            .attr(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    Ok(BuyLink {
        platform: attr("title").ok_or(ExtractionError::MissingRequiredField("buy_link.platform"))?,
        url: attr("href").ok_or(ExtractionError::MissingRequiredField("buy_link.url"))?,
    })
}

pub fn album_blocks<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    root.select(&ALBUM_BLOCK)
}

/// Reads one `.albumBlock`, resolving its link against `base`.
pub fn extract_search_hit(block: ElementRef<'_>, base: &Url) -> Result<SearchHit, ExtractionError> {
    let href = select_attr(block, &BLOCK_LINK, "href")
        .ok_or(ExtractionError::MissingRequiredField("search_hit.locator"))?;
    let locator = base
        .join(&href)
        .map_err(|_| ExtractionError::MalformedValue("search_hit.locator", href.clone()))?;

    Ok(SearchHit {
        locator: locator.to_string(),
        artist: require_text(block, &BLOCK_ARTIST, "search_hit.artist")?,
        title: require_text(block, &BLOCK_TITLE, "search_hit.title")?,
    })
}
