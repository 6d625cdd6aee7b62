//! # Record Assembler
//!
//! Drives the [field extractors](crate::extract) over one fetched page and
//! decides whether the result is usable.
//!
//! Policy:
//!
//! - Required fields (album: title and artist; user: username) missing means
//!   [`LookupError::AssemblyFailed`].
//! - Everything else is best-effort. Each repeated element is extracted into
//!   its own `Result`; failures are skipped and counted in
//!   [`Assembly::skipped`] so that one malformed review never sinks the
//!   whole album.
//! - Identical input bytes always produce an identical record: collections
//!   keep document order and maps are ordered.

use scraper::{ElementRef, Html};
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

use crate::error::{ExtractionError, LookupError};
use crate::extract::{album, user};
use crate::models::{Album, RatingDistribution, SearchHit, Track, UserProfile};
use crate::sources::RawDocument;

/// An assembled record plus how many sub-elements were dropped on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly<T> {
    pub record: T,
    pub skipped: usize,
}

impl<T> Assembly<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Assembly<U> {
        Assembly {
            record: f(self.record),
            skipped: self.skipped,
        }
    }
}

/// Turns raw pages into records.
#[derive(Debug, Clone)]
pub struct RecordAssembler {
    base: Url,
    recent_reviews_limit: usize,
}

impl RecordAssembler {
    pub fn new(base: Url, recent_reviews_limit: usize) -> Self {
        Self {
            base,
            recent_reviews_limit,
        }
    }

    /// Album blocks of a search or "similar albums" page, in page order.
    pub fn assemble_search(&self, doc: &RawDocument) -> Assembly<Vec<SearchHit>> {
        let html = Html::parse_document(doc.body());
        let root = html.root_element();
        let mut skipped = 0;

        let hits = collect_best_effort(
            album::album_blocks(root),
            |block| album::extract_search_hit(block, &self.base),
            "search_hit",
            &mut skipped,
        );

        Assembly {
            record: hits,
            skipped,
        }
    }

    /// Builds an [`Album`] from its page.
    ///
    /// `hint` is the search hit that led here; its artist and title fill in
    /// for a headline that lacks them.
    ///
    /// A page without an `.albumHeadline` block fails with
    /// `StructureMismatch` even when `hint` is present. A hint never turns a
    /// challenge or maintenance page into a cached album.
    pub fn assemble_album(
        &self,
        doc: &RawDocument,
        hint: Option<&SearchHit>,
    ) -> Result<Assembly<Album>, LookupError> {
        let html = Html::parse_document(doc.body());
        let root = html.root_element();

        let headline = album::extract_headline(root)?;
        let title = headline
            .title
            .or_else(|| hint.map(|h| h.title.clone()))
            .ok_or(ExtractionError::MissingRequiredField("title"))?;
        let artist = headline
            .artist
            .or_else(|| hint.map(|h| h.artist.clone()))
            .ok_or(ExtractionError::MissingRequiredField("artist"))?;

        let mut skipped = 0;

        let user_score = album::extract_user_score(root).unwrap_or_else(|e| {
            note_skip("user_score", &e, &mut skipped);
            None
        });
        let num_ratings = album::extract_rating_count(root).unwrap_or_else(|e| {
            note_skip("num_ratings", &e, &mut skipped);
            0
        });

        let tracks = collect_best_effort(album::track_rows(root), album::extract_track, "track", &mut skipped);
        let tracks = enforce_increasing(tracks, &mut skipped);

        let critic_reviews = collect_best_effort(
            album::critic_rows(root),
            album::extract_critic_review,
            "critic_review",
            &mut skipped,
        );
        let popular_reviews = collect_best_effort(
            album::popular_rows(root),
            album::extract_popular_review,
            "popular_review",
            &mut skipped,
        );
        let buy_links = collect_best_effort(
            album::buy_link_nodes(root),
            album::extract_buy_link,
            "buy_link",
            &mut skipped,
        );

        Ok(Assembly {
            record: Album {
                title,
                artist,
                user_score,
                num_ratings,
                tracks,
                critic_reviews,
                popular_reviews,
                is_must_hear: album::extract_must_hear(root),
                buy_links,
            },
            skipped,
        })
    }

    /// Builds a [`UserProfile`] from a profile page.
    ///
    /// A page without the profile header is the site's "no such user" page.
    pub fn assemble_user(
        &self,
        doc: &RawDocument,
        username: &str,
    ) -> Result<Assembly<UserProfile>, LookupError> {
        let html = Html::parse_document(doc.body());
        let root = html.root_element();

        let head = match user::extract_profile_head(root) {
            Ok(head) => head,
            Err(ExtractionError::StructureMismatch(_)) => {
                return Err(LookupError::NotFound(format!("user '{username}'")));
            }
            Err(e) => return Err(e.into()),
        };

        let username = head
            .username
            .or_else(|| Some(username.trim().to_string()).filter(|name| !name.is_empty()))
            .ok_or(ExtractionError::MissingRequiredField("username"))?;

        let mut skipped = 0;
        let info = user::extract_basic_info(root);

        let stats = user::extract_stats(root).unwrap_or_else(|e| {
            note_skip("stats", &e, &mut skipped);
            Default::default()
        });

        let mut rating_distribution = RatingDistribution::default();
        for (bucket, count) in collect_best_effort(
            user::distribution_rows(root),
            user::extract_distribution_row,
            "rating_distribution",
            &mut skipped,
        ) {
            rating_distribution.insert(bucket, count);
        }

        let recent_reviews = collect_best_effort(
            user::profile_review_rows(root).take(self.recent_reviews_limit),
            user::extract_profile_review,
            "recent_review",
            &mut skipped,
        );

        let social_links: BTreeMap<String, String> = collect_best_effort(
            user::social_link_nodes(root),
            user::extract_social_link,
            "social_link",
            &mut skipped,
        )
        .into_iter()
        .collect();

        let favorite_albums = collect_best_effort(
            user::favorite_blocks(root),
            user::extract_favorite_album,
            "favorite_album",
            &mut skipped,
        );

        Ok(Assembly {
            record: UserProfile {
                username,
                location: info.location,
                about: info.about,
                member_since: info.member_since,
                stats,
                favorite_albums,
                recent_reviews,
                social_links,
                rating_distribution,
            },
            skipped,
        })
    }
}

/// Extrae cada elemento por separado; los que fallan se cuentan y se omiten.
fn collect_best_effort<'a, T>(
    nodes: impl Iterator<Item = ElementRef<'a>>,
    extract: impl Fn(ElementRef<'a>) -> Result<T, ExtractionError>,
    what: &'static str,
    skipped: &mut usize,
) -> Vec<T> {
    nodes
        .filter_map(|node| match extract(node) {
            Ok(value) => Some(value),
            Err(e) => {
                note_skip(what, &e, skipped);
                None
            }
        })
        .collect()
}

/// Keeps tracks whose number is greater than every number before it.
fn enforce_increasing(tracks: Vec<Track>, skipped: &mut usize) -> Vec<Track> {
    let mut last = 0;
    tracks
        .into_iter()
        .filter(|track| {
            if track.number > last {
                last = track.number;
                true
            } else {
                debug!("Pista fuera de orden descartada: #{} '{}'", track.number, track.title);
                *skipped += 1;
                false
            }
        })
        .collect()
}

fn note_skip(what: &'static str, err: &ExtractionError, skipped: &mut usize) {
    debug!("⚠️ Elemento {} omitido: {}", what, err);
    *skipped += 1;
}
