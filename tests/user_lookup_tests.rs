mod common;

use aoty_api::models::RatingBucket;
use aoty_api::LookupError;
use common::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn test_profile_record() {
    let fetcher = Arc::new(site());
    let service = service_with(&test_config(), fetcher);

    let user = service.lookup_user("evrynoiseatonce").await.unwrap();

    assert_eq!(user.username, "evrynoiseatonce");
    assert_eq!(user.location.as_deref(), Some("Oxford, United Kingdom"));
    assert_eq!(user.member_since.as_deref(), Some("March 2019"));
    assert_eq!(user.stats.ratings, 1532);
    assert_eq!(user.stats.followers, 87);
    assert_eq!(user.favorite_albums, vec!["OK Computer", "In Rainbows"]);
    assert_eq!(
        user.social_links.get("twitter").map(String::as_str),
        Some("https://twitter.com/evrynoiseatonce")
    );

    assert_eq!(user.rating_distribution.get(RatingBucket::Eighties), Some(611));
    assert_eq!(user.rating_distribution.total(), 14 + 203 + 611 + 480);
}

#[tokio::test]
async fn test_recent_reviews_are_limited_and_best_effort() {
    let fetcher = Arc::new(site());
    let service = service_with(&test_config(), fetcher);

    let user = service.lookup_user("evrynoiseatonce").await.unwrap();

    // Cinco filas leídas; la de rating 101 se descarta
    let titles: Vec<&str> = user
        .recent_reviews
        .iter()
        .map(|r| r.album_title.as_str())
        .collect();
    assert_eq!(titles, vec!["Kid A", "Dummy", "Blue Lines", "Loveless"]);
    assert_eq!(user.recent_reviews[0].likes, 12);
    assert_eq!(user.recent_reviews[0].timestamp, "2w");

    // Reseña inválida + etiqueta de distribución desconocida
    assert_eq!(service.metrics().partial_losses, 2);
}

#[tokio::test]
async fn test_nonexistent_user_is_not_found_without_error() {
    let fetcher = Arc::new(site());
    let service = service_with(&test_config(), fetcher.clone());

    let err = service.lookup_user("nonexistent").await.unwrap_err();
    assert_eq!(err, LookupError::NotFound("user 'nonexistent'".into()));

    let snap = service.metrics();
    assert_eq!(snap.errors, 0);
    assert_eq!(snap.total_requests, 1);

    // Respuesta negativa recordada
    let again = service.lookup_user("NonExistent").await.unwrap_err();
    assert_eq!(again.code(), "not_found");
    assert_eq!(fetcher.fetches_of(USER_MISSING), 1);
    assert_eq!(service.metrics().negative_hits, 1);
}

#[tokio::test]
async fn test_negative_caching_can_be_disabled() {
    let fetcher = Arc::new(site());
    let config = aoty_api::Config {
        negative_ttl: 0,
        ..test_config()
    };
    let service = service_with(&config, fetcher.clone());

    for _ in 0..2 {
        assert!(service.lookup_user("nonexistent").await.is_err());
    }

    assert_eq!(fetcher.fetches_of(USER_MISSING), 2);
    assert_eq!(service.metrics().negative_hits, 0);
}
