mod common;

use aoty_api::assembler::RecordAssembler;
use aoty_api::{LookupError, RawDocument};
use common::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use url::Url;

#[tokio::test]
async fn test_ok_computer_record() {
    let fetcher = Arc::new(site());
    let service = service_with(&test_config(), fetcher.clone());

    let album = service.lookup_album("radiohead", "ok computer").await.unwrap();

    assert_eq!(album.title, "OK Computer");
    assert_eq!(album.artist, "Radiohead");
    assert_eq!(album.num_ratings, 13);
    assert_eq!(album.user_score, Some(92.6));
    assert!(album.is_must_hear);

    let numbers: Vec<u32> = album.tracks.iter().map(|t| t.number).collect();
    assert_eq!(numbers, (1..=12).collect::<Vec<_>>());
    assert_eq!(album.tracks[1].title, "Paranoid Android");
    assert_eq!(album.tracks[1].length.as_deref(), Some("6:23"));
    assert_eq!(album.tracks[6].rating, Some(62));

    let buy: Vec<&str> = album.buy_links.iter().map(|l| l.platform.as_str()).collect();
    assert_eq!(buy, vec!["Amazon", "Apple Music"]);

    assert_eq!(fetcher.fetches(), 2);
}

#[tokio::test]
async fn test_review_without_text_is_dropped() {
    let fetcher = Arc::new(site());
    let service = service_with(&test_config(), fetcher);

    let album = service.lookup_album("Radiohead", "OK Computer").await.unwrap();

    assert_eq!(album.critic_reviews.len(), 13);
    assert!(album.critic_reviews.iter().all(|r| r.rating.is_some()));
    assert!(album
        .critic_reviews
        .iter()
        .all(|r| r.publication.as_deref() != Some("Mojo")));
    assert_eq!(album.critic_reviews[0].author, "Ryan Schreiber");

    // El resto del registro sigue completo
    assert_eq!(album.tracks.len(), 12);
    assert_eq!(album.popular_reviews.len(), 2);
    assert_eq!(album.popular_reviews[0].likes, 1204);
    assert_eq!(album.popular_reviews[1].rating, None);

    assert_eq!(service.metrics().partial_losses, 1);
}

#[tokio::test]
async fn test_unknown_album_is_not_found() {
    let fetcher = Arc::new(
        FixtureFetcher::new().page(
            "https://www.albumoftheyear.org/search/albums/?q=nobody%20nothing",
            "<html><body><h1>Albums</h1><p>No results found.</p></body></html>",
        ),
    );
    let service = service_with(&test_config(), fetcher);

    let err = service.lookup_album("Nobody", "Nothing").await.unwrap_err();

    assert!(matches!(err, LookupError::NotFound(_)));
    assert_eq!(err.http_status(), 404);
    assert_eq!(service.metrics().errors, 0);
}

#[tokio::test]
async fn test_non_album_page_fails_assembly() {
    let fetcher = Arc::new(
        site().page(ALBUM_OK_COMPUTER, "<html><body><p>Maintenance</p></body></html>"),
    );
    let service = service_with(&test_config(), fetcher);

    let err = service.lookup_album("Radiohead", "OK Computer").await.unwrap_err();

    assert_eq!(err.code(), "assembly_failed");
    assert_eq!(service.metrics().errors, 1);
}

#[test]
fn test_assembly_is_idempotent() {
    let assembler = RecordAssembler::new(Url::parse("https://www.albumoftheyear.org").unwrap(), 5);
    let doc = RawDocument::new(ALBUM_OK_COMPUTER, ALBUM_OK_COMPUTER_HTML);

    let first = assembler.assemble_album(&doc, None).unwrap();
    let second = assembler.assemble_album(&doc, None).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_vec(&first.record).unwrap(),
        serde_json::to_vec(&second.record).unwrap()
    );
}
