pub mod aoty;

use async_trait::async_trait;
use url::Url;

use crate::error::TransportError;

pub use aoty::AotyClient;

/// Trait común para cualquier transporte de documentos
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Descarga el documento en `locator`
    async fn fetch(&self, locator: &str) -> Result<RawDocument, TransportError>;

    /// Nombre del transporte, para logs
    fn source_name(&self) -> &'static str;
}

/// Página descargada, todavía sin parsear
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    locator: String,
    body: String,
}

impl RawDocument {
    pub fn new(locator: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            body: body.into(),
        }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Builds the page URLs the pipeline needs from the site root.
#[derive(Debug, Clone)]
pub struct Locators {
    base: Url,
}

impl Locators {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `{base}/search/albums/?q=<artist album>`
    pub fn album_search(&self, artist: &str, album: &str) -> String {
        format!(
            "{}/search/albums/?q={}",
            self.root(),
            urlencoding::encode(&format!("{artist} {album}"))
        )
    }

    /// `{base}/user/<username>/`
    pub fn user_profile(&self, username: &str) -> String {
        format!("{}/user/{}/", self.root(), urlencoding::encode(username))
    }

    /// Página de álbumes similares de un álbum ya resuelto
    pub fn similar(&self, album_locator: &str) -> String {
        if album_locator.ends_with('/') {
            format!("{album_locator}similar/")
        } else {
            format!("{album_locator}/similar/")
        }
    }

    fn root(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locators() -> Locators {
        Locators::new(Url::parse("https://www.albumoftheyear.org/").unwrap())
    }

    #[test]
    fn test_album_search_is_encoded() {
        assert_eq!(
            locators().album_search("radiohead", "ok computer"),
            "https://www.albumoftheyear.org/search/albums/?q=radiohead%20ok%20computer"
        );
    }

    #[test]
    fn test_user_and_similar_locators() {
        let locators = locators();
        assert_eq!(
            locators.user_profile("evrynoiseatonce"),
            "https://www.albumoftheyear.org/user/evrynoiseatonce/"
        );
        assert_eq!(
            locators.similar("https://www.albumoftheyear.org/album/1-ok.php"),
            "https://www.albumoftheyear.org/album/1-ok.php/similar/"
        );
        assert_eq!(
            locators.similar("https://www.albumoftheyear.org/album/1/"),
            "https://www.albumoftheyear.org/album/1/similar/"
        );
    }
}
