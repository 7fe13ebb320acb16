//! CSS-selector based source extractors.
//!
//! Every built-in source is described by a [`SelectorRules`] table: where the
//! article links sit on the main page and where each record field sits on an
//! article page. Relative hrefs are resolved against the source's base URL.

use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use trawl_core::error::AppError;
use trawl_core::models::ArticleRecord;
use trawl_core::registry::ExtractorRegistry;
use trawl_core::traits::SourceExtractor;
use url::Url;

/// Selector table for one source.
#[derive(Debug, Clone, Copy)]
pub struct SelectorRules<'a> {
    /// Base for resolving relative hrefs.
    pub base_url: &'a str,
    /// Article anchors on the main page.
    pub link: &'a str,
    pub title: &'a str,
    pub author_name: &'a str,
    /// Anchor whose `href` is the author's profile.
    pub author_link: &'a str,
    /// Element carrying the publish timestamp.
    pub published: &'a str,
    /// Attribute of `published` holding the RFC 3339 timestamp.
    pub published_attr: &'a str,
}

pub const HABR_ID: &str = "habr";
pub const HABR_SEED: &str = "https://habr.com/ru/articles/";
pub const HABR_RULES: SelectorRules<'static> = SelectorRules {
    base_url: "https://habr.com",
    link: "a.tm-title__link",
    title: "h1.tm-title",
    author_name: "a.tm-user-info__username",
    author_link: "a.tm-user-info__username",
    published: "span.tm-article-datetime-published time",
    published_attr: "datetime",
};

pub const SKILLBOX_ID: &str = "skillbox";
pub const SKILLBOX_SEED: &str = "https://skillbox.ru/media/topic/articles/";
pub const SKILLBOX_RULES: SelectorRules<'static> = SelectorRules {
    base_url: "https://skillbox.ru",
    link: "a.card-articles__body-link",
    title: "h1.article-preview__title",
    author_name: "div.article-author__name",
    author_link: "div.article-author__image a",
    published: "time.info-text",
    published_attr: "datetime",
};

/// A [`SourceExtractor`] driven by a [`SelectorRules`] table.
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    base: Url,
    link: Selector,
    title: Selector,
    author_name: Selector,
    author_link: Selector,
    published: Selector,
    published_attr: String,
}

impl SelectorExtractor {
    /// Compile the rules. Fails on a malformed selector or base URL.
    pub fn new(rules: &SelectorRules<'_>) -> Result<Self, AppError> {
        let base = Url::parse(rules.base_url).map_err(|e| {
            AppError::ConfigError(format!("invalid base URL '{}': {e}", rules.base_url))
        })?;

        Ok(Self {
            base,
            link: selector(rules.link)?,
            title: selector(rules.title)?,
            author_name: selector(rules.author_name)?,
            author_link: selector(rules.author_link)?,
            published: selector(rules.published)?,
            published_attr: rules.published_attr.to_string(),
        })
    }

    fn resolve(&self, href: &str) -> Option<String> {
        self.base.join(href.trim()).ok().map(String::from)
    }
}

impl SourceExtractor for SelectorExtractor {
    fn extract_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let links: Vec<String> = document
            .select(&self.link)
            .filter_map(|el| el.value().attr("href"))
            .filter_map(|href| self.resolve(href))
            .collect();
        tracing::debug!(count = links.len(), base = %self.base, "Extracted article links");
        links
    }

    fn extract_record(&self, html: &str, url: &str) -> ArticleRecord {
        let document = Html::parse_document(html);

        ArticleRecord {
            username: first(&document, &self.author_name)
                .map(text)
                .unwrap_or_default(),
            username_url: first(&document, &self.author_link)
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| self.resolve(href))
                .unwrap_or_default(),
            title: first(&document, &self.title).map(text).unwrap_or_default(),
            url: url.to_string(),
            published_at: first(&document, &self.published)
                .and_then(|el| el.value().attr(&self.published_attr))
                .map(|value| value.trim().to_string())
                .unwrap_or_default(),
            source_id: String::new(),
        }
    }
}

fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css)
        .map_err(|e| AppError::ConfigError(format!("invalid selector '{css}': {e}")))
}

fn first<'a>(document: &'a Html, sel: &Selector) -> Option<ElementRef<'a>> {
    document.select(sel).next()
}

fn text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Registry holding the built-in sources.
pub fn default_registry() -> Result<ExtractorRegistry, AppError> {
    ExtractorRegistry::new()
        .with_source(
            HABR_ID,
            HABR_SEED,
            Arc::new(SelectorExtractor::new(&HABR_RULES)?),
        )?
        .with_source(
            SKILLBOX_ID,
            SKILLBOX_SEED,
            Arc::new(SelectorExtractor::new(&SKILLBOX_RULES)?),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    const HABR_MAIN: &str = r#"
        <html><body>
          <article><h2><a class="tm-title__link" href="/ru/articles/812345/">First</a></h2></article>
          <article><h2><a class="tm-title__link" href="/ru/articles/812346/">Second</a></h2></article>
          <a class="tm-user-info__username" href="/ru/users/bob/">bob</a>
        </body></html>
    "#;

    const HABR_ARTICLE: &str = r#"
        <html><body>
          <a class="tm-user-info__username" href="/ru/users/alice/"> alice </a>
          <span class="tm-article-datetime-published">
            <time datetime="2024-05-01T08:00:00.000Z" title="2024-05-01, 11:00">1 May</time>
          </span>
          <h1 class="tm-title"><span>Writing a harvester</span></h1>
        </body></html>
    "#;

    const SKILLBOX_ARTICLE: &str = r#"
        <html><body>
          <h1 class="article-preview__title">Learning Rust</h1>
          <time class="info-text" datetime="2024-04-30T12:00:00+03:00">30 April</time>
          <div class="article-author">
            <div class="article-author__image"><a href="https://skillbox.ru/media/authors/ivan/"><img/></a></div>
            <div class="article-author__name">Ivan Petrov</div>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_habr_links_are_absolute() {
        let extractor = SelectorExtractor::new(&HABR_RULES).unwrap();
        let links = extractor.extract_links(HABR_MAIN);
        assert_eq!(
            links,
            vec![
                "https://habr.com/ru/articles/812345/",
                "https://habr.com/ru/articles/812346/",
            ]
        );
    }

    #[test]
    fn test_habr_record() {
        let extractor = SelectorExtractor::new(&HABR_RULES).unwrap();
        let url = "https://habr.com/ru/articles/812345/";
        let record = extractor.extract_record(HABR_ARTICLE, url);

        assert_eq!(record.username, "alice");
        assert_eq!(record.username_url, "https://habr.com/ru/users/alice/");
        assert_eq!(record.title, "Writing a harvester");
        assert_eq!(record.url, url);
        assert_eq!(record.published_at, "2024-05-01T08:00:00.000Z");

        let mut record = record;
        record.source_id = HABR_ID.to_string();
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_skillbox_record() {
        let extractor = SelectorExtractor::new(&SKILLBOX_RULES).unwrap();
        let record =
            extractor.extract_record(SKILLBOX_ARTICLE, "https://skillbox.ru/media/code/rust/");

        assert_eq!(record.username, "Ivan Petrov");
        assert_eq!(record.username_url, "https://skillbox.ru/media/authors/ivan/");
        assert_eq!(record.title, "Learning Rust");
        assert_eq!(record.published_at, "2024-04-30T12:00:00+03:00");
    }

    #[test]
    fn test_missing_elements_leave_fields_empty() {
        let extractor = SelectorExtractor::new(&HABR_RULES).unwrap();
        let record = extractor.extract_record("<html><body><p>gone</p></body></html>", "https://habr.com/x");

        assert_eq!(record.url, "https://habr.com/x");
        assert!(record.title.is_empty());
        assert!(record.username.is_empty());
        assert!(record.published_at.is_empty());
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_bad_selector_is_config_error() {
        let rules = SelectorRules {
            link: "a[[",
            ..HABR_RULES
        };
        let err = SelectorExtractor::new(&rules).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_default_registry() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup(HABR_ID).unwrap().seed_url, HABR_SEED);
        assert_eq!(registry.lookup(SKILLBOX_ID).unwrap().seed_url, SKILLBOX_SEED);
    }
}
