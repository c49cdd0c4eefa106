use diffstat_core::error::AppError;
use diffstat_core::models::Fragment;
use diffstat_core::traits::FragmentExtractor;
use scraper::{Html, Selector};

/// Where a pull-request page renders its diffstat.
pub const DEFAULT_DIFFSTAT_SELECTOR: &str = ".tabnav-extra > .diffstat";

/// Fragment extractor backed by a CSS selector.
///
/// Returns the inner HTML of the first element matching the selector.
#[derive(Clone)]
pub struct ScraperExtractor {
    selector: Selector,
}

impl ScraperExtractor {
    pub fn new() -> Result<Self, AppError> {
        Self::with_selector(DEFAULT_DIFFSTAT_SELECTOR)
    }

    pub fn with_selector(selector: &str) -> Result<Self, AppError> {
        let selector = Selector::parse(selector)
            .map_err(|e| AppError::ConfigError(format!("Invalid selector '{selector}': {e}")))?;
        Ok(Self { selector })
    }
}

impl FragmentExtractor for ScraperExtractor {
    fn extract(&self, html: &str) -> Result<Option<Fragment>, AppError> {
        let document = Html::parse_document(html);
        Ok(document
            .select(&self.selector)
            .next()
            .map(|element| Fragment(element.inner_html().trim().to_string())))
    }
}

/// Visible text of a fragment with whitespace collapsed, for terminal output.
pub fn fragment_text(fragment: &str) -> String {
    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
