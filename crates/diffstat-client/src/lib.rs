pub mod extractor;
pub mod fetcher;
pub mod listing;

pub use extractor::{ScraperExtractor, fragment_text};
pub use fetcher::ReqwestFetcher;
pub use listing::{ListingParser, ListingSource, PageStore, RowView};
