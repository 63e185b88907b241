mod fetcher;
mod markup;
mod normalize;
mod opml_import;

pub use fetcher::{parse_document, FeedFetcher, FeedSource, MAX_FEED_SIZE};
pub use normalize::{normalize, normalize_at, PREMIUM_FLAG};
pub use opml_import::{parse_opml, parse_opml_file};
