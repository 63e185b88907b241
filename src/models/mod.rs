mod entry;
mod item;

pub use entry::{FetchedFeed, RawEntry, RawMedia, RawThumbnail};
pub use item::{Item, ItemFilter, ItemSummary, Media, SaveOutcome, StoredItem, Thumbnail};
