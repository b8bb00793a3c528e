pub mod caption;
pub mod catalog;
pub mod loaders;
pub mod position;

pub use caption::{season_number, Caption};
pub use catalog::{CounterField, CurrentPointer, EpisodeRecord, SeriesRecord};
pub use loaders::{load_catalog_seed, parse_catalog_seed, CatalogSeed, EpisodeSeed, SeasonSeed, SeriesSeed};
pub use position::{ContentItem, Position};
