pub mod toml_loader;

pub use toml_loader::{
    load_catalog_seed, parse_catalog_seed, CatalogSeed, EpisodeSeed, SeasonSeed, SeriesSeed,
};
