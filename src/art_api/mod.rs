pub mod fetcher;

pub use fetcher::ArtFetcher;
