pub mod browser;
pub mod details;
pub mod error;
pub mod fis;
pub mod period;
pub mod prompt;
pub mod summary;

pub use error::RaceError;
pub use fis::{FisScraper, FisScraperBuilder, RaceInfo};
