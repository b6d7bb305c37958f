pub mod batch;
pub mod cleaner;

pub use batch::BatchCleaner;
pub use cleaner::{CleaningReport, TripCleaner};
