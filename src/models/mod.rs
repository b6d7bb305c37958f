pub mod trip;

pub use trip::{TripRecord, TripRecordBuilder};
