pub mod queries;
pub mod view;

pub use queries::{DailyFare, DailyRevenue, DailyTripCount, HourlyDuration};
pub use view::{TripsView, UpperBound};
