use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One cleaned taxi trip. Field names follow the published dataset schema
/// minus the columns the cleaner removes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TripRecord {
    pub vendor_id: i32,
    pub tpep_pickup_datetime: NaiveDateTime,
    pub tpep_dropoff_datetime: NaiveDateTime,
    pub passenger_count: Option<i64>,
    #[validate(range(exclusive_min = 0.0))]
    pub trip_distance: f64,
    pub do_location_id: Option<i32>,
    pub payment_type: Option<i64>,
    pub fare_amount: f64,
    pub mta_tax: f64,
    pub tip_amount: f64,
    pub tolls_amount: f64,
    pub improvement_surcharge: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub total_amount: f64,
    #[validate(range(min = 0.0))]
    pub congestion_surcharge: f64,
    pub airport_fee: Option<f64>,
}

impl TripRecord {
    /// Trip duration in fractional minutes, negative if dropoff precedes pickup
    pub fn duration_minutes(&self) -> f64 {
        let delta = self
            .tpep_dropoff_datetime
            .signed_duration_since(self.tpep_pickup_datetime);
        delta.num_seconds() as f64 / 60.0
    }

    /// Row-level mirror of the cleaner's columnar quality filter
    pub fn passes_quality_filters(&self) -> bool {
        self.trip_distance > 0.0 && self.total_amount > 0.0 && self.congestion_surcharge >= 0.0
    }
}

/// Builds trip records for fixtures; defaults describe a plausible short trip.
pub struct TripRecordBuilder {
    record: TripRecord,
}

impl TripRecordBuilder {
    pub fn new(pickup: NaiveDateTime, dropoff: NaiveDateTime) -> Self {
        Self {
            record: TripRecord {
                vendor_id: 2,
                tpep_pickup_datetime: pickup,
                tpep_dropoff_datetime: dropoff,
                passenger_count: Some(1),
                trip_distance: 1.2,
                do_location_id: Some(141),
                payment_type: Some(1),
                fare_amount: 10.0,
                mta_tax: 0.5,
                tip_amount: 2.0,
                tolls_amount: 0.0,
                improvement_surcharge: 1.0,
                total_amount: 16.0,
                congestion_surcharge: 2.5,
                airport_fee: None,
            },
        }
    }

    pub fn trip_distance(mut self, miles: f64) -> Self {
        self.record.trip_distance = miles;
        self
    }

    pub fn total_amount(mut self, amount: f64) -> Self {
        self.record.total_amount = amount;
        self
    }

    pub fn congestion_surcharge(mut self, surcharge: f64) -> Self {
        self.record.congestion_surcharge = surcharge;
        self
    }

    pub fn fare_amount(mut self, fare: f64) -> Self {
        self.record.fare_amount = fare;
        self
    }

    pub fn vendor_id(mut self, vendor_id: i32) -> Self {
        self.record.vendor_id = vendor_id;
        self
    }

    pub fn build(self) -> TripRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn datetime(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    #[test]
    fn test_builder_defaults_are_valid() {
        let record = TripRecordBuilder::new(datetime(1, 8, 0), datetime(1, 8, 15)).build();
        assert!(record.validate().is_ok());
        assert!(record.passes_quality_filters());
    }

    #[test]
    fn test_invariants_reject_bad_records() {
        let zero_distance = TripRecordBuilder::new(datetime(1, 8, 0), datetime(1, 8, 15))
            .trip_distance(0.0)
            .build();
        assert!(zero_distance.validate().is_err());
        assert!(!zero_distance.passes_quality_filters());

        let negative_total = TripRecordBuilder::new(datetime(1, 8, 0), datetime(1, 8, 15))
            .total_amount(-3.0)
            .build();
        assert!(negative_total.validate().is_err());

        let negative_surcharge = TripRecordBuilder::new(datetime(1, 8, 0), datetime(1, 8, 15))
            .congestion_surcharge(-2.5)
            .build();
        assert!(negative_surcharge.validate().is_err());

        // Zero surcharge is allowed, unlike zero distance or amount
        let zero_surcharge = TripRecordBuilder::new(datetime(1, 8, 0), datetime(1, 8, 15))
            .congestion_surcharge(0.0)
            .build();
        assert!(zero_surcharge.validate().is_ok());
    }

    #[test]
    fn test_duration_minutes() {
        let record = TripRecordBuilder::new(datetime(1, 23, 50), datetime(2, 0, 20)).build();
        assert_eq!(record.duration_minutes(), 30.0);
    }
}
