/// Timestamp columns normalized by the cleaner
pub const PICKUP_COL: &str = "tpep_pickup_datetime";
pub const DROPOFF_COL: &str = "tpep_dropoff_datetime";

/// Columns the quality filter is applied to
pub const DISTANCE_COL: &str = "trip_distance";
pub const TOTAL_AMOUNT_COL: &str = "total_amount";
pub const SURCHARGE_COL: &str = "congestion_surcharge";

/// Columns removed from every cleaned partition
pub const DROPPED_COLUMNS: [&str; 4] = ["extra", "store_and_fwd_flag", "RatecodeID", "PULocationID"];

/// Minimum schema a raw monthly file must provide
pub const REQUIRED_COLUMNS: [&str; 5] = [
    PICKUP_COL,
    DROPOFF_COL,
    DISTANCE_COL,
    TOTAL_AMOUNT_COL,
    SURCHARGE_COL,
];

/// Logical relation exposed by the dataset view
pub const TRIPS_TABLE: &str = "trips";

/// Published monthly dataset location
pub const TRIP_DATA_BASE_URL: &str = "https://d37ci6vzurychx.cloudfront.net/trip-data";
pub const SOURCE_FILE_PREFIX: &str = "yellow_tripdata_";
pub const CLEANED_FILE_PREFIX: &str = "taxi_cleaned_";

/// Directory defaults
pub const DEFAULT_RAW_DIR: &str = "data/raw";
pub const DEFAULT_CLEANED_DIR: &str = "data/cleaned";

/// Processing defaults
pub const DEFAULT_BATCH_SIZE: usize = 8192;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
