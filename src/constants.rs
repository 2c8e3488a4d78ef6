// src/constants.rs

// --- Time Constants ---
pub const DAY_SECONDS: i64 = 86400;

// --- Confidence Tracking ---
pub const CONFIDENCE_MIN: i64 = 0;
pub const CONFIDENCE_MAX: i64 = 100;
pub const CONFIDENCE_BASELINE: i64 = 0; // New records start here

pub const CONFIDENCE_DELTA_SOLVED: i64 = 20;
pub const CONFIDENCE_DELTA_STRUGGLING: i64 = -10;

// --- Review Bands ---
// Lower bound (inclusive) of each band, evaluated on post-update confidence.
pub const BAND_LOW_FLOOR: i64 = 40;
pub const BAND_MID_FLOOR: i64 = 60;
pub const BAND_HIGH_FLOOR: i64 = 80;

// Interval (days) per band
pub const INTERVAL_WEAK: i64 = 1; // 0-39
pub const INTERVAL_LOW: i64 = 3; // 40-59
pub const INTERVAL_MID: i64 = 7; // 60-79
pub const INTERVAL_HIGH: i64 = 14; // 80-100

// Struggling always comes back tomorrow, whatever the band says.
pub const INTERVAL_STRUGGLING: i64 = 1;
