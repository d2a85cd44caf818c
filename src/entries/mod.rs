//! Workout entries: validation of new entries and history series.

pub mod handlers;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::num::NonZeroUsize;

use crate::config::TrainingConfig;
use crate::db::models::{GymEntry, NewGymEntry, WorkoutType};
use crate::error::AppError;
use crate::stats::resample;

pub const DEFAULT_HISTORY_SAMPLES: usize = 30;
pub const MAX_HISTORY_SAMPLES: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub workout_type: WorkoutType,
    pub points: i32,
}

impl EntryRequest {
    /// Checks the points budget and pins the entry to its calendar day.
    pub fn into_new_entry(
        self,
        user_id: i64,
        training: &TrainingConfig,
    ) -> Result<NewGymEntry, AppError> {
        let max_points = training.max_points_per_entry() as i32;
        if self.points < 1 || self.points > max_points {
            return Err(AppError::ValidationError(format!(
                "points must be between 1 and {}",
                max_points
            )));
        }

        Ok(NewGymEntry {
            user_id,
            date: self.date.date_naive(),
            points: self.points,
            workout_type: self.workout_type,
        })
    }
}

/// Points per entry, in stored order, resized to `samples` values.
pub fn history_series(entries: &[GymEntry], samples: NonZeroUsize) -> Result<Vec<f64>, AppError> {
    if samples.get() > MAX_HISTORY_SAMPLES {
        return Err(AppError::ValidationError(format!(
            "samples must be at most {}",
            MAX_HISTORY_SAMPLES
        )));
    }

    let points: Vec<f64> = entries.iter().map(|e| f64::from(e.points)).collect();
    Ok(resample(&points, samples))
}
