use burn::data::dataset::Dataset;

use crate::data::joiner::JoinedFoodRow;
use crate::domain::features::{
    self, Stage, ATTENDANCE_FEATURE_NAMES, FOOD_FEATURE_NAMES,
};
use crate::domain::records::AttendanceRecord;

/// One training example: a stage's feature vector and its label.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularSample {
    pub features: Vec<f32>,
    pub target:   f32,
}

pub struct TabularDataset {
    stage:   Stage,
    samples: Vec<TabularSample>,
}

impl TabularDataset {
    pub fn new(stage: Stage, samples: Vec<TabularSample>) -> Self { Self { stage, samples } }

    /// Stage-1 rows: calendar/weather features → total_customers
    pub fn attendance(records: &[AttendanceRecord]) -> Self {
        let samples = records
            .iter()
            .map(|r| TabularSample {
                features: features::encode_attendance_features(
                    r.date,
                    r.temperature,
                    r.rainfall,
                    r.is_holiday,
                    r.advertising_flag,
                    r.tourist_season_flag,
                ).to_vec(),
                target: r.total_customers as f32,
            })
            .collect();
        Self::new(Stage::Attendance, samples)
    }

    /// Stage-2 rows: joined dish/day features → total_sales
    pub fn food(rows: &[JoinedFoodRow]) -> Self {
        let samples = rows
            .iter()
            .map(|row| TabularSample {
                features: features::food_training_features(
                    row.attendance.date,
                    row.attendance.temperature,
                    row.attendance.is_holiday,
                    row.attendance.total_customers,
                    row.attendance.delivery_orders,
                    row.food.price,
                    row.food.availability_flag,
                ).to_vec(),
                target: row.food.total_sales as f32,
            })
            .collect();
        Self::new(Stage::Food, samples)
    }

    pub fn stage(&self) -> Stage { self.stage }

    pub fn feature_names(&self) -> &'static [&'static str] {
        match self.stage {
            Stage::Attendance => &ATTENDANCE_FEATURE_NAMES,
            Stage::Food       => &FOOD_FEATURE_NAMES,
        }
    }

    pub fn into_samples(self) -> Vec<TabularSample> { self.samples }
}

// ─── Burn Dataset Trait Implementation ────────────────────────────────────────
impl Dataset<TabularSample> for TabularDataset {
    fn get(&self, index: usize) -> Option<TabularSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::tests::{attendance, food};

    #[test]
    fn test_attendance_rows_use_the_encoder() {
        let day = attendance("2024-07-15", 42);
        let ds  = TabularDataset::attendance(&[day]);
        assert_eq!(ds.len(), 1);
        let sample = ds.get(0).unwrap();
        assert_eq!(sample.features, vec![0.0, 22.0, 0.0, 0.0, 3.0, 0.0, 0.0]);
        assert_eq!(sample.target, 42.0);
    }

    #[test]
    fn test_food_rows_carry_observed_attendance() {
        let row = JoinedFoodRow {
            food:       food("2024-07-15", "moussaka", 17),
            attendance: attendance("2024-07-15", 80),
        };
        let ds = TabularDataset::food(&[row]);
        let sample = ds.get(0).unwrap();
        // customers = 80, delivery_orders = 80 / 4
        assert_eq!(sample.features, vec![0.0, 22.0, 0.0, 3.0, 80.0, 20.0, 11.5, 1.0]);
        assert_eq!(sample.target, 17.0);
        assert_eq!(ds.feature_names().len(), sample.features.len());
    }
}
