//! Day-slot imputation.
//!
//! Both strategies work on one patient and one feature at a time, never look
//! outside the window, and only ever read observed cells. Imputed cells keep
//! the days they were derived from so the original values can always be told
//! apart from filled ones.

use std::cmp::Reverse;

use cts_model::{
    DayOffset, DayWindow, ImputationOptions, ImputationStrategy, ModelError, NeighborWeighting,
    PatientMatrix, SlotGrid,
};

/// Fills vacant (feature, day) cells of a patient matrix.
pub trait Imputer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fills vacant cells inside `window` and returns how many were filled.
    ///
    /// Running it again on its own output fills nothing.
    fn impute(&self, matrix: &mut PatientMatrix, window: DayWindow) -> usize;
}

/// Copies the nearest observed day, looking forward before backward.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestDay {
    grid: SlotGrid,
}

impl NearestDay {
    pub fn new(grid: SlotGrid) -> Self {
        Self { grid }
    }
}

impl Imputer for NearestDay {
    fn name(&self) -> &'static str {
        "nearest"
    }

    fn impute(&self, matrix: &mut PatientMatrix, window: DayWindow) -> usize {
        fill_slots(matrix, window, self.grid, |observed, slot| {
            observed
                .iter()
                .find(|(day, _)| *day > slot)
                .or_else(|| observed.iter().rev().find(|(day, _)| *day < slot))
                .map(|&(day, value)| (value, vec![day]))
        })
    }
}

/// Mean of the `k` observed days closest to the slot.
///
/// Equal distances prefer the later day.
#[derive(Debug, Clone, Copy)]
pub struct NeighborMean {
    k: usize,
    weighting: NeighborWeighting,
    grid: SlotGrid,
}

impl NeighborMean {
    pub fn new(k: usize, weighting: NeighborWeighting, grid: SlotGrid) -> Result<Self, ModelError> {
        if k == 0 {
            return Err(ModelError::InvalidNeighborCount);
        }
        Ok(Self { k, weighting, grid })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    fn estimate(&self, observed: &[(DayOffset, f64)], slot: DayOffset) -> Option<(f64, Vec<DayOffset>)> {
        let mut neighbors: Vec<(u64, DayOffset, f64)> = observed
            .iter()
            .map(|&(day, value)| (day.distance(slot), day, value))
            .collect();
        neighbors.sort_by_key(|&(distance, day, _)| (distance, Reverse(day)));
        neighbors.truncate(self.k);
        if neighbors.is_empty() {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let weight = |distance: u64| match self.weighting {
            NeighborWeighting::Uniform => 1.0,
            NeighborWeighting::Distance => 1.0 / distance.max(1) as f64,
        };
        let total: f64 = neighbors.iter().map(|&(distance, _, _)| weight(distance)).sum();
        let value = neighbors
            .iter()
            .map(|&(distance, _, value)| weight(distance) * value)
            .sum::<f64>()
            / total;

        let mut sources: Vec<DayOffset> = neighbors.iter().map(|&(_, day, _)| day).collect();
        sources.sort_unstable();
        Some((value, sources))
    }
}

impl Imputer for NeighborMean {
    fn name(&self) -> &'static str {
        "knn"
    }

    fn impute(&self, matrix: &mut PatientMatrix, window: DayWindow) -> usize {
        fill_slots(matrix, window, self.grid, |observed, slot| {
            self.estimate(observed, slot)
        })
    }
}

/// Builds the configured imputer.
pub fn imputer_for(options: &ImputationOptions) -> Result<Box<dyn Imputer>, ModelError> {
    Ok(match options.strategy {
        ImputationStrategy::Nearest => Box::new(NearestDay::new(options.grid)),
        ImputationStrategy::Knn => Box::new(NeighborMean::new(
            options.k_neighbors,
            options.weighting,
            options.grid,
        )?),
    })
}

fn slots(matrix: &PatientMatrix, window: DayWindow, grid: SlotGrid) -> Vec<DayOffset> {
    match grid {
        SlotGrid::Observed => matrix
            .days()
            .into_iter()
            .filter(|day| window.contains(*day))
            .collect(),
        SlotGrid::Dense => window.days().collect(),
    }
}

fn fill_slots<F>(matrix: &mut PatientMatrix, window: DayWindow, grid: SlotGrid, estimate: F) -> usize
where
    F: Fn(&[(DayOffset, f64)], DayOffset) -> Option<(f64, Vec<DayOffset>)>,
{
    let slots = slots(matrix, window, grid);
    let mut filled = 0;
    for (_, series) in matrix.series_mut() {
        let observed: Vec<(DayOffset, f64)> = series
            .observed()
            .filter(|(day, _)| window.contains(*day))
            .collect();
        if observed.is_empty() {
            continue;
        }
        for &slot in &slots {
            if series.get(slot).is_some() {
                continue;
            }
            if let Some((value, sources)) = estimate(&observed, slot)
                && series.insert_imputed(slot, value, sources)
            {
                filled += 1;
            }
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use cts_model::{MatrixCell, PatientId};
    use proptest::prelude::*;

    fn window() -> DayWindow {
        DayWindow::new(0, 20).unwrap()
    }

    fn matrix(cells: &[(&str, i64, f64)]) -> PatientMatrix {
        let mut matrix = PatientMatrix::new(PatientId::new("P1").unwrap());
        for &(feature, day, value) in cells {
            matrix.insert_observed(feature, DayOffset::new(day), value);
        }
        matrix
    }

    #[test]
    fn test_nearest_prefers_forward() {
        let mut m = matrix(&[("F", 0, 10.0), ("F", 10, 20.0), ("G", 5, 1.0)]);
        let filled = NearestDay::default().impute(&mut m, window());
        assert_eq!(m.value("F", DayOffset::new(5)), Some(20.0));
        assert_eq!(
            m.series("F").unwrap().get(DayOffset::new(5)),
            Some(&MatrixCell::Imputed {
                value: 20.0,
                sources: vec![DayOffset::new(10)]
            })
        );
        // G is filled on days 0 and 10 from its only value
        assert_eq!(filled, 3);
    }

    #[test]
    fn test_nearest_falls_back_to_backward() {
        let mut m = matrix(&[("F", 0, 10.0), ("G", 5, 1.0)]);
        NearestDay::default().impute(&mut m, window());
        assert_eq!(m.value("F", DayOffset::new(5)), Some(10.0));
    }

    #[test]
    fn test_nothing_is_borrowed_from_outside_the_window() {
        let mut m = matrix(&[("F", 30, 99.0), ("G", 5, 1.0)]);
        let filled = NearestDay::default().impute(&mut m, window());
        assert_eq!(filled, 0);
        assert_eq!(m.value("F", DayOffset::new(5)), None);
    }

    #[test]
    fn test_dense_grid_fills_every_window_day() {
        let mut m = matrix(&[("F", 3, 1.0)]);
        let filled = NearestDay::new(SlotGrid::Dense).impute(&mut m, window());
        assert_eq!(filled, 20);
        assert_eq!(m.series("F").unwrap().len(), 21);
    }

    #[test]
    fn test_knn_single_neighbor_prefers_later_day_on_tie() {
        let mut m = matrix(&[("F", 0, 10.0), ("F", 10, 20.0), ("G", 5, 1.0)]);
        let knn = NeighborMean::new(1, NeighborWeighting::Uniform, SlotGrid::Observed).unwrap();
        knn.impute(&mut m, window());
        assert_eq!(m.value("F", DayOffset::new(5)), Some(20.0));
    }

    #[test]
    fn test_knn_averages_neighbors() {
        let mut m = matrix(&[("F", 0, 10.0), ("F", 10, 20.0), ("G", 5, 1.0)]);
        let knn = NeighborMean::new(7, NeighborWeighting::Uniform, SlotGrid::Observed).unwrap();
        knn.impute(&mut m, window());
        assert_eq!(m.value("F", DayOffset::new(5)), Some(15.0));
        assert_eq!(
            m.series("F").unwrap().get(DayOffset::new(5)),
            Some(&MatrixCell::Imputed {
                value: 15.0,
                sources: vec![DayOffset::new(0), DayOffset::new(10)]
            })
        );
    }

    #[test]
    fn test_knn_distance_weighting() {
        let mut m = matrix(&[("F", 0, 10.0), ("F", 6, 40.0), ("G", 4, 1.0)]);
        let knn = NeighborMean::new(2, NeighborWeighting::Distance, SlotGrid::Observed).unwrap();
        knn.impute(&mut m, window());
        // weights 1/4 and 1/2
        let expected = (10.0 * 0.25 + 40.0 * 0.5) / 0.75;
        let value = m.value("F", DayOffset::new(4)).unwrap();
        assert!((value - expected).abs() < 1e-9);
    }

    #[test]
    fn test_zero_neighbors_is_rejected() {
        assert!(NeighborMean::new(0, NeighborWeighting::Uniform, SlotGrid::Observed).is_err());
        let options = ImputationOptions {
            strategy: ImputationStrategy::Knn,
            k_neighbors: 0,
            ..ImputationOptions::default()
        };
        assert!(imputer_for(&options).is_err());
        assert_eq!(
            imputer_for(&ImputationOptions::default()).unwrap().name(),
            "nearest"
        );
    }

    fn arb_matrix() -> impl Strategy<Value = PatientMatrix> {
        prop::collection::vec((0usize..3, -5i64..30, -100.0f64..100.0), 0..40).prop_map(|cells| {
            let mut matrix = PatientMatrix::new(PatientId::new("P").unwrap());
            for (feature, day, value) in cells {
                matrix.insert_observed(["A", "B", "C"][feature], DayOffset::new(day), value);
            }
            matrix
        })
    }

    proptest! {
        #[test]
        fn prop_imputation_is_idempotent(
            m in arb_matrix(),
            knn in any::<bool>(),
            dense in any::<bool>(),
        ) {
            let grid = if dense { SlotGrid::Dense } else { SlotGrid::Observed };
            let imputer: Box<dyn Imputer> = if knn {
                Box::new(NeighborMean::new(3, NeighborWeighting::Distance, grid).unwrap())
            } else {
                Box::new(NearestDay::new(grid))
            };
            let mut once = m.restrict(window());
            imputer.impute(&mut once, window());
            let mut twice = once.clone();
            prop_assert_eq!(imputer.impute(&mut twice, window()), 0);
            prop_assert_eq!(twice, once);
        }

        #[test]
        fn prop_observed_cells_survive(m in arb_matrix()) {
            let restricted = m.restrict(window());
            let mut imputed = restricted.clone();
            NearestDay::default().impute(&mut imputed, window());
            prop_assert_eq!(imputed.observed_only(), restricted);
        }
    }
}
