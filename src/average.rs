use crate::{
    datatypes::{BoundaryVectorField, Mesh},
    error::TawssError,
};

/// Running time-average of the wall traction field.
///
/// Holds the raw running sum and the snapshot count separately, so the same
/// storage never does double duty as both sum and average. After k updates
/// the emitted field is exactly `(1/k) * sum` of the first k snapshots, in
/// step-sequential summation order.
pub struct RunningAverage {
    sum: BoundaryVectorField,
    count: usize,
}

impl RunningAverage {
    /// Creates a zero-valued accumulator shaped like the mesh boundary
    pub fn new(mesh: &Mesh) -> RunningAverage {
        RunningAverage {
            sum: BoundaryVectorField::zero(mesh),
            count: 0,
        }
    }

    /// Folds one traction snapshot into the sum and returns the cumulative
    /// average over every snapshot seen so far. All-zero snapshots from
    /// missing inputs count toward the denominator like any other.
    pub fn update(
        &mut self,
        snapshot: &BoundaryVectorField,
    ) -> Result<BoundaryVectorField, TawssError> {
        if !self.sum.same_shape(snapshot) {
            return Err(TawssError::Case(
                "Traction snapshot does not match the accumulated field layout".to_owned(),
            ));
        }

        for (sum_patch, snapshot_patch) in std::iter::zip(&mut self.sum.patches, &snapshot.patches)
        {
            for (sum, value) in std::iter::zip(sum_patch, snapshot_patch) {
                *sum += value;
            }
        }
        self.count += 1;

        let count = self.count as f64;
        Ok(BoundaryVectorField {
            patches: self
                .sum
                .patches
                .iter()
                .map(|patch| patch.iter().map(|v| v / count).collect())
                .collect(),
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{BoundaryPatch, Face};
    use nalgebra::Vector3;

    fn two_face_mesh() -> Mesh {
        let face = |cell| Face {
            area: Vector3::new(0.0, -1.0, 0.0),
            area_mag: 1.0,
            cell,
            distance: 0.1,
        };

        Mesh {
            cells: 2,
            patches: vec![BoundaryPatch {
                name: "wall".to_owned(),
                faces: vec![face(0), face(1)],
            }],
        }
    }

    fn snapshot(a: Vector3<f64>, b: Vector3<f64>) -> BoundaryVectorField {
        BoundaryVectorField {
            patches: vec![vec![a, b]],
        }
    }

    #[test]
    fn average_equals_arithmetic_mean_for_any_k() {
        let mesh = two_face_mesh();
        let mut accumulator = RunningAverage::new(&mesh);

        let snapshots = vec![
            snapshot(Vector3::new(1.0, -2.0, 0.5), Vector3::new(0.0, 4.0, 1.0)),
            snapshot(Vector3::new(-3.0, 1.0, 2.5), Vector3::new(2.0, -1.0, 0.0)),
            snapshot(Vector3::new(0.5, 0.5, 0.5), Vector3::new(1.0, 1.0, 1.0)),
            snapshot(Vector3::new(7.0, 0.0, -1.0), Vector3::new(-2.0, 3.0, 4.0)),
        ];

        let mut running_sum = vec![Vector3::zeros(), Vector3::zeros()];
        for (k, snap) in snapshots.iter().enumerate() {
            let average = accumulator.update(snap).unwrap();

            for (face, sum) in running_sum.iter_mut().enumerate() {
                *sum += snap.patches[0][face];
                let expected = *sum / (k + 1) as f64;
                assert!((average.patches[0][face] - expected).norm() < 1.0e-14);
            }
        }

        assert_eq!(accumulator.count(), 4);
    }

    #[test]
    fn zero_snapshots_still_count_toward_the_denominator() {
        let mesh = two_face_mesh();
        let mut accumulator = RunningAverage::new(&mesh);

        accumulator
            .update(&snapshot(Vector3::new(6.0, 0.0, 0.0), Vector3::zeros()))
            .unwrap();
        let average = accumulator
            .update(&snapshot(Vector3::zeros(), Vector3::zeros()))
            .unwrap();

        assert!((average.patches[0][0].x - 3.0).abs() < 1.0e-14);
    }

    #[test]
    fn matches_the_three_step_reference_sequence() {
        let mesh = two_face_mesh();
        let mut accumulator = RunningAverage::new(&mesh);

        let first = accumulator
            .update(&snapshot(Vector3::new(1.0, 0.0, 0.0), Vector3::zeros()))
            .unwrap();
        assert!((first.patches[0][0] - Vector3::new(1.0, 0.0, 0.0)).norm() < 1.0e-14);

        let second = accumulator
            .update(&snapshot(Vector3::new(3.0, 0.0, 0.0), Vector3::zeros()))
            .unwrap();
        assert!((second.patches[0][0] - Vector3::new(2.0, 0.0, 0.0)).norm() < 1.0e-14);

        // third timestep has no input fields; its snapshot is all zero
        let third = accumulator
            .update(&snapshot(Vector3::zeros(), Vector3::zeros()))
            .unwrap();
        assert!((third.patches[0][0] - Vector3::new(4.0 / 3.0, 0.0, 0.0)).norm() < 1.0e-14);
    }

    #[test]
    fn mismatched_snapshot_shape_is_an_error() {
        let mesh = two_face_mesh();
        let mut accumulator = RunningAverage::new(&mesh);

        let narrow = BoundaryVectorField {
            patches: vec![vec![Vector3::zeros()]],
        };
        assert!(accumulator.update(&narrow).is_err());
    }
}
