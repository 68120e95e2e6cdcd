use nalgebra::Vector3;

use crate::{
    case::Case,
    closure::{ClosureModel, CompressibleClosure, IncompressibleClosure},
    datatypes::{
        BoundaryTensorField, BoundaryVectorField, FlowRegime, Mesh, ScalarField, ThermoProperties,
        TransportProperties, VectorField,
    },
    error::TawssError,
};

/// Computes the per-timestep wall traction (WSS) field. The two regime
/// variants share this contract and are selected once at startup; both are
/// pure functions of their inputs with no state across timesteps.
pub trait TractionCalculator {
    /// Name of the auxiliary field this regime requires ("mu" or "rho").
    /// The driver probes for it before invoking `compute`.
    fn aux_field(&self) -> &'static str;

    fn compute(
        &self,
        mesh: &Mesh,
        velocity: &VectorField,
        aux: &ScalarField,
    ) -> Result<BoundaryVectorField, TawssError>;
}

/// Builds the traction calculator for the configured regime, reading the
/// regime's configuration from the case.
pub fn for_regime(
    regime: FlowRegime,
    case: &Case,
) -> Result<Box<dyn TractionCalculator>, TawssError> {
    match regime {
        FlowRegime::Incompressible => Ok(Box::new(IncompressibleTraction {
            transport: case.read_transport()?,
        })),
        FlowRegime::Compressible => Ok(Box::new(CompressibleTraction {
            thermo: case.read_thermo()?,
        })),
    }
}

/// Incompressible variant: the closure works in kinematic units, so the
/// projected stress is scaled by the constant transport density.
pub struct IncompressibleTraction {
    pub transport: TransportProperties,
}

impl TractionCalculator for IncompressibleTraction {
    fn aux_field(&self) -> &'static str {
        "mu"
    }

    fn compute(
        &self,
        mesh: &Mesh,
        velocity: &VectorField,
        aux: &ScalarField,
    ) -> Result<BoundaryVectorField, TawssError> {
        let closure = IncompressibleClosure::new(aux, self.transport.rho);
        let stress = closure.effective_stress(mesh, velocity)?;

        project_traction(mesh, &stress, self.transport.rho)
    }
}

/// Compressible variant: density is already embedded in the stress tensor,
/// so no extra scaling is applied.
pub struct CompressibleTraction {
    pub thermo: ThermoProperties,
}

impl TractionCalculator for CompressibleTraction {
    fn aux_field(&self) -> &'static str {
        "rho"
    }

    fn compute(
        &self,
        mesh: &Mesh,
        velocity: &VectorField,
        aux: &ScalarField,
    ) -> Result<BoundaryVectorField, TawssError> {
        let closure = CompressibleClosure::new(aux, self.thermo.nu);
        let stress = closure.effective_stress(mesh, velocity)?;

        project_traction(mesh, &stress, 1.0)
    }
}

/// Projects an effective stress tensor field into a wall traction field:
/// `scale * (-area / |area|) . stress` per boundary face.
///
/// A face with zero area magnitude makes the projection undefined and is a
/// fatal geometry error; the run must abort rather than emit NaN.
pub fn project_traction(
    mesh: &Mesh,
    stress: &BoundaryTensorField,
    scale: f64,
) -> Result<BoundaryVectorField, TawssError> {
    let mut patches: Vec<Vec<Vector3<f64>>> = Vec::with_capacity(mesh.patches.len());

    for (patch_idx, patch) in mesh.patches.iter().enumerate() {
        let mut tractions: Vec<Vector3<f64>> = Vec::with_capacity(patch.faces.len());
        for (face_idx, face) in patch.faces.iter().enumerate() {
            if face.area_mag == 0.0 {
                return Err(TawssError::Geometry(format!(
                    "Zero-area face {} on patch {}; wall traction is undefined",
                    face_idx, patch.name
                )));
            }

            let normal = face.area / face.area_mag;
            let tensor = &stress.patches[patch_idx][face_idx];

            tractions.push(scale * (tensor * -normal));
        }
        patches.push(tractions);
    }

    Ok(BoundaryVectorField { patches })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{BoundaryPatch, Face};
    use nalgebra::Matrix3;

    fn wall_mesh(area: Vector3<f64>) -> Mesh {
        Mesh {
            cells: 1,
            patches: vec![BoundaryPatch {
                name: "wall".to_owned(),
                faces: vec![Face {
                    area_mag: area.norm(),
                    area,
                    cell: 0,
                    distance: 0.1,
                }],
            }],
        }
    }

    fn shear_stress(tau: f64) -> BoundaryTensorField {
        let mut tensor = Matrix3::zeros();
        tensor[(0, 1)] = tau;
        tensor[(1, 0)] = tau;

        BoundaryTensorField {
            patches: vec![vec![tensor]],
        }
    }

    #[test]
    fn projects_shear_onto_negated_normal() {
        let mesh = wall_mesh(Vector3::new(0.0, -2.0, 0.0));
        let stress = shear_stress(-0.5);

        let traction = project_traction(&mesh, &stress, 1.0).unwrap();

        // -n = (0, 1, 0), so the traction picks out the +y column of the tensor
        assert!((traction.patches[0][0].x + 0.5).abs() < 1.0e-12);
        assert!(traction.patches[0][0].y.abs() < 1.0e-12);
        assert!(traction.patches[0][0].z.abs() < 1.0e-12);
    }

    #[test]
    fn regime_outputs_differ_by_the_density_constant() {
        let mesh = wall_mesh(Vector3::new(0.0, -1.0, 0.0));
        let stress = shear_stress(-0.25);
        let rho = 1060.0;

        // Given an identical stress tensor and geometry, the incompressible
        // projection is the compressible projection scaled by the density
        // constant.
        let incompressible = project_traction(&mesh, &stress, rho).unwrap();
        let compressible = project_traction(&mesh, &stress, 1.0).unwrap();

        for (a, b) in std::iter::zip(&incompressible.patches[0], &compressible.patches[0]) {
            assert!((a - rho * b).norm() < 1.0e-12);
        }
    }

    #[test]
    fn zero_area_face_aborts_instead_of_emitting_nan() {
        let mesh = wall_mesh(Vector3::zeros());
        let stress = shear_stress(-0.5);

        match project_traction(&mesh, &stress, 1.0) {
            Err(TawssError::Geometry(_)) => {}
            other => panic!("expected a geometry error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn aux_field_names_follow_the_regime() {
        let incompressible = IncompressibleTraction {
            transport: TransportProperties { rho: 1000.0 },
        };
        let compressible = CompressibleTraction {
            thermo: ThermoProperties { nu: 1.5e-5 },
        };

        assert_eq!(incompressible.aux_field(), "mu");
        assert_eq!(compressible.aux_field(), "rho");
    }
}
