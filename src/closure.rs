use nalgebra::{Matrix3, Vector3};

use crate::{
    datatypes::{BoundaryTensorField, Face, Mesh, ScalarField, VectorField},
    error::TawssError,
};

/// A flow closure: produces the deviatoric effective stress tensor sampled
/// at every boundary face of the mesh.
///
/// Sign convention: the returned tensor carries a leading minus, so the wall
/// traction is recovered by projecting it onto the negated outward normal.
pub trait ClosureModel {
    fn effective_stress(
        &self,
        mesh: &Mesh,
        velocity: &VectorField,
    ) -> Result<BoundaryTensorField, TawssError>;
}

/// Incompressible Newtonian wall closure. Works in kinematic units: the
/// effective viscosity is the dynamic viscosity field divided by the
/// constant transport density, so the traction calculator must scale the
/// projected stress back up by that density.
pub struct IncompressibleClosure<'a> {
    mu: &'a ScalarField,
    rho: f64,
}

impl<'a> IncompressibleClosure<'a> {
    pub fn new(mu: &'a ScalarField, rho: f64) -> IncompressibleClosure<'a> {
        IncompressibleClosure { mu, rho }
    }
}

impl ClosureModel for IncompressibleClosure<'_> {
    fn effective_stress(
        &self,
        mesh: &Mesh,
        velocity: &VectorField,
    ) -> Result<BoundaryTensorField, TawssError> {
        check_vector_layout(mesh, velocity, "velocity")?;
        check_scalar_layout(mesh, self.mu, "viscosity")?;

        let mut patches: Vec<Vec<Matrix3<f64>>> = Vec::with_capacity(mesh.patches.len());
        for (patch_idx, patch) in mesh.patches.iter().enumerate() {
            let mut tensors: Vec<Matrix3<f64>> = Vec::with_capacity(patch.faces.len());
            for (face_idx, face) in patch.faces.iter().enumerate() {
                let gradient =
                    wall_velocity_gradient(face, velocity, patch_idx, face_idx, &patch.name)?;
                let nu_eff = self.mu.boundary[patch_idx][face_idx] / self.rho;

                tensors.push(-nu_eff * dev_two_symm(&gradient));
            }
            patches.push(tensors);
        }

        Ok(BoundaryTensorField { patches })
    }
}

/// Compressible Newtonian wall closure. Works in dynamic units: the local
/// density field scales the reference kinematic viscosity, so density is
/// already embedded in the returned tensor.
pub struct CompressibleClosure<'a> {
    rho: &'a ScalarField,
    nu_ref: f64,
}

impl<'a> CompressibleClosure<'a> {
    pub fn new(rho: &'a ScalarField, nu_ref: f64) -> CompressibleClosure<'a> {
        CompressibleClosure { rho, nu_ref }
    }
}

impl ClosureModel for CompressibleClosure<'_> {
    fn effective_stress(
        &self,
        mesh: &Mesh,
        velocity: &VectorField,
    ) -> Result<BoundaryTensorField, TawssError> {
        check_vector_layout(mesh, velocity, "velocity")?;
        check_scalar_layout(mesh, self.rho, "density")?;

        let mut patches: Vec<Vec<Matrix3<f64>>> = Vec::with_capacity(mesh.patches.len());
        for (patch_idx, patch) in mesh.patches.iter().enumerate() {
            let mut tensors: Vec<Matrix3<f64>> = Vec::with_capacity(patch.faces.len());
            for (face_idx, face) in patch.faces.iter().enumerate() {
                let gradient =
                    wall_velocity_gradient(face, velocity, patch_idx, face_idx, &patch.name)?;
                let mu_eff = self.rho.boundary[patch_idx][face_idx] * self.nu_ref;

                tensors.push(-mu_eff * dev_two_symm(&gradient));
            }
            patches.push(tensors);
        }

        Ok(BoundaryTensorField { patches })
    }
}

/// Approximates the wall velocity gradient from the adjacent-cell velocity,
/// the face boundary value, and the stored wall-normal distance. Only the
/// wall-normal derivative survives this approximation.
fn wall_velocity_gradient(
    face: &Face,
    velocity: &VectorField,
    patch_idx: usize,
    face_idx: usize,
    patch_name: &str,
) -> Result<Matrix3<f64>, TawssError> {
    if face.area_mag == 0.0 {
        return Err(TawssError::Geometry(format!(
            "Zero-area face {} on patch {}",
            face_idx, patch_name
        )));
    }
    if face.distance <= 0.0 {
        return Err(TawssError::Geometry(format!(
            "Non-positive wall distance on face {} of patch {}",
            face_idx, patch_name
        )));
    }
    if face.cell >= velocity.internal.len() {
        return Err(TawssError::Case(format!(
            "Face {} on patch {} references cell {} outside the velocity field",
            face_idx, patch_name, face.cell
        )));
    }

    let normal = face.area / face.area_mag;
    let u_wall = velocity.boundary[patch_idx][face_idx];
    let u_cell = velocity.internal[face.cell];
    let du: Vector3<f64> = (u_wall - u_cell) / face.distance;

    Ok(du * normal.transpose())
}

/// Deviatoric part of twice the symmetric part of a gradient tensor
fn dev_two_symm(gradient: &Matrix3<f64>) -> Matrix3<f64> {
    let two_symm = gradient + gradient.transpose();
    two_symm - Matrix3::identity() * (two_symm.trace() / 3.0)
}

fn check_vector_layout(mesh: &Mesh, field: &VectorField, name: &str) -> Result<(), TawssError> {
    let matches = field.boundary.len() == mesh.patches.len()
        && std::iter::zip(&field.boundary, &mesh.patches).all(|(b, p)| b.len() == p.faces.len());

    if !matches {
        return Err(TawssError::Case(format!(
            "The {} field does not match the mesh boundary layout",
            name
        )));
    }

    Ok(())
}

fn check_scalar_layout(mesh: &Mesh, field: &ScalarField, name: &str) -> Result<(), TawssError> {
    let matches = field.boundary.len() == mesh.patches.len()
        && std::iter::zip(&field.boundary, &mesh.patches).all(|(b, p)| b.len() == p.faces.len());

    if !matches {
        return Err(TawssError::Case(format!(
            "The {} field does not match the mesh boundary layout",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::BoundaryPatch;

    /// One wall face below a single cell, flow in +x, outward normal -y
    fn floor_mesh(distance: f64) -> Mesh {
        Mesh {
            cells: 1,
            patches: vec![BoundaryPatch {
                name: "floor".to_owned(),
                faces: vec![Face {
                    area: Vector3::new(0.0, -2.0, 0.0),
                    area_mag: 2.0,
                    cell: 0,
                    distance,
                }],
            }],
        }
    }

    fn shear_velocity(u: f64) -> VectorField {
        VectorField {
            internal: vec![Vector3::new(u, 0.0, 0.0)],
            boundary: vec![vec![Vector3::zeros()]],
        }
    }

    #[test]
    fn wall_gradient_recovers_normal_shear() {
        let mesh = floor_mesh(0.1);
        let velocity = shear_velocity(1.0);

        let gradient =
            wall_velocity_gradient(&mesh.patches[0].faces[0], &velocity, 0, 0, "floor").unwrap();

        // dUx/dy = u / d = 10
        assert!((gradient[(0, 1)] - 10.0).abs() < 1.0e-12);
        assert!(gradient[(0, 0)].abs() < 1.0e-12);
        assert!(gradient[(1, 1)].abs() < 1.0e-12);
    }

    #[test]
    fn incompressible_stress_is_kinematic_shear() {
        let mesh = floor_mesh(0.1);
        let velocity = shear_velocity(1.0);
        let mu = ScalarField {
            internal: vec![0.1],
            boundary: vec![vec![0.1]],
        };

        let closure = IncompressibleClosure::new(&mu, 1000.0);
        let stress = closure.effective_stress(&mesh, &velocity).unwrap();

        // -nu * dUx/dy = -(0.1 / 1000) * 10
        let expected = -1.0e-3;
        assert!((stress.patches[0][0][(0, 1)] - expected).abs() < 1.0e-15);
        assert!((stress.patches[0][0][(1, 0)] - expected).abs() < 1.0e-15);
        assert!(stress.patches[0][0].trace().abs() < 1.0e-15);
    }

    #[test]
    fn compressible_stress_embeds_density() {
        let mesh = floor_mesh(0.1);
        let velocity = shear_velocity(1.0);
        let rho = ScalarField {
            internal: vec![1.2],
            boundary: vec![vec![1.2]],
        };

        let closure = CompressibleClosure::new(&rho, 1.5e-5);
        let stress = closure.effective_stress(&mesh, &velocity).unwrap();

        // -rho * nu_ref * dUx/dy
        let expected = -1.2 * 1.5e-5 * 10.0;
        assert!((stress.patches[0][0][(0, 1)] - expected).abs() < 1.0e-18);
    }

    #[test]
    fn zero_wall_distance_is_fatal() {
        let mesh = floor_mesh(0.0);
        let velocity = shear_velocity(1.0);
        let mu = ScalarField {
            internal: vec![0.1],
            boundary: vec![vec![0.1]],
        };

        let closure = IncompressibleClosure::new(&mu, 1000.0);
        assert!(closure.effective_stress(&mesh, &velocity).is_err());
    }

    #[test]
    fn mismatched_field_layout_is_fatal() {
        let mesh = floor_mesh(0.1);
        let velocity = VectorField {
            internal: vec![Vector3::zeros()],
            boundary: vec![],
        };
        let mu = ScalarField {
            internal: vec![0.1],
            boundary: vec![vec![0.1]],
        };

        let closure = IncompressibleClosure::new(&mu, 1000.0);
        assert!(closure.effective_stress(&mesh, &velocity).is_err());
    }
}
