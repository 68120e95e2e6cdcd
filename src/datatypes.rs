use nalgebra::{Matrix3, Vector3};

/// A single boundary face: outward area vector, its precomputed magnitude,
/// the adjacent interior cell, and the wall-normal distance to that cell's
/// centre.
#[derive(Debug, Clone)]
pub struct Face {
    pub area: Vector3<f64>,
    pub area_mag: f64,
    pub cell: usize,
    pub distance: f64,
}

/// A named boundary surface composed of an ordered sequence of faces.
#[derive(Debug, Clone)]
pub struct BoundaryPatch {
    pub name: String,
    pub faces: Vec<Face>,
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub cells: usize,
    pub patches: Vec<BoundaryPatch>,
}

impl Mesh {
    pub fn face_count(&self) -> usize {
        self.patches.iter().map(|p| p.faces.len()).sum()
    }
}

/// A scalar field over the mesh: one value per cell, plus one value per
/// boundary face, indexed (patch, face) in mesh order.
#[derive(Debug, Clone)]
pub struct ScalarField {
    pub internal: Vec<f64>,
    pub boundary: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct VectorField {
    pub internal: Vec<Vector3<f64>>,
    pub boundary: Vec<Vec<Vector3<f64>>>,
}

/// A vector field defined only on boundary faces, indexed (patch, face) in
/// mesh order. Used for both the per-timestep traction (WSS) and the
/// accumulated average (TAWSSPP).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryVectorField {
    pub patches: Vec<Vec<Vector3<f64>>>,
}

impl BoundaryVectorField {
    /// Creates an all-zero field with one vector per boundary face of `mesh`
    pub fn zero(mesh: &Mesh) -> BoundaryVectorField {
        BoundaryVectorField {
            patches: mesh
                .patches
                .iter()
                .map(|p| vec![Vector3::zeros(); p.faces.len()])
                .collect(),
        }
    }

    pub fn same_shape(&self, other: &BoundaryVectorField) -> bool {
        self.patches.len() == other.patches.len()
            && std::iter::zip(&self.patches, &other.patches).all(|(a, b)| a.len() == b.len())
    }
}

/// A symmetric-tensor field on boundary faces; the effective stress sampled
/// at the wall. Transient: built once per timestep and consumed immediately.
#[derive(Debug, Clone)]
pub struct BoundaryTensorField {
    pub patches: Vec<Vec<Matrix3<f64>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowRegime {
    Incompressible,
    Compressible,
}

/// Constant-property transport configuration for the incompressible regime,
/// read from the case's transport.json.
#[derive(Debug, Clone, Copy)]
pub struct TransportProperties {
    pub rho: f64,
}

/// Thermodynamic configuration for the compressible regime, read from the
/// case's thermo.json. `nu` is the reference kinematic viscosity the closure
/// scales by the local density field.
#[derive(Debug, Clone, Copy)]
pub struct ThermoProperties {
    pub nu: f64,
}
