use std::io::Write;
use std::path::{Path, PathBuf};

use json::JsonValue;
use nalgebra::Vector3;

use crate::{
    datatypes::{
        BoundaryPatch, BoundaryVectorField, Face, Mesh, ScalarField, ThermoProperties,
        TransportProperties, VectorField,
    },
    error::TawssError,
};

/// One snapshot time directory inside the case
#[derive(Debug, Clone)]
pub struct TimeDir {
    pub value: f64,
    pub name: String,
}

/// An open simulation case: the root directory, the active mesh file name
/// (region-dependent), and the currently loaded boundary mesh.
pub struct Case {
    root: PathBuf,
    mesh_filename: String,
    pub mesh: Mesh,
}

impl Case {
    /// Opens a case directory and loads its boundary mesh
    ///
    /// # Arguments
    /// * `root` - The case directory
    /// * `region` - Optional mesh region name; selects `mesh.<region>.json`
    ///
    /// # Returns
    /// An opened Case. Fails if the mesh file is absent or malformed.
    pub fn open(root: &Path, region: Option<&str>) -> Result<Case, TawssError> {
        let mesh_filename = match region {
            Some(r) => format!("mesh.{}.json", r),
            None => "mesh.json".to_owned(),
        };

        let mesh_path = root.join(&mesh_filename);
        if !mesh_path.exists() {
            return Err(TawssError::Case(format!(
                "No {} in case directory {}",
                mesh_filename,
                root.display()
            )));
        }

        let mesh = parse_mesh(&read_json(&mesh_path)?)?;

        println!(
            "info: loaded mesh with {} patches and {} boundary faces",
            mesh.patches.len(),
            mesh.face_count()
        );

        Ok(Case {
            root: root.to_owned(),
            mesh_filename,
            mesh,
        })
    }

    /// Discovers the case's time directories, sorted ascending
    pub fn times(&self) -> Result<Vec<TimeDir>, TawssError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(err) => {
                return Err(TawssError::Case(format!(
                    "Unable to read case directory {}: {err}",
                    self.root.display()
                )))
            }
        };

        let mut times: Vec<TimeDir> = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if let Ok(value) = name.parse::<f64>() {
                if value.is_finite() {
                    times.push(TimeDir { value, name });
                }
            }
        }

        if times.is_empty() {
            return Err(TawssError::Case(format!(
                "No time directories found in case {}",
                self.root.display()
            )));
        }

        times.sort_by(|a, b| a.value.total_cmp(&b.value));
        Ok(times)
    }

    /// Applies the CLI time selection to the discovered time directories
    ///
    /// # Arguments
    /// * `range` - Optional inclusive (start, end) bound on the time value
    /// * `latest` - Select only the newest time directory
    pub fn select_times(
        &self,
        range: Option<(f64, f64)>,
        latest: bool,
    ) -> Result<Vec<TimeDir>, TawssError> {
        let all = self.times()?;
        let total = all.len();
        let selected = filter_times(all, range, latest)?;

        println!(
            "info: selected {} of {} time directories",
            selected.len(),
            total
        );

        Ok(selected)
    }

    /// Reloads the mesh from a per-time mesh file, if one exists. Topology
    /// may change between snapshots.
    pub fn refresh_mesh(&mut self, time: &TimeDir) -> Result<(), TawssError> {
        let path = self.root.join(&time.name).join(&self.mesh_filename);
        if !path.exists() {
            return Ok(());
        }

        self.mesh = parse_mesh(&read_json(&path)?)?;
        println!("info: mesh updated at time {}", time.name);

        Ok(())
    }

    /// Reads a scalar field for the given time. Returns None when the field
    /// file is absent; malformed files are an error.
    pub fn read_scalar_field(
        &self,
        time: &TimeDir,
        name: &str,
    ) -> Result<Option<ScalarField>, TawssError> {
        let path = self.field_path(time, name);
        if !path.exists() {
            return Ok(None);
        }

        let doc = read_json(&path)?;
        self.check_field_shape(&doc, &path)?;

        let mut internal: Vec<f64> = Vec::with_capacity(self.mesh.cells);
        for value in doc["internal"].members() {
            internal.push(json_f64(value, "internal value", &path)?);
        }

        let mut boundary: Vec<Vec<f64>> = Vec::new();
        for patch in &self.mesh.patches {
            let mut values: Vec<f64> = Vec::with_capacity(patch.faces.len());
            for value in doc["boundary"][patch.name.as_str()].members() {
                values.push(json_f64(value, "boundary value", &path)?);
            }
            boundary.push(values);
        }

        Ok(Some(ScalarField { internal, boundary }))
    }

    /// Reads a vector field for the given time. Returns None when the field
    /// file is absent; malformed files are an error.
    pub fn read_vector_field(
        &self,
        time: &TimeDir,
        name: &str,
    ) -> Result<Option<VectorField>, TawssError> {
        let path = self.field_path(time, name);
        if !path.exists() {
            return Ok(None);
        }

        let doc = read_json(&path)?;
        self.check_field_shape(&doc, &path)?;

        let mut internal: Vec<Vector3<f64>> = Vec::with_capacity(self.mesh.cells);
        for value in doc["internal"].members() {
            internal.push(json_vector3(value, "internal value", &path)?);
        }

        let mut boundary: Vec<Vec<Vector3<f64>>> = Vec::new();
        for patch in &self.mesh.patches {
            let mut values: Vec<Vector3<f64>> = Vec::with_capacity(patch.faces.len());
            for value in doc["boundary"][patch.name.as_str()].members() {
                values.push(json_vector3(value, "boundary value", &path)?);
            }
            boundary.push(values);
        }

        Ok(Some(VectorField { internal, boundary }))
    }

    /// Writes a boundary vector field into the time directory as json
    ///
    /// # Arguments
    /// * `time` - The time directory to write into
    /// * `name` - The field name (also the file stem)
    /// * `field` - The field values, shaped like the current mesh
    pub fn write_boundary_field(
        &self,
        time: &TimeDir,
        name: &str,
        field: &BoundaryVectorField,
    ) -> Result<(), TawssError> {
        if field.patches.len() != self.mesh.patches.len() {
            return Err(TawssError::Output(format!(
                "Field {} does not match the mesh patch layout",
                name
            )));
        }

        let path = self.field_path(time, name);
        let mut file = match std::fs::File::create(&path) {
            Ok(f) => f,
            Err(err) => {
                return Err(TawssError::Output(format!(
                    "Failed to create {}: {err}",
                    path.display()
                )))
            }
        };

        write_field_json(&mut file, name, &self.mesh, field).map_err(|err| {
            TawssError::Output(format!("Failed to write {}: {err}", path.display()))
        })?;

        Ok(())
    }

    /// Reads the incompressible transport configuration from transport.json
    pub fn read_transport(&self) -> Result<TransportProperties, TawssError> {
        let path = self.root.join("transport.json");
        if !path.exists() {
            return Err(TawssError::Input(format!(
                "No transport.json in case {} (required for incompressible mode)",
                self.root.display()
            )));
        }

        let doc = read_json(&path)?;
        if !doc.has_key("rho") {
            return Err(TawssError::Input(
                "transport.json missing rho field".to_owned(),
            ));
        }

        Ok(TransportProperties {
            rho: json_f64(&doc["rho"], "rho", &path)?,
        })
    }

    /// Reads the compressible thermodynamic configuration from thermo.json
    pub fn read_thermo(&self) -> Result<ThermoProperties, TawssError> {
        let path = self.root.join("thermo.json");
        if !path.exists() {
            return Err(TawssError::Input(format!(
                "No thermo.json in case {} (required for compressible mode)",
                self.root.display()
            )));
        }

        let doc = read_json(&path)?;
        if !doc.has_key("nu") {
            return Err(TawssError::Input(
                "thermo.json missing nu field".to_owned(),
            ));
        }

        Ok(ThermoProperties {
            nu: json_f64(&doc["nu"], "nu", &path)?,
        })
    }

    fn field_path(&self, time: &TimeDir, name: &str) -> PathBuf {
        self.root.join(&time.name).join(format!("{}.json", name))
    }

    /// Checks a field document against the current mesh: internal size and
    /// per-patch boundary face counts must match exactly.
    fn check_field_shape(&self, doc: &JsonValue, path: &Path) -> Result<(), TawssError> {
        if !doc.has_key("internal") {
            return Err(TawssError::Case(format!(
                "Field {} missing internal section",
                path.display()
            )));
        }
        if !doc.has_key("boundary") {
            return Err(TawssError::Case(format!(
                "Field {} missing boundary section",
                path.display()
            )));
        }

        if doc["internal"].len() != self.mesh.cells {
            return Err(TawssError::Case(format!(
                "Field {} has {} internal values, mesh has {} cells",
                path.display(),
                doc["internal"].len(),
                self.mesh.cells
            )));
        }

        for patch in &self.mesh.patches {
            if !doc["boundary"].has_key(patch.name.as_str()) {
                return Err(TawssError::Case(format!(
                    "Field {} missing boundary patch {}",
                    path.display(),
                    patch.name
                )));
            }
            if doc["boundary"][patch.name.as_str()].len() != patch.faces.len() {
                return Err(TawssError::Case(format!(
                    "Field {} patch {} has {} values, mesh patch has {} faces",
                    path.display(),
                    patch.name,
                    doc["boundary"][patch.name.as_str()].len(),
                    patch.faces.len()
                )));
            }
        }

        Ok(())
    }
}

/// Parses an inclusive time range of the form "start:end"
pub fn parse_time_range(spec: &str) -> Result<(f64, f64), TawssError> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 2 {
        return Err(TawssError::Input(format!(
            "Bad time range '{}'; expected start:end",
            spec
        )));
    }

    let start: f64 = match parts[0].trim().parse() {
        Ok(v) => v,
        Err(_) => {
            return Err(TawssError::Input(format!(
                "Non-numeric time range start '{}'",
                parts[0]
            )))
        }
    };
    let end: f64 = match parts[1].trim().parse() {
        Ok(v) => v,
        Err(_) => {
            return Err(TawssError::Input(format!(
                "Non-numeric time range end '{}'",
                parts[1]
            )))
        }
    };

    if start > end {
        return Err(TawssError::Input(format!(
            "Time range start {} is greater than end {}",
            start, end
        )));
    }

    Ok((start, end))
}

/// Applies the time selection rules to an ascending list of time directories
fn filter_times(
    all: Vec<TimeDir>,
    range: Option<(f64, f64)>,
    latest: bool,
) -> Result<Vec<TimeDir>, TawssError> {
    let selected: Vec<TimeDir> = if latest {
        all.into_iter().rev().take(1).collect()
    } else if let Some((start, end)) = range {
        all.into_iter()
            .filter(|t| t.value >= start && t.value <= end)
            .collect()
    } else {
        all
    };

    if selected.is_empty() {
        return Err(TawssError::Input(
            "Time selection matched no time directories".to_owned(),
        ));
    }

    Ok(selected)
}

fn read_json(path: &Path) -> Result<JsonValue, TawssError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) => {
            return Err(TawssError::Case(format!(
                "Unable to open {}: {err}",
                path.display()
            )))
        }
    };

    match json::parse(&contents) {
        Ok(doc) => Ok(doc),
        Err(err) => Err(TawssError::Case(format!(
            "Error in {}: {err}",
            path.display()
        ))),
    }
}

/// Parses a mesh document into a Mesh, computing face area magnitudes
fn parse_mesh(doc: &JsonValue) -> Result<Mesh, TawssError> {
    if !doc.has_key("cells") {
        return Err(TawssError::Case("Mesh json missing cells field".to_owned()));
    }
    if !doc.has_key("patches") {
        return Err(TawssError::Case(
            "Mesh json missing patches field".to_owned(),
        ));
    }

    let cells = match doc["cells"].as_usize() {
        Some(n) => n,
        None => {
            return Err(TawssError::Case(
                "Bad value for cells in mesh json".to_owned(),
            ))
        }
    };

    let mut patches: Vec<BoundaryPatch> = Vec::new();
    for patch_json in doc["patches"].members() {
        let name = match patch_json["name"].as_str() {
            Some(n) => n.to_owned(),
            None => {
                return Err(TawssError::Case(
                    "Mesh patch missing name field".to_owned(),
                ))
            }
        };

        let mut faces: Vec<Face> = Vec::new();
        for face_json in patch_json["faces"].members() {
            if !face_json.has_key("area") || !face_json.has_key("cell") {
                return Err(TawssError::Case(format!(
                    "Face in patch {} missing area or cell field",
                    name
                )));
            }

            let area = match parse_vector3(&face_json["area"]) {
                Some(v) => v,
                None => {
                    return Err(TawssError::Case(format!(
                        "Bad area vector in patch {}",
                        name
                    )))
                }
            };
            let cell = match face_json["cell"].as_usize() {
                Some(c) => c,
                None => {
                    return Err(TawssError::Case(format!(
                        "Bad cell index in patch {}",
                        name
                    )))
                }
            };
            let distance = match face_json["distance"].as_f64() {
                Some(d) => d,
                None => {
                    return Err(TawssError::Case(format!(
                        "Bad wall distance in patch {}",
                        name
                    )))
                }
            };

            faces.push(Face {
                area,
                area_mag: area.norm(),
                cell,
                distance,
            });
        }

        patches.push(BoundaryPatch { name, faces });
    }

    Ok(Mesh { cells, patches })
}

fn parse_vector3(value: &JsonValue) -> Option<Vector3<f64>> {
    if value.len() != 3 {
        return None;
    }

    Some(Vector3::new(
        value[0].as_f64()?,
        value[1].as_f64()?,
        value[2].as_f64()?,
    ))
}

fn json_f64(value: &JsonValue, what: &str, path: &Path) -> Result<f64, TawssError> {
    match value.as_f64() {
        Some(v) => Ok(v),
        None => Err(TawssError::Case(format!(
            "Bad {} in {}",
            what,
            path.display()
        ))),
    }
}

fn json_vector3(value: &JsonValue, what: &str, path: &Path) -> Result<Vector3<f64>, TawssError> {
    match parse_vector3(value) {
        Some(v) => Ok(v),
        None => Err(TawssError::Case(format!(
            "Bad {} in {}",
            what,
            path.display()
        ))),
    }
}

fn write_field_json(
    file: &mut std::fs::File,
    name: &str,
    mesh: &Mesh,
    field: &BoundaryVectorField,
) -> std::io::Result<()> {
    writeln!(file, "{{")?;
    writeln!(file, "  \"name\": \"{}\",", name)?;
    writeln!(file, "  \"boundary\": {{")?;

    for (patch_idx, patch) in mesh.patches.iter().enumerate() {
        writeln!(file, "    \"{}\": [", patch.name)?;
        let values = &field.patches[patch_idx];
        for (face_idx, value) in values.iter().enumerate() {
            let comma = if face_idx + 1 < values.len() { "," } else { "" };
            writeln!(
                file,
                "      [{}, {}, {}]{}",
                value.x, value.y, value.z, comma
            )?;
        }
        let comma = if patch_idx + 1 < mesh.patches.len() {
            ","
        } else {
            ""
        };
        writeln!(file, "    ]{}", comma)?;
    }

    writeln!(file, "  }}")?;
    writeln!(file, "}}")?;

    Ok(())
}
