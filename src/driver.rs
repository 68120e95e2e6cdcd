use indicatif::ProgressBar;

use crate::{
    average::RunningAverage,
    case::{Case, TimeDir},
    datatypes::BoundaryVectorField,
    error::TawssError,
    traction::TractionCalculator,
};

/// Drives the run: for each selected time, in ascending order, refresh the
/// mesh, compute the traction snapshot (or fall back to zero when inputs are
/// missing), write WSS, fold it into the running average, and write TAWSSPP.
///
/// TAWSSPP is persisted after every timestep, so the output always reflects
/// the cumulative average through the most recently processed snapshot.
pub fn run(
    case: &mut Case,
    times: &[TimeDir],
    calculator: &dyn TractionCalculator,
) -> Result<(), TawssError> {
    let mut accumulator = RunningAverage::new(&case.mesh);

    println!("info: processing {} timesteps", times.len());
    let bar = ProgressBar::new(times.len() as u64);

    for time in times {
        println!("info: time = {}", time.name);
        case.refresh_mesh(time)?;

        let snapshot = compute_snapshot(case, time, calculator)?;

        case.write_boundary_field(time, "WSS", &snapshot)?;
        let average = accumulator.update(&snapshot)?;
        case.write_boundary_field(time, "TAWSSPP", &average)?;

        bar.inc(1);
    }

    bar.finish_with_message(format!(
        "info: averaged wall shear stress over {} timesteps\n",
        accumulator.count()
    ));
    println!("info: end");

    Ok(())
}

/// Loads the timestep's input fields and computes its traction snapshot.
/// A missing U or auxiliary field is not an error: the snapshot is the zero
/// field for that timestep, which still dilutes the running average.
fn compute_snapshot(
    case: &Case,
    time: &TimeDir,
    calculator: &dyn TractionCalculator,
) -> Result<BoundaryVectorField, TawssError> {
    let velocity = match case.read_vector_field(time, "U")? {
        Some(v) => v,
        None => {
            println!("info:     no U field");
            return Ok(BoundaryVectorField::zero(&case.mesh));
        }
    };

    let aux = match case.read_scalar_field(time, calculator.aux_field())? {
        Some(a) => a,
        None => {
            println!("info:     no {} field", calculator.aux_field());
            return Ok(BoundaryVectorField::zero(&case.mesh));
        }
    };

    calculator.compute(&case.mesh, &velocity, &aux)
}
