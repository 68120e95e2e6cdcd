use std::path::PathBuf;

use clap::Parser;

use tawss::{
    case::{parse_time_range, Case},
    datatypes::FlowRegime,
    driver,
    error::TawssError,
    traction,
};

/// Computes the running time-average of wall shear stress across the
/// snapshots of a simulation case.
#[derive(Parser)]
#[command(name = "tawss", version, about)]
struct Args {
    /// Case directory
    #[arg(default_value = ".")]
    case: PathBuf,

    /// Use the compressible traction formulation (default: incompressible)
    #[arg(long)]
    compressible: bool,

    /// Mesh region name; reads mesh.<NAME>.json instead of mesh.json
    #[arg(long)]
    region: Option<String>,

    /// Inclusive time range "start:end" bounding the processed snapshots
    #[arg(long)]
    time: Option<String>,

    /// Process only the newest time directory
    #[arg(long)]
    latest: bool,
}

fn main() {
    let args = Args::parse();

    if let Err(err) = run(&args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), TawssError> {
    let regime = if args.compressible {
        FlowRegime::Compressible
    } else {
        FlowRegime::Incompressible
    };

    let mut case = Case::open(&args.case, args.region.as_deref())?;

    let range = match &args.time {
        Some(spec) => Some(parse_time_range(spec)?),
        None => None,
    };
    let times = case.select_times(range, args.latest)?;

    let calculator = traction::for_regime(regime, &case)?;

    driver::run(&mut case, &times, calculator.as_ref())
}
