use analysis::calculate_parallel_fraction;
use amdahl::Surface;
use config::{AnalysisConfig, Opt};
use log::info;
use perf::AnalysisReport;
use perf_gpu_data::PERF_DATA_GPU;
use solver::FractionSolver;
use std::error::Error;
use structopt::StructOpt;

mod amdahl;
mod analysis;
mod config;
mod perf;
mod perf_gpu_data;
mod plot;
mod solver;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opt = Opt::from_args();
    let config = AnalysisConfig::from(&opt);
    info!(
        "surface grid {}x{}, nodes = {}, accel_speedup = {}, speedup ratio {}",
        config.frac_par.len(),
        config.nprocs.len(),
        config.nodes,
        config.accel_speedup,
        config.speedup_ratio
    );

    let surface = Surface::build(&config);
    let solver = FractionSolver::new()?;
    info!("frac_par = {}", solver.expression());

    let table = &*PERF_DATA_GPU;
    let derived = calculate_parallel_fraction(table, &solver, &config)?;

    if opt.no_plot {
        info!("plot skipped");
    } else {
        let options = opt.plot_options();
        plot::write_plot(&surface, table, &derived, &options)?;
        info!("plot written to {}", options.path.display());
    }

    let report = AnalysisReport::new(table, &derived);
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
