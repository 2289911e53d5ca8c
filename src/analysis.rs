use log::{debug, info};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::AnalysisConfig;
use crate::perf::{BenchmarkTable, DerivedSeries};
use crate::solver::{FractionSolver, SolveError};

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("{device}: baseline runtime is zero")]
    DivisionDegeneracy { device: String },

    #[error("{device}: {found} runtimes for {expected} process counts")]
    KeyMismatch {
        device: String,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Solve(#[from] SolveError),
}

/// Derive a parallel fraction and a normalized runtime for every measurement.
///
/// The serial point (one process) is pinned to a fraction of 1.0 without
/// consulting the solver. A series shorter than `nproc` is derived for the
/// process counts it covers; a longer one has runtimes with no process count.
pub fn calculate_parallel_fraction<'a>(
    table: &BenchmarkTable<'a>,
    solver: &FractionSolver,
    config: &AnalysisConfig,
) -> Result<BTreeMap<&'a str, DerivedSeries>, AnalysisError> {
    let mut derived = BTreeMap::new();

    for device in table.devices.iter() {
        let runtimes = &device.runtimes;
        if runtimes.len() > table.nproc.len() {
            return Err(AnalysisError::KeyMismatch {
                device: device.name.to_string(),
                expected: table.nproc.len(),
                found: runtimes.len(),
            });
        }

        let baseline = match runtimes.first() {
            Some(&b) if b != 0.0 => b,
            Some(_) => {
                return Err(AnalysisError::DivisionDegeneracy {
                    device: device.name.to_string(),
                })
            }
            None => {
                derived.insert(device.name, DerivedSeries::default());
                continue;
            }
        };

        let speedups: Vec<f64> = runtimes
            .iter()
            .map(|&r| config.speedup_ratio.apply(baseline, r))
            .collect();

        let (parallel, nprocs): (Vec<usize>, Vec<f64>) = table
            .nproc
            .iter()
            .take(runtimes.len())
            .enumerate()
            .filter(|(_, &n)| n != 1.0)
            .map(|(i, &n)| (i, n))
            .unzip();
        let parallel_speedups: Vec<f64> = parallel.iter().map(|&i| speedups[i]).collect();
        let solved = solver.solve_fractions(
            &parallel_speedups,
            config.nodes,
            config.accel_speedup,
            &nprocs,
        )?;

        let mut parallel_fractions = vec![1.0; runtimes.len()];
        for (&i, f) in parallel.iter().zip(solved) {
            parallel_fractions[i] = f;
        }

        let z_norm: Vec<f64> = runtimes.iter().map(|r| r / baseline).collect();

        for (i, n) in table.nproc.iter().take(runtimes.len()).enumerate() {
            debug!(
                "{} nproc={} speedup={:.4} frac_par={:.4} z_norm={:.4}",
                device.name, n, speedups[i], parallel_fractions[i], z_norm[i]
            );
        }
        info!("{}: parallel fractions {:.3?}", device.name, parallel_fractions);

        derived.insert(device.name, DerivedSeries { parallel_fractions, z_norm });
    }

    Ok(derived)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpeedupRatio;
    use crate::perf::DeviceRuntimes;
    use crate::perf_gpu_data::PERF_DATA_GPU;

    fn table(runtimes: Vec<f64>) -> BenchmarkTable<'static> {
        BenchmarkTable {
            nproc: vec![1.0, 2.0, 4.0, 8.0],
            devices: vec![DeviceRuntimes { name: "gpu", runtimes }],
        }
    }

    #[test]
    fn test_rtx4090_series() {
        let solver = FractionSolver::new().unwrap();
        let derived =
            calculate_parallel_fraction(&PERF_DATA_GPU, &solver, &AnalysisConfig::default())
                .unwrap();
        let rtx = &derived["RTX4090"];

        let expected_norm = [1.0, 1.882, 3.412, 6.765];
        for (got, want) in rtx.z_norm.iter().zip(expected_norm) {
            assert!((got - want).abs() < 5e-4, "{} vs {}", got, want);
        }

        assert_eq!(rtx.parallel_fractions[0], 1.0);
        let runtimes = [1.7, 3.2, 5.8, 11.5];
        let nproc = [1.0, 2.0, 4.0, 8.0];
        for i in 1..4 {
            let s = runtimes[0] / runtimes[i];
            let want = solver.solve_fraction(s, 1.0, 1.0, nproc[i]).unwrap();
            assert_eq!(rtx.parallel_fractions[i], want);
        }
    }

    #[test]
    fn test_every_device_is_derived() {
        let solver = FractionSolver::new().unwrap();
        let derived =
            calculate_parallel_fraction(&PERF_DATA_GPU, &solver, &AnalysisConfig::default())
                .unwrap();
        assert_eq!(derived.len(), PERF_DATA_GPU.devices.len());

        for device in PERF_DATA_GPU.devices.iter() {
            let series = &derived[device.name];
            assert_eq!(series.parallel_fractions.len(), device.runtimes.len());
            assert_eq!(series.z_norm.len(), device.runtimes.len());
            assert_eq!(series.z_norm[0], 1.0);
            assert_eq!(series.parallel_fractions[0], 1.0);
        }
    }

    #[test]
    fn test_serial_point_ignores_runtime() {
        let solver = FractionSolver::new().unwrap();
        for baseline in [0.3, 1.0, 42.0] {
            let t = table(vec![baseline, 1.0, 1.0, 1.0]);
            let derived =
                calculate_parallel_fraction(&t, &solver, &AnalysisConfig::default()).unwrap();
            assert_eq!(derived["gpu"].parallel_fractions[0], 1.0);
        }
    }

    #[test]
    fn test_shrinking_runtimes_recover_fraction() {
        // runtimes shrinking per Amdahl with f = 0.8
        let runtimes: Vec<f64> = [1.0, 2.0, 4.0, 8.0]
            .iter()
            .map(|&n| 10.0 / crate::amdahl::speedup(n, 0.8, 1.0, 1.0))
            .collect();
        let config = AnalysisConfig::new(SpeedupRatio::BaselineOverCurrent);
        let solver = FractionSolver::new().unwrap();
        let derived = calculate_parallel_fraction(&table(runtimes), &solver, &config).unwrap();
        for f in &derived["gpu"].parallel_fractions[1..] {
            assert!((f - 0.8).abs() < 1e-9);
        }
    }

    #[test]
    fn test_current_over_baseline_ratio() {
        let solver = FractionSolver::new().unwrap();
        let config = AnalysisConfig::new(SpeedupRatio::CurrentOverBaseline);
        let derived = calculate_parallel_fraction(&table(vec![1.0, 1.5, 2.0, 3.0]), &solver, &config)
            .unwrap();
        let want = solver.solve_fraction(1.5, 1.0, 1.0, 2.0).unwrap();
        assert_eq!(derived["gpu"].parallel_fractions[1], want);
        assert_eq!(derived["gpu"].z_norm, vec![1.0, 1.5, 2.0, 3.0]);
    }

    #[test]
    fn test_zero_baseline() {
        let solver = FractionSolver::new().unwrap();
        let err = calculate_parallel_fraction(
            &table(vec![0.0, 1.0, 1.0, 1.0]),
            &solver,
            &AnalysisConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, AnalysisError::DivisionDegeneracy { device: "gpu".to_string() });
    }

    #[test]
    fn test_short_series_is_derived() {
        let solver = FractionSolver::new().unwrap();
        let derived = calculate_parallel_fraction(
            &table(vec![2.0, 1.5]),
            &solver,
            &AnalysisConfig::default(),
        )
        .unwrap();
        let series = &derived["gpu"];
        assert_eq!(series.z_norm, vec![1.0, 0.75]);
        assert_eq!(series.parallel_fractions.len(), 2);
        assert_eq!(series.parallel_fractions[0], 1.0);
        assert_eq!(
            series.parallel_fractions[1],
            solver.solve_fraction(2.0 / 1.5, 1.0, 1.0, 2.0).unwrap()
        );
    }

    #[test]
    fn test_long_series_is_rejected() {
        let solver = FractionSolver::new().unwrap();
        let err = calculate_parallel_fraction(
            &table(vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            &solver,
            &AnalysisConfig::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::KeyMismatch { device: "gpu".to_string(), expected: 4, found: 5 }
        );
    }
}
