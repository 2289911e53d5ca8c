use crate::config::AnalysisConfig;

/// Generalized Amdahl speedup of `nprocs` accelerators when `frac_par` of the
/// work runs in parallel.
pub fn speedup(nprocs: f64, frac_par: f64, nodes: f64, accel_speedup: f64) -> f64 {
    ((1.0 - frac_par) + nodes * frac_par)
        / ((1.0 - frac_par) + frac_par / (accel_speedup * nprocs))
}

/// Theoretical speedup over the (parallel fraction x process count) grid.
#[derive(Debug, Clone)]
pub struct Surface {
    nprocs: Vec<f64>,
    frac_par: Vec<f64>,
    // row-major, one row per parallel fraction sample
    values: Vec<f64>,
}

impl Surface {
    pub fn build(config: &AnalysisConfig) -> Self {
        let values = config
            .frac_par
            .iter()
            .flat_map(|&f| {
                config
                    .nprocs
                    .iter()
                    .map(move |&n| speedup(n, f, config.nodes, config.accel_speedup))
            })
            .collect();

        Self {
            nprocs: config.nprocs.clone(),
            frac_par: config.frac_par.clone(),
            values,
        }
    }

    pub fn nprocs(&self) -> &[f64] {
        &self.nprocs
    }

    pub fn frac_par(&self) -> &[f64] {
        &self.frac_par
    }

    /// (rows, cols) = (parallel fraction samples, process count samples)
    pub fn shape(&self) -> (usize, usize) {
        (self.frac_par.len(), self.nprocs.len())
    }

    pub fn value(&self, frac_idx: usize, nproc_idx: usize) -> f64 {
        self.values[frac_idx * self.nprocs.len() + nproc_idx]
    }

    pub fn row(&self, frac_idx: usize) -> &[f64] {
        let cols = self.nprocs.len();
        &self.values[frac_idx * cols..(frac_idx + 1) * cols]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_shape() {
        let surface = Surface::build(&AnalysisConfig::default());
        assert_eq!(surface.shape(), (100, 8));
        assert_eq!(surface.row(3).len(), 8);
    }

    #[test]
    fn test_single_process_has_no_speedup() {
        let surface = Surface::build(&AnalysisConfig::default());
        for i in 0..surface.frac_par().len() {
            assert!((surface.value(i, 0) - 1.0).abs() < 1e-12, "row {}", i);
        }
    }

    #[test]
    fn test_serial_work_has_no_speedup() {
        for n in 1..=8 {
            assert_eq!(speedup(f64::from(n), 0.0, 1.0, 1.0), 1.0);
        }
    }

    #[test]
    fn test_fully_parallel_scales_linearly() {
        let surface = Surface::build(&AnalysisConfig::default());
        let last = surface.frac_par().len() - 1;
        for (j, &n) in surface.nprocs().iter().enumerate() {
            assert!((surface.value(last, j) - n).abs() < 1e-9);
        }
    }

    #[test]
    fn test_known_point() {
        // half parallel on two processes: 1 / (0.5 + 0.25)
        assert!((speedup(2.0, 0.5, 1.0, 1.0) - 4.0 / 3.0).abs() < 1e-12);
        let surface = Surface::build(&AnalysisConfig::default());
        assert!((surface.value(49, 1) - 4.0 / 3.0).abs() < 1e-12);
    }
}
