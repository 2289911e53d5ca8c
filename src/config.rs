use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use structopt::StructOpt;

/// Which way round the observed speedup ratio is taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeedupRatio {
    /// `runtime[0] / runtime[i]`
    BaselineOverCurrent,
    /// `runtime[i] / runtime[0]`
    CurrentOverBaseline,
}

impl SpeedupRatio {
    pub fn apply(self, baseline: f64, current: f64) -> f64 {
        match self {
            SpeedupRatio::BaselineOverCurrent => baseline / current,
            SpeedupRatio::CurrentOverBaseline => current / baseline,
        }
    }
}

impl Default for SpeedupRatio {
    fn default() -> Self {
        SpeedupRatio::BaselineOverCurrent
    }
}

impl FromStr for SpeedupRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseline-over-current" => Ok(SpeedupRatio::BaselineOverCurrent),
            "current-over-baseline" => Ok(SpeedupRatio::CurrentOverBaseline),
            other => Err(format!(
                "unknown speedup ratio '{}' (expected baseline-over-current or current-over-baseline)",
                other
            )),
        }
    }
}

impl fmt::Display for SpeedupRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeedupRatio::BaselineOverCurrent => write!(f, "baseline-over-current"),
            SpeedupRatio::CurrentOverBaseline => write!(f, "current-over-baseline"),
        }
    }
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "amdahl-fit",
    about = "Fit GPU benchmark runtimes against an Amdahl speedup surface"
)]
pub struct Opt {
    /// SVG file the 3D plot is written to
    #[structopt(long, parse(from_os_str), default_value = "acceleration.svg")]
    pub output: PathBuf,

    /// Plot width in pixels
    #[structopt(long, default_value = "1024")]
    pub width: u32,

    /// Plot height in pixels
    #[structopt(long, default_value = "768")]
    pub height: u32,

    /// baseline-over-current or current-over-baseline
    #[structopt(long, default_value = "baseline-over-current")]
    pub speedup_ratio: SpeedupRatio,

    /// Skip rendering and only dump the results
    #[structopt(long)]
    pub no_plot: bool,
}

impl Opt {
    pub fn plot_options(&self) -> PlotOptions {
        PlotOptions {
            path: self.output.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Grid domains and the fixed model parameters.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub nprocs: Vec<f64>,
    pub frac_par: Vec<f64>,
    pub nodes: f64,
    pub accel_speedup: f64,
    pub speedup_ratio: SpeedupRatio,
}

impl AnalysisConfig {
    pub fn new(speedup_ratio: SpeedupRatio) -> Self {
        Self {
            nprocs: (1..=8).map(f64::from).collect(),
            // by index so 1.00 is hit exactly
            frac_par: (1..=100).map(|i| f64::from(i) / 100.0).collect(),
            nodes: 1.0,
            accel_speedup: 1.0,
            speedup_ratio,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::new(SpeedupRatio::default())
    }
}

impl From<&Opt> for AnalysisConfig {
    fn from(opt: &Opt) -> Self {
        Self::new(opt.speedup_ratio)
    }
}
