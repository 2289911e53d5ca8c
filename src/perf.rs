use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Raw runtimes (seconds) of one device, aligned with `BenchmarkTable::nproc`.
#[derive(Debug, Clone)]
pub struct DeviceRuntimes<'a> {
    pub name: &'a str,
    pub runtimes: Vec<f64>,
}

/// Every device series plus the process counts they were measured at.
/// `runtimes[0]` of each device is the serial baseline.
#[derive(Debug, Clone)]
pub struct BenchmarkTable<'a> {
    pub nproc: Vec<f64>,
    pub devices: Vec<DeviceRuntimes<'a>>,
}

/// Values derived from one device series, one entry per measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedSeries {
    pub parallel_fractions: Vec<f64>,
    pub z_norm: Vec<f64>,
}

type DeviceColumn<'a> = Vec<(&'a str, &'a [f64])>;

/// The full data structure dumped to stdout once the analysis has run.
/// Devices keep the order of the benchmark table.
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub nproc: &'a [f64],
    #[serde(serialize_with = "ordered_map")]
    pub parallel_fractions: DeviceColumn<'a>,
    #[serde(serialize_with = "ordered_map")]
    pub runtimes: DeviceColumn<'a>,
    #[serde(serialize_with = "ordered_map")]
    pub z_norm: DeviceColumn<'a>,
}

fn ordered_map<S: Serializer>(column: &[(&str, &[f64])], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(column.iter().copied())
}

impl<'a> AnalysisReport<'a> {
    pub fn new(table: &'a BenchmarkTable<'a>, derived: &'a BTreeMap<&'a str, DerivedSeries>) -> Self {
        let runtimes = table
            .devices
            .iter()
            .map(|d| (d.name, d.runtimes.as_slice()))
            .collect();
        let series: Vec<(&str, &DerivedSeries)> = table
            .devices
            .iter()
            .filter_map(|d| derived.get(d.name).map(|s| (d.name, s)))
            .collect();

        Self {
            nproc: &table.nproc,
            parallel_fractions: series
                .iter()
                .map(|(name, s)| (*name, s.parallel_fractions.as_slice()))
                .collect(),
            runtimes,
            z_norm: series
                .iter()
                .map(|(name, s)| (*name, s.z_norm.as_slice()))
                .collect(),
        }
    }
}
