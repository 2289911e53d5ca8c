use std::sync::LazyLock;
use crate::perf::{BenchmarkTable, DeviceRuntimes};

pub static PERF_DATA_GPU: LazyLock<BenchmarkTable<'static>> = LazyLock::new(|| BenchmarkTable {
    nproc: vec![1.0, 2.0, 4.0, 8.0],
    devices: vec![
        DeviceRuntimes { name: "A800", runtimes: vec![2.0, 4.0, 8.2, 16.6] },
        DeviceRuntimes { name: "RTX4090", runtimes: vec![1.7, 3.2, 5.8, 11.5] },
        DeviceRuntimes { name: "RTX3090_NV", runtimes: vec![1.1, 2.4, 4.5, 7.5] },
        DeviceRuntimes { name: "RTX3090", runtimes: vec![1.1, 2.0, 4.1, 8.5] },
        DeviceRuntimes { name: "fake", runtimes: vec![1.0, 1.2, 1.25, 1.26] },
    ],
});
