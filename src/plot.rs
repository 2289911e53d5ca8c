use plotters::prelude::*;
use std::collections::BTreeMap;
use std::error::Error;

use crate::amdahl::Surface;
use crate::config::PlotOptions;
use crate::perf::{BenchmarkTable, DerivedSeries};

const FONT: &str = "sans-serif";
const ROYAL_BLUE: RGBColor = RGBColor(65, 105, 225);

const NPROCS_RANGE: std::ops::Range<f64> = 1.0..8.0;
const FRACTION_RANGE: std::ops::Range<f64> = 0.01..1.0;
const SPEEDUP_RANGE: std::ops::Range<f64> = 1.0..8.0;

// Every tenth fraction row gets a wireframe line.
const ROW_STRIDE: usize = 10;

fn device_color(name: &str) -> RGBColor {
    match name {
        "A800" => RED,
        "RTX4090" => GREEN,
        "RTX3090_NV" => RGBColor(255, 140, 0),
        "RTX3090" => MAGENTA,
        "fake" => CYAN,
        _ => BLACK,
    }
}

// plotters treats y as the vertical axis, so speedup goes there.
fn chart_point(nprocs: f64, frac_par: f64, speedup: f64) -> (f64, f64, f64) {
    (nprocs, speedup, frac_par)
}

/// Render the theoretical surface with every device's derived points on top.
pub fn write_plot(
    surface: &Surface,
    table: &BenchmarkTable,
    derived: &BTreeMap<&str, DerivedSeries>,
    options: &PlotOptions,
) -> Result<(), Box<dyn Error>> {
    let resolution = (options.width, options.height);
    let root = SVGBackend::new(&options.path, resolution).into_drawing_area();

    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(
            "Speedup vs GPUs and Effective Parallel Fraction",
            (FONT, 20),
        )
        .build_cartesian_3d(NPROCS_RANGE, SPEEDUP_RANGE, FRACTION_RANGE)?;

    chart.with_projection(|mut pb| {
        pb.yaw = 0.6;
        pb.pitch = 0.35;
        pb.scale = 0.85;
        pb.into_matrix()
    });

    chart
        .configure_axes()
        .light_grid_style(BLACK.mix(0.15))
        .max_light_lines(3)
        .x_formatter(&|v| format!("{:.0} GPUs", v))
        .y_formatter(&|v| format!("{:.0}x", v))
        .z_formatter(&|v| format!("f={:.2}", v))
        .label_style((FONT, 12))
        .draw()?;

    let (rows, cols) = surface.shape();
    let nprocs = surface.nprocs();
    let frac_par = surface.frac_par();

    chart
        .draw_series((0..rows.saturating_sub(1)).flat_map(|i| {
            (0..cols.saturating_sub(1)).map(move |j| {
                Polygon::new(
                    vec![
                        chart_point(nprocs[j], frac_par[i], surface.value(i, j)),
                        chart_point(nprocs[j + 1], frac_par[i], surface.value(i, j + 1)),
                        chart_point(nprocs[j + 1], frac_par[i + 1], surface.value(i + 1, j + 1)),
                        chart_point(nprocs[j], frac_par[i + 1], surface.value(i + 1, j)),
                    ],
                    ROYAL_BLUE.mix(0.2).filled(),
                )
            })
        }))?
        .label("Amdahl (nodes = 1, accel = 1)")
        .legend(|(x, y)| {
            Rectangle::new([(x + 5, y - 5), (x + 15, y + 5)], ROYAL_BLUE.mix(0.5).filled())
        });

    // wireframe: strided rows plus every process-count column
    let mut wire_rows: Vec<usize> = (0..rows).step_by(ROW_STRIDE).collect();
    if rows > 0 && wire_rows.last() != Some(&(rows - 1)) {
        wire_rows.push(rows - 1);
    }
    for i in wire_rows {
        chart.draw_series(LineSeries::new(
            nprocs
                .iter()
                .zip(surface.row(i))
                .map(|(&n, &s)| chart_point(n, frac_par[i], s)),
            ROYAL_BLUE.mix(0.5),
        ))?;
    }
    for j in 0..cols {
        chart.draw_series(LineSeries::new(
            (0..rows).map(|i| chart_point(nprocs[j], frac_par[i], surface.value(i, j))),
            ROYAL_BLUE.mix(0.5),
        ))?;
    }

    for device in table.devices.iter() {
        let series = match derived.get(device.name) {
            Some(series) => series,
            None => continue,
        };
        let color = device_color(device.name);
        let points: Vec<(f64, f64, f64)> = table
            .nproc
            .iter()
            .zip(series.parallel_fractions.iter().zip(series.z_norm.iter()))
            .map(|(&n, (&f, &z))| chart_point(n, f, z))
            .collect();

        chart.draw_series(points.iter().map(|&p| Circle::new(p, 4, color.filled())))?;
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
            .label(device.name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font((FONT, 13))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::calculate_parallel_fraction;
    use crate::config::AnalysisConfig;
    use crate::perf_gpu_data::PERF_DATA_GPU;
    use crate::solver::FractionSolver;

    #[test]
    #[ignore = "text layout needs a system sans-serif font"]
    fn test_write_plot_svg() {
        let config = AnalysisConfig::default();
        let surface = Surface::build(&config);
        let solver = FractionSolver::new().unwrap();
        let derived = calculate_parallel_fraction(&PERF_DATA_GPU, &solver, &config).unwrap();

        let path = std::env::temp_dir().join(format!("amdahl-fit-{}.svg", std::process::id()));
        let options = PlotOptions { path: path.clone(), width: 640, height: 480 };
        write_plot(&surface, &PERF_DATA_GPU, &derived, &options).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("RTX4090"));
        assert!(svg.contains("polygon"));
    }

    #[test]
    fn test_chart_point_puts_speedup_vertical() {
        assert_eq!(chart_point(2.0, 0.5, 1.5), (2.0, 1.5, 0.5));
    }

    #[test]
    fn test_devices_have_distinct_colors() {
        let colors: Vec<RGBColor> = PERF_DATA_GPU.devices.iter().map(|d| device_color(d.name)).collect();
        for (i, a) in colors.iter().enumerate() {
            assert_ne!(*a, BLACK);
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
