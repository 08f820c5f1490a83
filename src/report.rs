use std::fmt::Write;

use ctsx::{CrackPath, PinHole, Point};
use serde::Serialize;

use crate::config::Simulation;

/// Everything printed for one predicted crack path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathReport {
    pub model: String,
    pub length: f64,
    pub width: f64,
    pub precrack: f64,
    pub theta: f64,
    pub increment: f64,
    /// `"propagation"` or `"display"`.
    pub frame: &'static str,
    pub steps: usize,
    pub pin_holes: Vec<PinHole>,
    pub points: Vec<Point>,
}

impl PathReport {
    pub fn new(simulation: &Simulation, path: &CrackPath, display: bool) -> Self {
        let specimen = &simulation.specimen;
        let points = if display {
            path.iter().map(|&point| specimen.to_display(point)).collect()
        } else {
            path.points().to_vec()
        };
        Self {
            model: simulation.model.to_string(),
            length: specimen.length(),
            width: specimen.width(),
            precrack: specimen.precrack(),
            theta: simulation.theta,
            increment: simulation.increment,
            frame: if display { "display" } else { "propagation" },
            steps: path.generated().len(),
            pin_holes: specimen.pin_holes(),
            points,
        }
    }
}

/// Render the report as an aligned text table.
#[must_use]
pub fn render_table(report: &PathReport) -> String {
    let mut output = String::new();

    writeln!(
        &mut output,
        "CTS specimen L = {:.1} mm, W = {:.1} mm, a = {:.1} mm",
        report.length, report.width, report.precrack
    )
    .expect("writing to string cannot fail");
    writeln!(
        &mut output,
        "Crack path predicted with {} (theta = {:.1} deg, increment = {:.2} mm): {} steps, {} frame",
        report.model, report.theta, report.increment, report.steps, report.frame
    )
    .expect("writing to string cannot fail");

    writeln!(&mut output, "{:>5} {:>12} {:>12}", "#", "x [mm]", "y [mm]")
        .expect("writing to string cannot fail");
    for (index, point) in report.points.iter().enumerate() {
        writeln!(
            &mut output,
            "{index:>5} {:>12.4} {:>12.4}",
            point.x, point.y
        )
        .expect("writing to string cannot fail");
    }

    output
}

/// Render the report as pretty-printed JSON.
pub fn render_json(report: &PathReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
