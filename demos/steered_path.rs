use ctsx::{from_fn, generate_path, AngleFeatures, Specimen};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Standard CTS specimen: L = 71.4 mm, W = 42 mm, a = 19 mm
    let specimen = Specimen::default();
    let (origin, tip) = specimen.seed_points();

    // A synthetic model that steers the crack 20 degrees below the pre-crack
    let predictor = from_fn(|features: &AngleFeatures| features.prev_segment_angle - 70.0);

    let path = generate_path(
        origin,
        tip,
        45.0,
        specimen.width(),
        specimen.length(),
        1.0,
        &predictor,
    )?;

    // Print the path the way it would be drawn on the specimen
    for point in &path {
        let shown = specimen.to_display(*point);
        println!("{:8.3} {:8.3}", shown.x, shown.y);
    }

    Ok(())
}
