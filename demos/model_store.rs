use std::env;

use ctsx::{CrackPathPropagator, ModelFamily, ModelStore, Specimen};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Usage: model_store [MODELS_DIR] [DNN|XGBoost|TabNet]
    let mut args = env::args().skip(1);
    let store = ModelStore::new(args.next().unwrap_or_else(|| "MODELS".to_string()));
    let family: ModelFamily = args.next().as_deref().unwrap_or("DNN").parse()?;

    let predictor = store.angle_predictor(family)?;
    let specimen = Specimen::default();
    let (origin, tip) = specimen.seed_points();
    let path = CrackPathPropagator::new().with_max_steps(500).generate(
        origin,
        tip,
        45.0,
        specimen.width(),
        specimen.length(),
        2.0,
        &predictor,
    )?;

    println!(
        "{family}: {} steps, crack tip at {}",
        path.generated().len(),
        path.tip()
    );

    Ok(())
}
