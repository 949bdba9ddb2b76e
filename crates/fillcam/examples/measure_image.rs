//! Measure one image from disk and print the result as JSON.
//!
//! ```text
//! cargo run -p fillcam --example measure_image -- cup.jpg small_cup "all-purpose flour" [config.json]
//! ```

use std::{env, fs, path::PathBuf, time::Instant};

use fillcam::{Frame, MeasurementConfig, MeasurementPipeline};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    fillcam::core::init_tracing(false);
    #[cfg(not(feature = "tracing"))]
    fillcam::core::init_from_env()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let [image_path, tool_type, ingredient, rest @ ..] = args.as_slice() else {
        eprintln!("usage: measure_image <image> <tool_type> <ingredient> [config.json]");
        std::process::exit(2);
    };
    let config = match rest.first() {
        Some(path) => MeasurementConfig::load_json(PathBuf::from(path))?,
        None => MeasurementConfig::default(),
    };

    let pipeline = MeasurementPipeline::new(config)?;
    let bytes = fs::read(image_path)?;

    let t0 = Instant::now();
    let mut result = pipeline.process_measurement(Frame::Encoded(&bytes), tool_type, ingredient);
    log::info!("measured in {:.1} ms", t0.elapsed().as_secs_f64() * 1e3);

    if let Some(uri) = result.debug_image.take() {
        log::info!("debug image: {} bytes of data URI omitted", uri.len());
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
