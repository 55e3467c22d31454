use chromosome_detector::benchmark::dataset::CHROMOSOME_CLASS;
use chromosome_detector::benchmark::{BenchmarkReport, run_benchmark};
use chromosome_detector::cli::{ErrorReport, PredictArgs, emit_json, parse_or_report};
use chromosome_detector::detect::{model_display_name, resolve_model_path};
use chromosome_detector::logging::init_logging;
use chromosome_detector::object_detection::object_detection_model::PredictConfig;
use chromosome_detector::object_detection::yolov11_bounding_box::Yolov11BoundingBox;
use chromosome_detector::Result;
use clap::Parser;
use tracing::{error, info};

/// Validates a model on a labeled dataset and prints mAP, precision, recall and speed.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// ONNX model, or weights with an .onnx export next to them
    #[arg(value_name = "MODEL")]
    model: String,

    /// Folder with the dataset images; labels are read from the sibling `labels` folder
    #[arg(value_name = "DATASET_IMAGES_DIR")]
    dataset: String,

    #[command(flatten)]
    predict: PredictArgs,
}

fn run(args: &Args) -> Result<BenchmarkReport> {
    let cwd = std::env::current_dir()?;
    let config = args.predict.to_config(PredictConfig::validation());
    let model_name = model_display_name(&args.model);
    run_benchmark(model_name.clone(), &args.dataset, &cwd, &config, || {
        let model_path = resolve_model_path(&args.model)?;
        info!(model = %model_path.display(), "loading model");
        Yolov11BoundingBox::new(
            &model_path,
            vec![CHROMOSOME_CLASS.to_string()],
            args.predict.imgsz,
            model_name,
        )
    })
}

fn main() {
    let Some(args) = parse_or_report::<Args>() else {
        return;
    };
    init_logging(args.predict.verbose);

    match run(&args) {
        Ok(report) => emit_json(&report),
        Err(e) => {
            error!(error = %e, "benchmark failed");
            emit_json(&ErrorReport::from(&e));
        }
    }
}
