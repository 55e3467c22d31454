use chromosome_detector::benchmark::dataset::CHROMOSOME_CLASS;
use chromosome_detector::cli::{ErrorReport, PredictArgs, emit_json, parse_or_report};
use chromosome_detector::detect::{
    DetectOptions, DetectionReport, model_display_name, resolve_model_path, run_detection,
};
use chromosome_detector::logging::init_logging;
use chromosome_detector::object_detection::object_detection_model::PredictConfig;
use chromosome_detector::object_detection::object_detection_utils::read_classes_txt_file;
use chromosome_detector::object_detection::yolov11_bounding_box::Yolov11BoundingBox;
use chromosome_detector::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

/// Counts chromosomes in each image and prints `{image: {count, status, details}}`.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// ONNX model, or weights with an .onnx export next to them
    #[arg(value_name = "MODEL")]
    model: String,

    /// Images to analyse
    #[arg(value_name = "IMAGE", required = true)]
    images: Vec<String>,

    /// Include every box (x1, y1, x2, y2, w, h, confidence, class) in `details`
    #[arg(long)]
    details: bool,

    /// Class names, one per line [default: cromossomo]
    #[arg(long, value_name = "FILE")]
    classes: Option<PathBuf>,

    #[command(flatten)]
    predict: PredictArgs,
}

fn run(args: &Args) -> Result<DetectionReport> {
    let model_path = resolve_model_path(&args.model)?;
    let class_names = match &args.classes {
        Some(path) => read_classes_txt_file(path)?,
        None => vec![CHROMOSOME_CLASS.to_string()],
    };
    info!(model = %model_path.display(), images = args.images.len(), "loading model");
    let mut model = Yolov11BoundingBox::new(
        &model_path,
        class_names,
        args.predict.imgsz,
        model_display_name(&args.model),
    )?;
    let options = DetectOptions {
        predict: args.predict.to_config(PredictConfig::default()),
        emit_details: args.details,
    };
    run_detection(&mut model, &args.images, &options)
}

fn main() {
    let Some(args) = parse_or_report::<Args>() else {
        return;
    };
    init_logging(args.predict.verbose);

    match run(&args) {
        Ok(report) => emit_json(&report),
        Err(e) => {
            error!(error = %e, "detection failed");
            emit_json(&ErrorReport::from(&e));
        }
    }
}
