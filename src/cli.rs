use crate::error::DetectorError;
use crate::object_detection::object_detection_model::PredictConfig;
use clap::Parser;
use clap::error::ErrorKind;
use serde::Serialize;
use std::io::Write;

/// Inference settings shared by both tools.
#[derive(clap::Args, Clone, Debug)]
pub struct PredictArgs {
    /// Minimum class score for a box to be kept [default: 0.25 for detect, 0.001 for benchmark]
    #[arg(long, value_name = "THRESHOLD")]
    pub conf: Option<f32>,

    /// IoU above which overlapping boxes of the same class are suppressed
    #[arg(long, default_value_t = 0.7, value_name = "THRESHOLD")]
    pub iou: f32,

    /// Maximum boxes kept per image
    #[arg(long, default_value_t = 300, value_name = "COUNT")]
    pub max_det: usize,

    /// Square input size the model was exported with
    #[arg(
        long,
        default_value_t = 640,
        value_name = "PIXELS",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub imgsz: u32,

    /// Log progress to stderr
    #[arg(long, short)]
    pub verbose: bool,
}

impl PredictArgs {
    pub fn to_config(&self, defaults: PredictConfig) -> PredictConfig {
        PredictConfig {
            confidence: self.conf.unwrap_or(defaults.confidence),
            iou_threshold: self.iou,
            max_detections: self.max_det,
        }
    }
}

/// The document printed in place of a result when a run fails.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub error: String,
}

impl From<&DetectorError> for ErrorReport {
    fn from(error: &DetectorError) -> Self {
        ErrorReport {
            error: error.to_string(),
        }
    }
}

/// Prints `value` as the one JSON document on stdout.
pub fn emit_json<T: Serialize>(value: &T) {
    let text = serde_json::to_string(value).unwrap_or_else(|e| {
        let fallback = ErrorReport::from(&DetectorError::Json(e));
        serde_json::to_string(&fallback)
            .unwrap_or_else(|_| "{\"error\":\"Erro ao gerar JSON\"}".to_string())
    });
    let mut stdout = std::io::stdout().lock();
    // The host may already be gone; nothing useful can be done about it.
    let _ = writeln!(stdout, "{}", text);
    let _ = stdout.flush();
}

/// Parses the command line, or prints the reason it could not be parsed as the JSON
/// error document and returns `None`.
///
/// `--help` and `--version` print as usual and exit.
pub fn parse_or_report<A: Parser>() -> Option<A> {
    parse_args_or_report(std::env::args_os())
}

fn parse_args_or_report<A, I, T>(args: I) -> Option<A>
where
    A: Parser,
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match A::try_parse_from(args) {
        Ok(args) => Some(args),
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let error = argument_error(&e);
                emit_json(&ErrorReport::from(&error));
                None
            }
        },
    }
}

fn argument_error(e: &clap::Error) -> DetectorError {
    match e.kind() {
        ErrorKind::MissingRequiredArgument
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => DetectorError::InsufficientArguments,
        _ => {
            let message = e.to_string();
            let first_line = message.lines().next().unwrap_or_default();
            DetectorError::InvalidArgument(
                first_line.trim_start_matches("error: ").to_string(),
            )
        }
    }
}
