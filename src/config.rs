//! Command-line surface and validated runtime settings.

use crate::error::{AppError, Result};
use crate::models::predict_types::SelectMode;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SCAN_DIR: &str = "images/ring-scans/";
pub const DEFAULT_LOOK_DIR: &str = "images/look/";
pub const DEFAULT_OUTPUT: &str = "output/ring_pred.json";
pub const DEFAULT_FLAG_FILE: &str = "output/flag.txt";
pub const DEFAULT_MODEL: &str = "models/model.onnx";
pub const DEFAULT_MODEL_CONFIG: &str = "models/config.json";

pub const DEFAULT_TOP_ALL: usize = 5;
pub const DEFAULT_TOP_TWO_DIGIT: usize = 3;

/// Predict/recognize the year on a class ring image.
#[derive(Parser, Debug, Clone)]
#[command(name = "ring-predict", version, about)]
pub struct Cli {
    /// The path to the image to be predicted.
    #[arg(short = 'i', long = "img_path", env = "RING_PREDICT_IMG_PATH")]
    pub img_path: Option<PathBuf>,

    /// The mode of running this program.
    #[arg(short = 'm', long, value_enum, env = "RING_PREDICT_MODE")]
    pub mode: Option<SelectMode>,

    #[arg(long, env = "RING_PREDICT_FLAG_FILE", default_value = DEFAULT_FLAG_FILE)]
    pub flag_file: PathBuf,

    #[arg(long, env = "RING_PREDICT_SCAN_DIR", default_value = DEFAULT_SCAN_DIR)]
    pub scan_dir: PathBuf,

    #[arg(long, env = "RING_PREDICT_LOOK_DIR", default_value = DEFAULT_LOOK_DIR)]
    pub look_dir: PathBuf,

    #[arg(long, env = "RING_PREDICT_OUTPUT", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// ONNX model file.
    #[arg(long, env = "RING_PREDICT_MODEL", default_value = DEFAULT_MODEL)]
    pub model: PathBuf,

    /// Model config JSON holding the label vocabulary.
    #[arg(long, env = "RING_PREDICT_MODEL_CONFIG", default_value = DEFAULT_MODEL_CONFIG)]
    pub model_config: PathBuf,

    /// Delay between flag reads. 0 spins.
    #[arg(long, env = "RING_PREDICT_POLL_INTERVAL_MS", default_value_t = 50)]
    pub poll_interval_ms: u64,

    /// Initial retry delay while the look folder is empty.
    #[arg(long, env = "RING_PREDICT_LOOK_RETRY_MS", default_value_t = 10)]
    pub look_retry_ms: u64,

    /// Give up waiting on the look folder after this long. Unset waits forever.
    #[arg(long, env = "RING_PREDICT_LOOK_TIMEOUT_MS")]
    pub look_timeout_ms: Option<u64>,

    /// Size-stability window before a selected image is used. 0 disables.
    #[arg(long, env = "RING_PREDICT_SETTLE_MS", default_value_t = 100)]
    pub settle_ms: u64,

    #[arg(long, default_value_t = DEFAULT_TOP_ALL)]
    pub top_all: usize,

    #[arg(long, default_value_t = DEFAULT_TOP_TWO_DIGIT)]
    pub top_two_digit: usize,

    /// Try GPU execution providers before falling back to CPU.
    #[arg(long, env = "RING_PREDICT_USE_GPU")]
    pub use_gpu: bool,

    /// Wait for one GO, predict once, and exit.
    #[arg(long)]
    pub once: bool,

    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: SelectMode,
    pub img_path: Option<PathBuf>,
    pub flag_file: PathBuf,
    pub scan_dir: PathBuf,
    pub look_dir: PathBuf,
    pub output: PathBuf,
    pub model: PathBuf,
    pub model_config: PathBuf,
    pub poll_interval: Duration,
    pub look_retry: Duration,
    pub look_timeout: Option<Duration>,
    pub settle: Duration,
    pub top_all: usize,
    pub top_two_digit: usize,
    pub use_gpu: bool,
    pub max_cycles: Option<u64>,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mode = resolve_mode(cli.mode, cli.img_path.as_deref())?;

        if cli.top_all == 0 || cli.top_two_digit == 0 {
            return Err(AppError::InvalidArguments(
                "--top-all and --top-two-digit must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            mode,
            img_path: cli.img_path.clone(),
            flag_file: cli.flag_file.clone(),
            scan_dir: cli.scan_dir.clone(),
            look_dir: cli.look_dir.clone(),
            output: cli.output.clone(),
            model: cli.model.clone(),
            model_config: cli.model_config.clone(),
            poll_interval: Duration::from_millis(cli.poll_interval_ms),
            look_retry: Duration::from_millis(cli.look_retry_ms),
            look_timeout: cli.look_timeout_ms.map(Duration::from_millis),
            settle: Duration::from_millis(cli.settle_ms),
            top_all: cli.top_all,
            top_two_digit: cli.top_two_digit,
            use_gpu: cli.use_gpu,
            max_cycles: cli.once.then_some(1),
        })
    }

    /// Default layout rooted at `root`, in random mode.
    pub fn with_root(root: &Path) -> Self {
        Self {
            mode: SelectMode::Random,
            img_path: None,
            flag_file: root.join(DEFAULT_FLAG_FILE),
            scan_dir: root.join(DEFAULT_SCAN_DIR),
            look_dir: root.join(DEFAULT_LOOK_DIR),
            output: root.join(DEFAULT_OUTPUT),
            model: root.join(DEFAULT_MODEL),
            model_config: root.join(DEFAULT_MODEL_CONFIG),
            poll_interval: Duration::from_millis(50),
            look_retry: Duration::from_millis(10),
            look_timeout: None,
            settle: Duration::from_millis(100),
            top_all: DEFAULT_TOP_ALL,
            top_two_digit: DEFAULT_TOP_TWO_DIGIT,
            use_gpu: false,
            max_cycles: None,
        }
    }
}

/// `--mode` wins when given; otherwise a path means explicit mode and no
/// arguments at all means random.
pub fn resolve_mode(mode: Option<SelectMode>, img_path: Option<&Path>) -> Result<SelectMode> {
    match (mode, img_path) {
        (Some(SelectMode::Explicit), _) => Err(AppError::InvalidArguments(
            "explicit mode is selected by passing --img_path".to_string(),
        )),
        (Some(m), _) => Ok(m),
        (None, None) => Ok(SelectMode::Random),
        (None, Some(p)) if p.as_os_str().is_empty() => Err(AppError::InvalidArguments(
            "--img_path must not be empty".to_string(),
        )),
        (None, Some(_)) => Ok(SelectMode::Explicit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["ring-predict"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_no_args_defaults_to_random() {
        let settings = Settings::from_cli(&parse(&[])).unwrap();
        assert_eq!(settings.mode, SelectMode::Random);
        assert_eq!(settings.scan_dir, PathBuf::from(DEFAULT_SCAN_DIR));
        assert_eq!(settings.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(settings.top_all, 5);
        assert_eq!(settings.top_two_digit, 3);
        assert_eq!(settings.max_cycles, None);
    }

    #[test]
    fn test_mode_look() {
        let settings = Settings::from_cli(&parse(&["--mode", "look"])).unwrap();
        assert_eq!(settings.mode, SelectMode::Look);
    }

    #[test]
    fn test_img_path_means_explicit() {
        let settings = Settings::from_cli(&parse(&["--img_path", "a/b.jpg"])).unwrap();
        assert_eq!(settings.mode, SelectMode::Explicit);
        assert_eq!(settings.img_path, Some(PathBuf::from("a/b.jpg")));
    }

    #[test]
    fn test_mode_wins_over_img_path() {
        let settings =
            Settings::from_cli(&parse(&["-i", "a/b.jpg", "-m", "random"])).unwrap();
        assert_eq!(settings.mode, SelectMode::Random);
    }

    #[test]
    fn test_empty_img_path_rejected() {
        assert!(Cli::try_parse_from(["ring-predict", "--img_path", ""]).is_err());
        assert!(matches!(
            resolve_mode(None, Some(Path::new(""))),
            Err(AppError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_unknown_mode_rejected_by_parser() {
        assert!(Cli::try_parse_from(["ring-predict", "--mode", "explicit"]).is_err());
        assert!(Cli::try_parse_from(["ring-predict", "--mode", "sideways"]).is_err());
    }

    #[test]
    fn test_once_sets_single_cycle() {
        let settings = Settings::from_cli(&parse(&["--once"])).unwrap();
        assert_eq!(settings.max_cycles, Some(1));
    }

    #[test]
    fn test_zero_top_rejected() {
        let result = Settings::from_cli(&parse(&["--top-all", "0"]));
        assert!(matches!(result, Err(AppError::InvalidArguments(_))));
    }
}
