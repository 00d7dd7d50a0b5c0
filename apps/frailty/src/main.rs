use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use frailty::config::Config;
use frailty::output::{render_catalogue, render_evaluation, OutputMode};
use frailty::server::{self, AppState, PredictRequest};
use frailty::build_evaluator;
use frailty_ai::render::standalone;
use frailty_ai::Evaluation;
use frailty_model::{load_forest, load_reference, FeatureVector, Locale};
use log::{error, warn};

#[derive(Debug, Parser)]
#[command(
    name = "frailty",
    version,
    about = "Frailty risk predictor for older adults",
    long_about = "frailty scores a fifteen-item questionnaire with a random-forest classifier,\n\
        returns a risk level with health advice, and explains each prediction with\n\
        SHAP and LIME feature contributions.\n\n\
        EXAMPLES:\n\
        \n  frailty serve                               Serve the questionnaire on 127.0.0.1:8501\n\
        \n  frailty predict --codes 0,0,0,0,0,0,0,0,1,0,0,0,0,0,0\n\
        \n  frailty predict --input answers.json --format json\n\
        \n  frailty features --locale zh                List the questionnaire items\n\
        \n  frailty check --config frailty.toml         Validate the model and reference data"
)]
struct Cli {
    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Display language (en, zh); overrides the config file
    #[arg(long, global = true, value_name = "LOCALE")]
    locale: Option<Locale>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP questionnaire server
    #[command(
        about = "Run the HTTP questionnaire server",
        long_about = "Loads the classifier and reference dataset once, then serves the form on /,\n\
            form submissions on /predict and a JSON API on /api/predict and /api/features."
    )]
    Serve(ServeArgs),

    /// Evaluate one answer set
    #[command(about = "Evaluate one answer set and print the prediction, advice and explanations")]
    Predict(PredictArgs),

    /// Print the questionnaire items
    #[command(about = "Print the fifteen questionnaire items in model column order")]
    Features(FeaturesArgs),

    /// Validate the model and reference artifacts
    #[command(about = "Load the model and reference dataset and report their shape")]
    Check(ConfigArgs),
}

#[derive(Debug, Args, Clone)]
struct ConfigArgs {
    /// Configuration file (default: ./frailty.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
struct ServeArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Listen address, e.g. 0.0.0.0:8501
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputMode {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputMode::Text,
            Format::Json => OutputMode::Json,
        }
    }
}

#[derive(Debug, Args, Clone)]
struct PredictArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Fifteen comma-separated 0/1 codes in model column order
    #[arg(long, value_name = "CODES", conflicts_with = "input", required_unless_present = "input")]
    codes: Option<String>,

    /// JSON file with {"features": {...}} or {"codes": [...]}
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "text")]
    format: Format,

    /// Write shap.html and lime.html into this directory
    #[arg(long = "html-dir", value_name = "DIR")]
    html_dir: Option<PathBuf>,

    /// Skip the SHAP explanation
    #[arg(long = "no-shap")]
    no_shap: bool,

    /// Skip the LIME explanation
    #[arg(long = "no-lime")]
    no_lime: bool,
}

#[derive(Debug, Args, Clone)]
struct FeaturesArgs {
    #[arg(long, value_enum, default_value = "text")]
    format: Format,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn load_config(args: &ConfigArgs, locale: Option<Locale>) -> Result<Config, i32> {
    match Config::load(args.config.as_deref()) {
        Ok(mut config) => {
            if let Some(l) = locale {
                config.locale = l;
            }
            Ok(config)
        }
        Err(e) => {
            eprintln!("error: {e}");
            Err(2)
        }
    }
}

fn read_features(args: &PredictArgs) -> Result<FeatureVector, String> {
    if let Some(codes) = &args.codes {
        let cells: Vec<&str> = codes.split(',').collect();
        return FeatureVector::from_cells(&cells).map_err(|e| e.to_string());
    }
    let path = args
        .input
        .as_ref()
        .ok_or_else(|| "either --codes or --input is required".to_string())?;
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {e}", path.display()))?;
    let request: PredictRequest = serde_json::from_str(&text)
        .map_err(|e| format!("malformed input '{}': {e}", path.display()))?;
    request.into_features().map_err(|e| e.to_string())
}

fn write_html(dir: &Path, ev: &Evaluation) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    match &ev.shap {
        Some(Ok(panel)) => fs::write(dir.join("shap.html"), standalone("SHAP", &panel.html))?,
        Some(Err(e)) => warn!("shap.html not written: {e}"),
        None => {}
    }
    match &ev.lime {
        Some(Ok(panel)) => fs::write(dir.join("lime.html"), standalone("LIME", &panel.html))?,
        Some(Err(e)) => warn!("lime.html not written: {e}"),
        None => {}
    }
    Ok(())
}

fn run_serve(args: &ServeArgs, locale: Option<Locale>) -> i32 {
    let mut config = match load_config(&args.config, locale) {
        Ok(c) => c,
        Err(rc) => return rc,
    };
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    let addr: SocketAddr = match config.server.bind.parse() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: invalid bind address '{}': {e}", config.server.bind);
            return 2;
        }
    };
    let evaluator = match build_evaluator(&config) {
        Ok(ev) => ev,
        Err(e) => {
            error!("startup failed: {e}");
            eprintln!("error: {e}");
            return 1;
        }
    };
    let state = AppState::new(evaluator, config.evaluation_options());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: cannot start runtime: {e}");
            return 1;
        }
    };
    match runtime.block_on(server::serve(addr, state)) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: server on {addr} failed: {e}");
            1
        }
    }
}

fn run_predict(args: &PredictArgs, locale: Option<Locale>) -> i32 {
    let config = match load_config(&args.config, locale) {
        Ok(c) => c,
        Err(rc) => return rc,
    };
    let features = match read_features(args) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {e}");
            return 2;
        }
    };
    let evaluator = match build_evaluator(&config) {
        Ok(ev) => ev,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    let mut options = config.evaluation_options();
    options.shap &= !args.no_shap;
    options.lime &= !args.no_lime;

    let ev = evaluator.evaluate(&features, &options);
    match render_evaluation(&ev, config.locale, args.format.into()) {
        Ok(text) => print!("{text}"),
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    }
    if let Some(dir) = &args.html_dir {
        if let Err(e) = write_html(dir, &ev) {
            eprintln!("error: cannot write reports to '{}': {e}", dir.display());
            return 1;
        }
    }
    0
}

fn run_features(args: &FeaturesArgs, locale: Option<Locale>) -> i32 {
    let locale = locale
        .or_else(|| Config::load(None).ok().map(|c| c.locale))
        .unwrap_or_default();
    match render_catalogue(locale, args.format.into()) {
        Ok(text) => {
            print!("{text}");
            if args.format == Format::Json {
                println!();
            }
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

fn run_check(args: &ConfigArgs, locale: Option<Locale>) -> i32 {
    let config = match load_config(args, locale) {
        Ok(c) => c,
        Err(rc) => return rc,
    };
    if let Err(e) = config.lime.settings() {
        eprintln!("error: {e}");
        return 2;
    }
    let model = match load_forest(&config.artifacts.model) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    let reference = match load_reference(&config.artifacts.reference) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    println!(
        "model: {} ({}): {} trees, max depth {}, classes {:?}",
        config.artifacts.model.display(),
        model.model_name,
        model.n_trees(),
        model.max_depth(),
        model.classes
    );
    println!(
        "reference: {}: {} rows x {} columns",
        config.artifacts.reference.display(),
        reference.len(),
        reference.header().len()
    );
    0
}

fn run_cli() -> i32 {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Serve(args) => run_serve(args, cli.locale),
        Command::Predict(args) => run_predict(args, cli.locale),
        Command::Features(args) => run_features(args, cli.locale),
        Command::Check(args) => run_check(args, cli.locale),
    }
}

fn main() {
    std::process::exit(run_cli());
}
