use anyhow::{bail, Context, Result};
use skywatch::{FrameOutcome, FrameSource, InferenceEngine, Processor, SkywatchConfig};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const USAGE: &str = "Usage: skywatch <command> [args]

Commands:
  run [config]               capture, filter, crop and classify until interrupted
  once [config]              run a single iteration and print its outcome
  classify <image> [config]  label one image file
  init-config [path]         write the default configuration";

fn main() -> Result<()> {
    skywatch::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "run" => cmd_run(&args),
        "once" => cmd_once(&args),
        "classify" => cmd_classify(&args),
        "init-config" => cmd_init_config(&args),
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}\n\n{}", command, USAGE);
            std::process::exit(1);
        }
    }
}

fn config_path(args: &[String], index: usize) -> PathBuf {
    args.get(index)
        .map(PathBuf::from)
        .unwrap_or_else(SkywatchConfig::default_path)
}

fn load_config(path: &Path) -> Result<SkywatchConfig> {
    let config = SkywatchConfig::load_layered(path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    if let Err(e) = config.validate() {
        bail!("invalid configuration in {}: {}", path.display(), e);
    }
    Ok(config)
}

fn cmd_run(args: &[String]) -> Result<()> {
    let config = load_config(&config_path(args, 2))?;
    let mut processor = Processor::from_config(&config).context("starting capture loop")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        log::info!("Shutdown requested, finishing current frame");
        flag.store(true, Ordering::SeqCst);
    })
    .context("installing signal handler")?;

    processor.run(&shutdown)?;
    Ok(())
}

fn cmd_once(args: &[String]) -> Result<()> {
    let config = load_config(&config_path(args, 2))?;
    let mut processor = Processor::from_config(&config).context("starting capture loop")?;
    processor.source().ensure_dirs()?;

    let outcome = processor.process_once()?;
    println!("{}", outcome);
    if let FrameOutcome::InferenceFailed { .. } = outcome {
        std::process::exit(2);
    }
    Ok(())
}

fn cmd_classify(args: &[String]) -> Result<()> {
    let Some(image) = args.get(2) else {
        eprintln!("Usage: skywatch classify <image> [config]");
        std::process::exit(1);
    };
    let config = load_config(&config_path(args, 3))?;
    let engine = InferenceEngine::from_config(&config.models).context("loading models")?;

    let result = engine
        .classify_path(image)
        .with_context(|| format!("classifying {}", image))?;
    println!("{}: {} ({:.3})", image, result.label, result.score);
    for (name, positive) in &result.assessments {
        println!("  {}: {}", name, positive);
    }
    Ok(())
}

fn cmd_init_config(args: &[String]) -> Result<()> {
    let path = config_path(args, 2);
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    SkywatchConfig::default().save_to_file(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
