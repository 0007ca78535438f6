// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use colorful::Colorful;
use indicatif::{ProgressBar, ProgressStyle};

use enftrack::cli::{self, Args};
use enftrack::core::{load_source, BatchRunner, EnfExtractor};

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if args.list_presets {
        print!("{}", cli::format_presets());
        return Ok(());
    }

    let config = args.extraction_config()?;
    let kind = args.input_kind();
    let inputs = cli::collect_inputs(&args.inputs, kind)?;

    if inputs.is_empty() {
        println!("{}", "No input files found!".red());
        return Ok(());
    }

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    if !args.json {
        println!("Found {} input file(s)\n", inputs.len());
    }

    let bar = if args.json {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(inputs.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
                .context("Invalid progress template")?,
        );
        bar.set_message("extracting");
        bar
    };

    let mut runner = BatchRunner::new(EnfExtractor::new(config)).with_progress(bar.clone());
    if let Some(timeout) = args.timeout() {
        runner = runner.with_timeout(timeout);
    }

    let outcomes = runner.run_inputs(&inputs, |path| load_source(path, kind));
    bar.finish_and_clear();

    let mut failures = 0;
    for outcome in &outcomes {
        let input = &inputs[outcome.index];
        match &outcome.result {
            Ok(result) => {
                let out_path = cli::result_path(&args.output_dir, input);
                if let Err(e) = cli::write_result(&out_path, result) {
                    failures += 1;
                    eprint!("{}", cli::format_failure(input, &format!("{:#}", e)));
                    continue;
                }

                if args.json {
                    println!("{}", result.to_json().context("Failed to serialize result")?);
                } else {
                    print!("{}", cli::format_summary(input, result, args.verbose));
                    println!("  Saved to: {}\n", out_path.display());
                }
            }
            Err(e) => {
                failures += 1;
                eprint!("{}", cli::format_failure(input, e));
            }
        }
    }

    if !args.json {
        let done = outcomes.len() - failures;
        let summary = format!("{} succeeded, {} failed", done, failures);
        if failures == 0 {
            println!("{}", summary.green());
        } else {
            println!("{}", summary.yellow());
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}
