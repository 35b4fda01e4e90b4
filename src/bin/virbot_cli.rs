use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

use virbot_rs::contig::TaxonomyMode;
use virbot_rs::error::VirbotError;
use virbot_rs::refdb::{ReferenceBundle, ReferenceDatabase};
use virbot_rs::tools::{run_diamond, run_hmmsearch, run_prodigal, RunLayout};
use virbot_rs::{predict, PredictInputs, PredictOptions};

fn parse_taxonomy_mode(s: &str) -> Result<TaxonomyMode, String> {
    s.parse().map_err(|e: virbot_rs::error::ConfigError| e.to_string())
}

#[derive(Parser, Debug)]
#[command(name = "virbot-rs")]
#[command(version)]
#[command(about = "Identify RNA-viral contigs from protein homology evidence")]
struct Args {
    /// The input contig file (FASTA, optionally gzipped).
    #[arg(long = "input", value_name = "FASTA")]
    input: PathBuf,

    /// The output directory; must not exist or be empty.
    #[arg(long = "output", value_name = "DIR", default_value = "VB_result")]
    output: PathBuf,

    /// The directory containing reference files and models.
    #[arg(long = "ref", value_name = "DIR", env = "VIRBOT_REF")]
    reference: PathBuf,

    /// Run the sensitive mode (adds a DIAMOND search against known RNA-virus proteins).
    #[arg(long = "sen")]
    sensitive: bool,

    /// Taxonomic assignment mode: TOP or LCA.
    #[arg(long = "taxa", value_name = "MODE", default_value = "TOP", value_parser = parse_taxonomy_mode)]
    taxa: TaxonomyMode,

    /// Threads handed to hmmsearch and DIAMOND.
    #[arg(long = "threads", value_name = "N", default_value_t = 8)]
    threads: usize,
}

fn stage_spinner(color: &str, msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&[
                "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
            ])
            .template(&format!("{{spinner:.{}}} {{msg}}", color))
            .expect("Invalid spinner template"),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(msg.to_string());
    spinner
}

fn run(args: &Args) -> Result<(), VirbotError> {
    let bundle = ReferenceBundle::locate(&args.reference)?;
    let db = ReferenceDatabase::from_bundle(&bundle)?;
    let layout = RunLayout::create(&args.output)?;

    log::info!("Input contig: {}", args.input.display());
    log::info!("Output directory: {}", layout.output_dir.display());
    log::info!(
        "Mode: {} mode, taxonomy {}",
        if args.sensitive { "sensitive" } else { "default" },
        args.taxa
    );

    // 1. Protein prediction
    let spinner = stage_spinner("blue", "Predicting the encoded proteins...");
    let result = run_prodigal(&args.input, &layout);
    spinner.finish_and_clear();
    result?;
    log::info!("Proteins prediction finished.");

    // 2. Profile search
    let spinner = stage_spinner("green", "Scanning the proteins by hmmsearch...");
    let result = run_hmmsearch(&bundle, &layout, args.threads);
    spinner.finish_and_clear();
    result?;
    log::info!("HMMER finished.");

    // 3. Pairwise search (sensitive mode only)
    if args.sensitive {
        let spinner = stage_spinner("magenta", "Scanning the proteins by DIAMOND...");
        let result = run_diamond(&bundle, &layout, args.threads);
        spinner.finish_and_clear();
        result?;
        log::info!("DIAMOND finished.");
    }

    // 4. Classification
    let inputs = PredictInputs {
        contigs: args.input.clone(),
        proteins: layout.predicted_proteins(),
        profile_hits: layout.profile_hits(),
        pairwise_hits: args.sensitive.then(|| layout.pairwise_hits()),
    };
    let options = PredictOptions {
        taxonomy_mode: args.taxa,
        sensitive: args.sensitive,
    };
    let spinner = stage_spinner("yellow", "Classifying contigs...");
    let results = predict(&inputs, &db, options);
    spinner.finish_and_clear();
    let results = results?;

    // 5. Outputs
    let spinner = stage_spinner("cyan", "Writing output files...");
    let written = results.write_outputs(&layout.output_dir);
    spinner.finish_and_clear();
    written?;

    log::info!(
        "{} of {} contigs predicted RNA-viral; results in {}",
        results.totals.positive_contigs,
        results.totals.total_contigs,
        layout.output_dir.display()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        let code = match &e {
            VirbotError::Tool(tool_err) => tool_err.exit_code(),
            _ => 1,
        };
        std::process::exit(code);
    }
}
