//! Audio Aligner - per-chunk delay between two soundtracks

use anyhow::Context;
use audio_aligner::audio::WavTrackLoader;
use audio_aligner::config::Config;
use audio_aligner::processing::{AlignEvent, Aligner, AlignmentReport};
use audio_aligner::{init_logging, AlignerError, Args};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::process;

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if args.verbose {
        println!("{}", audio_aligner::get_library_info());
        println!();
    }

    let config = Config::from_args_and_config(args).context("Invalid configuration")?;

    for track in [&config.reference, &config.secondary] {
        if !track.path.exists() {
            return Err(AlignerError::config(format!(
                "Input file does not exist: {}", track.path.display()
            ))
            .into());
        }
    }

    let chunk_duration = config.chunk_duration();
    let verbose = config.verbose();
    let aligner = Aligner::new(config, WavTrackLoader::new())?;

    let progress = ProgressBar::hidden();
    let report = aligner.run(|event| match event {
        AlignEvent::Started { chunks, workers } => {
            progress.set_draw_target(indicatif::ProgressDrawTarget::stderr());
            progress.set_length(chunks as u64);
            progress.set_style(
                ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            progress.set_message(format!("Processing {} chunks ({} workers)", chunks, workers));
        }
        AlignEvent::ChunkDone { .. } => progress.inc(1),
    });
    progress.finish_and_clear();

    let report = report?;
    print_report(&report, chunk_duration, verbose);
    Ok(())
}

fn print_report(report: &AlignmentReport, chunk_duration: f64, verbose: bool) {
    println!("Delays per chunk:");
    for line in report.summary.chunk_lines(chunk_duration) {
        println!("{}", line);
    }
    println!();

    for line in report.summary.summary_lines() {
        println!("{}", line);
    }

    if !report.failed_chunks.is_empty() {
        println!();
        println!("Failed chunks: {:?}", report.failed_chunks);
    }

    if verbose {
        println!();
        println!("Chunks: {} ({} workers)", report.chunk_count, report.worker_count);
        println!("Frame rate: {} ({:.2}ms tolerance)", report.target_fps, report.summary.tolerance_ms);
        println!("Time: {:.2}s", report.processing_time_secs);
    }
}
