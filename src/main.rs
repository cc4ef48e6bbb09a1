use indicatif::ParallelProgressIterator;
use log::{LevelFilter, debug, error, info, warn};
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;

use ribofold::cli::alifold::{AlifoldSettings, check_alifold_settings};
use ribofold::cli::core::{Commands, get_cli};
use ribofold::cli::eval::{EvalSettings, check_eval_settings};
use ribofold::cli::fold::{FoldSettings, check_fold_settings};
use ribofold::cli::subopt::{SuboptSettings, check_subopt_settings};
use ribofold::data_types::fold_results::{EnsembleReport, FoldReport, SuboptReport};
use ribofold::fold_solver::{AlifoldConfigBuilder, FoldConfig, FoldConfigBuilder, evaluate_record, solve_alifold, solve_fold_record, solve_subopt_record};
use ribofold::parsing::fasta::{load_alignment, load_sequence_records};
use ribofold::util::file_io::{sanitize_filename, save_json};
use ribofold::util::progress_bar::get_progress_style;
use ribofold::writers::bpp::write_pair_probabilities;
use ribofold::writers::console::{format_alifold_report, format_energy_line, format_fold_report, format_subopt_report};
use ribofold::writers::energy_log::{read_energy_log, write_energy_log};
use ribofold::writers::subopt::SuboptWriter;
use ribofold::writers::summary::FoldSummaryWriter;

/// Sets up the logger with the level matching the number of `-v` flags
fn init_logging(verbosity: u8) {
    let filter_level: LevelFilter = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();
}

/// Builds the rayon global pool or exits
fn init_thread_pool(threads: usize) {
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
        Ok(()) => {},
        Err(e) => {
            error!("Error while building thread pool: {e}");
            std::process::exit(exitcode::OSERR);
        }
    };
}

/// Creates the output folder and saves the CLI options into it, or exits
fn init_output_folder<T: serde::Serialize>(output_folder: &Path, settings: &T) {
    info!("Creating output folder at {output_folder:?}...");
    match std::fs::create_dir_all(output_folder) {
        Ok(()) => {},
        Err(e) => {
            error!("Error while creating output folder: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    let cli_json = output_folder.join("cli_settings.json");
    info!("Saving CLI options to {cli_json:?}...");
    if let Err(e) = save_json(settings, &cli_json) {
        error!("Error while saving CLI options: {e}");
        std::process::exit(exitcode::IOERR);
    }
}

/// Loads the FASTA records, or exits
fn load_records_or_exit(filename: &Path) -> Vec<(String, Vec<u8>)> {
    info!("Loading sequences from {filename:?}...");
    match load_sequence_records(filename) {
        Ok(records) => {
            info!("Loaded {} records.", records.len());
            records.into_iter().collect()
        },
        Err(e) => {
            error!("Error while loading sequences: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    }
}

/// Saves the ensemble pair probabilities next to the other per-record outputs
fn save_pair_probabilities(output_folder: &Path, label: &str, ensemble: &EnsembleReport) {
    let bpp_fn = output_folder.join(format!("{label}.bpp.tsv.gz"));
    debug!("Saving pair probabilities to {bpp_fn:?}...");
    if let Err(e) = write_pair_probabilities(&bpp_fn, &ensemble.pair_probabilities) {
        error!("Error while saving pair probabilities: {e:#}");
        std::process::exit(exitcode::IOERR);
    }
}

fn run_fold(settings: FoldSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    init_logging(settings.verbosity);

    let settings = match check_fold_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    init_thread_pool(settings.threads);
    if let Some(output_folder) = settings.output_folder.as_deref() {
        init_output_folder(output_folder, &settings);
    }

    let records = load_records_or_exit(&settings.input_fasta);

    // build our configuration
    let fold_config: FoldConfig = match FoldConfigBuilder::default()
        .temperature(settings.energy.temperature)
        .dangles(settings.energy.dangles)
        .max_loop(settings.energy.max_loop)
        .enable_partition(settings.enable_partition)
        .mea_gamma(settings.mea_gamma)
        .num_samples(settings.num_samples)
        .seed(settings.seed)
        .bpp_cutoff(settings.bpp_cutoff)
        .build() {
        Ok(fc) => fc,
        Err(e) => {
            error!("Error while building fold config: {e:?}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    // run the parallel iterator to solve them
    let style = get_progress_style();
    info!("Folding records...");
    let mut all_results: Vec<(usize, String, Option<FoldReport>)> = records.into_par_iter()
        .enumerate()
        .map(|(index, (name, sequence))| {
            let report = match solve_fold_record(&name, &sequence, fold_config) {
                Ok(r) => Some(r),
                Err(e) => {
                    error!("Error while folding record #{index} ({name}): {e:#}");
                    None
                }
            };
            (index, name, report)
        })
        .progress_with_style(style)
        .collect();

    // sort them by input order
    all_results.sort_by_key(|(index, _n, _r)| *index);
    info!("Folding complete, saving all outputs...");

    let mut summary_writer = FoldSummaryWriter::new();
    let mut all_reports = vec![];
    for (_index, _name, opt_report) in all_results.into_iter() {
        let Some(report) = opt_report else {
            summary_writer.add_error();
            continue;
        };

        if !settings.quiet {
            print!("{}", format_fold_report(&report));
        }
        summary_writer.add_fold_report(&report);

        if let Some(output_folder) = settings.output_folder.as_deref() {
            let label = sanitize_filename(&report.name);
            let log_fn = output_folder.join(format!("{label}.energy.log"));
            debug!("Saving energy log to {log_fn:?}...");
            if let Err(e) = write_energy_log(&log_fn, &report.mfe_log) {
                error!("Error while saving energy log: {e:#}");
                std::process::exit(exitcode::IOERR);
            }
            if let Some(ensemble) = report.ensemble.as_ref() {
                save_pair_probabilities(output_folder, &label, ensemble);
            }
        }
        all_reports.push(report);
    }
    info!("Solved:error records: {} : {}", summary_writer.solved_records(), summary_writer.error_records());

    // now write things
    if let Some(output_folder) = settings.output_folder.as_deref() {
        let summary_fn = output_folder.join("summary.tsv");
        info!("Saving output summary to {summary_fn:?}...");
        if let Err(e) = summary_writer.write_summary(&summary_fn) {
            error!("Error while saving summary file: {e:#}");
            std::process::exit(exitcode::IOERR);
        }

        let results_fn = output_folder.join("results.json");
        info!("Saving full results to {results_fn:?}...");
        if let Err(e) = save_json(&all_reports, &results_fn) {
            error!("Error while saving results: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    }

    info!("Folding completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn run_subopt(settings: SuboptSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    init_logging(settings.verbosity);

    let settings = match check_subopt_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    init_thread_pool(settings.threads);
    let records = load_records_or_exit(&settings.input_fasta);

    // ensemble settings are not used here, so defaults are fine
    let fold_config: FoldConfig = match FoldConfigBuilder::default()
        .temperature(settings.energy.temperature)
        .dangles(settings.energy.dangles)
        .max_loop(settings.energy.max_loop)
        .build() {
        Ok(fc) => fc,
        Err(e) => {
            error!("Error while building fold config: {e:?}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    let mut subopt_writer = settings.output_filename.as_deref().map(|out_fn| {
        info!("Opening suboptimal structure file at {out_fn:?}...");
        match SuboptWriter::new(out_fn) {
            Ok(sw) => sw,
            Err(e) => {
                error!("Error while building subopt writer: {e:#}");
                std::process::exit(exitcode::IOERR);
            }
        }
    });

    let style = get_progress_style();
    info!("Enumerating suboptimal structures...");
    let mut all_results: Vec<(usize, String, Option<SuboptReport>)> = records.into_par_iter()
        .enumerate()
        .map(|(index, (name, sequence))| {
            let report = match solve_subopt_record(&name, &sequence, fold_config, settings.delta, settings.max_structures) {
                Ok(r) => Some(r),
                Err(e) => {
                    error!("Error while enumerating record #{index} ({name}): {e:#}");
                    None
                }
            };
            (index, name, report)
        })
        .progress_with_style(style)
        .collect();
    all_results.sort_by_key(|(index, _n, _r)| *index);

    let mut solved_records = 0;
    let mut error_records = 0;
    for (_index, name, opt_report) in all_results.into_iter() {
        let Some(report) = opt_report else {
            error_records += 1;
            continue;
        };
        solved_records += 1;
        debug!("{name}: {} structures", report.structures.len());

        if !settings.quiet {
            print!("{}", format_subopt_report(&report));
        }
        if let Some(writer) = subopt_writer.as_mut() {
            if let Err(e) = writer.write_report(&report) {
                error!("Error while writing suboptimal structures: {e:#}");
                std::process::exit(exitcode::IOERR);
            }
        }
    }
    info!("Solved:error records: {solved_records} : {error_records}");

    if let Some(writer) = subopt_writer {
        if let Err(e) = writer.finish() {
            error!("Error while saving suboptimal structures: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    }

    info!("Enumeration completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn run_alifold(settings: AlifoldSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    init_logging(settings.verbosity);

    let settings = match check_alifold_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    if let Some(output_folder) = settings.output_folder.as_deref() {
        init_output_folder(output_folder, &settings);
    }

    info!("Loading alignment from {:?}...", settings.input_fasta);
    let alignment = match load_alignment(&settings.input_fasta) {
        Ok(a) => a,
        Err(e) => {
            error!("Error while loading alignment: {e:#}");
            std::process::exit(exitcode::DATAERR);
        }
    };
    info!("Loaded {} rows with {} columns.", alignment.num_rows(), alignment.num_columns());

    let alifold_config = match FoldConfigBuilder::default()
        .temperature(settings.energy.temperature)
        .dangles(settings.energy.dangles)
        .max_loop(settings.energy.max_loop)
        .enable_partition(settings.enable_partition)
        .mea_gamma(settings.mea_gamma)
        .num_samples(settings.num_samples)
        .seed(settings.seed)
        .bpp_cutoff(settings.bpp_cutoff)
        .build()
        .map_err(|e| e.to_string())
        .and_then(|fold_config| {
            AlifoldConfigBuilder::default()
                .fold_config(fold_config)
                .cv_factor(settings.cv_factor)
                .nc_factor(settings.nc_factor)
                .build()
                .map_err(|e| e.to_string())
        }) {
        Ok(ac) => ac,
        Err(e) => {
            error!("Error while building alifold config: {e}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    info!("Folding alignment...");
    let report = match solve_alifold(&alignment, alifold_config) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while folding alignment: {e:#}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };
    print!("{}", format_alifold_report(&report));

    if let Some(output_folder) = settings.output_folder.as_deref() {
        let mut summary_writer = FoldSummaryWriter::new();
        summary_writer.add_alifold_report(&report);
        let summary_fn = output_folder.join("summary.tsv");
        info!("Saving output summary to {summary_fn:?}...");
        if let Err(e) = summary_writer.write_summary(&summary_fn) {
            error!("Error while saving summary file: {e:#}");
            std::process::exit(exitcode::IOERR);
        }

        let log_fn = output_folder.join("consensus.energy.log");
        info!("Saving energy log to {log_fn:?}...");
        if let Err(e) = write_energy_log(&log_fn, &report.mfe_log) {
            error!("Error while saving energy log: {e:#}");
            std::process::exit(exitcode::IOERR);
        }

        if let Some(ensemble) = report.ensemble.as_ref() {
            save_pair_probabilities(output_folder, "consensus", ensemble);
        }

        let results_fn = output_folder.join("results.json");
        info!("Saving full results to {results_fn:?}...");
        if let Err(e) = save_json(&report, &results_fn) {
            error!("Error while saving results: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    }

    info!("Alignment folding completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn run_eval(settings: EvalSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    init_logging(settings.verbosity);

    let settings = match check_eval_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    if let Some(output_folder) = settings.output_folder.as_deref() {
        init_output_folder(output_folder, &settings);
    }

    let fold_config: FoldConfig = match FoldConfigBuilder::default()
        .temperature(settings.energy.temperature)
        .dangles(settings.energy.dangles)
        .max_loop(settings.energy.max_loop)
        .build() {
        Ok(fc) => fc,
        Err(e) => {
            error!("Error while building fold config: {e:?}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    // (name, sequence, structure, previously logged total)
    let jobs: Vec<(String, Vec<u8>, String, Option<f64>)> = if let Some(log_fn) = settings.energy_log.as_deref() {
        info!("Loading energy log from {log_fn:?}...");
        match read_energy_log(log_fn) {
            Ok(log) => vec![(log.name, log.sequence.into_bytes(), log.structure.to_string(), Some(log.total))],
            Err(e) => {
                error!("Error while loading energy log: {e:#}");
                std::process::exit(exitcode::DATAERR);
            }
        }
    } else {
        let input_fasta = settings.input_fasta.as_deref().unwrap_or(Path::new(""));
        let structure = settings.structure.clone().unwrap_or_default();
        load_records_or_exit(input_fasta).into_iter()
            .map(|(name, sequence)| (name, sequence, structure.clone(), None))
            .collect()
    };

    for (name, sequence, structure, logged_total) in jobs.into_iter() {
        let log = match evaluate_record(&name, &sequence, &structure, fold_config) {
            Ok(l) => l,
            Err(e) => {
                error!("Error while evaluating {name:?}: {e:#}");
                std::process::exit(exitcode::DATAERR);
            }
        };

        if let Some(logged_total) = logged_total {
            if (logged_total - log.total).abs() > 0.005 {
                warn!("{name}: logged total {logged_total:.2} differs from the evaluated total {:.2}", log.total);
            } else {
                info!("{name}: logged total matches the evaluated total");
            }
        }

        print!("{log}");
        println!("{}", format_energy_line(&log.structure, log.total));

        if let Some(output_folder) = settings.output_folder.as_deref() {
            let log_fn = output_folder.join(format!("{}.energy.log", sanitize_filename(&name)));
            info!("Saving energy log to {log_fn:?}...");
            if let Err(e) = write_energy_log(&log_fn, &log) {
                error!("Error while saving energy log: {e:#}");
                std::process::exit(exitcode::IOERR);
            }
        }
    }

    info!("Evaluation completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Fold(settings) => {
            run_fold(*settings);
        },
        Commands::Subopt(settings) => {
            run_subopt(*settings);
        },
        Commands::Alifold(settings) => {
            run_alifold(*settings);
        },
        Commands::Eval(settings) => {
            run_eval(*settings);
        }
    }

    info!("Process finished successfully.");
}
