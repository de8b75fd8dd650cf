use log::{LevelFilter, error, info};
use serde::Serialize;
use std::time::Instant;

use quokka::alignment_classifier::{AlignmentClassifier, AlignmentClassifierConfigBuilder};
use quokka::cli::align::{AlignSettings, check_align_settings};
use quokka::cli::common::CommonSettings;
use quokka::cli::core::{Commands, get_cli};
use quokka::cli::express::{ExpressSettings, check_express_settings};
use quokka::cli::fold::{FoldSettings, check_fold_settings};
use quokka::cli::fusion::{FusionSettings, check_fusion_settings};
use quokka::cli::germline::{GermlineSettings, check_germline_settings};
use quokka::data_types::confusion::ConfusionCounter;
use quokka::expression_classifier::{ExpressionClassifier, ExpressionClassifierConfigBuilder};
use quokka::fold_change_classifier::{FoldChangeClassifier, FoldChangeClassifierConfigBuilder};
use quokka::fusion_classifier::{FusionClassifier, FusionClassifierConfigBuilder};
use quokka::limit_of_detection::SensitivityResult;
use quokka::parsing::annotation::{load_fusion_annotation, load_transcript_annotation, load_variant_annotation};
use quokka::parsing::features::{load_expression, load_features, load_folds, load_fusions};
use quokka::parsing::mixture::{collapse_allele_pairs, load_mixture};
use quokka::parsing::variant_calls::{for_each_call, load_calls};
use quokka::reference::builder::ReferenceBuilder;
use quokka::reference::model::ReferenceModel;
use quokka::reference::regions::SequinRegions;
use quokka::util::json_io::save_json;
use quokka::variant_classifier::{VariantClassifier, VariantClassifierConfigBuilder};
use quokka::writers::feature_tables::{write_fusions, write_missing_features, write_points};
use quokka::writers::stats::write_stats;
use quokka::writers::summary::SummaryWriter;
use quokka::writers::variant_tables::{write_detected, write_sequins};

/// Sets up logging before we check the other settings
fn start_logging(verbosity: u8) {
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

/// Builds the thread pool, creates the output folder and saves the CLI settings
fn prepare_run<T: Serialize>(common: &CommonSettings, settings: &T) {
    // set up the number of threads for rayon
    match rayon::ThreadPoolBuilder::new().num_threads(common.threads).build_global() {
        Ok(()) => {},
        Err(e) => {
            error!("Error while building thread pool: {e}");
            std::process::exit(exitcode::OSERR);
        }
    };

    // create the primary output folder
    info!("Creating output folder at {:?}...", common.output_folder);
    match std::fs::create_dir_all(&common.output_folder) {
        Ok(()) => {},
        Err(e) => {
            error!("Error while creating output folder: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    // save the CLI options
    let cli_json = common.output_folder.join("cli_settings.json");
    info!("Saving CLI options to {cli_json:?}...");
    if let Err(e) = save_json(settings, &cli_json) {
        error!("Error while saving CLI options: {e:#}");
        std::process::exit(exitcode::IOERR);
    }
}

/// Logs the size of the reference; dropped ids are reported by the builder
fn log_reference(reference: &ReferenceModel) {
    info!("Loaded {} sequins on {} chromosomes, mixtures: {:?}",
        reference.entity_count(), reference.chromosomes().count(), reference.mixtures());
    let dropped = reference.report().dropped_count();
    if dropped > 0 {
        info!("\t{dropped} ids or rows were dropped while matching annotation and mixture");
    }
}

/// Logs one headline counter
fn log_counter(label: &str, counter: &ConfusionCounter) {
    match counter.snapshot() {
        Ok(s) => info!("\t{label}: TP={} FP={} FN={} sensitivity={:.4} precision={:.4} F1={:.4}",
            s.tp, s.fp, s.fn_, s.sensitivity, s.precision, s.f1),
        Err(e) => error!("\t{label}: {e}")
    };
}

fn log_sensitivity(sensitivity: &SensitivityResult) {
    match sensitivity.entity_id() {
        Some(entity_id) => info!("\tLimit of detection: {entity_id} at {} ({} detections)",
            sensitivity.abundance(), sensitivity.detection_count()),
        None => info!("\tLimit of detection: nothing detected")
    };
}

fn run_germline(settings: GermlineSettings) {
    // start the timer
    let start_time = Instant::now();
    start_logging(settings.common.verbosity);

    let settings = match check_germline_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    prepare_run(&settings.common, &settings);

    // load the reference inputs
    info!("Loading variant annotation from {:?}...", settings.annotation_fn);
    let annotations = match load_variant_annotation(&settings.annotation_fn) {
        Ok(a) => a,
        Err(e) => {
            error!("Error while loading variant annotation: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    info!("Loading mixture from {:?}...", settings.common.mixture_fn);
    let mixture = match load_mixture(&settings.common.mixture_fn) {
        Ok(m) => collapse_allele_pairs(m),
        Err(e) => {
            error!("Error while loading mixture: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };

    let mut builder = ReferenceBuilder::new()
        .with_synthetic_chroms(settings.common.synthetic_chroms.iter().cloned());
    builder.extend_variant_annotations(annotations);
    builder.extend_mixture_records(mixture);
    let reference = match builder.build_variants() {
        Ok(r) => r,
        Err(e) => {
            error!("Error while building the variant reference: {e}");
            std::process::exit(exitcode::DATAERR);
        }
    };
    log_reference(&reference);

    let regions = match settings.regions.as_deref() {
        Some(regions_fn) => {
            info!("Loading regions from {regions_fn:?}...");
            SequinRegions::from_bed(regions_fn)
        },
        None => SequinRegions::from_reference(&reference, settings.region_flank)
    };
    let regions = match regions {
        Ok(r) => r,
        Err(e) => {
            error!("Error while building sequin regions: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    info!("Sequin regions: {}", regions.len());

    let config = match VariantClassifierConfigBuilder::default()
        .passed_only(settings.passed_only)
        .fuzzy(settings.fuzzy)
        .evaluated_class(settings.class)
        .significance(settings.significance)
        .mixture(settings.common.mix.clone())
        .build() {
        Ok(c) => c,
        Err(e) => {
            error!("Error while building classifier config: {e}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };
    let classifier = match VariantClassifier::new(&reference, &regions, config) {
        Ok(c) => c,
        Err(e) => {
            error!("Error while configuring classifier: {e}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // score the calls, streaming unless we have threads to spare
    let sample: Option<&str> = if settings.sample.is_empty() { None } else { Some(settings.sample.as_str()) };
    info!("Classifying {} calls from {:?} against mixture {:?}...", settings.class, settings.calls_fn, classifier.mixture());
    let result = if settings.common.threads > 1 {
        let calls = match load_calls(&settings.calls_fn, sample) {
            Ok(c) => c,
            Err(e) => {
                error!("Error while loading calls: {e:#}");
                std::process::exit(exitcode::IOERR);
            }
        };
        classifier.classify_parallel(calls)
    } else {
        let mut run = classifier.start();
        if let Err(e) = for_each_call(&settings.calls_fn, sample, |call| run.observe(call)) {
            error!("Error while reading calls: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
        run.finish()
    };
    let result = match result {
        Ok(r) => r,
        Err(e) => {
            error!("Error while classifying calls: {e}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    info!("Results:");
    let mapping = result.mapping();
    info!("\tRecords: {} seen, {} classified, {} duplicates, {} other class",
        mapping.seen, mapping.classified, mapping.duplicates, mapping.other_class);
    log_counter("Overall", result.confusion().overall());
    log_counter("JointIndel", &result.confusion().joint_indel());
    log_sensitivity(result.sensitivity());

    // write all the outputs
    let label = settings.common.label.as_str();
    let output_folder = &settings.common.output_folder;
    let mut summary_writer = SummaryWriter::new(label.to_string());
    if let Err(e) = summary_writer.add_variant_classification(&result) {
        error!("Error while summarizing: {e}");
        std::process::exit(exitcode::SOFTWARE);
    }

    let summary_fn = output_folder.join("summary.tsv");
    info!("Saving summary to {summary_fn:?}...");
    if let Err(e) = summary_writer.write_summary(&summary_fn) {
        error!("Error while saving summary: {e}");
        std::process::exit(exitcode::IOERR);
    }

    let sequins_fn = output_folder.join("sequins.tsv");
    info!("Saving sequin outcomes to {sequins_fn:?}...");
    if let Err(e) = write_sequins(&sequins_fn, label, &result) {
        error!("Error while saving sequin outcomes: {e}");
        std::process::exit(exitcode::IOERR);
    }

    let detected_fn = output_folder.join("detected.tsv");
    info!("Saving detected calls to {detected_fn:?}...");
    if let Err(e) = write_detected(&detected_fn, label, &result) {
        error!("Error while saving detected calls: {e}");
        std::process::exit(exitcode::IOERR);
    }

    let stats_fn = output_folder.join("stats.json");
    info!("Saving stats to {stats_fn:?}...");
    if let Err(e) = write_stats(&stats_fn, label, reference.report(), &result) {
        error!("Error while saving stats: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    info!("Germline classification completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

/// Loads the transcript annotation and mixture into a transcriptome reference, exiting on failure
fn load_transcriptome(common: &CommonSettings, annotation_fn: &std::path::Path) -> ReferenceModel {
    info!("Loading transcript annotation from {annotation_fn:?}...");
    let annotations = match load_transcript_annotation(annotation_fn) {
        Ok(a) => a,
        Err(e) => {
            error!("Error while loading transcript annotation: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    info!("Loading mixture from {:?}...", common.mixture_fn);
    let mixture = match load_mixture(&common.mixture_fn) {
        Ok(m) => m,
        Err(e) => {
            error!("Error while loading mixture: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };

    let mut builder = ReferenceBuilder::new()
        .with_synthetic_chroms(common.synthetic_chroms.iter().cloned());
    builder.extend_transcript_annotations(annotations);
    builder.extend_mixture_records(mixture);
    let reference = match builder.build_transcriptome() {
        Ok(r) => r,
        Err(e) => {
            error!("Error while building the transcript reference: {e}");
            std::process::exit(exitcode::DATAERR);
        }
    };
    log_reference(&reference);
    reference
}

fn run_align(settings: AlignSettings) {
    // start the timer
    let start_time = Instant::now();
    start_logging(settings.common.verbosity);

    let settings = match check_align_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    prepare_run(&settings.common, &settings);
    let reference = load_transcriptome(&settings.common, &settings.annotation_fn);

    let config = match AlignmentClassifierConfigBuilder::default()
        .mixture(settings.common.mix.clone())
        .build() {
        Ok(c) => c,
        Err(e) => {
            error!("Error while building classifier config: {e}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };
    let classifier = match AlignmentClassifier::new(&reference, config) {
        Ok(c) => c,
        Err(e) => {
            error!("Error while configuring classifier: {e}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    info!("Loading aligned features from {:?}...", settings.features_fn);
    let features = match load_features(&settings.features_fn) {
        Ok(f) => f,
        Err(e) => {
            error!("Error while loading aligned features: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    let result = match classifier.classify(features) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while classifying aligned features: {e}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    info!("Results:");
    info!("\tRecords: {} seen, {} malformed, {} out of region", result.seen(), result.malformed(), result.out_of_region());
    log_counter("Bases", result.bases());
    log_counter("Exons", result.exons().feature());
    log_counter("Introns", result.introns().feature());
    log_sensitivity(result.sensitivity());

    let label = settings.common.label.as_str();
    let output_folder = &settings.common.output_folder;
    let mut summary_writer = SummaryWriter::new(label.to_string());
    if let Err(e) = summary_writer.add_alignment_classification(&result) {
        error!("Error while summarizing: {e}");
        std::process::exit(exitcode::SOFTWARE);
    }

    let summary_fn = output_folder.join("summary.tsv");
    info!("Saving summary to {summary_fn:?}...");
    if let Err(e) = summary_writer.write_summary(&summary_fn) {
        error!("Error while saving summary: {e}");
        std::process::exit(exitcode::IOERR);
    }

    let missing_fn = output_folder.join("missing.tsv");
    info!("Saving {} undetected features to {missing_fn:?}...", result.missing().len());
    if let Err(e) = write_missing_features(&missing_fn, label, &result) {
        error!("Error while saving undetected features: {e}");
        std::process::exit(exitcode::IOERR);
    }

    let stats_fn = output_folder.join("stats.json");
    info!("Saving stats to {stats_fn:?}...");
    if let Err(e) = write_stats(&stats_fn, label, reference.report(), &result) {
        error!("Error while saving stats: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    info!("Alignment classification completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn run_express(settings: ExpressSettings) {
    // start the timer
    let start_time = Instant::now();
    start_logging(settings.common.verbosity);

    let settings = match check_express_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    prepare_run(&settings.common, &settings);
    let reference = load_transcriptome(&settings.common, &settings.annotation_fn);

    let config = match ExpressionClassifierConfigBuilder::default()
        .level(settings.level)
        .rule(settings.rule)
        .mixture(settings.common.mix.clone())
        .build() {
        Ok(c) => c,
        Err(e) => {
            error!("Error while building classifier config: {e}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };
    let classifier = match ExpressionClassifier::new(&reference, config) {
        Ok(c) => c,
        Err(e) => {
            error!("Error while configuring classifier: {e}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    info!("Loading measured abundances from {:?}...", settings.expression_fn);
    let expression = match load_expression(&settings.expression_fn) {
        Ok(e) => e,
        Err(e) => {
            error!("Error while loading measured abundances: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    let result = match classifier.classify(expression) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while classifying measured abundances: {e}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    info!("Results:");
    let stats = result.stats();
    info!("\tRecords: {} seen, {} malformed, {} out of region, {} unexpressed",
        stats.seen, stats.malformed, stats.out_of_region, stats.unexpressed);
    log_counter(&result.level().to_string(), result.confusion());
    log_sensitivity(result.sensitivity());

    let label = settings.common.label.as_str();
    let output_folder = &settings.common.output_folder;
    let mut summary_writer = SummaryWriter::new(label.to_string());
    if let Err(e) = summary_writer.add_expression_classification(&result) {
        error!("Error while summarizing: {e}");
        std::process::exit(exitcode::SOFTWARE);
    }

    let summary_fn = output_folder.join("summary.tsv");
    info!("Saving summary to {summary_fn:?}...");
    if let Err(e) = summary_writer.write_summary(&summary_fn) {
        error!("Error while saving summary: {e}");
        std::process::exit(exitcode::IOERR);
    }

    let expression_fn = output_folder.join("expression.tsv");
    info!("Saving {} expression points to {expression_fn:?}...", result.points().len());
    if let Err(e) = write_points(&expression_fn, label, result.points()) {
        error!("Error while saving expression points: {e}");
        std::process::exit(exitcode::IOERR);
    }

    let stats_fn = output_folder.join("stats.json");
    info!("Saving stats to {stats_fn:?}...");
    if let Err(e) = write_stats(&stats_fn, label, reference.report(), &result) {
        error!("Error while saving stats: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    info!("Expression classification completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn run_fold(settings: FoldSettings) {
    // start the timer
    let start_time = Instant::now();
    start_logging(settings.common.verbosity);

    let settings = match check_fold_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    prepare_run(&settings.common, &settings);
    let reference = load_transcriptome(&settings.common, &settings.annotation_fn);

    let config = match FoldChangeClassifierConfigBuilder::default()
        .level(settings.level)
        .rule(settings.rule)
        .mixture(settings.common.mix.clone())
        .comparison(settings.mix_b.clone())
        .q_cutoff(settings.q_cutoff)
        .fold_cutoff(settings.fold_cutoff)
        .build() {
        Ok(c) => c,
        Err(e) => {
            error!("Error while building classifier config: {e}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };
    let classifier = match FoldChangeClassifier::new(&reference, config) {
        Ok(c) => c,
        Err(e) => {
            error!("Error while configuring classifier: {e}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    info!("Loading measured fold changes from {:?}...", settings.folds_fn);
    let folds = match load_folds(&settings.folds_fn) {
        Ok(f) => f,
        Err(e) => {
            error!("Error while loading measured fold changes: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    let result = match classifier.classify(folds) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while classifying measured fold changes: {e}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    info!("Results:");
    let stats = result.stats();
    info!("\tRecords: {} seen, {} malformed, {} out of region, {} unmeasured, {} untested",
        stats.seen, stats.malformed, stats.out_of_region, stats.unmeasured, stats.untested);
    info!("\tFold: {} / {}", result.comparison(), result.mixture());
    log_counter(&result.level().to_string(), result.confusion());
    log_counter("Differential", result.differential());
    info!("\tTrue negatives: {}", result.true_negatives());
    log_sensitivity(result.sensitivity());

    let label = settings.common.label.as_str();
    let output_folder = &settings.common.output_folder;
    let mut summary_writer = SummaryWriter::new(label.to_string());
    if let Err(e) = summary_writer.add_fold_change_classification(&result) {
        error!("Error while summarizing: {e}");
        std::process::exit(exitcode::SOFTWARE);
    }

    let summary_fn = output_folder.join("summary.tsv");
    info!("Saving summary to {summary_fn:?}...");
    if let Err(e) = summary_writer.write_summary(&summary_fn) {
        error!("Error while saving summary: {e}");
        std::process::exit(exitcode::IOERR);
    }

    let folds_fn = output_folder.join("folds.tsv");
    info!("Saving {} fold change points to {folds_fn:?}...", result.points().len());
    if let Err(e) = write_points(&folds_fn, label, result.points()) {
        error!("Error while saving fold change points: {e}");
        std::process::exit(exitcode::IOERR);
    }

    let stats_fn = output_folder.join("stats.json");
    info!("Saving stats to {stats_fn:?}...");
    if let Err(e) = write_stats(&stats_fn, label, reference.report(), &result) {
        error!("Error while saving stats: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    info!("Fold change classification completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn run_fusion(settings: FusionSettings) {
    // start the timer
    let start_time = Instant::now();
    start_logging(settings.common.verbosity);

    let settings = match check_fusion_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    prepare_run(&settings.common, &settings);

    // load the reference inputs
    info!("Loading fusion annotation from {:?}...", settings.annotation_fn);
    let annotations = match load_fusion_annotation(&settings.annotation_fn) {
        Ok(a) => a,
        Err(e) => {
            error!("Error while loading fusion annotation: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    info!("Loading mixture from {:?}...", settings.common.mixture_fn);
    let mixture = match load_mixture(&settings.common.mixture_fn) {
        Ok(m) => m,
        Err(e) => {
            error!("Error while loading mixture: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };

    let mut builder = ReferenceBuilder::new()
        .with_synthetic_chroms(settings.common.synthetic_chroms.iter().cloned());
    builder.extend_fusion_annotations(annotations);
    builder.extend_mixture_records(mixture);
    let reference = match builder.build_fusions() {
        Ok(r) => r,
        Err(e) => {
            error!("Error while building the fusion reference: {e}");
            std::process::exit(exitcode::DATAERR);
        }
    };
    log_reference(&reference);

    let config = match FusionClassifierConfigBuilder::default()
        .fuzzy(settings.fuzzy)
        .mixture(settings.common.mix.clone())
        .build() {
        Ok(c) => c,
        Err(e) => {
            error!("Error while building classifier config: {e}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };
    let classifier = match FusionClassifier::new(&reference, config) {
        Ok(c) => c,
        Err(e) => {
            error!("Error while configuring classifier: {e}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    info!("Loading fusion calls from {:?}...", settings.fusions_fn);
    let fusions = match load_fusions(&settings.fusions_fn) {
        Ok(f) => f,
        Err(e) => {
            error!("Error while loading fusion calls: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    let result = match classifier.classify(fusions) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while classifying fusion calls: {e}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    info!("Results:");
    let stats = result.stats();
    info!("\tRecords: {} seen, {} malformed, {} genome, {} genome-synthetic, {} classified, {} duplicates",
        stats.seen, stats.malformed, stats.genome, stats.genome_synthetic, stats.classified, stats.duplicates);
    log_counter("Fusion", result.confusion());
    log_sensitivity(result.sensitivity());

    let label = settings.common.label.as_str();
    let output_folder = &settings.common.output_folder;
    let mut summary_writer = SummaryWriter::new(label.to_string());
    if let Err(e) = summary_writer.add_fusion_classification(&result) {
        error!("Error while summarizing: {e}");
        std::process::exit(exitcode::SOFTWARE);
    }

    let summary_fn = output_folder.join("summary.tsv");
    info!("Saving summary to {summary_fn:?}...");
    if let Err(e) = summary_writer.write_summary(&summary_fn) {
        error!("Error while saving summary: {e}");
        std::process::exit(exitcode::IOERR);
    }

    let detected_fn = output_folder.join("detected.tsv");
    info!("Saving fusion calls to {detected_fn:?}...");
    if let Err(e) = write_fusions(&detected_fn, label, &result) {
        error!("Error while saving fusion calls: {e}");
        std::process::exit(exitcode::IOERR);
    }

    let points_fn = output_folder.join("fusion_points.tsv");
    info!("Saving {} fusion points to {points_fn:?}...", result.points().len());
    if let Err(e) = write_points(&points_fn, label, result.points()) {
        error!("Error while saving fusion points: {e}");
        std::process::exit(exitcode::IOERR);
    }

    let stats_fn = output_folder.join("stats.json");
    info!("Saving stats to {stats_fn:?}...");
    if let Err(e) = write_stats(&stats_fn, label, reference.report(), &result) {
        error!("Error while saving stats: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    info!("Fusion classification completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Germline(settings) => run_germline(*settings),
        Commands::Align(settings) => run_align(*settings),
        Commands::Express(settings) => run_express(*settings),
        Commands::Fold(settings) => run_fold(*settings),
        Commands::Fusion(settings) => run_fusion(*settings)
    }
    info!("Process finished successfully.");
}
