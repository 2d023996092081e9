//! voicegender - Speaker Gender Recognition

use clap::Parser;
use std::process;
use std::sync::Arc;
use voicegender::config::Config;
use voicegender::processing::{AnalysisSession, LogProgressReporter};
use voicegender::{init_logging, Args, ClassifierService, FeatureExtractor, GenderError, Result};

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    if args.verbose {
        println!("{}", voicegender::get_library_info());
        println!();
    }

    let config = Config::from_args_and_config(&args)?;

    if args.test_only {
        return run_test_mode(&config);
    }

    // The classifier is required before any file can be analyzed.
    let classifier = Arc::new(ClassifierService::load(config.model_path(), config.scaler_path())?);

    let Some(input) = args.input.as_ref() else {
        return Err(GenderError::config("No input file given (use -i/--input)"));
    };
    if !input.exists() {
        return Err(GenderError::io(format!("Input file does not exist: {}", input.display())));
    }

    println!("=== Speaker Gender Recognition ===");
    println!("Input: {}", input.display());
    println!("Model: {}", config.model_path().display());
    println!("==================================\n");

    let result = if args.visualize || args.export_visualization.is_some() {
        let mut session = AnalysisSession::new(
            &config,
            Arc::clone(&classifier),
            Box::new(LogProgressReporter::new("Visualization")),
        )?;
        let handle = session.load_file(input)?;
        session.wait(&handle)?;

        let view = session.view();
        let Some(viz) = view.visualization() else {
            return Err(GenderError::processing(view.status().to_string()));
        };
        let spec = &viz.spectrogram;
        println!("Waveform: {} samples, {:.2}s at {} Hz",
                 viz.waveform.samples.len(), viz.waveform.duration_secs, viz.waveform.sample_rate);
        println!("Spectrogram: {} bins x {} frames, {:.1} to {:.1} dB",
                 spec.n_bins(), spec.n_frames(), spec.db_range.0, spec.db_range.1);
        let loudest = spec.mean_spectrum()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(bin, _)| spec.frequencies_hz[bin]);
        if let Some(freq) = loudest {
            println!("Strongest frequency: {:.1} Hz", freq);
        }

        if let Some(export) = &args.export_visualization {
            viz.save_json(export)?;
            println!("Visualization written to {}", export.display());
        }

        let handle = session.request_prediction()?;
        session.wait(&handle)?;
        let result = session.view().prediction().copied()
            .ok_or_else(|| GenderError::processing(session.view().status().to_string()))?;
        session.shutdown();
        result
    } else {
        let extractor = FeatureExtractor::new(config.features.clone())?;
        let features = extractor.extract(input)?;
        classifier.predict(&features)?
    };

    println!("Result: {} (confidence: {:.2}%)", result.label, result.confidence * 100.0);
    if config.verbose() {
        println!("P(female) = {:.4}, P(male) = {:.4}", result.probabilities[0], result.probabilities[1]);
    }

    Ok(())
}

fn run_test_mode(config: &Config) -> Result<()> {
    println!("=== Test Mode ===");
    config.validate()?;
    println!("✅ Config OK");
    println!("✅ Feature dimension: {}", config.features.n_mfcc);
    println!("✅ CPU cores: {}", num_cpus::get());
    println!("✅ Ready for processing");
    Ok(())
}
