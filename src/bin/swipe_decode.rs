//! Swipe decoding CLI
//!
//! Decodes a gesture trace into ranked candidate words.
//! Usage: cargo run --bin swipe-decode -- --word hello --weights models/swipe.bin
//!        cargo run --bin swipe-decode -- --trace trace.json --beam-width 8

use candle_core::Device;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::error::Error;
use std::fs;
use swipe_decoder::keyboard::remap_trace;
use swipe_decoder::{
    BeamSearchConfig, GesturePoint, KeyLayout, ModelConfig, Prediction, SwipeDecoder,
    SwipeTransformer,
};
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "swipe-decode")]
#[command(about = "Decode a swipe gesture into ranked candidate words")]
struct Args {
    /// JSON file with an array of {x, y, t} samples
    #[arg(short, long, conflicts_with = "word")]
    trace: Option<String>,

    /// Synthesize a trace through the key centers of this word
    #[arg(short, long)]
    word: Option<String>,

    /// Bincode weights blob; an untrained model is used when absent
    #[arg(long)]
    weights: Option<String>,

    /// Number of beams kept per step
    #[arg(short, long, default_value = "5")]
    beam_width: usize,

    /// Samples per key when synthesizing a word trace
    #[arg(long, default_value = "8")]
    points_per_key: usize,

    /// Gaussian jitter (std dev) on synthesized samples
    #[arg(long, default_value = "0.01")]
    jitter: f32,

    /// Seed for the synthesized jitter
    #[arg(long, default_value = "42")]
    seed: u64,

    /// The trace was recorded on the phone layout; remap it first
    #[arg(long)]
    mobile_trace: bool,

    /// Write the model's weights to this path after decoding
    #[arg(long)]
    export_weights: Option<String>,

    /// Print predictions as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Straight-line trace through the word's key centers, 20 ms between samples.
fn synthesize_trace(
    layout: &KeyLayout,
    word: &str,
    points_per_key: usize,
    jitter: f32,
    seed: u64,
) -> Result<Vec<GesturePoint>, Box<dyn Error>> {
    let centers: Vec<(f32, f32)> = word.chars().filter_map(|c| layout.center(c)).collect();
    if centers.is_empty() {
        return Err(format!("'{}' contains no letters", word).into());
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0f32, jitter.max(0.0))?;
    let steps = points_per_key.max(1);
    let mut trace = Vec::with_capacity(centers.len() * steps);

    for (ki, &(cx, cy)) in centers.iter().enumerate() {
        let (nx, ny) = centers.get(ki + 1).copied().unwrap_or((cx, cy));
        for si in 0..steps {
            let f = si as f32 / steps as f32;
            let x = cx + f * (nx - cx) + noise.sample(&mut rng);
            let y = cy + f * (ny - cy) + noise.sample(&mut rng);
            trace.push(GesturePoint::new(x, y, (trace.len() * 20) as i64));
        }
    }
    Ok(trace)
}

fn load_trace(path: &str) -> Result<Vec<GesturePoint>, Box<dyn Error>> {
    let content = fs::read_to_string(path)?;
    let trace: Vec<GesturePoint> = serde_json::from_str(&content)?;
    Ok(trace)
}

fn print_predictions(predictions: &[Prediction]) {
    if predictions.is_empty() {
        println!("(no candidates)");
        return;
    }
    for (rank, p) in predictions.iter().enumerate() {
        println!("{:>2}. {:<22} {:>8.4}", rank + 1, p.word, p.score);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let device = Device::Cpu;
    let layout = KeyLayout::qwerty();

    let model = match &args.weights {
        Some(path) => {
            let blob = fs::read(path)?;
            SwipeTransformer::from_blob(&blob, &device)?
        }
        None => {
            eprintln!("No --weights given, decoding with an untrained model");
            SwipeTransformer::new(ModelConfig::default(), &device)?
        }
    };
    info!(
        parameters = model.parameter_count(),
        size_mb = model.estimated_size_mb(),
        "model ready"
    );

    let mut trace = match (&args.trace, &args.word) {
        (Some(path), _) => load_trace(path)?,
        (None, Some(word)) => {
            synthesize_trace(&layout, word, args.points_per_key, args.jitter, args.seed)?
        }
        (None, None) => return Err("either --trace or --word is required".into()),
    };
    if args.mobile_trace {
        trace = remap_trace(&KeyLayout::mobile(), &layout, &trace);
    }

    let config = BeamSearchConfig {
        beam_width: args.beam_width,
        ..BeamSearchConfig::default()
    };
    let decoder = SwipeDecoder::new(&layout, &model, config)?;
    let predictions = decoder.decode_trace(&trace)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&predictions)?);
    } else {
        println!("{} samples, beam width {}", trace.len(), args.beam_width);
        print_predictions(&predictions);
    }

    if let Some(path) = &args.export_weights {
        fs::write(path, model.save_weights()?)?;
        println!("✓ Weights written to {}", path);
    }

    Ok(())
}
