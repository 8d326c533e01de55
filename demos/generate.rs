use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use trs::{Header, Trace, TraceParameterMap, TraceSetWriter, TypedKey};

#[derive(Parser)]
struct Args {
    /// Output file path
    #[clap(required = true)]
    path: String,
    /// Number of traces to generate
    #[clap(long, default_value_t = 10_000)]
    traces: usize,
    /// Samples per trace
    #[clap(long, default_value_t = 1_000)]
    samples: usize,
    /// Bytes of random cipher input attached to each trace
    #[clap(long, default_value_t = 16)]
    input_len: usize,
    #[clap(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = if let Some(seed) = args.seed {
        SmallRng::seed_from_u64(seed)
    } else {
        SmallRng::from_os_rng()
    };

    let input: TypedKey<Vec<u8>> = TypedKey::new("INPUT");

    let mut header = Header::new();
    header.set_global_title("synthetic noise");
    let mut writer = TraceSetWriter::create_with(&args.path, header)?;

    let start = Instant::now();
    for i in 0..args.traces {
        let samples: Vec<f32> = (0..args.samples)
            .map(|_| rng.random_range(-1.0f32..1.0))
            .collect();
        let mut parameters = TraceParameterMap::new();
        let mut bytes = vec![0u8; args.input_len];
        rng.fill(&mut bytes[..]);
        parameters.insert(&input, bytes)?;
        writer.add(&Trace::new(format!("trace {i:08}"), samples, parameters))?;
    }
    writer.close()?;
    let elapsed = start.elapsed();

    let total_bytes = std::fs::metadata(&args.path)?.len();

    eprintln!("Finished generating {} traces", args.traces);
    eprintln!("Elapsed time: {:?}", elapsed);
    eprintln!(
        "Bandwidth: {:.2} Gb/s",
        total_bytes as f64 / elapsed.as_millis() as f64 * 1000.0 / 1_000_000_000.0
    );

    Ok(())
}
