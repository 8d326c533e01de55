use std::time::Instant;

use trs::{load_to_vec, Trace, TraceSetReader, TraceSetWriter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    // Configuration
    let num_traces = 100_000;
    let num_samples = 500;
    let filename = "test_roundtrip.trs";

    println!("TRS Roundtrip Test");
    println!("==================");
    println!("Traces: {}", num_traces);
    println!("Samples per trace: {}\n", num_samples);

    // ========== WRITE TEST ==========
    println!("Writing...");
    let write_start = Instant::now();

    {
        let mut writer = TraceSetWriter::create(filename)?;
        for i in 0..num_traces {
            let samples: Vec<f32> = (0..num_samples)
                .map(|j| ((i * 31 + j) % 251) as f32 * 0.5)
                .collect();
            writer.add(&Trace::from_samples(format!("trace {i:06}"), samples))?;

            if i % 10_000 == 0 && i > 0 {
                let elapsed = write_start.elapsed().as_secs_f64();
                print!("\r  Written: {} traces ({:.0}/s)", i, i as f64 / elapsed);
                std::io::Write::flush(&mut std::io::stdout())?;
            }
        }
        writer.close()?;
    }

    let write_duration = write_start.elapsed();
    let file_size = std::fs::metadata(filename)?.len();
    println!("\r  ✓ Write complete");
    println!("  Duration: {:.2}s", write_duration.as_secs_f64());
    println!(
        "  Bandwidth: {:.2} MB/s\n",
        file_size as f64 / write_duration.as_secs_f64() / 1_000_000.0
    );

    // ========== READ TEST ==========
    println!("Reading...");
    let read_start = Instant::now();

    let mut traces_read = 0u64;
    let mut checksum = 0.0f64;

    {
        let mut reader = TraceSetReader::open(filename)?;
        assert_eq!(reader.len(), num_traces);
        assert_eq!(reader.header().sample_count(), num_samples);

        for result in reader.iter() {
            let trace = result?;
            traces_read += 1;
            checksum += trace.samples().iter().map(|&v| v as f64).sum::<f64>();

            if traces_read % 10_000 == 0 {
                let elapsed = read_start.elapsed().as_secs_f64();
                print!(
                    "\r  Read: {} traces ({:.0}/s)",
                    traces_read,
                    traces_read as f64 / elapsed
                );
                std::io::Write::flush(&mut std::io::stdout())?;
            }
        }
    }

    let read_duration = read_start.elapsed();
    println!("\r  ✓ Read complete");
    println!("  Duration: {:.2}s", read_duration.as_secs_f64());
    println!(
        "  Bandwidth: {:.2} MB/s\n",
        file_size as f64 / read_duration.as_secs_f64() / 1_000_000.0
    );

    // ========== RANDOM ACCESS ==========
    println!("Random access:");
    let mut reader = TraceSetReader::open(filename)?;
    let start = Instant::now();
    for i in [0, num_traces - 1, num_traces / 2, 1, num_traces - 2] {
        let trace = reader.get(i)?;
        println!("  {} -> {}", i, trace.title());
    }
    println!("  5 seeks in {:?}\n", start.elapsed());

    // ========== VERIFICATION ==========
    println!("Verification:");
    println!("  Traces written: {}", num_traces);
    println!("  Traces read: {}", traces_read);
    println!("  Checksum: {:.1}", checksum);
    assert_eq!(traces_read as usize, num_traces, "Trace count mismatch!");
    println!("  ✓ Trace count matches\n");

    // ========== Direct Load ==========
    let start = Instant::now();
    let (_, traces) = load_to_vec(filename)?;
    let elapsed = start.elapsed();
    println!("Direct Load:");
    println!("  Duration: {:.2}s", elapsed.as_secs_f64());
    println!(
        "  Rate: {:.0} traces/s",
        traces.len() as f64 / elapsed.as_secs_f64()
    );

    std::fs::remove_file(filename)?;
    Ok(())
}
