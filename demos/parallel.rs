use std::time::Instant;

use trs::{Trace, TraceSetReader, TraceSetWriter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration
    let num_traces: usize = 200_000;
    let num_samples = 250;
    let filename = "test_parallel.trs";

    println!("TRS Parallel Scan Test");
    println!("======================");
    println!("Traces: {}", num_traces);
    println!("Samples per trace: {}\n", num_samples);

    // ========== WRITE TEST ==========
    println!("Writing...");
    let write_start = Instant::now();
    {
        let mut writer = TraceSetWriter::create(filename)?;
        for i in 0..num_traces {
            let samples: Vec<f32> = (0..num_samples)
                .map(|j| ((i + j) % 97) as f32 + 0.25)
                .collect();
            writer.add(&Trace::from_samples(format!("trace {i:06}"), samples))?;
        }
        writer.close()?;
    }
    println!("  ✓ Write complete in {:.2}s\n", write_start.elapsed().as_secs_f64());

    // ========== PARALLEL SCAN ==========
    // Each thread opens its own reader and walks a disjoint slice of
    // the index range; readers share the file but not their windows.
    let threads = num_cpus::get();
    println!("Scanning with {} threads...", threads);
    let chunk = num_traces.div_ceil(threads);

    let start = Instant::now();
    let totals: Vec<(u64, f64)> = std::thread::scope(|scope| {
        let mut handles = Vec::new();
        for t in 0..threads {
            let lo = t * chunk;
            let hi = ((t + 1) * chunk).min(num_traces);
            handles.push(scope.spawn(move || -> trs::Result<(u64, f64)> {
                let mut reader = TraceSetReader::open(filename)?;
                let mut count = 0u64;
                let mut sum = 0.0f64;
                for i in lo..hi {
                    let trace = reader.get(i)?;
                    count += 1;
                    sum += trace.samples().iter().map(|&v| v as f64).sum::<f64>();
                }
                Ok((count, sum))
            }));
        }
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<trs::Result<Vec<_>>>()
    })?;
    let scan_elapsed = start.elapsed();

    let traces_scanned: u64 = totals.iter().map(|(count, _)| count).sum();
    let grand_total: f64 = totals.iter().map(|(_, sum)| sum).sum();

    println!("  Traces scanned: {}", traces_scanned);
    println!("  Sample total: {:.1}", grand_total);
    println!(
        "  Duration: {:.3}s ({:.0} traces/s)",
        scan_elapsed.as_secs_f64(),
        traces_scanned as f64 / scan_elapsed.as_secs_f64()
    );
    assert_eq!(traces_scanned as usize, num_traces, "Trace count mismatch!");

    std::fs::remove_file(filename)?;
    Ok(())
}
