use perfetto_format::{ArgValue, BenchmarkMetadata, PerfettoTraceWriter};
use std::fs::File;
use std::io::BufWriter;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

fn timestamp_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_micros() as i64
}

fn main() -> anyhow::Result<()> {
    let file = File::create("benchmark_run.pftrace")?;
    let mut writer = PerfettoTraceWriter::new(BufWriter::new(file));

    let start = timestamp_micros();
    writer.write_chrome_metadata("LINUX_CLOCK_MONOTONIC")?;
    writer.write_metadata(
        &BenchmarkMetadata::builder()
            .benchmark_start_time_us(start)
            .story_run_time_us(start)
            .benchmark_name("example")
            .benchmark_description("writes a few legacy events")
            .story_name("load_page")
            .story_tags(vec!["demo".to_string()])
            .label("local")
            .build(),
    )?;

    let tid = 1;
    writer.write_thread_descriptor_event(process::id(), tid, start)?;
    writer.write_event(
        "M",
        "__metadata",
        "thread_name",
        start,
        &[("name", ArgValue::from("main"))],
        tid,
    )?;

    for i in 0..10i64 {
        let ts = timestamp_micros();
        writer.write_event("B", "example", "iteration", ts, &[("i", i.into())], tid)?;
        writer.write_event("E", "example", "iteration", ts + 250, &[], tid)?;
    }

    writer.flush()?;
    println!("Trace written to: benchmark_run.pftrace");
    Ok(())
}
