use eyre::{Context, Result};
use perfetto_format::perfetto::Trace;
use prost::Message;
use rstest::{fixture, rstest};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

struct TestSetup {
    _temp_dir: TempDir,
    config_path: PathBuf,
    input_path: PathBuf,
    output_path: PathBuf,
}

impl TestSetup {
    fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.toml");
        let input_path = temp_dir.path().join("trace.json");
        let output_path = temp_dir.path().join("trace.perfetto");

        let config_content = r#"
clock_domain = "LINUX_CLOCK_MONOTONIC"

[benchmark]
name = "benchmark"
description = "description"
story_name = "story"
story_tags = ["foo", "bar"]
label = "label"
"#;
        fs::write(&config_path, config_content)?;

        Ok(TestSetup {
            _temp_dir: temp_dir,
            config_path,
            input_path,
            output_path,
        })
    }

    fn run(&self, input: &str) -> Result<std::process::Output> {
        fs::write(&self.input_path, input)?;
        Command::new(env!("CARGO_BIN_EXE_trace-convert"))
            .arg(&self.input_path)
            .arg("--output")
            .arg(&self.output_path)
            .arg("--config")
            .arg(&self.config_path)
            .output()
            .context("failed to spawn trace-convert")
    }

    fn read_trace(&self) -> Result<Trace> {
        let bytes = fs::read(&self.output_path)?;
        Ok(Trace::decode(bytes.as_slice())?)
    }
}

#[fixture]
fn setup() -> TestSetup {
    TestSetup::new().expect("failed to create test setup")
}

#[rstest]
fn test_convert_json_trace(setup: TestSetup) -> Result<()> {
    let output = setup.run(
        r#"{"traceEvents": [
            {"ph": "M", "cat": "__metadata", "name": "thread_name", "ts": 0, "pid": 1, "tid": 2,
             "args": {"name": "CrBrowserMain"}},
            {"ph": "B", "cat": "toplevel", "name": "RunTask", "ts": 1556716807306000, "pid": 1, "tid": 2,
             "args": {"int": 123, "double": 1.23, "string": "onetwothree"}},
            {"ph": "E", "cat": "toplevel", "name": "RunTask", "ts": 1556716807406000, "pid": 1, "tid": 2}
        ]}"#,
    )?;
    assert!(output.status.success(), "trace-convert failed: {:?}", output);

    let trace = setup.read_trace()?;
    assert_eq!(trace.packet.len(), 6);

    let clock = &trace.packet[0].chrome_events.as_ref().unwrap().metadata[0];
    assert_eq!(clock.name.as_deref(), Some("clock-domain"));
    assert_eq!(clock.string_value.as_deref(), Some("LINUX_CLOCK_MONOTONIC"));

    let benchmark = trace.packet[1].chrome_benchmark_metadata.as_ref().unwrap();
    assert_eq!(benchmark.benchmark_start_time_us, Some(1556716807306000));
    assert_eq!(benchmark.story_tags, vec!["foo", "bar"]);

    let descriptor = trace.packet[2].thread_descriptor.as_ref().unwrap();
    assert_eq!(descriptor.tid, Some(2));
    assert_eq!(descriptor.reference_timestamp_us, Some(0));

    let begin = trace.packet[4].track_event.as_ref().unwrap();
    assert_eq!(begin.timestamp_delta_us, Some(1556716807306000));
    assert_eq!(begin.debug_annotations.len(), 3);

    let end = trace.packet[5].track_event.as_ref().unwrap();
    assert_eq!(end.timestamp_delta_us, Some(100000));
    assert_eq!(end.category_iids, vec![2]);
    assert_eq!(trace.packet[5].interned_data, None);
    Ok(())
}

#[rstest]
fn test_malformed_input_fails(setup: TestSetup) -> Result<()> {
    let output = setup.run("{\"traceEvents\": 42}")?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to parse trace"), "stderr: {}", stderr);
    Ok(())
}
