use std::error::Error;
use std::io::Write;
use std::time::Duration;

use renderq::config::{ConfigFile, load_and_validate};
use renderq::engine::JobDescriptor;
use renderq::errors::RenderqError;
use renderq::types::FailPolicy;
use renderq_test_utils::builders::{ConfigFileBuilder, JobConfigBuilder};
use tempfile::NamedTempFile;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(contents: &str) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn job_file_resolves_into_descriptors() -> TestResult {
    let file = write_config(
        r#"
[config]
program = "/opt/tool/render-cmd"
extra_args = ["-log"]
retries = 1
fail_policy = "skip_next"
kill_timeout_s = 5

[[job]]
name = "shot_010"
args = ["Project.uproject", "/Game/Maps/Main", "-game"]
notes = "hero shot"

[[job]]
name = "shot_020"
args = ["Project.uproject"]
enabled = false
program = "/opt/other/render"
retries = 0
fail_policy = "stop_queue"
kill_timeout_s = 0
"#,
    )?;

    let cfg: ConfigFile = load_and_validate(file.path())?;
    assert_eq!(cfg.job.len(), 2);

    let first = JobDescriptor::from_config(&cfg.job[0], &cfg.config);
    assert_eq!(first.id.as_str(), "shot_010");
    assert_eq!(
        first.command,
        [
            "/opt/tool/render-cmd",
            "Project.uproject",
            "/Game/Maps/Main",
            "-game",
            "-log"
        ]
    );
    assert_eq!(first.retry_limit, 1);
    assert_eq!(first.fail_policy, FailPolicy::SkipNext);
    assert_eq!(first.kill_timeout, Duration::from_secs(5));

    let second = JobDescriptor::from_config(&cfg.job[1], &cfg.config);
    assert!(!cfg.job[1].enabled);
    assert_eq!(second.command[0], "/opt/other/render");
    assert_eq!(second.retry_limit, 0);
    assert_eq!(second.fail_policy, FailPolicy::StopQueue);
    assert_eq!(second.kill_timeout, Duration::ZERO);
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_and_validate("/no/such/dir/Renderq.toml").unwrap_err();
    assert!(matches!(err, RenderqError::IoError(_)));
}

#[test]
fn malformed_toml_is_a_toml_error() -> TestResult {
    let file = write_config("[config\nprogram = ")?;
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, RenderqError::TomlError(_)));
    Ok(())
}

#[test]
fn unknown_fail_policy_is_rejected() -> TestResult {
    let file = write_config(
        r#"
[config]
fail_policy = "sometimes"

[[job]]
name = "a"
"#,
    )?;
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, RenderqError::TomlError(_)));
    Ok(())
}

#[test]
fn duplicate_job_names_are_rejected() -> TestResult {
    let file = write_config(
        r#"
[[job]]
name = "a"

[[job]]
name = "a"
"#,
    )?;
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, RenderqError::ConfigError(_)));
    Ok(())
}

#[test]
fn builder_config_keeps_job_order() {
    let cfg = ConfigFileBuilder::new()
        .program("render")
        .with_job(JobConfigBuilder::new("b").arg("x").build())
        .with_job(JobConfigBuilder::new("a").enabled(false).build())
        .build();
    let names: Vec<&str> = cfg.job.iter().map(|j| j.name.as_str()).collect();
    assert_eq!(names, ["b", "a"]);
    assert_eq!(cfg.find_job("a").map(|j| j.enabled), Some(false));
}
