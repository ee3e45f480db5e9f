use gha_profiler::testing::FakeActions;
use gha_profiler::{
    Collector, JobNameRouter, OutputFormat, ProfileConfig, ProfilerError, profile_workflow,
    write_with_format,
};

const CONFIG: &str = r#"
owner = "octo"
repo = "widgets"
workflow_file = "ci.yml"
format = "json"
sort = "mean"
reverse = true
cache = false
job_name_regexp = "^(build|test)"
percentiles = [50, 90]

[[replace]]
regexp = ' \(node \d+\)'
replace = ""
"#;

fn fake() -> FakeActions {
    FakeActions::new()
        .with_jobs(
            101,
            vec![
                FakeActions::job(1, "build (node 18)", &[(1, "checkout", 1.0), (2, "compile", 30.0)]),
                FakeActions::job(2, "lint", &[(1, "checkout", 1.0)]),
            ],
        )
        .with_jobs(
            102,
            vec![
                FakeActions::job(3, "build (node 20)", &[(1, "checkout", 3.0), (2, "compile", 50.0)]),
                FakeActions::job(4, "test", &[(1, "checkout", 2.0), (2, "jest", 12.0)]),
            ],
        )
}

#[test]
fn toml_config_drives_full_profile() {
    let settings = ProfileConfig::from_toml_str(CONFIG)
        .expect("parse")
        .validate()
        .expect("valid");
    assert_eq!(settings.format, OutputFormat::Json);

    let report = profile_workflow(&fake(), &settings).expect("profile");
    let names: Vec<&str> = report.iter().map(|j| j.name.as_str()).collect();
    assert_eq!(names, vec!["build", "test"]);

    let build = &report[0];
    assert_eq!(build.profile[0].name, "compile");
    assert_eq!(build.profile[0].count, 2);
    assert_eq!(build.profile[0].mean, 40.0);
    assert_eq!(build.profile[0].percentile(50), Some(40.0));
    assert_eq!(build.profile[1].name, "checkout");
    assert_eq!(build.profile[1].min, 1.0);

    let mut out = Vec::new();
    write_with_format(
        &mut out,
        &report,
        settings.format,
        &settings.percentiles,
        &settings.field_filter,
    )
    .expect("render");
    let doc: serde_json::Value = serde_json::from_slice(&out).expect("json");
    assert_eq!(doc["profiles"][1]["name"], "test");
    assert_eq!(doc["profiles"][0]["profile"][0]["percentiles"]["90"], 48.0);
}

#[test]
fn failing_run_never_reaches_the_report() {
    let settings = ProfileConfig::from_toml_str(CONFIG)
        .expect("parse")
        .validate()
        .expect("valid");
    let api = fake().with_failure(103);
    let err = profile_workflow(&api, &settings).expect_err("must fail");
    assert!(matches!(err, ProfilerError::Fetch(_)), "{err:?}");
}

#[test]
fn repeated_failing_collections_do_not_leak_permits() {
    let collector = Collector::new(2);
    let runs: Vec<_> = (1..=6).map(FakeActions::run).collect();
    for _ in 0..10 {
        let api = FakeActions::new()
            .with_failure(3)
            .with_latency(std::time::Duration::from_millis(1));
        let result = collector.collect(&api, &FakeActions::repo(), &runs, &JobNameRouter::match_all());
        assert!(result.is_err());
        assert_eq!(collector.available_permits(), 2);
    }
}
