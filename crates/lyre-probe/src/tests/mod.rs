//! Tests for the probe runtime.

mod config_split;

use std::ffi::OsString;
use std::process::ExitCode;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use serde_json::Value;
use tempfile::TempDir;

use lyre_config::{Config, LogFormat};
use lyre_demo_plugin::{DEMO_GAME_PROCESS, exported_symbols};
use lyre_plugins::resolver::{StaticSymbols, SymbolResolver};
use lyre_plugins::{AbiGeneration, FixedProcesses, PluginRegistry, ProcessInfo, ProcessSource};

use crate::health::MockHealthReporter;
use crate::{HostEnvironment, ProbeRunner, StaticConfigLoader};

/// The demo plugin keeps its walk in process-wide statics.
static DEMO_MUTEX: Mutex<()> = Mutex::new(());

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct DemoEnvironment {
    processes: Vec<ProcessInfo>,
}

impl HostEnvironment for DemoEnvironment {
    fn process_source(&self) -> Box<dyn ProcessSource> {
        Box::new(FixedProcesses::new(self.processes.clone()))
    }

    fn register_built_ins(&self, registry: &mut PluginRegistry) {
        registry.register_built_in(
            "demo",
            AbiGeneration::Current,
            Box::new(|| -> Box<dyn SymbolResolver> {
                let table = exported_symbols()
                    .into_iter()
                    .fold(StaticSymbols::new("demo"), |table, (name, address)| {
                        table.with(name, address)
                    });
                Box::new(table)
            }),
        );
    }
}

fn game_running() -> DemoEnvironment {
    DemoEnvironment {
        processes: vec![
            ProcessInfo::new("launcher", 7),
            ProcessInfo::new(DEMO_GAME_PROCESS, 4242),
        ],
    }
}

fn game_stopped() -> DemoEnvironment {
    DemoEnvironment {
        processes: vec![ProcessInfo::new("launcher", 7)],
    }
}

struct Workspace {
    dir: TempDir,
    config: Config,
    _demo: MutexGuard<'static, ()>,
}

#[fixture]
fn workspace() -> Workspace {
    let demo = DEMO_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
    let dir = tempfile::tempdir().expect("tempdir");
    let user_dir = Utf8PathBuf::from_path_buf(dir.path().join("user")).expect("utf-8 tempdir");
    let config = Config {
        system_plugin_dir: None,
        user_plugin_dir: Some(user_dir),
        log_filter: String::from("warn"),
        log_format: LogFormat::Compact,
        fetch_interval_ms: 1,
        ..Config::default()
    };
    Workspace {
        dir,
        config,
        _demo: demo,
    }
}

struct Outcome {
    code: ExitCode,
    stdout: String,
    stderr: String,
}

fn run_probe(runner: &ProbeRunner<'_>, args: &[&str]) -> Outcome {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let argv =
        std::iter::once(OsString::from("lyre-probe")).chain(args.iter().map(OsString::from));
    let code = runner.run(argv, &mut stdout, &mut stderr);
    Outcome {
        code,
        stdout: String::from_utf8(stdout).expect("utf-8 stdout"),
        stderr: String::from_utf8(stderr).expect("utf-8 stderr"),
    }
}

fn json_lines(output: &str) -> Vec<Value> {
    output
        .lines()
        .map(|line| serde_json::from_str(line).expect("one JSON document per line"))
        .collect()
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[rstest]
fn list_reports_the_built_in_demo(workspace: Workspace) {
    let loader = StaticConfigLoader::new(workspace.config.clone());
    let environment = game_running();
    let runner = ProbeRunner::new(&loader, &environment);

    let outcome = run_probe(&runner, &["--output", "json", "list"]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    let listed: Value = serde_json::from_str(&outcome.stdout).expect("JSON listing");
    let plugins = listed.as_array().expect("array of plugins");
    assert_eq!(plugins.len(), 1);
    let demo = plugins.first().expect("one plugin");
    assert_eq!(demo["name"], "Lyre demo");
    assert_eq!(demo["version"], "0.1.0");
    assert_eq!(demo["built_in"], true);
    assert_eq!(demo["loaded"], true);
    assert_eq!(demo["generation"], "current");
}

#[rstest]
fn list_without_plugins_says_so(workspace: Workspace) {
    let loader = StaticConfigLoader::new(workspace.config.clone());
    let environment = crate::SystemEnvironment;
    let runner = ProbeRunner::new(&loader, &environment);

    let outcome = run_probe(&runner, &["list"]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert_eq!(outcome.stdout.trim(), "no plugins found");
}

#[rstest]
fn scan_is_reported_to_the_health_reporter(workspace: Workspace) {
    let loader = StaticConfigLoader::new(workspace.config.clone());
    let environment = game_running();
    let mut reporter = MockHealthReporter::new();
    reporter.expect_bootstrap_starting().times(1).return_const(());
    reporter.expect_bootstrap_succeeded().times(1).return_const(());
    reporter
        .expect_plugins_scanned()
        .withf(|count| *count == 1)
        .times(1)
        .return_const(());
    reporter.expect_probe_failed().never();
    let runner = ProbeRunner::new(&loader, &environment).with_reporter(Arc::new(reporter));

    let outcome = run_probe(&runner, &["list"]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
}

// ---------------------------------------------------------------------------
// processes
// ---------------------------------------------------------------------------

#[rstest]
fn processes_lists_the_offered_table(workspace: Workspace) {
    let loader = StaticConfigLoader::new(workspace.config.clone());
    let environment = game_running();
    let runner = ProbeRunner::new(&loader, &environment);

    let outcome = run_probe(&runner, &["--output", "json", "processes"]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    let listed: Value = serde_json::from_str(&outcome.stdout).expect("JSON listing");
    let names: Vec<&str> = listed
        .as_array()
        .expect("array of processes")
        .iter()
        .filter_map(|process| process["name"].as_str())
        .collect();
    assert_eq!(names, vec!["launcher", DEMO_GAME_PROCESS]);
}

// ---------------------------------------------------------------------------
// watch
// ---------------------------------------------------------------------------

#[rstest]
fn watch_reports_the_provider_then_every_new_pose(workspace: Workspace) {
    let loader = StaticConfigLoader::new(workspace.config.clone());
    let environment = game_running();
    let runner = ProbeRunner::new(&loader, &environment);

    let outcome = run_probe(&runner, &["--output", "json", "watch", "--ticks", "3"]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    let events = json_lines(&outcome.stdout);
    assert_eq!(events.len(), 4, "events: {events:?}");

    let provider = events.first().expect("provider event");
    assert_eq!(provider["event"], "provider");
    assert_eq!(provider["tick"], 0);
    assert_eq!(provider["plugin_id"], 1);
    assert_eq!(provider["name"], "Lyre demo");

    let walked: Vec<f64> = events
        .iter()
        .skip(1)
        .map(|event| {
            assert_eq!(event["event"], "pose");
            event["data"]["avatar_position"]["x"]
                .as_f64()
                .expect("numeric x")
        })
        .collect();
    assert_eq!(walked, vec![0.0, 0.5, 1.0]);
}

#[rstest]
fn watch_without_the_game_reports_no_provider_once(workspace: Workspace) {
    let loader = StaticConfigLoader::new(workspace.config.clone());
    let environment = game_stopped();
    let runner = ProbeRunner::new(&loader, &environment);

    let outcome = run_probe(&runner, &["watch", "--ticks", "3"]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert_eq!(outcome.stdout.trim(), "tick 0: no positional data provider");
}

#[rstest]
fn disabled_positional_data_keeps_the_demo_quiet(workspace: Workspace) {
    let config = Config {
        disable_positional_data: true,
        ..workspace.config.clone()
    };
    let loader = StaticConfigLoader::new(config);
    let environment = game_running();
    let runner = ProbeRunner::new(&loader, &environment);

    let outcome = run_probe(&runner, &["--output", "json", "watch", "--ticks", "2"]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    let events = json_lines(&outcome.stdout);
    assert_eq!(events.len(), 1);
    assert_eq!(events.first().expect("event")["plugin_id"], Value::Null);
}

// ---------------------------------------------------------------------------
// install
// ---------------------------------------------------------------------------

#[rstest]
fn install_needs_a_user_directory(workspace: Workspace) {
    let config = Config {
        user_plugin_dir: None,
        ..workspace.config.clone()
    };
    let loader = StaticConfigLoader::new(config);
    let environment = game_running();
    let runner = ProbeRunner::new(&loader, &environment);

    let outcome = run_probe(&runner, &["install", "plugin.so"]);

    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(
        outcome.stderr.contains("no user plugin directory"),
        "stderr: {}",
        outcome.stderr
    );
}

#[rstest]
fn install_rejects_files_that_are_not_plugins(workspace: Workspace) {
    let candidate = workspace
        .dir
        .path()
        .join(format!("bogus.{}", std::env::consts::DLL_EXTENSION));
    std::fs::write(&candidate, "not machine code").expect("write candidate");
    let loader = StaticConfigLoader::new(workspace.config.clone());
    let environment = game_running();
    let runner = ProbeRunner::new(&loader, &environment);

    let candidate_arg = candidate.to_string_lossy().into_owned();
    let outcome = run_probe(&runner, &["install", &candidate_arg]);

    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(
        outcome.stderr.contains("not a plugin"),
        "stderr: {}",
        outcome.stderr
    );
}

// ---------------------------------------------------------------------------
// argument handling
// ---------------------------------------------------------------------------

#[rstest]
fn help_goes_to_stdout_and_succeeds(workspace: Workspace) {
    let loader = StaticConfigLoader::new(workspace.config.clone());
    let environment = game_running();
    let runner = ProbeRunner::new(&loader, &environment);

    let outcome = run_probe(&runner, &["--help"]);

    assert_eq!(outcome.code, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains("Usage"), "stdout: {}", outcome.stdout);
}

#[rstest]
fn unknown_command_fails(workspace: Workspace) {
    let loader = StaticConfigLoader::new(workspace.config.clone());
    let environment = game_running();
    let runner = ProbeRunner::new(&loader, &environment);

    let outcome = run_probe(&runner, &["explode"]);

    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(!outcome.stderr.is_empty());
}
