//! End-to-end pipeline runs against a scripted process runner.
//!
//! The project directory and every generated file are real; external tools
//! (composer, database clients, git, curl) are faked.

use std::fs;

use appstrap::core::compose::{ComposeManifest, DATABASE_SERVICE, MYSQL_IMAGE};
use appstrap::core::config::ConfigKey;
use appstrap::core::steps::{PipelineState, StepName, StepStatus};
use appstrap::error::{BootstrapError, ConfigError};
use appstrap::exit_codes;
use appstrap::io::prompt::NoInteraction;
use appstrap::io::settings::BootstrapSettings;
use appstrap::pipeline::{PipelineOptions, PipelineOutcome, PipelineRun, run_pipeline};
use appstrap::test_support::{ScriptedAnswers, ScriptedRunner, TestWorkspace};

const SQLITE_DOC: &str = r#"{"db_driver":"sqlite","with_docker":false,"telemetry":false,"init_git":true}"#;

fn options(ws: &TestWorkspace, document: Option<&str>) -> PipelineOptions {
    let mut options = PipelineOptions::new("shop", ws.path(), BootstrapSettings::default());
    options.config_path =
        document.map(|contents| ws.write_document("setup.json", contents).expect("document"));
    options
}

fn run(options: &PipelineOptions, runner: &ScriptedRunner) -> PipelineRun {
    run_pipeline(options, runner, &mut NoInteraction, |_| {})
}

fn rolled_back(run: &PipelineRun) -> (StepName, &BootstrapError, usize) {
    match &run.outcome {
        PipelineOutcome::RolledBack {
            step,
            error,
            rollback_actions,
            ..
        } => (*step, error, *rollback_actions),
        PipelineOutcome::Succeeded { .. } => panic!("expected a rolled back run"),
    }
}

#[test]
fn sqlite_run_writes_env_and_no_manifest() {
    let ws = TestWorkspace::new().expect("workspace");
    let runner = ScriptedRunner::new();

    let run = run(&options(&ws, Some(SQLITE_DOC)), &runner);

    assert_eq!(run.exit_code(), exit_codes::OK);
    assert_eq!(run.final_state(), PipelineState::Succeeded);
    let project = ws.project_path("shop");
    let env = fs::read_to_string(project.join(".env")).expect(".env");
    assert!(env.lines().any(|line| line == "DB_CONNECTION=sqlite"), "{env}");
    assert!(env.lines().any(|line| line == "APP_NAME=shop"), "{env}");
    assert!(!project.join("docker-compose.yml").exists());
    assert!(project.join("database/database.sqlite").is_file());
    assert_eq!(
        runner.invocations(),
        [
            "php --version",
            "composer --version",
            "composer create-project",
            "sqlite3 database/database.sqlite",
            "git init",
            "git add",
            "git commit",
        ]
    );
}

#[test]
fn minimal_sqlite_document_runs_no_optional_tools() {
    let ws = TestWorkspace::new().expect("workspace");
    let runner = ScriptedRunner::new();
    let document =
        r#"{"db_driver":"sqlite","with_docker":false,"telemetry":false,"init_git":false}"#;

    let run = run(&options(&ws, Some(document)), &runner);

    assert_eq!(run.exit_code(), exit_codes::OK);
    let project = ws.project_path("shop");
    let env = fs::read_to_string(project.join(".env")).expect(".env");
    assert_eq!(
        env.lines().filter(|line| *line == "DB_CONNECTION=sqlite").count(),
        1,
        "{env}"
    );
    assert!(!env.lines().any(|line| line.starts_with("DB_HOST=")), "{env}");
    assert!(!project.join("docker-compose.yml").exists());
    assert!(!project.join("Dockerfile").exists());
    assert!(!runner.invocations().iter().any(|call| call.starts_with("git")));
    assert!(runner.detached().is_empty());
}

#[test]
fn document_values_cannot_add_env_lines() {
    let ws = TestWorkspace::new().expect("workspace");
    let document = r#"{"db_driver":"mysql","db_host":"db.internal","db_password":"a\nDB_HOST=evil","with_docker":false,"telemetry":false,"init_git":false}"#;

    let run = run(&options(&ws, Some(document)), &ScriptedRunner::new());

    assert!(run.succeeded(), "{:?}", run.outcome);
    let env = fs::read_to_string(ws.project_path("shop").join(".env")).expect(".env");
    let hosts: Vec<&str> = env
        .lines()
        .filter(|line| line.starts_with("DB_HOST="))
        .collect();
    assert_eq!(hosts, ["DB_HOST=db.internal"], "{env}");
    assert!(
        env.lines()
            .any(|line| line == r#"DB_PASSWORD="a\nDB_HOST=evil""#),
        "{env}"
    );
}

#[test]
fn project_template_env_example_is_rendered() {
    let ws = TestWorkspace::new().expect("workspace");
    let runner = ScriptedRunner::new().create_file_on(
        "composer",
        "create-project",
        ".env.example",
        "APP_NAME=Laravel\nDB_CONNECTION=sqlite\n# DB_HOST=127.0.0.1\n# DB_PORT=3306\n# DB_DATABASE=laravel\n# DB_USERNAME=root\n# DB_PASSWORD=\n",
    );
    let document = r#"{"db_driver":"mysql","db_host":"db.internal","db_name":"shop","db_user":"app","db_password":"s3cret pass","with_docker":false,"telemetry":false,"init_git":false}"#;

    let run = run(&options(&ws, Some(document)), &runner);

    assert!(run.succeeded(), "{:?}", run.outcome);
    let env = fs::read_to_string(ws.project_path("shop").join(".env")).expect(".env");
    assert_eq!(
        env,
        "APP_NAME=shop\nDB_CONNECTION=mysql\nDB_HOST=db.internal\nDB_PORT=3306\nDB_DATABASE=shop\nDB_USERNAME=app\nDB_PASSWORD=\"s3cret pass\"\n"
    );
}

#[test]
fn failure_after_provisioning_removes_project_directory() {
    let ws = TestWorkspace::new().expect("workspace");
    let runner = ScriptedRunner::new();

    let run = run(&options(&ws, Some("{ not json")), &runner);

    let (step, error, actions) = rolled_back(&run);
    assert_eq!(step, StepName::Configuration);
    assert!(matches!(error, BootstrapError::Config(ConfigError::Parse { .. })));
    assert_eq!(actions, 1);
    assert_eq!(run.exit_code(), exit_codes::FAILED);
    assert!(!ws.project_path("shop").exists());
}

#[test]
fn later_artifacts_are_rolled_back_with_the_project() {
    let ws = TestWorkspace::new().expect("workspace");
    // A directory where the manifest should go makes the docker step fail.
    let runner = ScriptedRunner::new().create_file_on(
        "composer",
        "create-project",
        "docker-compose.yml/placeholder",
        "",
    );
    let document = r#"{"db_driver":"sqlite","with_docker":true,"telemetry":true,"init_git":true}"#;

    let run = run(&options(&ws, Some(document)), &runner);

    let (step, _, actions) = rolled_back(&run);
    assert_eq!(step, StepName::Docker);
    // project directory, .env, sqlite file
    assert_eq!(actions, 3);
    assert!(!ws.project_path("shop").exists());
    assert!(!runner.invocations().iter().any(|call| call.starts_with("git")));
    assert!(runner.detached().is_empty());
    assert_eq!(
        run.states.last().copied(),
        Some(PipelineState::RolledBack)
    );
    assert!(!run.states.contains(&PipelineState::DockerHandled));
}

#[test]
fn fatal_failure_stops_before_later_steps() {
    let ws = TestWorkspace::new().expect("workspace");
    let runner = ScriptedRunner::new().fail_on("composer", "create-project", "package not found");

    let run = run(&options(&ws, Some(SQLITE_DOC)), &runner);

    let (step, error, _) = rolled_back(&run);
    assert_eq!(step, StepName::Project);
    assert!(error.to_string().contains("package not found"), "{error}");
    assert_eq!(
        runner.invocations(),
        ["php --version", "composer --version", "composer create-project"]
    );
    assert_eq!(
        run.states,
        [
            PipelineState::Created,
            PipelineState::RequirementsChecked,
            PipelineState::RolledBack,
        ]
    );
}

#[test]
fn existing_target_runs_no_commands_and_registers_nothing() {
    let ws = TestWorkspace::new().expect("workspace");
    let project = ws.project_path("shop");
    fs::create_dir(&project).expect("mkdir");
    fs::write(project.join("keep.txt"), "mine").expect("write");
    let runner = ScriptedRunner::new();

    let run = run(&options(&ws, None), &runner);

    let (step, _, actions) = rolled_back(&run);
    assert_eq!(step, StepName::Requirements);
    assert_eq!(actions, 0);
    assert!(runner.calls().is_empty());
    assert!(project.join("keep.txt").is_file(), "pre-existing directory untouched");
}

#[test]
fn docker_manifest_matches_selected_driver() {
    let ws = TestWorkspace::new().expect("workspace");
    let document = r#"{"db_driver":"mysql","db_host":"127.0.0.1","db_name":"shop","db_user":"root","with_docker":true,"telemetry":false,"init_git":false}"#;

    let run = run(&options(&ws, Some(document)), &ScriptedRunner::new());

    assert!(run.succeeded(), "{:?}", run.outcome);
    let yaml = fs::read_to_string(ws.project_path("shop").join("docker-compose.yml"))
        .expect("manifest");
    let manifest: ComposeManifest = serde_yaml::from_str(&yaml).expect("parse manifest");
    let database = manifest.service(DATABASE_SERVICE).expect("database service");
    assert_eq!(database.image.as_deref(), Some(MYSQL_IMAGE));
    assert_eq!(database.ports, ["3306:3306"]);
    assert!(ws.project_path("shop").join("Dockerfile").is_file());
}

#[test]
fn best_effort_failures_become_warnings() {
    let ws = TestWorkspace::new().expect("workspace");
    let runner = ScriptedRunner::new()
        .fail_program("sqlite3", "sqlite3: command not found")
        .fail_on("git", "commit", "Please tell me who you are");

    let run = run(&options(&ws, Some(SQLITE_DOC)), &runner);

    assert_eq!(run.exit_code(), exit_codes::OK);
    let warned: Vec<StepName> = run.warnings().map(|warning| warning.step).collect();
    assert_eq!(warned, [StepName::Database, StepName::VersionControl]);
    assert!(ws.project_path("shop").join(".env").is_file());
    assert_eq!(run.final_state(), PipelineState::Succeeded);
}

#[test]
fn telemetry_is_dispatched_detached() {
    let ws = TestWorkspace::new().expect("workspace");
    let runner = ScriptedRunner::new();
    let document = r#"{"db_driver":"sqlite","with_docker":false,"telemetry":true,"init_git":false}"#;

    let run = run(&options(&ws, Some(document)), &runner);

    assert!(run.succeeded());
    let detached = runner.detached();
    assert_eq!(detached.len(), 1);
    assert_eq!(detached[0].program, "curl");
    assert!(!runner.invocations().iter().any(|call| call.starts_with("curl")));
    let finalize = run.reports.last().expect("finalize report");
    assert_eq!(finalize.step, StepName::Finalize);
    assert_eq!(finalize.status, StepStatus::Completed);
}

#[test]
fn document_keys_suppress_prompts_for_the_whole_run() {
    let ws = TestWorkspace::new().expect("workspace");
    let runner = ScriptedRunner::new();
    let mut answers = ScriptedAnswers::new();

    let run = run_pipeline(
        &options(&ws, Some(r#"{"db_driver":"sqlite","telemetry":false}"#)),
        &runner,
        &mut answers,
        |_| {},
    );

    assert!(run.succeeded());
    assert_eq!(answers.asked(), [ConfigKey::WithDocker, ConfigKey::InitGit]);
}
