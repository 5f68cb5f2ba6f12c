//! Configuration resolution: defaults < document < interactive answers.
//!
//! Keys present in the document are authoritative and never prompted for, so a
//! complete document gives a fully non-interactive run.

use std::path::Path;

use tracing::{debug, instrument};

use crate::core::config::{ConfigKey, ConfigValue, Configuration, DatabaseDriver, RawConfig};
use crate::error::ConfigError;
use crate::io::document::load_document;
use crate::io::prompt::{AnswerSource, Question, QuestionKind};

/// Merge the layers and validate the result.
#[instrument(skip_all, fields(project = project_name, document = ?document_path))]
pub fn resolve<A: AnswerSource + ?Sized>(
    project_name: &str,
    defaults: &RawConfig,
    document_path: Option<&Path>,
    answers: &mut A,
) -> Result<Configuration, ConfigError> {
    let document = match document_path {
        Some(path) => load_document(path)?,
        None => RawConfig::new(),
    };
    debug!(document_keys = document.len(), "configuration document loaded");

    let mut merged = defaults.clone();
    merged.merge(&document);

    ask_missing(&mut merged, &document, answers, driver_question())?;

    if let Some(driver) = merged.driver().filter(|d| d.is_network()) {
        for question in connection_questions(driver, &merged) {
            ask_missing(&mut merged, &document, answers, question)?;
        }
    }
    for question in toggle_questions() {
        ask_missing(&mut merged, &document, answers, question)?;
    }

    Configuration::from_raw(project_name, &merged)
}

fn ask_missing<A: AnswerSource + ?Sized>(
    merged: &mut RawConfig,
    document: &RawConfig,
    answers: &mut A,
    mut question: Question,
) -> Result<(), ConfigError> {
    if document.contains(question.key) {
        return Ok(());
    }
    if question.default.is_none() {
        question.default = merged.get(question.key).cloned();
    }
    if let Some(answer) = answers.ask(&question)? {
        debug!(key = %question.key, "answer received");
        merged.set(question.key, answer);
    }
    Ok(())
}

fn driver_question() -> Question {
    Question {
        key: ConfigKey::DbDriver,
        prompt: "Which database will the application use?".to_string(),
        kind: QuestionKind::Choice(
            DatabaseDriver::ALL
                .iter()
                .map(|d| d.as_str().to_string())
                .collect(),
        ),
        default: None,
    }
}

fn connection_questions(driver: DatabaseDriver, merged: &RawConfig) -> Vec<Question> {
    let text = |key, prompt: &str| Question {
        key,
        prompt: prompt.to_string(),
        kind: QuestionKind::Text,
        default: None,
    };
    let mut questions = vec![
        text(ConfigKey::DbHost, "Database host"),
        Question {
            default: driver
                .default_port()
                .map(|port| ConfigValue::text(port.to_string())),
            ..text(ConfigKey::DbPort, "Database port")
        },
        text(ConfigKey::DbName, "Database name"),
        text(ConfigKey::DbUser, "Database user"),
        Question {
            kind: QuestionKind::Secret,
            ..text(ConfigKey::DbPassword, "Database password")
        },
    ];
    let skip = matches!(merged.get(ConfigKey::SkipDatabase), Some(ConfigValue::Bool(true)));
    if !skip {
        questions.push(confirm(
            ConfigKey::CreateDatabase,
            "Create the database now?",
        ));
    }
    questions
}

fn toggle_questions() -> Vec<Question> {
    vec![
        confirm(ConfigKey::WithDocker, "Generate Docker files?"),
        confirm(ConfigKey::Telemetry, "Send an anonymous usage ping?"),
        confirm(ConfigKey::InitGit, "Initialize a git repository?"),
    ]
}

fn confirm(key: ConfigKey, prompt: &str) -> Question {
    Question {
        key,
        prompt: prompt.to_string(),
        kind: QuestionKind::Confirm,
        default: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Database, default_values};
    use crate::io::prompt::NoInteraction;
    use crate::test_support::{ScriptedAnswers, TestWorkspace};

    const FULL_SQLITE: &str =
        r#"{"db_driver":"sqlite","with_docker":false,"telemetry":false,"init_git":false}"#;

    #[test]
    fn document_keys_are_never_prompted() {
        let ws = TestWorkspace::new().expect("workspace");
        let doc = ws.write_document("cfg.json", FULL_SQLITE).expect("doc");
        let mut answers = ScriptedAnswers::new()
            .answer(ConfigKey::DbDriver, ConfigValue::text("mysql"))
            .answer(ConfigKey::WithDocker, ConfigValue::Bool(true));

        let cfg = resolve("shop", &default_values("shop"), Some(&doc), &mut answers)
            .expect("resolve");
        assert_eq!(cfg.database, Database::Sqlite);
        assert!(!cfg.with_docker);
        assert!(answers.asked().is_empty(), "asked {:?}", answers.asked());
    }

    #[test]
    fn answers_override_defaults_for_missing_keys() {
        let mut answers = ScriptedAnswers::new()
            .answer(ConfigKey::DbDriver, ConfigValue::text("pgsql"))
            .answer(ConfigKey::DbName, ConfigValue::text("catalog"))
            .answer(ConfigKey::WithDocker, ConfigValue::Bool(true));

        let cfg = resolve("shop", &default_values("shop"), None, &mut answers).expect("resolve");
        let conn = cfg.database.connection().expect("connection");
        assert_eq!(cfg.database.driver(), DatabaseDriver::Pgsql);
        assert_eq!(conn.name, "catalog");
        assert_eq!(conn.port, 5432);
        assert_eq!(conn.user, "root");
        assert!(cfg.with_docker);
        assert_eq!(
            answers.asked(),
            &[
                ConfigKey::DbDriver,
                ConfigKey::DbHost,
                ConfigKey::DbPort,
                ConfigKey::DbName,
                ConfigKey::DbUser,
                ConfigKey::DbPassword,
                ConfigKey::CreateDatabase,
                ConfigKey::WithDocker,
                ConfigKey::Telemetry,
                ConfigKey::InitGit,
            ]
        );
    }

    #[test]
    fn sqlite_does_not_ask_connection_questions() {
        let mut answers = ScriptedAnswers::new();
        resolve("shop", &default_values("shop"), None, &mut answers).expect("resolve");
        assert_eq!(
            answers.asked(),
            &[
                ConfigKey::DbDriver,
                ConfigKey::WithDocker,
                ConfigKey::Telemetry,
                ConfigKey::InitGit,
            ]
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let ws = TestWorkspace::new().expect("workspace");
        let doc = ws
            .write_document(
                "cfg.json",
                r#"{"db_driver":"mysql","db_host":"db","db_port":"3307","db_name":"shop","db_user":"app","db_password":"pw","create_database":true,"with_docker":true,"telemetry":false,"init_git":true}"#,
            )
            .expect("doc");

        let first = resolve("shop", &default_values("shop"), Some(&doc), &mut NoInteraction)
            .expect("first");
        let second = resolve("shop", &default_values("shop"), Some(&doc), &mut NoInteraction)
            .expect("second");
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).expect("json"),
            serde_json::to_vec(&second).expect("json")
        );
    }

    #[test]
    fn missing_document_is_a_config_error() {
        let ws = TestWorkspace::new().expect("workspace");
        let err = resolve(
            "shop",
            &default_values("shop"),
            Some(&ws.path().join("absent.json")),
            &mut NoInteraction,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
