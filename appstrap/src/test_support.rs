//! Test-only fakes for external collaborators: a scripted process runner, scripted
//! answers, and a scratch workspace.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::{ConfigKey, ConfigValue};
use crate::error::{ConfigError, ProcessError};
use crate::io::process::{CommandOutput, CommandSpec, ProcessRunner};
use crate::io::prompt::{AnswerSource, Question};

#[derive(Debug, Clone)]
struct Matcher {
    program: String,
    subcommand: Option<String>,
}

impl Matcher {
    fn matches(&self, spec: &CommandSpec) -> bool {
        self.program == spec.program
            && self
                .subcommand
                .as_deref()
                .is_none_or(|sub| spec.subcommand() == Some(sub))
    }
}

#[derive(Debug, Clone)]
enum Behavior {
    Fail(String),
    TimeOut,
    CreateFile { relative: PathBuf, contents: String },
}

/// Records every invocation and succeeds unless scripted otherwise.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    calls: RefCell<Vec<CommandSpec>>,
    detached: RefCell<Vec<CommandSpec>>,
    rules: Vec<(Matcher, Behavior)>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `program subcommand ...` with a non-zero exit and `stderr`.
    pub fn fail_on(mut self, program: &str, subcommand: &str, stderr: &str) -> Self {
        self.rules.push((
            matcher(program, Some(subcommand)),
            Behavior::Fail(stderr.to_string()),
        ));
        self
    }

    /// Fail every invocation of `program`.
    pub fn fail_program(mut self, program: &str, stderr: &str) -> Self {
        self.rules
            .push((matcher(program, None), Behavior::Fail(stderr.to_string())));
        self
    }

    pub fn time_out_on(mut self, program: &str, subcommand: &str) -> Self {
        self.rules
            .push((matcher(program, Some(subcommand)), Behavior::TimeOut));
        self
    }

    /// Write `contents` to `cwd/relative` when the matching command runs.
    pub fn create_file_on(
        mut self,
        program: &str,
        subcommand: &str,
        relative: &str,
        contents: &str,
    ) -> Self {
        self.rules.push((
            matcher(program, Some(subcommand)),
            Behavior::CreateFile {
                relative: PathBuf::from(relative),
                contents: contents.to_string(),
            },
        ));
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    pub fn detached(&self) -> Vec<CommandSpec> {
        self.detached.borrow().clone()
    }

    /// Rendered command lines in invocation order.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(CommandSpec::display).collect()
    }

    /// `program subcommand` pairs in invocation order.
    pub fn invocations(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|c| format!("{} {}", c.program, c.subcommand().unwrap_or_default()))
            .collect()
    }
}

fn matcher(program: &str, subcommand: Option<&str>) -> Matcher {
    Matcher {
        program: program.to_string(),
        subcommand: subcommand.map(str::to_string),
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        self.calls.borrow_mut().push(spec.clone());
        for (matcher, behavior) in &self.rules {
            if !matcher.matches(spec) {
                continue;
            }
            match behavior {
                Behavior::Fail(stderr) => {
                    return Err(ProcessError::Failed {
                        command: spec.display(),
                        exit_code: Some(1),
                        stderr: stderr.clone(),
                    });
                }
                Behavior::TimeOut => {
                    return Err(ProcessError::TimedOut {
                        command: spec.display(),
                        timeout: spec.timeout,
                        stderr: String::new(),
                    });
                }
                Behavior::CreateFile { relative, contents } => {
                    let path = spec.cwd.join(relative);
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent).expect("create scripted file dir");
                    }
                    fs::write(&path, contents).expect("write scripted file");
                }
            }
        }
        Ok(CommandOutput::default())
    }

    fn spawn_detached(&self, spec: &CommandSpec) {
        self.detached.borrow_mut().push(spec.clone());
    }
}

/// Answers questions from a fixed map and records which keys were asked.
#[derive(Debug, Default)]
pub struct ScriptedAnswers {
    answers: HashMap<ConfigKey, ConfigValue>,
    asked: Vec<ConfigKey>,
}

impl ScriptedAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, key: ConfigKey, value: ConfigValue) -> Self {
        self.answers.insert(key, value);
        self
    }

    pub fn asked(&self) -> &[ConfigKey] {
        &self.asked
    }
}

impl AnswerSource for ScriptedAnswers {
    fn ask(&mut self, question: &Question) -> Result<Option<ConfigValue>, ConfigError> {
        self.asked.push(question.key);
        Ok(self.answers.get(&question.key).cloned())
    }
}

/// Scratch directory that plays the role of the user's working directory.
pub struct TestWorkspace {
    temp: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            temp: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn project_path(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    /// Write a configuration document next to (not inside) the project.
    pub fn write_document(&self, name: &str, contents: &str) -> std::io::Result<PathBuf> {
        let dir = self.temp.path().join("documents");
        fs::create_dir_all(&dir)?;
        let path = dir.join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }
}
