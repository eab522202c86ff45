use std::sync::Arc;

use rustyline::{DefaultEditor, error::ReadlineError};

use crate::{
    checker::{self, CheckResult},
    diagnostics::Result,
    history::{self, RunHistory, RunRecord},
    host::Host,
    interpreter::{InterpreterConfig, StopHandle},
    output::{OutputEvent, OutputKind},
};

const BUFFER_NAME: &str = "<repl>.gn";

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Source text appended to the buffer.
    Line(String),
    Run,
    Check,
    Show,
    Clear,
    History,
    Help,
    Quit,
    Unknown(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if !trimmed.starts_with(':') {
            return Input::Line(line.trim_end().to_string());
        }
        match trimmed {
            ":run" | ":r" => Input::Run,
            ":check" | ":c" => Input::Check,
            ":show" | ":list" => Input::Show,
            ":clear" => Input::Clear,
            ":history" => Input::History,
            ":help" | ":h" => Input::Help,
            ":quit" | ":exit" | ":q" => Input::Quit,
            other => Input::Unknown(other.to_string()),
        }
    }
}

/// The buffer being edited plus the runs made from it.
#[derive(Debug, Default)]
pub struct Session {
    lines: Vec<String>,
    history: RunHistory,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line and re-checks the whole buffer.
    pub fn push_line(&mut self, line: impl Into<String>) -> CheckResult {
        self.lines.push(line.into());
        self.check()
    }

    pub fn source(&self) -> String {
        self.lines.join("\n")
    }

    pub fn check(&self) -> CheckResult {
        checker::check(&self.source(), Some(BUFFER_NAME))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn record(&mut self, record: RunRecord) {
        self.history.push(record);
    }

    pub fn history(&self) -> &RunHistory {
        &self.history
    }
}

/// Formats an event the way the terminal shows it.
pub fn render_event(event: &OutputEvent) -> String {
    match event.kind {
        OutputKind::Print | OutputKind::Alias | OutputKind::Success => event.text.clone(),
        kind => format!("{}: {}", kind.label().to_lowercase(), event.text),
    }
}

pub struct Repl {
    session: Session,
    host: Arc<dyn Host>,
    config: InterpreterConfig,
}

impl Repl {
    pub fn new(host: Arc<dyn Host>, config: InterpreterConfig) -> Self {
        Self {
            session: Session::new(),
            host,
            config,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new()?;
        println!("Geneia buffer. Type :help for commands.");
        loop {
            let prompt = format!("{:>3}> ", self.session.lines.len() + 1);
            let line = match tokio::task::block_in_place(|| editor.readline(&prompt)) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            };
            if !line.trim().is_empty() {
                editor.add_history_entry(line.as_str()).ok();
            }

            match Input::parse(&line) {
                Input::Line(text) => {
                    let result = self.session.push_line(text);
                    for diag in result.errors() {
                        eprintln!("  {diag}");
                    }
                }
                Input::Run => self.run_buffer().await,
                Input::Check => {
                    let result = self.session.check();
                    if result.diagnostics.is_empty() {
                        println!("no problems");
                    }
                    for diag in &result.diagnostics {
                        println!("{diag}");
                    }
                }
                Input::Show => {
                    for (i, line) in self.session.lines.iter().enumerate() {
                        println!("{:>3}  {line}", i + 1);
                    }
                }
                Input::Clear => self.session.clear(),
                Input::History => {
                    for record in self.session.history().records() {
                        println!(
                            "{} exit={} {:.3}s {} line(s)",
                            record.status,
                            record.exit_code,
                            record.duration,
                            record.output_lines.len()
                        );
                    }
                }
                Input::Help => {
                    println!(":run  :check  :show  :clear  :history  :quit");
                }
                Input::Quit => break,
                Input::Unknown(cmd) => eprintln!("unknown command {cmd}; try :help"),
            }
        }
        Ok(())
    }

    async fn run_buffer(&mut self) {
        if self.session.is_empty() {
            return;
        }
        let record = history::run_recorded(
            BUFFER_NAME,
            &self.session.source(),
            self.host.clone(),
            self.config.clone(),
            StopHandle::new(),
            |event| {
                if event.is_error() {
                    eprintln!("{}", render_event(event));
                } else {
                    println!("{}", render_event(event));
                }
            },
        )
        .await;
        self.session.record(record);
    }
}
