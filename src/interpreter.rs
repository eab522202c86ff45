use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::sync::{Notify, mpsc};

use crate::{
    arith,
    environment::{Environment, MSG_VARIABLE},
    host::{Host, HostError},
    lexer::{self, Keyword, Token, TokenKind},
    output::{OutputEvent, OutputKind},
    package,
    value::{self, Value},
};

/// Nested `call`s beyond this depth are refused instead of recursing.
const MAX_CALL_DEPTH: usize = 64;

/// Unit of a `repeat ... & t.<unit> = (n)` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Millis,
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    /// Unknown units fall back to seconds.
    pub fn parse(unit: &str) -> Self {
        match unit {
            "ms" => TimeUnit::Millis,
            "m" => TimeUnit::Minutes,
            "h" => TimeUnit::Hours,
            _ => TimeUnit::Seconds,
        }
    }
}

/// Timing knobs for a run.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Pause between two iterations of a `turn` loop.
    pub iteration_delay: Duration,
    pub tick_millis: Duration,
    pub tick_seconds: Duration,
    pub tick_minutes: Duration,
    pub tick_hours: Duration,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            iteration_delay: Duration::from_millis(10),
            tick_millis: Duration::from_millis(100),
            tick_seconds: Duration::from_secs(1),
            tick_minutes: Duration::from_secs(60),
            tick_hours: Duration::from_secs(3600),
        }
    }
}

impl InterpreterConfig {
    pub fn with_iteration_delay(mut self, delay: Duration) -> Self {
        self.iteration_delay = delay;
        self
    }

    pub fn with_tick(mut self, unit: TimeUnit, delay: Duration) -> Self {
        match unit {
            TimeUnit::Millis => self.tick_millis = delay,
            TimeUnit::Seconds => self.tick_seconds = delay,
            TimeUnit::Minutes => self.tick_minutes = delay,
            TimeUnit::Hours => self.tick_hours = delay,
        }
        self
    }

    pub fn tick(&self, unit: TimeUnit) -> Duration {
        match unit {
            TimeUnit::Millis => self.tick_millis,
            TimeUnit::Seconds => self.tick_seconds,
            TimeUnit::Minutes => self.tick_minutes,
            TimeUnit::Hours => self.tick_hours,
        }
    }
}

#[derive(Debug, Default)]
struct StopState {
    stopped: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation for a run. Clones share one flag.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    inner: Arc<StopState>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.inner.stopped.store(false, Ordering::SeqCst);
    }

    /// Resolves once `stop` has been called.
    pub async fn stopped(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}

/// Walks a token stream and executes it statement by statement.
///
/// Output is pushed to the channel as it happens; the exit code is returned
/// once the stream is exhausted, `exit` runs, or the run is stopped.
pub struct Interpreter {
    env: Environment,
    host: Arc<dyn Host>,
    config: InterpreterConfig,
    output: mpsc::UnboundedSender<OutputEvent>,
    stop: StopHandle,
    exit_code: i32,
    exited: bool,
    depth: usize,
}

impl Interpreter {
    pub fn new(host: Arc<dyn Host>, output: mpsc::UnboundedSender<OutputEvent>) -> Self {
        Self {
            env: Environment::with_prelude(),
            host,
            config: InterpreterConfig::default(),
            output,
            stop: StopHandle::new(),
            exit_code: 0,
            exited: false,
            depth: 0,
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares `stop` with the caller instead of a private handle.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Handle for stopping the current (or next) run from another task.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// State left behind by the last run.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Runs `source` against a fresh environment and returns its exit code.
    /// A stop requested before the run begins is cleared.
    #[tracing::instrument(level = "info", skip(self, source), fields(source_len = source.len()))]
    pub async fn execute(&mut self, source: &str) -> i32 {
        self.env = Environment::with_prelude();
        self.exit_code = 0;
        self.exited = false;
        self.depth = 0;
        self.stop.reset();

        let tokens = lexer::tokenize(source);
        self.interpret(&tokens).await;

        if self.stop.is_stopped() {
            tracing::info!(exit_code = self.exit_code, "run stopped");
        } else {
            tracing::debug!(exit_code = self.exit_code, "run finished");
        }
        self.exit_code
    }

    fn halted(&self) -> bool {
        self.exited || self.stop.is_stopped()
    }

    fn emit(&self, kind: OutputKind, text: impl Into<String>) {
        if self.stop.is_stopped() {
            return;
        }
        if self.output.send(OutputEvent::new(kind, text)).is_err() {
            tracing::trace!("output receiver dropped");
        }
    }

    /// Sleeps for `duration` unless the run is stopped first.
    async fn pause(&self, duration: Duration) {
        if duration.is_zero() {
            tokio::task::yield_now().await;
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.stop.stopped() => {}
        }
    }

    fn interpret<'a>(
        &'a mut self,
        tokens: &'a [Token],
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let mut i = 0;
            while i < tokens.len() && !self.halted() {
                let token = &tokens[i];
                i = match token.kind {
                    TokenKind::Eof => break,
                    TokenKind::Tip => {
                        self.emit(OutputKind::Tip, token.text.clone());
                        i + 1
                    }
                    // A block nobody claimed does not run.
                    TokenKind::BlockOpen => skip_block(tokens, i),
                    TokenKind::Keyword(keyword) => {
                        tracing::trace!(%keyword, line = token.line, "statement");
                        self.statement(keyword, tokens, i).await
                    }
                    _ => i + 1,
                };
            }
        })
    }

    async fn statement(&mut self, keyword: Keyword, tokens: &[Token], i: usize) -> usize {
        match keyword {
            Keyword::Peat => self.peat(tokens, i + 1),
            Keyword::Var | Keyword::Str => self.declare_text(tokens, i + 1),
            Keyword::Hold => self.declare_number(tokens, i + 1),
            Keyword::Msg => {
                let msg = self.msg();
                self.emit(OutputKind::Print, msg.to_string());
                i + 1
            }
            Keyword::Turn => self.turn(tokens, i + 1).await,
            Keyword::Repeat => self.repeat(tokens, i + 1).await,
            Keyword::Exit => self.exit(tokens, i + 1),
            Keyword::Import | Keyword::Use => self.import(tokens, i + 1),
            Keyword::Func => self.define_function(tokens, i + 1),
            Keyword::Call => self.call(tokens, i + 1).await,
            Keyword::Int => self.int(tokens, i + 1).await,
            _ => i + 1,
        }
    }

    fn msg(&self) -> Value {
        self.env
            .variable(MSG_VARIABLE)
            .cloned()
            .unwrap_or_else(Value::empty)
    }

    fn evaluate_value(&self, token: &Token) -> Value {
        match token.kind {
            TokenKind::Str => Value::text(token.text.clone()),
            TokenKind::VarRef => self
                .env
                .variable(&token.text)
                .cloned()
                .unwrap_or_else(Value::empty),
            TokenKind::Paren => Value::Number(self.evaluate_number(&token.text)),
            TokenKind::Keyword(Keyword::Msg) => self.msg(),
            TokenKind::Number => {
                Value::Number(value::parse_number_prefix(&token.text).unwrap_or(0.0))
            }
            _ => Value::text(token.text.clone()),
        }
    }

    /// Arithmetic on a parenthesized expression; failures read as `0`.
    fn evaluate_number(&self, expr: &str) -> f64 {
        match arith::eval_arithmetic(expr, &self.env) {
            Ok(n) => n,
            Err(err) => {
                tracing::debug!(expr, error = %err, "numeric evaluation failed, using 0");
                0.0
            }
        }
    }

    fn peat(&mut self, tokens: &[Token], i: usize) -> usize {
        match tokens.get(i) {
            Some(token) if has_operand(token) => {
                let text = self.evaluate_value(token).to_string();
                self.emit(OutputKind::Print, text);
                i + 1
            }
            _ => i,
        }
    }

    /// `var {name} = value`
    fn declare_text(&mut self, tokens: &[Token], mut i: usize) -> usize {
        let Some(name) = tokens.get(i).filter(|t| t.kind == TokenKind::VarRef) else {
            return i;
        };
        i += 1;
        if !tokens.get(i).is_some_and(|t| t.kind == TokenKind::Assign) {
            return i;
        }
        i += 1;
        match tokens.get(i) {
            Some(token) if has_operand(token) => {
                let value = self.evaluate_value(token);
                self.env.set_variable(name.text.clone(), value);
                i + 1
            }
            _ => i,
        }
    }

    /// `hold (name) = (expression)`
    fn declare_number(&mut self, tokens: &[Token], mut i: usize) -> usize {
        let Some(name) = tokens.get(i).filter(|t| t.kind == TokenKind::Paren) else {
            return i;
        };
        i += 1;
        if !tokens.get(i).is_some_and(|t| t.kind == TokenKind::Assign) {
            return i;
        }
        i += 1;
        match tokens.get(i).filter(|t| t.kind == TokenKind::Paren) {
            Some(expr) => {
                let value = self.evaluate_number(&expr.text);
                self.env.set_variable(name.text.clone(), Value::Number(value));
                i + 1
            }
            None => i,
        }
    }

    /// `turn (count) { body }`
    async fn turn(&mut self, tokens: &[Token], mut i: usize) -> usize {
        let mut count = 1.0;
        if let Some(expr) = tokens.get(i).filter(|t| t.kind == TokenKind::Paren) {
            count = self.evaluate_number(&expr.text);
            i += 1;
        }
        let (body, next) = collect_body(tokens, i);
        let iterations = iterations(count);
        tracing::debug!(iterations, body_len = body.len(), "turn");

        for n in 0..iterations {
            if self.halted() {
                break;
            }
            if n > 0 {
                self.pause(self.config.iteration_delay).await;
                if self.halted() {
                    break;
                }
            }
            self.interpret(body).await;
        }
        next
    }

    /// `repeat value & t.<unit> = (count)`
    async fn repeat(&mut self, tokens: &[Token], mut i: usize) -> usize {
        let mut message = String::new();
        if let Some(token) = tokens.get(i).filter(|t| has_operand(t)) {
            message = self.evaluate_value(token).to_string();
            i += 1;
        }

        let mut unit = TimeUnit::Seconds;
        let mut count = 1.0;
        if tokens.get(i).is_some_and(|t| t.kind == TokenKind::Ampersand) {
            i += 1;
            while let Some(token) = tokens.get(i) {
                match token.kind {
                    TokenKind::Keyword(Keyword::T) | TokenKind::Dot | TokenKind::Assign => i += 1,
                    TokenKind::Identifier => {
                        unit = TimeUnit::parse(&token.text);
                        i += 1;
                    }
                    TokenKind::Paren => {
                        count = self.evaluate_number(&token.text);
                        i += 1;
                        break;
                    }
                    _ => break,
                }
            }
        }

        let delay = self.config.tick(unit);
        for n in 0..iterations(count) {
            if self.halted() {
                break;
            }
            if n > 0 {
                self.pause(delay).await;
                if self.halted() {
                    break;
                }
            }
            self.emit(OutputKind::Print, message.clone());
        }
        i
    }

    fn exit(&mut self, tokens: &[Token], mut i: usize) -> usize {
        if let Some(expr) = tokens.get(i).filter(|t| t.kind == TokenKind::Paren) {
            self.exit_code = self.evaluate_number(&expr.text) as i32;
            i += 1;
        }
        self.emit(OutputKind::Success, "");
        self.emit(
            OutputKind::Success,
            format!("Program exited with code {}", self.exit_code),
        );
        self.exited = true;
        i
    }

    /// `import Name` or `import G_Web.Kit`; nothing is resolved.
    fn import(&mut self, tokens: &[Token], mut i: usize) -> usize {
        let Some(first) = tokens.get(i).filter(|t| t.kind == TokenKind::Identifier) else {
            return i;
        };
        let mut module = first.text.clone();
        i += 1;
        while tokens.get(i).is_some_and(|t| t.kind == TokenKind::Dot) {
            match tokens.get(i + 1).filter(|t| t.kind == TokenKind::Identifier) {
                Some(part) => {
                    module.push('.');
                    module.push_str(&part.text);
                    i += 2;
                }
                None => break,
            }
        }
        self.emit(OutputKind::Info, format!("Module '{module}' imported"));
        i
    }

    /// `func name { body }`, or without braces everything up to the next
    /// `func` or `exit`.
    fn define_function(&mut self, tokens: &[Token], i: usize) -> usize {
        let Some(name) = tokens.get(i).filter(|t| t.kind == TokenKind::Identifier) else {
            return i;
        };
        let start = i + 1;
        let (body, next) = if tokens.get(start).is_some_and(|t| t.kind == TokenKind::BlockOpen) {
            let close = skip_block(tokens, start);
            (block_interior(tokens, start, close), close)
        } else {
            let mut j = start;
            while let Some(token) = tokens.get(j) {
                match token.kind {
                    TokenKind::Eof | TokenKind::BlockClose => break,
                    TokenKind::Keyword(Keyword::Func | Keyword::Exit) => break,
                    TokenKind::BlockOpen => j = skip_block(tokens, j),
                    _ => j += 1,
                }
            }
            (&tokens[start..j], j)
        };
        tracing::debug!(name = %name.text, body_len = body.len(), "function defined");
        self.env.define_function(name.text.clone(), body.to_vec());
        next
    }

    async fn call(&mut self, tokens: &[Token], i: usize) -> usize {
        let Some(name) = tokens.get(i).filter(|t| t.kind == TokenKind::Identifier) else {
            return i;
        };
        let Some(body) = self.env.function(&name.text).map(<[Token]>::to_vec) else {
            tracing::debug!(name = %name.text, "call to undefined function ignored");
            return i + 1;
        };
        if self.depth >= MAX_CALL_DEPTH {
            self.emit(
                OutputKind::Error,
                format!("Maximum call depth exceeded calling '{}'", name.text),
            );
            return i + 1;
        }
        self.depth += 1;
        self.interpret(&body).await;
        self.depth -= 1;
        i + 1
    }

    /// The `int` command namespace.
    async fn int(&mut self, tokens: &[Token], mut i: usize) -> usize {
        let sub = match tokens.get(i).filter(|t| t.kind == TokenKind::Identifier) {
            Some(token) => {
                i += 1;
                token.text.as_str()
            }
            None => "",
        };

        match sub {
            "cmd" => {
                let (name, next) = string_arg(tokens, i);
                i = next;
                let mut body = String::new();
                while let Some(token) = tokens.get(i) {
                    match token.kind {
                        TokenKind::CommandBody | TokenKind::VarRef | TokenKind::Str => {
                            body = token.text.clone();
                            i += 1;
                            break;
                        }
                        TokenKind::Keyword(_) | TokenKind::Eof | TokenKind::BlockClose => break,
                        _ => i += 1,
                    }
                }
                self.env.define_alias(name.clone(), body);
                self.emit(OutputKind::Alias, format!("[INT] Defined command: {name}"));
            }
            "exec" => {
                let (name, next) = string_arg(tokens, i);
                i = next;
                let body = self
                    .env
                    .alias(&name)
                    .filter(|body| !body.is_empty())
                    .map(str::to_string);
                match body {
                    Some(body) => {
                        self.emit(OutputKind::Alias, format!("[INT] Executing: {name}"));
                        self.shell(&body).await;
                    }
                    None => {
                        self.emit(OutputKind::Error, format!("[INT] Command not found: {name}"));
                    }
                }
            }
            "list" => {
                self.emit(OutputKind::Alias, "[INT] Available commands:");
                let names: Vec<String> = self.env.alias_names().map(str::to_string).collect();
                if names.is_empty() {
                    self.emit(OutputKind::Alias, "  (none defined)");
                }
                for name in names {
                    self.emit(OutputKind::Alias, format!("  - {name}"));
                }
            }
            "load" => {
                let (path, next) = string_arg(tokens, i);
                i = next;
                match self.host.load_config(&path).await {
                    Ok(commands) => {
                        for (name, body) in commands {
                            self.env.define_alias(name, body);
                        }
                        self.emit(OutputKind::Alias, format!("[INT] Loaded config: {path}"));
                    }
                    Err(err) => self.host_failure("load", err),
                }
            }
            "pack" => {
                let (config_path, next) = string_arg(tokens, i);
                i = next;
                let output_path = package::package_path_for(&config_path);
                match self.host.pack(&config_path, &output_path).await {
                    Ok(()) => self.emit(
                        OutputKind::Alias,
                        format!("[INT] Packaged: {config_path} -> {output_path}"),
                    ),
                    Err(err) => self.host_failure("pack", err),
                }
            }
            "run" => {
                let (path, next) = string_arg(tokens, i);
                i = next;
                match self.host.run_package(&path).await {
                    Ok(steps) => {
                        for step in steps {
                            self.emit(OutputKind::Alias, format!("[INT] Running: {}", step.name));
                            let text = trim_newlines(&step.output);
                            if !text.is_empty() {
                                self.emit(OutputKind::Print, text);
                            }
                        }
                        self.emit(OutputKind::Alias, format!("[INT] Package executed: {path}"));
                    }
                    Err(err) => self.host_failure("run", err),
                }
            }
            "shell" => {
                let (command, next) = string_arg(tokens, i);
                i = next;
                self.shell(&command).await;
            }
            _ => {
                self.emit(
                    OutputKind::Alias,
                    "[INT] Usage: int cmd/exec/list/load/pack/run/shell",
                );
            }
        }
        i
    }

    fn host_failure(&self, action: &str, err: HostError) {
        match err {
            HostError::Unavailable => {
                self.emit(OutputKind::Error, "[INT] File operations require host support");
            }
            err => {
                tracing::warn!(action, error = %err, "host package operation failed");
                self.emit(OutputKind::Error, format!("[INT] Failed to {action}: {err}"));
            }
        }
    }

    async fn shell(&self, command: &str) {
        if command.is_empty() {
            return;
        }
        match self.host.shell(command).await {
            Ok(result) if result.success => {
                let text = trim_newlines(&result.output);
                if !text.is_empty() {
                    self.emit(OutputKind::Print, text);
                }
            }
            Ok(result) => {
                let text = trim_newlines(&result.output);
                let text = if text.is_empty() { "Command failed" } else { text };
                self.emit(OutputKind::Error, text);
            }
            Err(HostError::Unavailable) => {
                self.emit(OutputKind::Alias, format!("[INT] Would execute: {command}"));
                self.emit(OutputKind::Info, "(Shell execution requires host support)");
            }
            Err(err) => {
                tracing::warn!(command, error = %err, "shell delegation failed");
                self.emit(OutputKind::Error, format!("Shell error: {err}"));
            }
        }
    }
}

/// Tokens that can stand as the operand of `peat`, `var`, or `repeat`.
fn has_operand(token: &Token) -> bool {
    !matches!(
        token.kind,
        TokenKind::Eof | TokenKind::BlockOpen | TokenKind::BlockClose
    )
}

fn iterations(count: f64) -> u64 {
    if count.is_nan() || count <= 0.0 {
        0
    } else {
        count.ceil() as u64
    }
}

fn trim_newlines(text: &str) -> &str {
    text.trim_end_matches(['\n', '\r'])
}

/// A quoted-string argument, or the empty string when there is none.
fn string_arg(tokens: &[Token], i: usize) -> (String, usize) {
    match tokens.get(i).filter(|t| t.kind == TokenKind::Str) {
        Some(token) => (token.text.clone(), i + 1),
        None => (String::new(), i),
    }
}

/// Index just past the `BlockClose` matching the `BlockOpen` at `open`, or
/// the index of `Eof` when the block never closes.
pub(crate) fn skip_block(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0usize;
    let mut j = open;
    while let Some(token) = tokens.get(j) {
        match token.kind {
            TokenKind::BlockOpen => depth += 1,
            TokenKind::BlockClose => {
                depth -= 1;
                if depth == 0 {
                    return j + 1;
                }
            }
            TokenKind::Eof => return j,
            _ => {}
        }
        j += 1;
    }
    j
}

/// Tokens strictly inside the block opened at `open`; `end` is what
/// `skip_block` returned for it.
fn block_interior(tokens: &[Token], open: usize, end: usize) -> &[Token] {
    let closed = tokens
        .get(end.wrapping_sub(1))
        .is_some_and(|t| t.kind == TokenKind::BlockClose)
        && end > open + 1;
    let stop = if closed { end - 1 } else { end };
    &tokens[open + 1..stop.max(open + 1)]
}

/// Splits off a loop body starting at `start`.
///
/// A braced body is everything up to the matching close. Without braces
/// the body is the next statement together with anything chained onto it
/// with `&`; it ends at the next statement keyword not preceded by `&`.
pub(crate) fn collect_body(tokens: &[Token], start: usize) -> (&[Token], usize) {
    if tokens.get(start).is_some_and(|t| t.kind == TokenKind::BlockOpen) {
        let end = skip_block(tokens, start);
        return (block_interior(tokens, start, end), end);
    }

    let mut j = start;
    while let Some(token) = tokens.get(j) {
        match token.kind {
            TokenKind::Eof | TokenKind::BlockClose => break,
            TokenKind::BlockOpen => {
                j = skip_block(tokens, j);
                continue;
            }
            TokenKind::Keyword(keyword)
                if j > start
                    && keyword.starts_statement()
                    && tokens[j - 1].kind != TokenKind::Ampersand =>
            {
                break;
            }
            _ => {}
        }
        j += 1;
    }
    (&tokens[start..j], j)
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub events: Vec<OutputEvent>,
    pub exit_code: i32,
}

/// Runs `source` to completion and gathers its output.
pub async fn run_collect(
    source: &str,
    host: Arc<dyn Host>,
    config: InterpreterConfig,
) -> RunOutcome {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut interpreter = Interpreter::new(host, tx).with_config(config);
    let exit_code = interpreter.execute(source).await;
    drop(interpreter);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    RunOutcome { events, exit_code }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn braced_body_stops_at_matching_close() {
        let tokens = tokenize("{ peat 'a' turn (2) { peat 'b' } } peat 'c'");
        let (body, next) = collect_body(&tokens, 0);
        assert_eq!(body.len(), 8);
        assert_eq!(body[0].kind, TokenKind::Keyword(Keyword::Peat));
        assert_eq!(body.last().map(|t| t.kind), Some(TokenKind::BlockClose));
        assert_eq!(tokens[next].text, "peat");
        assert_eq!(tokens[next + 1].text, "c");
    }

    #[test]
    fn braceless_body_is_one_statement() {
        let tokens = tokenize("peat 'a' peat 'b'");
        let (body, next) = collect_body(&tokens, 0);
        assert_eq!(texts(body), vec!["peat", "a"]);
        assert_eq!(next, 2);
    }

    #[test]
    fn ampersand_chains_statements_into_the_body() {
        let tokens = tokenize("peat 'a' & peat 'b' peat 'c'");
        let (body, _) = collect_body(&tokens, 0);
        assert_eq!(texts(body), vec!["peat", "a", "&", "peat", "b"]);
    }

    #[test]
    fn unclosed_block_runs_to_end() {
        let tokens = tokenize("{ peat 'a'");
        let (body, next) = collect_body(&tokens, 0);
        assert_eq!(texts(body), vec!["peat", "a"]);
        assert_eq!(tokens[next].kind, TokenKind::Eof);
    }

    #[test]
    fn empty_block() {
        let tokens = tokenize("{} peat 'x'");
        let (body, next) = collect_body(&tokens, 0);
        assert!(body.is_empty());
        assert_eq!(next, 2);
    }

    #[test]
    fn iteration_count_rounds_up_and_clamps() {
        assert_eq!(iterations(3.0), 3);
        assert_eq!(iterations(2.5), 3);
        assert_eq!(iterations(0.0), 0);
        assert_eq!(iterations(-4.0), 0);
        assert_eq!(iterations(f64::NAN), 0);
    }

    #[test]
    fn time_units() {
        let config = InterpreterConfig::default();
        assert_eq!(config.tick(TimeUnit::parse("ms")), Duration::from_millis(100));
        assert_eq!(config.tick(TimeUnit::parse("s")), Duration::from_secs(1));
        assert_eq!(config.tick(TimeUnit::parse("m")), Duration::from_secs(60));
        assert_eq!(config.tick(TimeUnit::parse("h")), Duration::from_secs(3600));
        assert_eq!(TimeUnit::parse("fortnight"), TimeUnit::Seconds);
    }

    #[tokio::test]
    async fn stop_handle_wakes_waiters() {
        let handle = StopHandle::new();
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.stopped().await });
        tokio::task::yield_now().await;
        handle.stop();
        task.await.unwrap();
        assert!(handle.is_stopped());
    }
}
