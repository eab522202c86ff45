use indexmap::IndexMap;

use crate::{lexer::Token, value::Value};

/// Name of the builtin message variable every run starts with.
pub const MSG_VARIABLE: &str = "msg";
pub const MSG_DEFAULT: &str = "Geneia Programming Language";

/// Per-run store of variables, functions, and command aliases.
///
/// A single instance lives for one top-level execution. Loop bodies and
/// function calls run against the same instance, so writes made inside them
/// are visible afterwards.
#[derive(Debug, Default, Clone)]
pub struct Environment {
    variables: IndexMap<String, Value>,
    functions: IndexMap<String, Vec<Token>>,
    aliases: IndexMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh environment seeded with the builtin `msg` variable.
    pub fn with_prelude() -> Self {
        let mut env = Self::new();
        env.set_variable(MSG_VARIABLE, Value::text(MSG_DEFAULT));
        env
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn function(&self, name: &str) -> Option<&[Token]> {
        self.functions.get(name).map(Vec::as_slice)
    }

    pub fn define_function(&mut self, name: impl Into<String>, body: Vec<Token>) {
        self.functions.insert(name.into(), body);
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn alias(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    pub fn define_alias(&mut self, name: impl Into<String>, body: impl Into<String>) {
        self.aliases.insert(name.into(), body.into());
    }

    pub fn has_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// Alias names in definition order.
    pub fn alias_names(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }
}
