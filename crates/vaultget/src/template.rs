//! Template rendering with named functions
//!
//! Replaces `{{ ... }}` actions in a string. An action is either a variable
//! reference (`{{ .vault_path }}`) or a function call whose arguments are
//! double-quoted literals or variable references:
//!
//! ```text
//! {{ AnsibleVault .vault_path "foo.bar" }}
//! ```
//!
//! Everything outside actions is copied unchanged. Any failing call aborts
//! the whole render; there is no fallback value.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::error::LookupError;
use crate::pipeline::AnsibleVault;

/// Name of the vault lookup function in templates
pub const ANSIBLE_VAULT_FUNC: &str = "AnsibleVault";

const ACTION_OPEN: &str = "{{";
const ACTION_CLOSE: &str = "}}";

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

type Func<'a> = Box<dyn Fn(&[String]) -> Result<String, BoxError> + Send + Sync + 'a>;

/// Template errors
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template: unclosed action at byte {0}")]
    Unclosed(usize),

    #[error("template: {message} in action {action:?}")]
    Syntax { action: String, message: String },

    #[error("template: function {0:?} not defined")]
    UnknownFunction(String),

    #[error("template: variable .{0} not defined")]
    UnknownVariable(String),

    #[error("error calling {name}: {source}")]
    Call {
        name: String,
        #[source]
        source: BoxError,
    },
}

impl TemplateError {
    /// The vault lookup failure behind a failed `AnsibleVault` call
    pub fn lookup_error(&self) -> Option<&LookupError> {
        match self {
            Self::Call { source, .. } => source.downcast_ref::<LookupError>(),
            _ => None,
        }
    }
}

/// Functions callable from templates, by name
#[derive(Default)]
pub struct TemplateFuncs<'a> {
    funcs: BTreeMap<String, Func<'a>>,
}

impl<'a> TemplateFuncs<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` under `name`, replacing any previous one
    pub fn add<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&[String]) -> Result<String, BoxError> + Send + Sync + 'a,
    {
        self.funcs.insert(name.to_string(), Box::new(func));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.funcs.keys().map(String::as_str).collect()
    }

    fn call(&self, name: &str, args: &[String]) -> Result<String, TemplateError> {
        let func = self
            .funcs
            .get(name)
            .ok_or_else(|| TemplateError::UnknownFunction(name.to_string()))?;
        func(args).map_err(|source| TemplateError::Call {
            name: name.to_string(),
            source,
        })
    }
}

/// Install `AnsibleVault(file, key)` backed by `vault`
pub fn register_ansible_vault<'a>(funcs: &mut TemplateFuncs<'a>, vault: &'a AnsibleVault<'a>) {
    funcs.add(ANSIBLE_VAULT_FUNC, move |args| {
        call_ansible_vault(vault, args).map_err(BoxError::from)
    });
}

/// Arity is checked before anything touches the disk or the keyring
pub fn call_ansible_vault(vault: &AnsibleVault<'_>, args: &[String]) -> Result<String, LookupError> {
    match args {
        [file_path, key_path] => vault.get(file_path, key_path),
        _ => Err(LookupError::InvalidArgumentCount {
            func: ANSIBLE_VAULT_FUNC.to_string(),
            want: 2,
            got: args.len(),
        }),
    }
}

/// Variables addressable as `.name`
#[derive(Debug, Clone, Default)]
pub struct Variables {
    vars: BTreeMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dashes become underscores, so option `vault-path` is `.vault_path`
    pub fn set(&mut self, name: &str, value: &str) {
        self.vars.insert(name.replace('-', "_"), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&String> {
        self.vars.get(&name.replace('-', "_"))
    }

    /// Parse NAME=VALUE strings and add them as variables
    pub fn add_from_pairs(&mut self, pairs: &[String]) {
        for pair in pairs {
            if let Some((name, value)) = pair.split_once('=') {
                self.set(name.trim(), value.trim());
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Ident(String),
    Var(String),
    Literal(String),
}

/// A template string
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn render(&self, vars: &Variables, funcs: &TemplateFuncs<'_>) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        let mut rest = self.source.as_str();
        let mut offset = 0;

        while let Some(start) = rest.find(ACTION_OPEN) {
            out.push_str(&rest[..start]);

            let body = &rest[start + ACTION_OPEN.len()..];
            let end = find_action_end(body).ok_or(TemplateError::Unclosed(offset + start))?;
            out.push_str(&eval(&body[..end], vars, funcs)?);

            let consumed = start + ACTION_OPEN.len() + end + ACTION_CLOSE.len();
            offset += consumed;
            rest = &rest[consumed..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

/// Byte offset of the closing `}}`, ignoring any inside string literals
fn find_action_end(body: &str) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in body.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
        } else if c == '"' {
            in_string = true;
        } else if body[i..].starts_with(ACTION_CLOSE) {
            return Some(i);
        }
    }
    None
}

fn eval(action: &str, vars: &Variables, funcs: &TemplateFuncs<'_>) -> Result<String, TemplateError> {
    let syntax = |message: String| TemplateError::Syntax {
        action: action.trim().to_string(),
        message,
    };

    let tokens = tokenize(action).map_err(syntax)?;
    let lookup_var = |name: &str| {
        vars.get(name)
            .cloned()
            .ok_or_else(|| TemplateError::UnknownVariable(name.to_string()))
    };

    match tokens.split_first() {
        None => Err(syntax("empty action".to_string())),
        Some((Token::Var(name), [])) => lookup_var(name.as_str()),
        Some((Token::Ident(name), args)) => {
            let args = args
                .iter()
                .map(|arg| match arg {
                    Token::Literal(s) => Ok(s.clone()),
                    Token::Var(name) => lookup_var(name.as_str()),
                    Token::Ident(ident) => Err(syntax(format!("unexpected identifier {}", ident))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            funcs.call(name, &args)
        }
        Some((first, _)) => Err(syntax(format!("can't call {:?}", first))),
    }
}

fn tokenize(action: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = action.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let mut literal = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('n') => literal.push('\n'),
                        Some('t') => literal.push('\t'),
                        Some(other @ ('"' | '\\')) => literal.push(other),
                        Some(other) => return Err(format!("unknown escape \\{}", other)),
                        None => return Err("unterminated string".to_string()),
                    },
                    Some(other) => literal.push(other),
                    None => return Err("unterminated string".to_string()),
                }
            }
            tokens.push(Token::Literal(literal));
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '"' {
                    break;
                }
                word.push(c);
                chars.next();
            }
            tokens.push(classify(&word)?);
        }
    }

    Ok(tokens)
}

fn classify(word: &str) -> Result<Token, String> {
    let is_name = |s: &str| {
        let mut chars = s.chars();
        matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
            && chars.all(|c| c.is_alphanumeric() || c == '_')
    };

    match word.strip_prefix('.') {
        Some(name) if is_name(name) => Ok(Token::Var(name.to_string())),
        None if is_name(word) => Ok(Token::Ident(word.to_string())),
        _ => Err(format!("unexpected {:?}", word)),
    }
}
