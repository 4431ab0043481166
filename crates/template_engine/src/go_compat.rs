//! Rewrites Go-template style expressions into Handlebars expressions.
//!
//! Templates written for the earlier plugin release use Go template syntax.
//! The supported subset is rewritten before compiling:
//!
//! - a `.` directly in front of an identifier is dropped
//!   (`{{ .DroneCommit }}` becomes `{{ DroneCommit }}`), a lone `.` becomes
//!   `this` and `$.` becomes `@root.`;
//! - `a | f x` becomes `f x a`, with `a` wrapped in a subexpression when it is
//!   itself a call (`{{ .Tag | lowercase | uppercase }}` becomes
//!   `{{ uppercase (lowercase Tag) }}`);
//! - `if`, `with` and `range` open `#if`, `#with` and `#each` blocks, `else`
//!   and `else if` continue them and `end` closes whichever block is open;
//! - `{{-` and `-}}` trim whitespace like `{{~` and `~}}`;
//! - `{{/* comments */}}` render nothing.
//!
//! Quoted string literals are never touched. Handlebars comments keep their
//! text, and native block expressions (`{{#if .Ready}}`) only get the dot
//! rewrite because `|` introduces block parameters there. Go constructs with
//! no Handlebars counterpart (`define`, `template`, `block`, variable
//! declarations in `range`) and an `else` or `end` without an open block are
//! rejected as parse errors.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

use crate::errors::Error;

#[cfg(test)]
#[path = "go_compat_tests.rs"]
mod tests;

fn mustache_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("mustache pattern is valid"))
}

/// Rewrites every `{{ ... }}` expression of `template`.
///
/// Returns the input borrowed when nothing needed rewriting.
///
/// # Errors
///
/// Returns `Error::Parse` for Go constructs that cannot be expressed in
/// Handlebars and for `else`/`end` outside of a block.
pub fn translate(template: &str) -> Result<Cow<'_, str>, Error> {
    let mut translator = Translator::default();
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for found in mustache_pattern().find_iter(template) {
        let expression = found.as_str();
        let inner = &expression[2..expression.len() - 2];
        out.push_str(&template[last..found.start()]);
        out.push_str(&translator.expression(expression, inner)?);
        last = found.end();
    }

    out.push_str(&template[last..]);

    if out == template {
        Ok(Cow::Borrowed(template))
    } else {
        Ok(Cow::Owned(out))
    }
}

/// A block opened by `if`, `with`, `range` or a native `{{#name}}`.
#[derive(Debug)]
struct OpenBlock {
    name: String,
    /// Blocks opened by `else if` / `else with`, closed together with this one.
    chained: Vec<&'static str>,
}

impl OpenBlock {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chained: Vec::new(),
        }
    }

    /// Closing tag bodies, innermost first, joined into one expression body.
    fn closing_tags(&self) -> String {
        let mut tags = String::new();
        for name in self.chained.iter().rev() {
            tags.push_str(&format!("/{name}}}}}{{{{"));
        }
        tags.push('/');
        tags.push_str(&self.name);
        tags
    }
}

#[derive(Debug, Default)]
struct Translator {
    blocks: Vec<OpenBlock>,
}

impl Translator {
    /// Returns the replacement for one whole `{{ ... }}` expression.
    fn expression(&mut self, expression: &str, inner: &str) -> Result<String, Error> {
        let (lead, body, trail) = split_whitespace_control(inner);

        let head = body.trim_start();
        if head.starts_with('!') || head.starts_with('{') {
            return Ok(expression.to_string());
        }
        if head.starts_with("/*") {
            return Ok(String::new());
        }

        let body = strip_field_dots(body);
        let trimmed = body.trim();
        let (keyword, rest) = split_keyword(trimmed);

        let translated = match keyword {
            "if" | "with" | "range" if !rest.is_empty() => self.open_go_block(keyword, rest)?,
            "else" => self.else_branch(rest)?,
            "end" if rest.is_empty() => self.close_go_block()?,
            "define" | "template" | "block" | "break" | "continue" => {
                return Err(parse_error(format!(
                    "'{keyword}' is not supported in templates"
                )));
            }
            _ if trimmed.starts_with('#') => {
                self.open_native_block(&trimmed[1..]);
                body
            }
            _ if trimmed.starts_with('^') => {
                let section = trimmed[1..].trim();
                if !section.is_empty() {
                    self.open_native_block(section);
                }
                body
            }
            _ if trimmed.starts_with('/') => match self.close_native_block(&trimmed[1..]) {
                Some(tags) => tags,
                None => body,
            },
            _ if trimmed.starts_with('>') => body,
            _ => rewrite_pipeline(&body).unwrap_or(body),
        };

        Ok(format!("{{{{{lead}{translated}{trail}}}}}"))
    }

    fn open_go_block(&mut self, keyword: &str, rest: &str) -> Result<String, Error> {
        let name = match keyword {
            "if" => "if",
            "with" => "with",
            _ => {
                if rest.contains(":=") {
                    return Err(parse_error(
                        "variable declarations in 'range' are not supported",
                    ));
                }
                "each"
            }
        };

        self.blocks.push(OpenBlock::new(name));
        Ok(format!("#{name} {}", operand(rest)))
    }

    fn else_branch(&mut self, rest: &str) -> Result<String, Error> {
        let block = self
            .blocks
            .last_mut()
            .ok_or_else(|| parse_error("'else' outside of a block"))?;

        if rest.is_empty() {
            return Ok("else".to_string());
        }

        let (keyword, condition) = split_keyword(rest);
        let name = match keyword {
            "if" if !condition.is_empty() => "if",
            "with" if !condition.is_empty() => "with",
            _ => return Err(parse_error(format!("unsupported clause 'else {rest}'"))),
        };

        block.chained.push(name);
        Ok(format!("else}}}}{{{{#{name} {}", operand(condition)))
    }

    fn close_go_block(&mut self) -> Result<String, Error> {
        let block = self
            .blocks
            .pop()
            .ok_or_else(|| parse_error("'end' without a matching block"))?;
        Ok(block.closing_tags())
    }

    fn open_native_block(&mut self, opening: &str) {
        let name = block_name(opening.trim_start_matches(['>', '*']));
        self.blocks.push(OpenBlock::new(name));
    }

    /// Pops the matching block. Returns the closing tags when `else if`
    /// chains have to be closed too. A mismatched close is left for the
    /// parser.
    fn close_native_block(&mut self, closing: &str) -> Option<String> {
        let name = block_name(closing);
        if !self.blocks.last().is_some_and(|block| block.name == name) {
            return None;
        }

        self.blocks
            .pop()
            .filter(|block| !block.chained.is_empty())
            .map(|block| block.closing_tags())
    }
}

fn parse_error(message: impl Into<String>) -> Error {
    Error::Parse {
        message: message.into(),
    }
}

/// Splits off `~` and Go's `-` trim markers, returning them as `~`.
fn split_whitespace_control(inner: &str) -> (&'static str, &str, &'static str) {
    let body = inner.trim_start_matches('~');
    let mut lead = if body.len() < inner.len() { "~" } else { "" };
    let trimmed = body.trim_end_matches('~');
    let mut trail = if trimmed.len() < body.len() { "~" } else { "" };
    let mut body = trimmed;

    if lead.is_empty() {
        if let Some(rest) = body.strip_prefix('-') {
            if rest.starts_with(char::is_whitespace) {
                lead = "~";
                body = rest;
            }
        }
    }
    if trail.is_empty() {
        if let Some(rest) = body.strip_suffix('-') {
            if rest.ends_with(char::is_whitespace) {
                trail = "~";
                body = rest;
            }
        }
    }

    (lead, body, trail)
}

/// First whitespace-delimited word and the trimmed remainder.
fn split_keyword(expression: &str) -> (&str, &str) {
    match expression.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (expression, ""),
    }
}

fn block_name(expression: &str) -> &str {
    expression
        .split(|c: char| c.is_whitespace() || c == '~')
        .next()
        .unwrap_or_default()
}

/// A block argument: pipelines folded, calls wrapped in a subexpression.
fn operand(expression: &str) -> String {
    let folded = rewrite_pipeline(expression);
    let expression = folded.as_deref().map_or(expression, str::trim);

    let parenthesized = expression.starts_with('(') && expression.ends_with(')');
    if has_unquoted_whitespace(expression) && !parenthesized {
        format!("({expression})")
    } else {
        expression.to_string()
    }
}

/// Drops a `.` that starts a field reference, turns a lone `.` into `this`
/// and `$` before a dot into `@root`. Relative paths such as `../x` and `./x`
/// and decimal numbers keep their dots.
fn strip_field_dots(expression: &str) -> String {
    let chars: Vec<char> = expression.chars().collect();
    let mut out = String::with_capacity(expression.len());
    let mut quote: Option<char> = None;

    for (i, &c) in chars.iter().enumerate() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            out.push(c);
            continue;
        }

        let starts_token =
            i == 0 || chars[i - 1].is_whitespace() || chars[i - 1] == '(' || chars[i - 1] == '=';
        let next = chars.get(i + 1).copied();

        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            '.' if starts_token && next.map_or(true, |n| n.is_whitespace() || n == ')') => {
                out.push_str("this");
            }
            '.' => {
                let before_ident = next.is_some_and(|n| n.is_alphabetic() || n == '_');
                if !(starts_token && before_ident) {
                    out.push(c);
                }
            }
            '$' if starts_token && next == Some('.') => out.push_str("@root"),
            _ => out.push(c),
        }
    }

    out
}

/// Splits on unquoted `|` and folds the stages into nested calls.
///
/// Returns `None` when the expression is not a pipeline or has an empty stage,
/// leaving the original text for the parser to judge.
fn rewrite_pipeline(expression: &str) -> Option<String> {
    let stages = split_unquoted(expression, '|');
    if stages.len() < 2 {
        return None;
    }

    let mut stages = stages.into_iter().map(str::trim);
    let mut acc = stages.next()?.to_string();
    if acc.is_empty() {
        return None;
    }

    for stage in stages {
        if stage.is_empty() {
            return None;
        }
        let operand = if has_unquoted_whitespace(&acc) {
            format!("({acc})")
        } else {
            acc
        };
        acc = format!("{stage} {operand}");
    }

    Some(format!(" {acc} "))
}

fn split_unquoted(expression: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in expression.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == separator => {
                parts.push(&expression[start..i]);
                start = i + c.len_utf8();
            }
            None => {}
        }
    }
    parts.push(&expression[start..]);

    parts
}

fn has_unquoted_whitespace(expression: &str) -> bool {
    let mut quote: Option<char> = None;
    for c in expression.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c.is_whitespace() => return true,
            None => {}
        }
    }
    false
}
