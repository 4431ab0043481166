//! # Template Helper Functions
//!
//! The fixed set of text helpers available to every template. Each helper is a
//! plain function over JSON arguments, registered by name into the Handlebars
//! registry once when the engine is built.
//!
//! | Helper | Arguments | Result |
//! |---|---|---|
//! | `uppercase` | `s` | `s` upper-cased |
//! | `lowercase` | `s` | `s` lower-cased |
//! | `replace` | `s old new [n]` | first `n` occurrences replaced, all if `n` is omitted or negative |
//! | `split` | `s sep` | list of substrings |
//! | `trim` | `s cutset` | leading/trailing characters in `cutset` removed |
//! | `trimPrefix` | `s prefix` | `prefix` removed once |
//! | `trimSuffix` | `s suffix` | `suffix` removed once |
//! | `toTitle` | `s` | every letter mapped to its title form |
//! | `datetime` | `timestamp layout [zone]` | formatted Unix timestamp, strftime or Go reference layout |
//! | `truncate` | `s n` | first `n` code points of `s` |
//! | `base64encode` | `s` | standard base64 |
//! | `base64decode` | `s` | decoded text, or `s` itself when it is not valid base64 |

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Local, TimeZone};
use chrono_tz::Tz;
use handlebars::{
    Context, Handlebars, Helper, HelperDef, RenderContext, RenderError, RenderErrorReason,
    ScopedJson,
};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt::{Display, Write as _};
use tracing::debug;

use crate::errors::Error;

#[cfg(test)]
#[path = "helpers_tests.rs"]
mod tests;

/// Signature shared by every helper: positional JSON arguments in, JSON value
/// or an error message out.
pub type HelperFn = fn(&[Value]) -> Result<Value, String>;

const STANDARD_HELPERS: &[(&str, HelperFn)] = &[
    ("uppercase", uppercase_helper),
    ("lowercase", lowercase_helper),
    ("replace", replace_helper),
    ("split", split_helper),
    ("trim", trim_helper),
    ("trimPrefix", trim_prefix_helper),
    ("trimSuffix", trim_suffix_helper),
    ("toTitle", to_title_helper),
    ("datetime", datetime_helper),
    ("truncate", truncate_helper),
    ("base64encode", base64_encode_helper),
    ("base64decode", base64_decode_helper),
];

/// Immutable name-to-function table of template helpers.
#[derive(Clone, Copy)]
pub struct HelperFunctionSet {
    functions: &'static [(&'static str, HelperFn)],
}

impl HelperFunctionSet {
    /// The helper set every engine installs.
    pub const fn standard() -> Self {
        Self {
            functions: STANDARD_HELPERS,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.iter().map(|(name, _)| *name)
    }

    pub fn get(&self, name: &str) -> Option<HelperFn> {
        self.functions
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, function)| *function)
    }

    /// Calls a helper by name outside of a template.
    ///
    /// # Errors
    ///
    /// Returns `Error::Execute` when the helper does not exist or rejects its
    /// arguments.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, Error> {
        let function = self.get(name).ok_or_else(|| Error::Execute {
            message: format!("unknown helper '{name}'"),
        })?;
        function(args).map_err(|message| Error::Execute {
            message: format!("{name}: {message}"),
        })
    }

    /// Registers every helper of the set into a Handlebars registry.
    pub fn install(&self, handlebars: &mut Handlebars<'static>) {
        for &(name, function) in self.functions {
            handlebars.register_helper(
                name,
                Box::new(FunctionHelper { name, function }),
            );
        }
    }
}

impl std::fmt::Debug for HelperFunctionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl Default for HelperFunctionSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Adapts a [`HelperFn`] to the Handlebars helper interface.
///
/// Implementing `call_inner` makes the helper usable both as a plain
/// expression and as a subexpression argument of another helper.
struct FunctionHelper {
    name: &'static str,
    function: HelperFn,
}

impl HelperDef for FunctionHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let args: Vec<Value> = h.params().iter().map(|p| p.value().clone()).collect();

        (self.function)(&args)
            .map(ScopedJson::Derived)
            .map_err(|message| RenderErrorReason::Other(format!("{}: {message}", self.name)).into())
    }
}

// ================================
// Text functions
// ================================

/// Returns the first `n` Unicode code points of `s`, or `s` unchanged when it
/// is not longer than that.
pub fn truncate(s: &str, n: usize) -> String {
    match s.char_indices().nth(n) {
        Some((byte_index, _)) => s[..byte_index].to_string(),
        None => s.to_string(),
    }
}

pub fn base64_encode(s: &str) -> String {
    STANDARD.encode(s.as_bytes())
}

/// Decodes standard base64, handing back the input unchanged when it is not
/// valid base64 or does not decode to UTF-8 text. Line breaks in the input
/// are ignored.
pub fn base64_decode(s: &str) -> String {
    let unwrapped: String = s.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
    STANDARD
        .decode(unwrapped)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| s.to_string())
}

/// Formats a Unix timestamp.
///
/// `layout` is a strftime layout (`%Y-%m-%d`). A layout without any `%` is
/// read as a Go reference layout (`2006-01-02 15:04:05`) and converted first,
/// see [`strftime_layout`].
///
/// An empty `zone` formats in local time. A zone name that is not a known
/// IANA timezone also formats in local time rather than failing.
///
/// # Errors
///
/// Returns `Error::Execute` when the timestamp is out of range or the layout
/// contains an invalid specifier.
pub fn datetime(timestamp: i64, layout: &str, zone: &str) -> Result<String, Error> {
    let utc = DateTime::from_timestamp(timestamp, 0).ok_or_else(|| Error::Execute {
        message: format!("timestamp {timestamp} is out of range"),
    })?;

    let layout = strftime_layout(layout);
    match resolve_zone(zone) {
        Some(tz) => format_layout(&utc.with_timezone(&tz), &layout),
        None => format_layout(&utc.with_timezone(&Local), &layout),
    }
}

/// Reference-time tokens of Go layouts and their strftime equivalents.
///
/// Tried in order at each position, so a token must come before any token
/// that is its prefix.
const GO_LAYOUT_TOKENS: &[(&str, &str)] = &[
    ("January", "%B"),
    ("Jan", "%b"),
    ("Monday", "%A"),
    ("Mon", "%a"),
    ("MST", "%Z"),
    ("2006", "%Y"),
    ("002", "%j"),
    ("01", "%m"),
    ("02", "%d"),
    ("03", "%I"),
    ("04", "%M"),
    ("05", "%S"),
    ("06", "%y"),
    ("_2", "%e"),
    ("15", "%H"),
    ("1", "%-m"),
    ("2", "%-d"),
    ("3", "%-I"),
    ("4", "%-M"),
    ("5", "%-S"),
    ("PM", "%p"),
    ("pm", "%P"),
    ("Z07:00", "%:z"),
    ("Z0700", "%z"),
    ("-07:00", "%:z"),
    ("-0700", "%z"),
    ("-07", "%:::z"),
    (".000000000", "%.9f"),
    (".000000", "%.6f"),
    (".000", "%.3f"),
    (".999999999", "%.f"),
    (".999999", "%.f"),
    (".999", "%.f"),
];

/// Converts a Go reference layout into a strftime layout.
///
/// Layouts containing `%` are already strftime and are returned as they are.
///
/// ```rust
/// use template_engine::strftime_layout;
///
/// assert_eq!(strftime_layout("2006-01-02 15:04:05"), "%Y-%m-%d %H:%M:%S");
/// assert_eq!(strftime_layout("%d/%m/%Y"), "%d/%m/%Y");
/// ```
pub fn strftime_layout(layout: &str) -> Cow<'_, str> {
    if layout.contains('%') {
        return Cow::Borrowed(layout);
    }

    let mut out = String::with_capacity(layout.len() * 2);
    let mut rest = layout;
    'scan: while let Some(c) = rest.chars().next() {
        for &(token, specifier) in GO_LAYOUT_TOKENS {
            if let Some(remaining) = rest.strip_prefix(token) {
                out.push_str(specifier);
                rest = remaining;
                continue 'scan;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    Cow::Owned(out)
}

fn resolve_zone(zone: &str) -> Option<Tz> {
    if zone.is_empty() {
        return None;
    }

    match zone.parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(_) => {
            debug!(zone, "Unknown timezone, formatting in local time");
            None
        }
    }
}

fn format_layout<Z>(value: &DateTime<Z>, layout: &str) -> Result<String, Error>
where
    Z: TimeZone,
    Z::Offset: Display,
{
    let mut out = String::new();
    write!(out, "{}", value.format(layout)).map_err(|_| Error::Execute {
        message: format!("invalid datetime layout '{layout}'"),
    })?;
    Ok(out)
}

fn replace(s: &str, old: &str, new: &str, count: i64) -> String {
    if count < 0 {
        s.replace(old, new)
    } else {
        s.replacen(old, new, usize::try_from(count).unwrap_or(usize::MAX))
    }
}

fn split(s: &str, sep: &str) -> Vec<String> {
    if sep.is_empty() {
        return s.chars().map(String::from).collect();
    }
    s.split(sep).map(String::from).collect()
}

// ================================
// Argument handling
// ================================

fn expect_arity(args: &[Value], min: usize, max: usize) -> Result<(), String> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{min} to {max}")
        };
        return Err(format!(
            "expects {expected} arguments, got {}",
            args.len()
        ));
    }
    Ok(())
}

/// Reads an argument as text. Undefined variables arrive as null and read as
/// the empty string.
fn text_arg(args: &[Value], index: usize) -> Result<String, String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(format!("argument {} must be text, got {other}", index + 1)),
        None => Err(format!("missing argument {}", index + 1)),
    }
}

/// Reads an integer argument. Numeric strings are accepted since every
/// environment-derived variable is a string; fractions are truncated.
fn int_arg(args: &[Value], index: usize) -> Result<i64, String> {
    let invalid = || format!("argument {} must be a number", index + 1);

    match args.get(index) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(invalid),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
                .ok_or_else(invalid)
        }
        Some(_) => Err(invalid()),
        None => Err(format!("missing argument {}", index + 1)),
    }
}

fn uppercase_helper(args: &[Value]) -> Result<Value, String> {
    expect_arity(args, 1, 1)?;
    Ok(Value::String(text_arg(args, 0)?.to_uppercase()))
}

fn lowercase_helper(args: &[Value]) -> Result<Value, String> {
    expect_arity(args, 1, 1)?;
    Ok(Value::String(text_arg(args, 0)?.to_lowercase()))
}

fn replace_helper(args: &[Value]) -> Result<Value, String> {
    expect_arity(args, 3, 4)?;
    let count = if args.len() == 4 { int_arg(args, 3)? } else { -1 };
    Ok(Value::String(replace(
        &text_arg(args, 0)?,
        &text_arg(args, 1)?,
        &text_arg(args, 2)?,
        count,
    )))
}

fn split_helper(args: &[Value]) -> Result<Value, String> {
    expect_arity(args, 2, 2)?;
    Ok(Value::from(split(&text_arg(args, 0)?, &text_arg(args, 1)?)))
}

fn trim_helper(args: &[Value]) -> Result<Value, String> {
    expect_arity(args, 2, 2)?;
    let cutset = text_arg(args, 1)?;
    let s = text_arg(args, 0)?;
    Ok(Value::String(
        s.trim_matches(|c: char| cutset.contains(c)).to_string(),
    ))
}

fn trim_prefix_helper(args: &[Value]) -> Result<Value, String> {
    expect_arity(args, 2, 2)?;
    let s = text_arg(args, 0)?;
    let prefix = text_arg(args, 1)?;
    Ok(Value::String(
        s.strip_prefix(prefix.as_str()).unwrap_or(s.as_str()).to_string(),
    ))
}

fn trim_suffix_helper(args: &[Value]) -> Result<Value, String> {
    expect_arity(args, 2, 2)?;
    let s = text_arg(args, 0)?;
    let suffix = text_arg(args, 1)?;
    Ok(Value::String(
        s.strip_suffix(suffix.as_str()).unwrap_or(s.as_str()).to_string(),
    ))
}

fn to_title_helper(args: &[Value]) -> Result<Value, String> {
    expect_arity(args, 1, 1)?;
    Ok(Value::String(text_arg(args, 0)?.to_uppercase()))
}

fn datetime_helper(args: &[Value]) -> Result<Value, String> {
    expect_arity(args, 2, 3)?;
    let zone = if args.len() == 3 {
        text_arg(args, 2)?
    } else {
        String::new()
    };
    datetime(int_arg(args, 0)?, &text_arg(args, 1)?, &zone)
        .map(Value::String)
        .map_err(|e| e.to_string())
}

fn truncate_helper(args: &[Value]) -> Result<Value, String> {
    expect_arity(args, 2, 2)?;
    let length = int_arg(args, 1)?;
    let length =
        usize::try_from(length).map_err(|_| format!("length must not be negative, got {length}"))?;
    Ok(Value::String(truncate(&text_arg(args, 0)?, length)))
}

fn base64_encode_helper(args: &[Value]) -> Result<Value, String> {
    expect_arity(args, 1, 1)?;
    Ok(Value::String(base64_encode(&text_arg(args, 0)?)))
}

fn base64_decode_helper(args: &[Value]) -> Result<Value, String> {
    expect_arity(args, 1, 1)?;
    Ok(Value::String(base64_decode(&text_arg(args, 0)?)))
}
