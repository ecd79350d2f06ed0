//! Canonical form for manifests.
//!
//! Everything is converted to minified JSON. That keeps stored state small
//! and makes desired/observed comparisons immune to formatting differences,
//! which matters once multi-line strings are involved. YAML is a superset of
//! JSON, so either input dialect is accepted.
//!
//! Plain scalars resolve with YAML 1.1 rules, the dialect kubectl itself
//! reads and writes: `yes`/`on` are booleans, `0755` is octal and `1.0` is
//! the integer `1`. Quoted scalars are always strings. Only the first
//! document of a stream is used.
//!
//! JSON objects are built on `serde_json::Map`, an ordered map, so keys
//! always come out sorted and the output is a pure function of the input.

use crate::error::{Error, Result};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use yaml_rust2::parser::{Event, EventReceiver, Parser};
use yaml_rust2::scanner::TScalarStyle;

/// Convert a YAML or JSON document to its canonical minified JSON form.
pub fn canonicalize(input: &str) -> Result<String> {
    let value = parse_document(input)?;
    serde_json::to_string(&value).map_err(|e| Error::Parse {
        message: e.to_string(),
    })
}

/// Canonicalize, falling back to the input unchanged on any error.
///
/// Used when saving configuration so a malformed document never blocks the
/// save; kubectl rejects it loudly once it is actually applied.
pub fn attempt_canonicalize(input: &str) -> String {
    match canonicalize(input) {
        Ok(canonical) => canonical,
        Err(e) => {
            log::debug!("keeping manifest as written: {e}");
            input.to_string()
        }
    }
}

/// Parse the first document of a YAML stream into JSON. Empty input is `null`.
pub(crate) fn parse_document(input: &str) -> Result<Value> {
    let mut loader = Loader::default();
    Parser::new_from_str(input).load(&mut loader, false)?;
    if let Some(err) = loader.error {
        return Err(err);
    }
    Ok(loader.document.unwrap_or(Value::Null))
}

enum Node {
    Sequence {
        anchor: usize,
        items: Vec<Value>,
    },
    Mapping {
        anchor: usize,
        object: Map<String, Value>,
        key: Option<String>,
    },
}

/// Builds JSON straight from parser events, so scalar style is still known
/// when a plain scalar is resolved.
#[derive(Default)]
struct Loader {
    stack: Vec<Node>,
    anchors: HashMap<usize, Value>,
    document: Option<Value>,
    error: Option<Error>,
}

impl EventReceiver for Loader {
    fn on_event(&mut self, event: Event) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.handle(event) {
            self.error = Some(err);
        }
    }
}

impl Loader {
    fn handle(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Scalar(text, style, anchor, tag) => {
                let forced_string = tag.as_ref().is_some_and(|tag| tag.suffix == "str");
                let value = if matches!(style, TScalarStyle::Plain) && !forced_string {
                    resolve_plain(&text)?
                } else {
                    Value::String(text)
                };
                self.complete(anchor, value)
            }
            Event::SequenceStart(anchor, ..) => {
                self.stack.push(Node::Sequence {
                    anchor,
                    items: Vec::new(),
                });
                Ok(())
            }
            Event::MappingStart(anchor, ..) => {
                self.stack.push(Node::Mapping {
                    anchor,
                    object: Map::new(),
                    key: None,
                });
                Ok(())
            }
            Event::SequenceEnd | Event::MappingEnd => {
                let (anchor, value) = match self.stack.pop() {
                    Some(Node::Sequence { anchor, items }) => (anchor, Value::Array(items)),
                    Some(Node::Mapping { anchor, object, .. }) => (anchor, Value::Object(object)),
                    None => return Err(parse_error("unbalanced end of collection")),
                };
                self.complete(anchor, value)
            }
            Event::Alias(anchor) => {
                let value = self
                    .anchors
                    .get(&anchor)
                    .cloned()
                    .ok_or_else(|| parse_error("alias to an unknown anchor"))?;
                self.complete(0, value)
            }
            _ => Ok(()),
        }
    }

    /// Attach a finished node to its parent, or make it the document.
    fn complete(&mut self, anchor: usize, value: Value) -> Result<()> {
        if anchor > 0 {
            self.anchors.insert(anchor, value.clone());
        }
        match self.stack.last_mut() {
            None => {
                self.document.get_or_insert(value);
            }
            Some(Node::Sequence { items, .. }) => items.push(value),
            Some(Node::Mapping { object, key, .. }) => match key.take() {
                None => *key = Some(key_string(value)?),
                Some(name) => {
                    object.insert(name, value);
                }
            },
        }
        Ok(())
    }
}

fn parse_error(message: impl Into<String>) -> Error {
    Error::Parse {
        message: message.into(),
    }
}

/// Resolve an unquoted scalar the way a YAML 1.1 loader does.
fn resolve_plain(text: &str) -> Result<Value> {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return Ok(Value::Null),
        "y" | "Y" | "yes" | "Yes" | "YES" | "true" | "True" | "TRUE" | "on" | "On" | "ON" => {
            return Ok(Value::Bool(true));
        }
        "n" | "N" | "no" | "No" | "NO" | "false" | "False" | "FALSE" | "off" | "Off" | "OFF" => {
            return Ok(Value::Bool(false));
        }
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" | "-.inf" | "-.Inf" | "-.INF"
        | ".nan" | ".NaN" | ".NAN" => {
            return Err(parse_error(format!(
                "number {text} cannot be represented in JSON"
            )));
        }
        _ => {}
    }

    if !text.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.')) {
        return Ok(Value::String(text.to_string()));
    }

    let plain = text.replace('_', "");
    if let Some(n) = parse_int(&plain) {
        return Ok(Value::Number(n));
    }
    if is_float(&plain) {
        if let Ok(f) = plain.parse::<f64>() {
            return Ok(Value::Number(float(f)?));
        }
    }
    Ok(Value::String(text.to_string()))
}

/// Integer with an optional sign and `0x`, `0o`, `0b` or leading-zero
/// octal prefix.
fn parse_int(plain: &str) -> Option<Number> {
    let (negative, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, plain.strip_prefix('+').unwrap_or(plain)),
    };

    let prefixed = |lower: &str, upper: &str| {
        unsigned
            .strip_prefix(lower)
            .or_else(|| unsigned.strip_prefix(upper))
    };
    let (radix, digits) = if let Some(rest) = prefixed("0x", "0X") {
        (16, rest)
    } else if let Some(rest) = prefixed("0o", "0O") {
        (8, rest)
    } else if let Some(rest) = prefixed("0b", "0B") {
        (2, rest)
    } else if unsigned.len() > 1 && unsigned.starts_with('0') {
        (8, &unsigned[1..])
    } else {
        (10, unsigned)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = u64::from_str_radix(digits, radix).ok()?;
    if negative {
        0i64.checked_sub_unsigned(magnitude).map(Number::from)
    } else {
        Some(Number::from(magnitude))
    }
}

/// Matches `[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?`.
fn is_float(plain: &str) -> bool {
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let unsigned = plain.strip_prefix(['-', '+']).unwrap_or(plain);

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(at) => (&unsigned[..at], Some(&unsigned[at + 1..])),
        None => (unsigned, None),
    };
    let mantissa_ok = match mantissa.split_once('.') {
        Some((int, frac)) => digits(int) && digits(frac) && !(int.is_empty() && frac.is_empty()),
        None => !mantissa.is_empty() && digits(mantissa),
    };
    let exponent_ok = exponent.is_none_or(|exp| {
        let exp = exp.strip_prefix(['-', '+']).unwrap_or(exp);
        !exp.is_empty() && digits(exp)
    });
    mantissa_ok && exponent_ok
}

/// Integral values are emitted as integers so `1.0` and `1` agree.
fn float(f: f64) -> Result<Number> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    if f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f) {
        #[allow(clippy::cast_possible_truncation)]
        return Ok(Number::from(f as i64));
    }
    Number::from_f64(f)
        .ok_or_else(|| parse_error(format!("number {f} cannot be represented in JSON")))
}

fn key_string(key: Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        other => Err(parse_error(format!("unsupported mapping key: {other}"))),
    }
}
