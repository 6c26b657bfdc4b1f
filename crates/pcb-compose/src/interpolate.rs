//! Environment variable substitution in compose documents.
//!
//! Supported forms: `$$`, `$NAME`, `${NAME}`, `${NAME:-default}`,
//! `${NAME-default}`, `${NAME:?message}` and `${NAME?message}`. Only
//! values are substituted, never mapping keys.

use std::collections::BTreeMap;
use std::ffi::OsString;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till, take_till1, take_while, take_while1},
    character::complete::char,
    combinator::{map, not, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
};
use pcb_common::error::{PcbError, Result};
use serde_yaml::{Mapping, Value};

/// Variables available for substitution.
pub type Environment = BTreeMap<String, String>;

/// Snapshot of the current process environment.
///
/// Variables whose name or value is not valid UTF-8 are left out.
pub fn process_environment() -> Environment {
    environment_from(std::env::vars_os())
}

/// Builds an environment from raw pairs, skipping non-UTF-8 entries.
pub fn environment_from<I>(vars: I) -> Environment
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (key, _) => {
                tracing::debug!(
                    variable = %key.unwrap_or_else(|raw| raw.to_string_lossy().into_owned()),
                    "skipping environment variable that is not valid UTF-8"
                );
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    /// `:-`
    DefaultIfEmpty,
    /// `-`
    DefaultIfUnset,
    /// `:?`
    RequireNonEmpty,
    /// `?`
    RequireSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Var {
        name: &'a str,
        modifier: Option<(Modifier, &'a str)>,
    },
}

const fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

const fn is_name_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn name(input: &str) -> IResult<&str, &str> {
    recognize(pair(take_while1(is_name_start), take_while(is_name_continue))).parse(input)
}

fn modifier(input: &str) -> IResult<&str, Modifier> {
    alt((
        value(Modifier::DefaultIfEmpty, tag(":-")),
        value(Modifier::RequireNonEmpty, tag(":?")),
        value(Modifier::DefaultIfUnset, tag("-")),
        value(Modifier::RequireSet, tag("?")),
    ))
    .parse(input)
}

fn literal(input: &str) -> IResult<&str, Segment<'_>> {
    map(take_till1(|c| c == '$'), Segment::Literal).parse(input)
}

fn escaped_dollar(input: &str) -> IResult<&str, Segment<'_>> {
    value(Segment::Literal("$"), tag("$$")).parse(input)
}

fn braced(input: &str) -> IResult<&str, Segment<'_>> {
    let (input, (name, modifier)) = delimited(
        tag("${"),
        pair(name, opt(pair(modifier, take_till(|c| c == '}')))),
        char('}'),
    )
    .parse(input)?;
    Ok((input, Segment::Var { name, modifier }))
}

fn bare(input: &str) -> IResult<&str, Segment<'_>> {
    map(preceded(char('$'), name), |name| Segment::Var {
        name,
        modifier: None,
    })
    .parse(input)
}

/// A `$` that starts no substitution is kept as is; `${` must be closed.
fn lone_dollar(input: &str) -> IResult<&str, Segment<'_>> {
    value(Segment::Literal("$"), terminated(char('$'), not(char('{')))).parse(input)
}

fn segments(input: &str) -> IResult<&str, Vec<Segment<'_>>> {
    many0(alt((literal, escaped_dollar, braced, bare, lone_dollar))).parse(input)
}

/// Substitutes variables from `env` into `input`.
///
/// # Errors
///
/// Returns [`PcbError::Config`] on an unterminated `${` or when a required
/// variable (`:?`, `?`) is missing.
pub fn interpolate_str(input: &str, env: &Environment) -> Result<String> {
    let (rest, parts) = segments(input).map_err(|e| {
        PcbError::config(format!("invalid interpolation format in {input:?}: {e}"))
    })?;
    if !rest.is_empty() {
        return Err(PcbError::config(format!(
            "invalid interpolation format in {input:?} at {rest:?}"
        )));
    }

    let mut out = String::with_capacity(input.len());
    for part in parts {
        match part {
            Segment::Literal(text) => out.push_str(text),
            Segment::Var { name, modifier } => out.push_str(&resolve(name, modifier, env)?),
        }
    }
    Ok(out)
}

fn resolve(name: &str, modifier: Option<(Modifier, &str)>, env: &Environment) -> Result<String> {
    let current = env.get(name).map(String::as_str);
    let resolved = match (modifier, current) {
        (None, value) => value.unwrap_or_else(|| {
            tracing::debug!(variable = name, "variable is not set, substituting an empty string");
            ""
        }),
        (Some((Modifier::DefaultIfEmpty, default)), None | Some("")) => default,
        (Some((Modifier::DefaultIfUnset, default)), None) => default,
        (Some((Modifier::RequireNonEmpty, message)), None | Some("")) => {
            return Err(PcbError::config(format!(
                "required variable {name} is missing a value: {message}"
            )));
        }
        (Some((Modifier::RequireSet, message)), None) => {
            return Err(PcbError::config(format!(
                "required variable {name} is not set: {message}"
            )));
        }
        (Some(_), Some(value)) => value,
    };
    Ok(resolved.to_owned())
}

/// Substitutes variables in every string value of `value`, recursively.
///
/// # Errors
///
/// Propagates the first substitution failure.
pub fn interpolate_value(value: &mut Value, env: &Environment) -> Result<()> {
    match value {
        Value::String(text) => *text = interpolate_str(text, env)?,
        Value::Sequence(items) => {
            for item in items {
                interpolate_value(item, env)?;
            }
        }
        Value::Mapping(mapping) => {
            for (_, item) in mapping.iter_mut() {
                interpolate_value(item, env)?;
            }
        }
        Value::Tagged(tagged) => interpolate_value(&mut tagged.value, env)?,
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}

/// Substitutes variables in a whole compose document.
///
/// Each service additionally sees its own `environment` entries (already
/// substituted against `env`) while its values are processed.
///
/// # Errors
///
/// Propagates the first substitution failure.
pub fn interpolate_document(document: &mut Mapping, env: &Environment) -> Result<()> {
    for (key, item) in document.iter_mut() {
        if key.as_str() != Some("services") {
            interpolate_value(item, env)?;
            continue;
        }
        let Value::Mapping(services) = item else {
            interpolate_value(item, env)?;
            continue;
        };
        for (_, service) in services.iter_mut() {
            let scoped = service_environment(service, env)?;
            interpolate_value(service, &scoped)?;
        }
    }
    Ok(())
}

fn service_environment(service: &Value, env: &Environment) -> Result<Environment> {
    let mut scoped = env.clone();
    let Some(Value::Mapping(vars)) = service.get("environment") else {
        return Ok(scoped);
    };
    for (key, val) in vars {
        let Some(key) = key.as_str() else { continue };
        let text = match val {
            Value::String(s) => interpolate_str(s, env)?,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        let _ = scoped.insert(key.to_owned(), text);
    }
    Ok(scoped)
}
