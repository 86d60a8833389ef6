//! `@oxy:` directive parsing.
//!
//! Annotations live in comment lines and are consumed entirely before the
//! GPU-facing compiler sees the source. Each line is independent; there is
//! no cross-line state. Errors always carry the 1-based source line number.

use thiserror::Error;

use crate::registry::{AddressSpace, BindingRole, ProviderIdentity, StructRegistry};

/// The literal marker that introduces a directive.
pub const MARKER: &str = "@oxy:";

/// Directive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    /// `include <key>`: substitute a registered struct's WGSL source.
    Include,
    /// `group <g> <b> <space> <var> <type>`: synthesize a binding
    /// declaration and record it for resource wiring.
    BindingGroup,
    /// `provider <g> <b> <identity> [<role>]`: record a binding owned by an
    /// external provider; the hand-written declaration below stays as-is.
    Provider,
}

/// One parsed directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    /// Validated argument tokens, excluding group/binding indices.
    pub args: Vec<String>,
    /// 1-based source line.
    pub line: usize,
    pub group: Option<u32>,
    pub binding: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    #[error("line {line}: unknown annotation type `{keyword}`")]
    UnknownKind { line: usize, keyword: String },
    #[error("line {line}: `{keyword}` expects {expected} argument(s), got {got}")]
    ArgCount {
        line: usize,
        keyword: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("line {line}: invalid {what} index `{token}`")]
    BadIndex {
        line: usize,
        what: &'static str,
        token: String,
    },
    #[error("line {line}: unknown struct type `{key}`")]
    UnknownStructType { line: usize, key: String },
    #[error("line {line}: unknown address space `{token}`")]
    UnknownAddressSpace { line: usize, token: String },
    #[error("line {line}: unknown provider `{token}`")]
    UnknownProvider { line: usize, token: String },
    #[error("line {line}: unknown binding role `{token}`")]
    UnknownBindingRole { line: usize, token: String },
    #[error("line {line}: missing annotation keyword after `@oxy:`")]
    MissingKeyword { line: usize },
}

/// Parse one source line. `Ok(None)` when the line carries no marker.
pub fn parse_line(
    text: &str,
    line: usize,
    registry: &StructRegistry,
) -> Result<Option<Annotation>, AnnotationError> {
    let trimmed = text.trim();
    let Some(at) = trimmed.find(MARKER) else {
        return Ok(None);
    };
    let mut tokens = trimmed[at + MARKER.len()..].split_whitespace();
    let Some(keyword) = tokens.next() else {
        return Err(AnnotationError::MissingKeyword { line });
    };
    let args: Vec<&str> = tokens.collect();

    match keyword {
        "include" => parse_include(&args, line, registry),
        "group" => parse_group(&args, line, registry),
        "provider" => parse_provider(&args, line),
        other => Err(AnnotationError::UnknownKind {
            line,
            keyword: other.to_string(),
        }),
    }
    .map(Some)
}

fn parse_include(
    args: &[&str],
    line: usize,
    registry: &StructRegistry,
) -> Result<Annotation, AnnotationError> {
    if args.len() != 1 {
        return Err(AnnotationError::ArgCount {
            line,
            keyword: "include",
            expected: "1",
            got: args.len(),
        });
    }
    let key = args[0];
    if !registry.contains(key) {
        return Err(AnnotationError::UnknownStructType {
            line,
            key: key.to_string(),
        });
    }
    Ok(Annotation {
        kind: AnnotationKind::Include,
        args: vec![key.to_string()],
        line,
        group: None,
        binding: None,
    })
}

fn parse_group(
    args: &[&str],
    line: usize,
    registry: &StructRegistry,
) -> Result<Annotation, AnnotationError> {
    if args.len() != 5 {
        return Err(AnnotationError::ArgCount {
            line,
            keyword: "group",
            expected: "5",
            got: args.len(),
        });
    }
    let group = parse_index(args[0], "group", line)?;
    let binding = parse_index(args[1], "binding", line)?;
    let space = args[2];
    if AddressSpace::from_token(space).is_none() {
        return Err(AnnotationError::UnknownAddressSpace {
            line,
            token: space.to_string(),
        });
    }
    let var_name = args[3];
    let type_key = args[4];

    // `array<inner>` requires a registered element; a bare type must itself
    // be registered.
    let checked = type_key
        .strip_prefix("array<")
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(type_key);
    if !registry.contains(checked) {
        return Err(AnnotationError::UnknownStructType {
            line,
            key: checked.to_string(),
        });
    }

    Ok(Annotation {
        kind: AnnotationKind::BindingGroup,
        args: vec![space.to_string(), var_name.to_string(), type_key.to_string()],
        line,
        group: Some(group),
        binding: Some(binding),
    })
}

fn parse_provider(args: &[&str], line: usize) -> Result<Annotation, AnnotationError> {
    if args.len() != 3 && args.len() != 4 {
        return Err(AnnotationError::ArgCount {
            line,
            keyword: "provider",
            expected: "3 or 4",
            got: args.len(),
        });
    }
    let group = parse_index(args[0], "group", line)?;
    let binding = parse_index(args[1], "binding", line)?;
    let identity = args[2];
    if ProviderIdentity::from_token(identity).is_none() {
        return Err(AnnotationError::UnknownProvider {
            line,
            token: identity.to_string(),
        });
    }
    let mut out_args = vec![identity.to_string()];
    if let Some(role) = args.get(3) {
        if BindingRole::from_token(role).is_none() {
            return Err(AnnotationError::UnknownBindingRole {
                line,
                token: role.to_string(),
            });
        }
        out_args.push(role.to_string());
    }
    Ok(Annotation {
        kind: AnnotationKind::Provider,
        args: out_args,
        line,
        group: Some(group),
        binding: Some(binding),
    })
}

fn parse_index(token: &str, what: &'static str, line: usize) -> Result<u32, AnnotationError> {
    token.parse().map_err(|_| AnnotationError::BadIndex {
        line,
        what,
        token: token.to_string(),
    })
}
