//! Job-id templates.
//!
//! A job id is a string like `2024-01-01_acme_full`. A template such as
//! `{date}_{client_id}_{type}` describes how to parse one into named
//! fields and how to format fields back into the canonical string.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::StolosError;

/// Parsed job-id fields, ordered by field name for deterministic
/// formatting and equality.
pub type ParsedJobId = BTreeMap<String, String>;

/// Reserved field name that, when present in a template, is filled from
/// the dependency group a job id was produced under rather than from the
/// job id string itself.
pub const DEPENDENCY_GROUP_FIELD: &str = "dependency_group_name";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A compiled `{field}_{field}` style template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobIdTemplate {
    raw: String,
    segments: Vec<Segment>,
    fields: Vec<String>,
}

impl JobIdTemplate {
    /// Compiles a template string. Field names are the contents of each
    /// `{...}` placeholder; everything else is literal text that must
    /// appear verbatim in a matching job id.
    pub fn compile(template: &str) -> Result<Self, StolosError> {
        let mut segments = Vec::new();
        let mut fields = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after_open = &rest[open + 1..];
            let close = after_open.find('}').ok_or_else(|| {
                StolosError::DagMisconfigured(format!(
                    "unterminated field placeholder in template {template:?}"
                ))
            })?;
            let field = after_open[..close].to_string();
            if field.is_empty() {
                return Err(StolosError::DagMisconfigured(format!(
                    "empty field placeholder in template {template:?}"
                )));
            }
            fields.push(field.clone());
            segments.push(Segment::Field(field));
            rest = &after_open[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Ok(Self {
            raw: template.to_string(),
            segments,
            fields,
        })
    }

    /// The field names declared by this template, in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Parses a job id against this template, binding every field and
    /// consuming the entire input. Fails with `InvalidJobId` on any
    /// mismatch, including a partial match that leaves trailing text.
    pub fn parse(&self, job_id: &str) -> Result<ParsedJobId, StolosError> {
        let mut fields = ParsedJobId::new();
        let mut rest = job_id;
        let mut iter = self.segments.iter().peekable();
        while let Some(segment) = iter.next() {
            match segment {
                Segment::Literal(lit) => {
                    rest = rest.strip_prefix(lit.as_str()).ok_or_else(|| invalid(self, job_id))?;
                }
                Segment::Field(name) => {
                    let value = match iter.peek() {
                        Some(Segment::Literal(next_lit)) => {
                            let idx = rest.find(next_lit.as_str()).ok_or_else(|| invalid(self, job_id))?;
                            let (value, remainder) = rest.split_at(idx);
                            rest = remainder;
                            value
                        }
                        Some(Segment::Field(_)) => {
                            return Err(StolosError::DagMisconfigured(format!(
                                "template {:?} has two adjacent fields with no literal separator",
                                self.raw
                            )));
                        }
                        None => {
                            let value = rest;
                            rest = "";
                            value
                        }
                    };
                    if value.is_empty() {
                        return Err(invalid(self, job_id));
                    }
                    fields.insert(name.clone(), value.to_string());
                }
            }
        }
        if !rest.is_empty() {
            return Err(invalid(self, job_id));
        }
        Ok(fields)
    }

    /// Formats a job id from parsed fields. `dependency_group_name` is
    /// only consulted when this template declares that reserved field.
    pub fn format(
        &self,
        fields: &ParsedJobId,
        dependency_group_name: Option<&str>,
    ) -> Result<String, StolosError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Field(name) => {
                    if name == DEPENDENCY_GROUP_FIELD {
                        let value = dependency_group_name.ok_or_else(|| {
                            StolosError::InvalidJobId {
                                app: String::new(),
                                job_id: self.raw.clone(),
                                reason: format!(
                                    "template requires {DEPENDENCY_GROUP_FIELD} but none was given"
                                ),
                            }
                        })?;
                        out.push_str(value);
                    } else {
                        let value = fields.get(name).ok_or_else(|| StolosError::InvalidJobId {
                            app: String::new(),
                            job_id: self.raw.clone(),
                            reason: format!("missing field {name:?} while formatting"),
                        })?;
                        out.push_str(value);
                    }
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for JobIdTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn invalid(template: &JobIdTemplate, job_id: &str) -> StolosError {
    StolosError::InvalidJobId {
        app: String::new(),
        job_id: job_id.to_string(),
        reason: format!("does not match template {:?}", template.raw),
    }
}
