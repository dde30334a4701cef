//! Core data models for the name-resolution registry.
//!
//! This module contains the name-component value type and its builder, the
//! persisted entity rows, and the enums shared across parser, resolver, and
//! store.

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Parse Errors
// ============================================================================

/// Internal consistency violation inside the parser: a rule tried to assign a
/// name component that an earlier rule already consumed. This is a rule-table
/// defect, not a normal "can't parse this string" outcome, and aborts the
/// enclosing segment rather than landing in the failure log.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("rule conflict: component '{component}' already set, refusing to overwrite with '{value}'")]
    RuleConflict { component: &'static str, value: String },
}

// ============================================================================
// Name Components
// ============================================================================

/// Structured person-name components produced by a single parse.
///
/// Immutable by convention: rules extend a value via the `with_*` builders,
/// which return a fresh value and refuse to overwrite an already-set
/// component. A value is only synthesizable (usable as a Person) when at
/// least one of first_name/last_name is present.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NameComponents {
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_prefix: Option<String>,
    pub last_name: Option<String>,
    pub suffix: Option<String>,
}

macro_rules! with_comp {
    ($fn_name:ident, $field:ident) => {
        pub fn $fn_name(mut self, value: impl Into<String>) -> Result<Self, ParseError> {
            let value = value.into();
            if self.$field.is_some() {
                return Err(ParseError::RuleConflict {
                    component: stringify!($field),
                    value,
                });
            }
            self.$field = Some(value);
            Ok(self)
        }
    };
}

impl NameComponents {
    with_comp!(with_title, title);
    with_comp!(with_first_name, first_name);
    with_comp!(with_middle_name, middle_name);
    with_comp!(with_last_prefix, last_prefix);
    with_comp!(with_last_name, last_name);
    with_comp!(with_suffix, suffix);

    /// At least one of first/last name is required to synthesize a name.
    pub fn is_synthesizable(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some()
    }
}

// ============================================================================
// Persisted Entities
// ============================================================================

/// A person row. Identity key is (name, disamb); `name` defaults to the
/// synthesized full name and `disamb` to the trailing annotation text (e.g.
/// "fl. 1430-1439" or a birth-death range), empty when absent.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Person {
    pub id: Option<i64>,
    pub name: String,
    pub disamb: String,
    pub alt_name: Option<String>,

    pub comps: NameComponents,

    // denormalized role flags
    pub is_composer: bool,
    pub is_conductor: bool,
    pub is_performer: bool,

    // canonical record is assumed to be normalized and authoritative;
    // cnl_person_id points to the record this one is an alias of
    pub is_canonical: bool,
    pub cnl_person_id: Option<i64>,

    // reference info
    pub tags: Vec<String>,
    pub notes: Vec<String>,
    pub born: Option<String>,
    pub died: Option<String>,
    pub country: Option<String>,
    pub epoch: Option<String>,
    pub source: Option<String>,
    pub source_date: Option<String>,
}

/// Role flag promoted on a matched or created person.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Composer,
    Conductor,
    Performer,
}

/// Tag recorded on a name-variant row, identifying where the string came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameType {
    /// Literal string as received from the source
    Raw,
    /// Raw string after punctuation fixup and annotation stripping
    Fixed,
    /// Source-side transposed form (first two comma fields swapped)
    AltRaw,
    /// Synthesized full name
    Canonical,
    /// Synthesized last-name-first full name
    CanonicalAlt,
    /// Synthesized short form (no middle name)
    Short,
    /// Synthesized variant form (no first name)
    Variant,
}

impl NameType {
    pub fn as_str(self) -> &'static str {
        match self {
            NameType::Raw => "raw",
            NameType::Fixed => "fixed",
            NameType::AltRaw => "alt_raw",
            NameType::Canonical => "canonical",
            NameType::CanonicalAlt => "canonical_alt",
            NameType::Short => "short",
            NameType::Variant => "variant",
        }
    }
}

// ============================================================================
// Conflict / Failure Bookkeeping
// ============================================================================

/// Operation during which a conflict or failure was recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityOp {
    Parse,
    Find,
    Insert,
    Update,
}

impl EntityOp {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityOp::Parse => "parse",
            EntityOp::Find => "find",
            EntityOp::Insert => "insert",
            EntityOp::Update => "update",
        }
    }
}

/// Triage status of a conflict/failure row. Only a human process moves a row
/// out of Open; the resolution logic never reads these back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueStatus {
    Open,
    InProcess,
    Resolved,
    Withdrawn,
}

impl IssueStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Open => "open",
            IssueStatus::InProcess => "in_process",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(IssueStatus::Open),
            "in_process" => Some(IssueStatus::InProcess),
            "resolved" => Some(IssueStatus::Resolved),
            "withdrawn" => Some(IssueStatus::Withdrawn),
            _ => None,
        }
    }
}

/// Which append-only diagnostic log a row lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueKind {
    /// Uniqueness collision on insert
    Conflict,
    /// Unparseable input
    Failure,
}

impl IssueKind {
    pub fn table(self) -> &'static str {
        match self {
            IssueKind::Conflict => "conflicts",
            IssueKind::Failure => "failures",
        }
    }
}

/// One row of the conflict or failure log, read back for triage listing only.
#[derive(Clone, Debug, Serialize)]
pub struct IssueRecord {
    pub id: i64,
    pub entity_name: String,
    pub entity_str: String,
    pub entity_info: serde_json::Value,
    pub operation: String,
    pub status: String,
    pub parent_id: Option<i64>,
    pub created_at: String,
}

// ============================================================================
// Load Context & Counts
// ============================================================================

/// Provenance for everything written while processing one segment.
#[derive(Clone, Debug, Serialize)]
pub struct LoadCtx {
    /// Segment file (or other locator) the data came from
    pub file: String,
    /// Refdata source name (lookup-table key)
    pub source: String,
    /// Datestamp of the data
    pub source_date: String,
}

/// Per-segment record counts reported back to the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SegmentCounts {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl SegmentCounts {
    pub fn merge(&mut self, other: SegmentCounts) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
    }
}

// ============================================================================
// Resolution Outcome
// ============================================================================

/// What the resolver did with one raw name string. Expected outcomes are
/// variants here, never errors; only invariant violations and collaborator
/// failures surface as `Err`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// An existing person matched (exact or normalized lookup)
    Matched,
    /// A new person row was created
    Created,
    /// Insert collided with an existing (name, disamb) key; fell back to it
    Conflicted,
    /// The parser could not decompose the string; a failure row was recorded
    Unparseable,
}

/// Result of a single `Resolver::resolve` call.
#[derive(Clone, Debug)]
pub struct Resolution {
    pub person: Option<Person>,
    pub outcome: ResolveOutcome,
    /// Name-variant rows actually inserted (duplicates skipped silently)
    pub new_variants: usize,
    /// Meta fact rows actually inserted
    pub new_facts: usize,
}
