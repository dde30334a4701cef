//! Entity resolution: raw name string in, registry person out.
//!
//! Lookup order is exact literal match, then normalized match, then parse and
//! create. Every step that touches an existing person promotes the requested
//! role flag; every newly created or matched person accrues the full set of
//! synthesized name variants so future lookups hit earlier in the chain.

use log::{debug, warn};
use rustc_hash::FxHashSet;
use serde_json::json;
use thiserror::Error;

use crate::models::{
    EntityOp, IssueKind, LoadCtx, NameType, ParseError, Person, Resolution, ResolveOutcome, Role,
};
use crate::normalize::norm;
use crate::parse::{NameParser, ParseOutcome, ParsedName};
use crate::store::{Store, StoreError};
use crate::synth;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Normalized lookup returned more than one person. The registry itself
    /// is ambiguous; nothing sensible can be written until a human merges or
    /// disambiguates, so the whole segment aborts.
    #[error("ambiguous normalized match for '{name_str}': {count} persons")]
    AmbiguousMatch { name_str: String, count: usize },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub struct Resolver<'a> {
    store: &'a Store,
    parser: NameParser,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a Store, parser: NameParser) -> Self {
        Resolver { store, parser }
    }

    pub fn store(&self) -> &Store {
        self.store
    }

    pub fn parser(&self) -> &NameParser {
        &self.parser
    }

    /// Resolve one raw by-last name string against the registry, creating a
    /// person if necessary. `extra_meta` facts (e.g. a source link) are
    /// recorded against whichever person the string resolves to.
    pub fn resolve(
        &self,
        raw: &str,
        role: Role,
        ctx: &LoadCtx,
        extra_meta: &[(String, String)],
    ) -> Result<Resolution, ResolveError> {
        // Exact literal hit: the string has been seen before from this source.
        if let Some(person) = self.store.find_by_name_str(raw, &ctx.source)? {
            debug!("exact match '{}' -> person {:?}", raw, person.id);
            return self.finish_matched(person, raw, None, role, ctx, extra_meta, "exact");
        }

        // Normalized hit: a diacritic/case variant of a known string.
        let hits = self.store.find_by_name_norm(&norm(raw), &ctx.source)?;
        if hits.len() > 1 {
            return Err(ResolveError::AmbiguousMatch {
                name_str: raw.to_string(),
                count: hits.len(),
            });
        }
        if let Some(person) = hits.into_iter().next() {
            debug!("normalized match '{}' -> person {:?}", raw, person.id);
            return self.finish_matched(person, raw, None, role, ctx, extra_meta, "norm_match");
        }

        // Miss: decompose and create.
        let parsed = match self.parser.parse(raw)? {
            ParseOutcome::Parsed(p) => p,
            ParseOutcome::Unparseable => {
                warn!("unparseable name '{}' from {}", raw, ctx.file);
                self.store.record_issue(
                    IssueKind::Failure,
                    "person",
                    raw,
                    &json!({
                        "source": ctx.source,
                        "file": ctx.file,
                        "source_date": ctx.source_date,
                        "reason": "could not parse",
                    }),
                    EntityOp::Parse,
                )?;
                return Ok(Resolution {
                    person: None,
                    outcome: ResolveOutcome::Unparseable,
                    new_variants: 0,
                    new_facts: 0,
                });
            }
        };

        let person = self.build_person(&parsed, role, ctx);
        match self.store.insert_person(&person) {
            Ok(id) => {
                debug!("created person {} for '{}'", id, raw);
                let mut person = person;
                person.id = Some(id);
                let (new_variants, new_facts) =
                    self.record_sides(id, raw, Some(&parsed), ctx, extra_meta, "create")?;
                Ok(Resolution {
                    person: Some(person),
                    outcome: ResolveOutcome::Created,
                    new_variants,
                    new_facts,
                })
            }
            Err(StoreError::UniqueViolation) => {
                // Same synthesized key reached by a different raw string.
                // Log it for triage and attach to the existing person.
                warn!(
                    "duplicate person key ('{}', '{}') for '{}'",
                    person.name, person.disamb, raw
                );
                self.store.record_issue(
                    IssueKind::Conflict,
                    "person",
                    raw,
                    &json!({
                        "person": serde_json::to_value(&person)?,
                        "source": ctx.source,
                        "file": ctx.file,
                        "source_date": ctx.source_date,
                        "reason": "duplicate",
                    }),
                    EntityOp::Insert,
                )?;
                let existing = self.store.person_by_key(&person.name, &person.disamb)?;
                self.finish_matched(
                    existing,
                    raw,
                    Some(&parsed),
                    role,
                    ctx,
                    extra_meta,
                    "conflict_fallback",
                )
                .map(|mut res| {
                    res.outcome = ResolveOutcome::Conflicted;
                    res
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn finish_matched(
        &self,
        person: Person,
        raw: &str,
        parsed: Option<&ParsedName>,
        role: Role,
        ctx: &LoadCtx,
        extra_meta: &[(String, String)],
        person_res: &str,
    ) -> Result<Resolution, ResolveError> {
        let id = person.id.ok_or(StoreError::NotFound)?;
        let role_set = match role {
            Role::Composer => person.is_composer,
            Role::Conductor => person.is_conductor,
            Role::Performer => person.is_performer,
        };
        if !role_set {
            self.store.set_role_flag(id, role)?;
        }
        let (new_variants, new_facts) =
            self.record_sides(id, raw, parsed, ctx, extra_meta, person_res)?;
        Ok(Resolution {
            person: Some(person),
            outcome: ResolveOutcome::Matched,
            new_variants,
            new_facts,
        })
    }

    fn build_person(&self, parsed: &ParsedName, role: Role, ctx: &LoadCtx) -> Person {
        let name = synth::full_name(&parsed.comps);
        let alt = synth::alt_full_name(&parsed.comps);
        Person {
            id: None,
            name: name.clone(),
            disamb: parsed.disamb.clone(),
            alt_name: (alt != name).then_some(alt),
            comps: parsed.comps.clone(),
            is_composer: role == Role::Composer,
            is_conductor: role == Role::Conductor,
            is_performer: role == Role::Performer,
            is_canonical: false,
            cnl_person_id: None,
            tags: Vec::new(),
            notes: Vec::new(),
            born: parsed.meta.iter().find(|(k, _)| k == "born").map(|(_, v)| v.clone()),
            died: parsed.meta.iter().find(|(k, _)| k == "died").map(|(_, v)| v.clone()),
            country: None,
            epoch: None,
            source: Some(ctx.source.clone()),
            source_date: Some(ctx.source_date.clone()),
        }
    }

    /// Record name variants and meta facts against a resolved person.
    /// Duplicates (same string and source already present) are skipped
    /// silently; the counts report only genuinely new rows.
    fn record_sides(
        &self,
        person_id: i64,
        raw: &str,
        parsed: Option<&ParsedName>,
        ctx: &LoadCtx,
        extra_meta: &[(String, String)],
        person_res: &str,
    ) -> Result<(usize, usize), ResolveError> {
        let mut variants: Vec<(String, NameType)> = vec![(raw.to_string(), NameType::Raw)];
        if let Some(p) = parsed {
            if p.bare_name != raw {
                variants.push((p.bare_name.clone(), NameType::Fixed));
            }
            if let Some(alt) = &p.alt_form {
                variants.push((alt.clone(), NameType::AltRaw));
            }
            variants.push((synth::full_name(&p.comps), NameType::Canonical));
            variants.push((synth::alt_full_name(&p.comps), NameType::CanonicalAlt));
            if let Some(s) = synth::short_name(&p.comps) {
                variants.push((s, NameType::Short));
            }
            if let Some(v) = synth::var_name(&p.comps) {
                variants.push((v, NameType::Variant));
            }
        }

        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut new_variants = 0;
        for (name_str, name_type) in variants {
            if !seen.insert(name_str.clone()) {
                continue;
            }
            if self
                .store
                .insert_person_name(person_id, &name_str, name_type, ctx, person_res)?
            {
                new_variants += 1;
            }
        }

        let mut new_facts = 0;
        let parsed_meta = parsed.map(|p| p.meta.as_slice()).unwrap_or_default();
        for (key, value) in parsed_meta.iter().chain(extra_meta.iter()) {
            if self.store.insert_person_meta(person_id, key, value, ctx)? {
                new_facts += 1;
            }
        }
        Ok((new_variants, new_facts))
    }
}
