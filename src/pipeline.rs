//! Segment-processing pipeline: fetched source documents in, resolved
//! registry rows and per-segment counts out.
//!
//! Segments are processed strictly in order within one connection; a hard
//! error (ambiguous registry state, rule-table defect, malformed segment)
//! aborts the remainder of the run so a partial load is never silently
//! papered over. Replays are idempotent by construction.

use anyhow::{bail, Context, Result};
use log::info;
use serde_json::Value;

use crate::models::{LoadCtx, ResolveOutcome, Role, SegmentCounts};
use crate::parse::{NameParser, ParseOutcome};
use crate::progress::create_progress_bar;
use crate::resolve::Resolver;
use crate::source::SourceOps;
use crate::synth;

/// One fetched source document plus its provenance.
#[derive(Clone, Debug)]
pub struct Segment {
    pub ctx: LoadCtx,
    pub doc: Value,
}

/// Map an entity category to the role flag it promotes.
pub fn role_for_category(category: &str) -> Option<Role> {
    match category {
        "composer" => Some(Role::Composer),
        "conductor" => Some(Role::Conductor),
        "performer" => Some(Role::Performer),
        _ => None,
    }
}

/// Resolve every entry of every segment, in order. Returns per-segment
/// counts keyed by segment file.
pub fn load_category(
    resolver: &Resolver,
    ops: &dyn SourceOps,
    category: &str,
    segments: &[Segment],
) -> Result<Vec<(String, SegmentCounts)>> {
    let role = role_for_category(category)
        .with_context(|| format!("unknown category '{}'", category))?;
    if !ops.categories().contains(&category) {
        bail!("source '{}' does not publish category '{}'", ops.name(), category);
    }
    let link_key = format!("{}_link", ops.name());

    let mut results = Vec::with_capacity(segments.len());
    for segment in segments {
        let entries = ops
            .extract_entries(&segment.doc)
            .with_context(|| format!("extracting entries from {}", segment.ctx.file))?;

        let pb = create_progress_bar(entries.len() as u64, &segment.ctx.file);
        let mut counts = SegmentCounts::default();
        for entry in &entries {
            let extra_meta: Vec<(String, String)> = entry
                .link
                .iter()
                .map(|l| (link_key.clone(), l.clone()))
                .collect();
            let res = resolver
                .resolve(&entry.name, role, &segment.ctx, &extra_meta)
                .with_context(|| {
                    format!("resolving '{}' from {}", entry.name, segment.ctx.file)
                })?;
            match res.outcome {
                ResolveOutcome::Created => counts.inserted += 1,
                ResolveOutcome::Matched | ResolveOutcome::Conflicted => counts.updated += 1,
                ResolveOutcome::Unparseable => counts.skipped += 1,
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        info!(
            "{}: {} inserted, {} updated, {} skipped",
            segment.ctx.file, counts.inserted, counts.updated, counts.skipped
        );
        results.push((segment.ctx.file.clone(), counts));
    }
    Ok(results)
}

/// Parse-only pass over the segments: print what each entry would resolve
/// to. Takes no registry at all, so a dry run cannot touch one.
pub fn dryrun_category(
    parser: &NameParser,
    ops: &dyn SourceOps,
    category: &str,
    segments: &[Segment],
) -> Result<Vec<(String, SegmentCounts)>> {
    if role_for_category(category).is_none() {
        bail!("unknown category '{}'", category);
    }
    let mut results = Vec::with_capacity(segments.len());
    for segment in segments {
        let entries = ops
            .extract_entries(&segment.doc)
            .with_context(|| format!("extracting entries from {}", segment.ctx.file))?;
        let mut counts = SegmentCounts::default();
        for entry in &entries {
            match parser.parse(&entry.name)? {
                ParseOutcome::Parsed(p) => {
                    println!("{} => {}", entry.name, synth::full_name(&p.comps));
                    counts.inserted += 1;
                }
                ParseOutcome::Unparseable => {
                    println!("{} => ?", entry.name);
                    counts.skipped += 1;
                }
            }
        }
        results.push((segment.ctx.file.clone(), counts));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IssueKind;
    use crate::parse::NameParser;
    use crate::source::source_ops;
    use crate::store::Store;
    use serde_json::json;

    fn setup() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.create_schema(false).unwrap();
        store
    }

    fn segment(file: &str, doc: Value) -> Segment {
        Segment {
            ctx: LoadCtx {
                file: file.into(),
                source: "imslp".into(),
                source_date: "2026-08-01".into(),
            },
            doc,
        }
    }

    fn sample_segments() -> Vec<Segment> {
        vec![
            segment(
                "composer:b.json",
                json!([
                    {"name": "Bach, Johann Sebastian", "link": "/composer/bach"},
                    {"name": "Beethoven, Ludwig van"},
                ]),
            ),
            segment(
                "composer:f.json",
                json!([
                    {"name": "Fauré, Gabriel, 1845-1924", "link": "/composer/faure"},
                    {"name": "One, Two, Three, Four"},
                ]),
            ),
        ]
    }

    #[test]
    fn test_load_category_counts() {
        let store = setup();
        let resolver = Resolver::new(&store, NameParser::default());
        let ops = source_ops("imslp").unwrap();

        let results = load_category(&resolver, ops, "composer", &sample_segments()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "composer:b.json");
        assert_eq!(results[0].1, SegmentCounts { inserted: 2, updated: 0, skipped: 0 });
        assert_eq!(results[1].1, SegmentCounts { inserted: 1, updated: 0, skipped: 1 });

        assert_eq!(store.person_count().unwrap(), 3);
        assert_eq!(store.list_issues(IssueKind::Failure, None).unwrap().len(), 1);

        // source link recorded as a meta fact
        let p = store.find_by_name_str("Bach, Johann Sebastian", "imslp").unwrap().unwrap();
        assert!(p.id.is_some());
        assert!(store.person_meta_count().unwrap() >= 1);
    }

    #[test]
    fn test_load_category_replay_idempotent() {
        let store = setup();
        let resolver = Resolver::new(&store, NameParser::default());
        let ops = source_ops("imslp").unwrap();
        let segments = sample_segments();

        load_category(&resolver, ops, "composer", &segments).unwrap();
        let persons = store.person_count().unwrap();
        let names = store.person_name_count().unwrap();
        let facts = store.person_meta_count().unwrap();

        let results = load_category(&resolver, ops, "composer", &segments).unwrap();
        // parseable entries now match, unparseable ones are skipped again
        assert_eq!(results[0].1, SegmentCounts { inserted: 0, updated: 2, skipped: 0 });
        assert_eq!(results[1].1, SegmentCounts { inserted: 0, updated: 1, skipped: 1 });
        assert_eq!(store.person_count().unwrap(), persons);
        assert_eq!(store.person_name_count().unwrap(), names);
        assert_eq!(store.person_meta_count().unwrap(), facts);
        // the unparseable entry is re-logged on each pass
        assert_eq!(store.list_issues(IssueKind::Failure, None).unwrap().len(), 2);
    }

    #[test]
    fn test_load_category_rejects_bad_category() {
        let store = setup();
        let resolver = Resolver::new(&store, NameParser::default());
        let ops = source_ops("imslp").unwrap();
        assert!(load_category(&resolver, ops, "arranger", &[]).is_err());
        // imslp publishes composers only
        assert!(load_category(&resolver, ops, "conductor", &[]).is_err());
    }

    #[test]
    fn test_load_category_malformed_segment_aborts() {
        let store = setup();
        let resolver = Resolver::new(&store, NameParser::default());
        let ops = source_ops("imslp").unwrap();
        let segments = vec![segment("composer:x.json", json!({"rows": []}))];
        let err = load_category(&resolver, ops, "composer", &segments).unwrap_err();
        assert!(format!("{:#}", err).contains("composer:x.json"));
    }

    #[test]
    fn test_dryrun_needs_no_registry() {
        let parser = NameParser::default();
        let ops = source_ops("imslp").unwrap();
        let results = dryrun_category(&parser, ops, "composer", &sample_segments()).unwrap();
        assert_eq!(results[0].1, SegmentCounts { inserted: 2, updated: 0, skipped: 0 });
        assert_eq!(results[1].1.skipped, 1);
    }

    #[test]
    fn test_role_for_category() {
        assert_eq!(role_for_category("composer"), Some(Role::Composer));
        assert_eq!(role_for_category("conductor"), Some(Role::Conductor));
        assert_eq!(role_for_category("performer"), Some(Role::Performer));
        assert_eq!(role_for_category("label"), None);
    }
}
