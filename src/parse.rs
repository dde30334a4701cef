//! Rule-based decomposition of raw name strings into structured components.
//!
//! The rules run in a fixed order and each rule consumes the substrings it
//! matches, so the same input always decomposes the same way. Strings the
//! rules cannot account for are reported as `Unparseable` rather than
//! guessed at; a rule attempting to consume a component twice is a
//! `ParseError::RuleConflict` (a vocabulary/rule defect, not bad data).
//!
//! Tie-breaks chosen here (historical revisions disagreed):
//! - suffix extraction prefers the trailing comma-piece; the piece after the
//!   last name is only considered when the trailing piece did not match
//! - boundary-window prefix retries on a two-piece name are case-sensitive
//! - one-word windows are checked before two-word windows

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{NameComponents, ParseError};

// ============================================================================
// Trailing Annotation Rules
// ============================================================================

/// "Floruit" endings: ", fl. 1971", " fl. 1430-1439". Years deliberately not
/// restricted to 4 digits, to allow for source variability.
static FLORUIT_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)(,? fl\. ([0-9-]+(?:-[0-9]+)?))$").unwrap());

/// "Active dates" endings: ", 1971-", " 1698-1698", ", 1430-1439". Only year
/// granularity is recognized.
static DATES_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)(,? (([0-9-]+)-([0-9]+)?))$").unwrap());

/// Repairs "Last,First" into "Last, First" before comma-segmentation.
static COMMA_FIXUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\p{L}),(\p{L})").unwrap());

// ============================================================================
// Rule Vocabularies
// ============================================================================

/// Fixed vocabularies driving title/prefix/suffix extraction. An explicit
/// value owned by the parser so tests can substitute alternates; `_ci` lists
/// hold pre-lowercased entries matched case-insensitively, checked after the
/// case-sensitive lists.
#[derive(Clone, Debug)]
pub struct NameRules {
    pub titles: Vec<&'static str>,
    pub titles_ci: Vec<&'static str>,
    pub last_prefixes: Vec<&'static str>,
    pub last_prefixes_ci: Vec<&'static str>,
    pub suffixes: Vec<&'static str>,
    pub suffixes_ci: Vec<&'static str>,
}

impl Default for NameRules {
    fn default() -> Self {
        NameRules {
            titles: vec!["Sir"],
            titles_ci: vec![],
            last_prefixes: vec!["de", "da", "del", "van", "von", "van der", "of", "di"],
            last_prefixes_ci: vec!["de", "da", "del", "van", "von", "van der"],
            suffixes: vec![
                "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X",
                "Jr.", "Sr.", "the Elder", "the Younger", "El Viejo", "El Joven",
            ],
            suffixes_ci: vec![
                "jr.", "sr.", "the elder", "the younger", "el viejo", "el joven",
                "le père", "le fils", "père", "fils",
            ],
        }
    }
}

impl NameRules {
    pub fn is_title(&self, s: &str) -> bool {
        self.titles.contains(&s) || self.titles_ci.contains(&s.to_lowercase().as_str())
    }

    /// Case-sensitive or case-insensitive prefix match (comma-piece rule).
    pub fn is_prefix(&self, s: &str) -> bool {
        self.last_prefixes.contains(&s)
            || self.last_prefixes_ci.contains(&s.to_lowercase().as_str())
    }

    /// Case-sensitive prefix match only, used for the boundary-token windows
    /// of a two-piece name.
    pub fn is_prefix_cs(&self, s: &str) -> bool {
        self.last_prefixes.contains(&s)
    }

    pub fn is_suffix(&self, s: &str) -> bool {
        self.suffixes.contains(&s) || self.suffixes_ci.contains(&s.to_lowercase().as_str())
    }
}

// ============================================================================
// Parse Output
// ============================================================================

/// Successfully decomposed name plus the side products of rule application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedName {
    pub comps: NameComponents,
    /// Name after annotation stripping and punctuation fixup
    pub bare_name: String,
    /// Trailing annotation with leading ", " removed; empty when absent
    pub disamb: String,
    /// Source-side transposed form (first two comma fields swapped, annotation
    /// re-appended), present only when an annotation was matched
    pub alt_form: Option<String>,
    /// Extracted side facts: floruit, or dates/born/died
    pub meta: Vec<(String, String)>,
}

/// Outcome of one parse. Unparseable is an expected result (routed to the
/// failure log by callers), never an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed(ParsedName),
    Unparseable,
}

// ============================================================================
// Parser
// ============================================================================

/// The decomposition engine. Holds the rule vocabularies; all methods are
/// deterministic given the same vocabularies.
#[derive(Clone, Debug, Default)]
pub struct NameParser {
    rules: NameRules,
}

impl NameParser {
    pub fn new(rules: NameRules) -> Self {
        NameParser { rules }
    }

    pub fn rules(&self) -> &NameRules {
        &self.rules
    }

    /// Parse a by-last ("Last, First Middle") name string, with optional
    /// trailing floruit/dates annotation.
    pub fn parse(&self, raw: &str) -> Result<ParseOutcome, ParseError> {
        let mut meta: Vec<(String, String)> = Vec::new();
        let mut addl_info: Option<String> = None;

        // Rule 1/2: at most one of the trailing-annotation rules may match;
        // whichever does strips the annotation and retains it as metadata.
        let bare_raw = if let Some(m) = FLORUIT_RULE.captures(raw) {
            addl_info = Some(m[2].to_string());
            meta.push(("floruit".to_string(), m[3].to_string()));
            m[1].to_string()
        } else if let Some(m) = DATES_RULE.captures(raw) {
            addl_info = Some(m[2].to_string());
            meta.push(("dates".to_string(), m[3].to_string()));
            meta.push(("born".to_string(), m[4].to_string()));
            if let Some(died) = m.get(5) {
                meta.push(("died".to_string(), died.as_str().to_string()));
            }
            m[1].to_string()
        } else {
            raw.to_string()
        };

        // Alternate transposed form: swap the first two comma fields, omitting
        // the intervening comma, and re-append the annotation. Computed before
        // punctuation fixup so the literal source text is preserved.
        let alt_form = addl_info.as_deref().and_then(|addl| {
            let fields: Vec<&str> = bare_raw.splitn(3, ", ").collect();
            match fields.len() {
                2 => Some(format!("{} {}{}", fields[1], fields[0], addl)),
                3 => Some(format!("{} {}, {}{}", fields[1], fields[0], fields[2], addl)),
                _ => {
                    // one-part name whose annotation had no comma separator
                    if addl.starts_with(' ') {
                        Some(format!("{},{}", fields[0], addl))
                    } else {
                        None
                    }
                }
            }
        });

        // Punctuation fixup: space after letter-comma-letter, single trailing
        // comma stripped.
        let mut bare = COMMA_FIXUP.replace_all(&bare_raw, "$1, $2").to_string();
        if bare.ends_with(',') {
            bare.pop();
        }

        let comps = match self.decompose(&bare)? {
            Some(c) if c.is_synthesizable() => c,
            _ => return Ok(ParseOutcome::Unparseable),
        };

        let disamb = addl_info
            .as_deref()
            .map(|s| s.trim_start_matches([',', ' ']).to_string())
            .unwrap_or_default();

        Ok(ParseOutcome::Parsed(ParsedName {
            comps,
            bare_name: bare,
            disamb,
            alt_form,
            meta,
        }))
    }

    /// Parse a given-name-first ("First Middle Last [Suffix]") string by
    /// reordering it into by-last form and delegating to `parse`.
    pub fn parse_full_name(&self, raw: &str) -> Result<ParseOutcome, ParseError> {
        let mut held_suffix: Option<String> = None;
        let head = match raw.split_once(", ") {
            Some((h, tail)) if self.rules.is_suffix(tail.trim()) => {
                held_suffix = Some(tail.trim().to_string());
                h
            }
            // a comma whose tail is not a suffix token means the string is
            // already in by-last form
            Some(_) => return self.parse(raw),
            None => raw,
        };

        let mut tokens: Vec<&str> = head.split_whitespace().collect();
        if tokens.len() <= 1 {
            return self.parse(&self.rejoin(&tokens, held_suffix.as_deref()));
        }

        // Embedded prefix token surrounded by spaces ("Ludwig van Beethoven"):
        // insert a comma before it and let the inversion rule sort out sides.
        for i in 1..tokens.len() - 1 {
            let one = tokens[i];
            let two = if i + 2 <= tokens.len() - 1 {
                Some(format!("{} {}", tokens[i], tokens[i + 1]))
            } else {
                None
            };
            if self.rules.is_prefix_cs(one)
                || two.as_deref().map_or(false, |t| self.rules.is_prefix_cs(t))
            {
                let mut by_last =
                    format!("{}, {}", tokens[..i].join(" "), tokens[i..].join(" "));
                if let Some(sfx) = held_suffix.as_deref() {
                    by_last.push_str(", ");
                    by_last.push_str(sfx);
                }
                return self.parse(&by_last);
            }
        }

        // No embedded prefix: hold out a matched trailing suffix, then move
        // the last token to the front with a comma.
        if held_suffix.is_none() && tokens.len() >= 2 {
            let last_two = format!("{} {}", tokens[tokens.len() - 2], tokens[tokens.len() - 1]);
            if self.rules.is_suffix(&last_two) {
                held_suffix = Some(last_two);
                tokens.truncate(tokens.len() - 2);
            } else if self.rules.is_suffix(tokens[tokens.len() - 1]) {
                held_suffix = Some(tokens[tokens.len() - 1].to_string());
                tokens.truncate(tokens.len() - 1);
            }
        }
        if tokens.len() <= 1 {
            return self.parse(&self.rejoin(&tokens, held_suffix.as_deref()));
        }

        let last = tokens.pop().unwrap_or_default();
        let mut by_last = format!("{}, {}", last, tokens.join(" "));
        if let Some(sfx) = held_suffix.as_deref() {
            by_last.push_str(", ");
            by_last.push_str(sfx);
        }
        self.parse(&by_last)
    }

    fn rejoin(&self, tokens: &[&str], suffix: Option<&str>) -> String {
        let mut s = tokens.join(" ");
        if let Some(sfx) = suffix {
            s.push_str(", ");
            s.push_str(sfx);
        }
        s
    }

    /// Core decomposition of a bare (annotation-free, fixed-up) by-last name.
    /// Returns Ok(None) for the ordinary "too many pieces" failure; prior
    /// extraction is discarded in that case.
    fn decompose(&self, bare: &str) -> Result<Option<NameComponents>, ParseError> {
        let mut comps = NameComponents::default();
        let mut pieces: Vec<String> = bare.split(", ").map(str::to_string).collect();
        if pieces.iter().any(|p| p.is_empty()) {
            return Ok(None);
        }

        // Only look for a last-name prefix at 3+ pieces, to guard against the
        // case where the last name itself is a case-insensitive match
        // (e.g. "Van, Jeffrey").
        if pieces.len() >= 3 && self.rules.is_prefix(&pieces[0]) {
            comps = comps.with_last_prefix(pieces.remove(0))?;
        }

        // A name suffix can come from the end, or just after the last name.
        if pieces.len() > 1 {
            if self.rules.is_suffix(&pieces[pieces.len() - 1]) {
                let sfx = pieces.pop().unwrap_or_default();
                comps = comps.with_suffix(sfx)?;
            }
            if comps.suffix.is_none() && pieces.len() > 1 && self.rules.is_suffix(&pieces[1]) {
                comps = comps.with_suffix(pieces.remove(1))?;
            }
        }

        if pieces.len() >= 3 {
            // don't know how to parse from here; must be manually rectified
            return Ok(None);
        }

        if pieces.len() == 1 {
            let piece = pieces.remove(0);
            comps = if comps.last_prefix.is_some() {
                comps.with_last_name(piece)?
            } else {
                comps.with_first_name(piece)?
            };
            return Ok(Some(comps));
        }

        let mut last_pieces: Vec<String> =
            pieces[0].split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect();
        let mut first_pieces: Vec<String> =
            pieces[1].split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect();
        if last_pieces.is_empty() || first_pieces.is_empty() {
            return Ok(None);
        }

        // A title usually leads first_pieces but may be the entirety of it, in
        // which case one token is borrowed back from last_pieces.
        if self.rules.is_title(&first_pieces[0]) {
            comps = comps.with_title(first_pieces.remove(0))?;
            if first_pieces.is_empty() {
                if last_pieces.is_empty() {
                    return Ok(None);
                }
                first_pieces.push(last_pieces.remove(0));
            }
        }

        // Look for a last-name prefix in the leading portion of last_pieces or
        // the trailing portion of first_pieces; one and two word windows.
        if !last_pieces.is_empty() && self.rules.is_prefix_cs(&last_pieces[0]) {
            comps = comps.with_last_prefix(last_pieces.remove(0))?;
        } else if last_pieces.len() >= 2
            && self.rules.is_prefix_cs(&format!("{} {}", last_pieces[0], last_pieces[1]))
        {
            let two = format!("{} {}", last_pieces.remove(0), last_pieces.remove(0));
            comps = comps.with_last_prefix(two)?;
        }

        if !first_pieces.is_empty()
            && self.rules.is_prefix_cs(&first_pieces[first_pieces.len() - 1])
        {
            let one = first_pieces.pop().unwrap_or_default();
            comps = comps.with_last_prefix(one)?;
        } else if first_pieces.len() >= 2
            && self.rules.is_prefix_cs(&format!(
                "{} {}",
                first_pieces[first_pieces.len() - 2],
                first_pieces[first_pieces.len() - 1]
            ))
        {
            let b = first_pieces.pop().unwrap_or_default();
            let a = first_pieces.pop().unwrap_or_default();
            comps = comps.with_last_prefix(format!("{} {}", a, b))?;
        }

        // A prefix/last-name sequence preceded by a comma ("Hildegard, of
        // Bingen") reads more like a suffix representation; swap the parts and
        // parse as above.
        if !first_pieces.is_empty() && self.rules.is_prefix_cs(&first_pieces[0]) {
            std::mem::swap(&mut last_pieces, &mut first_pieces);
            comps = comps.with_last_prefix(last_pieces.remove(0))?;
        } else if first_pieces.len() >= 2
            && self.rules.is_prefix_cs(&format!("{} {}", first_pieces[0], first_pieces[1]))
        {
            std::mem::swap(&mut last_pieces, &mut first_pieces);
            let two = format!("{} {}", last_pieces.remove(0), last_pieces.remove(0));
            comps = comps.with_last_prefix(two)?;
        }

        // Cases where only one name field remains (either last or first).
        if last_pieces.is_empty() && first_pieces.is_empty() {
            return Ok(None);
        }
        if last_pieces.is_empty() {
            let joined = first_pieces.join(" ");
            comps = if comps.last_prefix.is_some() {
                comps.with_last_name(joined)?
            } else {
                comps.with_first_name(joined)?
            };
            return Ok(Some(comps));
        }
        if first_pieces.is_empty() {
            comps = comps.with_last_name(last_pieces.join(" "))?;
            return Ok(Some(comps));
        }

        // Both sides populated: first token is the first name, the remainder
        // of first_pieces (if any) the middle name, last_pieces the last name.
        if first_pieces.len() > 1 {
            comps = comps.with_first_name(first_pieces.remove(0))?;
            comps = comps.with_middle_name(first_pieces.join(" "))?;
        } else {
            comps = comps.with_first_name(first_pieces.remove(0))?;
        }
        comps = comps.with_last_name(last_pieces.join(" "))?;
        Ok(Some(comps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth;

    fn parsed(raw: &str) -> ParsedName {
        match NameParser::default().parse(raw).unwrap() {
            ParseOutcome::Parsed(p) => p,
            ParseOutcome::Unparseable => panic!("unexpected Unparseable for '{}'", raw),
        }
    }

    #[test]
    fn test_parse_by_last_basic() {
        let p = parsed("Bach, Johann Sebastian");
        assert_eq!(p.comps.first_name.as_deref(), Some("Johann"));
        assert_eq!(p.comps.middle_name.as_deref(), Some("Sebastian"));
        assert_eq!(p.comps.last_name.as_deref(), Some("Bach"));
        assert_eq!(synth::full_name(&p.comps), "Johann Sebastian Bach");
        assert_eq!(p.disamb, "");
        assert!(p.meta.is_empty());
    }

    #[test]
    fn test_parse_trailing_dates() {
        let p = parsed("Fauré, Gabriel, 1845-1924");
        assert_eq!(p.bare_name, "Fauré, Gabriel");
        assert_eq!(p.comps.first_name.as_deref(), Some("Gabriel"));
        assert_eq!(p.comps.last_name.as_deref(), Some("Fauré"));
        assert_eq!(p.disamb, "1845-1924");
        assert!(p.meta.contains(&("dates".to_string(), "1845-1924".to_string())));
        assert!(p.meta.contains(&("born".to_string(), "1845".to_string())));
        assert!(p.meta.contains(&("died".to_string(), "1924".to_string())));
        assert_eq!(p.alt_form.as_deref(), Some("Gabriel Fauré, 1845-1924"));
    }

    #[test]
    fn test_parse_trailing_dates_open_ended() {
        let p = parsed("Glass, Philip, 1937-");
        assert_eq!(p.disamb, "1937-");
        assert!(p.meta.contains(&("born".to_string(), "1937".to_string())));
        assert!(!p.meta.iter().any(|(k, _)| k == "died"));
    }

    #[test]
    fn test_parse_floruit() {
        let p = parsed("Dunstable, John, fl. 1430-1439");
        assert_eq!(p.bare_name, "Dunstable, John");
        assert_eq!(p.disamb, "fl. 1430-1439");
        assert_eq!(p.meta, vec![("floruit".to_string(), "1430-1439".to_string())]);
        assert_eq!(p.alt_form.as_deref(), Some("John Dunstable, fl. 1430-1439"));
    }

    #[test]
    fn test_parse_floruit_no_comma() {
        // one-part name whose annotation had no comma separator
        let p = parsed("Machaut fl. 1350");
        assert_eq!(p.bare_name, "Machaut");
        assert_eq!(p.disamb, "fl. 1350");
        assert_eq!(p.alt_form.as_deref(), Some("Machaut, fl. 1350"));
        assert_eq!(p.comps.first_name.as_deref(), Some("Machaut"));
    }

    #[test]
    fn test_parse_boundary_prefix_two_pieces() {
        // prefix rule on a 2-piece split is not applied at the comma level;
        // the boundary window inside the two-piece case captures it
        let p = parsed("van Beethoven, Ludwig");
        assert_eq!(p.comps.last_prefix.as_deref(), Some("van"));
        assert_eq!(p.comps.last_name.as_deref(), Some("Beethoven"));
        assert_eq!(p.comps.first_name.as_deref(), Some("Ludwig"));
        assert_eq!(synth::full_name(&p.comps), "Ludwig van Beethoven");
    }

    #[test]
    fn test_parse_prefix_inversion() {
        let p = parsed("Hildegard, of Bingen");
        assert_eq!(p.comps.first_name.as_deref(), Some("Hildegard"));
        assert_eq!(p.comps.last_prefix.as_deref(), Some("of"));
        assert_eq!(p.comps.last_name.as_deref(), Some("Bingen"));
    }

    #[test]
    fn test_parse_one_word_window_before_two_word() {
        // "van" matches the one-word window, so "der" stays with the last name
        let p = parsed("van der Meer, Jan");
        assert_eq!(p.comps.last_prefix.as_deref(), Some("van"));
        assert_eq!(p.comps.last_name.as_deref(), Some("der Meer"));
        assert_eq!(p.comps.first_name.as_deref(), Some("Jan"));
    }

    #[test]
    fn test_parse_two_word_prefix() {
        // "der" alone is not a prefix token, so the two-word window applies
        let p = parsed("Meer, Jan van der");
        assert_eq!(p.comps.last_prefix.as_deref(), Some("van der"));
        assert_eq!(p.comps.last_name.as_deref(), Some("Meer"));
        assert_eq!(p.comps.first_name.as_deref(), Some("Jan"));
    }

    #[test]
    fn test_parse_suffix_trailing() {
        let p = parsed("Strauss, Johann, II");
        assert_eq!(p.comps.suffix.as_deref(), Some("II"));
        assert_eq!(synth::full_name(&p.comps), "Johann Strauss, II");
    }

    #[test]
    fn test_parse_suffix_after_last_name() {
        let p = parsed("Couperin, le père, François");
        assert_eq!(p.comps.suffix.as_deref(), Some("le père"));
        assert_eq!(p.comps.last_name.as_deref(), Some("Couperin"));
        assert_eq!(p.comps.first_name.as_deref(), Some("François"));
    }

    #[test]
    fn test_parse_title() {
        let p = parsed("Elgar, Sir Edward");
        assert_eq!(p.comps.title.as_deref(), Some("Sir"));
        assert_eq!(p.comps.first_name.as_deref(), Some("Edward"));
        assert_eq!(p.comps.last_name.as_deref(), Some("Elgar"));
        assert_eq!(synth::full_name(&p.comps), "Sir Edward Elgar");
    }

    #[test]
    fn test_parse_title_borrow_back() {
        // title is the entirety of first_pieces: one token borrowed back
        let p = parsed("King, Sir");
        assert_eq!(p.comps.title.as_deref(), Some("Sir"));
        assert_eq!(p.comps.first_name.as_deref(), Some("King"));
        assert_eq!(p.comps.last_name, None);
    }

    #[test]
    fn test_parse_single_piece() {
        let p = parsed("Hildegard");
        assert_eq!(p.comps.first_name.as_deref(), Some("Hildegard"));
        assert_eq!(p.comps.last_name, None);
    }

    #[test]
    fn test_parse_comma_fixup() {
        let p = parsed("Bach,Johann Sebastian");
        assert_eq!(p.bare_name, "Bach, Johann Sebastian");
        assert_eq!(p.comps.last_name.as_deref(), Some("Bach"));
    }

    #[test]
    fn test_parse_trailing_comma_stripped() {
        let p = parsed("Bach, Johann,");
        assert_eq!(p.bare_name, "Bach, Johann");
    }

    #[test]
    fn test_parse_unparseable_three_pieces() {
        let parser = NameParser::default();
        let out = parser.parse("One, Two, Three, Four").unwrap();
        assert_eq!(out, ParseOutcome::Unparseable);
    }

    #[test]
    fn test_parse_ci_prefix_requires_three_pieces() {
        // "Van, Jeffrey" must not read "Van" as a prefix
        let p = parsed("Van, Jeffrey");
        assert_eq!(p.comps.last_prefix, None);
        assert_eq!(p.comps.last_name.as_deref(), Some("Van"));
        assert_eq!(p.comps.first_name.as_deref(), Some("Jeffrey"));
    }

    #[test]
    fn test_parse_deterministic() {
        let parser = NameParser::default();
        let a = parser.parse("Fauré, Gabriel, 1845-1924").unwrap();
        let b = parser.parse("Fauré, Gabriel, 1845-1924").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rule_conflict_on_double_prefix() {
        // both boundary windows match a prefix: a rule-table defect, not a
        // normal failure
        let parser = NameParser::default();
        let err = parser.parse("von Berg, Anna von").unwrap_err();
        assert!(matches!(err, ParseError::RuleConflict { component: "last_prefix", .. }));
    }

    #[test]
    fn test_parse_full_name_reorder() {
        let parser = NameParser::default();
        let out = parser.parse_full_name("Johann Sebastian Bach").unwrap();
        let ParseOutcome::Parsed(p) = out else { panic!("unparseable") };
        assert_eq!(p.comps.first_name.as_deref(), Some("Johann"));
        assert_eq!(p.comps.middle_name.as_deref(), Some("Sebastian"));
        assert_eq!(p.comps.last_name.as_deref(), Some("Bach"));
    }

    #[test]
    fn test_parse_full_name_embedded_prefix() {
        let parser = NameParser::default();
        let out = parser.parse_full_name("Ludwig van Beethoven").unwrap();
        let ParseOutcome::Parsed(p) = out else { panic!("unparseable") };
        assert_eq!(p.comps.last_prefix.as_deref(), Some("van"));
        assert_eq!(p.comps.last_name.as_deref(), Some("Beethoven"));
        assert_eq!(p.comps.first_name.as_deref(), Some("Ludwig"));
    }

    #[test]
    fn test_parse_full_name_with_suffix() {
        let parser = NameParser::default();
        let out = parser.parse_full_name("Martin Luther King, Jr.").unwrap();
        let ParseOutcome::Parsed(p) = out else { panic!("unparseable") };
        assert_eq!(p.comps.suffix.as_deref(), Some("Jr."));
        assert_eq!(p.comps.last_name.as_deref(), Some("King"));
        assert_eq!(p.comps.first_name.as_deref(), Some("Martin"));
        assert_eq!(p.comps.middle_name.as_deref(), Some("Luther"));
    }

    #[test]
    fn test_parse_full_name_already_by_last() {
        let parser = NameParser::default();
        let out = parser.parse_full_name("Bach, Johann Sebastian").unwrap();
        let ParseOutcome::Parsed(p) = out else { panic!("unparseable") };
        assert_eq!(p.comps.last_name.as_deref(), Some("Bach"));
    }

    #[test]
    fn test_synthesis_reparse_stable() {
        // full_name(parse(raw)) reparsed must synthesize the same full name
        let parser = NameParser::default();
        for raw in [
            "Bach, Johann Sebastian",
            "van Beethoven, Ludwig",
            "Elgar, Sir Edward",
            "Strauss, Johann, II",
            "Hildegard, of Bingen",
        ] {
            let ParseOutcome::Parsed(p) = parser.parse(raw).unwrap() else {
                panic!("unparseable: {}", raw)
            };
            let full = synth::full_name(&p.comps);
            let ParseOutcome::Parsed(p2) = parser.parse_full_name(&full).unwrap() else {
                panic!("reparse unparseable: {}", full)
            };
            assert_eq!(synth::full_name(&p2.comps), full, "unstable for '{}'", raw);
        }
    }

    #[test]
    fn test_substitute_vocabulary() {
        let rules = NameRules {
            titles: vec!["Dr."],
            ..NameRules::default()
        };
        let parser = NameParser::new(rules);
        let ParseOutcome::Parsed(p) = parser.parse("Who, Dr. Jane").unwrap() else {
            panic!("unparseable")
        };
        assert_eq!(p.comps.title.as_deref(), Some("Dr."));
        assert_eq!(p.comps.first_name.as_deref(), Some("Jane"));
    }
}
