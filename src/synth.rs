//! Deterministic synthesis of display names from parsed components.
//!
//! All functions here are pure: the same components always produce the same
//! strings, and nothing is mutated. The synthesized forms are used both as
//! the default `name`/`alt_name` of a newly created person and as additional
//! searchable name-variant strings.

use crate::models::NameComponents;

/// Join present components with single spaces, appending a comma to the
/// second-to-last component when a suffix is present ("Johann Bach, Jr.").
fn join_direct(mut parts: Vec<String>, has_suffix: bool) -> String {
    if has_suffix && parts.len() > 1 {
        let idx = parts.len() - 2;
        parts[idx].push(',');
    }
    parts.join(" ")
}

/// Join an alt (last-name-first) ordering, placing the comma after the last
/// name, or after the suffix when one follows it ("Bach, Johann" /
/// "Bach Jr., Johann").
fn join_alt(mut parts: Vec<String>, has_last: bool, has_suffix: bool) -> String {
    if has_last && parts.len() > 1 {
        if !has_suffix {
            parts[0].push(',');
        } else if parts.len() > 2 {
            parts[1].push(',');
        }
    }
    parts.join(" ")
}

fn collect(fields: &[&Option<String>]) -> Vec<String> {
    fields.iter().filter_map(|f| (*f).clone()).collect()
}

/// Full name: title, first, middle, last-prefix, last, suffix.
pub fn full_name(c: &NameComponents) -> String {
    let parts = collect(&[
        &c.title, &c.first_name, &c.middle_name, &c.last_prefix, &c.last_name, &c.suffix,
    ]);
    join_direct(parts, c.suffix.is_some())
}

/// Short(er) name, omitting the middle name. Absent if there is no first name.
pub fn short_name(c: &NameComponents) -> Option<String> {
    c.first_name.as_ref()?;
    let parts = collect(&[&c.title, &c.first_name, &c.last_prefix, &c.last_name, &c.suffix]);
    Some(join_direct(parts, c.suffix.is_some()))
}

/// Variant short(er) name, omitting the first name. Absent if there is no
/// middle name.
pub fn var_name(c: &NameComponents) -> Option<String> {
    c.middle_name.as_ref()?;
    let parts = collect(&[&c.title, &c.middle_name, &c.last_prefix, &c.last_name, &c.suffix]);
    Some(join_direct(parts, c.suffix.is_some()))
}

/// Alternate full name, leading with the last name.
pub fn alt_full_name(c: &NameComponents) -> String {
    let parts = collect(&[
        &c.last_name, &c.suffix, &c.title, &c.first_name, &c.middle_name, &c.last_prefix,
    ]);
    join_alt(parts, c.last_name.is_some(), c.suffix.is_some())
}

/// Alternate short name, omitting the middle name. Absent without a first name.
pub fn alt_short_name(c: &NameComponents) -> Option<String> {
    c.first_name.as_ref()?;
    let parts = collect(&[&c.last_name, &c.suffix, &c.title, &c.first_name, &c.last_prefix]);
    Some(join_alt(parts, c.last_name.is_some(), c.suffix.is_some()))
}

/// Alternate variant name, omitting the first name. Absent without a middle
/// name.
pub fn alt_var_name(c: &NameComponents) -> Option<String> {
    c.middle_name.as_ref()?;
    let parts = collect(&[&c.last_name, &c.suffix, &c.title, &c.middle_name, &c.last_prefix]);
    Some(join_alt(parts, c.last_name.is_some(), c.suffix.is_some()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NameComponents;

    fn comps(
        title: Option<&str>,
        first: Option<&str>,
        middle: Option<&str>,
        prefix: Option<&str>,
        last: Option<&str>,
        suffix: Option<&str>,
    ) -> NameComponents {
        NameComponents {
            title: title.map(String::from),
            first_name: first.map(String::from),
            middle_name: middle.map(String::from),
            last_prefix: prefix.map(String::from),
            last_name: last.map(String::from),
            suffix: suffix.map(String::from),
        }
    }

    #[test]
    fn test_full_name_basic() {
        let c = comps(None, Some("Johann"), Some("Sebastian"), None, Some("Bach"), None);
        assert_eq!(full_name(&c), "Johann Sebastian Bach");
    }

    #[test]
    fn test_full_name_with_prefix_and_suffix() {
        let c = comps(None, Some("Johann"), None, None, Some("Strauss"), Some("II"));
        assert_eq!(full_name(&c), "Johann Strauss, II");

        let c = comps(None, Some("Ludwig"), None, Some("van"), Some("Beethoven"), None);
        assert_eq!(full_name(&c), "Ludwig van Beethoven");
    }

    #[test]
    fn test_short_and_variant_names() {
        let c = comps(None, Some("Johann"), Some("Sebastian"), None, Some("Bach"), None);
        assert_eq!(short_name(&c).as_deref(), Some("Johann Bach"));
        assert_eq!(var_name(&c).as_deref(), Some("Sebastian Bach"));

        // no middle name: no variant form
        let c = comps(None, Some("Gabriel"), None, None, Some("Fauré"), None);
        assert_eq!(var_name(&c), None);

        // no first name: no short form
        let c = comps(None, None, None, Some("of"), Some("Bingen"), None);
        assert_eq!(short_name(&c), None);
    }

    #[test]
    fn test_alt_full_name() {
        let c = comps(None, Some("Johann"), Some("Sebastian"), None, Some("Bach"), None);
        assert_eq!(alt_full_name(&c), "Bach, Johann Sebastian");

        let c = comps(None, Some("Ludwig"), None, Some("van"), Some("Beethoven"), None);
        assert_eq!(alt_full_name(&c), "Beethoven, Ludwig van");

        let c = comps(None, Some("Johann"), None, None, Some("Strauss"), Some("II"));
        assert_eq!(alt_full_name(&c), "Strauss II, Johann");
    }

    #[test]
    fn test_alt_name_single_component() {
        // single-name person: no comma anywhere
        let c = comps(None, Some("Hildegard"), None, None, None, None);
        assert_eq!(alt_full_name(&c), "Hildegard");
    }

    #[test]
    fn test_synthesis_idempotent() {
        let c = comps(Some("Sir"), Some("Edward"), None, None, Some("Elgar"), None);
        assert_eq!(full_name(&c), full_name(&c));
        assert_eq!(alt_full_name(&c), "Elgar, Sir Edward");
    }
}
