// Shared prompt fragments.
// Each module that calls the model keeps its own prompts.rs alongside it;
// only cross-cutting pieces live here.

/// Fills `{placeholder}` slots in a template. Unknown placeholders are left as-is.
///
/// Single pass over the template: substituted values are never scanned again,
/// so placeholder text inside a CV or job description stays literal.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let slot = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (*value, close))
        });

        match slot {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
