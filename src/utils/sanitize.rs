//! Identifier sanitizing for emitted source.
//!
//! Callers often hand us fully qualified or path-like names
//! (`mesh.cells`, `kernels/flux#2`). The emitted code needs a short,
//! literal-safe identifier, so path separators and comment markers are
//! stripped and only the last dotted segment is kept.

/// Characters that may never appear in an emitted identifier or literal.
const DISALLOWED: [char; 2] = ['/', '#'];

/// Make `name` safe to embed as an identifier or string literal.
///
/// Empty input is returned unchanged.
pub fn sanitize(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let stripped: String = name.chars().filter(|c| !DISALLOWED.contains(c)).collect();
    match stripped.rsplit('.').next() {
        Some(last) => last.to_string(),
        None => stripped,
    }
}

/// [`sanitize`] lifted over optional names.
pub fn sanitize_opt(name: Option<&str>) -> Option<String> {
    name.map(sanitize)
}
