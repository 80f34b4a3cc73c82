/// Characters that must not end up in a generated path segment.
pub const PATH_HOSTILE_CHARS: &[char] = &['/', '\\', '.', ' ', ':', '\t', '+', '$', '\'', '"'];

/// Replace every path-hostile character with `_`.
///
/// The substitution is character for character, so the result has the same
/// number of characters as the input.
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| if PATH_HOSTILE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}
