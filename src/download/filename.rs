//! File name sanitation and collision avoidance.

/// Characters that are not allowed in a file name on at least one platform.
const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Turn an arbitrary remote name into a single safe path component.
///
/// Reserved and control characters become `_`, surrounding whitespace and
/// trailing dots are removed. When nothing usable is left the name falls back
/// to `payload_<id>.bin`.
///
/// ```rust
/// use haul::download::sanitize_filename;
///
/// assert_eq!(sanitize_filename("a/b?.mkv", "1"), "a_b_.mkv");
/// assert_eq!(sanitize_filename("...", "42"), "payload_42.bin");
/// ```
pub fn sanitize_filename(raw: &str, id: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_control() || RESERVED.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = cleaned.trim().trim_end_matches(['.', ' ']);

    if trimmed.is_empty() {
        format!("payload_{}.bin", id)
    } else {
        trimmed.to_string()
    }
}

/// Return `name`, or the first `stem (n).ext` variant for which `taken` is false.
///
/// ```rust
/// use haul::download::unique_name;
///
/// let taken = ["a.mp4", "a (1).mp4"];
/// assert_eq!(unique_name("a.mp4", |n| taken.contains(&n)), "a (2).mp4");
/// assert_eq!(unique_name("b.mp4", |n| taken.contains(&n)), "b.mp4");
/// ```
pub fn unique_name(name: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(name) {
        return name.to_string();
    }

    let (stem, ext) = match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    };

    (1u64..)
        .map(|n| format!("{} ({}){}", stem, n, ext))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| name.to_string())
}
