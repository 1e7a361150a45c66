use lazy_regex::regex;

/// Decorative box-drawing glyphs the target program uses for tree output.
/// Both the heavy and light variants of vertical bar, branch and corner.
const TREE_GLYPHS: &[char] = &['┃', '┣', '┗', '│', '├', '└'];

/// Canonicalizes captured program output for comparison.
///
/// Strips ANSI escape sequences, replaces tree-drawing glyphs with a space,
/// right-trims every line and trims the whole string. Two outputs are
/// considered equal iff their normalized forms are byte-identical.
pub fn normalize(raw: &str) -> String {
    let s = strip_ansi_escapes(raw);
    let s = s.replace(|c| TREE_GLYPHS.contains(&c), " ");
    s.split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

/// Removes well-formed ANSI/terminal escape sequences.
/// Byte sequences starting with ESC that don't match are left untouched.
pub fn strip_ansi_escapes(raw: &str) -> String {
    let re = regex!(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])");
    re.replace_all(raw, "").into_owned()
}
