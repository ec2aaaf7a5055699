//! Filename sanitation.

/// Longest filename we will produce, in characters.
const MAX_FILENAME_CHARS: usize = 150;

/// Sanitizes a candidate filename:
///
/// - each of `< > : " / \ | ? *` becomes `_`
/// - control characters (code points below 0x20) are removed
/// - leading/trailing whitespace and trailing dots are stripped
/// - an empty result becomes `"download"`
/// - names longer than 150 characters keep their extension and lose the
///   tail of the stem
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') {
            out.push('_');
        } else if (c as u32) < 0x20 {
            // dropped
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim().trim_end_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        return super::DEFAULT_FILENAME.to_string();
    }

    if trimmed.chars().count() > MAX_FILENAME_CHARS {
        truncate_keeping_extension(trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Cuts the stem so `stem + extension` fits in `MAX_FILENAME_CHARS` chars.
fn truncate_keeping_extension(name: &str) -> String {
    let (stem, ext) = split_extension(name);
    let ext_chars = ext.chars().count();
    let keep = MAX_FILENAME_CHARS.saturating_sub(ext_chars);
    let mut out: String = stem.chars().take(keep).collect();
    out.push_str(ext);
    out
}

/// Splits at the last dot; a leading dot (hidden file) is part of the stem.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => name.split_at(pos),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_reserved_characters() {
        assert_eq!(sanitize_filename("a<b>c:d\"e.txt"), "a_b_c_d_e.txt");
        assert_eq!(sanitize_filename("path/to\\file|x?.bin"), "path_to_file_x_.bin");
    }

    #[test]
    fn strips_control_characters() {
        assert_eq!(sanitize_filename("fi\x00le\x1f.txt"), "file.txt");
    }

    #[test]
    fn trims_whitespace_and_trailing_dots() {
        assert_eq!(sanitize_filename("  notes.txt. . "), "notes.txt");
    }

    #[test]
    fn empty_becomes_download() {
        assert_eq!(sanitize_filename(""), "download");
        assert_eq!(sanitize_filename(" ... "), "download");
        assert_eq!(sanitize_filename("\x01\x02"), "download");
    }

    #[test]
    fn long_names_keep_their_extension() {
        let name = format!("{}.tar.gz", "x".repeat(200));
        let out = sanitize_filename(&name);
        assert_eq!(out.chars().count(), 150);
        assert!(out.ends_with(".gz"));
    }

    #[test]
    fn long_name_without_extension_is_cut() {
        let out = sanitize_filename(&"y".repeat(300));
        assert_eq!(out.chars().count(), 150);
    }

    #[test]
    fn hidden_files_are_not_treated_as_extension_only() {
        let (stem, ext) = split_extension(".bashrc");
        assert_eq!(stem, ".bashrc");
        assert_eq!(ext, "");
    }
}
