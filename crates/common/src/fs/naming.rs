//! Name rules: accepted leaf names and the ` copy <n>` duplicate scheme.

use std::sync::LazyLock;

use regex::Regex;

static COPY_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" copy \d+").unwrap());

/// A leaf name must be exactly one path component.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Remove every ` copy <n>` occurrence so duplicates of duplicates do not
/// accumulate suffixes.
pub fn strip_copy_suffix(name: &str) -> String {
    COPY_SUFFIX.replace_all(name, "").into_owned()
}

/// `<base> copy <n>[.<ext>]`. Directories and dotfiles without a stem keep
/// their whole name as the base.
pub fn copy_name(name: &str, n: u64, is_dir: bool) -> String {
    let split = if is_dir {
        None
    } else {
        name.rsplit_once('.').filter(|(base, _)| !base.is_empty())
    };
    match split {
        Some((base, ext)) => format!("{base} copy {n}.{ext}"),
        None => format!("{name} copy {n}"),
    }
}

/// First free copy name, probing `n = 1, 2, ...` with `taken`.
pub fn next_copy_name(name: &str, is_dir: bool, taken: impl Fn(&str) -> bool) -> String {
    let base = strip_copy_suffix(name);
    let mut n = 1;
    loop {
        let candidate = copy_name(&base, n, is_dir);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("report.txt"));
        assert!(is_valid_name(".hidden"));
        assert!(is_valid_name("with space"));
        for bad in ["", ".", "..", "a/b", "a\\b", "nul\0"] {
            assert!(!is_valid_name(bad), "{bad:?} accepted");
        }
    }

    #[test]
    fn test_copy_name() {
        assert_eq!(copy_name("a.txt", 1, false), "a copy 1.txt");
        assert_eq!(copy_name("archive.tar.gz", 2, false), "archive.tar copy 2.gz");
        assert_eq!(copy_name("README", 1, false), "README copy 1");
        assert_eq!(copy_name(".bashrc", 1, false), ".bashrc copy 1");
        assert_eq!(copy_name("photos.2020", 3, true), "photos.2020 copy 3");
    }

    #[test]
    fn test_strip_copy_suffix() {
        assert_eq!(strip_copy_suffix("a copy 1.txt"), "a.txt");
        assert_eq!(strip_copy_suffix("a copy 1 copy 12.txt"), "a.txt");
        assert_eq!(strip_copy_suffix("copy 1"), "copy 1");
    }

    #[test]
    fn test_next_copy_name_probes_past_collisions() {
        let taken: HashSet<&str> = ["a copy 1.txt", "a copy 2.txt"].into_iter().collect();
        assert_eq!(
            next_copy_name("a copy 1.txt", false, |c| taken.contains(c)),
            "a copy 3.txt"
        );
        assert_eq!(next_copy_name("b.txt", false, |_| false), "b copy 1.txt");
    }
}
