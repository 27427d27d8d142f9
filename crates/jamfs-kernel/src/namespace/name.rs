//! Filesystem-safe names and virtual path helpers.

/// Lower-case `name` and keep `[a-z0-9._-]`; every run of anything else
/// becomes a single `_`. Empty, `.` and `..` results become `_`.
///
/// Lossy and not invertible, which is why entries also keep their display
/// name. Distinct names can collide; the later one wins in a directory.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-') {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    usable(out)
}

/// Display name made usable as a single path component.
///
/// Configured artist names are shown as given; only the separator is
/// replaced, and names a directory cannot hold become `_`.
pub fn component_name(name: &str) -> String {
    usable(name.replace('/', "_"))
}

fn usable(name: String) -> String {
    match name.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => name,
    }
}

/// Canonical virtual path: leading `/`, no trailing `/`, no empty or `.`
/// components. `None` if the path tries to climb with `..`.
pub fn canonical(path: &str) -> Option<String> {
    let mut out = String::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => return None,
            c => {
                out.push('/');
                out.push_str(c);
            }
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    Some(out)
}

/// Parent of a canonical path; the root is its own parent.
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

/// Last component of a canonical path; empty for the root.
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Join a canonical directory path and a child name.
pub fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Hello World"), "hello_world");
        assert_eq!(normalize_name("AC/DC: Live!"), "ac_dc_live_");
        assert_eq!(normalize_name("Foo  --  Bar"), "foo_--_bar");
        assert_eq!(normalize_name("01_-_Intro.flac"), "01_-_intro.flac");
        assert_eq!(normalize_name("Café"), "caf_");
        assert_eq!(normalize_name(""), "_");
        assert_eq!(normalize_name("."), "_");
        assert_eq!(normalize_name(".."), "_");
        assert_eq!(normalize_name("..."), "...");
        assert_eq!(normalize_name(".hidden"), ".hidden");
    }

    #[test]
    fn test_normalize_collides() {
        assert_eq!(normalize_name("Rock & Roll"), "rock_roll");
        assert_eq!(normalize_name("A B"), normalize_name("a?b"));
    }

    #[test]
    fn test_component_name() {
        assert_eq!(component_name("Test Artist"), "Test Artist");
        assert_eq!(component_name("AC/DC"), "AC_DC");
        assert_eq!(component_name(""), "_");
        assert_eq!(component_name(".."), "_");
        assert_eq!(component_name("/"), "_");
    }

    #[test]
    fn test_canonical() {
        assert_eq!(canonical("/").as_deref(), Some("/"));
        assert_eq!(canonical("").as_deref(), Some("/"));
        assert_eq!(canonical("a/b/").as_deref(), Some("/a/b"));
        assert_eq!(canonical("//a/./b").as_deref(), Some("/a/b"));
        assert_eq!(canonical("/a/../b"), None);
    }

    #[test]
    fn test_dirname_basename() {
        assert_eq!(dirname("/"), "/");
        assert_eq!(dirname("/a"), "/");
        assert_eq!(dirname("/a/b/c"), "/a/b");
        assert_eq!(basename("/"), "");
        assert_eq!(basename("/a"), "a");
        assert_eq!(basename("/a/b/c"), "c");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/", "artists"), "/artists");
        assert_eq!(join("/artists", "a"), "/artists/a");
    }
}
