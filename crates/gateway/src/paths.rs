//! Pure path normalization and joining.
//!
//! Nothing here touches a filesystem. [`resolve`] is total: any input string
//! produces a canonical, traversal-free path, clamping `..` at the root
//! instead of failing. Containment under a tenant root is checked separately
//! when the path is anchored (see [`crate::context::ServerContext::anchor`]).

/// Normalize a user-supplied path.
///
/// Empty segments are dropped, `.` is discarded, and `..` removes the
/// previous surviving segment. A `..` with nothing left to remove is
/// discarded, so the result never climbs above its starting point. Other
/// segments are kept verbatim. The result has no leading or trailing slash;
/// the empty string denotes the root itself.
///
/// ```
/// use gateway::paths::resolve;
///
/// assert_eq!(resolve("a/b/../c"), "a/c");
/// assert_eq!(resolve("../../etc/passwd"), "etc/passwd");
/// assert_eq!(resolve("../../../"), "");
/// ```
pub fn resolve(raw: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();

    for segment in raw.split('/').filter(|s| !s.is_empty()) {
        match segment {
            "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }

    stack.join("/")
}

/// Join `base` and `parts` with `/`, collapsing doubled separators.
///
/// No `.` or `..` handling is done; pipe the result through [`resolve`] when
/// a safe path is needed. A `base` of exactly `/` yields a single leading
/// slash.
///
/// ```
/// use gateway::paths::join_paths;
///
/// assert_eq!(join_paths("/", &["files", "a.txt"]), "/files/a.txt");
/// assert_eq!(join_paths("base", &["x", "y"]), "base/x/y");
/// ```
pub fn join_paths<S: AsRef<str>>(base: &str, parts: &[S]) -> String {
    let mut joined = String::with_capacity(
        base.len() + parts.iter().map(|p| p.as_ref().len() + 1).sum::<usize>(),
    );
    joined.push_str(base);
    for part in parts {
        joined.push('/');
        joined.push_str(part.as_ref());
    }

    collapse_separators(&joined)
}

/// Replace every run of `/` with a single `/`.
fn collapse_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if !previous_slash {
                out.push(ch);
            }
            previous_slash = true;
        } else {
            out.push(ch);
            previous_slash = false;
        }
    }
    out
}

/// Directory portion of a resolved path, `""` for top-level entries.
pub fn parent(resolved: &str) -> &str {
    match resolved.rfind('/') {
        Some(idx) => &resolved[..idx],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_pops_parent() {
        assert_eq!(resolve("a/b/../c"), "a/c");
        assert_eq!(resolve("a/b/c/../../d"), "a/d");
    }

    #[test]
    fn test_resolve_clamps_at_root() {
        assert_eq!(resolve("../../etc/passwd"), "etc/passwd");
        assert_eq!(resolve("/../../etc/passwd"), "etc/passwd");
        assert_eq!(resolve("a/../../b"), "b");
    }

    #[test]
    fn test_resolve_all_traversal_is_root() {
        assert_eq!(resolve("../../../"), "");
        assert_eq!(resolve(".."), "");
        assert_eq!(resolve("./././"), "");
        assert_eq!(resolve(""), "");
        assert_eq!(resolve("/"), "");
    }

    #[test]
    fn test_resolve_drops_dot_and_empty_segments() {
        assert_eq!(resolve("//a///./b//"), "a/b");
        assert_eq!(resolve("/home/container/"), "home/container");
    }

    #[test]
    fn test_resolve_keeps_segments_verbatim() {
        assert_eq!(resolve("My Docs/File (1).TXT"), "My Docs/File (1).TXT");
        assert_eq!(resolve("...hidden/..a/a.."), "...hidden/..a/a..");
        assert_eq!(resolve("back\\..\\slash"), "back\\..\\slash");
    }

    #[test]
    fn test_resolve_clean_input_is_noop() {
        for p in ["a", "a/b/c", "plugins/config.yml", "world/region/r.0.0.mca"] {
            assert_eq!(resolve(p), p);
        }
    }

    #[test]
    fn test_join_paths_root_base() {
        assert_eq!(join_paths("/", &["files", "a.txt"]), "/files/a.txt");
        assert_eq!(join_paths("/", &["/files/", "/a.txt"]), "/files/a.txt");
    }

    #[test]
    fn test_join_paths_relative_base() {
        assert_eq!(join_paths("base", &["x", "y"]), "base/x/y");
        assert_eq!(join_paths("base/", &["x/", "y"]), "base/x/y");
    }

    #[test]
    fn test_join_paths_collapses_long_runs() {
        assert_eq!(join_paths("/srv///data", &["//x"]), "/srv/data/x");
    }

    #[test]
    fn test_join_paths_does_not_resolve() {
        assert_eq!(join_paths("/srv", &["..", "etc"]), "/srv/../etc");
    }

    #[test]
    fn test_join_paths_with_owned_parts() {
        let parts = vec!["a".to_string(), "b".to_string()];
        assert_eq!(join_paths("/root", &parts), "/root/a/b");
    }

    #[test]
    fn test_join_paths_empty_parts() {
        let none: [&str; 0] = [];
        assert_eq!(join_paths("/srv", &none), "/srv");
        assert_eq!(join_paths("/", &none), "/");
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("plugins/Essentials/config.yml"), "plugins/Essentials");
        assert_eq!(parent("server.properties"), "");
        assert_eq!(parent(""), "");
    }
}
