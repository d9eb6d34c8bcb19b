//! rsync command lines.

/// Flags used when synchronising sources: recurse, keep symlinks,
/// compress, keep times, delete extraneous and excluded files.
pub const DEFAULT_FLAGS: &[&str] = &["-r", "-l", "-z", "-t", "--delete", "--delete-excluded"];

/// Filters used when synchronising sources. Order matters.
pub const DEFAULT_FILTERS: &[&str] = &["- target/", "+ */"];

/// Flags used when mirroring uploaded files: recurse, keep symlinks,
/// times, permissions, owner and group by numeric id, verbose.
pub const CLONE_FLAGS: &[&str] = &["-r", "-l", "-t", "-p", "-o", "-g", "--numeric-ids", "-v"];

/// Build `rsync <flags> --filter="<f>"... <src> <dest>`.
///
/// The result is run either locally or on a remote host; `src` and `dest`
/// take any form rsync accepts.
pub fn rsync<F: AsRef<str>>(src: &str, dest: &str, flags: &[F], filters: &[&str]) -> String {
    let args = flags
        .iter()
        .map(|f| f.as_ref().to_string())
        .chain(filters.iter().map(|f| format!("--filter=\"{f}\"")))
        .chain([src.to_string(), dest.to_string()]);
    std::iter::once("rsync".to_string())
        .chain(args)
        .collect::<Vec<_>>()
        .join(" ")
}

/// [`rsync`] with the source synchronisation defaults.
pub fn sync(src: &str, dest: &str) -> String {
    rsync(src, dest, DEFAULT_FLAGS, DEFAULT_FILTERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        assert_eq!(
            sync("/tmp/x/crates/", "kis@host:/srv/src/crates/"),
            "rsync -r -l -z -t --delete --delete-excluded --filter=\"- target/\" \
             --filter=\"+ */\" /tmp/x/crates/ kis@host:/srv/src/crates/"
        );
    }

    #[test]
    fn test_without_filters() {
        assert_eq!(
            rsync("a", "b", CLONE_FLAGS, &[]),
            "rsync -r -l -t -p -o -g --numeric-ids -v a b"
        );
    }

    #[test]
    fn test_owned_flags() {
        let mut flags: Vec<String> = CLONE_FLAGS.iter().map(|f| f.to_string()).collect();
        flags.push("--chmod=ug+rw".to_string());
        let cmd = rsync("a/*", "h:b", &flags, &[]);
        assert!(cmd.ends_with("-v --chmod=ug+rw a/* h:b"));
    }
}
