//! `tern index`: (re)compute the type index of a directory.
//!
//! Useful for directories other builds put on their classpath: a fresh
//! persisted index spares them from digesting every type file.

use std::time::SystemTime;

use tern_classpath::{index_directory, INDEX_LOCATION};

use crate::{GlobalArgs, IndexArgs};

/// Runs the `tern index` command.
///
/// Files not modified since the persisted index was written keep their
/// hashes unless `--force` is given.
pub fn run(args: &IndexArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    if !args.dir.is_dir() {
        return Err(format!("{} is not a directory", args.dir.display()).into());
    }
    if args.force {
        let persisted = args.dir.join(INDEX_LOCATION);
        match std::fs::remove_file(&persisted) {
            Ok(()) => tracing::debug!(index = %persisted.display(), "discarded persisted index"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    let indexed = index_directory(&args.dir, SystemTime::now())?;
    if !global.quiet {
        eprintln!(
            "    Indexed {} type(s) in {}",
            indexed.index.len(),
            args.dir.display()
        );
    }
    Ok(0)
}
