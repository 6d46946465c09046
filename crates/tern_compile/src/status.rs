//! What the next build would start from, without compiling anything.

use std::time::SystemTime;

use tern_classpath::{diff, Classpath, EntryCache, TypeIndex};
use tern_state::{BuildContext, UnitId};

use crate::error::CompileError;
use crate::scheduler::CLASSPATH_DIGEST;
use crate::settings::BuildSettings;

/// Differences between the sources on disk and the last committed build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    /// No usable previous build: everything would be compiled.
    pub escalated: bool,
    /// Units not in the previous build.
    pub added: Vec<UnitId>,
    /// Units whose source changed.
    pub modified: Vec<UnitId>,
    /// Units whose source is gone.
    pub removed: Vec<UnitId>,
    /// Whether any classpath type was added, removed or changed.
    pub classpath_changed: bool,
    /// Units whose last build reported errors.
    pub failing: Vec<UnitId>,
}

impl StatusReport {
    /// Returns `true` if a build would compile nothing.
    pub fn is_noop(&self) -> bool {
        !self.escalated
            && self.added.is_empty()
            && self.modified.is_empty()
            && self.removed.is_empty()
            && !self.classpath_changed
    }
}

/// Compares `settings` against the committed build state.
///
/// The classpath is indexed and its digest diffed the same way a build
/// would, so directory indexes may be refreshed on disk.
pub fn inspect(settings: &BuildSettings) -> Result<StatusReport, CompileError> {
    let mut ctx = BuildContext::open(&settings.state_dir, &settings.output_dir);
    for source in &settings.sources {
        ctx.register_file(source)?;
    }
    let classpath_changed = match ctx.previous_attribute::<TypeIndex>(CLASSPATH_DIGEST) {
        Some(previous) => {
            let classpath = Classpath::open(&settings.classpath, &EntryCache::new(), SystemTime::now())?;
            !diff(Some(&previous), Some(&classpath.digest())).is_empty()
        }
        None => !ctx.is_escalated(),
    };
    let failing = ctx
        .inputs()
        .filter(|(unit, _, _)| ctx.previous_unit(unit).is_some_and(|r| r.has_errors()))
        .map(|(unit, _, _)| unit.clone())
        .collect();
    Ok(StatusReport {
        escalated: ctx.is_escalated(),
        added: ctx.added_inputs(),
        modified: ctx.modified_inputs(),
        removed: ctx.removed_inputs(),
        classpath_changed,
        failing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_common::ContentHash;

    #[test]
    fn no_state_is_escalated() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("A.decl");
        std::fs::write(&src, "a").unwrap();
        let mut settings = BuildSettings::new(dir.path().join("out"), dir.path().join("state"));
        settings.sources.push(src.clone());

        let report = inspect(&settings).unwrap();
        assert!(report.escalated);
        assert!(!report.is_noop());
        assert_eq!(report.added, vec![UnitId::from_path(&src)]);
        assert!(!report.classpath_changed);
    }

    #[test]
    fn reports_modified_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state");
        let out = dir.path().join("out");
        let a = dir.path().join("A.decl");
        let b = dir.path().join("B.decl");
        std::fs::write(&a, "a").unwrap();
        std::fs::write(&b, "b").unwrap();

        let mut ctx = BuildContext::open(&state, &out);
        for path in [&a, &b] {
            ctx.register_file(path).unwrap();
            ctx.begin_unit(&UnitId::from_path(path), path).unwrap();
        }
        ctx.set_attribute(CLASSPATH_DIGEST, &TypeIndex::new()).unwrap();
        ctx.commit().unwrap();

        let mut settings = BuildSettings::new(&out, &state);
        settings.sources = vec![a.clone(), b.clone()];
        assert!(inspect(&settings).unwrap().is_noop());

        std::fs::write(&a, "changed").unwrap();
        settings.sources = vec![a.clone()];
        let report = inspect(&settings).unwrap();
        assert!(!report.escalated);
        assert_eq!(report.modified, vec![UnitId::from_path(&a)]);
        assert_eq!(report.removed, vec![UnitId::from_path(&b)]);
        assert!(!report.is_noop());
        assert_ne!(ContentHash::from_bytes(b"a"), ContentHash::from_bytes(b"changed"));
    }
}
