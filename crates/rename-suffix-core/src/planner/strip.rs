use super::{
    is_taken, occupant, source_digest, Action, Claims, ConflictReason, Namespace, Occupant,
    PlanEntry, SkipReason,
};
use crate::config::{ConflictPolicy, Mode};
use crate::digest::Digest;
use crate::error::Error;
use crate::naming::FileEntry;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripOptions {
    pub verify: bool,
    pub conflict: ConflictPolicy,
}

impl Default for StripOptions {
    fn default() -> Self {
        Self {
            verify: true,
            conflict: ConflictPolicy::Refuse,
        }
    }
}

/// Decide the bare name for a suffixed `entry`.
///
/// With `verify`, the suffix must be the digest prefix of its own length;
/// when the stem has several readings, the one the digest confirms is used.
/// Without it, the longest reading is stripped.
/// Content identical to the file already holding the bare name is a
/// duplicate; different content goes through the conflict policy.
pub fn plan_strip(
    entry: &FileEntry,
    digest: Option<Digest>,
    options: StripOptions,
    claims: &mut Claims,
    ns: &dyn Namespace,
) -> Result<PlanEntry, Error> {
    let Some((preferred_base, preferred_suffix)) = entry.splits().next() else {
        return Ok(PlanEntry::new(
            entry,
            Mode::Strip,
            entry.path.clone(),
            Action::Skip(SkipReason::NoSuffix),
        ));
    };

    let mut digest = digest;
    let (base, suffix) = if options.verify {
        let current = source_digest(entry, digest, ns)?;
        digest = Some(current);
        match entry
            .splits()
            .find(|(_, suffix)| current.matches_suffix(suffix))
        {
            Some(split) => split,
            None => {
                warn!(
                    "Suffix of {} does not match its content",
                    entry.path.display()
                );
                return Ok(PlanEntry::new(
                    entry,
                    Mode::Strip,
                    entry.sibling(preferred_base),
                    Action::Conflict(ConflictReason::VerifyMismatch),
                )
                .with_digest(digest)
                .with_suffix(preferred_suffix));
            }
        }
    } else {
        (preferred_base, preferred_suffix)
    };
    let bare = entry.sibling(base);

    if !is_taken(&bare, claims, ns) {
        claims.claim(bare.clone(), entry.path.clone(), digest);
        return Ok(PlanEntry::new(entry, Mode::Strip, bare, Action::Rename)
            .with_digest(digest)
            .with_suffix(suffix));
    }

    let current = source_digest(entry, digest, ns)?;
    digest = Some(current);
    if occupant(&bare, &current, claims, ns) == Occupant::Same {
        debug!(
            "{} already exists with identical content",
            bare.display()
        );
        return Ok(PlanEntry::new(
            entry,
            Mode::Strip,
            bare,
            Action::Skip(SkipReason::Duplicate),
        )
        .with_digest(digest)
        .with_suffix(suffix));
    }

    match options.conflict {
        ConflictPolicy::Refuse => {
            warn!(
                "Would overwrite {} (from {})",
                bare.display(),
                entry.path.display()
            );
            Ok(PlanEntry::new(
                entry,
                Mode::Strip,
                bare,
                Action::Conflict(ConflictReason::NameTaken),
            )
            .with_digest(digest)
            .with_suffix(suffix))
        }
        ConflictPolicy::KeepSuffixed => Ok(PlanEntry::new(
            entry,
            Mode::Strip,
            entry.path.clone(),
            Action::Skip(SkipReason::KeptSuffixed),
        )
        .with_digest(digest)
        .with_suffix(suffix)),
        ConflictPolicy::AddCounter => {
            let mut n = 1;
            let target = loop {
                let candidate = entry.counter_path(base, n);
                if !is_taken(&candidate, claims, ns) {
                    break candidate;
                }
                n += 1;
            };
            debug!(
                "{} taken, using {}",
                bare.display(),
                target.display()
            );
            claims.claim(target.clone(), entry.path.clone(), digest);
            let mut plan = PlanEntry::new(entry, Mode::Strip, target, Action::Rename)
                .with_digest(digest)
                .with_suffix(suffix);
            plan.counter = Some(n);
            Ok(plan)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use std::path::PathBuf;

    fn suffixed(content: &[u8]) -> String {
        format!("/d/photo__{}.heic", Digest::of_bytes(content).suffix(6).unwrap())
    }

    fn digest_with(prefix: &[u8]) -> Digest {
        let mut bytes = [0u8; crate::digest::DIGEST_LEN];
        bytes[..prefix.len()].copy_from_slice(prefix);
        Digest::from_bytes(bytes)
    }

    fn options(verify: bool, conflict: ConflictPolicy) -> StripOptions {
        StripOptions { verify, conflict }
    }

    #[test]
    fn test_strip_skips_unsuffixed() {
        let ns = MemoryNamespace::default().with_file("/d/photo.heic", b"abc");
        let mut claims = Claims::new();

        let plan = plan_strip(
            &entry("/d/photo.heic"),
            None,
            StripOptions::default(),
            &mut claims,
            &ns,
        )
        .unwrap();

        assert_eq!(plan.action, Action::Skip(SkipReason::NoSuffix));
        assert!(ns.reads.lock().unwrap().is_empty());
    }

    #[test]
    fn test_strip_verified_renames_to_bare_name() {
        let name = suffixed(b"pixels");
        let ns = MemoryNamespace::default().with_file(&name, b"pixels");
        let mut claims = Claims::new();

        let plan = plan_strip(&entry(&name), None, StripOptions::default(), &mut claims, &ns)
            .unwrap();

        assert_eq!(plan.action, Action::Rename);
        assert_eq!(plan.target, PathBuf::from("/d/photo.heic"));
        assert_eq!(plan.suffix_len(), 6);
        assert!(claims.is_claimed(&plan.target));
    }

    #[test]
    fn test_strip_accepts_extended_suffix() {
        let name = format!(
            "/d/photo__{}.heic",
            Digest::of_bytes(b"pixels").suffix(9).unwrap()
        );
        let ns = MemoryNamespace::default().with_file(&name, b"pixels");
        let mut claims = Claims::new();

        let plan = plan_strip(&entry(&name), None, StripOptions::default(), &mut claims, &ns)
            .unwrap();

        assert_eq!(plan.action, Action::Rename);
    }

    #[test]
    fn test_strip_verify_mismatch_is_conflict() {
        let name = suffixed(b"before edit");
        let ns = MemoryNamespace::default().with_file(&name, b"after edit");
        let mut claims = Claims::new();

        let plan = plan_strip(&entry(&name), None, StripOptions::default(), &mut claims, &ns)
            .unwrap();

        assert_eq!(
            plan.action,
            Action::Conflict(ConflictReason::VerifyMismatch)
        );
        assert!(claims.is_empty());
    }

    #[test]
    fn test_strip_without_verify_ignores_content() {
        let name = suffixed(b"before edit");
        let ns = MemoryNamespace::default().with_file(&name, b"after edit");
        let mut claims = Claims::new();

        let plan = plan_strip(
            &entry(&name),
            None,
            options(false, ConflictPolicy::Refuse),
            &mut claims,
            &ns,
        )
        .unwrap();

        assert_eq!(plan.action, Action::Rename);
        assert!(ns.reads.lock().unwrap().is_empty());
    }

    #[test]
    fn test_strip_policies_on_taken_name() {
        let name = suffixed(b"new");
        let ns = MemoryNamespace::default()
            .with_file(&name, b"new")
            .with_file("/d/photo.heic", b"old");

        let mut claims = Claims::new();
        let refuse = plan_strip(
            &entry(&name),
            None,
            options(true, ConflictPolicy::Refuse),
            &mut claims,
            &ns,
        )
        .unwrap();
        assert_eq!(refuse.action, Action::Conflict(ConflictReason::NameTaken));
        assert_eq!(refuse.target, PathBuf::from("/d/photo.heic"));

        let keep = plan_strip(
            &entry(&name),
            None,
            options(true, ConflictPolicy::KeepSuffixed),
            &mut claims,
            &ns,
        )
        .unwrap();
        assert_eq!(keep.action, Action::Skip(SkipReason::KeptSuffixed));
        assert_eq!(keep.target, keep.source);

        let counter = plan_strip(
            &entry(&name),
            None,
            options(true, ConflictPolicy::AddCounter),
            &mut claims,
            &ns,
        )
        .unwrap();
        assert_eq!(counter.action, Action::Rename);
        assert_eq!(counter.target, PathBuf::from("/d/photo (1).heic"));
        assert_eq!(counter.counter, Some(1));
    }

    #[test]
    fn test_strip_counter_skips_taken_and_claimed() {
        let name = suffixed(b"new");
        let ns = MemoryNamespace::default()
            .with_file(&name, b"new")
            .with_file("/d/photo.heic", b"old")
            .with_file("/d/photo (1).heic", b"older");
        let mut claims = Claims::new();
        claims.claim(
            PathBuf::from("/d/photo (2).heic"),
            PathBuf::from("/d/elsewhere.heic"),
            None,
        );

        let plan = plan_strip(
            &entry(&name),
            None,
            options(false, ConflictPolicy::AddCounter),
            &mut claims,
            &ns,
        )
        .unwrap();

        assert_eq!(plan.target, PathBuf::from("/d/photo (3).heic"));
        assert_eq!(plan.counter, Some(3));
    }

    #[test]
    fn test_strip_identical_occupant_is_duplicate() {
        let name = suffixed(b"same");
        let ns = MemoryNamespace::default()
            .with_file(&name, b"same")
            .with_file("/d/photo.heic", b"same");
        let mut claims = Claims::new();

        let plan = plan_strip(
            &entry(&name),
            None,
            options(false, ConflictPolicy::Refuse),
            &mut claims,
            &ns,
        )
        .unwrap();

        assert_eq!(plan.action, Action::Skip(SkipReason::Duplicate));
        assert_eq!(plan.target, PathBuf::from("/d/photo.heic"));
    }

    #[test]
    fn test_strip_unreadable_with_verify_is_io_error() {
        let ns = MemoryNamespace::default().with_unreadable("/d/photo__abcdef.heic");
        let mut claims = Claims::new();

        let err = plan_strip(
            &entry("/d/photo__abcdef.heic"),
            None,
            StripOptions::default(),
            &mut claims,
            &ns,
        )
        .unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_strip_verify_picks_suffix_with_leading_underscore() {
        let digest = digest_with(&[0xFC]);
        assert_eq!(digest.suffix(6).unwrap(), "_AAAAA");
        let ns = MemoryNamespace::default().with_digest("/d/photo___AAAAA.heic", digest);
        let mut claims = Claims::new();

        let plan = plan_strip(
            &entry("/d/photo___AAAAA.heic"),
            None,
            StripOptions::default(),
            &mut claims,
            &ns,
        )
        .unwrap();

        assert_eq!(plan.action, Action::Rename);
        assert_eq!(plan.target, PathBuf::from("/d/photo.heic"));
        assert_eq!(plan.suffix.as_deref(), Some("_AAAAA"));
    }

    #[test]
    fn test_strip_suffix_ending_in_separator() {
        let digest = digest_with(&[0, 0, 0, 0xFF, 0xF0]);
        assert_eq!(digest.suffix(6).unwrap(), "AAAA__");
        let ns = MemoryNamespace::default().with_digest("/d/photo__AAAA__.heic", digest);

        for verify in [true, false] {
            let mut claims = Claims::new();
            let plan = plan_strip(
                &entry("/d/photo__AAAA__.heic"),
                None,
                options(verify, ConflictPolicy::Refuse),
                &mut claims,
                &ns,
            )
            .unwrap();

            assert_eq!(plan.action, Action::Rename);
            assert_eq!(plan.target, PathBuf::from("/d/photo.heic"));
        }
    }

    #[test]
    fn test_strip_without_verify_prefers_longest_suffix() {
        let ns = MemoryNamespace::default().with_file("/d/photo___AAAAA.heic", b"x");
        let mut claims = Claims::new();

        let plan = plan_strip(
            &entry("/d/photo___AAAAA.heic"),
            None,
            options(false, ConflictPolicy::Refuse),
            &mut claims,
            &ns,
        )
        .unwrap();

        assert_eq!(plan.target, PathBuf::from("/d/photo.heic"));
    }

    #[test]
    fn test_strip_counter_uses_verified_base() {
        let digest = digest_with(&[0xFC]);
        let ns = MemoryNamespace::default()
            .with_digest("/d/photo___AAAAA.heic", digest)
            .with_file("/d/photo.heic", b"other");
        let mut claims = Claims::new();

        let plan = plan_strip(
            &entry("/d/photo___AAAAA.heic"),
            None,
            options(true, ConflictPolicy::AddCounter),
            &mut claims,
            &ns,
        )
        .unwrap();

        assert_eq!(plan.target, PathBuf::from("/d/photo (1).heic"));
    }
}
