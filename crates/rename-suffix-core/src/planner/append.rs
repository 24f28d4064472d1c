use super::{occupant, source_digest, Action, Claims, Namespace, Occupant, PlanEntry, SkipReason};
use crate::config::Mode;
use crate::digest::{Digest, MAX_SUFFIX_CHARS};
use crate::error::Error;
use crate::naming::FileEntry;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Decide the suffixed name for `entry`.
///
/// Starts at `chars` characters and takes one more digest character per
/// truncation collision. Identical content already present in the directory
/// (on disk or claimed earlier in this run) makes the file a duplicate.
pub fn plan_append(
    entry: &FileEntry,
    digest: Option<Digest>,
    chars: usize,
    claims: &mut Claims,
    ns: &dyn Namespace,
) -> Result<PlanEntry, Error> {
    if entry.suffix().is_some() {
        return Ok(PlanEntry::new(
            entry,
            Mode::Append,
            entry.path.clone(),
            Action::Skip(SkipReason::AlreadySuffixed),
        ));
    }
    if chars == 0 || chars > MAX_SUFFIX_CHARS {
        return Err(Error::InvalidChars(chars));
    }

    let digest = source_digest(entry, digest, ns)?;

    if let Some(existing) = find_duplicate(entry, &digest, claims, ns) {
        debug!(
            "{} duplicates {}",
            entry.path.display(),
            existing.display()
        );
        let suffix = digest.suffix(chars).unwrap_or_default();
        return Ok(PlanEntry::new(
            entry,
            Mode::Append,
            existing,
            Action::Skip(SkipReason::Duplicate),
        )
        .with_digest(Some(digest))
        .with_suffix(suffix));
    }

    for n in chars..=MAX_SUFFIX_CHARS {
        let Some(suffix) = digest.suffix(n) else {
            break;
        };
        let target = entry.suffixed_path(&suffix);
        match occupant(&target, &digest, claims, ns) {
            Occupant::Free => {
                if n > chars {
                    debug!(
                        "Extended suffix for {} to {} characters",
                        entry.path.display(),
                        n
                    );
                }
                claims.claim(target.clone(), entry.path.clone(), Some(digest));
                return Ok(
                    PlanEntry::new(entry, Mode::Append, target, Action::Rename)
                        .with_digest(Some(digest))
                        .with_suffix(suffix),
                );
            }
            Occupant::Same => {
                return Ok(PlanEntry::new(
                    entry,
                    Mode::Append,
                    target,
                    Action::Skip(SkipReason::Duplicate),
                )
                .with_digest(Some(digest))
                .with_suffix(suffix));
            }
            Occupant::Different => {
                warn!(
                    "Truncation collision at {}, extending suffix",
                    target.display()
                );
            }
        }
    }

    Err(Error::CollisionExhausted {
        path: entry.path.clone(),
        max_chars: MAX_SUFFIX_CHARS,
    })
}

/// A file in the same directory already holding this content.
fn find_duplicate(
    entry: &FileEntry,
    digest: &Digest,
    claims: &mut Claims,
    ns: &dyn Namespace,
) -> Option<PathBuf> {
    let dir = entry.dir();
    if let Some(path) = claims.known_content(dir, digest) {
        return Some(path.clone());
    }

    for (path, suffix) in claims.materialized_in(dir) {
        if !digest.matches_suffix(&suffix) {
            continue;
        }
        match ns.digest(&path) {
            Ok(existing) if existing == *digest => {
                claims.remember_content(dir.to_path_buf(), *digest, path.clone());
                return Some(path);
            }
            Ok(_) => {}
            Err(err) => warn!("Cannot read existing {}: {}", path.display(), err),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::digest::DIGEST_LEN;
    use std::path::Path;

    fn digest_with(prefix: &[u8]) -> Digest {
        let mut bytes = [0u8; DIGEST_LEN];
        bytes[..prefix.len()].copy_from_slice(prefix);
        Digest::from_bytes(bytes)
    }

    fn suffix_of(content: &[u8], n: usize) -> String {
        Digest::of_bytes(content).suffix(n).unwrap()
    }

    #[test]
    fn test_append_renames_unsuffixed() {
        let ns = MemoryNamespace::default().with_file("/d/photo.jpg", b"abc");
        let mut claims = Claims::new();

        let plan = plan_append(&entry("/d/photo.jpg"), None, 6, &mut claims, &ns).unwrap();

        let expected = format!("/d/photo__{}.jpg", suffix_of(b"abc", 6));
        assert_eq!(plan.action, Action::Rename);
        assert_eq!(plan.target, PathBuf::from(&expected));
        assert_eq!(plan.suffix_len(), 6);
        assert_eq!(plan.digest, Some(Digest::of_bytes(b"abc")));
        assert!(claims.is_claimed(Path::new(&expected)));
    }

    #[test]
    fn test_append_skips_already_suffixed_without_reading() {
        let ns = MemoryNamespace::default().with_file("/d/photo__aZ3kf9.heic", b"abc");
        let mut claims = Claims::new();

        let plan =
            plan_append(&entry("/d/photo__aZ3kf9.heic"), None, 6, &mut claims, &ns).unwrap();

        assert_eq!(plan.action, Action::Skip(SkipReason::AlreadySuffixed));
        assert_eq!(plan.target, plan.source);
        assert!(ns.reads.lock().unwrap().is_empty());
        assert!(claims.is_empty());
    }

    #[test]
    fn test_append_extends_on_truncation_collision() {
        let base = suffix_of(b"abc", 6);
        let colliding = format!("/d/photo__{}.jpg", base);
        let ns = MemoryNamespace::default()
            .with_file("/d/photo.jpg", b"abc")
            .with_file(&colliding, b"different");
        let mut claims = Claims::new();

        let plan = plan_append(&entry("/d/photo.jpg"), None, 6, &mut claims, &ns).unwrap();

        assert_eq!(plan.action, Action::Rename);
        assert_eq!(plan.suffix.as_deref(), Some(suffix_of(b"abc", 7).as_str()));
        assert!(plan.suffix.as_ref().unwrap().starts_with(&base));
    }

    #[test]
    fn test_append_identical_occupant_is_duplicate() {
        let target = format!("/d/photo__{}.jpg", suffix_of(b"abc", 6));
        let ns = MemoryNamespace::default()
            .with_file("/d/photo.jpg", b"abc")
            .with_file(&target, b"abc");
        let mut claims = Claims::new();

        let plan = plan_append(&entry("/d/photo.jpg"), None, 6, &mut claims, &ns).unwrap();

        assert_eq!(plan.action, Action::Skip(SkipReason::Duplicate));
        assert_eq!(plan.target, PathBuf::from(target));
        assert!(claims.is_empty());
    }

    #[test]
    fn test_append_same_content_different_names_in_one_run() {
        let ns = MemoryNamespace::default()
            .with_file("/d/IMG_0001.heic", b"same")
            .with_file("/d/IMG_0002.heic", b"same");
        let mut claims = Claims::new();

        let first = plan_append(&entry("/d/IMG_0001.heic"), None, 6, &mut claims, &ns).unwrap();
        let second = plan_append(&entry("/d/IMG_0002.heic"), None, 6, &mut claims, &ns).unwrap();

        assert_eq!(first.action, Action::Rename);
        assert_eq!(second.action, Action::Skip(SkipReason::Duplicate));
        assert_eq!(second.target, first.target);
        assert_eq!(first.suffix, second.suffix);
    }

    #[test]
    fn test_append_recognizes_materialized_duplicate() {
        let existing = format!("/d/IMG_0001__{}.heic", suffix_of(b"same", 6));
        let ns = MemoryNamespace::default()
            .with_file(&existing, b"same")
            .with_file("/d/IMG_0002.heic", b"same");
        let mut claims = Claims::new();
        claims.register_existing(&entry(&existing));

        let plan = plan_append(&entry("/d/IMG_0002.heic"), None, 6, &mut claims, &ns).unwrap();

        assert_eq!(plan.action, Action::Skip(SkipReason::Duplicate));
        assert_eq!(plan.target, PathBuf::from(existing));
    }

    #[test]
    fn test_append_other_directory_is_not_duplicate() {
        let existing = format!("/a/IMG_0001__{}.heic", suffix_of(b"same", 6));
        let ns = MemoryNamespace::default()
            .with_file(&existing, b"same")
            .with_file("/b/IMG_0002.heic", b"same");
        let mut claims = Claims::new();
        claims.register_existing(&entry(&existing));

        let plan = plan_append(&entry("/b/IMG_0002.heic"), None, 6, &mut claims, &ns).unwrap();

        assert_eq!(plan.action, Action::Rename);
    }

    #[test]
    fn test_append_uses_precomputed_digest() {
        let digest = Digest::from_bytes([0u8; DIGEST_LEN]);
        let ns = MemoryNamespace::default().with_file("/d/a.heic", b"ignored");
        let mut claims = Claims::new();

        let plan = plan_append(&entry("/d/a.heic"), Some(digest), 6, &mut claims, &ns).unwrap();

        assert_eq!(plan.target, PathBuf::from("/d/a__AAAAAA.heic"));
        assert!(ns.reads.lock().unwrap().is_empty());
    }

    #[test]
    fn test_append_unreadable_source_is_io_error() {
        let ns = MemoryNamespace::default().with_unreadable("/d/locked.heic");
        let mut claims = Claims::new();

        let err = plan_append(&entry("/d/locked.heic"), None, 6, &mut claims, &ns).unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
        assert!(claims.is_empty());
    }

    #[test]
    fn test_append_exhausts_digest() {
        let digest = Digest::from_bytes([7u8; DIGEST_LEN]);
        let mut ns = MemoryNamespace::default();
        for n in 40..=MAX_SUFFIX_CHARS {
            let name = format!("/d/a__{}.heic", digest.suffix(n).unwrap());
            ns = ns.with_file(&name, format!("other {}", n).as_bytes());
        }
        let mut claims = Claims::new();

        let err = plan_append(&entry("/d/a.heic"), Some(digest), 40, &mut claims, &ns).unwrap_err();

        assert!(matches!(
            err,
            Error::CollisionExhausted { max_chars: MAX_SUFFIX_CHARS, .. }
        ));
    }

    #[test]
    fn test_append_skips_suffix_ending_in_separator() {
        let ns = MemoryNamespace::default()
            .with_digest("/d/photo__AAAA__.heic", digest_with(&[0, 0, 0, 0xFF, 0xF0]));
        let mut claims = Claims::new();

        let plan =
            plan_append(&entry("/d/photo__AAAA__.heic"), None, 6, &mut claims, &ns).unwrap();

        assert_eq!(plan.action, Action::Skip(SkipReason::AlreadySuffixed));
        assert!(ns.reads.lock().unwrap().is_empty());
    }

    #[test]
    fn test_append_extends_past_shared_prefix_on_disk() {
        // Equal through 6 characters, different at the 7th.
        let ours = digest_with(&[]);
        let theirs = digest_with(&[0, 0, 0, 0, 0, 0xFF]);
        assert_eq!(ours.suffix(6), theirs.suffix(6));
        assert_ne!(ours.suffix(7), theirs.suffix(7));

        let ns = MemoryNamespace::default()
            .with_digest("/d/photo.heic", ours)
            .with_digest("/d/photo__AAAAAA.heic", theirs);
        let mut claims = Claims::new();
        claims.register_existing(&entry("/d/photo__AAAAAA.heic"));

        let kept = plan_append(&entry("/d/photo__AAAAAA.heic"), None, 6, &mut claims, &ns)
            .unwrap();
        let plan = plan_append(&entry("/d/photo.heic"), None, 6, &mut claims, &ns).unwrap();

        assert_eq!(kept.action, Action::Skip(SkipReason::AlreadySuffixed));
        assert_eq!(plan.action, Action::Rename);
        assert_eq!(plan.target, PathBuf::from("/d/photo__AAAAAAA.heic"));
    }

    #[test]
    fn test_append_extends_past_claim_with_other_content() {
        let ours = digest_with(&[]);
        let theirs = digest_with(&[0, 0, 0, 0, 0, 0xFF]);
        let ns = MemoryNamespace::default().with_digest("/d/photo.heic", ours);
        let mut claims = Claims::new();
        claims.claim(
            PathBuf::from("/d/photo__AAAAAA.heic"),
            PathBuf::from("/d/elsewhere.heic"),
            Some(theirs),
        );

        let plan = plan_append(&entry("/d/photo.heic"), None, 6, &mut claims, &ns).unwrap();

        assert_eq!(plan.action, Action::Rename);
        assert_eq!(plan.suffix_len(), 7);
        assert!(claims.is_claimed(Path::new("/d/photo__AAAAAAA.heic")));
    }
}
