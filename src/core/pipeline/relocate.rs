//! Moves grouped files into per-group directories.
//!
//! Layout inside the working directory:
//!
//! ```text
//! alike-<group id>/
//!     member.png
//!     exact-<identity prefix>/
//!         representative.png
//!         exact-copy.png
//! ```

use crate::core::comparator::AlikeGroup;
use crate::core::record::ImageRecord;
use crate::error::RelocateError;
use crate::events::{Event, EventSender, RelocateEvent};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Length of the identity prefix in `exact-` directory names
const EXACT_DIR_PREFIX_LEN: usize = 16;

/// What happened to one group
#[derive(Debug, Default)]
pub struct GroupRelocation {
    /// The group directory, if it was created
    pub directory: Option<PathBuf>,
    /// New location of each moved record, by arena index
    pub moves: Vec<(usize, PathBuf)>,
    /// Failures; the remaining files of the group are still attempted
    pub errors: Vec<RelocateError>,
}

/// Relocates groups below a root directory.
///
/// Groups may be relocated in parallel; directory creation is serialized.
pub struct Relocator {
    root: PathBuf,
    dir_lock: Mutex<()>,
}

impl Relocator {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            dir_lock: Mutex::new(()),
        }
    }

    /// Directory name for a group
    pub fn group_dir(&self, group: &AlikeGroup) -> PathBuf {
        self.root.join(format!("alike-{}", group.id))
    }

    /// Move every file of `group` into its directory
    pub fn relocate_group(
        &self,
        group: &AlikeGroup,
        records: &[ImageRecord],
        events: &EventSender,
    ) -> GroupRelocation {
        let mut outcome = GroupRelocation::default();
        let group_dir = self.group_dir(group);

        if let Err(e) = self.create_dir(&group_dir) {
            outcome.errors.push(e);
            return outcome;
        }
        outcome.directory = Some(group_dir.clone());

        for &member in &group.members {
            let record = &records[member];

            let target_dir = if record.exact_duplicates.is_empty() {
                group_dir.clone()
            } else {
                let exact_dir =
                    group_dir.join(format!("exact-{}", record.id.short(EXACT_DIR_PREFIX_LEN)));
                if let Err(e) = self.create_dir(&exact_dir) {
                    outcome.errors.push(e);
                    continue;
                }
                exact_dir
            };

            // Duplicates first, then the representative
            let sequence = record
                .exact_duplicates
                .iter()
                .copied()
                .chain(std::iter::once(member));

            for index in sequence {
                let from = &records[index].path;
                match move_into(from, &target_dir) {
                    Ok(to) => {
                        tracing::debug!(from = %from.display(), to = %to.display(), "Moved");
                        events.send(Event::Relocate(RelocateEvent::Moved {
                            from: from.clone(),
                            to: to.clone(),
                        }));
                        outcome.moves.push((index, to));
                    }
                    Err(e) => {
                        events.send(Event::Relocate(RelocateEvent::Error {
                            path: from.clone(),
                            message: e.to_string(),
                        }));
                        outcome.errors.push(e);
                    }
                }
            }
        }

        outcome
    }

    fn create_dir(&self, path: &Path) -> Result<(), RelocateError> {
        let _guard = self.dir_lock.lock().unwrap_or_else(|e| e.into_inner());
        fs::create_dir_all(path).map_err(|source| RelocateError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Move `from` into `dir`, keeping its file name
pub fn move_into(from: &Path, dir: &Path) -> Result<PathBuf, RelocateError> {
    if !from.exists() {
        return Err(RelocateError::SourceMissing {
            path: from.to_path_buf(),
        });
    }

    let to = match from.file_name() {
        Some(name) => dir.join(name),
        None => {
            return Err(RelocateError::SourceMissing {
                path: from.to_path_buf(),
            })
        }
    };

    move_file(from, &to).map_err(|source| RelocateError::Move {
        from: from.to_path_buf(),
        to: to.clone(),
        source,
    })?;

    Ok(to)
}

/// Rename, or copy + verify + delete when rename fails (e.g. across filesystems)
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to).or_else(|_| {
        let source_size = fs::metadata(from)?.len();
        fs::copy(from, to)?;

        // Keep the source unless the copy is complete
        let dest_size = fs::metadata(to)?.len();
        if dest_size != source_size {
            let _ = fs::remove_file(to);
            return Err(io::Error::other(format!(
                "Copy verification failed: source {} bytes, dest {} bytes",
                source_size, dest_size
            )));
        }

        fs::remove_file(from)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::null_sender;
    use image::{GrayImage, Luma};
    use tempfile::TempDir;
    use uuid::Uuid;

    fn record_at(dir: &Path, name: &str, seed: u8) -> ImageRecord {
        let path = dir.join(name);
        fs::write(&path, [seed; 8]).unwrap();
        let samples = GrayImage::from_pixel(2, 2, Luma([seed]));
        ImageRecord::new(&path, &samples, 2)
    }

    #[test]
    fn move_into_moves_file() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("a.png");
        fs::write(&from, b"pixels").unwrap();
        let dir = temp.path().join("target");
        fs::create_dir(&dir).unwrap();

        let to = move_into(&from, &dir).unwrap();

        assert_eq!(to, dir.join("a.png"));
        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"pixels");
    }

    #[test]
    fn move_into_reports_missing_source() {
        let temp = TempDir::new().unwrap();

        let result = move_into(&temp.path().join("gone.png"), temp.path());

        assert!(matches!(result, Err(RelocateError::SourceMissing { .. })));
    }

    #[test]
    fn group_layout_nests_exact_duplicates() {
        let temp = TempDir::new().unwrap();
        let mut a = record_at(temp.path(), "a.png", 1);
        let b = record_at(temp.path(), "b.png", 2);
        let a_copy = record_at(temp.path(), "a-copy.png", 1);
        a.exact_duplicates.push(2);
        let records = vec![a, b, a_copy];

        let group = AlikeGroup {
            id: Uuid::new_v4(),
            members: vec![0, 1],
        };
        let relocator = Relocator::new(temp.path());

        let outcome = relocator.relocate_group(&group, &records, &null_sender());

        assert!(outcome.errors.is_empty());
        let group_dir = temp.path().join(format!("alike-{}", group.id));
        assert_eq!(outcome.directory.as_deref(), Some(group_dir.as_path()));

        let exact_dir = group_dir.join(format!("exact-{}", records[0].id.short(16)));
        assert!(exact_dir.join("a.png").exists());
        assert!(exact_dir.join("a-copy.png").exists());
        assert!(group_dir.join("b.png").exists());
        assert_eq!(outcome.moves.len(), 3);
        assert_eq!(outcome.moves[0].0, 2);
    }

    #[test]
    fn missing_member_is_collected_and_others_still_move() {
        let temp = TempDir::new().unwrap();
        let a = record_at(temp.path(), "a.png", 1);
        let b = record_at(temp.path(), "b.png", 2);
        fs::remove_file(&a.path).unwrap();
        let records = vec![a, b];

        let group = AlikeGroup {
            id: Uuid::new_v4(),
            members: vec![0, 1],
        };
        let outcome = Relocator::new(temp.path()).relocate_group(&group, &records, &null_sender());

        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.moves.len(), 1);
        assert!(outcome.moves[0].1.ends_with("b.png"));
    }
}
