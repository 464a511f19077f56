//! Main store implementation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, error, info};

use webcam_types::{Capture, ImageKey, MinuteBucket, StoredImage, Thumbnail};

use crate::error::{Error, Result};
use crate::guard::PendingFile;
use crate::thumbnail::{self, ThumbnailOptions};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Filesystem archive of verified images and their thumbnails.
///
/// The store holds no mutable state beyond the directories themselves, so a
/// single instance can be shared behind an `Arc` by the scheduler and the
/// gallery without locking.
#[derive(Debug, Clone)]
pub struct ImageStore {
    images_dir: PathBuf,
    thumbnails_dir: PathBuf,
    thumbnails: ThumbnailOptions,
}

impl ImageStore {
    /// Open a store, creating both directories if needed.
    pub fn open(
        images_dir: impl Into<PathBuf>,
        thumbnails_dir: impl Into<PathBuf>,
        thumbnails: ThumbnailOptions,
    ) -> Result<Self> {
        let images_dir = images_dir.into();
        let thumbnails_dir = thumbnails_dir.into();

        for dir in [&images_dir, &thumbnails_dir] {
            fs::create_dir_all(dir).map_err(|e| Error::CreateDirectory {
                path: dir.clone(),
                source: e,
            })?;
        }

        info!(
            "Opened image store (images: {}, thumbnails: {})",
            images_dir.display(),
            thumbnails_dir.display()
        );

        Ok(Self {
            images_dir,
            thumbnails_dir,
            thumbnails,
        })
    }

    /// Directory holding the originals.
    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Directory holding the thumbnails.
    pub fn thumbnails_dir(&self) -> &Path {
        &self.thumbnails_dir
    }

    // === Originals ===

    /// Persist a verified capture and deduplicate its minute bucket.
    ///
    /// Returns the image that survived the dedup pass, which is not
    /// necessarily the one just written. A capture reusing an existing key
    /// only replaces the stored original if it is strictly larger. Once an
    /// original is in place no later failure of this call removes it.
    pub fn commit(&self, capture: &Capture) -> Result<StoredImage> {
        let key = capture.key();
        let size = capture.len() as u64;

        match self.get(&key)? {
            Some(existing) if existing.size >= size => {
                info!(
                    "Keeping {} ({} bytes) over same-second capture ({} bytes)",
                    existing.file_name(),
                    existing.size,
                    size
                );
            }
            _ => {
                let path = write_atomic(&self.images_dir, &key.file_name(), &capture.bytes)?;
                debug!("Wrote {} ({} bytes)", path.display(), size);

                // Stale after a same-second replacement.
                if let Err(e) = self.remove_thumbnail(&key) {
                    error!("Failed to remove outdated thumbnail for {}: {}", key, e);
                }
            }
        }

        let survivor = self.dedup_bucket(key.bucket())?;
        survivor.ok_or_else(|| {
            Error::io(
                self.images_dir.join(key.file_name()),
                std::io::Error::new(ErrorKind::NotFound, "bucket empty after commit"),
            )
        })
    }

    /// Keep only the largest image in a minute bucket.
    ///
    /// Ties on size go to the earliest key. Losers are deleted together with
    /// their thumbnails. A loser that cannot be deleted is logged and left in
    /// place; the survivor is never touched.
    pub fn dedup_bucket(&self, bucket: MinuteBucket) -> Result<Option<StoredImage>> {
        let mut images = self.list_bucket(bucket)?;
        // Stable: equal sizes keep their listing order.
        images.sort_by(|a, b| b.size.cmp(&a.size));

        let mut images = images.into_iter();
        let Some(survivor) = images.next() else {
            return Ok(None);
        };

        for loser in images {
            if let Err(e) = self.remove(&loser) {
                error!("Failed to remove duplicate {}: {}", loser.file_name(), e);
                continue;
            }
            info!(
                "Removed duplicate {} ({} bytes), keeping {} ({} bytes)",
                loser.file_name(),
                loser.size,
                survivor.file_name(),
                survivor.size
            );
        }

        Ok(Some(survivor))
    }

    /// Delete an original and its thumbnail.
    pub fn remove(&self, image: &StoredImage) -> Result<()> {
        remove_if_exists(&image.path)?;
        self.remove_thumbnail(&image.key)
    }

    /// All originals, newest first.
    pub fn list(&self) -> Result<Vec<StoredImage>> {
        let mut images = self.scan()?;
        images.sort_by(|a, b| b.key.cmp(&a.key));
        Ok(images)
    }

    /// Originals in one minute bucket, oldest first.
    pub fn list_bucket(&self, bucket: MinuteBucket) -> Result<Vec<StoredImage>> {
        let mut images: Vec<_> = self
            .scan()?
            .into_iter()
            .filter(|image| bucket.contains(&image.key))
            .collect();
        images.sort_by_key(|image| image.key);
        Ok(images)
    }

    /// Look up the original stored under `key`.
    pub fn get(&self, key: &ImageKey) -> Result<Option<StoredImage>> {
        let path = self.images_dir.join(key.file_name());
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Some(StoredImage {
                key: *key,
                path,
                size: meta.len(),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Path of an original, given its file name.
    ///
    /// Only names of the form `image_<key>.jpg` are accepted.
    pub fn image_path(&self, file_name: &str) -> Result<PathBuf> {
        let key = ImageKey::from_file_name(file_name)?;
        Ok(self.images_dir.join(key.file_name()))
    }

    /// Path of a thumbnail, given its file name.
    ///
    /// Only names of the form `thumb_image_<key>.jpg` are accepted.
    pub fn thumbnail_path(&self, file_name: &str) -> Result<PathBuf> {
        let key = ImageKey::from_thumbnail_name(file_name)?;
        Ok(self.thumbnails_dir.join(key.thumbnail_name()))
    }

    fn scan(&self) -> Result<Vec<StoredImage>> {
        let entries = fs::read_dir(&self.images_dir).map_err(|e| Error::io(&self.images_dir, e))?;

        let mut images = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&self.images_dir, e))?;
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(|n| ImageKey::from_file_name(n).ok()) else {
                continue;
            };

            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("{} vanished while listing", entry.path().display());
                    continue;
                }
                Err(e) => return Err(Error::io(entry.path(), e)),
            };
            if !meta.is_file() {
                continue;
            }

            images.push(StoredImage {
                key,
                path: entry.path(),
                size: meta.len(),
            });
        }
        Ok(images)
    }

    // === Thumbnails ===

    /// Thumbnail for `image`, generating it on first use.
    ///
    /// Failures are logged and yield `None`.
    pub fn thumbnail(&self, image: &StoredImage) -> Option<Thumbnail> {
        match self.ensure_thumbnail(image) {
            Ok(thumb) => Some(thumb),
            Err(e) => {
                error!("Failed to create thumbnail for {}: {}", image.file_name(), e);
                None
            }
        }
    }

    /// Thumbnail for `image`, generating it if it does not exist yet.
    ///
    /// An existing thumbnail is returned untouched.
    pub fn ensure_thumbnail(&self, image: &StoredImage) -> Result<Thumbnail> {
        let name = image.thumbnail_name();
        let path = self.thumbnails_dir.join(&name);

        match fs::metadata(&path) {
            Ok(_) => {
                return Ok(Thumbnail {
                    key: image.key,
                    path,
                });
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io(path, e)),
        }

        let original = fs::read(&image.path).map_err(|e| Error::io(&image.path, e))?;
        let rendered = thumbnail::render(&original, &self.thumbnails).map_err(|e| Error::Codec {
            path: image.path.clone(),
            source: e,
        })?;
        let path = write_atomic(&self.thumbnails_dir, &name, &rendered)?;
        debug!("Created thumbnail {} ({} bytes)", name, rendered.len());

        Ok(Thumbnail {
            key: image.key,
            path,
        })
    }

    fn remove_thumbnail(&self, key: &ImageKey) -> Result<()> {
        remove_if_exists(&self.thumbnails_dir.join(key.thumbnail_name()))
    }
}

/// Write `bytes` to `dir/name` through a hidden temporary file and a rename.
fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let temp_path = dir.join(format!(".{name}.{}.{counter}.tmp", std::process::id()));
    let target = dir.join(name);

    let temp = PendingFile::new(&temp_path);
    fs::write(&temp_path, bytes).map_err(|e| Error::io(&temp_path, e))?;
    fs::rename(&temp_path, &target).map_err(|e| Error::io(&target, e))?;
    temp.keep();

    Ok(target)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thumbnail::test_support::{jpeg, jpeg_of_size};
    use chrono::{DateTime, TimeZone};
    use chrono_tz::Europe::Prague;
    use chrono_tz::Tz;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Tz> {
        Prague.with_ymd_and_hms(2024, 6, 1, h, m, s).unwrap()
    }

    fn open_store(dir: &tempfile::TempDir) -> ImageStore {
        ImageStore::open(
            dir.path().join("images"),
            dir.path().join("thumbnails"),
            ThumbnailOptions::default(),
        )
        .unwrap()
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_open_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        assert!(store.images_dir().is_dir());
        assert!(store.thumbnails_dir().is_dir());
    }

    #[test]
    fn test_commit_writes_original() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let stored = store
            .commit(&Capture::new(jpeg_of_size(1000), at(12, 0, 3)))
            .unwrap();

        assert_eq!(stored.file_name(), "image_20240601_120003.jpg");
        assert_eq!(stored.size, 1000);
        assert_eq!(fs::read(&stored.path).unwrap().len(), 1000);
        assert_eq!(
            file_names(store.images_dir()),
            vec!["image_20240601_120003.jpg"]
        );
    }

    #[test]
    fn test_larger_capture_replaces_smaller_in_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let first = store
            .commit(&Capture::new(jpeg_of_size(1000), at(12, 0, 3)))
            .unwrap();
        store.thumbnail(&first).unwrap();

        let second = store
            .commit(&Capture::new(jpeg_of_size(1200), at(12, 0, 45)))
            .unwrap();

        assert_eq!(second.file_name(), "image_20240601_120045.jpg");
        assert_eq!(second.size, 1200);
        assert_eq!(
            file_names(store.images_dir()),
            vec!["image_20240601_120045.jpg"]
        );
        // The loser's thumbnail went with it.
        assert!(file_names(store.thumbnails_dir()).is_empty());
    }

    #[test]
    fn test_smaller_capture_loses_and_commit_returns_survivor() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store
            .commit(&Capture::new(jpeg_of_size(1200), at(12, 0, 3)))
            .unwrap();
        let survivor = store
            .commit(&Capture::new(jpeg_of_size(1000), at(12, 0, 45)))
            .unwrap();

        assert_eq!(survivor.file_name(), "image_20240601_120003.jpg");
        assert_eq!(survivor.size, 1200);
        assert_eq!(
            file_names(store.images_dir()),
            vec!["image_20240601_120003.jpg"]
        );
    }

    #[test]
    fn test_same_second_smaller_capture_keeps_stored_original() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store
            .commit(&Capture::new(jpeg_of_size(1500), at(12, 0, 3)))
            .unwrap();
        let survivor = store
            .commit(&Capture::new(jpeg_of_size(1000), at(12, 0, 3)))
            .unwrap();

        assert_eq!(survivor.size, 1500);
        assert_eq!(fs::read(&survivor.path).unwrap().len(), 1500);
        assert_eq!(
            file_names(store.images_dir()),
            vec!["image_20240601_120003.jpg"]
        );
    }

    #[test]
    fn test_same_second_larger_capture_replaces_original_and_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        let first = store
            .commit(&Capture::new(jpeg_of_size(1000), at(12, 0, 3)))
            .unwrap();
        store.thumbnail(&first).unwrap();

        let survivor = store
            .commit(&Capture::new(jpeg_of_size(1500), at(12, 0, 3)))
            .unwrap();

        assert_eq!(survivor.size, 1500);
        assert_eq!(fs::read(&survivor.path).unwrap().len(), 1500);
        assert!(file_names(store.thumbnails_dir()).is_empty());
    }

    #[test]
    fn test_failed_loser_removal_keeps_survivor() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store
            .commit(&Capture::new(jpeg_of_size(1000), at(12, 0, 3)))
            .unwrap();
        // A non-empty directory where the loser's thumbnail belongs cannot be
        // removed as a file.
        let blocker = store.thumbnails_dir().join("thumb_image_20240601_120003.jpg");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), b"x").unwrap();

        let survivor = store
            .commit(&Capture::new(jpeg_of_size(1200), at(12, 0, 45)))
            .unwrap();

        assert_eq!(survivor.file_name(), "image_20240601_120045.jpg");
        assert_eq!(survivor.size, 1200);
        assert!(
            file_names(store.images_dir()).contains(&"image_20240601_120045.jpg".to_string())
        );
        assert_eq!(fs::read(&survivor.path).unwrap().len(), 1200);
    }

    #[test]
    fn test_equal_sizes_keep_earliest() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store
            .commit(&Capture::new(jpeg_of_size(1000), at(12, 0, 3)))
            .unwrap();
        let survivor = store
            .commit(&Capture::new(jpeg_of_size(1000), at(12, 0, 30)))
            .unwrap();

        assert_eq!(survivor.file_name(), "image_20240601_120003.jpg");
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_different_minutes_are_not_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store
            .commit(&Capture::new(jpeg_of_size(1000), at(12, 0, 59)))
            .unwrap();
        store
            .commit(&Capture::new(jpeg_of_size(1200), at(12, 1, 1)))
            .unwrap();

        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_dedup_bucket_keeps_maximum() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        // Bypass commit so the bucket really holds several files.
        for (s, size) in [(5, 900), (17, 1500), (40, 1100)] {
            let key = ImageKey::from_local(&at(8, 30, s));
            fs::write(store.images_dir().join(key.file_name()), vec![0u8; size]).unwrap();
        }
        let other = ImageKey::from_local(&at(8, 31, 0));
        fs::write(store.images_dir().join(other.file_name()), vec![0u8; 10]).unwrap();

        let survivor = store
            .dedup_bucket(ImageKey::from_local(&at(8, 30, 0)).bucket())
            .unwrap()
            .unwrap();

        assert_eq!(survivor.file_name(), "image_20240601_083017.jpg");
        assert_eq!(
            file_names(store.images_dir()),
            vec!["image_20240601_083017.jpg", "image_20240601_083100.jpg"]
        );
    }

    #[test]
    fn test_dedup_empty_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let bucket = ImageKey::from_local(&at(3, 0, 0)).bucket();
        assert!(store.dedup_bucket(bucket).unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first_and_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        for (h, m) in [(9, 15), (18, 2), (6, 45), (12, 0)] {
            let key = ImageKey::from_local(&at(h, m, 0));
            fs::write(store.images_dir().join(key.file_name()), b"x").unwrap();
        }
        fs::write(store.images_dir().join("notes.txt"), b"x").unwrap();
        fs::write(store.images_dir().join("image_2024.jpg"), b"x").unwrap();
        fs::write(
            store
                .images_dir()
                .join(".image_20240601_070000.jpg.1.0.tmp"),
            b"x",
        )
        .unwrap();
        fs::create_dir(store.images_dir().join("image_20240601_230000.jpg")).unwrap();

        let keys: Vec<String> = store
            .list()
            .unwrap()
            .iter()
            .map(|i| i.key.to_string())
            .collect();

        assert_eq!(
            keys,
            vec![
                "20240601_180200",
                "20240601_120000",
                "20240601_091500",
                "20240601_064500"
            ]
        );
    }

    #[test]
    fn test_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let stored = store
            .commit(&Capture::new(jpeg_of_size(1000), at(12, 0, 3)))
            .unwrap();

        assert_eq!(store.get(&stored.key).unwrap(), Some(stored));
        let missing = ImageKey::from_local(&at(13, 0, 0));
        assert_eq!(store.get(&missing).unwrap(), None);
    }

    #[test]
    fn test_thumbnail_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let stored = store
            .commit(&Capture::new(jpeg(800, 600), at(12, 0, 3)))
            .unwrap();

        let first = store.thumbnail(&stored).unwrap();
        let bytes = fs::read(&first.path).unwrap();
        let second = store.thumbnail(&stored).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.file_name(), "thumb_image_20240601_120003.jpg");
        assert_eq!(fs::read(&second.path).unwrap(), bytes);
        assert_eq!(
            file_names(store.thumbnails_dir()),
            vec!["thumb_image_20240601_120003.jpg"]
        );

        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (400, 300));
    }

    #[test]
    fn test_existing_thumbnail_is_not_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let stored = store
            .commit(&Capture::new(jpeg(800, 600), at(12, 0, 3)))
            .unwrap();
        let path = store.thumbnails_dir().join(stored.thumbnail_name());
        fs::write(&path, b"placeholder").unwrap();

        let thumb = store.ensure_thumbnail(&stored).unwrap();

        assert_eq!(thumb.path, path);
        assert_eq!(fs::read(&path).unwrap(), b"placeholder");
    }

    #[test]
    fn test_undecodable_original_yields_no_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let stored = store
            .commit(&Capture::new(&b"definitely not a jpeg"[..], at(12, 0, 3)))
            .unwrap();

        assert!(store.thumbnail(&stored).is_none());
        assert!(matches!(
            store.ensure_thumbnail(&stored),
            Err(Error::Codec { .. })
        ));
        assert!(file_names(store.thumbnails_dir()).is_empty());
    }

    #[test]
    fn test_missing_original_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let stored = store
            .commit(&Capture::new(jpeg_of_size(1000), at(12, 0, 3)))
            .unwrap();
        fs::remove_file(&stored.path).unwrap();

        let err = store.ensure_thumbnail(&stored).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_path_lookups_validate_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        assert_eq!(
            store.image_path("image_20240601_120003.jpg").unwrap(),
            store.images_dir().join("image_20240601_120003.jpg")
        );
        assert_eq!(
            store.thumbnail_path("thumb_image_20240601_120003.jpg").unwrap(),
            store.thumbnails_dir().join("thumb_image_20240601_120003.jpg")
        );

        for bad in [
            "../etc/passwd",
            "image_20240601_120003.jpg/../../x",
            "image_../../20240601.jpg",
            "thumb_image_20240601_120003.jpg",
        ] {
            assert!(
                matches!(store.image_path(bad), Err(Error::InvalidFileName(_))),
                "{bad}"
            );
        }
        assert!(store.thumbnail_path("image_20240601_120003.jpg").is_err());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let stored = store
            .commit(&Capture::new(jpeg(64, 64), at(12, 0, 3)))
            .unwrap();
        store.thumbnail(&stored).unwrap();

        assert!(
            file_names(store.images_dir())
                .iter()
                .chain(file_names(store.thumbnails_dir()).iter())
                .all(|name| !name.ends_with(".tmp"))
        );
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(32))]

        #[test]
        fn prop_dedup_leaves_one_maximum(sizes in proptest::collection::vec(1usize..4096, 1..8)) {
            let dir = tempfile::tempdir().unwrap();
            let store = open_store(&dir);
            for (second, size) in sizes.iter().enumerate() {
                let key = ImageKey::from_local(&at(14, 7, second as u32));
                fs::write(store.images_dir().join(key.file_name()), vec![0u8; *size]).unwrap();
            }

            let bucket = ImageKey::from_local(&at(14, 7, 0)).bucket();
            let survivor = store.dedup_bucket(bucket).unwrap().unwrap();
            let max = *sizes.iter().max().unwrap() as u64;
            let first_max = sizes.iter().position(|s| *s as u64 == max).unwrap();

            proptest::prop_assert_eq!(survivor.size, max);
            proptest::prop_assert_eq!(survivor.key, ImageKey::from_local(&at(14, 7, first_max as u32)));
            proptest::prop_assert_eq!(store.list().unwrap(), vec![survivor]);
        }
    }
}
