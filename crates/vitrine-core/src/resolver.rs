//! Root-contained path resolution.
//!
//! A [`RootDir`] is a canonicalized directory. Every relative path handed to it
//! is joined, normalized and checked component-wise against the root, so
//! `../../etc/passwd`, absolute segments and sibling directories sharing a name
//! prefix (`jsons` vs `jsons-private`) are all rejected with
//! [`ContentError::PathTraversal`].
//!
//! [`JsonRoot`] layers the document naming scheme on top: a category and a
//! file name resolve to `{root}/{category}/{file}.json`.

use crate::error::{ContentError, Result};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Resolves `.` and `..` components without touching the filesystem.
///
/// `..` at the filesystem root stays at the root.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use vitrine_core::normalize_lexically;
///
/// assert_eq!(
///     normalize_lexically(Path::new("/srv/jsons/./a/../b.json")),
///     PathBuf::from("/srv/jsons/b.json")
/// );
/// ```
pub fn normalize_lexically(path: &Path) -> PathBuf {
	let mut normalized = PathBuf::new();
	for component in path.components() {
		match component {
			Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
			Component::CurDir => {}
			Component::ParentDir => {
				normalized.pop();
			}
			Component::Normal(segment) => normalized.push(segment),
		}
	}
	normalized
}

/// A canonical directory that resolved paths may not escape.
#[derive(Debug, Clone)]
pub struct RootDir {
	root: Arc<PathBuf>,
}

impl RootDir {
	/// Canonicalizes `path` and uses it as the containment root.
	///
	/// # Errors
	///
	/// Returns [`ContentError::RootUnavailable`] if the directory does not
	/// exist, cannot be canonicalized or is not a directory.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let root = std::fs::canonicalize(path).map_err(|source| ContentError::RootUnavailable {
			path: path.to_path_buf(),
			source,
		})?;

		if !root.is_dir() {
			return Err(ContentError::RootUnavailable {
				path: path.to_path_buf(),
				source: std::io::Error::other("not a directory"),
			});
		}

		Ok(Self {
			root: Arc::new(root),
		})
	}

	/// Returns the canonical root path.
	pub fn path(&self) -> &Path {
		&self.root
	}

	/// Returns true if `candidate` lies strictly below the root.
	///
	/// The comparison is component-wise; the root itself is not contained.
	pub fn contains(&self, candidate: &Path) -> bool {
		candidate != self.root.as_path() && candidate.starts_with(self.root.as_path())
	}

	/// Joins `relative` to the root and normalizes it without filesystem access.
	///
	/// # Errors
	///
	/// Returns [`ContentError::PathTraversal`] if the normalized path is not
	/// strictly inside the root.
	pub fn join_lexical(&self, relative: &Path) -> Result<PathBuf> {
		let normalized = normalize_lexically(&self.root.join(relative));
		if self.contains(&normalized) {
			Ok(normalized)
		} else {
			Err(ContentError::PathTraversal {
				requested: relative.display().to_string(),
			})
		}
	}

	/// Joins `relative` to the root and canonicalizes the result.
	///
	/// Symlinks are resolved when the target exists, and the resolved path is
	/// checked again. A path that does not exist yet is returned in its
	/// lexically normalized form, so the following read reports it as missing.
	///
	/// # Errors
	///
	/// Returns [`ContentError::PathTraversal`] if either the lexical or the
	/// resolved path escapes the root.
	pub async fn join(&self, relative: &Path) -> Result<PathBuf> {
		let lexical = self.join_lexical(relative)?;
		match tokio::fs::canonicalize(&lexical).await {
			Ok(resolved) if self.contains(&resolved) => Ok(resolved),
			Ok(resolved) => {
				tracing::warn!(
					requested = %relative.display(),
					resolved = %resolved.display(),
					"symlink resolves outside of root"
				);
				Err(ContentError::PathTraversal {
					requested: relative.display().to_string(),
				})
			}
			Err(_) => Ok(lexical),
		}
	}

	/// Maps a path reported by a filesystem notification back into the root.
	///
	/// Relative paths are joined to the root first. Returns `None` when the
	/// path lies outside the root.
	pub async fn locate(&self, reported: &Path) -> Option<PathBuf> {
		let joined = if reported.is_absolute() {
			reported.to_path_buf()
		} else {
			self.root.join(reported)
		};
		let lexical = normalize_lexically(&joined);
		if !self.contains(&lexical) {
			return None;
		}

		match tokio::fs::canonicalize(&lexical).await {
			Ok(resolved) if self.contains(&resolved) => Some(resolved),
			Ok(_) => None,
			// Deleted or renamed away; the lexical form is still the cache key.
			Err(_) => Some(lexical),
		}
	}
}

/// Canonical absolute path of a JSON document inside a [`JsonRoot`].
///
/// Only [`JsonRoot`] creates values of this type, so holding one means the
/// containment check already passed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath(PathBuf);

impl DocumentPath {
	/// Returns the path as a [`Path`].
	pub fn as_path(&self) -> &Path {
		&self.0
	}
}

impl AsRef<Path> for DocumentPath {
	fn as_ref(&self) -> &Path {
		&self.0
	}
}

/// The directory tree holding `{category}/{file}.json` documents.
#[derive(Debug, Clone)]
pub struct JsonRoot {
	dir: RootDir,
}

impl JsonRoot {
	/// Extension appended to every document name.
	pub const EXTENSION: &'static str = "json";

	/// Opens the JSON root at `path`.
	///
	/// # Errors
	///
	/// Returns [`ContentError::RootUnavailable`] if the directory is missing.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		Ok(Self {
			dir: RootDir::open(path)?,
		})
	}

	/// Returns the underlying [`RootDir`].
	pub fn dir(&self) -> &RootDir {
		&self.dir
	}

	/// Returns the canonical root path.
	pub fn path(&self) -> &Path {
		self.dir.path()
	}

	/// Resolves `{category}/{file}.json`.
	///
	/// # Errors
	///
	/// Returns [`ContentError::PathTraversal`] when the segments escape the root.
	///
	/// # Examples
	///
	/// ```rust,no_run
	/// use vitrine_core::JsonRoot;
	///
	/// # async fn example() -> vitrine_core::Result<()> {
	/// let root = JsonRoot::open("jsons")?;
	/// assert!(root.resolve("..", "passwd").await.is_err());
	/// # Ok(())
	/// # }
	/// ```
	pub async fn resolve(&self, category: &str, file: &str) -> Result<DocumentPath> {
		let relative = Path::new(category).join(Self::file_name(file));
		self.dir.join(&relative).await.map(DocumentPath)
	}

	/// Resolves a slash-separated relative document name such as
	/// `categories/pages`.
	///
	/// # Errors
	///
	/// Returns [`ContentError::PathTraversal`] when the name escapes the root.
	pub async fn resolve_relative(&self, name: &str) -> Result<DocumentPath> {
		let relative = PathBuf::from(format!("{}.{}", name, Self::EXTENSION));
		self.dir.join(&relative).await.map(DocumentPath)
	}

	/// See [`RootDir::locate`].
	pub async fn locate(&self, reported: &Path) -> Option<PathBuf> {
		self.dir.locate(reported).await
	}

	fn file_name(file: &str) -> String {
		format!("{}.{}", file, Self::EXTENSION)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ErrorKind;
	use rstest::rstest;
	use tempfile::TempDir;

	fn json_root() -> (TempDir, JsonRoot) {
		let temp_dir = TempDir::new().unwrap();
		let jsons = temp_dir.path().join("jsons");
		std::fs::create_dir_all(jsons.join("categories")).unwrap();
		std::fs::write(jsons.join("categories/pages.json"), r#"{"a":1}"#).unwrap();
		let root = JsonRoot::open(&jsons).unwrap();
		(temp_dir, root)
	}

	#[rstest]
	#[case("/srv/a/./b", "/srv/a/b")]
	#[case("/srv/a/../b", "/srv/b")]
	#[case("/srv/../../..", "/")]
	#[case("/srv//a///b/", "/srv/a/b")]
	fn test_normalize_lexically(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(normalize_lexically(Path::new(input)), PathBuf::from(expected));
	}

	#[rstest]
	fn test_open_missing_root() {
		let temp_dir = TempDir::new().unwrap();
		let err = RootDir::open(temp_dir.path().join("missing")).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::RootUnavailable);
	}

	#[rstest]
	fn test_open_file_as_root() {
		let temp_dir = TempDir::new().unwrap();
		let file = temp_dir.path().join("plain.txt");
		std::fs::write(&file, "x").unwrap();
		assert!(RootDir::open(&file).is_err());
	}

	#[rstest]
	#[tokio::test]
	async fn test_resolve_existing_document() {
		let (_temp_dir, root) = json_root();
		let path = root.resolve("categories", "pages").await.unwrap();
		assert_eq!(path.as_path(), root.path().join("categories/pages.json"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_resolve_relative_matches_pair() {
		let (_temp_dir, root) = json_root();
		let by_pair = root.resolve("categories", "pages").await.unwrap();
		let by_name = root.resolve_relative("categories/pages").await.unwrap();
		assert_eq!(by_pair, by_name);
	}

	#[rstest]
	#[tokio::test]
	async fn test_resolve_missing_document_is_not_traversal() {
		let (_temp_dir, root) = json_root();
		let path = root.resolve("categories", "absent").await.unwrap();
		assert_eq!(path.as_path(), root.path().join("categories/absent.json"));
	}

	#[rstest]
	#[case("..", "passwd")]
	#[case("../..", "etc/passwd")]
	#[case("categories", "../../outside")]
	#[case("/etc", "passwd")]
	#[case("categories/../..", "x")]
	#[tokio::test]
	async fn test_resolve_rejects_traversal(#[case] category: &str, #[case] file: &str) {
		let (_temp_dir, root) = json_root();
		let err = root.resolve(category, file).await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::PathTraversal);
	}

	#[rstest]
	#[tokio::test]
	async fn test_resolve_rejects_sibling_with_shared_prefix() {
		let (temp_dir, root) = json_root();
		let sibling = temp_dir.path().join("jsons-private");
		std::fs::create_dir_all(&sibling).unwrap();
		std::fs::write(sibling.join("secret.json"), "{}").unwrap();

		let err = root.resolve("../jsons-private", "secret").await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::PathTraversal);
	}

	#[rstest]
	#[tokio::test]
	async fn test_resolve_allows_inner_parent_segments() {
		let (_temp_dir, root) = json_root();
		let path = root.resolve("other/../categories", "pages").await.unwrap();
		assert_eq!(path.as_path(), root.path().join("categories/pages.json"));
	}

	#[cfg(unix)]
	#[rstest]
	#[tokio::test]
	async fn test_resolve_rejects_symlink_escape() {
		let (temp_dir, root) = json_root();
		let outside = temp_dir.path().join("outside.json");
		std::fs::write(&outside, "{}").unwrap();
		std::os::unix::fs::symlink(&outside, root.path().join("categories/link.json")).unwrap();

		let err = root.resolve("categories", "link").await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::PathTraversal);
	}

	#[rstest]
	#[tokio::test]
	async fn test_locate_relative_and_absolute() {
		let (_temp_dir, root) = json_root();
		let expected = root.path().join("categories/pages.json");

		let relative = root.locate(Path::new("categories/pages.json")).await;
		assert_eq!(relative, Some(expected.clone()));

		let absolute = root.locate(&expected).await;
		assert_eq!(absolute, Some(expected));
	}

	#[rstest]
	#[tokio::test]
	async fn test_locate_deleted_file_uses_lexical_path() {
		let (_temp_dir, root) = json_root();
		let located = root.locate(Path::new("categories/./gone.json")).await;
		assert_eq!(located, Some(root.path().join("categories/gone.json")));
	}

	#[rstest]
	#[tokio::test]
	async fn test_locate_outside_root() {
		let (_temp_dir, root) = json_root();
		assert_eq!(root.locate(Path::new("../elsewhere.json")).await, None);
		assert_eq!(root.locate(Path::new("/etc/passwd")).await, None);
		assert_eq!(root.locate(root.path()).await, None);
	}
}
