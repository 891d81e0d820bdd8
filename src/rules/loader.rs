use crate::rules::schema::{RuleFile, ValidationError, ValidationIssue};
use crate::rules::RuleBook;
use crate::target::FileType;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug)]
pub enum RuleFileError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
    DuplicateFileType {
        file_type: FileType,
        first: PathBuf,
        second: PathBuf,
    },
    Walk(walkdir::Error),
}

impl RuleFileError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            RuleFileError::Toml { path: None, source } => RuleFileError::Toml {
                path: Some(path),
                source,
            },
            RuleFileError::Validation { path: None, source } => RuleFileError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for RuleFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleFileError::Io { path, source } => {
                write!(f, "failed to read rule file {}: {}", path.display(), source)
            }
            RuleFileError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse rule file TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse rule file TOML: {}", source),
            },
            RuleFileError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid rule file ({}): {}", path.display(), source),
                None => write!(f, "invalid rule file: {}", source),
            },
            RuleFileError::DuplicateFileType {
                file_type,
                first,
                second,
            } => write!(
                f,
                "both {} and {} provide rules for file type '{}'",
                first.display(),
                second.display(),
                file_type
            ),
            RuleFileError::Walk(e) => write!(f, "failed to scan rules directory: {}", e),
        }
    }
}

impl std::error::Error for RuleFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuleFileError::Io { source, .. } => Some(source),
            RuleFileError::Toml { source, .. } => Some(source),
            RuleFileError::Validation { source, .. } => Some(source),
            RuleFileError::DuplicateFileType { .. } => None,
            RuleFileError::Walk(e) => Some(e),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<RuleFile, RuleFileError> {
    let file: RuleFile = toml_edit::de::from_str(input)
        .map_err(|source| RuleFileError::Toml { path: None, source })?;
    file.validate()
        .map_err(|source| RuleFileError::Validation { path: None, source })?;
    Ok(file)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<RuleFile, RuleFileError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| RuleFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// File type a rule file applies to: `meta.file_type`, else the file stem.
fn file_type_of(path: &Path, file: &RuleFile) -> Option<FileType> {
    file.meta.file_type.or_else(|| {
        path.file_stem()
            .and_then(|s| s.to_str())
            .and_then(FileType::parse)
    })
}

/// Load every `*.toml` directly inside `dir` into a [`RuleBook`].
pub fn load_dir(dir: impl AsRef<Path>) -> Result<RuleBook, RuleFileError> {
    let dir = dir.as_ref();

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry.map_err(RuleFileError::Walk)?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    let mut book = RuleBook::default();
    let mut origins: Vec<(FileType, PathBuf)> = Vec::new();

    for path in files {
        let file = load_from_path(&path)?;
        let file_type = file_type_of(&path, &file).ok_or_else(|| RuleFileError::Validation {
            path: Some(path.clone()),
            source: ValidationError {
                issues: vec![ValidationIssue::MissingFileType],
            },
        })?;

        if let Some((_, first)) = origins.iter().find(|(t, _)| *t == file_type) {
            return Err(RuleFileError::DuplicateFileType {
                file_type,
                first: first.clone(),
                second: path,
            });
        }

        tracing::debug!(
            path = %path.display(),
            %file_type,
            "loaded rule file"
        );
        book.insert(file_type, file.to_rule_set());
        origins.push((file_type, path));
    }

    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Tier;

    const SAMPLE: &str = r#"
[meta]
name = "sample"
file_type = "chat"

[[exact]]
from = '"Account"'
to = '"账户"'

[[template]]
from = '"Agent always asks for review."'
to = '"代理始终请求确认。"'

[[variable]]
from = "`Hello ${user.name}`"
to = "`你好 ${user.name}`"
"#;

    #[test]
    fn test_load_from_str() {
        let file = load_from_str(SAMPLE).unwrap();
        assert_eq!(file.meta.file_type, Some(FileType::Chat));
        let set = file.to_rule_set();
        assert_eq!(set.name(), "sample");
        assert_eq!(set.len(), 3);
        assert_eq!(set.rules()[0].from, "\"Account\"");
        assert_eq!(set.rules()[2].tier, Tier::Variable);
    }

    #[test]
    fn test_load_from_str_rejects_bad_toml() {
        let err = load_from_str("[[exact]\nfrom = ").unwrap_err();
        assert!(matches!(err, RuleFileError::Toml { path: None, .. }));
    }

    #[test]
    fn test_load_from_path_attaches_path_to_validation_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("main.toml");
        fs::write(&path, "[[exact]]\nfrom = 'x'\nto = 'x'\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        match err {
            RuleFileError::Validation { path: Some(p), .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_dir_uses_stem_as_file_type() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join("main.toml"),
            "[[exact]]\nfrom = 'a'\nto = 'b'\n",
        )
        .unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let book = load_dir(temp_dir.path()).unwrap();
        assert!(book.get(FileType::Main).is_some());
        assert!(book.get(FileType::Chat).is_none());
    }

    #[test]
    fn test_load_dir_rejects_unknown_file_type() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join("misc.toml"),
            "[[exact]]\nfrom = 'a'\nto = 'b'\n",
        )
        .unwrap();

        let err = load_dir(temp_dir.path()).unwrap_err();
        assert!(matches!(err, RuleFileError::Validation { .. }));
    }

    #[test]
    fn test_load_dir_rejects_duplicate_file_type() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join("chat.toml"),
            "[[exact]]\nfrom = 'a'\nto = 'b'\n",
        )
        .unwrap();
        fs::write(
            temp_dir.path().join("extra.toml"),
            "[meta]\nfile_type = 'chat'\n\n[[exact]]\nfrom = 'c'\nto = 'd'\n",
        )
        .unwrap();

        let err = load_dir(temp_dir.path()).unwrap_err();
        assert!(matches!(
            err,
            RuleFileError::DuplicateFileType {
                file_type: FileType::Chat,
                ..
            }
        ));
    }
}
