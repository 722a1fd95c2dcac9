use crate::{DocId, IndexError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A corpus document: its id (parsed from the file name) and where to read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocEntry {
    pub doc_id: DocId,
    pub path: PathBuf,
}

/// List the regular files directly inside `dir`, sorted by numeric doc id.
/// Hidden files are ignored; any other name that is not a positive integer
/// is rejected.
pub fn list_documents(dir: &Path) -> Result<Vec<DocEntry>> {
    let mut docs = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => IndexError::Io(io),
            None => IndexError::Io(std::io::Error::other("filesystem loop in corpus directory")),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        let doc_id = match name.parse::<DocId>() {
            Ok(id) if id > 0 => id,
            _ => return Err(IndexError::InvalidDocName { path: entry.path().to_path_buf() }),
        };
        docs.push(DocEntry { doc_id, path: entry.into_path() });
    }
    docs.sort_by_key(|d| d.doc_id);
    Ok(docs)
}

/// Read a document's text. Bytes that are not valid UTF-8 are replaced.
pub fn read_document(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lists_numeric_files_in_numeric_order() {
        let dir = tempdir().unwrap();
        for name in ["10", "2", "1", ".DS_Store"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join("3")).unwrap();
        let docs = list_documents(dir.path()).unwrap();
        assert_eq!(docs.iter().map(|d| d.doc_id).collect::<Vec<_>>(), vec![1, 2, 10]);
        assert_eq!(docs[2].path, dir.path().join("10"));
    }

    #[test]
    fn rejects_non_numeric_and_zero_names() {
        for bad in ["readme.txt", "0"] {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join(bad), "x").unwrap();
            assert!(matches!(list_documents(dir.path()), Err(IndexError::InvalidDocName { .. })));
        }
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempdir().unwrap();
        let err = list_documents(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, IndexError::Io(_)));
    }

    #[test]
    fn lossy_read() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("1");
        fs::write(&p, [b'c', b'a', 0xff, b't']).unwrap();
        assert_eq!(read_document(&p).unwrap(), "ca\u{fffd}t");
    }
}
