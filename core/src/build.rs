use crate::corpus::{list_documents, read_document};
use crate::persist::{save_meta, write_index, IndexMeta, IndexPaths, PostingsEncoding};
use crate::postings::{PostingsBuilder, PostingsMap};
use crate::tokenizer::tokenize;
use crate::Result;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildConfig {
    pub encoding: PostingsEncoding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub num_docs: u32,
    pub num_terms: usize,
}

/// Index every document under `corpus_dir` and write the postings and
/// dictionary artifacts. Either both artifacts are replaced or neither is.
pub fn build_index(corpus_dir: &Path, paths: &IndexPaths, config: &BuildConfig) -> Result<BuildSummary> {
    let docs = list_documents(corpus_dir)?;
    tracing::info!(corpus = %corpus_dir.display(), documents = docs.len(), "enumerated corpus");

    let mut builder = PostingsBuilder::new();
    for doc in &docs {
        let text = read_document(&doc.path)?;
        builder.add_document(doc.doc_id, tokenize(&text))?;
    }
    let num_terms = builder.num_terms();
    let (postings, num_docs) = builder.finish();
    tracing::info!(num_docs, num_terms, "ingested documents");

    write_artifacts(&postings, num_docs, paths, config.encoding)?;
    tracing::info!(
        dictionary = %paths.dictionary.display(),
        postings = %paths.postings.display(),
        encoding = %config.encoding,
        "index build complete"
    );
    Ok(BuildSummary { num_docs, num_terms })
}

/// Write both artifacts to staging files, then rename them into place with the
/// dictionary last. An existing postings file is kept aside until the new
/// dictionary is in place and restored if that rename fails, so a dictionary
/// never points at postings from another build. Staging files are removed if
/// anything fails.
pub fn write_artifacts(
    postings: &PostingsMap,
    num_docs: u32,
    paths: &IndexPaths,
    encoding: PostingsEncoding,
) -> Result<IndexMeta> {
    let staged_postings = IndexPaths::staging(&paths.postings);
    let staged_dictionary = IndexPaths::staging(&paths.dictionary);

    let result = write_staged(postings, num_docs, encoding, &staged_postings, &staged_dictionary)
        .and_then(|meta| install(paths, &staged_postings, &staged_dictionary).map(|()| meta));
    if result.is_err() {
        let _ = fs::remove_file(&staged_postings);
        let _ = fs::remove_file(&staged_dictionary);
    }
    result
}

fn install(paths: &IndexPaths, staged_postings: &Path, staged_dictionary: &Path) -> Result<()> {
    let backup = IndexPaths::backup(&paths.postings);
    let had_previous = paths.postings.is_file();
    if had_previous {
        fs::rename(&paths.postings, &backup)?;
    }
    let swapped = fs::rename(staged_postings, &paths.postings)
        .and_then(|()| fs::rename(staged_dictionary, &paths.dictionary));
    match swapped {
        Ok(()) => {
            if had_previous {
                let _ = fs::remove_file(&backup);
            }
            Ok(())
        }
        Err(e) => {
            if had_previous {
                if let Err(restore) = fs::rename(&backup, &paths.postings) {
                    tracing::error!(backup = %backup.display(), error = %restore, "could not restore previous postings");
                }
            }
            Err(e.into())
        }
    }
}

fn write_staged(
    postings: &PostingsMap,
    num_docs: u32,
    encoding: PostingsEncoding,
    postings_path: &Path,
    dictionary_path: &Path,
) -> Result<IndexMeta> {
    let out = BufWriter::new(File::create(postings_path)?);
    let (out, meta) = write_index(postings, num_docs, out, encoding)?;
    let file = out.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;

    let dict = File::create(dictionary_path)?;
    save_meta(&dict, &meta)?;
    dict.sync_all()?;
    Ok(meta)
}
