//! File-backed persistence for the embedding matrix and its chunk metadata.
//!
//! A store directory holds exactly two files:
//!
//! - `embeddings.npy`: `n × dim` float32 matrix in NumPy `.npy` format
//! - `metas.json`: JSON array of `n` chunk records, row-aligned with the matrix
//!
//! The build step replaces both wholesale. Each file is written to a
//! temporary sibling and renamed into place, matrix first and metadata last,
//! so a reader sees either no store or a complete pair.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::document::Chunk;
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::inmemory::InMemoryVectorStore;

/// File name of the embedding matrix inside a store directory.
pub const EMBEDDINGS_FILE: &str = "embeddings.npy";
/// File name of the chunk metadata inside a store directory.
pub const METADATA_FILE: &str = "metas.json";

/// Builds and loads the persisted store in one directory.
///
/// # Example
///
/// ```rust,ignore
/// use busline_rag::{FileVectorStore, prepare_chunks};
///
/// let store = FileVectorStore::new("vectorstore/simple", embedder);
/// store.create(&prepare_chunks("data")?).await?;
/// let handle = store.load()?;
/// ```
#[derive(Debug, Clone)]
pub struct FileVectorStore {
    dir: PathBuf,
    embedder: Embedder,
}

impl FileVectorStore {
    /// Address a store directory. Nothing is read or created yet.
    pub fn new(dir: impl Into<PathBuf>, embedder: Embedder) -> Self {
        Self { dir: dir.into(), embedder }
    }

    /// The store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the embedding matrix file.
    pub fn embeddings_path(&self) -> PathBuf {
        self.dir.join(EMBEDDINGS_FILE)
    }

    /// Path of the metadata file.
    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Whether both persisted files are present.
    pub fn exists(&self) -> bool {
        self.embeddings_path().is_file() && self.metadata_path().is_file()
    }

    /// Embed `chunks` in one batch and replace the persisted store with them.
    ///
    /// Any existing store files are removed first, even if embedding later
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyChunks`] for an empty slice, or the embedding
    /// or I/O error that stopped the build.
    pub async fn create(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Err(RagError::EmptyChunks);
        }
        self.clear()?;

        info!(chunk_count = chunks.len(), dir = %self.dir.display(), "embedding chunks");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedder.embed(&texts).await?;

        self.write_pair(chunks, &embeddings)?;
        info!(chunk_count = chunks.len(), path = %self.embeddings_path().display(), "saved embeddings");
        Ok(())
    }

    /// Replace the persisted store with precomputed embeddings.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyChunks`] for an empty slice and
    /// [`RagError::ShapeMismatch`] if the row count differs from the chunk count.
    pub fn create_from_embeddings(&self, chunks: &[Chunk], embeddings: &Array2<f32>) -> Result<()> {
        if chunks.is_empty() {
            return Err(RagError::EmptyChunks);
        }
        if embeddings.nrows() != chunks.len() {
            return Err(RagError::ShapeMismatch { rows: embeddings.nrows(), chunks: chunks.len() });
        }
        self.clear()?;
        self.write_pair(chunks, embeddings)?;
        info!(chunk_count = chunks.len(), dir = %self.dir.display(), "saved precomputed embeddings");
        Ok(())
    }

    /// Load the persisted pair into a searchable handle.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::StoreMissing`] if either file is absent and
    /// [`RagError::StoreCorrupt`] if the pair does not line up.
    pub fn load(&self) -> Result<InMemoryVectorStore> {
        let embeddings_file = self.open_existing(&self.embeddings_path())?;
        let metadata_file = self.open_existing(&self.metadata_path())?;

        let embeddings = Array2::<f32>::read_npy(BufReader::new(embeddings_file))?;
        let chunks: Vec<Chunk> = serde_json::from_reader(BufReader::new(metadata_file))?;

        if embeddings.nrows() != chunks.len() {
            return Err(RagError::StoreCorrupt {
                dir: self.dir.clone(),
                message: format!(
                    "{} embedding rows but {} metadata records",
                    embeddings.nrows(),
                    chunks.len()
                ),
            });
        }

        info!(
            chunk_count = chunks.len(),
            dimensions = embeddings.ncols(),
            dir = %self.dir.display(),
            "loaded vector store"
        );
        InMemoryVectorStore::new(embeddings, chunks, self.embedder.clone())
    }

    fn open_existing(&self, path: &Path) -> Result<File> {
        File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RagError::StoreMissing { dir: self.dir.clone() },
            _ => RagError::Io(e),
        })
    }

    fn clear(&self) -> Result<()> {
        for path in [self.embeddings_path(), self.metadata_path()] {
            match fs::remove_file(&path) {
                Ok(()) => warn!(path = %path.display(), "removed previous store file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn write_pair(&self, chunks: &[Chunk], embeddings: &Array2<f32>) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let mut matrix = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(matrix.as_file_mut());
            embeddings.write_npy(&mut writer)?;
            writer.flush()?;
        }
        matrix.as_file().sync_all()?;
        matrix.persist(self.embeddings_path()).map_err(|e| e.error)?;

        let mut metadata = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(metadata.as_file_mut());
            serde_json::to_writer(&mut writer, chunks)?;
            writer.flush()?;
        }
        metadata.as_file().sync_all()?;
        metadata.persist(self.metadata_path()).map_err(|e| e.error)?;

        Ok(())
    }
}
