//! Embedding collaborator traits and the shared model handle.

use std::sync::Arc;

use async_trait::async_trait;
use conceptgraph_shared::{ConceptGraphError, Result};
use tokio::sync::OnceCell;
use tracing::info;

/// Maps strings to fixed-length vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Free model resources. The default does nothing.
    async fn release(&self) -> Result<()> {
        Ok(())
    }
}

/// Builds an [`Embedder`] on first use.
#[async_trait]
pub trait EmbedderLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn Embedder>>;
}

/// Cloneable handle to one lazily-loaded embedding model.
///
/// Every clone shares the same cell: the model is loaded at most once and
/// is never replaced afterwards, so one handle can serve every run of a
/// process.
#[derive(Clone)]
pub struct EmbedderHandle {
    cell: Arc<OnceCell<Arc<dyn Embedder>>>,
    loader: Option<Arc<dyn EmbedderLoader>>,
}

impl std::fmt::Debug for EmbedderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedderHandle")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl EmbedderHandle {
    /// Handle that loads its model through `loader` on first [`get`](Self::get).
    pub fn lazy(loader: Arc<dyn EmbedderLoader>) -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
            loader: Some(loader),
        }
    }

    /// Handle around an already-built model.
    pub fn ready(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            cell: Arc::new(OnceCell::new_with(Some(embedder))),
            loader: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// The shared model, loading it if this is the first call.
    ///
    /// A failed load leaves the cell empty so a later call can retry.
    pub async fn get(&self) -> Result<Arc<dyn Embedder>> {
        let embedder = self
            .cell
            .get_or_try_init(|| async {
                let loader = self.loader.as_ref().ok_or_else(|| {
                    ConceptGraphError::Embedding("no embedding model loader configured".into())
                })?;
                info!("loading embedding model");
                loader.load().await
            })
            .await?;
        Ok(Arc::clone(embedder))
    }

    /// Release the model if it was ever loaded.
    pub async fn release(&self) -> Result<()> {
        match self.cell.get() {
            Some(embedder) => embedder.release().await,
            None => Ok(()),
        }
    }
}
