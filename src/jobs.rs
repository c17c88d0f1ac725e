//! Job Runner (C7): the three ingestion-pipeline stages, idempotent and
//! strictly ordered per document, parallel across documents (spec.md §4.5).
//!
//! The worker pool consumes a `flume` channel of `{document_id, stage}`
//! messages — `flume` is already used elsewhere in this crate for
//! high-performance MPMC — and serializes same-document work through a
//! sharded `DocumentId -> tokio::sync::Mutex<()>` table rather than one
//! global lock, generalizing the `Arc<RwLock<_>>` guarding pattern this
//! crate already uses for shared storage handles.

use crate::config::{ChunkingConfig, JobConfig, MetadataConfig};
use crate::error::Result;
use crate::llm::LlmGateway;
use crate::metadata::MetadataGenerator;
use crate::models::{Embedding, EmbeddingId, EmbeddableType};
use crate::models::{DocumentId, DocumentStatus, TextContent};
use crate::parser::{DocumentParser, ParseSource};
use crate::storage::Storage;
use crate::chunker::ContentChunker;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tracing::{error, info, warn};

/// One ingestion stage. `GenerateEmbeddings` carries optional per-call
/// chunk-size/overlap overrides (spec.md §4.5 job 3 signature).
#[derive(Debug, Clone)]
pub enum Stage {
    ExtractText,
    GenerateMetadata,
    GenerateEmbeddings {
        chunk_size: Option<usize>,
        overlap: Option<usize>,
    },
    /// Runs all three stages in strict order for one document.
    FullPipeline,
}

#[derive(Debug, Clone)]
struct JobMessage {
    document_id: DocumentId,
    stage: Stage,
}

/// Per-document keyed mutex table: same document's jobs never interleave,
/// different documents are independent.
#[derive(Default)]
struct DocumentLocks {
    locks: StdMutex<HashMap<DocumentId, Arc<AsyncMutex<()>>>>,
}

impl DocumentLocks {
    fn get(&self, id: DocumentId) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .unwrap()
            .entry(id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// Runs the extract_text / generate_metadata / generate_embeddings stages
/// against a `Storage` backend and `LlmGateway`.
pub struct JobRunner {
    storage: Arc<dyn Storage>,
    llm: Arc<LlmGateway>,
    chunking: ChunkingConfig,
    metadata_config: MetadataConfig,
    locks: DocumentLocks,
    concurrency: Arc<Semaphore>,
    tx: flume::Sender<JobMessage>,
    rx: flume::Receiver<JobMessage>,
}

impl JobRunner {
    pub fn new(
        storage: Arc<dyn Storage>,
        llm: Arc<LlmGateway>,
        chunking: ChunkingConfig,
        metadata_config: MetadataConfig,
        job_config: &JobConfig,
    ) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            storage,
            llm,
            chunking,
            metadata_config,
            locks: DocumentLocks::default(),
            concurrency: Arc::new(Semaphore::new(job_config.max_concurrent_documents.max(1))),
            tx,
            rx,
        }
    }

    /// Enqueues the full three-stage pipeline for `document_id`. The
    /// message is picked up by whichever worker task calls `run_worker`.
    pub fn enqueue_pipeline(&self, document_id: DocumentId) {
        let _ = self.tx.send(JobMessage {
            document_id,
            stage: Stage::FullPipeline,
        });
    }

    /// Spawns `count` worker tasks draining the queue. Returns their join
    /// handles so callers can await graceful shutdown after closing the
    /// sender side.
    pub fn spawn_workers(self: &Arc<Self>, count: usize) -> Vec<tokio::task::JoinHandle<()>> {
        (0..count.max(1))
            .map(|_| {
                let runner = Arc::clone(self);
                tokio::spawn(async move { runner.run_worker().await })
            })
            .collect()
    }

    async fn run_worker(self: Arc<Self>) {
        while let Ok(message) = self.rx.recv_async().await {
            let permit = self.concurrency.clone().acquire_owned().await;
            let runner = Arc::clone(&self);
            // Bound cross-document parallelism via the semaphore permit;
            // same-document ordering is separately enforced inside
            // `process` via the keyed lock.
            if let Err(e) = runner.process(message).await {
                error!("job processing failed: {e}");
            }
            drop(permit);
        }
    }

    async fn process(&self, message: JobMessage) -> Result<()> {
        let lock = self.locks.get(message.document_id);
        let _guard = lock.lock().await;
        match message.stage {
            Stage::ExtractText => self.extract_text(message.document_id).await,
            Stage::GenerateMetadata => self.generate_metadata(message.document_id).await,
            Stage::GenerateEmbeddings { chunk_size, overlap } => {
                self.generate_embeddings(message.document_id, chunk_size, overlap).await
            }
            Stage::FullPipeline => self.run_pipeline_locked(message.document_id).await,
        }
    }

    /// Runs all three stages for `document_id`, already holding the
    /// per-document lock. On any stage failure, transitions the document to
    /// `error` and does not run subsequent stages; the error is logged, not
    /// propagated (spec.md §7 "errors inside background jobs ... are not
    /// re-raised past the job boundary").
    async fn run_pipeline_locked(&self, document_id: DocumentId) -> Result<()> {
        if let Err(e) = self.extract_text(document_id).await {
            warn!("extract_text failed for {document_id}: {e}");
            let _ = self
                .storage
                .update_document_status(document_id, DocumentStatus::Error)
                .await;
            return Ok(());
        }
        if let Err(e) = self.generate_metadata(document_id).await {
            warn!("generate_metadata failed for {document_id}: {e}");
            let _ = self
                .storage
                .update_document_status(document_id, DocumentStatus::Error)
                .await;
            return Ok(());
        }
        if let Err(e) = self.generate_embeddings(document_id, None, None).await {
            warn!("generate_embeddings failed for {document_id}: {e}");
            let _ = self
                .storage
                .update_document_status(document_id, DocumentStatus::Error)
                .await;
            return Ok(());
        }

        if let Some(doc) = self.storage.get_document(document_id).await? {
            if doc.status != DocumentStatus::Error {
                self.storage
                    .update_document_status(document_id, DocumentStatus::Processed)
                    .await?;
            }
        }
        Ok(())
    }

    /// Runs the full pipeline synchronously without going through the
    /// queue — used by the client façade's `add_document`/`add_text` for
    /// immediate, awaited ingestion, and by tests.
    pub async fn run_pipeline(&self, document_id: DocumentId) -> Result<()> {
        let lock = self.locks.get(document_id);
        let _guard = lock.lock().await;
        self.run_pipeline_locked(document_id).await
    }

    /// Job 1: precondition is "file attached, content empty" (spec.md
    /// §4.5). No-op (success) if the document is missing, already has
    /// text content, or carries no file blob to parse.
    pub async fn extract_text(&self, document_id: DocumentId) -> Result<()> {
        let doc = match self.storage.get_document(document_id).await? {
            Some(d) => d,
            None => return Ok(()), // missing document: no-op success
        };

        let existing = self.storage.text_contents_for_document(document_id).await?;
        if !existing.is_empty() {
            return Ok(()); // already extracted: idempotent no-op
        }

        let blob = match &doc.file_blob {
            Some(b) => b.clone(),
            None => return Ok(()), // nothing to extract from
        };

        self.storage
            .update_document_status(document_id, DocumentStatus::Processing)
            .await?;

        let ext_hint = infer_extension(doc.document_type);
        let parsed = DocumentParser::parse(&ParseSource::Bytes {
            data: blob,
            hint: ext_hint,
        })?;

        if parsed.content.trim().is_empty() {
            self.storage
                .update_document_status(document_id, DocumentStatus::Error)
                .await?;
            return Ok(());
        }

        let content = TextContent {
            id: crate::models::ContentId::new(),
            document_id,
            content: parsed.content,
            embedding_model: self.llm.embed_model_name(),
            chunk_size: self.chunking.chunk_size,
            overlap: self.chunking.chunk_overlap,
            created_at: chrono::Utc::now(),
        };
        self.storage.insert_text_content(content).await?;

        info!("extract_text completed for {document_id}");
        Ok(())
    }

    /// Job 2: no-op if required metadata keys are already present.
    pub async fn generate_metadata(&self, document_id: DocumentId) -> Result<()> {
        let doc = match self.storage.get_document(document_id).await? {
            Some(d) => d,
            None => return Ok(()),
        };

        if MetadataGenerator::already_satisfied(doc.document_type, &doc.metadata) {
            return Ok(());
        }

        let contents = self.storage.text_contents_for_document(document_id).await?;
        let content_preview = contents
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let generator = MetadataGenerator::new(&self.llm, self.metadata_config.clone());
        let merged = generator
            .generate(doc.document_type, &content_preview, &doc.file_metadata, &doc.metadata)
            .await;

        self.storage.update_document_metadata(document_id, merged).await?;
        info!("generate_metadata completed for {document_id}");
        Ok(())
    }

    /// Job 3: no-op if any embeddings already exist for the document.
    /// Missing embed results (nil) are skipped, not errored.
    pub async fn generate_embeddings(
        &self,
        document_id: DocumentId,
        chunk_size: Option<usize>,
        overlap: Option<usize>,
    ) -> Result<()> {
        if self.storage.get_document(document_id).await?.is_none() {
            return Ok(());
        }

        if self.storage.embedding_count_for_document(document_id).await? > 0 {
            return Ok(());
        }

        let chunk_size = chunk_size.unwrap_or(self.chunking.chunk_size);
        let overlap = overlap.unwrap_or(self.chunking.chunk_overlap);
        let chunker = ContentChunker::new(ChunkingConfig {
            chunk_size,
            chunk_overlap: overlap,
            max_chunks: self.chunking.max_chunks,
        });

        let contents = self.storage.text_contents_for_document(document_id).await?;
        let mut embedded_any = false;

        for content in contents {
            let chunks = chunker.chunk(&content.content);
            for (index, chunk) in chunks.into_iter().enumerate() {
                let response = match self.llm.embed(&chunk).await {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("embed failed for chunk {index} of {document_id}: {e}");
                        continue; // skipped, not errored (spec.md §4.5)
                    }
                };
                if response.embedding.is_empty() {
                    continue; // nil result: skipped
                }

                let embedding = Embedding {
                    id: EmbeddingId::new(),
                    embeddable_type: EmbeddableType::TextContent,
                    embeddable_id: content.id,
                    document_id,
                    chunk_index: index,
                    content: chunk,
                    embedding_vector: response.embedding,
                    embedding_model: response.model,
                    usage_count: 0,
                    returned_at: None,
                    metadata: HashMap::new(),
                    created_at: chrono::Utc::now(),
                };
                self.storage.insert_embedding(embedding).await?;
                embedded_any = true;
            }
        }

        if embedded_any {
            info!("generate_embeddings completed for {document_id}");
        }
        Ok(())
    }
}

fn infer_extension(document_type: crate::models::DocumentType) -> Option<String> {
    use crate::models::DocumentType::*;
    match document_type {
        Pdf => Some("pdf".to_string()),
        Docx => Some("docx".to_string()),
        Html => Some("html".to_string()),
        Markdown => Some("md".to_string()),
        _ => Some("txt".to_string()),
    }
}
