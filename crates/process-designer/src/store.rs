//! Flow storage with file persistence.
//!
//! One pretty-printed `<flow id>.json` file per flow, plus the read-only
//! business-flow directory used for default naming.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::sync::RwLock;

use crate::collaborators::{find_business_flow, BusinessFlow, FlowLookup, FlowSink};
use crate::document::{mint_flow_id, FlowDocument, FlowStatus};
use crate::error::{DesignerError, Result};

/// File name of the business-flow tree
pub const BUSINESS_FLOW_FILE: &str = "businessFlow.json";

/// Store shared between request handlers and sinks
pub type SharedFlowStore = Arc<RwLock<FlowStore>>;

/// Reject IDs that would not name a single file inside the flows directory
fn check_flow_id(id: &str) -> Result<()> {
    let plain = !id.is_empty()
        && id != "."
        && !id.contains("..")
        && !id.contains(|c: char| matches!(c, '/' | '\\' | '\0'));
    if plain {
        Ok(())
    } else {
        Err(DesignerError::InvalidDocument(format!("Invalid flow id {:?}", id)))
    }
}

fn flow_file(dir: &Path, id: &str) -> Result<PathBuf> {
    check_flow_id(id)?;
    Ok(dir.join(format!("{}.json", id)))
}

/// In-memory flow store with optional file persistence.
///
/// # Example
///
/// ```ignore
/// let mut store = FlowStore::with_persistence("data/process-flows");
/// let count = store.load_from_disk().await?;
/// let saved = store.create(document).await?;
/// ```
#[derive(Debug, Default)]
pub struct FlowStore {
    /// Stored flows, keyed by flow ID.
    flows: HashMap<String, FlowDocument>,
    /// Optional path for file persistence.
    persist_path: Option<PathBuf>,
}

impl FlowStore {
    /// Create a new in-memory store without persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that persists to the given directory.
    ///
    /// The directory will be created if it doesn't exist when saving.
    pub fn with_persistence(path: impl AsRef<Path>) -> Self {
        Self {
            flows: HashMap::new(),
            persist_path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Wrap the store for sharing across tasks.
    pub fn into_shared(self) -> SharedFlowStore {
        Arc::new(RwLock::new(self))
    }

    /// Load all flows from the persistence directory.
    ///
    /// Returns the number of flows loaded. Unparsable files are skipped.
    pub async fn load_from_disk(&mut self) -> Result<usize> {
        let Some(path) = self.persist_path.clone() else {
            return Ok(0);
        };

        if !fs::try_exists(&path).await? {
            return Ok(0);
        }

        let mut count = 0;
        let mut entries = fs::read_dir(&path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_path = entry.path();

            if file_path.extension().is_some_and(|e| e == "json") {
                let content = fs::read_to_string(&file_path).await?;
                match FlowDocument::from_json(&content) {
                    Ok(document) if check_flow_id(document.id()).is_ok() => {
                        log::info!("Loaded flow '{}' from {:?}", document.id(), file_path);
                        self.flows.insert(document.id().to_string(), document);
                        count += 1;
                    }
                    Ok(document) => {
                        log::warn!("Skipping flow with id {:?} in {:?}", document.id(), file_path);
                    }
                    Err(e) => {
                        log::warn!("Failed to parse flow from {:?}: {}", file_path, e);
                    }
                }
            }
        }
        Ok(count)
    }

    async fn save_to_disk(&self, document: &FlowDocument) -> Result<()> {
        let Some(ref path) = self.persist_path else {
            return Ok(());
        };

        fs::create_dir_all(path).await?;
        let file_path = flow_file(path, document.id())?;
        fs::write(&file_path, document.to_json_pretty()?).await?;
        log::debug!("Saved flow '{}' to {:?}", document.id(), file_path);
        Ok(())
    }

    async fn delete_from_disk(&self, id: &str) -> Result<()> {
        let Some(ref path) = self.persist_path else {
            return Ok(());
        };

        let file_path = flow_file(path, id)?;
        if fs::try_exists(&file_path).await? {
            fs::remove_file(&file_path).await?;
            log::debug!("Deleted flow '{}' from {:?}", id, file_path);
        }
        Ok(())
    }

    fn warn_on_invalid(document: &FlowDocument) {
        for problem in document.validate() {
            log::warn!("Flow '{}': {}", document.id(), problem);
        }
    }

    fn unused_id(&self) -> String {
        let base = mint_flow_id();
        let mut candidate = base.clone();
        let mut n = 1;
        while self.flows.contains_key(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        candidate
    }

    /// Store a new flow, minting an ID when it has none.
    pub async fn create(&mut self, mut document: FlowDocument) -> Result<FlowDocument> {
        if document.metadata.name.trim().is_empty() {
            return Err(DesignerError::InvalidDocument(
                "Missing required field (name)".into(),
            ));
        }
        if document.metadata.id.is_empty() {
            document.metadata.id = self.unused_id();
        } else {
            check_flow_id(document.id())?;
            if self.flows.contains_key(&document.metadata.id) {
                return Err(DesignerError::InvalidDocument(format!(
                    "Flow '{}' already exists",
                    document.metadata.id
                )));
            }
        }

        let now = Utc::now();
        document.metadata.created_at = Some(now);
        document.metadata.updated_at = Some(now);

        Self::warn_on_invalid(&document);
        self.save_to_disk(&document).await?;
        self.flows.insert(document.id().to_string(), document.clone());
        log::info!("Created flow '{}'", document.id());
        Ok(document)
    }

    /// Replace an existing flow, keeping its creation time.
    pub async fn update(&mut self, mut document: FlowDocument) -> Result<FlowDocument> {
        if document.metadata.id.is_empty() {
            return Err(DesignerError::InvalidDocument(
                "Missing required field (id)".into(),
            ));
        }
        check_flow_id(document.id())?;
        let existing = self
            .flows
            .get(document.id())
            .ok_or_else(|| DesignerError::FlowNotFound(document.metadata.id.clone()))?;

        document.metadata.created_at = existing.metadata.created_at;
        document.metadata.updated_at = Some(Utc::now());

        Self::warn_on_invalid(&document);
        self.save_to_disk(&document).await?;
        self.flows.insert(document.id().to_string(), document.clone());
        Ok(document)
    }

    /// Update when the ID is known, otherwise create.
    pub async fn upsert(&mut self, document: FlowDocument) -> Result<FlowDocument> {
        if self.flows.contains_key(document.id()) {
            self.update(document).await
        } else {
            self.create(document).await
        }
    }

    pub fn get(&self, id: &str) -> Option<&FlowDocument> {
        self.flows.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.flows.contains_key(id)
    }

    /// Remove a flow by ID.
    ///
    /// Returns the removed flow if it existed. Unknown IDs never reach the disk.
    pub async fn remove(&mut self, id: &str) -> Result<Option<FlowDocument>> {
        if !self.flows.contains_key(id) {
            return Ok(None);
        }
        self.delete_from_disk(id).await?;
        Ok(self.flows.remove(id))
    }

    /// All flows, oldest first.
    pub fn list(&self) -> Vec<FlowDocument> {
        let mut flows: Vec<FlowDocument> = self.flows.values().cloned().collect();
        flows.sort_by(|a, b| {
            a.metadata
                .created_at
                .cmp(&b.metadata.created_at)
                .then_with(|| a.metadata.id.cmp(&b.metadata.id))
        });
        flows
    }

    /// Flows linked to a business flow, oldest first.
    pub fn by_business_flow(&self, business_flow_id: &str) -> Vec<FlowDocument> {
        self.list()
            .into_iter()
            .filter(|f| f.metadata.business_flow_id.as_deref() == Some(business_flow_id))
            .collect()
    }

    /// Move a flow from draft to active.
    pub async fn publish(&mut self, id: &str) -> Result<FlowDocument> {
        let mut document = self
            .flows
            .get(id)
            .cloned()
            .ok_or_else(|| DesignerError::FlowNotFound(id.to_string()))?;

        document.metadata.status = FlowStatus::Active;
        document.metadata.updated_at = Some(Utc::now());

        self.save_to_disk(&document).await?;
        self.flows.insert(id.to_string(), document.clone());
        log::info!("Published flow '{}'", id);
        Ok(document)
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

/// [`FlowSink`] writing into a shared [`FlowStore`]
#[derive(Debug, Clone)]
pub struct StoreSink {
    store: SharedFlowStore,
}

impl StoreSink {
    pub fn new(store: SharedFlowStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FlowSink for StoreSink {
    async fn save(&self, document: FlowDocument) -> Result<FlowDocument> {
        self.store.write().await.upsert(document).await
    }

    async fn publish(&self, flow_id: &str) -> Result<()> {
        self.store.write().await.publish(flow_id).await.map(|_| ())
    }
}

/// Read-only view of `businessFlow.json`
#[derive(Debug, Clone)]
pub struct BusinessFlowDirectory {
    path: PathBuf,
}

impl BusinessFlowDirectory {
    /// Directory backed by `<data_dir>/businessFlow.json`
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(BUSINESS_FLOW_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole tree; a missing or blank file is an empty tree
    pub async fn load(&self) -> Result<Vec<BusinessFlow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            DesignerError::lookup(format!("Failed to parse {:?}: {}", self.path, e))
        })
    }
}

#[async_trait]
impl FlowLookup for BusinessFlowDirectory {
    async fn business_flow(&self, id: &str) -> Result<Option<BusinessFlow>> {
        let flows = self.load().await?;
        Ok(find_business_flow(&flows, id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FlowMetadata, ProcessType};
    use crate::ids::IdGenerator;
    use crate::types::ProcessGraph;
    use tempfile::TempDir;

    fn document(name: &str, business_flow_id: Option<&str>) -> FlowDocument {
        let mut metadata = FlowMetadata::new(name, ProcessType::Project);
        metadata.business_flow_id = business_flow_id.map(String::from);
        FlowDocument::new(ProcessGraph::initial(&IdGenerator::new()), metadata)
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let mut store = FlowStore::new();

        let created = store.create(document("报销流程", Some("bf_1"))).await.unwrap();
        assert!(created.id().starts_with("flow_"));
        assert!(created.metadata.created_at.is_some());
        assert_eq!(created.metadata.created_at, created.metadata.updated_at);

        assert!(store.get(created.id()).is_some());
        assert_eq!(store.by_business_flow("bf_1").len(), 1);
        assert!(store.by_business_flow("bf_2").is_empty());

        let removed = store.remove(created.id()).await.unwrap();
        assert!(removed.is_some());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let mut store = FlowStore::new();
        let result = store.create(document("  ", None)).await;
        assert!(matches!(result, Err(DesignerError::InvalidDocument(_))));
    }

    #[tokio::test]
    async fn test_minted_ids_do_not_collide() {
        let mut store = FlowStore::new();
        let a = store.create(document("a", None)).await.unwrap();
        let b = store.create(document("b", None)).await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let mut store = FlowStore::new();
        let created = store.create(document("v1", None)).await.unwrap();

        let mut edited = created.clone();
        edited.metadata.name = "v2".into();
        edited.metadata.created_at = None;
        let updated = store.update(edited).await.unwrap();

        assert_eq!(updated.metadata.created_at, created.metadata.created_at);
        assert!(updated.metadata.updated_at >= created.metadata.updated_at);
        assert_eq!(store.get(created.id()).unwrap().metadata.name, "v2");
    }

    #[tokio::test]
    async fn test_update_unknown_or_missing_id() {
        let mut store = FlowStore::new();
        assert!(matches!(
            store.update(document("x", None)).await,
            Err(DesignerError::InvalidDocument(_))
        ));

        let mut unknown = document("x", None);
        unknown.metadata.id = "flow_404".into();
        assert!(matches!(
            store.update(unknown).await,
            Err(DesignerError::FlowNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_moves_to_active() {
        let mut store = FlowStore::new();
        let created = store.create(document("审批", None)).await.unwrap();
        assert_eq!(created.metadata.status, FlowStatus::Draft);

        let published = store.publish(created.id()).await.unwrap();
        assert_eq!(published.metadata.status, FlowStatus::Active);
        assert!(matches!(
            store.publish("nope").await,
            Err(DesignerError::FlowNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_persistent_store() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("process-flows");

        let id = {
            let mut store = FlowStore::with_persistence(&path);
            let created = store.create(document("持久化", Some("bf_1"))).await.unwrap();
            assert!(path.join(format!("{}.json", created.id())).exists());
            created.id().to_string()
        };

        std::fs::write(path.join("broken.json"), "{ not json").unwrap();

        let mut store = FlowStore::with_persistence(&path);
        assert_eq!(store.load_from_disk().await.unwrap(), 1);
        assert_eq!(store.get(&id).unwrap().metadata.name, "持久化");

        store.remove(&id).await.unwrap();
        assert!(!path.join(format!("{}.json", id)).exists());
    }

    #[test]
    fn test_flow_ids_must_be_plain_file_names() {
        for id in ["flow_1715000000000", "flow_1_2", "审批"] {
            assert!(check_flow_id(id).is_ok(), "{}", id);
        }
        for id in ["", ".", "..", "../businessFlow", "a/b", "a\\b", "x..y", "nul\0"] {
            assert!(
                matches!(check_flow_id(id), Err(DesignerError::InvalidDocument(_))),
                "{:?}",
                id
            );
        }
    }

    #[tokio::test]
    async fn test_ids_cannot_escape_the_flows_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("process-flows");
        let outside = temp_dir.path().join(BUSINESS_FLOW_FILE);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(&outside, "[]").unwrap();

        let mut store = FlowStore::with_persistence(&path);

        let mut escaping = document("逃逸", None);
        escaping.metadata.id = "../businessFlow".into();
        assert!(matches!(
            store.create(escaping.clone()).await,
            Err(DesignerError::InvalidDocument(_))
        ));
        assert!(matches!(
            store.update(escaping).await,
            Err(DesignerError::InvalidDocument(_))
        ));
        assert_eq!(std::fs::read_to_string(&outside).unwrap(), "[]");

        assert!(store.remove("../businessFlow").await.unwrap().is_none());
        assert!(outside.exists());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_id_leaves_disk_alone() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("process-flows");
        std::fs::create_dir_all(&path).unwrap();
        let stray = path.join("flow_stray.json");
        std::fs::write(&stray, "{}").unwrap();

        let mut store = FlowStore::with_persistence(&path);
        assert!(store.remove("flow_stray").await.unwrap().is_none());
        assert!(stray.exists());
    }

    #[tokio::test]
    async fn test_load_skips_documents_with_unsafe_ids() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("process-flows");
        std::fs::create_dir_all(&path).unwrap();

        let mut document = document("手改", None);
        document.metadata.id = "../businessFlow".into();
        std::fs::write(path.join("edited.json"), document.to_json_pretty().unwrap()).unwrap();

        let mut store = FlowStore::with_persistence(&path);
        assert_eq!(store.load_from_disk().await.unwrap(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_store_sink_upserts() {
        let store = FlowStore::new().into_shared();
        let sink = StoreSink::new(store.clone());

        let saved = sink.save(document("first", None)).await.unwrap();
        let mut again = saved.clone();
        again.metadata.name = "second".into();
        sink.save(again).await.unwrap();

        let guard = store.read().await;
        assert_eq!(guard.len(), 1);
        assert_eq!(guard.get(saved.id()).unwrap().metadata.name, "second");
        drop(guard);

        sink.publish(saved.id()).await.unwrap();
        assert_eq!(
            store.read().await.get(saved.id()).unwrap().metadata.status,
            FlowStatus::Active
        );
    }

    #[tokio::test]
    async fn test_business_flow_directory() {
        let temp_dir = TempDir::new().unwrap();
        let directory = BusinessFlowDirectory::in_dir(temp_dir.path());

        assert!(directory.business_flow("bf_1").await.unwrap().is_none());

        std::fs::write(directory.path(), "  \n").unwrap();
        assert!(directory.load().await.unwrap().is_empty());

        std::fs::write(
            directory.path(),
            r#"[{"id": "bf_1", "name": "采购", "children": [{"id": "bf_2", "name": "付款"}]}]"#,
        )
        .unwrap();
        let found = directory.business_flow("bf_2").await.unwrap().unwrap();
        assert_eq!(found.name, "付款");

        std::fs::write(directory.path(), "[{").unwrap();
        assert!(matches!(
            directory.business_flow("bf_1").await,
            Err(DesignerError::Lookup(_))
        ));
    }
}
