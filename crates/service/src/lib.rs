#![forbid(unsafe_code)]

//! Request-shaped operations over one owner's projects.
//!
//! Every call resolves the project's current snapshot once and hands the work to
//! `TreeStore`. Request payloads are decoded before the store is touched.

mod error;

pub use error::{ErrorKind, ServiceError};

use scribe_core::{
    ContentEdits, CreatedNode, DocumentView, NodeId, NodeKind, OwnerId, ProjectId,
    StructuralEdits, TreeView,
};
use scribe_storage::{ProjectKey, SnapshotKey, TreeStore};
use serde::Deserialize;

/// Form body of a create-document request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CreateDocumentForm {
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub parent: Option<String>,
}

/// Turns the identity supplied by the auth layer into an owner id.
pub fn require_owner(identity: Option<&str>) -> Result<OwnerId, ServiceError> {
    match identity.map(str::trim) {
        None | Some("") => Err(ServiceError::Unauthenticated),
        Some(raw) => Ok(OwnerId::try_new(raw)?),
    }
}

#[derive(Debug)]
pub struct ProjectService {
    tree: TreeStore,
}

impl ProjectService {
    pub fn new(tree: TreeStore) -> Self {
        Self { tree }
    }

    pub fn list_projects(&self, owner: &OwnerId) -> Result<Vec<ProjectId>, ServiceError> {
        Ok(self.tree.list_projects(owner)?)
    }

    pub fn create_project(&self, owner: &OwnerId, project: &str) -> Result<ProjectId, ServiceError> {
        let project = ProjectId::try_new(project)?;
        self.tree.create_project(owner, &project)?;
        Ok(project)
    }

    pub fn read_tree(&self, owner: &OwnerId, project: &str) -> Result<TreeView, ServiceError> {
        let project_key = project_key(owner, project)?;
        let (snapshot, key) = self.tree.load_current_snapshot(&project_key)?;
        let nodes = self.tree.load_tree(&key, &snapshot)?;
        tracing::debug!(snapshot = %key.id(), nodes = nodes.len(), "tree read");
        Ok(TreeView::project(snapshot.top, &nodes))
    }

    pub fn read_document(
        &self,
        owner: &OwnerId,
        project: &str,
        id: &str,
    ) -> Result<DocumentView, ServiceError> {
        let id = NodeId::parse(id)?;
        let key = self.current_key(owner, project)?;
        let node = self.tree.load_node(&key, id)?;
        Ok(DocumentView::from(&node))
    }

    pub fn create_document(
        &self,
        owner: &OwnerId,
        project: &str,
        form: &CreateDocumentForm,
    ) -> Result<CreatedNode, ServiceError> {
        let parent = form
            .parent
            .as_deref()
            .ok_or(ServiceError::MissingField("parent"))?;
        let parent = NodeId::parse(parent)?;
        let kind = NodeKind::from_form_flag(&form.folder);
        let key = self.current_key(owner, project)?;
        let id = self.tree.create_node(&key, parent, kind)?;
        Ok(CreatedNode { id })
    }

    pub fn update_tree(
        &self,
        owner: &OwnerId,
        project: &str,
        body: &[u8],
    ) -> Result<(), ServiceError> {
        let edits = StructuralEdits::from_slice(body)?;
        let key = self.current_key(owner, project)?;
        self.tree.apply_structural_edits(&key, &edits)?;
        Ok(())
    }

    pub fn update_documents(
        &self,
        owner: &OwnerId,
        project: &str,
        body: &[u8],
    ) -> Result<(), ServiceError> {
        let edits = ContentEdits::from_slice(body)?;
        let key = self.current_key(owner, project)?;
        self.tree.apply_content_edits(&key, &edits)?;
        Ok(())
    }

    fn current_key(&self, owner: &OwnerId, project: &str) -> Result<SnapshotKey, ServiceError> {
        let project_key = project_key(owner, project)?;
        let (_, key) = self.tree.load_current_snapshot(&project_key)?;
        Ok(key)
    }
}

fn project_key(owner: &OwnerId, project: &str) -> Result<ProjectKey, ServiceError> {
    Ok(ProjectKey::new(owner.clone(), ProjectId::try_new(project)?))
}
