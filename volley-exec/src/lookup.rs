//! Read-only views over the stored workspace that the engines resolve references through.

use std::collections::BTreeMap;
use std::sync::Arc;

use volley_core::types::{AuthProfile, Collection, Environment, Flow, Request, WorkspaceDocument};

use crate::request::WorkspaceAuthResolver;

pub trait CollectionLookup: Send + Sync {
    fn find_request_by_id(&self, id: &str) -> Option<Request>;

    /// The collection that owns `request_id`, for shared headers, variables and auth.
    fn collection_of(&self, _request_id: &str) -> Option<Arc<Collection>> {
        None
    }

    fn find_collection(&self, _id: &str) -> Option<Arc<Collection>> {
        None
    }
}

pub trait FlowLookup: Send + Sync {
    fn find_flow_by_id(&self, id: &str) -> Option<Flow>;
}

pub trait EnvironmentLookup: Send + Sync {
    fn find_environment(&self, id: &str) -> Option<Environment>;
}

/// Indexes a parsed [`WorkspaceDocument`] by id.
#[derive(Debug, Default)]
pub struct WorkspaceIndex {
    collections: BTreeMap<String, Arc<Collection>>,
    request_owner: BTreeMap<String, String>,
    environments: BTreeMap<String, Environment>,
    flows: BTreeMap<String, Flow>,
    auths: BTreeMap<String, AuthProfile>,
}

impl WorkspaceIndex {
    pub fn new(doc: &WorkspaceDocument) -> Self {
        let mut index = Self::default();
        for c in &doc.collections {
            for r in &c.requests {
                index.request_owner.insert(r.id.clone(), c.id.clone());
            }
            index.collections.insert(c.id.clone(), Arc::new(c.clone()));
        }
        for e in &doc.environments {
            index.environments.insert(e.id.clone(), e.clone());
        }
        for f in &doc.flows {
            index.flows.insert(f.id.clone(), f.clone());
        }
        for a in &doc.auths {
            index.auths.insert(a.id.clone(), a.clone());
        }
        index
    }

    pub fn auth_resolver(&self) -> WorkspaceAuthResolver {
        WorkspaceAuthResolver::new(self.auths.values().cloned())
    }
}

impl CollectionLookup for WorkspaceIndex {
    fn find_request_by_id(&self, id: &str) -> Option<Request> {
        let owner = self.request_owner.get(id)?;
        self.collections
            .get(owner)?
            .requests
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    fn collection_of(&self, request_id: &str) -> Option<Arc<Collection>> {
        let owner = self.request_owner.get(request_id)?;
        self.collections.get(owner).cloned()
    }

    fn find_collection(&self, id: &str) -> Option<Arc<Collection>> {
        self.collections.get(id).cloned()
    }
}

impl FlowLookup for WorkspaceIndex {
    fn find_flow_by_id(&self, id: &str) -> Option<Flow> {
        self.flows.get(id).cloned()
    }
}

impl EnvironmentLookup for WorkspaceIndex {
    fn find_environment(&self, id: &str) -> Option<Environment> {
        self.environments.get(id).cloned()
    }
}
