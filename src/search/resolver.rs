use std::sync::Arc;

use tracing::{debug, warn};

use crate::storage::ObjectStorage;

/// Historical upload layouts, probed in this order. Earlier entries shadow later ones.
pub const FOLDER_TEMPLATES: [&str; 6] = [
    "{id}/",
    "attachments/{id}/",
    "adjuntos/{id}/",
    "attachments/{id}",
    "adjuntos/{id}",
    "{id}",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolverMode {
    #[default]
    Standard,
    /// Also scans the head of the bucket for any key mentioning the order.
    Administrative,
}

pub fn candidate_prefixes(order_id: &str) -> Vec<String> {
    FOLDER_TEMPLATES
        .iter()
        .map(|template| template.replace("{id}", order_id))
        .collect()
}

#[derive(Clone)]
pub struct FolderResolver {
    storage: Arc<dyn ObjectStorage>,
    admin_scan_limit: usize,
}

impl FolderResolver {
    pub fn new(storage: Arc<dyn ObjectStorage>, admin_scan_limit: usize) -> Self {
        Self {
            storage,
            admin_scan_limit,
        }
    }

    /// Storage prefix holding the attachments of `order_id`, if any layout matches.
    pub async fn resolve(&self, order_id: &str, mode: ResolverMode) -> Option<String> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return None;
        }

        for prefix in candidate_prefixes(order_id) {
            if self.probe(&prefix).await {
                debug!(%order_id, %prefix, "resolved order folder");
                return Some(prefix);
            }
        }

        match mode {
            ResolverMode::Standard => None,
            ResolverMode::Administrative => self.scan_bucket(order_id).await,
        }
    }

    async fn probe(&self, prefix: &str) -> bool {
        match self.storage.list_objects(prefix, 1).await {
            Ok(objects) => !objects.is_empty(),
            Err(err) => {
                warn!(%prefix, error = %err, "folder probe failed");
                false
            }
        }
    }

    async fn scan_bucket(&self, order_id: &str) -> Option<String> {
        let objects = match self.storage.list_objects("", self.admin_scan_limit).await {
            Ok(objects) => objects,
            Err(err) => {
                warn!(%order_id, error = %err, "bucket scan failed");
                return None;
            }
        };

        let prefix = objects
            .iter()
            .filter(|object| object.key.contains(order_id))
            .find_map(|object| prefix_from_key(&object.key, order_id));
        match &prefix {
            Some(prefix) => debug!(%order_id, %prefix, "resolved order folder by bucket scan"),
            None => debug!(%order_id, scanned = objects.len(), "order folder not found"),
        }
        prefix
    }
}

/// Folder of `key` up to the first path component mentioning `order_id`.
pub fn prefix_from_key(key: &str, order_id: &str) -> Option<String> {
    let components: Vec<&str> = key.split('/').collect();
    let position = components
        .iter()
        .position(|component| component.contains(order_id))?;

    let is_file_name = position + 1 == components.len();
    let folder = if is_file_name {
        &components[..position]
    } else {
        &components[..=position]
    };

    if folder.is_empty() {
        return None;
    }
    Some(format!("{}/", folder.join("/")))
}
