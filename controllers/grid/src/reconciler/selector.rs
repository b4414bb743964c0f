//! Selector label resolution for primary workloads.
//!
//! The primary Deployment needs a pod selector that cannot match the target's
//! pods. It reuses one of the target's conventional selector labels and
//! suffixes the value, so the key is looked up in a fixed preference order.

use crate::error::ControllerError;
use k8s_openapi::api::apps::v1::Deployment;

/// Selector keys tried in order; the first present key wins.
pub const SELECTOR_LABEL_KEYS: [&str; 2] = ["app", "name"];

/// A selector key with its value on the target Deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorLabel {
    /// Label key, one of `SELECTOR_LABEL_KEYS`
    pub key: String,
    /// Label value on the target
    pub value: String,
}

impl SelectorLabel {
    /// Value the primary Deployment selects on.
    pub fn primary_value(&self) -> String {
        format!("{}-primary", self.value)
    }
}

/// Find the selector label to derive the primary's selector from.
pub fn resolve_selector_label(deployment: &Deployment) -> Result<SelectorLabel, ControllerError> {
    let match_labels = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.selector.match_labels.as_ref());

    SELECTOR_LABEL_KEYS
        .iter()
        .find_map(|key| {
            match_labels
                .and_then(|labels| labels.get(*key))
                .map(|value| SelectorLabel {
                    key: (*key).to_string(),
                    value: value.clone(),
                })
        })
        .ok_or_else(|| {
            ControllerError::SelectorLabel(format!(
                "deployment {}.{} spec.selector.matchLabels must contain one of {:?}",
                deployment.metadata.name.as_deref().unwrap_or_default(),
                deployment.metadata.namespace.as_deref().unwrap_or_default(),
                SELECTOR_LABEL_KEYS
            ))
        })
}
