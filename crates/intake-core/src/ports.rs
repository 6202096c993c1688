//! Collaborators the host supplies: rasterization, extraction, template storage
//!
//! None of these are implemented here beyond the in-memory template store;
//! rendering and OCR live in the host application.

use std::collections::BTreeMap;
use std::sync::Mutex;

use region_core::{Region, Template};
use serde::{Deserialize, Serialize};
use shared_types::RenderedPage;

use crate::error::IntakeError;

/// Rasterizes one page of a document
pub trait PageRenderer: Send + Sync {
    /// `page_number` is 1-based
    fn render_page(&self, document: &[u8], page_number: u32) -> Result<RenderedPage, IntakeError>;
}

/// Result of reading the work-order number inside a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub candidate_number: Option<String>,
    pub confidence_raw: f64,
}

/// OCR or model call that reads a work-order number out of a region
pub trait CandidateExtractor: Send + Sync {
    fn extract_candidate_number(
        &self,
        document: &[u8],
        region: &Region,
    ) -> Result<Extraction, IntakeError>;
}

/// Per-issuer template persistence, keyed by normalized issuer key
pub trait TemplateStore: Send + Sync {
    fn load_template(&self, issuer_key: &str) -> Result<Option<Template>, IntakeError>;

    /// Insert or replace the issuer's template
    fn save_template(&self, template: &Template) -> Result<(), IntakeError>;
}

#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    templates: Mutex<BTreeMap<String, Template>>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.templates.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn load_template(&self, issuer_key: &str) -> Result<Option<Template>, IntakeError> {
        let templates = self
            .templates
            .lock()
            .map_err(|_| IntakeError::TemplateStore("template store lock poisoned".to_string()))?;
        Ok(templates.get(issuer_key).cloned())
    }

    fn save_template(&self, template: &Template) -> Result<(), IntakeError> {
        let mut templates = self
            .templates
            .lock()
            .map_err(|_| IntakeError::TemplateStore("template store lock poisoned".to_string()))?;
        templates.insert(template.issuer_key.clone(), template.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use region_core::{make_region, RawRegion, DEFAULT_TOLERANCE_PT};
    use shared_types::PagePoints;

    #[test]
    fn test_template_store_replaces_by_issuer() {
        let store = MemoryTemplateStore::new();
        assert!(store.load_template("acme_com").unwrap().is_none());

        for x_pt in [400.0, 20.0] {
            let region =
                make_region(RawRegion::new(x_pt, 40.0, 150.0, 30.0, PagePoints::letter())).unwrap();
            let template =
                Template::capture("acme_com", region, &[], DEFAULT_TOLERANCE_PT).unwrap();
            store.save_template(&template).unwrap();
        }

        assert_eq!(store.len(), 1);
        let loaded = store.load_template("acme_com").unwrap().unwrap();
        assert_eq!(loaded.region.x_pt(), 20.0);
    }
}
