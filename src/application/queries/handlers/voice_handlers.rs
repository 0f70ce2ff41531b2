//! Voice Query Handlers

use std::sync::Arc;

use crate::application::queries::ListVoices;
use crate::domain::{VoiceCatalog, VoiceFilter, VoiceProfile};

/// ListVoices Handler
pub struct ListVoicesHandler {
    catalog: Arc<VoiceCatalog>,
}

impl ListVoicesHandler {
    pub fn new(catalog: Arc<VoiceCatalog>) -> Self {
        Self { catalog }
    }

    pub fn handle(&self, query: ListVoices) -> Vec<VoiceProfile> {
        let filter = VoiceFilter {
            recommended: query.recommended,
            language: query
                .language
                .map(|lang| lang.trim().to_string())
                .filter(|lang| !lang.is_empty()),
        };
        self.catalog.list(&filter)
    }
}
