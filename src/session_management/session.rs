use uuid::Uuid;

use crate::decoding::template::TemplateCache;

/// Decoding context of one exporter.
///
/// Holds the NetFlow v9 and IPFIX templates learned from the exporter's
/// earlier packets. Only the wire decoder mutates the template caches.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    netflow9_templates: TemplateCache,
    ipfix_templates: TemplateCache,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            netflow9_templates: TemplateCache::new(),
            ipfix_templates: TemplateCache::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn netflow9_templates_mut(&mut self) -> &mut TemplateCache {
        &mut self.netflow9_templates
    }

    pub fn ipfix_templates_mut(&mut self) -> &mut TemplateCache {
        &mut self.ipfix_templates
    }

    /// Number of templates known across both protocols.
    pub fn template_count(&self) -> usize {
        self.netflow9_templates.len() + self.ipfix_templates.len()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
