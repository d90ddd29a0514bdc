use super::attribute_data::SplatAttributeData;

/// Consumer of splat attributes and draw order.
pub trait SplatRenderTarget {
    /// Called once after a scene is loaded.
    fn upload_attributes(&mut self, _attributes: &SplatAttributeData) {}

    /// Called with each completed permutation. `indexes` holds exactly
    /// `render_count` splat indexes in back to front draw order.
    fn update_indexes(&mut self, indexes: &[u32], render_count: usize);
}

/// Render target that keeps the latest draw order in memory.
#[derive(Debug, Default)]
pub struct HeadlessTarget {
    pub indexes: Vec<u32>,
    pub render_count: usize,
    pub updates: usize,
    pub uploaded_splats: usize,
}

impl SplatRenderTarget for HeadlessTarget {
    fn upload_attributes(&mut self, attributes: &SplatAttributeData) {
        self.uploaded_splats = attributes.splat_count;
    }

    fn update_indexes(&mut self, indexes: &[u32], render_count: usize) {
        self.indexes.clear();
        self.indexes.extend_from_slice(indexes);
        self.render_count = render_count;
        self.updates += 1;
    }
}
