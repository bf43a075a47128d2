//! Material surface and shared property block

use std::collections::HashMap;

use crate::render::gpu::BufferId;

/// The slice of a material the renderer cares about
///
/// The driver owns shaders and material parameters; the renderer only reads
/// (and, on the direct draw path, force-corrects) the instancing flag.
#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    instancing_enabled: bool,
}

impl Material {
    /// Create a material with instancing disabled, the usual authoring
    /// default
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            instancing_enabled: false,
        }
    }

    /// Debug name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether instanced draws are permitted with this material
    #[must_use]
    pub fn instancing_enabled(&self) -> bool {
        self.instancing_enabled
    }

    /// Allow instanced draws
    pub fn enable_instancing(&mut self) {
        self.instancing_enabled = true;
    }
}

/// Named shader parameters shared across a frame's draws
///
/// Carries the instance-transform buffer binding (indirect path) and the
/// per-instance time-offset array. Buffers are referenced by [`BufferId`];
/// the backend resolves ids to real resources at submission time.
#[derive(Debug, Clone, Default)]
pub struct PropertyBlock {
    buffers: HashMap<String, BufferId>,
    float_arrays: HashMap<String, Vec<f32>>,
}

impl PropertyBlock {
    /// Bind a buffer under `name`
    pub fn set_buffer(&mut self, name: &str, id: BufferId) {
        self.buffers.insert(name.to_owned(), id);
    }

    /// Look up a buffer binding
    #[must_use]
    pub fn buffer(&self, name: &str) -> Option<BufferId> {
        self.buffers.get(name).copied()
    }

    /// Set a float-array parameter under `name`
    pub fn set_float_array(&mut self, name: &str, values: &[f32]) {
        self.float_arrays.insert(name.to_owned(), values.to_vec());
    }

    /// Look up a float-array parameter
    #[must_use]
    pub fn float_array(&self, name: &str) -> Option<&[f32]> {
        self.float_arrays.get(name).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_block_stores_bindings() {
        let mut block = PropertyBlock::default();
        block.set_buffer("transforms", BufferId(3));
        block.set_float_array("offsets", &[1.0, 2.0]);
        assert_eq!(block.buffer("transforms"), Some(BufferId(3)));
        assert_eq!(block.float_array("offsets"), Some([1.0, 2.0].as_slice()));
        assert_eq!(block.buffer("missing"), None);
    }

    #[test]
    fn instancing_flag_default_and_enable() {
        let mut mat = Material::new("crowd");
        assert!(!mat.instancing_enabled());
        mat.enable_instancing();
        assert!(mat.instancing_enabled());
    }
}
