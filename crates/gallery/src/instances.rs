use crate::layout::SlotPlacement;

/// Per-instance vertex attributes, kept as three parallel arrays so each can
/// be uploaded as its own instance-rate buffer.
///
/// The slot count is fixed at construction. Writers mark the store dirty;
/// the renderer uploads and clears the flag with [`take_dirty`](Self::take_dirty).
#[derive(Debug, Clone)]
pub struct InstanceStore {
    angles: Vec<f32>,
    heights: Vec<f32>,
    texture_indices: Vec<f32>,
    dirty: bool,
}

impl InstanceStore {
    pub fn new(count: usize) -> Self {
        Self {
            angles: vec![0.0; count],
            heights: vec![0.0; count],
            texture_indices: vec![0.0; count],
            dirty: true,
        }
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    pub fn angles(&self) -> &[f32] {
        &self.angles
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn texture_indices(&self) -> &[f32] {
        &self.texture_indices
    }

    /// Copies placements slot by slot. Extra placements are ignored and
    /// missing ones leave their slot untouched.
    pub fn set_layout(&mut self, placements: &[SlotPlacement]) {
        for ((angle, height), placement) in self
            .angles
            .iter_mut()
            .zip(self.heights.iter_mut())
            .zip(placements)
        {
            *angle = placement.angle;
            *height = placement.y;
        }
        self.dirty = true;
    }

    /// Slot `i` shows tile `index_map[i % index_map.len()]`; an empty map
    /// points every slot at tile 0.
    pub fn set_texture_indices(&mut self, index_map: &[u32]) {
        for (slot, value) in self.texture_indices.iter_mut().enumerate() {
            *value = if index_map.is_empty() {
                0.0
            } else {
                index_map[slot % index_map.len()] as f32
            };
        }
        self.dirty = true;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns whether an upload is due and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}
