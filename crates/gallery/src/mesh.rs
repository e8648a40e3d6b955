/// Width of one gallery card in world units.
pub const PLANE_WIDTH: f32 = 6.0;
/// Height of one gallery card in world units.
pub const PLANE_HEIGHT: f32 = 2.7;
pub const PLANE_SEGMENTS_X: u32 = 40;
pub const PLANE_SEGMENTS_Y: u32 = 20;

/// Card width over height; the dither grid uses it to keep cells square.
pub const PLANE_ASPECT: f32 = PLANE_WIDTH / PLANE_HEIGHT;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneVertex {
    /// Plane-local position, centred on the origin.
    pub position: [f32; 2],
    /// `(0, 0)` bottom-left, `(1, 1)` top-right.
    pub uv: [f32; 2],
}

/// Indexed triangle list for a subdivided plane in the XY plane.
#[derive(Debug, Clone)]
pub struct PlaneMesh {
    pub vertices: Vec<PlaneVertex>,
    pub indices: Vec<u32>,
}

impl PlaneMesh {
    pub fn new(width: f32, height: f32, segments_x: u32, segments_y: u32) -> Self {
        let segments_x = segments_x.max(1);
        let segments_y = segments_y.max(1);
        let columns = segments_x + 1;

        let mut vertices = Vec::with_capacity((columns * (segments_y + 1)) as usize);
        for row in 0..=segments_y {
            let v = 1.0 - row as f32 / segments_y as f32;
            for col in 0..=segments_x {
                let u = col as f32 / segments_x as f32;
                vertices.push(PlaneVertex {
                    position: [(u - 0.5) * width, (v - 0.5) * height],
                    uv: [u, v],
                });
            }
        }

        let mut indices = Vec::with_capacity((segments_x * segments_y * 6) as usize);
        for row in 0..segments_y {
            for col in 0..segments_x {
                let a = row * columns + col;
                let b = a + columns;
                let c = b + 1;
                let d = a + 1;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self { vertices, indices }
    }

    /// The card every gallery slot draws.
    pub fn gallery_card() -> Self {
        Self::new(PLANE_WIDTH, PLANE_HEIGHT, PLANE_SEGMENTS_X, PLANE_SEGMENTS_Y)
    }

    /// Edge list over the same vertices, for line-list debug rendering.
    pub fn wire_indices(&self) -> Vec<u32> {
        self.indices
            .chunks_exact(3)
            .flat_map(|tri| [tri[0], tri[1], tri[1], tri[2], tri[2], tri[0]])
            .collect()
    }
}
