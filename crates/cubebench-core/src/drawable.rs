use crate::geometry::GeometryResource;
use crate::material::Material;
use crate::shader::BoundProgram;
use crate::transform::Transform;

/// A transform and a material submitted together as one draw.
#[derive(Debug, Clone, Default)]
pub struct Drawable {
    pub transform: Transform,
    pub material: Material,
}

impl Drawable {
    pub fn new(material: Material) -> Self {
        Self {
            transform: Transform::default(),
            material,
        }
    }

    /// Applies the material, sets `model`, and issues exactly one draw of `geometry`.
    pub fn draw(&self, bound: &mut BoundProgram<'_>, geometry: &GeometryResource) {
        self.material.apply(bound);
        bound.set_uniform("model", self.transform.matrix());
        bound.draw(&geometry.draw_call());
    }
}
