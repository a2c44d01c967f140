use tessera::platform::Device;
use tessera::Renderer;

use crate::scene::TestScene;

/// What a pick at one canvas position should return.
pub struct PickExpectation {
    pub x: f32,
    pub y: f32,
    /// Name of the object expected on top, or `None` for empty space.
    pub expected: Option<&'static str>,
    /// Human-readable label for failure messages.
    pub label: &'static str,
}

impl PickExpectation {
    pub fn hit(x: f32, y: f32, expected: &'static str, label: &'static str) -> Self {
        Self {
            x,
            y,
            expected: Some(expected),
            label,
        }
    }

    pub fn miss(x: f32, y: f32, label: &'static str) -> Self {
        Self {
            x,
            y,
            expected: None,
            label,
        }
    }
}

/// Picks every expectation of `scene` on `renderer`.
///
/// Returns a list of human-readable failure descriptions. An empty list means all
/// expectations passed.
pub fn check_picks<D: Device>(renderer: &mut Renderer<D>, scene: &TestScene) -> Vec<String> {
    let mut failures = Vec::new();
    for expectation in &scene.expectations {
        let picked = renderer.pick([expectation.x, expectation.y]);
        let picked_name = picked.and_then(|entity| scene.name_of(entity));
        if picked_name != expectation.expected {
            failures.push(format!(
                "[{}] pick at ({}, {}): expected {:?}, got {:?}",
                expectation.label, expectation.x, expectation.y, expectation.expected, picked_name,
            ));
        }
    }
    failures
}
