pub mod expectations;
pub mod scene;

pub use expectations::{check_picks, PickExpectation};
pub use scene::{build_instanced_grid, build_main_scene, TestScene, CANVAS_HEIGHT, CANVAS_WIDTH};
