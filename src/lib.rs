pub mod bvh;
pub mod geometry;
pub mod scene;
pub mod two_level;
pub mod util;

pub use bvh::{Bvh, TraversalError};
pub use scene::{Mesh, SceneAccelerator, SceneError};
pub use two_level::{BvhInstance, FlatNode, TwoLevelBvh};
