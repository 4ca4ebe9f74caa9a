pub mod color;
pub mod fonts;
pub mod geom;
pub mod id;
pub mod picker;
pub mod scene;
pub mod units;
pub mod util;
pub mod viewport;
pub mod windowed;

pub use id::RollID;
