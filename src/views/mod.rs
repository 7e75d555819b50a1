pub mod common;
pub mod feedback;
pub mod material;
pub mod material_stats;
pub mod records;
pub mod scanner;
pub mod signin;
pub mod statistics;

pub use feedback::render_feedback;
pub use material::render_material;
pub use material_stats::render_material_stats;
pub use records::render_records;
pub use signin::render_signin;
pub use statistics::render_statistics;
