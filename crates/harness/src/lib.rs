pub mod fixtures;
pub mod project;

pub use project::TestProject;
