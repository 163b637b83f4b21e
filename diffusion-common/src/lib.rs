pub mod config;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{OutputConfig, ProjectConfig, ReleaseConfig, RngConfig, RngStreams, SimulationConfig, SpeciesConfig, TimingConfig};
pub use sim_params::SimParams;
pub use snapshot::{frame_digit_width, frame_file_name, parse_frame_file_name, Snapshot, SpeciesBlock};
pub use vecmath::Vec3;
