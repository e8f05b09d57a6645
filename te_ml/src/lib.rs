pub type CpuBackend = burn::backend::NdArray<f32, i32>;
pub type GpuBackend = burn::backend::Wgpu<f32, i32>;

pub use burn;

/// Version of the `burn` dependency this crate is built against.
pub const BURN_VERSION: &str = "0.16.0";

pub mod dataset;
pub mod emotion_classifier;
pub mod error;
pub mod evaluation;
pub mod labels;
pub mod prepare;
pub mod report;
pub mod sequence;
pub mod tokenizer;

#[cfg(test)]
mod tests {
    #[test]
    fn burn_version_matches_the_workspace_dependency() {
        let manifest = include_str!("../../Cargo.toml");
        let burn = manifest
            .lines()
            .find(|line| line.starts_with("burn ="))
            .expect("Workspace declares burn");

        assert!(burn.contains(&format!("version = \"{}\"", super::BURN_VERSION)), "{burn}");
    }
}
