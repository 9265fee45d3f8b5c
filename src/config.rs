use std::path::PathBuf;

/// Run settings shared by the scan entry points.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory the JSON and Excel reports land in.
    pub results_dir: PathBuf,
    /// Whether to write reports at all.
    pub save_results: bool,
    /// Whether to render forecast plots. Plots are only written when
    /// `save_results` is also set, since they live under the results tree.
    pub plot_models: bool,
}

impl ScanConfig {
    /// Directory forecast plots are written to.
    pub fn images_dir(&self) -> PathBuf {
        self.results_dir.join("images")
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            save_results: false,
            plot_models: false,
        }
    }
}
