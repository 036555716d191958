use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use crate::config::ProvisionConfig;
use crate::fs::FileSystemOperations;
use crate::marker::{self, MarkerStatus};

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub source_dir: PathBuf,
    pub checkout_dir: PathBuf,
    pub checkout_present: bool,
    pub marker_path: PathBuf,
    pub marker: MarkerStatus,
}

impl StatusReport {
    pub fn collect(config: &ProvisionConfig, fs: &dyn FileSystemOperations) -> Self {
        let build = &config.build;
        let checkout_dir = build.checkout_dir();
        let marker_path = build.marker_path();
        Self {
            source_dir: build.source_dir.clone(),
            checkout_present: fs.exists(&checkout_dir),
            checkout_dir,
            marker: marker::check(fs, &marker_path),
            marker_path,
        }
    }
}

pub struct StatusCommand {
    pub config: ProvisionConfig,
    pub json: bool,
    pub show_config: bool,
}

impl StatusCommand {
    pub fn new(config: ProvisionConfig) -> Self {
        Self {
            config,
            json: false,
            show_config: false,
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_show_config(mut self, show_config: bool) -> Self {
        self.show_config = show_config;
        self
    }

    pub async fn execute(&self, fs: &dyn FileSystemOperations) -> Result<()> {
        let report = StatusReport::collect(&self.config, fs);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("📊 srsRAN deployment status");
            println!("   Source directory: {}", report.source_dir.display());
            println!(
                "   Checkout:         {} ({})",
                report.checkout_dir.display(),
                if report.checkout_present { "present" } else { "absent" }
            );
            println!("   Marker:           {}", report.marker_path.display());
            match report.marker {
                MarkerStatus::AlreadyDone => println!("   ✅ Deployed; deploy will be skipped"),
                MarkerStatus::NotDone => println!("   ⏳ Not deployed; deploy will run"),
            }
        }

        if self.show_config {
            println!();
            print!("{}", self.config.to_toml()?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::StandardFileSystem;
    use tempfile::TempDir;

    #[test]
    fn test_report_reflects_marker_on_disk() {
        let dir = TempDir::new().unwrap();
        let mut config = ProvisionConfig::default();
        config.build.source_dir = dir.path().to_path_buf();

        let before = StatusReport::collect(&config, &StandardFileSystem);
        assert_eq!(before.marker, MarkerStatus::NotDone);
        assert!(!before.checkout_present);

        std::fs::write(config.build.marker_path(), "done").unwrap();
        std::fs::create_dir(config.build.checkout_dir()).unwrap();

        let after = StatusReport::collect(&config, &StandardFileSystem);
        assert_eq!(after.marker, MarkerStatus::AlreadyDone);
        assert!(after.checkout_present);
    }
}
