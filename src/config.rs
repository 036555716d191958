use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "srs-provision.toml";
pub const ENV_PREFIX: &str = "SRS_PROVISION";

/// Main configuration structure for srs-provision
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvisionConfig {
    /// Prefix privileged commands with sudo (file writes are never elevated)
    pub use_sudo: bool,
    /// Component build & install settings
    pub build: BuildConfig,
    /// Host bootstrap settings
    pub bootstrap: BootstrapConfig,
    /// Host tuning settings
    pub tune: TuneConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// What to do when the checkout directory already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StaleCheckoutPolicy {
    /// Delete the directory and clone again
    Remove,
    /// Keep the directory and fetch into it instead of cloning
    Reuse,
    /// Abort the run
    Fail,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Directory holding the checkout and the completion marker
    pub source_dir: PathBuf,
    /// Upstream repository
    pub repo_url: String,
    /// Checkout directory name under `source_dir`
    pub checkout_name: String,
    /// Out-of-tree build directory name under the checkout
    pub build_subdir: String,
    /// Completion marker file name under `source_dir`
    pub marker_name: String,
    /// Local configuration files copied over the installed defaults
    pub overlay_dir: PathBuf,
    /// Where the package's service configuration lives after install
    pub installed_config_dir: PathBuf,
    /// The package's own service-configuration installer
    pub config_installer: String,
    pub config_installer_args: Vec<String>,
    /// Packages installed before building; empty skips the step
    pub build_packages: Vec<String>,
    pub stale_checkout: StaleCheckoutPolicy,
    /// Parallel compile jobs; defaults to the number of CPUs
    pub jobs: Option<usize>,
}

impl BuildConfig {
    pub fn checkout_dir(&self) -> PathBuf {
        self.source_dir.join(&self.checkout_name)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.checkout_dir().join(&self.build_subdir)
    }

    pub fn marker_path(&self) -> PathBuf {
        self.source_dir.join(&self.marker_name)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepositoryConfig {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BootstrapConfig {
    pub prerequisite_packages: Vec<String>,
    /// Signing key of the container runtime's package source
    pub runtime_key_url: String,
    pub keyring_path: PathBuf,
    pub apt_source_path: PathBuf,
    /// `{arch}`, `{codename}` and `{keyring}` are filled in at run time
    pub apt_source_template: String,
    pub runtime_packages: Vec<String>,
    pub runtime_group: String,
    /// User added to `runtime_group`; defaults to $SUDO_USER, then $USER
    pub runtime_user: Option<String>,
    /// Registry server for `docker login`; Docker Hub when unset
    pub registry: Option<String>,
    pub git_host: String,
    /// Repositories cloned with the supplied access token
    pub repositories: Vec<RepositoryConfig>,
    /// Parent directory of the cloned repositories
    pub clone_dir: PathBuf,
    pub existing_clone: StaleCheckoutPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TuneConfig {
    pub nat: NatConfig,
    pub cpu: CpuConfig,
    pub sdr: SdrConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NatConfig {
    pub enabled: bool,
    /// Interface carrying traffic out of the node
    pub egress_interface: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CpuConfig {
    pub enabled: bool,
    pub governor: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SdrConfig {
    pub enabled: bool,
    /// Interface facing the SDR; looked up by `address` when unset
    pub interface: Option<String>,
    pub address: String,
    pub mtu: u32,
    /// Applied to net.core.rmem_max and net.core.wmem_max
    pub socket_buffer_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            use_sudo: false,
            build: BuildConfig {
                source_dir: PathBuf::from("/var/tmp"),
                repo_url: "https://github.com/srsran/srsRAN.git".to_string(),
                checkout_name: "srsran".to_string(),
                build_subdir: "build".to_string(),
                marker_name: "srs-setup-complete".to_string(),
                overlay_dir: PathBuf::from("/local/repository/etc/srsran"),
                installed_config_dir: PathBuf::from("/etc/srsran"),
                config_installer: "srsran_install_configs.sh".to_string(),
                config_installer_args: strings(&["service"]),
                build_packages: strings(&[
                    "cmake",
                    "make",
                    "gcc",
                    "g++",
                    "pkg-config",
                    "libfftw3-dev",
                    "libmbedtls-dev",
                    "libsctp-dev",
                    "libyaml-cpp-dev",
                    "libgtest-dev",
                    "libboost-program-options-dev",
                    "libconfig++-dev",
                    "libzmq3-dev",
                ]),
                stale_checkout: StaleCheckoutPolicy::Remove,
                jobs: None,
            },
            bootstrap: BootstrapConfig {
                prerequisite_packages: strings(&[
                    "apt-transport-https",
                    "ca-certificates",
                    "curl",
                    "gnupg",
                    "lsb-release",
                ]),
                runtime_key_url: "https://download.docker.com/linux/ubuntu/gpg".to_string(),
                keyring_path: PathBuf::from("/etc/apt/keyrings/docker.gpg"),
                apt_source_path: PathBuf::from("/etc/apt/sources.list.d/docker.list"),
                apt_source_template:
                    "deb [arch={arch} signed-by={keyring}] https://download.docker.com/linux/ubuntu {codename} stable\n"
                        .to_string(),
                runtime_packages: strings(&["docker-ce", "docker-ce-cli", "containerd.io"]),
                runtime_group: "docker".to_string(),
                runtime_user: None,
                registry: None,
                git_host: "github.com".to_string(),
                repositories: vec![
                    RepositoryConfig {
                        owner: "powderwireless".to_string(),
                        name: "srs-docker".to_string(),
                    },
                    RepositoryConfig {
                        owner: "powderwireless".to_string(),
                        name: "ran-experiments".to_string(),
                    },
                ],
                clone_dir: PathBuf::from("."),
                existing_clone: StaleCheckoutPolicy::Reuse,
            },
            tune: TuneConfig {
                nat: NatConfig {
                    enabled: true,
                    egress_interface: "eno1".to_string(),
                },
                cpu: CpuConfig {
                    enabled: true,
                    governor: "performance".to_string(),
                },
                sdr: SdrConfig {
                    enabled: true,
                    interface: None,
                    address: "192.168.40.1".to_string(),
                    mtu: 9000,
                    socket_buffer_bytes: 33_554_432,
                },
            },
            logging: LoggingConfig {
                format: LogFormat::Text,
                level: "info".to_string(),
            },
        }
    }
}

impl ProvisionConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (`explicit`, or srs-provision.toml when present)
    /// 3. Environment variables (SRS_PROVISION_<SECTION>__<KEY>)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&ProvisionConfig::default())
                .context("Failed to serialize default configuration")?,
        );

        match explicit {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        let provision_config: ProvisionConfig = config
            .try_deserialize()
            .context("Invalid configuration")?;
        Ok(provision_config)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::debug!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    /// Render as TOML, e.g. for `status --show-config`
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn compile_jobs(&self) -> usize {
        self.build.jobs.unwrap_or_else(num_cpus::get).max(1)
    }
}
