use std::{env, path::PathBuf};

#[cfg(feature = "tch-backend")]
use tch::Device;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL the manifest, weight shards and label list are fetched from.
    pub base_url: String,
    /// Directory backing the artifact store.
    pub cache_dir: PathBuf,
    pub top_k: usize,
    #[cfg(feature = "tch-backend")]
    pub device: Device,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = env::var("MODEL_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000/kavilres23".to_string());

        let cache_dir = PathBuf::from(
            env::var("MODEL_CACHE_DIR").unwrap_or_else(|_| ".model-cache".to_string()),
        );

        let top_k = env::var("TOP_K")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        #[cfg(feature = "tch-backend")]
        let device = {
            let raw = env::var("DEVICE").unwrap_or_else(|_| "cpu".into());
            parse_device(&raw)
        };

        Ok(Self {
            base_url,
            cache_dir,
            top_k,
            #[cfg(feature = "tch-backend")]
            device,
        })
    }
}

#[cfg(feature = "tch-backend")]
fn parse_device(raw: &str) -> Device {
    let lower = raw.to_lowercase();
    if lower == "cpu" {
        Device::Cpu
    } else if lower.starts_with("cuda") {
        let idx = lower
            .split(':')
            .nth(1)
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0);
        if tch::Cuda::is_available() {
            Device::Cuda(idx)
        } else {
            Device::Cpu
        }
    } else {
        Device::Cpu
    }
}
