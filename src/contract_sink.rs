use crate::contract::ContractArtifact;
use fs::File;
use lazy_static::lazy_static;
use regex::Regex;
use std::{
    fmt::Debug,
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::info;

lazy_static! {
    static ref FILENAME_SANITIZER: Regex = Regex::new(r"[^A-Za-z0-9_\-]+").unwrap();
}

pub trait ContractSink: Debug {
    fn write_contract(
        &self,
        artifact: &ContractArtifact,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

// one file per (consumer, provider) pair, overwritten on every write
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    output_dir: PathBuf,
}

impl JsonFileSink {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn contract_path<C: AsRef<str>, P: AsRef<str>>(&self, consumer: C, provider: P) -> PathBuf {
        self.output_dir.join(format!(
            "{}-{}.json",
            sanitize(consumer.as_ref()),
            sanitize(provider.as_ref())
        ))
    }
}

impl ContractSink for JsonFileSink {
    fn write_contract(
        &self,
        artifact: &ContractArtifact,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        fs::create_dir_all(&self.output_dir)?;

        let path = self.contract_path(&artifact.consumer.name, &artifact.provider.name);
        let mut file = File::create(&path)?;
        file.write_all(artifact.to_json()?.as_bytes())?;

        info!("contract written to {}", path.display());

        Ok(())
    }
}

fn sanitize(name: &str) -> String {
    FILENAME_SANITIZER
        .replace_all(name, "-")
        .trim_matches('-')
        .to_string()
}
