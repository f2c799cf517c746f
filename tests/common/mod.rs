#![allow(dead_code)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use abm_providers::{ProviderRepository, RepositoryConfig};
use tempfile::TempDir;

/// The sample definitions shipped under `tests/fixtures/providers`.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("providers")
}

/// Smallest satellite definition that passes validation.
pub fn minimal_satellite(name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<provider>
	<name>{name}</name>
	<streamtype>1</streamtype>
	<protocol>sky</protocol>
	<transponder
		frequency="11778000"
		symbol_rate="27500000"
		polarization="1"
		fec_inner="2"
		orbital_position="282"
		inversion="2"
		system="0"
		modulation="1"
		roll_off="0"
		pilot="2"
		nit_pid="0x10"
		nit_current_table_id="0x40"
		nit_other_table_id="0x41"
		sdt_pid="0x11"
		sdt_current_table_id="0x42"
		sdt_other_table_id="0x46"
		bat_pid="0x11"
		bat_table_id="0x4a"
	/>
	<sections></sections>
	<dvbsconfigs>
		<configuration key="1" bouquet="1" region="0">Test</configuration>
	</dvbsconfigs>
	<servicehacks>
<![CDATA[True]]>
	</servicehacks>
</provider>
"#
    )
}

/// Cable definition with one configuration under `protocol`.
pub fn cable_provider(protocol: &str, configuration: &str) -> String {
    format!(
        r#"<provider>
	<name>Cable</name>
	<streamtype>1</streamtype>
	<protocol>{protocol}</protocol>
	<dvbcconfigs>
		{configuration}
	</dvbcconfigs>
	<sections/>
	<servicehacks><![CDATA[True]]></servicehacks>
</provider>"#
    )
}

/// A fixed point in time, well before any file written during a test.
pub fn past(seconds: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000 + seconds)
}

pub fn set_mtime(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

/// Built-in and user directories plus a separate cache location.
pub struct ProviderDirs {
    pub builtin: TempDir,
    pub user: TempDir,
    pub cache: TempDir,
}

impl ProviderDirs {
    pub fn new() -> Self {
        Self {
            builtin: TempDir::new().unwrap(),
            user: TempDir::new().unwrap(),
            cache: TempDir::new().unwrap(),
        }
    }

    pub fn write_builtin(&self, name: &str, content: &str) -> PathBuf {
        let path = self.builtin.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn write_user(&self, name: &str, content: &str) -> PathBuf {
        let path = self.user.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn cache_file(&self) -> PathBuf {
        self.cache.path().join("providers.cache")
    }

    pub fn config(&self) -> RepositoryConfig {
        RepositoryConfig::new(self.builtin.path())
            .with_user_dir(self.user.path())
            .with_cache_file(self.cache_file())
    }

    pub fn repository(&self) -> ProviderRepository {
        ProviderRepository::new(self.config())
    }

    /// Backdate every definition so a cache written now is strictly newer.
    pub fn backdate_sources(&self) {
        for dir in [self.builtin.path(), self.user.path()] {
            for entry in fs::read_dir(dir).unwrap() {
                set_mtime(&entry.unwrap().path(), past(0));
            }
        }
    }
}
