//! NVS-backed key/value store.
//!
//! Writes are staged in memory and only reach flash on `commit`, key by key in
//! the order they were staged. A failing key stays queued with everything
//! after it, and the next `commit` retries from there.

use anyhow::Result;
use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};
use esp_idf_svc::sys::EspError;
use log::{debug, info};
use studio_logo_lib::{Error, KeyValueStore, StagedValue, WriteBatch};

pub const NVS_NAMESPACE: &str = "studio-logo";

pub struct NvsStore {
    nvs: EspNvs<NvsDefault>,
    staged: WriteBatch,
}

fn unavailable(key: &str, e: EspError) -> Error {
    Error::PersistenceUnavailable {
        reason: format!("NVS key '{key}': {e}"),
    }
}

impl NvsStore {
    pub fn open(partition: EspNvsPartition<NvsDefault>) -> Result<Self> {
        debug!("Opening NVS namespace: {NVS_NAMESPACE}");
        let nvs = EspNvs::new(partition, NVS_NAMESPACE, true)?;
        info!("NVS initialized");
        Ok(Self {
            nvs,
            staged: WriteBatch::new(),
        })
    }

    pub fn load_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let Some(len) = self.nvs.blob_len(key)? else {
            return Ok(None);
        };
        debug!("Blob '{key}' size: {len} bytes");
        let mut buf = vec![0u8; len];
        let data = self.nvs.get_blob(key, &mut buf)?.map(<[u8]>::to_vec);
        Ok(data)
    }

    /// Written immediately, outside the staged commit.
    pub fn save_blob(&mut self, key: &str, data: &[u8]) -> Result<()> {
        self.nvs.set_blob(key, data)?;
        debug!("Blob '{key}' saved ({} bytes)", data.len());
        Ok(())
    }
}

impl KeyValueStore for NvsStore {
    fn get_u8(&self, key: &str) -> studio_logo_lib::Result<Option<u8>> {
        self.nvs.get_u8(key).map_err(|e| unavailable(key, e))
    }

    fn set_u8(&mut self, key: &str, value: u8) -> studio_logo_lib::Result<()> {
        self.staged.push(key, StagedValue::U8(value));
        Ok(())
    }

    fn get_str(&self, key: &str) -> studio_logo_lib::Result<Option<String>> {
        let Some(len) = self.nvs.str_len(key).map_err(|e| unavailable(key, e))? else {
            return Ok(None);
        };
        let mut buf = vec![0u8; len];
        let value = self
            .nvs
            .get_str(key, &mut buf)
            .map_err(|e| unavailable(key, e))?;
        Ok(value.map(str::to_string))
    }

    fn set_str(&mut self, key: &str, value: &str) -> studio_logo_lib::Result<()> {
        self.staged.push(key, StagedValue::Str(value.to_string()));
        Ok(())
    }

    fn commit(&mut self) -> studio_logo_lib::Result<()> {
        let nvs = &mut self.nvs;
        let count = self.staged.flush(|key, value| {
            match value {
                StagedValue::U8(v) => nvs.set_u8(key, *v),
                StagedValue::Str(v) => nvs.set_str(key, v),
            }
            .map(|_| ())
            .map_err(|e| unavailable(key, e))
        })?;
        debug!("Committed {count} NVS writes");
        Ok(())
    }
}
