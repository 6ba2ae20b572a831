//! Minimal TensorBoard scalar writer.
//!
//! Produces an `events.out.tfevents.*` file: a TFRecord stream whose records
//! are `Event` protobufs carrying `simple_value` summaries. Only the handful
//! of protobuf fields TensorBoard needs for scalars are encoded.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

use super::{LogOutput, Tabular};

const CRC32C_POLY: u32 = 0x82F6_3B78;
const CRC_MASK_DELTA: u32 = 0xA282_EAD8;

const fn crc32c_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut k = 0;
        while k < 8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ CRC32C_POLY } else { crc >> 1 };
            k += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static CRC32C_TABLE: [u32; 256] = crc32c_table();

/// CRC-32C (Castagnoli).
#[must_use]
pub fn crc32c(data: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &b in data {
        crc = CRC32C_TABLE[((crc ^ u32::from(b)) & 0xFF) as usize] ^ (crc >> 8);
    }
    !crc
}

fn masked_crc(data: &[u8]) -> u32 {
    let crc = crc32c(data);
    ((crc >> 15) | (crc << 17)).wrapping_add(CRC_MASK_DELTA)
}

fn put_varint(buf: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buf.push((v as u8) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

fn put_bytes(buf: &mut Vec<u8>, field: u32, bytes: &[u8]) {
    put_varint(buf, u64::from(field << 3 | 2));
    put_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_event(wall_time: f64, step: i64, body: EventBody<'_>) -> Vec<u8> {
    let mut buf = Vec::new();
    // wall_time: double, field 1
    buf.push(0x09);
    buf.extend_from_slice(&wall_time.to_le_bytes());
    // step: int64, field 2
    buf.push(0x10);
    put_varint(&mut buf, step as u64);
    match body {
        EventBody::FileVersion(v) => put_bytes(&mut buf, 3, v.as_bytes()),
        EventBody::Scalar { tag, value } => {
            let mut val = Vec::new();
            put_bytes(&mut val, 1, tag.as_bytes());
            // simple_value: float, field 2
            val.push(0x15);
            val.extend_from_slice(&value.to_le_bytes());
            let mut summary = Vec::new();
            put_bytes(&mut summary, 1, &val);
            put_bytes(&mut buf, 5, &summary);
        }
    }
    buf
}

enum EventBody<'a> {
    FileVersion(&'a str),
    Scalar { tag: &'a str, value: f32 },
}

fn wall_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Scalar event writer for one log directory.
pub struct TensorBoardOutput {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl TensorBoardOutput {
    /// Creates `log_dir` if needed and opens a fresh event file in it.
    ///
    /// # Errors
    ///
    /// Fails if the directory or file cannot be created.
    pub fn new(log_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = log_dir.as_ref();
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        let path = dir.join(format!("events.out.tfevents.{secs}.strider"));
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = Self {
            path,
            writer: Some(BufWriter::new(file)),
        };
        out.write_record(&encode_event(wall_time(), 0, EventBody::FileVersion("brain.Event:2")))?;
        Ok(out)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(&mut self, data: &[u8]) -> Result<()> {
        let Some(w) = self.writer.as_mut() else {
            return Ok(());
        };
        let len = (data.len() as u64).to_le_bytes();
        w.write_all(&len)?;
        w.write_all(&masked_crc(&len).to_le_bytes())?;
        w.write_all(data)?;
        w.write_all(&masked_crc(data).to_le_bytes())?;
        Ok(())
    }
}

impl LogOutput for TensorBoardOutput {
    fn write_tabular(&mut self, step: u64, table: &Tabular) -> Result<()> {
        let now = wall_time();
        let step = i64::try_from(step).unwrap_or(i64::MAX);
        for (tag, value) in table.iter() {
            let event = encode_event(now, step, EventBody::Scalar { tag, value: value as f32 });
            self.write_record(&event)?;
        }
        if let Some(w) = self.writer.as_mut() {
            w.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut w) = self.writer.take() {
            w.flush()?;
        }
        Ok(())
    }
}
