//! Streaming serialization of the merged collection.
//!
//! The collection is written piecewise: the header attributes, then each
//! feature as it arrives. Nothing beyond the current feature is buffered.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{WhiffyError, WhiffyResult};
use crate::feature::Feature;

/// Suffix of the in-progress output file.
const PARTIAL_SUFFIX: &str = ".tmp";

/// Writes a feature collection object to `out`.
///
/// Header attributes come first, followed by the `features` array. A header
/// key named `features` is skipped. Returns the number of features written.
///
/// # Errors
///
/// Stops at the first `Err` from `features` and returns it; the output is
/// left incomplete.
pub fn write_collection<W, I>(
    mut out: W,
    header: &Map<String, Value>,
    features: I,
) -> WhiffyResult<usize>
where
    W: Write,
    I: IntoIterator<Item = WhiffyResult<Feature>>,
{
    out.write_all(b"{")?;
    for (key, value) in header.iter().filter(|(k, _)| k.as_str() != "features") {
        serde_json::to_writer(&mut out, key).map_err(io::Error::from)?;
        out.write_all(b":")?;
        serde_json::to_writer(&mut out, value).map_err(io::Error::from)?;
        out.write_all(b",")?;
    }

    out.write_all(b"\"features\":[")?;
    let mut count = 0;
    for feature in features {
        let feature = feature?;
        if count > 0 {
            out.write_all(b",")?;
        }
        serde_json::to_writer(&mut out, &feature).map_err(io::Error::from)?;
        count += 1;
    }
    out.write_all(b"]}\n")?;
    out.flush()?;

    Ok(count)
}

/// File output that only appears at its final path once complete.
///
/// Data goes to `<path>.tmp`; [`commit`](Self::commit) renames it into
/// place. Dropping without committing removes the temporary file.
pub struct AtomicFileOutput {
    path: PathBuf,
    temp_path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl AtomicFileOutput {
    pub fn create(path: impl Into<PathBuf>) -> WhiffyResult<Self> {
        let path = path.into();
        let mut temp = path.clone().into_os_string();
        temp.push(PARTIAL_SUFFIX);
        let temp_path = PathBuf::from(temp);

        let file = File::create(&temp_path)?;
        Ok(Self {
            path,
            temp_path,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes and moves the file to its final path.
    pub fn commit(mut self) -> WhiffyResult<()> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "output already committed"))?;
        writer.flush()?;
        drop(writer);

        fs::rename(&self.temp_path, &self.path).map_err(WhiffyError::from)
    }
}

impl Write for AtomicFileOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(io::Error::new(io::ErrorKind::Other, "output already committed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for AtomicFileOutput {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn header() -> Map<String, Value> {
        json!({"type": "FeatureCollection", "bbox": [112.0, -35.0, 129.0, -14.0]})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn feature(gid: u64) -> WhiffyResult<Feature> {
        Ok(serde_json::from_value(json!({
            "type": "Feature",
            "geometry": {"type": "Point", "coordinates": [115.8, -31.9]},
            "properties": {"gid": gid}
        }))
        .unwrap())
    }

    fn render(features: Vec<WhiffyResult<Feature>>) -> (usize, Value) {
        let mut out = Vec::new();
        let count = write_collection(&mut out, &header(), features).unwrap();
        assert!(out.ends_with(b"\n"));
        (count, serde_json::from_slice(&out).unwrap())
    }

    #[test]
    fn test_empty_collection_is_valid_json() {
        let (count, value) = render(vec![]);
        assert_eq!(count, 0);
        assert_eq!(value["features"], json!([]));
        assert_eq!(value["type"], json!("FeatureCollection"));
    }

    #[test]
    fn test_single_feature() {
        let (count, value) = render(vec![feature(1)]);
        assert_eq!(count, 1);
        assert_eq!(value["features"][0]["properties"]["gid"], json!(1));
    }

    #[test]
    fn test_many_features_keep_order() {
        let (count, value) = render((1..=5).map(feature).collect());
        assert_eq!(count, 5);
        let gids: Vec<u64> = value["features"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["properties"]["gid"].as_u64().unwrap())
            .collect();
        assert_eq!(gids, vec![1, 2, 3, 4, 5]);
        assert_eq!(value["bbox"], json!([112.0, -35.0, 129.0, -14.0]));
    }

    #[test]
    fn test_header_features_key_is_skipped() {
        let mut header = header();
        header.insert("features".to_string(), json!("bogus"));
        let mut out = Vec::new();

        write_collection(&mut out, &header, vec![feature(1)]).unwrap();

        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["features"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_stream_error_aborts() {
        let mut out = Vec::new();
        let features = vec![feature(1), Err(WhiffyError::Cancelled { levels: 2 }), feature(2)];

        let result = write_collection(&mut out, &header(), features);

        assert!(matches!(result, Err(WhiffyError::Cancelled { .. })));
        assert!(serde_json::from_slice::<Value>(&out).is_err());
    }

    #[test]
    fn test_atomic_output_commit() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.json");

        let mut output = AtomicFileOutput::create(&path).unwrap();
        write_collection(&mut output, &header(), vec![feature(1)]).unwrap();
        assert!(!path.exists());
        output.commit().unwrap();

        let value: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["features"].as_array().unwrap().len(), 1);
        assert!(!temp.path().join("out.json.tmp").exists());
    }

    #[test]
    fn test_atomic_output_dropped_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.json");

        {
            let mut output = AtomicFileOutput::create(&path).unwrap();
            let features = vec![feature(1), Err(WhiffyError::Cancelled { levels: 0 })];
            assert!(write_collection(&mut output, &header(), features).is_err());
        }

        assert!(!path.exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
