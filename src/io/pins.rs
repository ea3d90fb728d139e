//! JSON pin files.
//!
//! A pin file is an object with a single `pins` array:
//!
//! ```json
//! {
//!   "pins": [
//!     { "vertex": 0, "target": [0.0, 0.0, 0.0] },
//!     { "vertex": 12, "target": [1.0, 2.0, 0.5], "radius": 2.5,
//!       "metric": { "inverse_power": { "power": 2.0 } } }
//!   ]
//! }
//! ```
//!
//! Vertex indices are zero-based positions in the mesh's vertex array.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::algo::deform::Pin;
use crate::error::Result;

#[derive(Debug, Serialize, Deserialize)]
struct PinFile {
    pins: Vec<Pin>,
}

/// Read pins from a JSON file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<Pin>> {
    let file = File::open(path.as_ref())?;
    let parsed: PinFile = serde_json::from_reader(BufReader::new(file))?;
    Ok(parsed.pins)
}

/// Parse pins from JSON text.
pub fn from_str(text: &str) -> Result<Vec<Pin>> {
    let parsed: PinFile = serde_json::from_str(text)?;
    Ok(parsed.pins)
}

/// Write pins as pretty-printed JSON.
pub fn save<P: AsRef<Path>>(pins: &[Pin], path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    let doc = PinFile {
        pins: pins.to_vec(),
    };
    serde_json::to_writer_pretty(&mut writer, &doc)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::FalloffMetric;
    use crate::error::MeshError;
    use nalgebra::Point3;

    #[test]
    fn test_defaults_fill_in() {
        let pins = from_str(r#"{ "pins": [ { "vertex": 4, "target": [1.0, 2.0, 3.0] } ] }"#).unwrap();
        assert_eq!(pins, vec![Pin::new(4, Point3::new(1.0, 2.0, 3.0))]);
    }

    #[test]
    fn test_metric_and_radius() {
        let pins = from_str(
            r#"{ "pins": [ { "vertex": 1, "target": [0, 0, 0], "radius": 2.5,
                 "metric": { "inverse_power": { "power": 3.0 } } } ] }"#,
        )
        .unwrap();
        assert_eq!(pins[0].radius, 2.5);
        assert_eq!(pins[0].metric, FalloffMetric::InversePower { power: 3.0 });
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(from_str(r#"{ "pins": 3 }"#), Err(MeshError::PinFile(_))));
        assert!(matches!(
            from_str(r#"{ "pins": [ { "target": [0, 0, 0] } ] }"#),
            Err(MeshError::PinFile(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let pins = vec![
            Pin::new(0, Point3::new(0.0, 0.0, 0.0)),
            Pin::new(7, Point3::new(-1.5, 0.25, 3.0))
                .with_radius(0.5)
                .with_metric(FalloffMetric::InversePower { power: 2.0 }),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pins.json");

        save(&pins, &path).unwrap();
        assert_eq!(load(&path).unwrap(), pins);
    }
}
