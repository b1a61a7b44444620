//! Reading heroes out of a Wildermyth `legacy.json` (plain or zipped).
//!
//! ```text
//! load_legacy_json → LegacyFile → extract_individual_entities
//!   → Vec<IndividualSnapshot> per hero → CharacterData::from_snapshots
//! ```

pub mod schema;
mod consolidate;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tracing::{error, info, warn};
use zip::ZipArchive;

use crate::model::CharacterData;
use crate::{Error, Result};

pub use schema::{
    entity_to_map, AspectEntries, IdValue, IndividualHistory, IndividualSnapshot, IndividualStatus,
    LegacyEntry, LegacyFile, Snapshot,
};

/// Entry name the game writes inside exported legacy archives.
pub const LEGACY_ARCHIVE_ENTRY: &str = "legacy.json";

/// Read a legacy from a `.json` file or a `.zip` archive holding one.
pub fn load_legacy_json(path: impl AsRef<Path>) -> Result<LegacyFile> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let legacy: LegacyFile = match extension.as_deref() {
        Some("json") => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        Some("zip") => read_legacy_archive(BufReader::new(File::open(path)?))?,
        _ => return Err(Error::UnsupportedFormat(path.display().to_string())),
    };
    info!(path = %path.display(), entries = legacy.entries.len(), "loaded legacy file");
    Ok(legacy)
}

/// Decode the legacy inside a zip archive.
///
/// `legacy.json` is preferred; otherwise the first `.json` entry in archive
/// order is used.
pub fn read_legacy_archive<R: Read + Seek>(reader: R) -> Result<LegacyFile> {
    let mut archive = ZipArchive::new(reader)?;

    let mut json_names = Vec::new();
    for idx in 0..archive.len() {
        let name = archive.by_index(idx)?.name().to_string();
        if name.to_ascii_lowercase().ends_with(".json") {
            json_names.push(name);
        }
    }

    let name = if json_names.iter().any(|name| name == LEGACY_ARCHIVE_ENTRY) {
        LEGACY_ARCHIVE_ENTRY.to_string()
    } else {
        let first = json_names
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidData("no JSON files found in legacy archive".into()))?;
        warn!(entry = %first, "no legacy.json in archive, reading first JSON entry instead");
        first
    };

    let entry = archive.by_name(&name)?;
    Ok(serde_json::from_reader(BufReader::new(entry))?)
}

/// Snapshots of every hero in the legacy, each list sorted by date.
///
/// Non-hero entries are skipped. Snapshots without a hero entity are skipped
/// and logged; heroes left without any snapshot are dropped.
pub fn extract_individual_entities(legacy: &LegacyFile) -> Result<Vec<Vec<IndividualSnapshot>>> {
    let mut res = Vec::new();
    for entry in &legacy.entries {
        if entry.entry_type != schema::INDIVIDUAL_ENTRY {
            info!(entry = %entry.id.value, entry_type = %entry.entry_type, "skipping non-hero legacy entry");
            continue;
        }
        if entry.snapshots.is_empty() {
            error!(entry = %entry.id.value, "legacy entry has no snapshots");
        }

        let mut snapshots: Vec<_> = entry.snapshots.iter().collect();
        snapshots.sort_by_key(|snapshot| snapshot.date);

        let mut individual = Vec::with_capacity(snapshots.len());
        for (idx, snapshot) in snapshots.into_iter().enumerate() {
            let Some(entity) = snapshot.individual_entity() else {
                error!(entry = %entry.id.value, snapshot = idx + 1, "snapshot has no individual entity");
                continue;
            };
            individual.push(IndividualSnapshot::from_entity(entity)?);
        }

        if !individual.is_empty() {
            res.push(individual);
        }
    }
    Ok(res)
}

/// One consolidated record per hero in the legacy.
pub fn load_characters(legacy: &LegacyFile) -> Result<Vec<CharacterData>> {
    extract_individual_entities(legacy)?
        .iter()
        .map(|snapshots| CharacterData::from_snapshots(snapshots))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn legacy() -> LegacyFile {
        serde_json::from_value(json!({
            "entries": [
                {
                    "id": {"value": "hero-1"},
                    "type": "INDIVIDUAL",
                    "snapshots": [
                        {"date": 20, "entities": [[{"value": "hero-1"}, "individual", {}, "status", {"name": "Old Ada"}]]},
                        {"date": 10, "entities": [[{"value": "hero-1"}, "individual", {}, "status", {"name": "Young Ada"}]]},
                        {"date": 30, "entities": [[{"value": "dog"}, "pet", {}]]}
                    ]
                },
                {"id": {"value": "wolf"}, "type": "MONSTER", "snapshots": []},
                {"id": {"value": "ghost"}, "type": "INDIVIDUAL", "snapshots": []}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_extract_sorts_and_skips() {
        let heroes = extract_individual_entities(&legacy()).unwrap();
        assert_eq!(heroes.len(), 1);
        let names: Vec<&str> = heroes[0].iter().map(|s| s.status.name.as_str()).collect();
        assert_eq!(names, vec!["Young Ada", "Old Ada"]);
    }

    #[test]
    fn test_load_characters() {
        let characters = load_characters(&legacy()).unwrap();
        assert_eq!(characters.len(), 1);
        assert_eq!(characters[0].name, "Old Ada");
    }

    #[test]
    fn test_load_rejects_other_extensions() {
        assert!(matches!(load_legacy_json("legacy.txt"), Err(Error::UnsupportedFormat(_))));
        assert!(matches!(load_legacy_json("legacy"), Err(Error::UnsupportedFormat(_))));
        assert!(matches!(load_legacy_json("/nonexistent/legacy.JSON"), Err(Error::Io(_))));
        assert!(matches!(load_legacy_json("/nonexistent/legacy.json.ZIP"), Err(Error::Io(_))));
    }

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn legacy_bytes() -> Vec<u8> {
        serde_json::to_vec(&json!({"entries": [{"id": {"value": "hero-1"}, "type": "INDIVIDUAL", "snapshots": []}]}))
            .unwrap()
    }

    #[test]
    fn test_load_zip_archive_from_disk() {
        let path = std::env::temp_dir().join(format!("legacy-chart-{}-unit.json.zip", std::process::id()));
        std::fs::write(&path, archive(&[("readme.txt", b"hi".as_slice()), ("legacy.json", legacy_bytes().as_slice())])).unwrap();
        let res = load_legacy_json(&path);
        std::fs::remove_file(&path).unwrap();

        let legacy = res.unwrap();
        assert_eq!(legacy.entries.len(), 1);
        assert_eq!(legacy.entries[0].id.value, "hero-1");
    }

    #[test]
    fn test_archive_prefers_legacy_json() {
        let bytes = archive(&[("other.json", br#"{"entries": []}"#.as_slice()), ("legacy.json", legacy_bytes().as_slice())]);
        let legacy = read_legacy_archive(Cursor::new(bytes)).unwrap();
        assert_eq!(legacy.entries.len(), 1);
    }

    #[test]
    fn test_archive_falls_back_to_first_json() {
        let bytes = archive(&[
            ("notes.txt", b"x".as_slice()),
            ("Backup.JSON", legacy_bytes().as_slice()),
            ("z.json", b"not json".as_slice()),
        ]);
        let legacy = read_legacy_archive(Cursor::new(bytes)).unwrap();
        assert_eq!(legacy.entries[0].id.value, "hero-1");
    }

    #[test]
    fn test_archive_without_json() {
        let bytes = archive(&[("notes.txt", b"x".as_slice())]);
        assert!(matches!(read_legacy_archive(Cursor::new(bytes)), Err(Error::InvalidData(_))));
        assert!(matches!(read_legacy_archive(Cursor::new(b"not a zip".to_vec())), Err(Error::Zip(_))));
    }
}
