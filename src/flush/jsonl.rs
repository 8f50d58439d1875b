use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::DemographicRules;
use crate::error::ImportError;
use crate::model::{Family, GameDate, Person, Tile, Village};
use crate::store::{KindSets, PopulationStore};

/// Scalar state written alongside the record files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldHeader {
    pub current_date: GameDate,
    pub tiles: usize,
    pub people: usize,
    pub families: usize,
    pub villages: usize,
    /// Records not yet written to the durable store.
    #[serde(default)]
    pub pending_inserts: KindSets,
    /// Persisted records changed since the last reconciliation.
    #[serde(default)]
    pub pending_updates: KindSets,
    /// Persisted records removed since the last reconciliation.
    #[serde(default)]
    pub pending_deletes: KindSets,
}

/// Write an iterator of serializable items to a JSONL file (one JSON object per line).
fn write_jsonl<T: Serialize>(path: &Path, items: impl Iterator<Item = T>) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in items {
        serde_json::to_writer(&mut writer, &item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ImportError> {
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut items = Vec::new();
    for (index, line) in BufReader::new(File::open(path)?).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line).map_err(|source| ImportError::Json {
            file: file.clone(),
            line: index + 1,
            source,
        })?;
        items.push(item);
    }
    Ok(items)
}

/// Export the working store to JSONL files in `output_dir`.
///
/// Creates the directory if needed and writes:
/// - `world.json`: a [`WorldHeader`]
/// - `tiles.jsonl`, `people.jsonl`, `families.jsonl`, `villages.jsonl`: one
///   record per line
///
/// Secondary indices are not written; [`import_jsonl`] rebuilds them.
pub fn export_jsonl(store: &PopulationStore, output_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(output_dir)?;

    let header = WorldHeader {
        current_date: store.current_date(),
        tiles: store.tile_count(),
        people: store.person_count(),
        families: store.family_count(),
        villages: store.village_count(),
        pending_inserts: store.pending().inserts.clone(),
        pending_updates: store.pending().updates.clone(),
        pending_deletes: store.pending().deletes.clone(),
    };
    let mut writer = BufWriter::new(File::create(output_dir.join("world.json"))?);
    serde_json::to_writer_pretty(&mut writer, &header)?;
    writer.flush()?;

    write_jsonl(&output_dir.join("tiles.jsonl"), store.tiles())?;
    write_jsonl(&output_dir.join("people.jsonl"), store.people())?;
    write_jsonl(&output_dir.join("families.jsonl"), store.families())?;
    write_jsonl(&output_dir.join("villages.jsonl"), store.villages())?;

    info!(
        dir = %output_dir.display(),
        people = header.people,
        "exported world"
    );
    Ok(())
}

/// Load a world written by [`export_jsonl`] into a fresh store.
///
/// Records with provisional ids come back as pending inserts, as do
/// allocated ids the header lists as not yet written. Pending updates and
/// deletes saved in the header are reinstated.
pub fn import_jsonl(input_dir: &Path, rules: DemographicRules) -> Result<PopulationStore, ImportError> {
    let header: WorldHeader = {
        let text = fs::read_to_string(input_dir.join("world.json"))?;
        serde_json::from_str(&text).map_err(|source| ImportError::Json {
            file: "world.json".to_string(),
            line: 1,
            source,
        })?
    };
    let tiles: Vec<Tile> = read_jsonl(&input_dir.join("tiles.jsonl"))?;
    let people: Vec<Person> = read_jsonl(&input_dir.join("people.jsonl"))?;
    let families: Vec<Family> = read_jsonl(&input_dir.join("families.jsonl"))?;
    let villages: Vec<Village> = read_jsonl(&input_dir.join("villages.jsonl"))?;

    let mut store = PopulationStore::new(rules);
    store.set_current_date(header.current_date);
    store.set_tiles(tiles);
    // Residency sets must exist before villages check their occupants.
    for person in people {
        let is_new = person.id.is_provisional();
        store.add_person(person, is_new)?;
    }
    for village in villages {
        let is_new = village.id.is_provisional();
        store.add_village(village, is_new)?;
    }
    for family in families {
        let is_new = family.id.is_provisional();
        store.add_family(family, is_new)?;
    }
    store.rebuild_indices(header.current_date);
    store.restore_pending(
        header.pending_inserts,
        header.pending_updates,
        header.pending_deletes,
    );

    info!(
        dir = %input_dir.display(),
        people = store.person_count(),
        "imported world"
    );
    Ok(store)
}
