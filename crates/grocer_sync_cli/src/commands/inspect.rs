//! Inspect command implementation.

use grocer_sync_engine::LocalState;
use grocer_sync_protocol::{EntityKind, StateSnapshot};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// State file inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// File path.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// One report per entity.
    pub entities: Vec<EntityReport>,
}

/// What a state file holds for one entity.
#[derive(Debug, Serialize)]
pub struct EntityReport {
    /// Entity name.
    pub entity: EntityKind,
    /// Whether a snapshot is stored.
    pub present: bool,
    /// Stored timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Stored checksum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Whether the stored checksum matches the data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum_valid: Option<bool>,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(path)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Reads a local or remote state file and checks every stored checksum.
pub fn inspect(path: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No state file found at {:?}", path).into());
    }

    let json = fs::read_to_string(path)?;
    // Remote files share the local layout, with every entity present.
    let state = LocalState::from_json(&json)?;

    let entities = vec![
        report(EntityKind::Cart, state.cart.as_ref())?,
        report(EntityKind::Orders, state.orders.as_ref())?,
        report(EntityKind::Profile, state.profile.as_ref())?,
    ];

    Ok(InspectResult {
        path: path.display().to_string(),
        size: fs::metadata(path)?.len(),
        entities,
    })
}

fn report<T: Serialize>(
    entity: EntityKind,
    snapshot: Option<&StateSnapshot<T>>,
) -> Result<EntityReport, Box<dyn std::error::Error>> {
    Ok(match snapshot {
        Some(snapshot) => EntityReport {
            entity,
            present: true,
            updated_at: Some(snapshot.updated_at.to_string()),
            checksum: Some(snapshot.checksum.to_string()),
            checksum_valid: Some(snapshot.verify()?),
        },
        None => EntityReport {
            entity,
            present: false,
            updated_at: None,
            checksum: None,
            checksum_valid: None,
        },
    })
}

fn print_text_output(result: &InspectResult) {
    println!("Grocer State Inspection");
    println!("=======================");
    println!();
    println!("Path: {}", result.path);
    println!("Size: {} bytes", result.size);
    println!();

    for entity in &result.entities {
        if !entity.present {
            println!("  {:<8} (never synced)", entity.entity.name());
            continue;
        }
        let valid = match entity.checksum_valid {
            Some(true) => "ok",
            _ => "MISMATCH",
        };
        println!(
            "  {:<8} updated {}  checksum {} [{}]",
            entity.entity.name(),
            entity.updated_at.as_deref().unwrap_or("-"),
            short(entity.checksum.as_deref().unwrap_or("")),
            valid
        );
    }
}

fn short(checksum: &str) -> &str {
    checksum.get(..12).unwrap_or(checksum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grocer_sync_testkit::{ServerStateBuilder, TempStateFile};

    #[test]
    fn reports_every_entity_of_a_remote_file() {
        let state = ServerStateBuilder::new().build();
        let file = TempStateFile::with_contents("remote.json", &state.to_json().unwrap());

        let result = inspect(file.path()).unwrap();

        assert_eq!(result.entities.len(), 3);
        assert!(result.entities.iter().all(|e| e.present));
        assert!(result
            .entities
            .iter()
            .all(|e| e.checksum_valid == Some(true)));
        assert_eq!(result.entities[0].updated_at.as_deref(), Some("100"));
    }

    #[test]
    fn tampered_data_fails_verification() {
        let state = ServerStateBuilder::new().build();
        let mut json: serde_json::Value = serde_json::from_str(&state.to_json().unwrap()).unwrap();
        json["cart"]["data"][0]["quantity"] = serde_json::json!(99);
        let file = TempStateFile::with_contents("remote.json", &json.to_string());

        let result = inspect(file.path()).unwrap();

        assert_eq!(result.entities[0].checksum_valid, Some(false));
        assert_eq!(result.entities[1].checksum_valid, Some(true));
    }

    #[test]
    fn partial_local_file_marks_missing_entities() {
        let file = TempStateFile::with_contents("local.json", "{}");

        let result = inspect(file.path()).unwrap();

        assert!(result.entities.iter().all(|e| !e.present));
    }

    #[test]
    fn missing_file_is_an_error() {
        let file = TempStateFile::new("absent.json");
        assert!(inspect(file.path()).is_err());
    }
}
