//! Folding a hero's snapshots into one [`CharacterData`].

use serde_json::Value;

use crate::model::*;
use crate::{Error, Result};
use super::schema::{AspectEntries, IndividualSnapshot};

impl CharacterAspect {
    /// Parse a raw aspect entry from `legacy.json`.
    ///
    /// The value may be missing, `null`, a number, or an object with a
    /// `value` field.
    pub fn from_aspect_data(aspect_data: &[Value]) -> Result<Self> {
        let aspect = aspect_data
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidData(format!("aspect entry without a name: {aspect_data:?}")))?;

        let value = match aspect_data.get(1) {
            None | Some(Value::Null) => None,
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::Object(detail)) => detail.get("value").and_then(Value::as_f64),
            Some(other) => {
                return Err(Error::InvalidData(format!("aspect '{aspect}' has unexpected value {other}")));
            }
        };
        Ok(Self::parse(aspect, value))
    }
}

fn parse_entries(entries: &AspectEntries, is_legacy: bool, is_past: bool, snapshot_id: usize) -> Result<Vec<CharacterAspect>> {
    entries
        .entries
        .iter()
        .map(|raw| {
            let mut aspect = CharacterAspect::from_aspect_data(raw)?;
            aspect.is_legacy = is_legacy;
            aspect.is_past = is_past;
            aspect.snapshot_id = Some(snapshot_id);
            Ok(aspect)
        })
        .collect()
}

impl CharacterData {
    /// Consolidate snapshots of one hero, oldest first.
    ///
    /// Id, name and current aspects come from the latest snapshot, followed by
    /// its legacy aspects. Older snapshots are then walked newest to oldest and
    /// contribute past aspects for facts not already known.
    pub fn from_snapshots(snapshots: &[IndividualSnapshot]) -> Result<Self> {
        let Some((latest, older)) = snapshots.split_last() else {
            return Err(Error::InvalidData("hero without snapshots".to_string()));
        };

        let mut res = Self::new(latest.id.value.clone(), latest.status.name.clone());
        res.aspects = parse_entries(&latest.status.aspects, false, false, 0)?;
        if let Some(legacy) = &latest.history.legacy_aspects {
            res.aspects.extend(parse_entries(legacy, true, false, 0)?);
        }

        for (idx, snapshot) in older.iter().rev().enumerate() {
            for aspect in parse_entries(&snapshot.status.aspects, false, true, idx + 1)? {
                if !res.aspects.iter().any(|known| known.same_fact(&aspect)) {
                    res.aspects.push(aspect);
                }
            }
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn snapshot(name: &str, aspects: Value, legacy: Option<Value>) -> IndividualSnapshot {
        let mut history = json!({});
        if let Some(legacy) = legacy {
            history["legacyAspects"] = json!({ "entries": legacy });
        }
        serde_json::from_value(json!({
            "id": {"value": "hero-1"},
            "status": {"name": name, "aspects": {"entries": aspects}},
            "history": history,
        }))
        .unwrap()
    }

    #[test]
    fn test_aspect_value_forms() {
        let bare = CharacterAspect::from_aspect_data(&[json!("male")]).unwrap();
        assert_eq!(bare.title, "male");
        assert_eq!(bare.value, 0.0);

        let numbered = CharacterAspect::from_aspect_data(&[json!("parentOf|b"), json!(2)]).unwrap();
        assert_eq!(numbered.field(0), Some("b"));
        assert_eq!(numbered.value, 2.0);

        let detailed =
            CharacterAspect::from_aspect_data(&[json!("age"), json!({"aspect": "age", "value": 31.5})]).unwrap();
        assert_eq!(detailed.value, 31.5);

        let null = CharacterAspect::from_aspect_data(&[json!("x"), Value::Null]).unwrap();
        assert_eq!(null.value, 0.0);
    }

    #[test]
    fn test_aspect_rejects_bad_entries() {
        assert!(CharacterAspect::from_aspect_data(&[]).is_err());
        assert!(CharacterAspect::from_aspect_data(&[json!(1)]).is_err());
        assert!(CharacterAspect::from_aspect_data(&[json!("x"), json!("y")]).is_err());
    }

    #[test]
    fn test_from_snapshots() {
        let snapshots = vec![
            snapshot("Young Ada", json!([["female"], ["relationship_rival_1|b"]]), None),
            snapshot("Ada", json!([["female"], ["lockedRelationship|rival|b"]]), Some(json!([["hero", 1]]))),
        ];
        let data = CharacterData::from_snapshots(&snapshots).unwrap();

        assert_eq!(data.id, "hero-1");
        assert_eq!(data.name, "Ada");
        let summary: Vec<(&str, bool, bool, Option<usize>)> = data
            .aspects
            .iter()
            .map(|a| (a.title.as_str(), a.is_legacy, a.is_past, a.snapshot_id))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("female", false, false, Some(0)),
                ("lockedRelationship", false, false, Some(0)),
                ("hero", true, false, Some(0)),
                ("relationship_rival_1", false, true, Some(1)),
            ]
        );
    }

    #[test]
    fn test_from_no_snapshots() {
        assert!(matches!(CharacterData::from_snapshots(&[]), Err(Error::InvalidData(_))));
    }
}
