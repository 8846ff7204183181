use crate::domain::model::{
    NeoRow, RawFeedPayload, RawObjectRecord, RejectedRecord, RowSet, TransformOutput,
};
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

pub const NEAR_EARTH_OBJECTS: &str = "near_earth_objects";

/// Flattens a feed payload into one row per object.
///
/// A missing payload, or one without date groups, yields an empty output. Records that
/// cannot be flattened are skipped and reported in `rejected`; only a payload whose
/// overall shape is wrong fails the call.
pub fn transform(payload: Option<&RawFeedPayload>) -> Result<TransformOutput> {
    let Some(payload) = payload else {
        tracing::warn!("🟡 No raw data provided for transformation");
        return Ok(TransformOutput::default());
    };

    let groups = match payload.body().get(NEAR_EARTH_OBJECTS) {
        None | Some(Value::Null) => {
            tracing::warn!("🟡 Payload has no '{}' section", NEAR_EARTH_OBJECTS);
            return Ok(TransformOutput::default());
        }
        Some(Value::Object(groups)) => groups,
        Some(other) => {
            return Err(EtlError::MalformedPayloadError {
                message: format!(
                    "'{}' should map dates to lists, found {}",
                    NEAR_EARTH_OBJECTS,
                    json_kind(other)
                ),
            })
        }
    };

    let mut rows = Vec::new();
    let mut rejected = Vec::new();

    for (date_key, objects) in groups {
        let objects = objects
            .as_array()
            .ok_or_else(|| EtlError::MalformedPayloadError {
                message: format!(
                    "date group '{}' should be a list, found {}",
                    date_key,
                    json_kind(objects)
                ),
            })?;
        let date = NaiveDate::parse_from_str(date_key, "%Y-%m-%d");

        for (position, object) in objects.iter().enumerate() {
            let flattened = match &date {
                Ok(date) => flatten_record(date_key, *date, object),
                Err(e) => Err(EtlError::MalformedRecordError {
                    date: date_key.clone(),
                    id: record_id(object).unwrap_or_default(),
                    reason: format!("date group key is not a calendar date: {}", e),
                }),
            };

            match flattened {
                Ok(row) => rows.push(row),
                Err(err) => {
                    tracing::warn!("⚠️ Skipping record: {}", err);
                    rejected.push(RejectedRecord {
                        date: date_key.clone(),
                        position,
                        id: record_id(object),
                        reason: match err {
                            EtlError::MalformedRecordError { reason, .. } => reason,
                            other => other.to_string(),
                        },
                    });
                }
            }
        }
    }

    tracing::info!(
        rows = rows.len(),
        rejected = rejected.len(),
        "✅ Transformation finished"
    );

    Ok(TransformOutput {
        rows: RowSet::new(rows),
        rejected,
    })
}

fn flatten_record(date_key: &str, date: NaiveDate, object: &Value) -> Result<NeoRow> {
    let malformed = |reason: String| EtlError::MalformedRecordError {
        date: date_key.to_string(),
        id: record_id(object).unwrap_or_else(|| "?".to_string()),
        reason,
    };

    let record = RawObjectRecord::deserialize(object).map_err(|e| malformed(e.to_string()))?;

    // Later approaches are ignored; the feed lists them in its own order.
    let approach = record
        .close_approach_data
        .first()
        .ok_or_else(|| malformed("no close-approach events".to_string()))?;

    let bounds = &record.estimated_diameter.kilometers;
    let row = NeoRow {
        id: record.id,
        name: record.name,
        is_potentially_hazardous: record.is_potentially_hazardous_asteroid,
        close_approach_date: date,
        diameter_min_km: bounds.estimated_diameter_min,
        diameter_max_km: bounds.estimated_diameter_max,
        relative_velocity_km_s: approach.relative_velocity.kilometers_per_second,
        miss_distance_km: approach.miss_distance.kilometers,
    };

    for (field, value) in [
        ("diameter_min_km", row.diameter_min_km),
        ("diameter_max_km", row.diameter_max_km),
        ("relative_velocity_km_s", row.relative_velocity_km_s),
        ("miss_distance_km", row.miss_distance_km),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(malformed(format!("{} must be a non-negative number, got {}", field, value)));
        }
    }
    if row.diameter_min_km > row.diameter_max_km {
        return Err(malformed(format!(
            "diameter min {} exceeds max {}",
            row.diameter_min_km, row.diameter_max_km
        )));
    }

    Ok(row)
}

fn record_id(object: &Value) -> Option<String> {
    match object.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// CSV rendering of the rows, header included.
pub fn rows_to_csv(rows: &RowSet) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record(crate::domain::model::NEO_ROW_COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}
