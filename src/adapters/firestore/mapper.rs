//! Map Firestore REST documents to domain entities and back.
//!
//! Firestore encodes each field as a typed value object, e.g.
//! `{"memberCount": {"integerValue": "3"}}` (64-bit integers travel as strings).

use crate::domain::{DomainError, Group, GroupId, JoinCode};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

/// Field names shared with the mobile app's documents.
pub const FIELD_ID: &str = "id";
pub const FIELD_NAME: &str = "name";
pub const FIELD_TYPE: &str = "type";
pub const FIELD_CODE: &str = "code";
pub const FIELD_MEMBER_COUNT: &str = "memberCount";
pub const FIELD_CREATED_AT: &str = "createdAt";
/// Field of a code reservation document pointing at its group.
pub const FIELD_GROUP_ID: &str = "groupId";

/// Encode a group as a Firestore `fields` map.
pub fn group_to_fields(group: &Group) -> Value {
    json!({
        FIELD_ID: { "stringValue": group.id.as_str() },
        FIELD_NAME: { "stringValue": group.name },
        FIELD_TYPE: { "stringValue": group.kind },
        FIELD_CODE: { "stringValue": group.code.as_str() },
        FIELD_MEMBER_COUNT: { "integerValue": group.member_count.to_string() },
        FIELD_CREATED_AT: {
            "timestampValue": group.created_at.to_rfc3339_opts(SecondsFormat::Micros, true)
        },
    })
}

pub fn reservation_fields(group_id: &GroupId) -> Value {
    json!({ FIELD_GROUP_ID: { "stringValue": group_id.as_str() } })
}

/// Last path segment of a document resource name.
pub fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn fields(doc: &Value) -> Result<&Map<String, Value>, DomainError> {
    doc.get("fields")
        .and_then(Value::as_object)
        .ok_or_else(|| DomainError::Store("document has no fields".into()))
}

fn string_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key)?.get("stringValue")?.as_str()
}

/// `Ok(None)` when the field is absent. Doubles are accepted only when they hold a whole number.
fn integer_field(fields: &Map<String, Value>, key: &str) -> Result<Option<i64>, String> {
    let Some(value) = fields.get(key) else {
        return Ok(None);
    };
    if let Some(double) = value.get("doubleValue").and_then(Value::as_f64) {
        if !double.is_finite() || double.fract() != 0.0 || double.abs() >= i64::MAX as f64 {
            return Err(format!("{} is not a whole number", double));
        }
        return Ok(Some(double as i64));
    }
    let parsed = match value.get("integerValue") {
        Some(Value::String(s)) => s.parse().ok(),
        Some(Value::Number(n)) => n.as_i64(),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| format!("unsupported value {}", value))
}

fn timestamp_field(fields: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let raw = fields.get(key)?.get("timestampValue")?.as_str()?;
    parse_timestamp(raw)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Decode a group document. Requires name, type, code and memberCount.
/// The id comes from the `id` field when present, otherwise from the resource name.
pub fn document_to_group(doc: &Value) -> Result<Group, DomainError> {
    let fields = fields(doc)?;
    let resource = doc.get("name").and_then(Value::as_str).unwrap_or_default();
    let id = string_field(fields, FIELD_ID)
        .map(str::to_string)
        .unwrap_or_else(|| document_id(resource).to_string());
    if id.is_empty() {
        return Err(DomainError::Store("document has no id".into()));
    }
    let missing = |field: &str| DomainError::Store(format!("document {} missing {}", id, field));

    let name = string_field(fields, FIELD_NAME).ok_or_else(|| missing(FIELD_NAME))?;
    let kind = string_field(fields, FIELD_TYPE).ok_or_else(|| missing(FIELD_TYPE))?;
    let code = string_field(fields, FIELD_CODE).ok_or_else(|| missing(FIELD_CODE))?;
    let member_count = integer_field(fields, FIELD_MEMBER_COUNT)
        .map_err(|e| {
            DomainError::Store(format!("document {} has bad {}: {}", id, FIELD_MEMBER_COUNT, e))
        })?
        .ok_or_else(|| missing(FIELD_MEMBER_COUNT))?;

    let code = JoinCode::parse(code)
        .map_err(|e| DomainError::Store(format!("document {} has bad code: {}", id, e)))?;
    let member_count = u64::try_from(member_count)
        .map_err(|_| DomainError::Store(format!("document {} has negative memberCount", id)))?;
    let created_at = timestamp_field(fields, FIELD_CREATED_AT)
        .or_else(|| {
            doc.get("createTime")
                .and_then(Value::as_str)
                .and_then(parse_timestamp)
        })
        .unwrap_or_default();

    Ok(Group {
        id: GroupId(id),
        name: name.to_string(),
        kind: kind.to_string(),
        code,
        member_count,
        created_at,
    })
}

/// Group id a reservation document points to.
pub fn reservation_group_id(doc: &Value) -> Option<GroupId> {
    let fields = fields(doc).ok()?;
    string_field(fields, FIELD_GROUP_ID).map(|s| GroupId(s.to_string()))
}

/// Documents in a `:runQuery` response. Entries without a document (bare `readTime`) are skipped.
pub fn query_result_documents(response: &Value) -> impl Iterator<Item = &Value> {
    response
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("document"))
}

/// New member count from a `:commit` response whose first write was an increment transform.
pub fn committed_member_count(commit_response: &Value) -> Option<u64> {
    let value = commit_response
        .get("writeResults")?
        .get(0)?
        .get("transformResults")?
        .get(0)?
        .get("integerValue")?;
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}
