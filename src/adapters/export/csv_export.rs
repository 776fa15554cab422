//! CSV export of the directory. Uses the `csv` crate for quoting and escaping.
//!
//! Format: `Name;Type;Code;Members;Created` (semicolon-delimited).

use crate::domain::{DomainError, Group};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

const HEADER: [&str; 5] = ["Name", "Type", "Code", "Members", "Created"];

/// Render groups as a CSV string with a header row.
pub fn groups_to_csv(groups: &[Group]) -> Result<String, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_writer(Vec::new());

    wtr.write_record(HEADER)?;

    for g in groups {
        let created = g.created_at.format("%Y-%m-%d %H:%M").to_string();
        // Names are single-line in the UI; keep rows single-line too.
        let name = g.name.replace(['\n', '\r'], " ");
        let members = g.member_count.to_string();
        wtr.write_record([
            name.as_str(),
            g.kind.as_str(),
            g.code.as_str(),
            members.as_str(),
            created.as_str(),
        ])?;
    }

    wtr.flush()?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))?;

    String::from_utf8(bytes).map_err(|e| {
        csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })
}

fn export_file_name(now: DateTime<Utc>) -> String {
    format!("groups-{}.csv", now.format("%Y%m%d-%H%M%S"))
}

/// Write `groups-YYYYmmdd-HHMMSS.csv` under `dir` (created if missing). Returns the file path.
pub async fn write_export(dir: impl AsRef<Path>, groups: &[Group]) -> Result<PathBuf, DomainError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| DomainError::Export(format!("create {}: {}", dir.display(), e)))?;
    let csv = groups_to_csv(groups).map_err(|e| DomainError::Export(e.to_string()))?;
    let path = dir.join(export_file_name(Utc::now()));
    tokio::fs::write(&path, csv)
        .await
        .map_err(|e| DomainError::Export(format!("write {}: {}", path.display(), e)))?;
    info!(path = %path.display(), count = groups.len(), "directory exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupId, JoinCode, NewGroup};
    use chrono::TimeZone;

    fn group(name: &str, code: &str, members: u64) -> Group {
        let draft = NewGroup::new(name, "Team", JoinCode::parse(code).unwrap()).unwrap();
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap();
        let mut g = Group::from_new(GroupId(format!("id-{code}")), draft, created);
        g.member_count = members;
        g
    }

    #[test]
    fn test_groups_to_csv_basic() {
        let csv = groups_to_csv(&[group("Eagles", "AB12CD", 4)]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Name;Type;Code;Members;Created");
        assert_eq!(lines[1], "Eagles;Team;AB12CD;4;2024-01-01 09:30");
    }

    #[test]
    fn test_groups_to_csv_quotes_special_chars() {
        let csv = groups_to_csv(&[group("Eagles; \"A\"\nSquad", "AB12CD", 1)]).unwrap();
        // header + 1 row; the delimiter inside the name is quoted.
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("\"Eagles; \"\"A\"\" Squad\""));
    }

    #[test]
    fn test_export_file_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(export_file_name(now), "groups-20240305-070809.csv");
    }

    #[tokio::test]
    async fn test_write_export_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("exports");
        let path = write_export(&target, &[group("Eagles", "AB12CD", 2)])
            .await
            .unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("AB12CD"));
    }
}
