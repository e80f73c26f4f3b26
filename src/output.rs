use std::fs;
use std::path::Path;
use csv::Writer;

use crate::defect_name::parse_defect_path;
use crate::errors::Result;
use crate::session::SessionRecord;

/// Write the session history to CSV, one row per move, skip or undo
pub fn write_session_csv<P: AsRef<Path>>(records: &[SessionRecord], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = Writer::from_path(output_path)?;

    writer.write_record([
        "Photo",
        "Label",
        "Destination",
        "Outcome",
        "Die_X",
        "Die_Y",
        "Defect_Code",
    ])?;

    for record in records {
        // Names without a die triple leave the last three columns empty
        let (die_x, die_y, defect_code) = match parse_defect_path(&record.photo) {
            Some(name) => (
                name.die_x.to_string(),
                name.die_y.to_string(),
                name.defect_code.to_string(),
            ),
            None => (String::new(), String::new(), String::new()),
        };

        writer.write_record([
            record.photo.display().to_string(),
            record.label.clone(),
            record.destination.display().to_string(),
            record.kind.as_str().to_string(),
            die_x,
            die_y,
            defect_code,
        ])?;
    }

    writer.flush()?;

    log::info!("Wrote {} session records to {}", records.len(), output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RecordKind;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn writes_header_and_parsed_die_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports/session.csv");
        let records = vec![
            SessionRecord {
                photo: PathBuf::from("/lot/W05_12_34_16.jpg"),
                label: "Particle".to_string(),
                destination: PathBuf::from("/lot/Particle"),
                kind: RecordKind::Moved,
            },
            SessionRecord {
                photo: PathBuf::from("/lot/defect_01.jpg"),
                label: "Scratch".to_string(),
                destination: PathBuf::from("/lot/Scratch"),
                kind: RecordKind::Skipped,
            },
        ];

        write_session_csv(&records, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Photo,Label,Destination,Outcome,Die_X,Die_Y,Defect_Code");
        assert_eq!(lines[1], "/lot/W05_12_34_16.jpg,Particle,/lot/Particle,moved,12,34,16");
        assert_eq!(lines[2], "/lot/defect_01.jpg,Scratch,/lot/Scratch,skipped,,,");
    }
}
