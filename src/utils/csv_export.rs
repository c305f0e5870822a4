use crate::model::punch::PunchLog;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders punch logs as CSV with a header row.
pub fn punches_to_csv(rows: &[PunchLog]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["id", "employee", "type", "punched_at"])?;

    for row in rows {
        writer.write_record([
            row.id.to_string(),
            row.employee.clone(),
            row.punch_type.to_string(),
            row.punched_at.format(TIMESTAMP_FORMAT).to_string(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
