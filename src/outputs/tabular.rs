//! CSV dataset output, one row per story.

use crate::models::StoryRecord;

pub const COLUMNS: [&str; 11] = [
    "url",
    "slug",
    "title",
    "author",
    "country",
    "organization",
    "date",
    "type",
    "main_image",
    "sections",
    "body",
];

/// Render the header and one row per record. Absent values are empty cells.
pub fn render(records: &[StoryRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(COLUMNS)?;

    for record in records {
        let sections = record.sections.len().to_string();
        writer.write_record([
            record.url.as_str(),
            record.slug.as_deref().unwrap_or_default(),
            record.title.as_str(),
            record.author_name().unwrap_or_default(),
            record.country.as_deref().unwrap_or_default(),
            record.organization_name().unwrap_or_default(),
            record.date.as_deref().unwrap_or_default(),
            record.story_type.as_deref().unwrap_or_default(),
            record.main_image.as_deref().unwrap_or_default(),
            sections.as_str(),
            record.body.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_record;

    #[test]
    fn test_header_and_rows() {
        let mut second = sample_record("https://borderless.so/stories/b");
        second.author = None;
        second.country = None;
        second.body = "Line one,\nline \"two\"".to_string();
        let records = vec![sample_record("https://borderless.so/stories/a"), second];

        let bytes = render(&records).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), COLUMNS.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "https://borderless.so/stories/a");
        assert_eq!(&rows[0][3], "Ada");
        assert_eq!(&rows[0][4], "Nigeria");
        assert_eq!(&rows[0][6], "2024-03-09");
        assert_eq!(&rows[0][9], "1");
        assert_eq!(&rows[1][3], "");
        assert_eq!(&rows[1][10], "Line one,\nline \"two\"");
    }

    #[test]
    fn test_empty_dataset_has_header_only() {
        let bytes = render(&[]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), format!("{}\n", COLUMNS.join(",")));
    }
}
