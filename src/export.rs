//! The store's tabular output surface: CSV with one row per
//! `(track, frame)` pair.
//!
//! Track-identifying columns are only emitted on a track's first row;
//! continuation rows leave them empty. Attribute columns follow the
//! schema negotiated from the first detection ever stored.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::detection::AttributeValue;
use crate::store::TrackStore;

impl TrackStore {
    /// Writes the whole store as CSV.
    ///
    /// # Errors
    ///
    /// Returns an error when writing fails.
    pub fn write_csv(&self, writer: &mut impl Write) -> io::Result<()> {
        write!(writer, "trackID,seriesID,motherTrackID,daughterTrackIDs,Frame")?;
        for name in self.schema() {
            write!(writer, ",{name}")?;
        }
        writeln!(writer)?;

        for track in self.iter() {
            let mut first_row = true;
            for (frame, record) in track.frames() {
                let mut cells: Vec<String> = Vec::with_capacity(5 + self.schema().len());
                if first_row {
                    cells.push(track.id().to_string());
                    cells.push("1".to_owned());
                    cells.push(track.mother_id().map_or_else(String::new, |id| id.to_string()));
                    cells.push(
                        track
                            .daughter_ids()
                            .map_or_else(String::new, |(d1, d2)| format!("[{d1} {d2}]")),
                    );
                    first_row = false;
                } else {
                    cells.extend([String::new(), String::new(), String::new(), String::new()]);
                }
                cells.push(frame.to_string());
                for name in self.schema() {
                    cells.push(
                        record
                            .and_then(|data| data.get(name))
                            .map_or_else(String::new, format_value),
                    );
                }
                writeln!(writer, "{}", cells.join(","))?;
            }
        }
        Ok(())
    }

    /// Writes the whole store as a CSV file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be created or written.
    pub fn export_csv(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_csv(&mut writer)?;
        writer.flush()
    }
}

/// One attribute value as a CSV cell: scalars and one-element vectors
/// bare, multi-element vectors bracketed and space-separated.
fn format_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Scalar(v) => format!("{v}"),
        AttributeValue::Vector(values) => match values.as_slice() {
            [single] => format!("{single}"),
            _ => bracketed(values.iter()),
        },
        AttributeValue::Pixels(indices) => match indices.as_slice() {
            [single] => format!("{single}"),
            _ => bracketed(indices.iter()),
        },
        AttributeValue::Text(text) => text.clone(),
    }
}

fn bracketed(values: impl Iterator<Item = impl std::fmt::Display>) -> String {
    let mut out = String::from("[");
    for (i, value) in values.enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&value.to_string());
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use crate::detection::Detection;
    use crate::store::TrackStore;

    #[test]
    fn test_csv_layout() {
        let mut store = TrackStore::new();
        let parent = store.add_track(
            1,
            Detection::new().with_vector("centroid", vec![0.0, 0.0]).with_scalar("area", 4.0),
        );
        store
            .append_frame(
                parent,
                2,
                Detection::new().with_vector("centroid", vec![1.0, 1.0]).with_scalar("area", 5.0),
            )
            .unwrap();
        let d1 = store.add_track(3, Detection::new().with_vector("centroid", vec![0.0, 2.0]));
        let d2 = store.add_track(3, Detection::new().with_vector("centroid", vec![2.0, 0.0]));
        store.set_mother(d1, parent).unwrap();
        store.set_mother(d2, parent).unwrap();
        store.set_daughters(parent, (d1, d2)).unwrap();

        let mut buffer = Vec::new();
        store.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "trackID,seriesID,motherTrackID,daughterTrackIDs,Frame,centroid,area");
        assert_eq!(lines[1], "1,1,,[2 3],1,[0 0],4");
        // Continuation row: track-identifying columns stay empty.
        assert_eq!(lines[2], ",,,,2,[1 1],5");
        // Daughters carry their mother and an empty area cell.
        assert_eq!(lines[3], "2,1,1,,3,[0 2],");
        assert_eq!(lines[4], "3,1,1,,3,[2 0],");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_null_records_leave_attribute_cells_empty() {
        let mut store = TrackStore::new();
        let id = store.add_track(1, Detection::new().with_scalar("area", 1.0));
        store.append_frame(id, 3, Detection::new().with_scalar("area", 2.0)).unwrap();

        let mut buffer = Vec::new();
        store.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "1,1,,,1,1");
        assert_eq!(lines[2], ",,,,2,");
        assert_eq!(lines[3], ",,,,3,2");
    }
}
