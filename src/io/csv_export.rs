use std::io::Write;
use std::path::Path;

use crate::error::PersistError;
use crate::model::{ColumnMap, FlightRecord};

/// Write records as CSV in the given column order, header first.
/// Returns the number of records written.
pub fn write_csv<W: Write>(
    records: &[FlightRecord],
    order: &[String],
    columns: &ColumnMap,
    writer: W,
) -> Result<usize, PersistError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(order)?;
    for record in records {
        wtr.write_record(record.to_row(order, columns))?;
    }
    wtr.flush()?;
    Ok(records.len())
}

/// Export records to a comma-delimited CSV file that re-imports unchanged.
pub fn export_csv(
    records: &[FlightRecord],
    order: &[String],
    columns: &ColumnMap,
    path: &Path,
) -> Result<usize, PersistError> {
    let file = std::fs::File::create(path)?;
    let written = write_csv(records, order, columns, file)?;
    tracing::info!(path = %path.display(), flights = written, "exported CSV");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::csv_import::import_csv;
    use crate::model::store::tests::table;
    use crate::model::{FlightKey, RecordPatch, RecordStore, Track};

    #[test]
    fn test_write_follows_source_order() {
        let mut store = RecordStore::new(ColumnMap::default());
        store.load(&table(&[("CA", 1, 3, 0, 60)])).unwrap();
        store
            .mutate(
                Track::Modified,
                &FlightKey::new("CA", 1),
                &RecordPatch::schedule(3, 10, 70),
            )
            .unwrap();

        let mut out = Vec::new();
        let written = write_csv(
            store.records(Track::Modified),
            &store.export_order(),
            store.columns(),
            &mut out,
        )
        .unwrap();
        assert_eq!(written, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "TYPE,Flight,AC,DET,ART,DEP,ARR,COST\nCA,1,3,10,70,PEK,SHA,100\n"
        );
    }

    #[test]
    fn test_export_reimports() {
        let mut store = RecordStore::new(ColumnMap::default());
        let source = table(&[("CA", 1, 3, 0, 60), ("MU", 2, 4, 30, 90)]);
        store.load(&source).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modified.csv");
        export_csv(
            store.records(Track::Modified),
            &store.export_order(),
            store.columns(),
            &path,
        )
        .unwrap();

        let reimported = import_csv(&path).unwrap();
        assert_eq!(reimported, source);
    }
}
