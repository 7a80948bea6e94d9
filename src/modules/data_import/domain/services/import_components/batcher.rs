use crate::modules::table::{Batch, Table};
use std::num::NonZeroUsize;

/// Splits a table into ordered, contiguous batches
pub struct Batcher;

impl Batcher {
    /// Every batch but the last holds exactly `max_rows` records; an empty table yields none
    pub fn split(table: &Table, max_rows: NonZeroUsize) -> Vec<Batch> {
        table
            .rows()
            .chunks(max_rows.get())
            .enumerate()
            .map(|(index, chunk)| Batch {
                index,
                first_row: index * max_rows.get(),
                records: chunk.to_vec(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::table::Record;

    fn table(rows: usize) -> Table {
        Table::from_rows(
            vec!["DeveloperName".to_string()],
            (0..rows).map(|i| vec![format!("R{}", i)]).collect(),
        )
        .unwrap()
    }

    fn rows(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_split_450_rows_by_200() {
        let batches = Batcher::split(&table(450), rows(200));

        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![200, 200, 50]);
        assert_eq!(batches[2].index, 2);
        assert_eq!(batches[2].row_range(), 400..450);
    }

    #[test]
    fn test_empty_table_yields_no_batches() {
        assert!(Batcher::split(&table(0), rows(200)).is_empty());
    }

    #[test]
    fn test_exact_multiple_has_no_short_batch() {
        let batches = Batcher::split(&table(400), rows(200));
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 200));
    }

    #[test]
    fn test_concatenation_reproduces_table() {
        let t = table(17);
        let flattened: Vec<Record> = Batcher::split(&t, rows(5))
            .into_iter()
            .flat_map(|b| b.records)
            .collect();

        assert_eq!(flattened, t.rows());
    }
}
