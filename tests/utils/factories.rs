/// Test data factories using builder pattern
use metaload_lib::modules::table::Table;

pub struct CsvFactory {
    key_header: String,
    rows: usize,
    duplicates: Vec<(usize, usize)>,
    blanks: Vec<usize>,
}

impl Default for CsvFactory {
    fn default() -> Self {
        Self {
            key_header: "DeveloperName".to_string(),
            rows: 3,
            duplicates: Vec::new(),
            blanks: Vec::new(),
        }
    }
}

impl CsvFactory {
    pub fn rows(rows: usize) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn with_key_header(mut self, header: &str) -> Self {
        self.key_header = header.to_string();
        self
    }

    /// Row `copy` (0-based) repeats the key of row `original`
    pub fn with_duplicate(mut self, original: usize, copy: usize) -> Self {
        self.duplicates.push((original, copy));
        self
    }

    pub fn with_blank_key(mut self, row: usize) -> Self {
        self.blanks.push(row);
        self
    }

    fn key(&self, row: usize) -> String {
        if self.blanks.contains(&row) {
            return String::new();
        }
        let source = self
            .duplicates
            .iter()
            .find(|(_, copy)| *copy == row)
            .map_or(row, |(original, _)| *original);
        format!("Setting_{:04}", source)
    }

    pub fn build_csv(&self) -> String {
        let mut csv = format!("{},Label,Value__c\n", self.key_header);
        for row in 0..self.rows {
            csv.push_str(&format!("{},Setting {},{}\n", self.key(row), row, row * 10));
        }
        csv
    }

    pub fn build(&self) -> Table {
        Table::from_rows(
            vec![
                self.key_header.clone(),
                "Label".to_string(),
                "Value__c".to_string(),
            ],
            (0..self.rows)
                .map(|row| vec![self.key(row), format!("Setting {}", row), (row * 10).to_string()])
                .collect(),
        )
        .unwrap()
    }
}
