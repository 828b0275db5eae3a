use ordered_float::OrderedFloat;
use rand::seq::SliceRandom as _;
use rand::Rng;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Named numeric columns with one designated target column.
///
/// Every other column is a feature. Features are addressed by their position
/// among the non-target columns, resolved once here.
#[derive(Debug, Clone)]
pub struct Dataset {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    target: usize,
    features: Vec<usize>,
}

impl Dataset {
    pub fn new(
        names: Vec<String>,
        columns: Vec<Vec<f64>>,
        target: &str,
    ) -> Result<Self, TableError> {
        if columns.is_empty() || columns[0].is_empty() {
            return Err(TableError::EmptyTable);
        }

        if names.len() != columns.len() {
            return Err(TableError::NameCountMismatch {
                names: names.len(),
                columns: columns.len(),
            });
        }

        let rows_len = columns[0].len();
        if columns.iter().skip(1).any(|c| c.len() != rows_len) {
            return Err(TableError::RowSizeMismatch);
        }

        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(TableError::DuplicateColumn { name: name.clone() });
            }
        }

        for (name, column) in names.iter().zip(columns.iter()) {
            if let Some(row) = column.iter().position(|x| !x.is_finite()) {
                return Err(TableError::NonFiniteValue {
                    column: name.clone(),
                    row,
                });
            }
        }

        let target = names
            .iter()
            .position(|n| n == target)
            .ok_or_else(|| TableError::UnknownTarget {
                name: target.to_owned(),
            })?;
        let features = (0..columns.len()).filter(|&i| i != target).collect();

        Ok(Self {
            names,
            columns,
            target,
            features,
        })
    }

    pub fn table(&self) -> Table<'_> {
        Table {
            row_index: (0..self.rows_len()).collect(),
            dataset: self,
        }
    }

    pub fn rows_len(&self) -> usize {
        self.columns[0].len()
    }

    pub fn features_len(&self) -> usize {
        self.features.len()
    }

    pub fn target_name(&self) -> &str {
        &self.names[self.target]
    }

    pub fn feature_name(&self, feature: usize) -> &str {
        &self.names[self.features[feature]]
    }

    pub fn feature_names(&self) -> impl '_ + Iterator<Item = &str> {
        self.features.iter().map(move |&c| self.names[c].as_str())
    }

    fn feature_column(&self, feature: usize) -> &[f64] {
        &self.columns[self.features[feature]]
    }

    fn target_column(&self) -> &[f64] {
        &self.columns[self.target]
    }
}

/// A row-aligned view over a [`Dataset`].
///
/// Rows may repeat, which is how bootstrap samples are represented.
#[derive(Debug, Clone)]
pub struct Table<'a> {
    row_index: Vec<usize>,
    dataset: &'a Dataset,
}

impl<'a> Table<'a> {
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn rows_len(&self) -> usize {
        self.row_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_index.is_empty()
    }

    pub fn features_len(&self) -> usize {
        self.dataset.features_len()
    }

    pub fn target(&self) -> impl '_ + Iterator<Item = f64> + Clone {
        let column = self.dataset.target_column();
        self.row_index.iter().map(move |&i| column[i])
    }

    pub fn feature(&self, feature: usize) -> impl '_ + Iterator<Item = f64> + Clone {
        let column = self.dataset.feature_column(feature);
        self.row_index.iter().map(move |&i| column[i])
    }

    /// Feature values of the `row`-th row of this view, ordered by feature index.
    pub fn feature_row(&self, row: usize) -> Vec<f64> {
        let i = self.row_index[row];
        (0..self.features_len())
            .map(|f| self.dataset.feature_column(f)[i])
            .collect()
    }

    pub fn feature_rows(&self) -> impl '_ + Iterator<Item = Vec<f64>> {
        (0..self.rows_len()).map(move |row| self.feature_row(row))
    }

    /// Distinct values of `feature` in this view, in ascending order.
    pub fn thresholds(&self, feature: usize) -> Vec<f64> {
        self.feature(feature)
            .map(OrderedFloat)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|x| x.0)
            .collect()
    }

    /// Keeps the rows whose `mask` entry is `true`. `mask` is aligned to this view.
    pub fn select(&self, mask: &[bool]) -> Self {
        debug_assert_eq!(mask.len(), self.rows_len());
        let row_index = self
            .row_index
            .iter()
            .zip(mask.iter())
            .filter(|(_, keep)| **keep)
            .map(|(&i, _)| i)
            .collect();
        Self {
            row_index,
            dataset: self.dataset,
        }
    }

    pub fn bootstrap_sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let row_index = if self.is_empty() {
            Vec::new()
        } else {
            (0..self.rows_len())
                .map(|_| self.row_index[rng.gen_range(0..self.rows_len())])
                .collect()
        };
        Self {
            row_index,
            dataset: self.dataset,
        }
    }

    /// Randomly partitions the rows into `(train, test)`, with
    /// `floor(ratio * rows)` rows going to `test`.
    pub fn train_test_split<R: Rng + ?Sized>(
        &self,
        ratio: f64,
        rng: &mut R,
    ) -> Result<(Self, Self), TableError> {
        if !(0.0..=1.0).contains(&ratio) {
            return Err(TableError::InvalidRatio { ratio });
        }

        let mut rows = self.row_index.clone();
        rows.shuffle(rng);
        let split = (ratio * rows.len() as f64).floor() as usize;
        let train = rows.split_off(split);
        Ok((
            Self {
                row_index: train,
                dataset: self.dataset,
            },
            Self {
                row_index: rows,
                dataset: self.dataset,
            },
        ))
    }
}

impl fmt::Display for Table<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "table of {} rows over {} features (target `{}`)",
            self.rows_len(),
            self.features_len(),
            self.dataset.target_name()
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    #[error("table must have at least one column and one row")]
    EmptyTable,

    #[error("got {names} column names for {columns} columns")]
    NameCountMismatch { names: usize, columns: usize },

    #[error("some of columns have a different row count from others")]
    RowSizeMismatch,

    #[error("column `{name}` appears more than once")]
    DuplicateColumn { name: String },

    #[error("column `{column}` contains a non finite number at row {row}")]
    NonFiniteValue { column: String, row: usize },

    #[error("target column `{name}` does not exist")]
    UnknownTarget { name: String },

    #[error("split ratio must be within [0, 1], got {ratio}")]
    InvalidRatio { ratio: f64 },
}

#[cfg(test)]
pub(crate) fn dataset(features: &[(&str, &[f64])], target: &[f64]) -> Dataset {
    let mut names = features
        .iter()
        .map(|(n, _)| n.to_string())
        .collect::<Vec<_>>();
    let mut columns = features.iter().map(|(_, c)| c.to_vec()).collect::<Vec<_>>();
    names.push("y".to_owned());
    columns.push(target.to_vec());
    Dataset::new(names, columns, "y").expect("valid test dataset")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn names(ns: &[&str]) -> Vec<String> {
        ns.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn target_is_excluded_from_features() -> Result<(), anyhow::Error> {
        let data = Dataset::new(
            names(&["y", "a", "b"]),
            vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
            "y",
        )?;
        assert_eq!(data.features_len(), 2);
        assert_eq!(data.feature_names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(data.table().target().collect::<Vec<_>>(), [1.0, 2.0]);
        assert_eq!(data.table().feature_row(1), [4.0, 6.0]);
        Ok(())
    }

    #[test]
    fn invalid_datasets_are_rejected() {
        assert_eq!(
            Dataset::new(Vec::new(), Vec::new(), "y").unwrap_err(),
            TableError::EmptyTable
        );
        assert_eq!(
            Dataset::new(names(&["a", "y"]), vec![vec![1.0], vec![1.0, 2.0]], "y").unwrap_err(),
            TableError::RowSizeMismatch
        );
        assert_eq!(
            Dataset::new(names(&["a", "a"]), vec![vec![1.0], vec![1.0]], "a").unwrap_err(),
            TableError::DuplicateColumn {
                name: "a".to_owned()
            }
        );
        assert_eq!(
            Dataset::new(names(&["a", "y"]), vec![vec![1.0], vec![f64::NAN]], "y").unwrap_err(),
            TableError::NonFiniteValue {
                column: "y".to_owned(),
                row: 0
            }
        );
        assert_eq!(
            Dataset::new(names(&["a"]), vec![vec![1.0]], "medv").unwrap_err(),
            TableError::UnknownTarget {
                name: "medv".to_owned()
            }
        );
    }

    #[test]
    fn thresholds_are_distinct_and_sorted() {
        let data = dataset(&[("x", &[3.0, 1.0, 3.0, 2.0])], &[0.0; 4]);
        assert_eq!(data.table().thresholds(0), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn select_keeps_rows_aligned() {
        let data = dataset(&[("x", &[1.0, 2.0, 3.0])], &[10.0, 20.0, 30.0]);
        let table = data.table().select(&[true, false, true]);
        assert_eq!(table.feature(0).collect::<Vec<_>>(), [1.0, 3.0]);
        assert_eq!(table.target().collect::<Vec<_>>(), [10.0, 30.0]);
    }

    #[test]
    fn bootstrap_sample_draws_from_view() {
        let data = dataset(&[("x", &[1.0, 2.0, 3.0, 4.0])], &[1.0, 2.0, 3.0, 4.0]);
        let view = data.table().select(&[false, true, true, false]);
        let mut rng = StdRng::seed_from_u64(7);
        let sample = view.bootstrap_sample(&mut rng);
        assert_eq!(sample.rows_len(), 2);
        assert!(sample.feature(0).all(|x| x == 2.0 || x == 3.0));
    }

    #[test]
    fn train_test_split_partitions_rows() -> Result<(), anyhow::Error> {
        let xs = (0..10).map(|i| i as f64).collect::<Vec<_>>();
        let data = dataset(&[("x", &xs)], &xs);
        let mut rng = StdRng::seed_from_u64(1);
        let (train, test) = data.table().train_test_split(0.35, &mut rng)?;
        assert_eq!(test.rows_len(), 3);
        assert_eq!(train.rows_len(), 7);

        let mut all = train.feature(0).chain(test.feature(0)).collect::<Vec<_>>();
        all.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(all, xs);

        let mut rng = StdRng::seed_from_u64(1);
        let (train2, _) = data.table().train_test_split(0.35, &mut rng)?;
        assert_eq!(
            train.feature(0).collect::<Vec<_>>(),
            train2.feature(0).collect::<Vec<_>>()
        );

        assert_eq!(
            data.table().train_test_split(1.5, &mut rng).unwrap_err(),
            TableError::InvalidRatio { ratio: 1.5 }
        );
        Ok(())
    }
}
