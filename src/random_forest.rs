use crate::decision_tree::{
    self, DecisionTreeOptions, DecisionTreeRegressor, FitError, PredictError,
};
use crate::functions;
use crate::table::{Dataset, Table};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct RandomForestOptions {
    trees: usize,
    max_depth: usize,
    max_features: Option<usize>,
    seed: Option<u64>,
    parallel: bool,
}

impl RandomForestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of trees; `0` yields an empty forest.
    pub fn trees(mut self, trees: usize) -> Self {
        self.trees = trees;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn fit(&self, table: &Table) -> Result<RandomForestRegressor, FitError> {
        RandomForestRegressor::fit(table, self)
    }

    fn tree_rngs(&self) -> impl Iterator<Item = StdRng> {
        let seed = self.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut rng = StdRng::seed_from_u64(seed);
        (0..self.trees).map(move |_| {
            let mut seed = [0u8; 32];
            rng.fill(&mut seed);
            StdRng::from_seed(seed)
        })
    }

    fn tree_options(&self) -> DecisionTreeOptions {
        DecisionTreeOptions {
            max_depth: self.max_depth,
            max_features: self.max_features,
        }
    }
}

impl Default for RandomForestOptions {
    fn default() -> Self {
        Self {
            trees: 20,
            max_depth: 5,
            max_features: None,
            seed: None,
            parallel: false,
        }
    }
}

/// Bootstrap-aggregated regression trees.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    forest: Vec<DecisionTreeRegressor>,
    feature_names: Vec<String>,
}

impl RandomForestRegressor {
    #[instrument(skip_all, fields(trees = options.trees, max_depth = options.max_depth, rows = table.rows_len()))]
    pub fn fit(table: &Table, options: &RandomForestOptions) -> Result<Self, FitError> {
        if table.is_empty() {
            return Err(FitError::EmptyTable);
        }

        info!(features = table.features_len(), "growing forest");
        let tree_options = options.tree_options();
        let trees = options.trees;
        let fit_tree = |(i, mut rng): (usize, StdRng)| {
            let tree = Self::tree_fit(&mut rng, table, &tree_options);
            if let Ok(tree) = &tree {
                debug!(
                    tree = i + 1,
                    of = trees,
                    depth = tree.root().depth(),
                    leaves = tree.root().leaves(),
                    "tree built"
                );
            }
            tree
        };

        let forest = if options.parallel {
            options
                .tree_rngs()
                .enumerate()
                .collect::<Vec<_>>()
                .into_par_iter()
                .map(fit_tree)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            options
                .tree_rngs()
                .enumerate()
                .map(fit_tree)
                .collect::<Result<Vec<_>, _>>()?
        };

        info!(trees = forest.len(), "forest grown");
        Ok(Self {
            forest,
            feature_names: table.dataset().feature_names().map(str::to_owned).collect(),
        })
    }

    fn tree_fit<R: Rng + ?Sized>(
        rng: &mut R,
        table: &Table,
        options: &DecisionTreeOptions,
    ) -> Result<DecisionTreeRegressor, FitError> {
        let table = table.bootstrap_sample(rng);
        DecisionTreeRegressor::fit(rng, &table, options)
    }

    pub fn trees(&self) -> &[DecisionTreeRegressor] {
        &self.forest
    }

    pub fn into_trees(self) -> Vec<DecisionTreeRegressor> {
        self.forest
    }

    pub fn is_empty(&self) -> bool {
        self.forest.is_empty()
    }

    /// Names of the training features, in the order `predict` expects them.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Maps each training feature to its index among the features of `dataset`.
    pub fn resolve_features(&self, dataset: &Dataset) -> Result<Vec<usize>, PredictError> {
        self.feature_names
            .iter()
            .map(|name| {
                dataset
                    .feature_names()
                    .position(|n| n == name.as_str())
                    .ok_or_else(|| PredictError::MissingFeature { name: name.clone() })
            })
            .collect()
    }

    /// Mean of every tree's prediction for `xs`, a row ordered like
    /// [`feature_names`](Self::feature_names).
    pub fn predict(&self, xs: &[f64]) -> Result<f64, PredictError> {
        decision_tree::check_row(xs, self.feature_names.len())?;
        if self.forest.is_empty() {
            return Err(PredictError::EmptyForest);
        }

        let predictions = self
            .forest
            .iter()
            .map(|tree| tree.predict(xs))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(functions::mean(predictions.into_iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table;

    #[test]
    fn regression_works() -> Result<(), anyhow::Error> {
        let columns: [&[f64]; 5] = [
            // Features.
            &[
                0.0, 0.0, 1.0, 2.0, 2.0, 2.0, 1.0, 0.0, 0.0, 2.0, 0.0, 1.0, 1.0, 2.0,
            ],
            &[
                2.0, 2.0, 2.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0,
            ],
            &[
                1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0,
            ],
            &[
                0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0,
            ],
            // Target.
            &[
                25.0, 30.0, 46.0, 45.0, 52.0, 23.0, 43.0, 35.0, 38.0, 46.0, 48.0, 52.0, 44.0, 30.0,
            ],
        ];
        let data = table::dataset(
            &[
                ("outlook", columns[0]),
                ("temperature", columns[1]),
                ("humidity", columns[2]),
                ("windy", columns[3]),
            ],
            columns[4],
        );

        let options = RandomForestOptions::new().trees(30).max_depth(3).seed(0);
        let regressor = options.fit(&data.table())?;
        assert_eq!(regressor.trees().len(), 30);

        let target_min = 23.0;
        let target_max = 52.0;
        for xs in data.table().feature_rows() {
            let y = regressor.predict(&xs)?;
            assert!(target_min <= y && y <= target_max);
        }
        Ok(())
    }

    #[test]
    fn same_seed_same_forest() -> Result<(), anyhow::Error> {
        let xs = (0..40).map(|i| (i % 7) as f64).collect::<Vec<_>>();
        let zs = (0..40).map(|i| (i % 5) as f64).collect::<Vec<_>>();
        let ys = xs.iter().zip(&zs).map(|(x, z)| x * 2.0 - z).collect::<Vec<_>>();
        let data = table::dataset(&[("x", &xs), ("z", &zs)], &ys);
        let table = data.table();

        let options = RandomForestOptions::new().trees(8).max_depth(4).seed(42);
        let sequential = options.fit(&table)?;
        let again = options.fit(&table)?;
        let parallel = options.clone().parallel(true).fit(&table)?;
        for ((a, b), c) in sequential
            .trees()
            .iter()
            .zip(again.trees())
            .zip(parallel.trees())
        {
            assert_eq!(a.root(), b.root());
            assert_eq!(a.root(), c.root());
        }
        Ok(())
    }

    #[test]
    fn zero_depth_trees_predict_their_bootstrap_mean() -> Result<(), anyhow::Error> {
        let data = table::dataset(&[("x", &[1.0, 2.0, 3.0, 4.0, 5.0])], &[1.0, 3.0, 4.0, 8.0, 9.0]);
        let table = data.table();
        let options = RandomForestOptions::new().trees(10).max_depth(0).seed(5);
        let regressor = options.fit(&table)?;

        // Replay the per-tree generators to recover each bootstrap sample.
        for (tree, mut rng) in regressor.trees().iter().zip(options.tree_rngs()) {
            let sample = table.bootstrap_sample(&mut rng);
            assert!(tree.root().is_leaf());
            assert_eq!(tree.root().prediction(), functions::mean(sample.target()));
        }
        Ok(())
    }

    #[test]
    fn empty_forest_cannot_predict() -> Result<(), anyhow::Error> {
        let data = table::dataset(&[("x", &[1.0, 2.0])], &[1.0, 2.0]);
        let regressor = RandomForestOptions::new().trees(0).fit(&data.table())?;
        assert!(regressor.is_empty());
        assert_eq!(regressor.predict(&[1.0]), Err(PredictError::EmptyForest));
        assert_eq!(regressor.predict(&[1.0]), Err(PredictError::EmptyForest));
        Ok(())
    }

    #[test]
    fn features_resolve_by_name() -> Result<(), anyhow::Error> {
        let data = table::dataset(&[("a", &[1.0, 2.0]), ("b", &[3.0, 4.0])], &[1.0, 2.0]);
        let regressor = RandomForestOptions::new().trees(1).seed(0).fit(&data.table())?;
        assert_eq!(regressor.feature_names(), ["a", "b"]);

        let swapped = table::dataset(
            &[("c", &[0.0]), ("b", &[3.0]), ("a", &[1.0])],
            &[1.0],
        );
        assert_eq!(regressor.resolve_features(&swapped)?, [2, 1]);

        let missing = table::dataset(&[("a", &[1.0])], &[1.0]);
        assert_eq!(
            regressor.resolve_features(&missing),
            Err(PredictError::MissingFeature {
                name: "b".to_owned()
            })
        );
        Ok(())
    }

    #[test]
    fn wrong_row_width_is_rejected() -> Result<(), anyhow::Error> {
        let data = table::dataset(&[("x", &[1.0, 2.0])], &[1.0, 2.0]);
        let regressor = RandomForestOptions::new().trees(1).seed(0).fit(&data.table())?;
        assert_eq!(
            regressor.predict(&[1.0, 2.0]),
            Err(PredictError::FeatureCountMismatch {
                expected: 1,
                got: 2
            })
        );
        Ok(())
    }
}
