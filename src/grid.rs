use crate::decision_tree::FitError;
use crate::metrics::{self, MseError};
use crate::random_forest::RandomForestOptions;
use crate::table::Table;
use itertools::Itertools as _;
use ordered_float::OrderedFloat;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridCell {
    pub trees: usize,
    pub max_depth: usize,
    pub mse: f64,
}

/// Test MSE for every `(trees, max_depth)` combination.
#[derive(Debug, Clone, Serialize)]
pub struct GridSearch {
    sizes: Vec<usize>,
    depths: Vec<usize>,
    cells: Vec<GridCell>,
    best: Option<GridCell>,
}

impl GridSearch {
    /// Trains one forest per combination, sizes in the outer loop and depths in
    /// the inner one. `options` supplies everything but the tree count and depth.
    pub fn run(
        sizes: &[usize],
        depths: &[usize],
        train: &Table,
        test: &Table,
        options: &RandomForestOptions,
    ) -> Result<Self, GridError> {
        let mut cells = Vec::with_capacity(sizes.len() * depths.len());
        for (&trees, &max_depth) in sizes.iter().cartesian_product(depths.iter()) {
            let forest = options
                .clone()
                .trees(trees)
                .max_depth(max_depth)
                .fit(train)?;
            let mse = metrics::mean_squared_error(test, &forest)?;
            info!(trees, max_depth, mse, "grid cell evaluated");
            cells.push(GridCell {
                trees,
                max_depth,
                mse,
            });
        }
        let best = cells.iter().copied().min_by_key(|c| OrderedFloat(c.mse));
        Ok(Self {
            sizes: sizes.to_vec(),
            depths: depths.to_vec(),
            cells,
            best,
        })
    }

    /// MSE of the `i`-th size and `j`-th depth.
    pub fn mse(&self, i: usize, j: usize) -> f64 {
        self.cells[i * self.depths.len() + j].mse
    }

    pub fn matrix(&self) -> Vec<Vec<f64>> {
        self.cells
            .chunks(self.depths.len().max(1))
            .map(|row| row.iter().map(|c| c.mse).collect())
            .collect()
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn depths(&self) -> &[usize] {
        &self.depths
    }

    pub fn best(&self) -> Option<&GridCell> {
        self.best.as_ref()
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("cannot train a forest")]
    Fit(#[from] FitError),

    #[error("cannot evaluate a forest")]
    Mse(#[from] MseError),
}
