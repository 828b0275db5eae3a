use crate::decision_tree::PredictError;
use crate::functions;
use crate::random_forest::RandomForestRegressor;
use crate::table::Table;
use thiserror::Error;

/// Mean squared error of the forest's averaged predictions over `table`.
///
/// Features are matched to the forest's training features by name, so the
/// columns of `table` may come in any order.
pub fn mean_squared_error(
    table: &Table,
    forest: &RandomForestRegressor,
) -> Result<f64, MseError> {
    if table.is_empty() {
        return Err(MseError::EmptyDataset {
            description: table.to_string(),
        });
    }

    let columns = forest.resolve_features(table.dataset())?;
    let predictions = table
        .feature_rows()
        .map(|row| {
            let xs = columns.iter().map(|&c| row[c]).collect::<Vec<_>>();
            forest.predict(&xs)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(functions::mean_squared_error(
        predictions.into_iter().zip(table.target()),
    ))
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MseError {
    #[error("cannot compute the mean squared error of an empty dataset: {description}")]
    EmptyDataset { description: String },

    #[error(transparent)]
    Predict(#[from] PredictError),
}
