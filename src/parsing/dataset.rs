use super::Dataset;
use crate::error::DatasetError;
use ndarray::{Array, Array1, ArrayView};
use std::path::Path;
use std::str::FromStr;

pub const FEATURE_MATRIX_SUFFIX: &str = "_feature_matrix.csv";
pub const LABEL_VECTOR_SUFFIX: &str = "_label_vector.csv";

/// Parse a single field of a record, reporting the row it came from
fn parse_field<T: FromStr>(value: &str, path: &Path, row: usize) -> Result<T, DatasetError> {
    T::from_str(value.trim()).map_err(|_| DatasetError::InvalidValue {
        path: path.to_path_buf(),
        row,
        value: value.to_string(),
    })
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, DatasetError> {
    if !path.is_file() {
        return Err(DatasetError::NotFound {
            path: path.to_path_buf(),
        });
    }

    csv::Reader::from_path(path).map_err(|source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a feature matrix and lay its columns out in `columns` order.
/// Columns of the file that are not in `columns` are dropped, and
/// columns missing from the file are filled with zeros.
/// Returns the matrix and the names of the missing columns
pub fn parse_feature_matrix(
    path: &Path,
    columns: &[String],
) -> Result<(ndarray::Array2<f64>, Vec<String>), DatasetError> {
    let mut reader = open(path)?;
    let csv_error = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let headers = reader.headers().map_err(csv_error)?.clone();
    // For every expected column, where to find it in the file
    let sources: Vec<Option<usize>> = columns
        .iter()
        .map(|column| headers.iter().position(|h| h.trim() == column))
        .collect();
    let missing = columns
        .iter()
        .zip(&sources)
        .filter(|(_, source)| source.is_none())
        .map(|(column, _)| column.clone())
        .collect();

    let mut data = Array::zeros((0, columns.len()));

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let mut values = vec![0f64; columns.len()];

        for (value, source) in values.iter_mut().zip(&sources) {
            if let Some(idx) = source {
                *value = parse_field(record.get(*idx).unwrap_or(""), path, row + 1)?;
            }
        }

        data.push_row(ArrayView::from(&values))
            .map_err(|e| DatasetError::InvalidValue {
                path: path.to_path_buf(),
                row: row + 1,
                value: e.to_string(),
            })?;
    }

    Ok((data, missing))
}

/// Parse a label vector: a header line followed by one class index per row
pub fn parse_label_vector(path: &Path) -> Result<Array1<usize>, DatasetError> {
    let mut reader = open(path)?;
    let mut target = vec![];

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|source| DatasetError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        target.push(parse_field(record.get(0).unwrap_or(""), path, row + 1)?);
    }

    Ok(Array1::from_vec(target))
}

/// Read the evaluation dataset of antibiotic `name` from `dir`
pub fn parse_dataset(dir: &Path, name: &str, columns: &[String]) -> Result<(Dataset, Vec<String>), DatasetError> {
    let (data, missing) = parse_feature_matrix(&dir.join(format!("{name}{FEATURE_MATRIX_SUFFIX}")), columns)?;
    let target = parse_label_vector(&dir.join(format!("{name}{LABEL_VECTOR_SUFFIX}")))?;

    if data.nrows() != target.len() {
        return Err(DatasetError::LengthMismatch {
            features: data.nrows(),
            labels: target.len(),
        });
    }

    Ok((Dataset { data, target }, missing))
}
