use ndarray::{Array1, Array2, ArrayD, Axis, Ix1, Ix2};

use super::error::DecodeError;

/// Opens raw upload bytes as a hierarchical array container.
///
/// Sessions hold the decoder behind an `Arc`, so any backend (HDF5 on disk, an in-memory
/// fixture in tests) can be injected per session.
pub trait ContainerDecoder: Send + Sync {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn Container>, DecodeError>;
}

/// An opened container: a tree of named groups holding numeric datasets.
///
/// Paths are `/`-separated and relative to the container root.
pub trait Container {
    /// Names of the top-level groups
    fn list_groups(&self) -> Result<Vec<String>, DecodeError>;

    /// Names of the members of a group
    fn list_entries(&self, group: &str) -> Result<Vec<String>, DecodeError>;

    /// Read a dataset as a dynamically shaped array of f64
    fn read_array(&self, path: &str) -> Result<ArrayD<f64>, DecodeError>;

    fn has_group(&self, group: &str) -> bool {
        self.list_groups()
            .map(|groups| groups.iter().any(|g| g == group))
            .unwrap_or(false)
    }

    fn has_dataset(&self, path: &str) -> bool {
        self.read_array(path).is_ok()
    }
}

/// Read a dataset as a table. A 1-D dataset becomes a single column.
pub fn read_table(container: &dyn Container, path: &str) -> Result<Array2<f64>, DecodeError> {
    let array = container.read_array(path)?;
    match array.ndim() {
        1 => {
            let column = array
                .into_dimensionality::<Ix1>()
                .map_err(|e| DecodeError::Malformed(e.to_string()))?;
            Ok(column.insert_axis(Axis(1)))
        }
        2 => array
            .into_dimensionality::<Ix2>()
            .map_err(|e| DecodeError::Malformed(e.to_string())),
        rank => Err(DecodeError::UnsupportedShape {
            path: path.to_string(),
            rank,
        }),
    }
}

/// Pick the plotted column of a table.
///
/// A single column is the value itself. With two or more columns the first one is assumed to
/// be an index/label column and the second one is used; wider tables are not interpreted further.
pub fn value_column(table: &Array2<f64>, path: &str) -> Result<Array1<f64>, DecodeError> {
    match table.ncols() {
        0 => Err(DecodeError::EmptyTable(path.to_string())),
        1 => Ok(table.column(0).to_owned()),
        _ => Ok(table.column(1).to_owned()),
    }
}

/// Read a 1-D coordinate array such as `time`
pub fn read_vector(container: &dyn Container, path: &str) -> Result<Vec<f64>, DecodeError> {
    let table = read_table(container, path)?;
    if table.ncols() != 1 {
        return Err(DecodeError::UnsupportedShape {
            path: path.to_string(),
            rank: 2,
        });
    }
    Ok(table.column(0).to_vec())
}

pub fn join_path(group: &str, name: &str) -> String {
    format!("{}/{}", group.trim_end_matches('/'), name)
}


#[cfg(test)]
mod tests {
    use super::fixture::MemoryContainer;
    use super::*;

    #[test]
    fn one_dimensional_dataset_is_a_single_column_table() {
        let c = MemoryContainer::default().with_vector("results/Cs-137", &[1.0, 2.0, 3.0]);
        let table = read_table(&c, "results/Cs-137").unwrap();
        assert_eq!(table.dim(), (3, 1));
        assert_eq!(value_column(&table, "results/Cs-137").unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn multi_column_table_plots_the_second_column() {
        let c = MemoryContainer::default().with_table(
            "results/I-129",
            &[&[0.0, 5.0, 9.0], &[1.0, 6.0, 9.0]],
        );
        let table = read_table(&c, "results/I-129").unwrap();
        assert_eq!(value_column(&table, "results/I-129").unwrap().to_vec(), vec![5.0, 6.0]);
    }

    #[test]
    fn higher_rank_dataset_is_rejected() {
        let mut c = MemoryContainer::default();
        c.datasets.insert(
            "cube".to_string(),
            ArrayD::from_shape_vec(vec![1, 1, 1], vec![0.0]).unwrap(),
        );
        assert!(matches!(
            read_table(&c, "cube"),
            Err(DecodeError::UnsupportedShape { rank: 3, .. })
        ));
    }

    #[test]
    fn groups_exclude_root_datasets() {
        let c = MemoryContainer::default()
            .with_vector("time", &[0.0])
            .with_vector("results/Cs-137", &[1.0])
            .with_vector("OutflowGeosphere/Cs-137", &[1.0]);
        assert_eq!(
            c.list_groups().unwrap(),
            vec!["OutflowGeosphere".to_string(), "results".to_string()]
        );
        assert!(c.has_group("results"));
        assert!(!c.has_group("time"));
    }
}
