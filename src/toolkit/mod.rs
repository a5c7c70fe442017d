//! A small chemistry toolkit covering exactly what the batch renderer needs:
//! loading SMARTS queries, computing 2D coordinates for them, and drawing them
//! as SVG or PNG images.

use std::fmt::Display;

use log::trace;

pub mod elements;
pub mod layout;
pub mod render;
pub mod ring;
pub mod smarts;

pub use layout::Point;
pub use render::{Color, OutputFormat, RenderOptions, Renderer};
pub use smarts::{
    AtomExpr, AtomPrimitive, BondOrders, ChiralClass, QueryAtom, QueryBond,
};

#[derive(Debug, thiserror::Error)]
pub enum ToolkitError {
    #[error("SMARTS loader: {message}")]
    Parse { position: usize, message: String },

    #[error("layout: {0}")]
    Layout(String),

    #[error("render: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ToolkitError {
    pub(crate) fn parse(position: usize, message: impl Display) -> Self {
        Self::Parse {
            position,
            message: message.to_string(),
        }
    }

    /// the human-readable text of the error, as it should be shown to a user
    pub fn message(&self) -> String {
        self.to_string()
    }
}

pub type Result<T> = std::result::Result<T, ToolkitError>;

/// A molecule loaded from a SMARTS query. Coordinates are only available after
/// a call to [QueryMol::layout].
#[derive(Clone, Debug)]
pub struct QueryMol {
    smarts: String,
    atoms: Vec<QueryAtom>,
    bonds: Vec<QueryBond>,
    coords: Option<Vec<Point>>,
}

impl QueryMol {
    pub fn from_smarts(smarts: &str) -> Result<Self> {
        trace!("loading SMARTS {smarts:?}");
        let (atoms, bonds) = smarts::parse(smarts)?;
        Ok(Self {
            smarts: smarts.to_owned(),
            atoms,
            bonds,
            coords: None,
        })
    }

    /// compute 2D coordinates for every atom, replacing any previous layout
    pub fn layout(&mut self) -> Result<()> {
        trace!("laying out {} atoms", self.atoms.len());
        let edges: Vec<_> =
            self.bonds.iter().map(|b| (b.begin, b.end)).collect();
        let coords = layout::compute(self.atoms.len(), &edges);
        if let Some(i) = coords.iter().position(|p| !p.is_finite()) {
            return Err(ToolkitError::Layout(format!(
                "non-finite coordinate for atom {i}"
            )));
        }
        self.coords = Some(coords);
        Ok(())
    }

    pub fn smarts(&self) -> &str {
        &self.smarts
    }

    pub fn atoms(&self) -> &[QueryAtom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[QueryBond] {
        &self.bonds
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn num_bonds(&self) -> usize {
        self.bonds.len()
    }

    /// the 2D coordinates computed by the last call to [QueryMol::layout], if
    /// any
    pub fn coords(&self) -> Option<&[Point]> {
        self.coords.as_deref()
    }

    /// the number of bonds attached to each atom
    pub fn degrees(&self) -> Vec<usize> {
        let mut ret = vec![0; self.atoms.len()];
        for bond in &self.bonds {
            ret[bond.begin] += 1;
            ret[bond.end] += 1;
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn load_and_layout() {
        let mut mol = QueryMol::from_smarts("c1ccccc1[N+](=O)[O-]").unwrap();
        assert_eq!(mol.num_atoms(), 9);
        assert_eq!(mol.num_bonds(), 9);
        assert_eq!(mol.smarts(), "c1ccccc1[N+](=O)[O-]");
        assert!(mol.coords().is_none());

        mol.layout().unwrap();
        let coords = mol.coords().unwrap();
        assert_eq!(coords.len(), 9);
        for bond in mol.bonds() {
            let d = coords[bond.begin].distance(coords[bond.end]);
            assert_abs_diff_eq!(d, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn parse_error_message() {
        let err = QueryMol::from_smarts("C1CC").unwrap_err();
        assert!(matches!(err, ToolkitError::Parse { .. }));
        assert!(err.message().starts_with("SMARTS loader: "));
    }

    #[test]
    fn degrees() {
        let mol = QueryMol::from_smarts("CC(C)(C)O").unwrap();
        assert_eq!(mol.degrees(), vec![1, 4, 1, 1, 1]);
    }
}
