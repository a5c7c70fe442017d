//! periodic table lookups

use super::Color;

/// element symbols indexed by atomic number. index 0 is the unknown element
const SYMBOLS: [&str; 119] = [
    "*", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg",
    "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn",
    "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb",
    "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm",
    "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta",
    "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At",
    "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt",
    "Ds", "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

pub const CARBON: u8 = 6;

pub fn atomic_number(symbol: &str) -> Option<u8> {
    SYMBOLS
        .iter()
        .skip(1)
        .position(|&s| s == symbol)
        .map(|i| i as u8 + 1)
}

pub fn symbol(atomic_number: u8) -> Option<&'static str> {
    match atomic_number {
        0 => None,
        n => SYMBOLS.get(n as usize).copied(),
    }
}

/// the atoms allowed as lowercase (aromatic) symbols in SMARTS
pub fn aromatic_symbol(symbol: &str) -> Option<u8> {
    match symbol {
        "b" => Some(5),
        "c" => Some(6),
        "n" => Some(7),
        "o" => Some(8),
        "p" => Some(15),
        "s" => Some(16),
        "as" => Some(33),
        "se" => Some(34),
        _ => None,
    }
}

/// the drawing color for an element when coloring is enabled
pub fn color(atomic_number: u8) -> Color {
    match atomic_number {
        7 => Color::new(0.0, 0.0, 1.0),
        8 => Color::new(1.0, 0.0, 0.0),
        9 | 17 => Color::new(0.0, 0.6, 0.0),
        15 => Color::new(1.0, 0.5, 0.0),
        16 => Color::new(0.8, 0.6, 0.0),
        35 => Color::new(0.65, 0.16, 0.16),
        53 => Color::new(0.58, 0.0, 0.58),
        5 => Color::new(1.0, 0.71, 0.71),
        14 => Color::new(0.94, 0.78, 0.63),
        _ => Color::BLACK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups() {
        assert_eq!(atomic_number("C"), Some(6));
        assert_eq!(atomic_number("Og"), Some(118));
        assert_eq!(atomic_number("Xx"), None);
        assert_eq!(atomic_number("*"), None);
        assert_eq!(symbol(17), Some("Cl"));
        assert_eq!(symbol(0), None);
        assert_eq!(aromatic_symbol("se"), Some(34));
        assert_eq!(aromatic_symbol("f"), None);
    }
}
