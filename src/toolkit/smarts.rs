//! SMARTS loading. Patterns are parsed into a graph of query atoms and query
//! bonds. Atom queries keep their full logical expression, while bond queries
//! are reduced to the set of bond orders they permit, since that is all the
//! renderer needs to decide how to draw them.

use std::collections::BTreeMap;

use bitflags::bitflags;

use super::{elements, Result, ToolkitError};

#[derive(Clone, Debug, PartialEq)]
pub enum AtomPrimitive {
    /// an element symbol, like `C`, `c`, or `[Cl]`
    Element { atomic_number: u8, aromatic: bool },
    /// `#n`
    AtomicNumber(u8),
    /// `a`
    Aromatic,
    /// `A`
    Aliphatic,
    /// `*`
    Wildcard,
    /// `D<n>`
    Degree(u8),
    /// `H<n>`
    TotalHCount(u8),
    /// `h<n>`
    ImplicitHCount(u8),
    /// `R<n>`, or plain `R` for any ring membership
    RingCount(Option<u8>),
    /// `r<n>`, or plain `r` for any ring membership
    RingSize(Option<u8>),
    /// `x<n>`
    RingConnectivity(u8),
    /// `X<n>`
    Connectivity(u8),
    /// `v<n>`
    Valence(u8),
    /// `z<n>`, heteroatom neighbors, or plain `z` for at least one
    HeteroNeighbors(Option<u8>),
    /// `Z<n>`, aliphatic heteroatom neighbors
    AliphaticHeteroNeighbors(Option<u8>),
    /// `^<n>`, with 1 for sp up to 5 for sp3d2
    Hybridization(u8),
    Charge(i8),
    Isotope(u16),
    /// `@` or `@@`, optionally followed by a class like `TH1` or `SP2`
    Chirality {
        clockwise: bool,
        class: Option<(ChiralClass, u8)>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChiralClass {
    /// `TH`
    Tetrahedral,
    /// `AL`
    Allene,
    /// `SP`
    SquarePlanar,
    /// `TB`
    TrigonalBipyramidal,
    /// `OH`
    Octahedral,
}

impl ChiralClass {
    /// the largest permitted class number
    fn max(self) -> u8 {
        match self {
            ChiralClass::Tetrahedral | ChiralClass::Allene => 2,
            ChiralClass::SquarePlanar => 3,
            ChiralClass::TrigonalBipyramidal => 20,
            ChiralClass::Octahedral => 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AtomExpr {
    Prim(AtomPrimitive),
    Not(Box<AtomExpr>),
    And(Vec<AtomExpr>),
    Or(Vec<AtomExpr>),
    /// `$(...)`
    Recursive(Box<Query>),
}

impl AtomExpr {
    /// the atomic number this expression pins down, if any
    fn atomic_number(&self) -> Option<u8> {
        match self {
            AtomExpr::Prim(AtomPrimitive::Element { atomic_number, .. })
            | AtomExpr::Prim(AtomPrimitive::AtomicNumber(atomic_number)) => {
                Some(*atomic_number)
            }
            AtomExpr::And(terms) => {
                terms.iter().find_map(|t| t.atomic_number())
            }
            AtomExpr::Or(terms) => {
                let first = terms.first()?.atomic_number()?;
                terms
                    .iter()
                    .all(|t| t.atomic_number() == Some(first))
                    .then_some(first)
            }
            _ => None,
        }
    }

    fn is_aromatic(&self) -> bool {
        match self {
            AtomExpr::Prim(AtomPrimitive::Element { aromatic, .. }) => {
                *aromatic
            }
            AtomExpr::Prim(AtomPrimitive::Aromatic) => true,
            AtomExpr::And(terms) => terms.iter().any(|t| t.is_aromatic()),
            AtomExpr::Or(terms) => {
                !terms.is_empty() && terms.iter().all(|t| t.is_aromatic())
            }
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryAtom {
    pub expr: AtomExpr,

    /// the source text of the atom, without the surrounding brackets
    pub text: String,

    /// whether the atom was written in square brackets
    pub bracketed: bool,

    /// the atom-map class, as in `[C:1]`
    pub map: Option<u32>,
}

impl QueryAtom {
    pub fn atomic_number(&self) -> Option<u8> {
        self.expr.atomic_number()
    }

    pub fn is_aromatic(&self) -> bool {
        self.expr.is_aromatic()
    }

    /// the text to draw for this atom, or None for a plain skeletal carbon
    pub fn label(&self, degree: usize) -> Option<String> {
        if self.bracketed {
            return Some(self.text.clone());
        }
        match self.atomic_number() {
            Some(elements::CARBON) if degree > 0 => None,
            Some(n) => elements::symbol(n).map(str::to_owned),
            None => Some(self.text.clone()),
        }
    }
}

bitflags! {
    /// the bond orders permitted by a bond query
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct BondOrders: u8 {
        const SINGLE =   0x1;
        const DOUBLE =   0x2;
        const TRIPLE =   0x4;
        const AROMATIC = 0x8;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryBond {
    pub begin: usize,
    pub end: usize,
    pub orders: BondOrders,

    /// Some(true) for ring bonds (`@`), Some(false) for chain bonds (`!@`)
    pub ring: Option<bool>,

    /// the source text of the bond, empty for an implicit bond
    pub text: String,
}

impl QueryBond {
    pub fn is_implicit(&self) -> bool {
        self.text.is_empty()
    }
}

/// a fully parsed SMARTS pattern
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub atoms: Vec<QueryAtom>,
    pub bonds: Vec<QueryBond>,
}

/// the meaning of a bond expression, before it is attached to atoms
#[derive(Clone, Debug, PartialEq)]
struct BondSpec {
    orders: BondOrders,
    ring: Option<bool>,
    text: String,
}

impl BondSpec {
    fn implicit() -> Self {
        Self {
            orders: BondOrders::SINGLE | BondOrders::AROMATIC,
            ring: None,
            text: String::new(),
        }
    }

    fn not(self) -> Self {
        if self.orders == BondOrders::all() && self.ring.is_some() {
            Self {
                ring: self.ring.map(|r| !r),
                ..self
            }
        } else {
            Self {
                orders: self.orders.complement(),
                ..self
            }
        }
    }

    fn and(self, other: Self) -> Self {
        Self {
            orders: self.orders & other.orders,
            ring: self.ring.or(other.ring),
            text: String::new(),
        }
    }

    fn or(self, other: Self) -> Self {
        Self {
            orders: self.orders | other.orders,
            ring: if self.ring == other.ring { self.ring } else { None },
            text: String::new(),
        }
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,

    /// position of `input` within the outermost pattern, for error reporting
    offset: usize,
    atoms: Vec<QueryAtom>,
    bonds: Vec<QueryBond>,
    branches: Vec<usize>,
    prev_atom: Option<usize>,
    pending_bond: Option<BondSpec>,
    ring_closures: BTreeMap<u32, (usize, Option<BondSpec>)>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, offset: usize) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            offset,
            atoms: Vec::new(),
            bonds: Vec::new(),
            branches: Vec::new(),
            prev_atom: None,
            pending_bond: None,
            ring_closures: BTreeMap::new(),
        }
    }

    fn error(&self, message: impl std::fmt::Display) -> ToolkitError {
        ToolkitError::parse(
            self.offset + self.pos,
            format!("{message} at position {}", self.offset + self.pos),
        )
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.input.get(self.pos + n).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn text(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.input[start..end]).into_owned()
    }

    fn parse(mut self) -> Result<Query> {
        while let Some(ch) = self.peek() {
            match ch {
                b'(' => {
                    let Some(prev) = self.prev_atom else {
                        return Err(
                            self.error("branch without a preceding atom")
                        );
                    };
                    if self.pending_bond.is_some() {
                        return Err(self.error("bond before a branch"));
                    }
                    self.advance();
                    self.branches.push(prev);
                }
                b')' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error("dangling bond"));
                    }
                    let Some(prev) = self.branches.pop() else {
                        return Err(self.error("unbalanced ')'"));
                    };
                    self.advance();
                    self.prev_atom = Some(prev);
                }
                b'.' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error("dangling bond"));
                    }
                    self.advance();
                    self.prev_atom = None;
                }
                b'[' => {
                    let atom = self.bracket_atom()?;
                    self.add_atom(atom)?;
                }
                b'*' => {
                    self.advance();
                    self.add_atom(QueryAtom {
                        expr: AtomExpr::Prim(AtomPrimitive::Wildcard),
                        text: "*".to_owned(),
                        bracketed: false,
                        map: None,
                    })?;
                }
                b'%' | b'0'..=b'9' => self.ring_closure()?,
                b'>' => {
                    return Err(self.error(
                        "reaction SMARTS cannot be loaded as a query molecule",
                    ));
                }
                ch if is_bond_start(ch) => {
                    if self.pending_bond.is_some() {
                        return Err(self.error("two consecutive bonds"));
                    }
                    let start = self.pos;
                    let mut bond = self.bond_low_and()?;
                    bond.text = self.text(start, self.pos);
                    self.pending_bond = Some(bond);
                }
                ch if ch.is_ascii_alphabetic() => {
                    let atom = self.organic_atom()?;
                    self.add_atom(atom)?;
                }
                ch => {
                    return Err(self.error(format!(
                        "unexpected character '{}'",
                        ch as char
                    )));
                }
            }
        }

        if self.pending_bond.is_some() {
            return Err(self.error("dangling bond"));
        }
        if !self.branches.is_empty() {
            return Err(self.error("unclosed branch"));
        }
        if let Some(num) = self.ring_closures.keys().next() {
            return Err(self.error(format!("unclosed ring {num}")));
        }
        if self.atoms.is_empty() {
            return Err(self.error("no atoms in pattern"));
        }

        Ok(Query {
            atoms: self.atoms,
            bonds: self.bonds,
        })
    }

    fn add_atom(&mut self, atom: QueryAtom) -> Result<()> {
        let idx = self.atoms.len();
        self.atoms.push(atom);
        let spec = self.pending_bond.take();
        if let Some(prev) = self.prev_atom {
            self.add_bond(prev, idx, spec.unwrap_or_else(BondSpec::implicit))?;
        } else if spec.is_some() {
            return Err(self.error("bond without a preceding atom"));
        }
        self.prev_atom = Some(idx);
        Ok(())
    }

    fn add_bond(
        &mut self,
        begin: usize,
        end: usize,
        spec: BondSpec,
    ) -> Result<()> {
        if begin == end {
            return Err(self.error("atom bonded to itself"));
        }
        let dup = self.bonds.iter().any(|b| {
            (b.begin, b.end) == (begin, end) || (b.begin, b.end) == (end, begin)
        });
        if dup {
            return Err(self.error(format!(
                "duplicate bond between atoms {begin} and {end}"
            )));
        }
        self.bonds.push(QueryBond {
            begin,
            end,
            orders: spec.orders,
            ring: spec.ring,
            text: spec.text,
        });
        Ok(())
    }

    fn ring_closure(&mut self) -> Result<()> {
        let Some(current) = self.prev_atom else {
            return Err(self.error("ring closure without a preceding atom"));
        };
        let num = if self.peek() == Some(b'%') {
            self.advance();
            match (self.peek(), self.peek_at(1)) {
                (Some(a), Some(b))
                    if a.is_ascii_digit() && b.is_ascii_digit() =>
                {
                    self.pos += 2;
                    (a - b'0') as u32 * 10 + (b - b'0') as u32
                }
                _ => {
                    return Err(self.error("expected two digits after '%'"))
                }
            }
        } else {
            let d = self.advance().unwrap_or(b'0');
            (d - b'0') as u32
        };

        let here = self.pending_bond.take();
        if let Some((open, there)) = self.ring_closures.remove(&num) {
            let spec = here.or(there).unwrap_or_else(BondSpec::implicit);
            self.add_bond(open, current, spec)?;
        } else {
            self.ring_closures.insert(num, (current, here));
        }
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<QueryAtom> {
        let start = self.pos;
        let ch = self.advance().unwrap_or_default();
        let (atomic_number, aromatic) = match (ch, self.peek()) {
            (b'C', Some(b'l')) | (b'B', Some(b'r')) => {
                self.advance();
                let sym = self.text(start, self.pos);
                (elements::atomic_number(&sym).unwrap_or_default(), false)
            }
            (b'B' | b'C' | b'N' | b'O' | b'P' | b'S' | b'F' | b'I', _) => {
                let sym = self.text(start, self.pos);
                (elements::atomic_number(&sym).unwrap_or_default(), false)
            }
            (b'b' | b'c' | b'n' | b'o' | b'p' | b's', _) => {
                let sym = self.text(start, self.pos);
                (elements::aromatic_symbol(&sym).unwrap_or_default(), true)
            }
            _ => {
                self.pos = start;
                return Err(self.error(format!(
                    "'{}' is not in the organic subset and must be bracketed",
                    ch as char
                )));
            }
        };
        Ok(QueryAtom {
            expr: AtomExpr::Prim(AtomPrimitive::Element {
                atomic_number,
                aromatic,
            }),
            text: self.text(start, self.pos),
            bracketed: false,
            map: None,
        })
    }

    fn bracket_atom(&mut self) -> Result<QueryAtom> {
        self.advance(); // [
        let start = self.pos;

        let mut terms = Vec::new();
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            let n = self.number()?;
            let n = u16::try_from(n)
                .map_err(|_| self.error("isotope out of range"))?;
            terms.push(AtomExpr::Prim(AtomPrimitive::Isotope(n)));
        }

        // a leading H is the hydrogen atom rather than a hydrogen count
        if self.peek() == Some(b'H')
            && matches!(
                self.peek_at(1),
                Some(b']' | b'+' | b'-' | b':')
            )
        {
            self.advance();
            terms.push(AtomExpr::Prim(AtomPrimitive::Element {
                atomic_number: 1,
                aromatic: false,
            }));
            if self.peek().is_some_and(|c| c != b']' && c != b':') {
                terms.push(self.atom_low_and()?);
            }
        } else if self.peek().is_some_and(is_atom_prim_start)
            || terms.is_empty()
        {
            terms.push(self.atom_low_and()?);
        }

        let map = if self.peek() == Some(b':') {
            self.advance();
            Some(self.number()?)
        } else {
            None
        };

        let end = self.pos;
        match self.advance() {
            Some(b']') => {}
            Some(ch) => {
                self.pos -= 1;
                return Err(self.error(format!(
                    "unexpected character '{}' in bracket atom",
                    ch as char
                )));
            }
            None => return Err(self.error("unclosed bracket atom")),
        }

        let expr = if terms.len() == 1 {
            terms.remove(0)
        } else {
            AtomExpr::And(terms)
        };
        Ok(QueryAtom {
            expr,
            text: self.text(start, end),
            bracketed: true,
            map,
        })
    }

    // atom expressions, from lowest to highest precedence:
    //   low_and = or (';' or)*
    //   or      = and (',' and)*
    //   and     = not ('&'? not)*
    //   not     = '!'* primitive

    fn atom_low_and(&mut self) -> Result<AtomExpr> {
        let mut terms = vec![self.atom_or()?];
        while self.peek() == Some(b';') {
            self.advance();
            terms.push(self.atom_or()?);
        }
        Ok(collapse(terms, AtomExpr::And))
    }

    fn atom_or(&mut self) -> Result<AtomExpr> {
        let mut terms = vec![self.atom_and()?];
        while self.peek() == Some(b',') {
            self.advance();
            terms.push(self.atom_and()?);
        }
        Ok(collapse(terms, AtomExpr::Or))
    }

    fn atom_and(&mut self) -> Result<AtomExpr> {
        let mut terms = vec![self.atom_not()?];
        loop {
            match self.peek() {
                Some(b'&') => {
                    self.advance();
                    terms.push(self.atom_not()?);
                }
                Some(ch) if is_atom_prim_start(ch) => {
                    terms.push(self.atom_not()?);
                }
                _ => break,
            }
        }
        Ok(collapse(terms, AtomExpr::And))
    }

    fn atom_not(&mut self) -> Result<AtomExpr> {
        if self.peek() == Some(b'!') {
            self.advance();
            Ok(AtomExpr::Not(Box::new(self.atom_not()?)))
        } else {
            self.atom_primitive()
        }
    }

    fn atom_primitive(&mut self) -> Result<AtomExpr> {
        use AtomPrimitive::*;
        let Some(ch) = self.peek() else {
            return Err(self.error("unclosed bracket atom"));
        };
        let prim = match ch {
            b'#' => {
                self.advance();
                let n = self.number()?;
                match u8::try_from(n) {
                    Ok(n) if n <= 118 => AtomicNumber(n),
                    _ => return Err(self.error("atomic number out of range")),
                }
            }
            b'$' => return self.recursive(),
            b'*' => {
                self.advance();
                Wildcard
            }
            b'+' | b'-' => Charge(self.charge()?),
            b'@' => {
                self.advance();
                let clockwise = self.peek() == Some(b'@');
                if clockwise {
                    self.advance();
                }
                let class = self.chiral_class()?;
                if self.peek() == Some(b'?') {
                    self.advance();
                }
                Chirality { clockwise, class }
            }
            b'^' => {
                self.advance();
                match self.optional_count()? {
                    Some(n @ 1..=5) => Hybridization(n),
                    _ => return Err(self.error("expected hybridization 1-5")),
                }
            }
            ch if ch.is_ascii_uppercase() => {
                if let Some(n) = self.two_letter_element() {
                    n
                } else {
                    self.advance();
                    match ch {
                        b'H' => TotalHCount(self.count_or(1)?),
                        b'D' => Degree(self.count_or(1)?),
                        b'X' => Connectivity(self.count_or(1)?),
                        b'R' => RingCount(self.optional_count()?),
                        b'Z' => AliphaticHeteroNeighbors(
                            self.optional_count()?,
                        ),
                        b'A' => Aliphatic,
                        _ => {
                            let sym = (ch as char).to_string();
                            match elements::atomic_number(&sym) {
                                Some(atomic_number) => Element {
                                    atomic_number,
                                    aromatic: false,
                                },
                                None => {
                                    self.pos -= 1;
                                    return Err(self.error(format!(
                                        "unknown element '{sym}'"
                                    )));
                                }
                            }
                        }
                    }
                }
            }
            ch if ch.is_ascii_lowercase() => {
                if let Some(n) = self.two_letter_aromatic() {
                    n
                } else {
                    self.advance();
                    let sym = (ch as char).to_string();
                    match ch {
                        b'a' => Aromatic,
                        b'h' => ImplicitHCount(self.count_or(1)?),
                        b'r' => RingSize(self.optional_count()?),
                        b'v' => Valence(self.count_or(1)?),
                        b'x' => RingConnectivity(self.count_or(1)?),
                        b'z' => HeteroNeighbors(self.optional_count()?),
                        _ => match elements::aromatic_symbol(&sym) {
                            Some(atomic_number) => Element {
                                atomic_number,
                                aromatic: true,
                            },
                            None => {
                                self.pos -= 1;
                                return Err(self.error(format!(
                                    "unknown atom primitive '{sym}'"
                                )));
                            }
                        },
                    }
                }
            }
            ch => {
                return Err(self.error(format!(
                    "unexpected character '{}' in bracket atom",
                    ch as char
                )));
            }
        };
        Ok(AtomExpr::Prim(prim))
    }

    /// consume an element symbol like `Cl` or `Na` if one starts here
    fn two_letter_element(&mut self) -> Option<AtomPrimitive> {
        let (a, b) = (self.peek()?, self.peek_at(1)?);
        if !b.is_ascii_lowercase() {
            return None;
        }
        let sym = format!("{}{}", a as char, b as char);
        let atomic_number = elements::atomic_number(&sym)?;
        self.pos += 2;
        Some(AtomPrimitive::Element {
            atomic_number,
            aromatic: false,
        })
    }

    fn two_letter_aromatic(&mut self) -> Option<AtomPrimitive> {
        let (a, b) = (self.peek()?, self.peek_at(1)?);
        let sym = format!("{}{}", a as char, b as char);
        let atomic_number = elements::aromatic_symbol(&sym)?;
        self.pos += 2;
        Some(AtomPrimitive::Element {
            atomic_number,
            aromatic: true,
        })
    }

    fn recursive(&mut self) -> Result<AtomExpr> {
        self.advance(); // $
        if self.advance() != Some(b'(') {
            return Err(self.error("expected '(' after '$'"));
        }
        let start = self.pos;
        let mut depth = 1;
        while depth > 0 {
            match self.advance() {
                Some(b'(') => depth += 1,
                Some(b')') => depth -= 1,
                Some(_) => {}
                None => {
                    return Err(self.error("unclosed recursive SMARTS"));
                }
            }
        }
        let inner = self.text(start, self.pos - 1);
        let query = Parser::new(&inner, self.offset + start).parse()?;
        Ok(AtomExpr::Recursive(Box::new(query)))
    }

    fn charge(&mut self) -> Result<i8> {
        let Some(sign) = self.advance() else {
            return Err(self.error("expected charge"));
        };
        let mut n: u32 = 1;
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            n = self.number()?;
        } else {
            while self.peek() == Some(sign) {
                self.advance();
                n += 1;
            }
        }
        let n =
            i8::try_from(n).map_err(|_| self.error("charge out of range"))?;
        Ok(if sign == b'-' { -n } else { n })
    }

    /// the class after `@` or `@@`, like `TH1` or `OH25`, if one starts here
    fn chiral_class(&mut self) -> Result<Option<(ChiralClass, u8)>> {
        let class = match (self.peek(), self.peek_at(1)) {
            (Some(b'T'), Some(b'H')) => ChiralClass::Tetrahedral,
            (Some(b'A'), Some(b'L')) => ChiralClass::Allene,
            (Some(b'S'), Some(b'P')) => ChiralClass::SquarePlanar,
            (Some(b'T'), Some(b'B')) => ChiralClass::TrigonalBipyramidal,
            (Some(b'O'), Some(b'H')) => ChiralClass::Octahedral,
            _ => return Ok(None),
        };
        self.pos += 2;
        match self.optional_count()? {
            Some(n) if (1..=class.max()).contains(&n) => Ok(Some((class, n))),
            _ => Err(self.error(format!(
                "expected a number from 1 to {} for chirality class",
                class.max()
            ))),
        }
    }

    fn count_or(&mut self, default: u8) -> Result<u8> {
        Ok(self.optional_count()?.unwrap_or(default))
    }

    fn optional_count(&mut self) -> Result<Option<u8>> {
        if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return Ok(None);
        }
        let n = self.number()?;
        u8::try_from(n)
            .map(Some)
            .map_err(|_| self.error("count out of range"))
    }

    fn number(&mut self) -> Result<u32> {
        let start = self.pos;
        let mut n: u32 = 0;
        while let Some(ch) = self.peek().filter(u8::is_ascii_digit) {
            self.advance();
            n = n
                .checked_mul(10)
                .and_then(|n| n.checked_add((ch - b'0') as u32))
                .ok_or_else(|| self.error("number too large"))?;
        }
        if self.pos == start {
            return Err(self.error("expected a number"));
        }
        Ok(n)
    }

    // bond expressions use the same precedence levels as atom expressions

    fn bond_low_and(&mut self) -> Result<BondSpec> {
        let mut ret = self.bond_or()?;
        while self.peek() == Some(b';') {
            self.advance();
            ret = ret.and(self.bond_or()?);
        }
        Ok(ret)
    }

    fn bond_or(&mut self) -> Result<BondSpec> {
        let mut ret = self.bond_and()?;
        while self.peek() == Some(b',') {
            self.advance();
            ret = ret.or(self.bond_and()?);
        }
        Ok(ret)
    }

    fn bond_and(&mut self) -> Result<BondSpec> {
        let mut ret = self.bond_not()?;
        loop {
            match self.peek() {
                Some(b'&') => {
                    self.advance();
                    ret = ret.and(self.bond_not()?);
                }
                Some(ch) if is_bond_start(ch) => {
                    ret = ret.and(self.bond_not()?);
                }
                _ => break,
            }
        }
        Ok(ret)
    }

    fn bond_not(&mut self) -> Result<BondSpec> {
        if self.peek() == Some(b'!') {
            self.advance();
            Ok(self.bond_not()?.not())
        } else {
            self.bond_primitive()
        }
    }

    fn bond_primitive(&mut self) -> Result<BondSpec> {
        let (orders, ring) = match self.peek() {
            Some(b'-' | b'/' | b'\\') => (BondOrders::SINGLE, None),
            Some(b'=') => (BondOrders::DOUBLE, None),
            Some(b'#') => (BondOrders::TRIPLE, None),
            Some(b':') => (BondOrders::AROMATIC, None),
            Some(b'~') => (BondOrders::all(), None),
            Some(b'@') => (BondOrders::all(), Some(true)),
            Some(ch) => {
                return Err(self.error(format!(
                    "unexpected character '{}' in bond",
                    ch as char
                )));
            }
            None => return Err(self.error("dangling bond")),
        };
        self.advance();
        Ok(BondSpec {
            orders,
            ring,
            text: String::new(),
        })
    }
}

fn collapse(
    mut terms: Vec<AtomExpr>,
    f: fn(Vec<AtomExpr>) -> AtomExpr,
) -> AtomExpr {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        f(terms)
    }
}

fn is_bond_start(ch: u8) -> bool {
    matches!(ch, b'-' | b'=' | b'#' | b':' | b'~' | b'@' | b'/' | b'\\' | b'!')
}

fn is_atom_prim_start(ch: u8) -> bool {
    matches!(ch, b'!' | b'#' | b'$' | b'*' | b'+' | b'-' | b'@' | b'^')
        || ch.is_ascii_alphabetic()
}

/// parse `smarts` into its query atoms and bonds
pub fn parse(smarts: &str) -> Result<(Vec<QueryAtom>, Vec<QueryBond>)> {
    if smarts.is_empty() {
        return Err(ToolkitError::parse(0, "empty SMARTS pattern"));
    }
    let Query { atoms, bonds } = Parser::new(smarts, 0).parse()?;
    Ok((atoms, bonds))
}
