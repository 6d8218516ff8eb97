//! SMILES parsing into a [Molecule]. purr reads the string into an adjacency
//! list, which is then resolved into elements, bond types, and hydrogen
//! counts here

use purr::feature::{Aliphatic, AtomKind, BondKind, BracketSymbol, Element};
use purr::graph::Builder;
use thiserror::Error;

use super::{elements, Atom, BondType, Molecule};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SmilesError {
    #[error("unexpected character at position {0}")]
    Character(usize),

    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("ring bond between atoms {begin} and {end} has conflicting orders")]
    RingBondConflict { begin: usize, end: usize },

    #[error("ring bond was never closed")]
    UnclosedRing,

    #[error("second bond between atoms {begin} and {end}")]
    DuplicateBond { begin: usize, end: usize },

    #[error("unknown element {0:?}")]
    UnknownElement(String),

    #[error("explicit valence {valence} for atom {atom} ({symbol}) is too high")]
    Valence {
        atom: usize,
        symbol: &'static str,
        valence: u32,
    },

    #[error("atom {atom} is marked aromatic but is not in a ring")]
    NonRingAromatic { atom: usize },
}

impl From<purr::read::Error> for SmilesError {
    fn from(e: purr::read::Error) -> Self {
        match e {
            purr::read::Error::EndOfLine => SmilesError::UnexpectedEnd,
            purr::read::Error::Character(pos) => SmilesError::Character(pos),
        }
    }
}

impl From<purr::graph::Error> for SmilesError {
    fn from(e: purr::graph::Error) -> Self {
        match e {
            purr::graph::Error::Join(end, begin) => {
                SmilesError::RingBondConflict { begin, end }
            }
            purr::graph::Error::Rnum(_) => SmilesError::UnclosedRing,
        }
    }
}

/// parse `smiles` into a [Molecule], assigning implicit hydrogens and
/// checking valences and aromatic ring membership. the empty string is the
/// empty molecule
pub fn parse(smiles: &str) -> Result<Molecule, SmilesError> {
    let mut mol = Molecule::default();
    if smiles.is_empty() {
        return Ok(mol);
    }

    let mut builder = Builder::new();
    purr::read::read(smiles, &mut builder, None)?;
    let graph = builder.build()?;

    for atom in &graph {
        mol.add_atom(atom_from_kind(&atom.kind)?);
    }
    for (idx, atom) in graph.iter().enumerate() {
        for bond in &atom.bonds {
            let other = bond.tid;
            // purr lists each bond on both ends
            if other < idx {
                continue;
            }
            if other == idx || mol.bond_between(idx, other).is_some() {
                return Err(SmilesError::DuplicateBond {
                    begin: idx,
                    end: other,
                });
            }
            let bt = bond_type(&bond.kind, mol.atom(idx), mol.atom(other));
            mol.add_bond(idx, other, bt);
        }
    }

    assign_hydrogens(&mut mol)?;
    check_aromatic_rings(&mol)?;
    Ok(mol)
}

fn lookup(symbol: String) -> Result<u8, SmilesError> {
    elements::atomic_number(&symbol)
        .ok_or(SmilesError::UnknownElement(symbol))
}

fn atom_from_kind(kind: &AtomKind) -> Result<Atom, SmilesError> {
    let atom = match kind {
        AtomKind::Star => Atom::new(0, false),
        AtomKind::Aliphatic(a) => Atom::new(lookup(a.to_string())?, false),
        AtomKind::Aromatic(a) => {
            let a: Aliphatic = a.into();
            Atom::new(lookup(a.to_string())?, true)
        }
        AtomKind::Bracket {
            isotope,
            symbol,
            hcount,
            charge,
            ..
        } => {
            let (num, aromatic) = match symbol {
                BracketSymbol::Star => (0, false),
                BracketSymbol::Element(e) => (lookup(e.to_string())?, false),
                BracketSymbol::Aromatic(a) => {
                    let e: Element = a.into();
                    (lookup(e.to_string())?, true)
                }
            };
            let mut atom = Atom::new(num, aromatic);
            atom.bracket = true;
            atom.isotope = isotope.as_ref().map(u16::from);
            atom.explicit_hs = hcount.as_ref().map_or(0, Into::<u8>::into);
            atom.charge = charge.as_ref().map_or(0, Into::<i8>::into);
            atom
        }
    };
    Ok(atom)
}

/// an unmarked bond is aromatic between two aromatic atoms and single
/// otherwise. `/` and `\` only carry double bond stereo, which we drop
fn bond_type(kind: &BondKind, a: &Atom, b: &Atom) -> BondType {
    match kind {
        BondKind::Double => BondType::Double,
        BondKind::Triple => BondType::Triple,
        BondKind::Quadruple => BondType::Quadruple,
        BondKind::Aromatic => BondType::Aromatic,
        BondKind::Elided if a.aromatic && b.aromatic => BondType::Aromatic,
        BondKind::Elided
        | BondKind::Single
        | BondKind::Up
        | BondKind::Down => BondType::Single,
    }
}

/// the valence an atom uses up with its sigma bonds and explicit hydrogens,
/// counting aromatic bonds as single bonds, and 1 if it shares a delocalized
/// double bond
fn bond_valence(mol: &Molecule, idx: usize) -> (u32, u32) {
    let mut sigma = mol.atom(idx).explicit_hs as u32;
    let mut pi = 0;
    for &b in mol.atom_bonds(idx) {
        match mol.bond(b).bond_type.order() {
            Some(order) => sigma += order,
            None => {
                sigma += 1;
                pi = 1;
            }
        }
    }
    (sigma, pi)
}

fn assign_hydrogens(mol: &mut Molecule) -> Result<(), SmilesError> {
    for idx in 0..mol.num_atoms() {
        let (sigma, pi) = bond_valence(mol, idx);
        let atom = mol.atom(idx);
        let allowed = elements::default_valences(atom.atomic_num);
        if allowed.is_empty() {
            continue;
        }
        let too_high = SmilesError::Valence {
            atom: idx,
            symbol: atom.symbol(),
            valence: sigma + pi,
        };
        if atom.bracket {
            let fits = allowed.iter().any(|&v| v >= sigma + pi);
            if atom.charge == 0 && !atom.aromatic && !fits {
                return Err(too_high);
            }
            continue;
        }
        // an aromatic atom may already fill its lowest valence with its
        // sigma bonds alone, like the sulfur in thiophene
        let used = if atom.aromatic { sigma } else { sigma + pi };
        let implicit = match allowed.iter().copied().find(|&v| v >= used) {
            Some(v) => v.saturating_sub(sigma + pi),
            None if atom.aromatic => 0,
            None => return Err(too_high),
        };
        mol.atom_mut(idx).implicit_hs = implicit as u8;
    }
    Ok(())
}

fn check_aromatic_rings(mol: &Molecule) -> Result<(), SmilesError> {
    let in_ring = mol.ring_bonds();
    for (idx, atom) in mol.atoms().iter().enumerate() {
        if atom.aromatic && !mol.atom_bonds(idx).iter().any(|&b| in_ring[b]) {
            return Err(SmilesError::NonRingAromatic { atom: idx });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ethanol() {
        let mol = parse("CCO").unwrap();
        assert_eq!(mol.num_atoms(), 3);
        assert_eq!(mol.num_bonds(), 2);
        let hs: Vec<_> = mol.atoms().iter().map(|a| a.total_hs()).collect();
        assert_eq!(hs, vec![3, 2, 1]);
        assert!(mol
            .bonds()
            .iter()
            .all(|b| b.bond_type == BondType::Single));
    }

    #[test]
    fn benzene() {
        let mol = parse("c1ccccc1").unwrap();
        assert_eq!(mol.num_atoms(), 6);
        assert_eq!(mol.num_bonds(), 6);
        assert!(mol
            .bonds()
            .iter()
            .all(|b| b.bond_type == BondType::Aromatic));
        assert!(mol.atoms().iter().all(|a| a.aromatic && a.implicit_hs == 1));
    }

    #[test]
    fn kekule_benzene() {
        let mol = parse("C1=CC=CC=C1").unwrap();
        let doubles = mol
            .bonds()
            .iter()
            .filter(|b| b.bond_type == BondType::Double)
            .count();
        assert_eq!(doubles, 3);
        assert!(mol.atoms().iter().all(|a| a.implicit_hs == 1));
    }

    #[test]
    fn aromatic_hydrogens() {
        let hs = |smiles| -> Vec<u8> {
            let mol = parse(smiles).unwrap();
            mol.atoms().iter().map(|a| a.total_hs()).collect()
        };
        // thiophene sulfur fills valence 2 with its ring bonds
        assert_eq!(hs("c1ccsc1"), vec![1, 1, 1, 0, 1]);
        assert_eq!(hs("o1cccc1"), vec![0, 1, 1, 1, 1]);
        assert_eq!(hs("c1ccncc1"), vec![1, 1, 1, 0, 1, 1]);
        assert_eq!(hs("Cn1cccc1"), vec![3, 0, 1, 1, 1, 1]);
        // ring fusion and substituted carbons carry no hydrogens
        let naphthalene = hs("c1ccc2ccccc2c1");
        assert_eq!(naphthalene.iter().filter(|&&h| h == 0).count(), 2);
        assert_eq!(hs("Cc1ccccc1")[1], 0);
    }

    #[test]
    fn branches_and_bonds() {
        // acetic acid
        let mol = parse("CC(=O)O").unwrap();
        assert_eq!(mol.num_atoms(), 4);
        assert_eq!(mol.bond(1).bond_type, BondType::Double);
        assert_eq!((mol.bond(2).begin, mol.bond(2).end), (1, 3));
        assert_eq!(mol.atom(1).implicit_hs, 0);

        let mol = parse("C#N").unwrap();
        assert_eq!(mol.bond(0).bond_type, BondType::Triple);
        assert_eq!(mol.atom(0).implicit_hs, 1);

        let mol = parse("F/C=C/F").unwrap();
        assert_eq!(mol.bond(0).bond_type, BondType::Single);
        assert_eq!(mol.bond(1).bond_type, BondType::Double);
    }

    #[test]
    fn bracket_atoms() {
        let mol = parse("[13CH3][NH3+]").unwrap();
        let c = mol.atom(0);
        assert_eq!(c.isotope, Some(13));
        assert_eq!(c.explicit_hs, 3);
        assert_eq!(c.implicit_hs, 0);
        let n = mol.atom(1);
        assert_eq!(n.charge, 1);
        assert_eq!(n.explicit_hs, 3);

        let mol = parse("[O--]").unwrap();
        assert_eq!(mol.atom(0).charge, -2);
        let mol = parse("[Fe+3]").unwrap();
        assert_eq!(mol.atom(0).atomic_num, 26);
        assert_eq!(mol.atom(0).charge, 3);
        let mol = parse("N[C@@H](C)C(=O)O").unwrap();
        assert_eq!(mol.atom(1).explicit_hs, 1);
        let mol = parse("[CH3:1]Cl").unwrap();
        assert_eq!(mol.atom(1).atomic_num, 17);
        let mol = parse("c1cc[nH]c1").unwrap();
        assert_eq!(mol.atom(3).explicit_hs, 1);
        let mol = parse("c1cc[se]c1").unwrap();
        assert_eq!(mol.atom(3).atomic_num, 34);
        assert_eq!(mol.atom(3).total_hs(), 0);
    }

    #[test]
    fn bracket_bounds() {
        for smiles in [
            "[C-2147483648]",
            "[C+99999999999]",
            "[C+16]",
            "[CH99999999999]",
            "[CH300]",
            "[70000C]",
        ] {
            assert!(
                matches!(parse(smiles), Err(SmilesError::Character(_))),
                "{smiles}"
            );
        }
        let mol = parse("[999C-15]").unwrap();
        assert_eq!(mol.atom(0).isotope, Some(999));
        assert_eq!(mol.atom(0).charge, -15);
    }

    #[test]
    fn ring_closures() {
        let mol = parse("C%10CC%10").unwrap();
        assert_eq!(mol.num_bonds(), 3);
        let mol = parse("C=1CC1").unwrap();
        let closure = mol.bond_between(0, 2).unwrap();
        assert_eq!(mol.bond(closure).bond_type, BondType::Double);
        // a ring label can be reused once it has been closed
        let mol = parse("C1CC1C1CC1").unwrap();
        assert_eq!(mol.num_bonds(), 7);
    }

    #[test]
    fn disconnected() {
        let mol = parse("[Na+].[Cl-]").unwrap();
        assert_eq!(mol.num_atoms(), 2);
        assert_eq!(mol.num_bonds(), 0);
    }

    #[test]
    fn empty() {
        let mol = parse("").unwrap();
        assert_eq!(mol.num_atoms(), 0);
    }

    #[test]
    fn errors() {
        assert_eq!(parse("C1CC").unwrap_err(), SmilesError::UnclosedRing);
        assert_eq!(parse("CC(C").unwrap_err(), SmilesError::UnexpectedEnd);
        assert_eq!(parse("CC)C").unwrap_err(), SmilesError::Character(2));
        assert!(matches!(
            parse("C()C").unwrap_err(),
            SmilesError::Character(_)
        ));
        assert_eq!(parse("CC=").unwrap_err(), SmilesError::UnexpectedEnd);
        assert_eq!(parse("C?").unwrap_err(), SmilesError::Character(1));
        assert!(matches!(
            parse("Xe").unwrap_err(),
            SmilesError::Character(_)
        ));
        assert_eq!(
            parse("C=1CC-1").unwrap_err(),
            SmilesError::RingBondConflict { begin: 0, end: 2 }
        );
        assert_eq!(
            parse("C12CC12").unwrap_err(),
            SmilesError::DuplicateBond { begin: 0, end: 2 }
        );
        assert_eq!(
            parse("C11").unwrap_err(),
            SmilesError::DuplicateBond { begin: 0, end: 0 }
        );
        assert!(matches!(
            parse("C(C)(C)(C)(C)C").unwrap_err(),
            SmilesError::Valence { atom: 0, valence: 5, .. }
        ));
        assert!(matches!(
            parse("[CH5]").unwrap_err(),
            SmilesError::Valence { atom: 0, .. }
        ));
        assert_eq!(
            parse("cc").unwrap_err(),
            SmilesError::NonRingAromatic { atom: 0 }
        );
        assert_eq!(parse("C.").unwrap_err(), SmilesError::UnexpectedEnd);
        assert_eq!(parse("[C").unwrap_err(), SmilesError::UnexpectedEnd);
        assert!(parse("not a smiles").is_err());
    }
}
