//! a small molecule graph, enough to parse SMILES and fingerprint the result

use smiles::SmilesError;

pub mod bitvector;
pub mod elements;
pub mod fingerprint;
pub mod smiles;

#[derive(Clone, Debug, PartialEq)]
pub struct Atom {
    /// 0 for the `*` dummy atom
    pub atomic_num: u8,
    pub aromatic: bool,
    pub charge: i8,
    pub isotope: Option<u16>,
    /// hydrogens written inside a bracket atom
    pub explicit_hs: u8,
    /// hydrogens implied by the default valence of an organic subset atom
    pub implicit_hs: u8,
    pub bracket: bool,
}

impl Atom {
    pub fn new(atomic_num: u8, aromatic: bool) -> Self {
        Self {
            atomic_num,
            aromatic,
            charge: 0,
            isotope: None,
            explicit_hs: 0,
            implicit_hs: 0,
            bracket: false,
        }
    }

    pub fn symbol(&self) -> &'static str {
        elements::symbol(self.atomic_num)
    }

    pub fn total_hs(&self) -> u8 {
        self.explicit_hs + self.implicit_hs
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BondType {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl BondType {
    /// the integer bond order, or None for aromatic bonds
    pub fn order(&self) -> Option<u32> {
        match self {
            BondType::Single => Some(1),
            BondType::Double => Some(2),
            BondType::Triple => Some(3),
            BondType::Quadruple => Some(4),
            BondType::Aromatic => None,
        }
    }

    /// stable code mixed into fingerprint hashes. these match the values of
    /// RDKit's Bond::BondType enum
    pub(crate) fn code(&self) -> u32 {
        match self {
            BondType::Single => 1,
            BondType::Double => 2,
            BondType::Triple => 3,
            BondType::Quadruple => 4,
            BondType::Aromatic => 12,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bond {
    pub begin: usize,
    pub end: usize,
    pub bond_type: BondType,
}

impl Bond {
    /// the atom on the other end of `self` from `atom`
    pub fn other(&self, atom: usize) -> usize {
        if self.begin == atom {
            self.end
        } else {
            self.begin
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    /// bond indices touching each atom
    adjacency: Vec<Vec<usize>>,
}

impl Molecule {
    pub fn from_smiles(smiles: &str) -> Result<Self, SmilesError> {
        smiles::parse(smiles)
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn num_bonds(&self) -> usize {
        self.bonds.len()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn atom(&self, idx: usize) -> &Atom {
        &self.atoms[idx]
    }

    pub fn bond(&self, idx: usize) -> &Bond {
        &self.bonds[idx]
    }

    /// indices of the bonds touching atom `idx`
    pub fn atom_bonds(&self, idx: usize) -> &[usize] {
        &self.adjacency[idx]
    }

    /// returns the index of the bond between `a` and `b`, if any
    pub fn bond_between(&self, a: usize, b: usize) -> Option<usize> {
        self.adjacency[a]
            .iter()
            .copied()
            .find(|&i| self.bonds[i].other(a) == b)
    }

    pub(crate) fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        self.atoms.len() - 1
    }

    pub(crate) fn atom_mut(&mut self, idx: usize) -> &mut Atom {
        &mut self.atoms[idx]
    }

    /// callers are responsible for not adding a second bond between the same
    /// pair of atoms
    pub(crate) fn add_bond(
        &mut self,
        begin: usize,
        end: usize,
        bond_type: BondType,
    ) -> usize {
        let idx = self.bonds.len();
        self.bonds.push(Bond {
            begin,
            end,
            bond_type,
        });
        self.adjacency[begin].push(idx);
        self.adjacency[end].push(idx);
        idx
    }

    /// flags each bond that lies on at least one cycle. a bond is acyclic
    /// exactly when it is a bridge, so this is Tarjan's bridge search done
    /// with an explicit stack
    pub fn ring_bonds(&self) -> Vec<bool> {
        const UNSEEN: usize = usize::MAX;
        let n = self.atoms.len();
        let mut disc = vec![UNSEEN; n];
        let mut low = vec![0; n];
        let mut in_ring = vec![true; self.bonds.len()];
        let mut time = 0;

        for root in 0..n {
            if disc[root] != UNSEEN {
                continue;
            }
            disc[root] = time;
            low[root] = time;
            time += 1;
            // (atom, bond we arrived through, next adjacency slot)
            let mut stack = vec![(root, UNSEEN, 0)];
            while let Some(top) = stack.last_mut() {
                let (v, via) = (top.0, top.1);
                if top.2 < self.adjacency[v].len() {
                    let b = self.adjacency[v][top.2];
                    top.2 += 1;
                    if b == via {
                        continue;
                    }
                    let w = self.bonds[b].other(v);
                    if disc[w] == UNSEEN {
                        disc[w] = time;
                        low[w] = time;
                        time += 1;
                        stack.push((w, b, 0));
                    } else {
                        low[v] = low[v].min(disc[w]);
                    }
                } else {
                    stack.pop();
                    if let Some(&(u, _, _)) = stack.last() {
                        low[u] = low[u].min(low[v]);
                        if low[v] > disc[u] {
                            in_ring[via] = false;
                        }
                    }
                }
            }
        }
        in_ring
    }
}
