//! topological fingerprints in the style of RDKit's `RDKFingerprint`

use bitflags::bitflags;

use super::{bitvector::BitVector, Molecule};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FingerprintFlags: u32 {
        /// hash every connected subgraph, not just linear paths
        const BRANCHED_PATHS = 0x1;
        /// distinguish bond types. without this every bond hashes the same
        const USE_BOND_ORDER = 0x2;
        /// include bonds to hydrogen atoms written as separate atoms
        const USE_HS =         0x4;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FingerprintParams {
    /// the smallest subgraph, in bonds, that sets bits
    pub min_path: u32,
    /// the largest subgraph, in bonds, that sets bits
    pub max_path: u32,
    pub fp_size: u32,
    pub bits_per_hash: u32,
    pub flags: FingerprintFlags,
}

impl Default for FingerprintParams {
    /// the RDKFingerprint defaults
    fn default() -> Self {
        Self {
            min_path: 1,
            max_path: 7,
            fp_size: 2048,
            bits_per_hash: 2,
            flags: FingerprintFlags::all(),
        }
    }
}

/// boost's hash_combine, used so hashes are stable across builds
fn hash_combine(seed: &mut u32, v: u32) {
    *seed ^= v
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(*seed << 6)
        .wrapping_add(*seed >> 2);
}

/// the `minstd_rand` linear congruential generator RDKit seeds with each path
/// hash
struct MinStd(u64);

impl MinStd {
    const MODULUS: u64 = 2_147_483_647;

    fn new(seed: u32) -> Self {
        let s = seed as u64 % Self::MODULUS;
        Self(if s == 0 { 1 } else { s })
    }

    fn next_u32(&mut self) -> u32 {
        self.0 = self.0 * 48_271 % Self::MODULUS;
        self.0 as u32
    }
}

/// hash every bond subgraph of `mol` within the configured size range into a
/// bit vector of `params.fp_size` bits
pub fn rdk_fingerprint(
    mol: &Molecule,
    params: &FingerprintParams,
) -> BitVector {
    let mut fp = BitVector::new(params.fp_size as usize);
    if params.fp_size == 0 {
        return fp;
    }
    let use_hs = params.flags.contains(FingerprintFlags::USE_HS);
    let allowed: Vec<bool> = mol
        .bonds()
        .iter()
        .map(|b| {
            use_hs
                || (mol.atom(b.begin).atomic_num != 1
                    && mol.atom(b.end).atomic_num != 1)
        })
        .collect();

    let subgraphs =
        Subgraphs::new(mol, &allowed, params.min_path, params.max_path);
    let mut degree = vec![0u32; mol.num_atoms()];
    subgraphs.for_each(&mut |bonds: &[usize]| {
        for &b in bonds {
            let bond = mol.bond(b);
            degree[bond.begin] += 1;
            degree[bond.end] += 1;
        }
        let keep = params.flags.contains(FingerprintFlags::BRANCHED_PATHS)
            || bonds.iter().all(|&b| {
                let bond = mol.bond(b);
                degree[bond.begin] <= 2 && degree[bond.end] <= 2
            });
        if keep {
            let hash = subgraph_hash(mol, bonds, &degree, params.flags);
            let mut rng = MinStd::new(hash);
            for _ in 0..params.bits_per_hash {
                fp.set((rng.next_u32() % params.fp_size) as usize);
            }
        }
        for &b in bonds {
            let bond = mol.bond(b);
            degree[bond.begin] -= 1;
            degree[bond.end] -= 1;
        }
    });
    fp
}

/// the per-atom part of a bond descriptor: element, aromaticity, and how many
/// subgraph bonds touch the atom
fn atom_invariant(mol: &Molecule, atom: usize, degree: u32) -> u32 {
    let a = mol.atom(atom);
    let mut inv = a.atomic_num as u32 % 128;
    if a.aromatic {
        inv |= 1 << 7;
    }
    (inv << 3) | degree.min(7)
}

/// hashes the sorted multiset of bond descriptors, so the result does not
/// depend on atom or bond numbering
fn subgraph_hash(
    mol: &Molecule,
    bonds: &[usize],
    degree: &[u32],
    flags: FingerprintFlags,
) -> u32 {
    let mut descriptors: Vec<u32> = bonds
        .iter()
        .map(|&b| {
            let bond = mol.bond(b);
            let a = atom_invariant(mol, bond.begin, degree[bond.begin]);
            let z = atom_invariant(mol, bond.end, degree[bond.end]);
            let (lo, hi) = if a <= z { (a, z) } else { (z, a) };
            let mut h = if flags.contains(FingerprintFlags::USE_BOND_ORDER) {
                bond.bond_type.code()
            } else {
                1
            };
            hash_combine(&mut h, lo);
            hash_combine(&mut h, hi);
            h
        })
        .collect();
    descriptors.sort_unstable();
    let mut seed = bonds.len() as u32;
    for d in descriptors {
        hash_combine(&mut seed, d);
    }
    seed
}

/// enumerates every connected set of bonds with a size in `[min, max]`
/// exactly once, using the ESU algorithm on the molecule's line graph
struct Subgraphs {
    /// bonds sharing an atom with each bond, restricted to allowed bonds
    neighbors: Vec<Vec<usize>>,
    allowed: Vec<bool>,
    min: usize,
    max: usize,
}

impl Subgraphs {
    fn new(mol: &Molecule, allowed: &[bool], min: u32, max: u32) -> Self {
        let neighbors = (0..mol.num_bonds())
            .map(|b| {
                if !allowed[b] {
                    return Vec::new();
                }
                let bond = mol.bond(b);
                let mut nbrs: Vec<usize> = [bond.begin, bond.end]
                    .iter()
                    .flat_map(|&a| mol.atom_bonds(a).iter().copied())
                    .filter(|&o| o != b && allowed[o])
                    .collect();
                nbrs.sort_unstable();
                nbrs.dedup();
                nbrs
            })
            .collect();
        Self {
            neighbors,
            allowed: allowed.to_vec(),
            min: min.max(1) as usize,
            max: max as usize,
        }
    }

    fn for_each(&self, f: &mut dyn FnMut(&[usize])) {
        if self.max == 0 || self.min > self.max {
            return;
        }
        let n = self.neighbors.len();
        // how many members of the current subgraph each bond is in or next to
        let mut covered = vec![0u32; n];
        let mut sub = Vec::with_capacity(self.max);
        for root in 0..n {
            if !self.allowed[root] {
                continue;
            }
            let ext: Vec<usize> = self.neighbors[root]
                .iter()
                .copied()
                .filter(|&u| u > root)
                .collect();
            self.push(root, &mut sub, &mut covered);
            self.extend(root, ext, &mut sub, &mut covered, f);
            self.pop(&mut sub, &mut covered);
        }
    }

    fn push(&self, b: usize, sub: &mut Vec<usize>, covered: &mut [u32]) {
        sub.push(b);
        covered[b] += 1;
        for &u in &self.neighbors[b] {
            covered[u] += 1;
        }
    }

    fn pop(&self, sub: &mut Vec<usize>, covered: &mut [u32]) {
        if let Some(b) = sub.pop() {
            covered[b] -= 1;
            for &u in &self.neighbors[b] {
                covered[u] -= 1;
            }
        }
    }

    fn extend(
        &self,
        root: usize,
        mut ext: Vec<usize>,
        sub: &mut Vec<usize>,
        covered: &mut [u32],
        f: &mut dyn FnMut(&[usize]),
    ) {
        if sub.len() >= self.min {
            f(sub.as_slice());
        }
        if sub.len() == self.max {
            return;
        }
        while let Some(w) = ext.pop() {
            // only bonds not yet in or adjacent to the subgraph join the
            // extension, which keeps each subgraph to a single visit
            let mut next = ext.clone();
            next.extend(
                self.neighbors[w]
                    .iter()
                    .copied()
                    .filter(|&u| u > root && covered[u] == 0),
            );
            self.push(w, sub, covered);
            self.extend(root, next, sub, covered, f);
            self.pop(sub, covered);
        }
    }
}

/// the Tanimoto similarity between `a` and `b`: shared bits over the union.
/// two empty fingerprints are identical. panics if `a` and `b` have different
/// lengths, since their bit positions don't correspond
pub fn tanimoto(a: &BitVector, b: &BitVector) -> f64 {
    assert_eq!(a.len(), b.len(), "comparing fingerprints of different sizes");
    let common = a.count_common(b);
    let union = a.count_ones() + b.count_ones() - common;
    if union == 0 {
        return 1.0;
    }
    common as f64 / union as f64
}
