use bf_types::{Bracket, BracketError};

/// Precomputed bracket pairs for one source buffer.
///
/// Built once before execution or code generation. `partner(i)` answers in
/// constant time with the same result [`crate::scan_partner`] would give.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketMap {
    /// Indexed by source offset; `Some(partner)` for every matched bracket.
    partners: Vec<Option<usize>>,
    pair_count: usize,
    max_depth: usize,
}

impl BracketMap {
    /// Pair every bracket in `code`.
    ///
    /// Fails with the unmatched bracket at the lowest offset when the source
    /// is unbalanced.
    pub fn build(code: &[u8]) -> Result<Self, BracketError> {
        let (map, errors) = Self::analyze(code);
        match errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(map),
        }
    }

    /// Pair what can be paired and report every unmatched bracket, in source
    /// order.
    pub fn analyze(code: &[u8]) -> (Self, Vec<BracketError>) {
        let mut partners = vec![None; code.len()];
        let mut open: Vec<usize> = Vec::new();
        let mut errors = Vec::new();
        let mut pair_count = 0;
        let mut max_depth = 0;

        for (i, &b) in code.iter().enumerate() {
            match b {
                b'[' => {
                    open.push(i);
                    max_depth = max_depth.max(open.len());
                }
                b']' => match open.pop() {
                    Some(start) => {
                        partners[start] = Some(i);
                        partners[i] = Some(start);
                        pair_count += 1;
                    }
                    None => errors.push(BracketError::new(Bracket::Close, i)),
                },
                _ => {}
            }
        }

        // Every `[` still open is later than any unmatched `]`: a `]` only
        // goes unmatched while the stack is empty.
        errors.extend(open.into_iter().map(|i| BracketError::new(Bracket::Open, i)));

        let map = Self {
            partners,
            pair_count,
            max_depth,
        };
        (map, errors)
    }

    /// The partner of the bracket at `index`, or `None` for non-brackets and
    /// unmatched brackets.
    #[inline]
    pub fn partner(&self, index: usize) -> Option<usize> {
        self.partners.get(index).copied().flatten()
    }

    /// Matched pairs as `(open, close)` offsets, ordered by the `[` offset.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.partners
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| p.filter(|&p| p > i).map(|p| (i, p)))
    }

    pub fn pair_count(&self) -> usize {
        self.pair_count
    }

    /// Deepest loop nesting in the source.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Length of the source the map was built from.
    pub fn source_len(&self) -> usize {
        self.partners.len()
    }
}
