/// Generic API for the lattices values are evaluated into
pub trait LatticeTrait: Clone + PartialEq {
    fn top() -> Self;
    fn is_top(&self) -> bool;
    fn bottom() -> Self;
    fn is_bottom(&self) -> bool;
    /// Least upper bound
    fn lub(&self, other: &Self) -> Self;
    /// Greatest lower bound
    fn glb(&self, other: &Self) -> Self;
    fn widening_with(&self, other: &Self) -> Self;
    /// Tightens `self` with a value recomputed from it. Sound only when `other` was derived
    /// from a post-fixpoint, and callers bound how many times it is applied.
    fn narrowing_with(&self, other: &Self) -> Self;
}
