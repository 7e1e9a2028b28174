//! Subset counting and enumeration under a monotone predicate.
//!
//! Both entry points take a *downward-closed* partial predicate: if it
//! fails on a subset, it fails on every superset. That licenses an
//! include/exclude depth-first search pruned at the first failure.
//!
//! [`count_filtered_subsets`] additionally takes a total predicate (holds
//! for the full `0..n` set): when it holds, every subset holds by closure
//! and the count short-circuits to `2^n` without touching the partial
//! predicate. The `2^n` fast path and, for very wide universes, the
//! per-leaf increments are overflow-guarded; an unrepresentable count is
//! reported as `None`, never wrapped.
//!
//! [`filtered_subsets`] is the lazy mirror: an iterator over the subsets
//! themselves, exhaustible once per invocation. Cancellation is simply
//! ceasing to pull.

/// Counts the subsets of `0..n` satisfying `partial`.
///
/// `total` is consulted first: if the whole set satisfies the predicate,
/// the result is `2^n` (or `None` if that exceeds `u64`). Otherwise an
/// include/exclude DFS runs, pruning at the first `partial` failure.
pub fn count_filtered_subsets<T, P>(n: usize, total: T, partial: P) -> Option<u64>
where
    T: FnOnce() -> bool,
    P: Fn(&[usize]) -> bool,
{
    if total() {
        if n >= 64 {
            return None;
        }
        return Some(1u64 << n);
    }
    // Increments only need guarding when the unguarded bound 2^n itself
    // would not fit.
    let guarded = n >= 64;
    let mut chosen = Vec::new();
    let mut count = 0u64;
    if dfs(0, n, &mut chosen, &partial, &mut count, guarded) {
        Some(count)
    } else {
        None
    }
}

/// Returns `false` on counter overflow (guarded mode only).
fn dfs<P>(i: usize, n: usize, chosen: &mut Vec<usize>, partial: &P, count: &mut u64, guarded: bool) -> bool
where
    P: Fn(&[usize]) -> bool,
{
    if i == n {
        if guarded {
            match count.checked_add(1) {
                Some(c) => *count = c,
                None => return false,
            }
        } else {
            *count += 1;
        }
        return true;
    }
    // Exclude element i.
    if !dfs(i + 1, n, chosen, partial, count, guarded) {
        return false;
    }
    // Include element i; prune the whole branch on the first failure.
    chosen.push(i);
    let ok = if partial(chosen) {
        dfs(i + 1, n, chosen, partial, count, guarded)
    } else {
        true
    };
    chosen.pop();
    ok
}

/// Lazy enumeration of the subsets of `0..n` satisfying `partial`.
pub fn filtered_subsets<P>(n: usize, partial: P) -> FilteredSubsets<P>
where
    P: Fn(&[usize]) -> bool,
{
    FilteredSubsets {
        n,
        partial,
        stack: vec![Frame {
            index: 0,
            next: Some(Branch::Exclude),
        }],
        chosen: Vec::new(),
    }
}

/// Which branch of an element to explore next.
#[derive(Debug, Clone, Copy)]
enum Branch {
    /// Leave the element out.
    Exclude,
    /// Take the element (subject to the partial predicate).
    Include,
}

/// Frame on the exploration stack.
#[derive(Debug)]
struct Frame {
    /// The element being decided; `index == n` marks a complete subset.
    index: usize,
    /// Which branch to explore next (`None` once both are done).
    next: Option<Branch>,
}

/// Iterator over predicate-satisfying subsets, created by
/// [`filtered_subsets`].
///
/// Uses depth-first traversal with backtracking; the current subset is
/// kept in a single vector that grows and shrinks as the search moves,
/// cloned only when a complete subset is yielded.
pub struct FilteredSubsets<P> {
    n: usize,
    partial: P,
    stack: Vec<Frame>,
    chosen: Vec<usize>,
}

impl<P> Iterator for FilteredSubsets<P>
where
    P: Fn(&[usize]) -> bool,
{
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;

            if frame.index == self.n {
                // Complete subset; every prefix passed, so it qualifies.
                let result = self.chosen.clone();
                self.stack.pop();
                return Some(result);
            }

            match frame.next {
                Some(Branch::Exclude) => {
                    frame.next = Some(Branch::Include);
                    let index = frame.index;
                    self.stack.push(Frame {
                        index: index + 1,
                        next: Some(Branch::Exclude),
                    });
                }
                Some(Branch::Include) => {
                    frame.next = None;
                    let index = frame.index;
                    self.chosen.push(index);
                    if (self.partial)(&self.chosen) {
                        self.stack.push(Frame {
                            index: index + 1,
                            next: Some(Branch::Exclude),
                        });
                    } else {
                        // Pruned: no superset can satisfy the predicate.
                        self.chosen.pop();
                    }
                }
                None => {
                    // Both branches explored; drop our element if we took it.
                    if self.chosen.last() == Some(&frame.index) {
                        self.chosen.pop();
                    }
                    self.stack.pop();
                }
            }
        }
    }
}
