use arrayvec::ArrayVec;
use thiserror::Error;

use crate::geometry::{FloatType, Ray, RayBoxIntersection as _};

use super::{Bvh, NodeIdx, NodeKind};

/// Maximum number of nodes waiting on the traversal stack.
/// Enough for any reasonably balanced tree; degenerate chains deeper than this are reported
/// as errors.
pub const TRAVERSAL_STACK_CAPACITY: usize = 64;

#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum TraversalError {
    #[error("Traversal stack overflow, more than {capacity} pending nodes")]
    StackOverflow { capacity: usize },
}

/// Fixed size LIFO of pending node indices.
#[derive(Clone, Debug, Default)]
pub(crate) struct TraversalStack<T> {
    stack: ArrayVec<T, TRAVERSAL_STACK_CAPACITY>,
}

impl<T> TraversalStack<T> {
    pub fn new() -> Self {
        TraversalStack {
            stack: ArrayVec::new(),
        }
    }

    pub fn push(&mut self, value: T) -> Result<(), TraversalError> {
        self.stack
            .try_push(value)
            .map_err(|_| TraversalError::StackOverflow {
                capacity: TRAVERSAL_STACK_CAPACITY,
            })
    }

    pub fn pop(&mut self) -> Option<T> {
        self.stack.pop()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PrimitiveHit {
    pub t: FloatType,
    /// Index of the primitive in the bounds the tree was built from.
    pub primitive_index: u32,
}

impl Bvh {
    /// Finds the nearest primitive along the ray.
    ///
    /// `intersect_primitive` receives an original primitive index together with the ray
    /// (whose `t_max` shrinks as hits are found) and returns the hit distance, if any.
    /// Every leaf whose box is hit within the current interval gets visited.
    pub fn intersect_closest<F>(
        &self,
        ray: &Ray,
        mut intersect_primitive: F,
    ) -> Result<Option<PrimitiveHit>, TraversalError>
    where
        F: FnMut(u32, &Ray) -> Option<FloatType>,
    {
        let mut ray = *ray;
        let mut best = None;

        self.walk(&mut ray, |primitive_index, ray| {
            if let Some(t) = intersect_primitive(primitive_index, ray)
                && t >= ray.t_min
                && t < ray.t_max
            {
                ray.t_max = t;
                best = Some(PrimitiveHit { t, primitive_index });
            }
            false
        })?;

        Ok(best)
    }

    /// Returns true as soon as any primitive reports a hit inside the ray interval.
    pub fn intersect_any<F>(&self, ray: &Ray, mut intersect_primitive: F) -> Result<bool, TraversalError>
    where
        F: FnMut(u32, &Ray) -> Option<FloatType>,
    {
        let mut ray = *ray;
        self.walk(&mut ray, |primitive_index, ray| {
            intersect_primitive(primitive_index, ray).is_some_and(|t| t >= ray.t_min && t <= ray.t_max)
        })
    }

    /// Depth first walk over nodes hit by the ray.
    /// `visit` is called for each primitive of each hit leaf and may narrow the ray.
    /// Returns true once `visit` does.
    fn walk<F>(&self, ray: &mut Ray, mut visit: F) -> Result<bool, TraversalError>
    where
        F: FnMut(u32, &mut Ray) -> bool,
    {
        let mut stack = TraversalStack::<NodeIdx>::new();
        stack.push(self.root())?;

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.bound.is_hit_by(ray) {
                continue;
            }

            match node.kind {
                NodeKind::Leaf { first, count } => {
                    for &primitive_index in self.leaf_primitives(first, count) {
                        if visit(primitive_index, ray) {
                            return Ok(true);
                        }
                    }
                }
                NodeKind::Internal { left, right } => {
                    stack.push(right)?;
                    stack.push(left)?;
                }
            }
        }

        Ok(false)
    }
}
