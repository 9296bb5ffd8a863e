use glam::Vec3;

use crate::{primitive::Primitive, Hit};

const BIN_COUNT: usize = 12;
const MAX_LEAF_SIZE: usize = 4;
const STACK_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn grow(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn grow_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        (self.max - self.min).max(Vec3::ZERO)
    }

    pub fn area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let e = self.extent();
        2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }

    /// Slab test returning the entry distance when the box is hit before `t_max`.
    fn hit_distance(&self, origin: Vec3, inv_direction: Vec3, t_max: f32) -> Option<f32> {
        let t0 = (self.min - origin) * inv_direction;
        let t1 = (self.max - origin) * inv_direction;

        let t_near = t0.min(t1).max_element().max(0.0);
        let t_far = t0.max(t1).min_element().min(t_max);

        if t_near <= t_far {
            Some(t_near)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    bounds: Aabb,
    /// First primitive for leaves, left child for interior nodes.
    left_or_first: u32,
    /// Zero for interior nodes.
    count: u32,
}

/// Binned-SAH bounding volume hierarchy over the scene's primitives.
#[derive(Debug, Clone, Default)]
pub(crate) struct Bvh {
    nodes: Vec<BvhNode>,
    primitive_indices: Vec<u32>,
}

impl Bvh {
    pub fn new(primitives: &[Primitive]) -> Self {
        puffin::profile_function!();

        if primitives.is_empty() {
            return Self::default();
        }

        let bounds: Vec<Aabb> = primitives.iter().map(Primitive::aabb).collect();
        let centers: Vec<Vec3> = bounds.iter().map(Aabb::center).collect();

        let mut primitive_indices: Vec<u32> = (0..primitives.len() as u32).collect();
        let mut nodes = Vec::with_capacity(primitives.len() * 2);
        nodes.push(BvhNode {
            bounds: Aabb::EMPTY,
            left_or_first: 0,
            count: primitives.len() as u32,
        });

        let mut stack = vec![0usize];
        while let Some(node_idx) = stack.pop() {
            let first = nodes[node_idx].left_or_first as usize;
            let count = nodes[node_idx].count as usize;
            let range = first..first + count;

            let mut node_bounds = Aabb::EMPTY;
            let mut center_bounds = Aabb::EMPTY;
            for &i in &primitive_indices[range.clone()] {
                node_bounds.grow(&bounds[i as usize]);
                center_bounds.grow_point(centers[i as usize]);
            }
            nodes[node_idx].bounds = node_bounds;

            if count <= MAX_LEAF_SIZE {
                continue;
            }

            let Some((axis, split)) = find_split(
                &primitive_indices[range.clone()],
                &bounds,
                &centers,
                &center_bounds,
                node_bounds.area() * count as f32,
            ) else {
                continue;
            };

            let slice = &mut primitive_indices[range];
            let mut left_count = 0;
            for i in 0..slice.len() {
                if centers[slice[i] as usize][axis] < split {
                    slice.swap(i, left_count);
                    left_count += 1;
                }
            }
            if left_count == 0 || left_count == count {
                continue;
            }

            let left_idx = nodes.len();
            nodes.push(BvhNode {
                bounds: Aabb::EMPTY,
                left_or_first: first as u32,
                count: left_count as u32,
            });
            nodes.push(BvhNode {
                bounds: Aabb::EMPTY,
                left_or_first: (first + left_count) as u32,
                count: (count - left_count) as u32,
            });

            nodes[node_idx].left_or_first = left_idx as u32;
            nodes[node_idx].count = 0;

            stack.push(left_idx + 1);
            stack.push(left_idx);
        }

        log::debug!(
            "Built bvh with {} nodes over {} primitives",
            nodes.len(),
            primitives.len()
        );

        Self {
            nodes,
            primitive_indices,
        }
    }

    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map(|node| node.bounds).unwrap_or_default()
    }

    pub fn intersect(
        &self,
        primitives: &[Primitive],
        origin: Vec3,
        direction: Vec3,
        t_max: f32,
    ) -> Option<Hit> {
        let mut closest: Option<Hit> = None;

        self.traverse(origin, direction, t_max, |primitive_idx, t_max| {
            let primitive = &primitives[primitive_idx as usize];
            if let Some(hit) = primitive.intersect(origin, direction, *t_max, primitive_idx) {
                *t_max = hit.t;
                closest = Some(hit);
            }
            false
        });

        closest
    }

    pub fn occluded(
        &self,
        primitives: &[Primitive],
        origin: Vec3,
        direction: Vec3,
        t_max: f32,
    ) -> bool {
        let mut occluded = false;
        self.traverse(origin, direction, t_max, |primitive_idx, t_max| {
            occluded = primitives[primitive_idx as usize].intersects(origin, direction, *t_max);
            occluded
        });

        occluded
    }

    /// Visits leaf primitives front to back. `visit` returns `true` to stop early and may shrink
    /// `t_max` to cull nodes behind a closer hit.
    fn traverse<V>(&self, origin: Vec3, direction: Vec3, mut t_max: f32, mut visit: V)
    where
        V: FnMut(u32, &mut f32) -> bool,
    {
        if self.nodes.is_empty() {
            return;
        }

        let inv_direction = direction.recip();
        if self.nodes[0]
            .bounds
            .hit_distance(origin, inv_direction, t_max)
            .is_none()
        {
            return;
        }

        let mut stack = [0u32; STACK_SIZE];
        let mut stack_len = 1;

        while stack_len > 0 {
            stack_len -= 1;
            let node = &self.nodes[stack[stack_len] as usize];

            if node.count > 0 {
                let first = node.left_or_first as usize;
                for &primitive_idx in &self.primitive_indices[first..first + node.count as usize] {
                    if visit(primitive_idx, &mut t_max) {
                        return;
                    }
                }
                continue;
            }

            let left = node.left_or_first;
            let right = left + 1;
            let left_t = self.nodes[left as usize]
                .bounds
                .hit_distance(origin, inv_direction, t_max);
            let right_t = self.nodes[right as usize]
                .bounds
                .hit_distance(origin, inv_direction, t_max);

            let mut push = |idx: u32| {
                debug_assert!(stack_len < STACK_SIZE);
                stack[stack_len] = idx;
                stack_len += 1;
            };

            match (left_t, right_t) {
                (Some(l), Some(r)) => {
                    // Far child first so the near child is popped next.
                    if l <= r {
                        push(right);
                        push(left);
                    } else {
                        push(left);
                        push(right);
                    }
                }
                (Some(_), None) => push(left),
                (None, Some(_)) => push(right),
                (None, None) => {}
            }
        }
    }
}

/// Evaluates binned SAH splits on all axes, returning `(axis, position)` when splitting is
/// cheaper than `leaf_cost`.
fn find_split(
    indices: &[u32],
    bounds: &[Aabb],
    centers: &[Vec3],
    center_bounds: &Aabb,
    leaf_cost: f32,
) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32, f32)> = None;

    for axis in 0..3 {
        let lo = center_bounds.min[axis];
        let hi = center_bounds.max[axis];
        if hi - lo <= f32::EPSILON {
            continue;
        }

        let scale = BIN_COUNT as f32 / (hi - lo);
        let mut bin_bounds = [Aabb::EMPTY; BIN_COUNT];
        let mut bin_counts = [0usize; BIN_COUNT];
        for &i in indices {
            let bin = (((centers[i as usize][axis] - lo) * scale) as usize).min(BIN_COUNT - 1);
            bin_bounds[bin].grow(&bounds[i as usize]);
            bin_counts[bin] += 1;
        }

        let mut right_areas = [0.0; BIN_COUNT - 1];
        let mut right_counts = [0usize; BIN_COUNT - 1];
        let mut accumulated = Aabb::EMPTY;
        let mut count = 0;
        for i in (1..BIN_COUNT).rev() {
            accumulated.grow(&bin_bounds[i]);
            count += bin_counts[i];
            right_areas[i - 1] = accumulated.area();
            right_counts[i - 1] = count;
        }

        let mut accumulated = Aabb::EMPTY;
        let mut count = 0;
        for i in 0..BIN_COUNT - 1 {
            accumulated.grow(&bin_bounds[i]);
            count += bin_counts[i];
            if count == 0 || right_counts[i] == 0 {
                continue;
            }

            let cost =
                accumulated.area() * count as f32 + right_areas[i] * right_counts[i] as f32;
            if best.map_or(true, |(_, _, best_cost)| cost < best_cost) {
                best = Some((axis, lo + (i + 1) as f32 / scale, cost));
            }
        }
    }

    best.filter(|(_, _, cost)| *cost < leaf_cost)
        .map(|(axis, split, _)| (axis, split))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sphere;

    fn grid_of_spheres() -> Vec<Primitive> {
        let mut primitives = vec![];
        for x in 0..8 {
            for y in 0..8 {
                primitives.push(Primitive::Sphere(Sphere::new(
                    Vec3::new(x as f32 * 3.0, y as f32 * 3.0, -10.0),
                    1.0,
                    0,
                )));
            }
        }
        primitives
    }

    fn brute_force(primitives: &[Primitive], origin: Vec3, direction: Vec3) -> Option<Hit> {
        primitives
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.intersect(origin, direction, f32::INFINITY, i as u32))
            .min_by(|a, b| a.t.total_cmp(&b.t))
    }

    #[test]
    fn matches_brute_force() {
        let primitives = grid_of_spheres();
        let bvh = Bvh::new(&primitives);
        assert!(bvh.nodes.len() > 1);

        for x in 0..24 {
            for y in 0..24 {
                let origin = Vec3::new(10.5, 10.5, 5.0);
                let target = Vec3::new(x as f32, y as f32, -10.0);
                let direction = (target - origin).normalize();

                let expected = brute_force(&primitives, origin, direction);
                let actual = bvh.intersect(&primitives, origin, direction, f32::INFINITY);
                assert_eq!(actual.map(|h| h.primitive), expected.map(|h| h.primitive));
                assert_eq!(
                    bvh.occluded(&primitives, origin, direction, f32::INFINITY),
                    expected.is_some()
                );
            }
        }
    }

    #[test]
    fn empty_hierarchy_never_hits() {
        let bvh = Bvh::new(&[]);
        assert!(bvh.intersect(&[], Vec3::ZERO, Vec3::X, 1.0).is_none());
        assert!(!bvh.occluded(&[], Vec3::ZERO, Vec3::X, 1.0));
        assert!(bvh.bounds().is_empty());
    }
}
