//! Priority-queue extrapolation of missing leaf values.
//!
//! Collects every leaf with a NaN measure and some Von-Neumann neighbors,
//! keyed by its count of valid neighbors, then drains the queue layer by
//! layer: all elements sharing the top key are averaged against the same
//! snapshot of the fields before any of them is written back.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::tree::super_cursor::CENTER_CURSOR;
use crate::tree::{HyperTreeGrid, ScalarArray, VonNeumannSuperCursor};

struct QueueElement {
    key: i64,
    id: usize,
    mean: f64,
    display_mean: f64,
    invalid_neighbor_ids: Vec<usize>,
}

impl PartialEq for QueueElement {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for QueueElement {}

impl Ord for QueueElement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl PartialOrd for QueueElement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Fill NaN leaf values by iterative neighbor averaging.
///
/// Running this again after it completes is a no-op for every node whose
/// value was defined.
pub fn extrapolate_gaps(grid: &mut HyperTreeGrid) {
    if grid.measure().is_none() {
        return;
    }

    let mut queue = BinaryHeap::new();
    for tree_id in 0..grid.n_trees() {
        // Nodes whose neighbors are all valid are written as soon as the
        // tree's scan finishes; the rest go through the queue.
        let mut immediate = Vec::new();
        {
            let mut cursor = VonNeumannSuperCursor::new(grid, tree_id);
            let measure = match grid.measure() {
                Some(m) => m,
                None => return,
            };
            fill_queue(
                measure,
                grid.display(),
                &mut cursor,
                &mut queue,
                &mut immediate,
            );
        }
        for (id, value, display_value) in immediate {
            if let Some(array) = grid.measure_mut() {
                array.insert(id, value);
            }
            if let Some(array) = grid.display_mut() {
                array.insert(id, display_value);
            }
        }
    }

    drain(grid, queue);
}

fn fill_queue(
    measure: &ScalarArray,
    display: Option<&ScalarArray>,
    cursor: &mut VonNeumannSuperCursor,
    queue: &mut BinaryHeap<QueueElement>,
    immediate: &mut Vec<(usize, f64, f64)>,
) {
    let id = match cursor.global_node_index(CENTER_CURSOR) {
        Some(id) => id,
        None => return,
    };
    let value = measure.get(id);

    if value.is_nan() {
        let mut valid = 0i64;
        let mut mean = 0.0;
        let mut display_mean = 0.0;
        let mut invalid_neighbor_ids = Vec::new();

        for c in 0..cursor.n_cursors() {
            if c == CENTER_CURSOR {
                continue;
            }
            let neighbor = match cursor.global_node_index(c) {
                Some(n) => n,
                None => continue,
            };
            if cursor.is_masked(c) {
                continue;
            }
            let v = measure.get(neighbor);
            if v.is_nan() {
                invalid_neighbor_ids.push(neighbor);
            } else {
                valid += 1;
                mean += v;
                if let Some(d) = display {
                    display_mean += d.get(neighbor);
                }
            }
        }

        if invalid_neighbor_ids.is_empty() {
            immediate.push((id, mean / valid as f64, display_mean / valid as f64));
        } else {
            queue.push(QueueElement {
                key: valid,
                id,
                mean,
                display_mean,
                invalid_neighbor_ids,
            });
        }
    } else if !cursor.is_leaf() {
        for child in 0..cursor.n_children() {
            cursor.to_child(child);
            fill_queue(measure, display, cursor, queue, immediate);
            cursor.to_parent();
        }
    }
}

fn drain(grid: &mut HyperTreeGrid, mut queue: BinaryHeap<QueueElement>) {
    let mut buffer: Vec<(i64, usize, f64, f64)> = Vec::new();

    while let Some(element) = queue.pop() {
        let key = element.key;
        let mut mean = element.mean;
        let mut display_mean = element.display_mean;
        let mut still_invalid = 0i64;

        if let Some(measure) = grid.measure() {
            for &neighbor in &element.invalid_neighbor_ids {
                let v = measure.get(neighbor);
                if v.is_nan() {
                    still_invalid += 1;
                } else {
                    mean += v;
                    if let Some(d) = grid.display() {
                        display_mean += d.get(neighbor);
                    }
                }
            }
        }

        let new_key = key + element.invalid_neighbor_ids.len() as i64 - still_invalid;
        buffer.push((new_key, element.id, mean, display_mean));

        // Flush once the key class is exhausted, so every element of the
        // class saw the same field snapshot.
        if queue.peek().map_or(true, |top| top.key != key) {
            for (k, id, m, dm) in buffer.drain(..) {
                if let Some(array) = grid.measure_mut() {
                    array.insert(id, m / k as f64);
                }
                if let Some(array) = grid.display_mut() {
                    array.insert(id, dm / k as f64);
                }
            }
        }
    }
}
