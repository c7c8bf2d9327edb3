//! Ordering engine for route points.
//!
//! A route's points carry `order` values forming the dense run `1..=N`. Every
//! mutation here is computed from the current points of one route and
//! returned as a list of [`OrderChange`]s; the store applies the list in a
//! single transaction. Nothing in this module performs I/O.

use crate::model::{Direction, PointId, RouteId, RoutePoint};

/// New order value for one point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderChange {
    pub point_id: PointId,
    pub order: i32,
}

/// Point about to be inserted by an append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewPoint {
    pub route_id: RouteId,
    pub x: i32,
    pub y: i32,
    pub order: i32,
}

/// `max(order) + 1`, or 1 for a route without points.
pub fn next_order(existing: &[RoutePoint]) -> i32 {
    existing.iter().map(|p| p.order).max().map_or(1, |max| max + 1)
}

pub fn append(route_id: RouteId, existing: &[RoutePoint], x: i32, y: i32) -> NewPoint {
    NewPoint {
        route_id,
        x,
        y,
        order: next_order(existing),
    }
}

/// Compaction plan for removing `target`: every point ranked after it moves
/// up by one. Empty when `target` is not among `points`.
pub fn delete(points: &[RoutePoint], target: PointId) -> Vec<OrderChange> {
    let Some(removed) = points.iter().find(|p| p.id == target) else {
        return Vec::new();
    };
    points
        .iter()
        .filter(|p| p.id != removed.id && p.order > removed.order)
        .map(|p| OrderChange {
            point_id: p.id,
            order: p.order - 1,
        })
        .collect()
}

/// Transposition of `target` with its neighbour in `direction`.
///
/// Empty (a no-op, not an error) when the target is first and moving up, or
/// when no sibling holds the neighbouring order.
pub fn swap_adjacent(points: &[RoutePoint], target: PointId, direction: Direction) -> Vec<OrderChange> {
    let Some(point) = points.iter().find(|p| p.id == target) else {
        return Vec::new();
    };
    let neighbour_order = match direction {
        Direction::Up if point.order <= 1 => return Vec::new(),
        Direction::Up => point.order - 1,
        Direction::Down => point.order + 1,
    };
    let Some(neighbour) = points.iter().find(|p| p.id != point.id && p.order == neighbour_order) else {
        return Vec::new();
    };
    vec![
        OrderChange {
            point_id: point.id,
            order: neighbour.order,
        },
        OrderChange {
            point_id: neighbour.id,
            order: point.order,
        },
    ]
}

/// Apply a plan to an in-memory copy and restore ascending order.
pub fn apply(points: &mut [RoutePoint], changes: &[OrderChange]) {
    for change in changes {
        if let Some(p) = points.iter_mut().find(|p| p.id == change.point_id) {
            p.order = change.order;
        }
    }
    points.sort_by_key(|p| p.order);
}

/// A plan may only name points of this route, and must leave the orders dense.
pub fn plan_keeps_dense(points: &[RoutePoint], changes: &[OrderChange]) -> bool {
    if !changes.iter().all(|c| points.iter().any(|p| p.id == c.point_id)) {
        return false;
    }
    let mut after = points.to_vec();
    apply(&mut after, changes);
    is_dense(&after)
}

/// True when the orders are exactly `1..=points.len()`.
pub fn is_dense(points: &[RoutePoint]) -> bool {
    let mut orders: Vec<i32> = points.iter().map(|p| p.order).collect();
    orders.sort_unstable();
    orders.iter().zip(1..).all(|(&order, expected)| order == expected)
}
